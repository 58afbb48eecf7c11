use crate::models::{AnalysisResult, Summary};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Output handler for analysis results
pub struct OutputHandler {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            _ => OutputFormat::Json, // Default
        }
    }
}

impl OutputHandler {
    /// Create a new output handler; results are appended to `file_path` when given
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let writer: Option<Box<dyn Write + Send>> = match file_path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            None => None,
        };

        Ok(OutputHandler { format, writer })
    }

    /// Output handler writing into an arbitrary sink
    pub fn with_writer(format: OutputFormat, writer: Box<dyn Write + Send>) -> Self {
        OutputHandler {
            format,
            writer: Some(writer),
        }
    }

    /// Write the result of one source
    pub fn write_result(&mut self, source: &str, result: &AnalysisResult) -> Result<(), Box<dyn std::error::Error>> {
        match &self.format {
            OutputFormat::Json => {
                let document = serde_json::json!({ "source": source, "result": result });
                let json = serde_json::to_string_pretty(&document)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Jsonl => {
                let document = serde_json::json!({ "source": source, "result": result });
                let json = serde_json::to_string(&document)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Console => {
                let report = render_console(source, result);
                self.write_output(&report)?;
            }
        }
        Ok(())
    }

    /// Write the failure of one source
    pub fn write_failure(&mut self, source: &str, message: &str) -> Result<(), Box<dyn std::error::Error>> {
        let output = match &self.format {
            OutputFormat::Console => format!("== {} ==\nAnalysis failed: {}\n\n", source, message),
            _ => {
                let document = serde_json::json!({ "source": source, "error": message });
                format!("{}\n", serde_json::to_string(&document)?)
            }
        };
        self.write_output(&output)?;
        Ok(())
    }

    fn write_output(&mut self, data: &str) -> io::Result<()> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(data.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Human readable report of one result
fn render_console(source: &str, result: &AnalysisResult) -> String {
    let mut out = format!("== {} ==\n", source);

    match &result.summary {
        Summary::Auth(s) => {
            out.push_str(&format!(
                "Entries: {}  Auth events: {}  Success: {}  Failure: {}  Success rate: {:.1}%\n",
                s.total_entries, s.auth_events, s.success_count, s.failure_count, s.success_rate
            ));
            out.push_str(&format!(
                "Time span: {} .. {}\n",
                s.log_start_time.format(crate::models::LOG_TIME_FORMAT),
                s.log_end_time.format(crate::models::LOG_TIME_FORMAT)
            ));
        }
        Summary::System(s) => {
            let severities: Vec<String> = s
                .severity_distribution
                .iter()
                .map(|(severity, count)| format!("{}={}", severity.as_str(), count))
                .collect();
            out.push_str(&format!(
                "Entries: {}  Services: {}  Severities: {}\n",
                s.total_entries,
                s.service_distribution.len(),
                severities.join(" ")
            ));
            out.push_str(&format!(
                "Time span: {} .. {}\n",
                s.log_start_time.format(crate::models::LOG_TIME_FORMAT),
                s.log_end_time.format(crate::models::LOG_TIME_FORMAT)
            ));
        }
        Summary::Empty(s) => {
            out.push_str(&format!("Entries: {} ({})\n", s.total_entries, s.error));
        }
    }

    out.push_str(&format!("Anomalies: {}\n", result.anomalies.len()));
    for anomaly in &result.anomalies {
        let severity = match anomaly.severity {
            crate::models::AnomalySeverity::High => "HIGH",
            crate::models::AnomalySeverity::Medium => "MEDIUM",
        };
        out.push_str(&format!(
            "  [{}] {} - {}\n",
            severity,
            anomaly.kind.name(),
            anomaly.description
        ));
    }

    match result.trends.rate_change {
        Some(change) => out.push_str(&format!(
            "Trend: {} ({:+.2}) over {} day(s)\n\n",
            result.trends.trend_description.describe(),
            change,
            result.trends.series.len()
        )),
        None => out.push_str(&format!(
            "Trend: {}\n\n",
            result.trends.trend_description.describe()
        )),
    }

    out
}
