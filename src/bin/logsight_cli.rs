use std::path::{Path, PathBuf};
use std::sync::Arc;
use structopt::StructOpt;

use logsight::config::Config;
use logsight::input::{open_capped, select_format};
use logsight::output::{OutputFormat, OutputHandler};
use logsight::persistence::{SqliteStatusStore, StatusStore};
use logsight::pipeline::{analyze_many, process_log_file};

/// Log analysis command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "logsight", about = "Log ingestion and analysis CLI")]
pub enum Cli {
    /// Analyze one or more log files
    Analyze {
        /// Log files to analyze
        #[structopt(parse(from_os_str), required = true)]
        files: Vec<PathBuf>,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Output format (json, jsonl, console); overrides the configuration
        #[structopt(short, long)]
        format: Option<String>,
        /// Append results to this file instead of stdout
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
    /// Show which analyzer variant a file would be analyzed with
    Detect {
        /// Path to log file
        #[structopt(parse(from_os_str))]
        file: PathBuf,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Register a log file for the worker
    Submit {
        /// Path to log file
        #[structopt(parse(from_os_str))]
        file: PathBuf,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Process the file right away instead of leaving it to the worker
        #[structopt(long)]
        now: bool,
    },
    /// Print the status and stored results of a registered file
    Results {
        /// Id returned by `submit`
        id: i64,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Only print this category (summary, anomalies, trends)
        #[structopt(long)]
        category: Option<String>,
    },
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        Config::from_file(path)
    } else {
        log::debug!("Config file {:?} not found, using defaults", path);
        Ok(Config::default())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::from_args();

    match cli {
        Cli::Analyze {
            files,
            config,
            format,
            output,
        } => {
            let config = load_config(&config)?;
            let format = OutputFormat::from_str(format.as_deref().unwrap_or(&config.output.format));
            let mut handler = OutputHandler::new(format, output.or_else(|| config.output.file_path.clone()))?;

            let runtime = tokio::runtime::Runtime::new()?;
            let results = runtime.block_on(analyze_many(files, Arc::new(config)));

            let mut failures = 0;
            for (path, outcome) in results {
                let source = path.display().to_string();
                match outcome {
                    Ok(result) => handler.write_result(&source, &result)?,
                    Err(message) => {
                        failures += 1;
                        handler.write_failure(&source, &message)?;
                    }
                }
            }
            handler.flush()?;

            if failures > 0 {
                std::process::exit(1);
            }
        }
        Cli::Detect { file, config } => {
            let config = load_config(&config)?;
            let reader = open_capped(&file, config.input.max_bytes)?;
            let variant = select_format(reader, &config.input, &file.display().to_string())?;
            println!("{}", variant);
        }
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Submit { file, config, now } => {
            let config = load_config(&config)?;
            let store = SqliteStatusStore::new(&config.storage.database_path)?;
            let path = file.canonicalize().unwrap_or(file);
            let id = store.register_file(&path)?;
            println!("Registered {} as log file {}", path.display(), id);

            if now {
                let outcome = process_log_file(&store, id, &config)?;
                println!("Log file {}: {:?}", id, outcome);
            }
        }
        Cli::Results {
            id,
            config,
            category,
        } => {
            let config = load_config(&config)?;
            let store = SqliteStatusStore::new(&config.storage.database_path)?;
            let record = store.get_file(id)?;

            let mut document = serde_json::Map::new();
            document.insert("file".to_string(), serde_json::to_value(&record)?);
            match category {
                Some(category) => {
                    let result = store.get_result(id, &category)?;
                    document.insert(category, result.unwrap_or(serde_json::Value::Null));
                }
                None => {
                    document.insert("results".to_string(), serde_json::to_value(store.get_results(id)?)?);
                }
            }
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }

    Ok(())
}
