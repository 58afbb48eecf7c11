use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Take};
use std::path::Path;

use super::grammar::{LineParser, ParsedLine};

/// Line iterator that replaces invalid UTF-8 instead of failing
///
/// Reads one line at a time so large files are never held in memory.
pub struct LossyLines<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    while matches!(self.buffer.last(), Some(b'\n' | b'\r')) {
                        self.buffer.pop();
                    }
                    return Some(Ok(String::from_utf8_lossy(&self.buffer).into_owned()));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub fn lossy_lines<R: BufRead>(reader: R) -> LossyLines<R> {
    LossyLines {
        reader,
        buffer: Vec::new(),
    }
}

/// Open a log file for buffered reading
pub fn open_source(path: &Path) -> io::Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Open a log file reading at most `max_bytes`, or all of it when `None`
pub fn open_capped(path: &Path, max_bytes: Option<u64>) -> io::Result<Take<BufReader<File>>> {
    Ok(open_source(path)?.take(max_bytes.unwrap_or(u64::MAX)))
}

/// Reads a whole source through a [`LineParser`]
pub struct LogReader {
    parser: LineParser,
}

impl LogReader {
    pub fn new(parser: LineParser) -> Self {
        LogReader { parser }
    }

    /// Parse every line of `reader`, skipping the ones no grammar accepts
    pub fn read_entries<R: BufRead>(&self, reader: R) -> io::Result<Vec<ParsedLine>> {
        let mut parsed = Vec::new();
        let mut skipped = 0usize;

        for line in lossy_lines(reader) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.parser.parse_line(&line) {
                Some(entry) => parsed.push(entry),
                None => {
                    skipped += 1;
                    log::debug!("Skipping unparseable line: {}", line);
                }
            }
        }

        if skipped > 0 {
            log::info!("Parsed {} line(s), skipped {}", parsed.len(), skipped);
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_lossy_lines_replaces_invalid_bytes() {
        let data: &[u8] = b"first\r\nsec\xffond\nlast";
        let lines: Vec<String> = lossy_lines(Cursor::new(data))
            .collect::<io::Result<_>>()
            .unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "first");
        assert_eq!(lines[1], "sec\u{FFFD}ond");
        assert_eq!(lines[2], "last");
    }

    #[test]
    fn test_read_entries_skips_bad_lines() {
        let data = "Jan  1 00:00:01 host sshd[1]: Accepted password for bob from 1.2.3.4\n\
                    garbage line\n\
                    \n\
                    {not json}\n\
                    2024-01-01 00:00:02 host app 12 started\n";
        let reader = LogReader::new(LineParser::with_year(2024));
        let parsed = reader.read_entries(Cursor::new(data)).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].entry.service, "sshd");
        assert_eq!(parsed[1].entry.service, "app");
    }

    #[test]
    fn test_open_capped_stops_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cap.log");
        std::fs::write(&path, "first line\nsecond line\n").unwrap();

        let lines: Vec<String> = lossy_lines(open_capped(&path, Some(11)).unwrap())
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(lines, vec!["first line".to_string()]);

        let all: Vec<String> = lossy_lines(open_capped(&path, None).unwrap())
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_source(&dir.path().join("missing.log")).is_err());
    }
}
