pub mod format;
pub mod grammar;
pub mod reader;

pub use format::{select_format, select_format_for_file, Variant};
pub use grammar::{grammars, LineGrammar, LineParser, ParsedLine, TimestampStyle};
pub use reader::{lossy_lines, open_capped, open_source, LogReader, LossyLines};
