//! CSV options

/// Options for reading CSV files
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Whether first row is header
    pub has_header: bool,
    /// Automatic type detection
    pub auto_detect_types: bool,
    /// Find the primary date column and convert it to dates
    pub detect_date_column: bool,
    /// Fail when no date column is found
    pub require_date_column: bool,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_header: true,
            auto_detect_types: true,
            detect_date_column: true,
            require_date_column: false,
        }
    }
}

/// Options for writing CSV files
#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Write header row
    pub write_header: bool,
    /// Line terminator
    pub line_terminator: LineTerminator,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            write_header: true,
            line_terminator: LineTerminator::LF,
        }
    }
}

/// Line terminator type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    /// Unix-style (LF)
    LF,
    /// Windows-style (CRLF)
    CRLF,
}
