//! CSV writer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};
use reportfill_core::Dataset;

/// CSV file writer
pub struct CsvWriter;

impl CsvWriter {
    /// Write a dataset to a CSV file
    pub fn write_file<P: AsRef<Path>>(
        dataset: &Dataset,
        path: P,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let file = File::create(path)?;
        Self::write(dataset, file, options)
    }

    /// Write a dataset to a writer
    ///
    /// Nulls become empty fields and dates ISO text.
    pub fn write<W: Write>(dataset: &Dataset, writer: W, options: &CsvWriteOptions) -> CsvResult<()> {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .from_writer(writer);

        if options.write_header {
            csv_writer.write_record(dataset.column_names())?;
        }

        for row in 0..dataset.row_count() {
            let record: Vec<String> = dataset
                .columns()
                .iter()
                .map(|column| column.values()[row].to_string())
                .collect();
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
