//! Tabular source reader.
//!
//! Parses the delimited data source into an ordered sequence of records keyed
//! by the header row. The field delimiter is auto-detected from a fixed-size
//! leading sample, the byte stream is decoded as UTF-8 or Windows-1252, and
//! fully blank records are dropped before they ever reach pagination.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::error::{Error, Result};

/// One parsed data record: sourceField -> value.
pub type Record = HashMap<String, String>;

/// Size of the leading sample used for delimiter detection.
const SNIFF_SAMPLE_LEN: usize = 1024;

/// Candidate field delimiters, in tie-break order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// A parsed tabular source.
///
/// Reading the records consumes the source; restarting requires re-opening
/// the underlying file.
pub struct TabularSource {
    headers: Vec<String>,
    delimiter: u8,
    reader: csv::Reader<Cursor<Vec<u8>>>,
}

impl TabularSource {
    /// Open and sniff a tabular source file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::SourceFormat(format!(
                "Failed to read data file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a tabular source from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode_single_byte(bytes);
        let delimiter = detect_delimiter(&text)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(Cursor::new(text.into_bytes()));

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::SourceFormat(format!("Failed to parse header row: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(Error::SourceFormat(
                "missing or empty header row".to_string(),
            ));
        }

        tracing::debug!(
            "Sniffed delimiter {:?}, {} columns",
            delimiter as char,
            headers.len()
        );

        Ok(Self {
            headers,
            delimiter,
            reader,
        })
    }

    /// Header row, in source column order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The detected field delimiter.
    pub const fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Consume the source, yielding non-blank records lazily.
    pub fn records(self) -> Records {
        Records {
            headers: self.headers,
            inner: self.reader.into_records(),
        }
    }

    /// Read every non-blank record into memory.
    pub fn collect_records(self) -> Result<Vec<Record>> {
        self.records().collect()
    }
}

/// Lazy iterator over the non-blank records of a [`TabularSource`].
pub struct Records {
    headers: Vec<String>,
    inner: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
}

impl Iterator for Records {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.inner.next()? {
                Ok(raw) => raw,
                Err(e) => {
                    return Some(Err(Error::SourceFormat(format!(
                        "Failed to parse record: {e}"
                    ))));
                }
            };

            if raw.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let record: Record = self
                .headers
                .iter()
                .zip(raw.iter())
                .map(|(header, field)| (header.clone(), field.to_string()))
                .collect();
            return Some(Ok(record));
        }
    }
}

/// Decode a single-byte-oriented text stream.
///
/// Valid UTF-8 passes through untouched; anything else is treated as
/// Windows-1252, which covers the Latin-1 exports this tool actually sees.
fn decode_single_byte(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

/// Detect the field delimiter from a leading sample.
///
/// Counts candidate delimiters on the first non-empty line of the sample and
/// picks the most frequent one; equal nonzero counts resolve by fixed
/// candidate order. No candidate at all is an error rather than a guess.
fn detect_delimiter(text: &str) -> Result<u8> {
    let sample_end = text
        .char_indices()
        .nth(SNIFF_SAMPLE_LEN)
        .map_or(text.len(), |(i, _)| i);
    let sample = &text[..sample_end];

    let first_line = sample
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| Error::SourceFormat("empty data source".to_string()))?;

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let count = first_line.bytes().filter(|&b| b == candidate).count();
        if count > 0 && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((candidate, count));
        }
    }

    best.map(|(delimiter, _)| delimiter).ok_or_else(|| {
        Error::SourceFormat("could not detect field delimiter from sample".to_string())
    })
}
