// CSV/TSV parsing into row sets

use std::path::Path;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tabview_engine::{RowSet, Value};

use crate::error::SourceError;

/// Delimiters tried when none is configured, most common first
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Non-blank records read when sniffing
const SNIFF_RECORDS: usize = 20;

/// How to read delimited text
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    /// Field delimiter; sniffed from the content when `None`
    pub delimiter: Option<u8>,
    /// First non-empty line holds the column names
    pub has_header: bool,
    /// Explicit column names (replace the header line when there is one)
    pub columns: Option<Vec<String>>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            columns: None,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
            ..Self::default()
        }
    }

    /// The configured delimiter, or the one that best splits `content`
    pub fn delimiter_for(&self, content: &str) -> u8 {
        self.delimiter.unwrap_or_else(|| sniff_delimiter(strip_bom(content)))
    }

    /// Copy of these options with the delimiter pinned for `content`
    pub fn resolved_for(&self, content: &str) -> CsvOptions {
        CsvOptions {
            delimiter: Some(self.delimiter_for(content)),
            ..self.clone()
        }
    }
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

fn reader(content: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
}

/// A line with nothing but whitespace
fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record[0].trim().is_empty()
}

/// Parse with default options (header row, sniffed delimiter)
pub fn parse_csv(content: &str) -> Result<RowSet, SourceError> {
    parse_csv_with(content, &CsvOptions::default())
}

/// Parse delimited text.
///
/// Headers and fields are trimmed, empty lines skipped, and fields typed
/// dynamically (see [`Value::parse_typed`]). Short records are padded with
/// `Empty`, extra fields dropped. Duplicate header names get a `_1`, `_2`
/// suffix so column names stay unique.
pub fn parse_csv_with(content: &str, options: &CsvOptions) -> Result<RowSet, SourceError> {
    let content = strip_bom(content);
    let delimiter = options.delimiter_for(content);

    let mut headers: Option<Vec<String>> = options.columns.as_ref().map(|c| unique_headers(c.iter().map(|h| h.trim())));
    let mut header_pending = options.has_header;
    let mut records: Vec<Vec<Value>> = Vec::new();

    for result in reader(content, delimiter).records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        if header_pending {
            header_pending = false;
            if headers.is_none() {
                headers = Some(unique_headers(record.iter().map(str::trim)));
            }
            continue;
        }
        let width = headers.as_ref().map_or(record.len(), Vec::len);
        records.push(record.iter().take(width).map(Value::parse_typed).collect());
    }

    let headers = match headers {
        Some(h) => h,
        // Headerless input without names: number the columns
        None => {
            let width = records.iter().map(Vec::len).max().unwrap_or(0);
            (1..=width).map(|i| format!("column{}", i)).collect()
        }
    };

    log::debug!(
        "csv: parsed {} rows x {} columns (delimiter {:?})",
        records.len(),
        headers.len(),
        delimiter as char
    );
    Ok(RowSet::from_records(headers, records))
}

pub(crate) fn unique_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}_{}", name, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Parse a local file, sniffing the delimiter unless `options` sets one
pub fn load_csv_file(path: &Path, options: &CsvOptions) -> Result<RowSet, SourceError> {
    let content = read_text_file(path)?;
    parse_csv_with(&content, &options.resolved_for(&content))
}

/// Rank a candidate as `(rows as wide as the header, named header fields)`.
///
/// Records are read the way [`parse_csv_with`] reads them, so quoted fields
/// may hold other candidates and blank lines do not count. `None` when the
/// header does not split into at least two named columns.
fn delimiter_score(content: &str, delimiter: u8) -> Option<(usize, usize)> {
    let mut records = reader(content, delimiter)
        .into_records()
        .map_while(Result::ok)
        .filter(|r| !is_blank(r))
        .take(SNIFF_RECORDS);

    let header = records.next()?;
    let named = header.iter().filter(|f| !f.trim().is_empty()).count();
    if named < 2 {
        return None;
    }
    let consistent = records.filter(|r| r.len() == header.len()).count();
    Some((consistent, named))
}

/// Pick the delimiter whose header width the most data rows agree with, then
/// the one naming more columns. Ties go to the earlier candidate; `,` when
/// nothing splits.
pub fn sniff_delimiter(content: &str) -> u8 {
    DELIMITER_CANDIDATES
        .iter()
        .rev()
        .filter_map(|&d| delimiter_score(content, d).map(|score| (score, d)))
        .max_by_key(|(score, _)| *score)
        .map_or(b',', |(_, d)| d)
}

/// Decode file bytes: a byte-order mark wins, then UTF-8, then Windows-1252
/// (spreadsheet exports).
pub fn decode_text(bytes: &[u8]) -> (String, &'static Encoding) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (text.into_owned(), encoding);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), UTF_8),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text.into_owned(), WINDOWS_1252)
        }
    }
}

/// Read a text file in whatever encoding [`decode_text`] recognises
pub fn read_text_file(path: &Path) -> Result<String, SourceError> {
    let bytes = std::fs::read(path).map_err(|e| SourceError::Parse(format!("{}: {}", path.display(), e)))?;
    let (text, encoding) = decode_text(&bytes);
    if encoding != UTF_8 {
        log::debug!("{}: decoded as {}", path.display(), encoding.name());
    }
    Ok(text)
}
