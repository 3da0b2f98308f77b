//! Turning uploaded registry files into rows of cells.
//!
//! The upload is classified once into a [`FormatKind`], and each kind has exactly one pure
//! extraction function. Malformed lines never abort extraction: the loose-text path collects
//! them in [`Extraction::invalid_lines`] and lets the importer decide what to do.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use thiserror::Error;

use super::normalize::{iso_date, normalize_name};

/// Candidate delimiters, in tie-break preference order.
const DELIMITERS: [char; 3] = [';', ',', '\t'];

/// Pairs of labels that mark a header line in free text.
const LABEL_PAIRS: &[(&str, &str)] = &[
    ("first name", "last name"),
    ("student code", "birth date"),
    ("prenom", "nom"),
    ("matricule", "naissance"),
];

/// Minimum number of fields a free-text line needs to describe a student.
const LOOSE_MIN_FIELDS: usize = 5;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unreadable spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("unreadable PDF: {0}")]
    Pdf(String),
}

/// Supported registry upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// PDF whose text layer is read line by line with the loose splitter
    Pdf,
    /// CSV, TSV or semicolon separated text
    DelimitedText,
    /// XLSX / XLS workbook, first sheet only
    Spreadsheet,
}

impl FormatKind {
    /// Classify an upload by file extension, falling back to the declared MIME type.
    pub fn classify(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => return Some(FormatKind::Pdf),
            "csv" | "tsv" | "txt" => return Some(FormatKind::DelimitedText),
            "xlsx" | "xls" => return Some(FormatKind::Spreadsheet),
            _ => {}
        }

        let mime = content_type?.split(';').next()?.trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Some(FormatKind::Pdf),
            "text/csv" | "application/csv" | "text/plain" | "text/tab-separated-values" => Some(FormatKind::DelimitedText),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" | "application/vnd.ms-excel" => {
                Some(FormatKind::Spreadsheet)
            }
            _ => None,
        }
    }

    pub fn extract(self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        match self {
            FormatKind::Pdf => {
                let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
                Ok(extract_loose_text(&text))
            }
            FormatKind::DelimitedText => Ok(extract_delimited(&String::from_utf8_lossy(bytes))),
            FormatKind::Spreadsheet => extract_spreadsheet(bytes),
        }
    }
}

/// Rows of raw cells plus the free-text lines that could not be split into fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub rows: Vec<Vec<String>>,
    pub invalid_lines: Vec<String>,
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n']).map(str::trim).filter(|line| !line.is_empty())
}

/// Pick the delimiter occurring most often in `line`; `;` when none occurs.
pub fn detect_delimiter(line: &str) -> char {
    let mut best = (DELIMITERS[0], 0);
    for delimiter in DELIMITERS {
        let count = line.matches(delimiter).count();
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    best.0
}

/// Drop the padding between a delimiter and an opening quote.
///
/// The csv reader only treats a quote as opening a quoted field when it is the first byte of the
/// field, and trimming happens after parsing, so `a, "b, c"` would otherwise split inside the
/// quotes. Text inside quoted fields is copied untouched.
fn tighten_quoted_fields(line: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut at_field_start = true;

    while let Some(c) = chars.next() {
        if in_quotes {
            out.push(c);
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    out.push('"');
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }

        if at_field_start {
            if c.is_whitespace() && c != delimiter {
                let mut padding = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !next.is_whitespace() || next == delimiter {
                        break;
                    }
                    padding.push(next);
                    chars.next();
                }
                if chars.peek() != Some(&'"') {
                    out.push_str(&padding);
                }
                continue;
            }
            at_field_start = false;
            if c == '"' {
                in_quotes = true;
                out.push(c);
                continue;
            }
        }

        if c == delimiter {
            at_field_start = true;
        }
        out.push(c);
    }

    out
}

fn split_delimited_line(line: &str, delimiter: char) -> Vec<String> {
    let line = tighten_quoted_fields(line, delimiter);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        // Only reachable on a reader error, which an in-memory UTF-8 line cannot produce
        _ => vec![line.to_string()],
    }
}

pub fn extract_delimited(text: &str) -> Extraction {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = non_blank_lines(text).collect();

    let Some(first) = lines.first() else {
        return Extraction::default();
    };
    let delimiter = detect_delimiter(first);
    tracing::debug!(delimiter = ?delimiter, lines = lines.len(), "Parsing delimited registry text");

    Extraction {
        rows: lines.iter().map(|line| split_delimited_line(line, delimiter)).collect(),
        invalid_lines: Vec::new(),
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|value| iso_date(value.date()))
            .unwrap_or_else(|| dt.as_f64().to_string()),
        other => other.to_string(),
    }
}

pub fn extract_spreadsheet(bytes: &[u8]) -> Result<Extraction, ExtractError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Extraction::default());
    };
    let range = range?;

    Ok(Extraction {
        rows: range.rows().map(|row| row.iter().map(cell_to_string).collect()).collect(),
        invalid_lines: Vec::new(),
    })
}

fn is_label_line(line: &str) -> bool {
    let normalized = normalize_name(line);
    LABEL_PAIRS
        .iter()
        .any(|(a, b)| normalized.contains(a) && normalized.contains(b))
}

/// Split on tabs, spaced pipes and runs of two or more whitespace characters.
fn split_on_wide_gaps(line: &str) -> Vec<String> {
    let line = line.replace(" | ", "\t");
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        let gap = c == '\t' || (c.is_whitespace() && chars.peek().is_some_and(|next| next.is_whitespace()));
        if gap {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);

    fields
        .into_iter()
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect()
}

fn split_loose_line(line: &str) -> Vec<String> {
    let fields = split_on_wide_gaps(line);
    if fields.len() < LOOSE_MIN_FIELDS && line.contains([',', ';']) {
        return line
            .split([',', ';'])
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();
    }
    fields
}

/// Free text with no fixed delimiter, typically the text layer of a PDF.
///
/// Each usable line becomes a five-cell row: first name, last name, student code, birth date
/// and everything left over joined as the class name.
pub fn extract_loose_text(text: &str) -> Extraction {
    let mut extraction = Extraction::default();

    for line in non_blank_lines(text) {
        if is_label_line(line) {
            continue;
        }

        let mut fields = split_loose_line(line);
        if fields.len() < LOOSE_MIN_FIELDS {
            extraction.invalid_lines.push(line.to_string());
            continue;
        }

        let class_name = fields.split_off(4).join(" ");
        fields.push(class_name);
        extraction.rows.push(fields);
    }

    extraction
}
