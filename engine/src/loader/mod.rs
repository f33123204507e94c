//! CSV loader with encoding and delimiter auto-detection.
//!
//! Turns CSV bytes into a raw [`Table`] the pipeline can consume. Every
//! cell is typed with [`Scalar::parse_inferred`] unless inference is off.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::table::{Column, Scalar, Table};

/// Loader options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Use this delimiter instead of detecting one
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Infer ints, floats, bools and dates from cell text
    #[serde(default = "default_true")]
    pub infer_types: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            infer_types: true,
        }
    }
}

/// A loaded table with the settings that were used to read it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected or forced delimiter
    pub delimiter: char,
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes with `encoding`. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> LoadResult<String> {
    let decoder = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => {
            return Ok(String::from_utf8(bytes.to_vec())
                .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()));
        }
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15,
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252,
        _ => return Ok(String::from_utf8_lossy(bytes).into_owned()),
    };

    let (text, _, had_errors) = decoder.decode(bytes);
    if had_errors {
        return Err(LoadError::Encoding(encoding.to_string()));
    }
    Ok(text.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = (',', 0);
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best.1 {
            best = (sep, count);
        }
    }
    best.0
}

/// Load a CSV file.
pub fn load_file<P: AsRef<Path>>(path: P, options: &LoadOptions) -> LoadResult<LoadedTable> {
    let bytes = std::fs::read(path.as_ref())?;
    load_bytes(&bytes, options)
}

/// Load CSV bytes, detecting the encoding first.
pub fn load_bytes(bytes: &[u8], options: &LoadOptions) -> LoadResult<LoadedTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    load_str_with_encoding(&content, options, encoding)
}

/// Load CSV text.
pub fn load_str(content: &str, options: &LoadOptions) -> LoadResult<LoadedTable> {
    load_str_with_encoding(content, options, "utf-8".to_string())
}

fn load_str_with_encoding(content: &str, options: &LoadOptions, encoding: String) -> LoadResult<LoadedTable> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(String::is_empty) {
        return Err(LoadError::NoHeaders);
    }

    let mut cells: Vec<Vec<Scalar>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        // Short rows are padded with nulls, extra fields are ignored.
        for (i, column) in cells.iter_mut().enumerate() {
            let raw = record.get(i).unwrap_or("");
            column.push(if options.infer_types {
                Scalar::parse_inferred(raw)
            } else if raw.is_empty() {
                Scalar::Null
            } else {
                Scalar::Str(raw.to_string())
            });
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| Column {
            name: name.clone(),
            values,
        })
        .collect();

    Ok(LoadedTable {
        table: Table::from_columns(columns)?,
        encoding,
        delimiter,
        headers,
    })
}
