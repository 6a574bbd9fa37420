//! Line-oriented cache files written by the benchmark harness.
//!
//! Three record shapes are understood:
//!
//! * series records, `name:v1 v2 ...`
//! * leveled records, `level:name:v1 v2 ...[, size]`
//! * ratio records, `level:image:ratio`
//!
//! Blank lines are ignored. When a key repeats, the later line replaces the earlier value but the
//! key keeps its first position.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;
use std::num::{ParseFloatError, ParseIntError};

use linked_hash_map::LinkedHashMap;

use crate::plot::{RatioMap, SeriesMap};

pub const DECOMPRESSION_CACHE: &str = "decompression.data";
pub const COMPRESSION_CACHE: &str = "compression.data";
pub const CRUNCH_CACHE: &str = "crunch.data";
/// Series records, one per toolchain, from the compiler history benchmark.
pub const HISTORICAL_CACHE: &str = "historical.data";

#[derive(Debug, PartialEq)]
pub enum CacheError {
    /// A record has fewer `:`-separated fields than its shape requires.
    MissingField { line: usize, field: &'static str },
    InvalidLevel {
        line: usize,
        text: String,
        error: ParseIntError,
    },
    InvalidValue {
        line: usize,
        text: String,
        error: ParseFloatError,
    },
    InvalidSize {
        line: usize,
        text: String,
        error: ParseIntError,
    },
    /// A name that cannot be written without corrupting the record.
    InvalidName(String),
}
impl CacheError {
    /// 1-based line number of the offending record, if the error came from parsing.
    pub fn line(&self) -> Option<usize> {
        match self {
            CacheError::MissingField { line, .. }
            | CacheError::InvalidLevel { line, .. }
            | CacheError::InvalidValue { line, .. }
            | CacheError::InvalidSize { line, .. } => Some(*line),
            CacheError::InvalidName(_) => None,
        }
    }
}
impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::MissingField { line, field } => {
                write!(f, "Line {}: missing {} field.", line, field)
            }
            CacheError::InvalidLevel { line, text, error } => {
                write!(f, "Line {}: invalid level {:?}: {}", line, text, error)
            }
            CacheError::InvalidValue { line, text, error } => {
                write!(f, "Line {}: invalid measurement {:?}: {}", line, text, error)
            }
            CacheError::InvalidSize { line, text, error } => {
                write!(f, "Line {}: invalid file size {:?}: {}", line, text, error)
            }
            CacheError::InvalidName(name) => write!(
                f,
                "Name {:?} cannot be stored; names may not contain ':' or line breaks.",
                name
            ),
        }
    }
}
impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::InvalidLevel { error, .. } | CacheError::InvalidSize { error, .. } => {
                Some(error)
            }
            CacheError::InvalidValue { error, .. } => Some(error),
            CacheError::MissingField { .. } | CacheError::InvalidName(_) => None,
        }
    }
}

/// Timing samples for one named series at one level, plus the encoded file size when the
/// harness reported one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measurement {
    pub samples: Vec<f64>,
    pub size: Option<u64>,
}

pub type Level = LinkedHashMap<String, Measurement>;
pub type LevelMap = BTreeMap<u32, Level>;
pub type RatioLevels = BTreeMap<u32, RatioMap>;

/// Non-blank lines with their 1-based line numbers.
fn records(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    line: usize,
    name: &'static str,
) -> Result<&'a str, CacheError> {
    fields
        .next()
        .ok_or(CacheError::MissingField { line, field: name })
}

fn parse_level(text: &str, line: usize) -> Result<u32, CacheError> {
    text.trim()
        .parse()
        .map_err(|error| CacheError::InvalidLevel {
            line,
            text: text.to_owned(),
            error,
        })
}

fn parse_value(text: &str, line: usize) -> Result<f64, CacheError> {
    text.trim()
        .parse()
        .map_err(|error| CacheError::InvalidValue {
            line,
            text: text.to_owned(),
            error,
        })
}

fn parse_samples(text: &str, line: usize) -> Result<Vec<f64>, CacheError> {
    text.split_whitespace()
        .map(|value| parse_value(value, line))
        .collect()
}

fn check_name(name: &str) -> Result<&str, CacheError> {
    if name.contains(|c: char| matches!(c, ':' | '\n' | '\r')) || name.trim().is_empty() {
        return Err(CacheError::InvalidName(name.to_owned()));
    }
    Ok(name)
}

fn write_samples(out: &mut String, samples: &[f64]) {
    for (i, value) in samples.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Debug formatting is the shortest representation that parses back exactly.
        let _ = write!(out, "{:?}", value);
    }
}

/// Stores `value` under `key`. An existing key is overwritten in place, keeping its position.
fn replace<V>(map: &mut LinkedHashMap<String, V>, key: &str, value: V) {
    match map.get_mut(key) {
        Some(slot) => *slot = value,
        None => {
            map.insert(key.to_owned(), value);
        }
    }
}

pub fn load_series(text: &str) -> Result<SeriesMap, CacheError> {
    let mut series = SeriesMap::new();
    for (line, record) in records(text) {
        let mut fields = record.splitn(2, ':');
        let name = field(&mut fields, line, "name")?;
        let samples = parse_samples(field(&mut fields, line, "samples")?, line)?;
        replace(&mut series, name, samples);
    }
    Ok(series)
}

pub fn save_series(series: &SeriesMap) -> Result<String, CacheError> {
    let mut out = String::new();
    for (name, samples) in series {
        out.push_str(check_name(name)?);
        out.push(':');
        write_samples(&mut out, samples);
        out.push('\n');
    }
    Ok(out)
}

pub fn load_leveled(text: &str) -> Result<LevelMap, CacheError> {
    let mut levels = LevelMap::new();
    for (line, record) in records(text) {
        let mut fields = record.splitn(3, ':');
        let level = parse_level(field(&mut fields, line, "level")?, line)?;
        let name = field(&mut fields, line, "name")?;
        let mut value = field(&mut fields, line, "samples")?.splitn(2, ',');
        let samples = parse_samples(value.next().unwrap_or_default(), line)?;
        let size = value
            .next()
            .map(|text| {
                text.trim()
                    .parse()
                    .map_err(|error| CacheError::InvalidSize {
                        line,
                        text: text.to_owned(),
                        error,
                    })
            })
            .transpose()?;

        let series = levels.entry(level).or_insert_with(Level::new);
        replace(series, name, Measurement { samples, size });
    }
    Ok(levels)
}

pub fn save_leveled(levels: &LevelMap) -> Result<String, CacheError> {
    let mut out = String::new();
    for (level, series) in levels {
        for (name, measurement) in series {
            let _ = write!(out, "{}:{}:", level, check_name(name)?);
            write_samples(&mut out, &measurement.samples);
            if let Some(size) = measurement.size {
                let _ = write!(out, ", {}", size);
            }
            out.push('\n');
        }
    }
    Ok(out)
}

pub fn load_ratios(text: &str) -> Result<RatioLevels, CacheError> {
    let mut levels = RatioLevels::new();
    for (line, record) in records(text) {
        let mut fields = record.splitn(3, ':');
        let level = parse_level(field(&mut fields, line, "level")?, line)?;
        let image = field(&mut fields, line, "image")?;
        let ratio = parse_value(field(&mut fields, line, "ratio")?, line)?;
        replace(levels.entry(level).or_insert_with(RatioMap::new), image, ratio);
    }
    Ok(levels)
}

pub fn save_ratios(levels: &RatioLevels) -> Result<String, CacheError> {
    let mut out = String::new();
    for (level, ratios) in levels {
        for (image, ratio) in ratios {
            let _ = writeln!(out, "{}:{}:{:?}", level, check_name(image)?, ratio);
        }
    }
    Ok(out)
}
