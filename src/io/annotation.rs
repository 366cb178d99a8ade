use crate::types::{AnnotationValue, UavsarResult};
use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::US::Mountain;
use std::collections::HashMap;
use std::path::Path;

/// One parsed annotation statement.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry {
    pub value: AnnotationValue,
    /// Unit string from the parenthesized suffix of the key, if any.
    pub units: Option<String>,
    /// Trailing `;` comment, lowercased.
    pub comment: String,
}

/// Parsed annotation table for one product directory.
///
/// Keys are lowercased and stripped of their unit suffix, so the statement
/// `grd_pwr.set_rows (pixels) = 10 ; rows` is stored under
/// `grd_pwr.set_rows`. A duplicate key overwrites the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    entries: HashMap<String, AnnotationEntry>,
}

/// Keys holding acquisition timestamps rather than plain values.
const TIME_KEYS: [&str; 2] = ["start time of acquisition", "stop time of acquisition"];

impl Annotation {
    /// Read and parse an annotation file. Only the file read itself can
    /// fail; malformed content yields an empty table.
    pub fn from_file<P: AsRef<Path>>(path: P) -> UavsarResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&text))
    }

    /// Parse annotation text. Lines that do not carry a `key = value`
    /// statement are skipped; this never fails.
    pub fn parse(text: &str) -> Self {
        let mut ann = Annotation::default();

        for line in text.lines() {
            // The comment is everything after the first `;`.
            let (statement, comment) = match line.split_once(';') {
                Some((stmt, cmt)) => (stmt, cmt.trim().to_lowercase()),
                None => (line, String::new()),
            };

            let Some((name, raw_value)) = statement.split_once('=') else {
                continue;
            };

            let key = match name.split_once('(') {
                Some((before, _)) => before.trim().to_lowercase(),
                None => name.trim().to_lowercase(),
            };
            if key.is_empty() {
                continue;
            }

            let units = enclosed_units(name);
            let value = coerce_value(raw_value.trim());

            ann.entries
                .insert(key, AnnotationEntry { value, units, comment });
        }

        ann.localize_acquisition_times();
        ann
    }

    /// Reinterpret the acquisition-time entries as timestamps in the fixed
    /// US/Mountain ground-station zone. Strings that fail to parse are left
    /// as text.
    fn localize_acquisition_times(&mut self) {
        if !self.entries.contains_key(TIME_KEYS[0]) {
            return;
        }
        for key in TIME_KEYS {
            if let Some(entry) = self.entries.get_mut(key) {
                let parsed = match &entry.value {
                    AnnotationValue::Text(raw) => {
                        let ts = parse_acquisition_time(raw);
                        if ts.is_none() {
                            log::warn!("Could not parse acquisition time '{}'", raw);
                        }
                        ts
                    }
                    _ => None,
                };
                if let Some(ts) = parsed {
                    entry.value = ts;
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&AnnotationEntry> {
        self.entries.get(key)
    }

    /// Remove an entry, returning it if present. Used by callers that want
    /// to suppress a block (and by tests exercising fallback chains).
    pub fn remove(&mut self, key: &str) -> Option<AnnotationEntry> {
        self.entries.remove(key)
    }

    pub fn value(&self, key: &str) -> Option<&AnnotationValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(AnnotationValue::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(AnnotationValue::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(AnnotationValue::as_str)
    }

    pub fn units(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|e| e.units.as_deref())
    }
}

/// Text inside the first `(...)` pair of a statement name.
fn enclosed_units(name: &str) -> Option<String> {
    let open = name.find('(')?;
    let rest = &name[open + 1..];
    let close = rest.find(')')?;
    let units = rest[..close].trim();
    if units.is_empty() {
        None
    } else {
        Some(units.to_string())
    }
}

/// Numeric coercion: whole floats become `Int`, other parseable numbers
/// `Float`, everything else stays `Text`.
fn coerce_value(raw: &str) -> AnnotationValue {
    if let Ok(num) = raw.parse::<f64>() {
        if num.fract() == 0.0 && num.abs() < i64::MAX as f64 {
            return AnnotationValue::Int(num as i64);
        }
        return AnnotationValue::Float(num);
    }
    AnnotationValue::Text(raw.to_string())
}

/// Parse an acquisition time string as UTC, then convert to US/Mountain.
fn parse_acquisition_time(raw: &str) -> Option<AnnotationValue> {
    let trimmed = raw.trim().trim_end_matches("UTC").trim();

    const FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d-%b-%Y %H:%M:%S%.f",
        "%d-%b-%y %H:%M:%S%.f",
        "%Y%m%d %H:%M:%S%.f",
    ];

    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            let utc = Utc.from_utc_datetime(&naive);
            return Some(AnnotationValue::Timestamp(utc.with_timezone(&Mountain)));
        }
    }
    None
}
