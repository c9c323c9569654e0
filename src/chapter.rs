//! Chapter identifiers and batch-wide sub-chapter padding.
//!
//! Sub-chapter numbers are kept as strings. `7.1` and `7.10` are different
//! chapters, so the secondary part is never parsed as a fraction; instead every
//! secondary sharing a primary is left-padded to the same width, which makes
//! the labels sort the same way as a string and as a number.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterId {
    pub primary: String,
    pub secondary: Option<String>,
}

impl ChapterId {
    /// Splits on the first `.`. An empty trailing secondary (`"7."`) is
    /// returned as `Some("")` so callers can flag it.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('.') {
            Some((primary, secondary)) => Self {
                primary: primary.to_owned(),
                secondary: Some(secondary.to_owned()),
            },
            None => Self {
                primary: raw.to_owned(),
                secondary: None,
            },
        }
    }

    fn secondary_len(&self) -> usize {
        self.secondary.as_deref().map_or(0, str::len)
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary.as_deref() {
            Some(secondary) => write!(f, "{}.{secondary}", self.primary),
            None => f.write_str(&self.primary),
        }
    }
}

impl Serialize for ChapterId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChapterId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Hand-edited templates sometimes carry bare numbers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
            Float(f64),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Integer(number) => number.to_string(),
            Raw::Float(number) => number.to_string(),
        };
        Ok(Self::parse(&raw))
    }
}

/// Pads every secondary to the widest secondary seen for its primary.
///
/// `context` names each entry in diagnostics and must be as long as `raw`.
pub fn normalize<S: AsRef<str>>(raw: &[S], context: &[S]) -> Vec<ChapterId> {
    let parsed = raw
        .iter()
        .map(|chapter| ChapterId::parse(chapter.as_ref()))
        .collect::<Vec<_>>();

    let mut widths: HashMap<&str, usize> = HashMap::new();
    for chapter in &parsed {
        let width = widths.entry(chapter.primary.as_str()).or_insert(0);
        *width = (*width).max(chapter.secondary_len());
    }

    parsed
        .iter()
        .zip(context)
        .map(|(chapter, context)| match chapter.secondary.as_deref() {
            Some("") => {
                tracing::warn!(
                    chapter = %chapter,
                    file = context.as_ref(),
                    "trailing \".\" in chapter number"
                );
                ChapterId {
                    primary: chapter.primary.clone(),
                    secondary: None,
                }
            }
            Some(secondary) => {
                let width = widths.get(chapter.primary.as_str()).copied().unwrap_or(0);
                ChapterId {
                    primary: chapter.primary.clone(),
                    secondary: Some(format!("{secondary:0>width$}")),
                }
            }
            None => chapter.clone(),
        })
        .collect()
}
