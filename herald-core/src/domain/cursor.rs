//! Long polling cursor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Opaque continuation token handed out by the review server
///
/// The server sends the timestamp either as a JSON number or as a string.
/// The raw text is kept verbatim so the next request echoes back exactly
/// what was received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Creates a cursor from its raw textual form
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw value sent as the `timestamp` query parameter
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets a numeric cursor as Unix seconds
    ///
    /// Only meant for log output; the relay never relies on the cursor
    /// being a timestamp.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        let secs: f64 = self.0.parse().ok()?;
        if !secs.is_finite() {
            return None;
        }

        let whole = secs.trunc();
        let nanos = ((secs - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCursor {
    Number(serde_json::Number),
    Text(String),
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match RawCursor::deserialize(deserializer)? {
            RawCursor::Number(n) => n.to_string(),
            RawCursor::Text(s) => s,
        };
        Ok(Self(raw))
    }
}
