//! Opaque pagination cursors.
//!
//! A cursor is the URL-safe base64 form of `msg:<sequence id>`. Consumers must
//! treat it as opaque: equality and a round trip through [`encode`]/[`decode`]
//! are the only guarantees. The mapping is 1:1, so `decode` rejects any string
//! that is not exactly what `encode` would have produced.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, FeedResult};
use crate::ids::SequenceId;

const CURSOR_PREFIX: &str = "msg:";

/// An opaque pagination token.
#[derive(Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a client-supplied token. Nothing is validated until [`decode`].
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}

/// Encode a sequence id into its cursor.
pub fn encode(seq: SequenceId) -> Cursor {
    Cursor(URL_SAFE_NO_PAD.encode(format!("{CURSOR_PREFIX}{}", seq.get())))
}

/// Decode a cursor back into the sequence id it encodes.
pub fn decode(cursor: &Cursor) -> FeedResult<SequenceId> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.as_str())
        .map_err(|e| FeedError::invalid_cursor(format!("not base64: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| FeedError::invalid_cursor("payload is not utf-8"))?;
    let digits = text
        .strip_prefix(CURSOR_PREFIX)
        .ok_or_else(|| FeedError::invalid_cursor("unrecognized cursor kind"))?;
    let raw: u64 = digits
        .parse()
        .map_err(|_| FeedError::invalid_cursor("payload is not a sequence id"))?;
    let seq = SequenceId::new(raw)
        .ok_or_else(|| FeedError::invalid_cursor(format!("sequence id {raw} out of range")))?;

    // "+7" and "007" parse fine but are not canonical encodings.
    if encode(seq) != *cursor {
        return Err(FeedError::invalid_cursor("non-canonical encoding"));
    }
    Ok(seq)
}
