//! Decoding of the `{statusCode, message, data}` envelope wrapping every
//! Uptobox API response.
//!
//! The service reports most outcomes on the envelope's status code rather
//! than through HTTP statuses, and several of those codes mean "keep going"
//! rather than failure. [`decode`] only separates those from fatal codes;
//! what `data` means is left to the calling operation.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Status codes the decoder knows by name.
pub mod status {
    /// Success.
    pub const SUCCESS: i64 = 0;
    /// Invalid parameter, such as an unknown file code.
    pub const INVALID_PARAMETER: i64 = 7;
    /// A waiting token was issued; wait before using it.
    pub const WAITING_NEEDED: i64 = 16;
    /// The requested change was already in effect.
    pub const DATA_UNCHANGED: i64 = 17;
    /// Permission check passed.
    pub const PERMISSION_GRANTED: i64 = 28;
    /// A new download link cannot be generated yet.
    pub const MUST_WAIT_FOR_NEW_LINK: i64 = 39;
}

/// Codes treated as non-errors.
const SUCCESS_CODES: [i64; 5] = [
    status::SUCCESS,
    status::WAITING_NEEDED,
    status::DATA_UNCHANGED,
    status::PERMISSION_GRANTED,
    status::MUST_WAIT_FOR_NEW_LINK,
];

/// How the decoder classifies an envelope status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Success or a success-equivalent intermediate state.
    Success,
    /// Anything else.
    Fatal,
}

impl StatusClass {
    /// Classifies a raw status code.
    #[must_use]
    pub fn of(code: i64) -> Self {
        if SUCCESS_CODES.contains(&code) {
            Self::Success
        } else {
            Self::Fatal
        }
    }
}

/// The universal response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Service status code.
    #[serde(rename = "statusCode")]
    pub status_code: i64,
    /// Short status description.
    #[serde(default)]
    pub message: String,
    /// Operation-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl ResponseEnvelope {
    /// Parses an envelope from a raw body, tolerating trailing commas.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Decode`] if the body is not JSON or lacks a
    /// status code.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let cleaned = strip_trailing_commas(body);
        Ok(serde_json::from_slice(&cleaned)?)
    }

    /// Returns the status class of this envelope.
    #[must_use]
    pub fn class(&self) -> StatusClass {
        StatusClass::of(self.status_code)
    }

    /// Consumes the envelope, yielding `data` for success-class codes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Client`] for fatal codes. The message is
    /// `data` itself when it is a string.
    pub fn into_data(self) -> Result<Value> {
        match self.class() {
            StatusClass::Success => Ok(self.data),
            StatusClass::Fatal => Err(match self.data {
                Value::String(message) => ClientError::new(self.status_code, message),
                _ => ClientError::unexpected_status(self.status_code),
            }
            .into()),
        }
    }
}

/// Decodes a raw response body into its `data` payload.
///
/// # Errors
///
/// Returns a decode error for malformed bodies and a client error for fatal
/// status codes.
pub fn decode(body: &[u8]) -> Result<Value> {
    ResponseEnvelope::parse(body)?.into_data()
}

/// Removes commas directly followed (modulo whitespace) by `}` or `]`.
///
/// String literals are left untouched.
fn strip_trailing_commas(body: &[u8]) -> Cow<'_, [u8]> {
    if !body.contains(&b',') {
        return Cow::Borrowed(body);
    }

    let mut out = Vec::with_capacity(body.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in body.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            out.push(byte);
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b',' => {
                let next = body[i + 1..]
                    .iter()
                    .find(|b| !b.is_ascii_whitespace());
                if matches!(next, Some(b'}' | b']')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(byte);
    }

    Cow::Owned(out)
}
