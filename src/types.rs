//! Value types exchanged with the Uptobox API.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a single hosted file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileCode(String);

impl FileCode {
    /// Wraps a raw file code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for FileCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl AsRef<str> for FileCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `(folder, hash)` pair identifying a shared folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderReference {
    /// Folder identifier.
    pub folder: String,
    /// Folder access hash.
    pub hash: String,
}

impl FolderReference {
    /// Creates a folder reference.
    #[must_use]
    pub fn new(folder: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            hash: hash.into(),
        }
    }
}

/// Result of a waiting-token request.
///
/// A missing token means the caller has to wait `delay` seconds and ask
/// again. A zero delay means the token can be used right away.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WaitingToken {
    /// Seconds to wait before the token (or a new request) is usable.
    #[serde(rename = "waiting", default)]
    pub delay: u64,
    /// Token to pass to the download-link request.
    #[serde(rename = "waitingToken", default)]
    pub token: Option<String>,
}

impl WaitingToken {
    /// Returns `true` when the token can be used without waiting.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.delay == 0 && self.token.is_some()
    }

    /// Server delay plus a one second margin for clock skew.
    #[must_use]
    pub const fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.delay.saturating_add(1))
    }
}

/// One entry of a shared folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FolderItem {
    /// Display name of the file.
    pub file_name: String,
    /// File code of the entry.
    pub file_code: FileCode,
}

/// One page of a shared folder listing, in server order.
pub type FolderPage = Vec<FolderItem>;

/// Metadata returned by the file-info request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileInfo {
    /// File code the entry describes.
    pub file_code: FileCode,
    /// File name, absent when the code is unknown to the service.
    #[serde(default)]
    pub file_name: Option<String>,
    /// File size in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Per-file error message, set when the code could not be resolved.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Wrapper for payloads shaped as `{"list": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RemoteList<T> {
    pub list: Vec<T>,
}
