//! Classification of user-supplied Uptobox links.
//!
//! Two shapes are recognised:
//!
//! - direct file links, `https://uptobox.com/<file code>`
//! - shared folder links, `https://uptobox.com/user_public?hash=<hash>&folder=<folder>`

use reqwest::Url;

use crate::error::{Error, Result};
use crate::types::{FileCode, FolderReference};

/// Path of a shared folder page.
pub const FOLDER_PATH: &str = "/user_public";

/// Kind of link, as decided by [`classify_link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// Not an absolute URL.
    Unknown,
    /// Link to a single file.
    DirectLink,
    /// Link to a shared folder listing.
    Folder,
}

/// Classifies a link without touching the network.
#[must_use]
pub fn classify_link(link: &str) -> LinkType {
    let Ok(url) = Url::parse(link) else {
        return LinkType::Unknown;
    };
    if url.path() == FOLDER_PATH {
        LinkType::Folder
    } else {
        LinkType::DirectLink
    }
}

/// Extracts the file code from a direct link.
///
/// The code is the last non-empty path segment; the query string and any
/// trailing slashes are ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidLink`] if `link` is not an absolute URL or has no
/// path segment to use.
pub fn parse_file_code(link: &str) -> Result<FileCode> {
    let url = parse_absolute(link)?;
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(FileCode::from)
        .ok_or_else(|| Error::InvalidLink(link.to_string()))
}

/// Extracts the `(folder, hash)` pair from a shared folder link.
///
/// Both query parameters are read as-is; a missing one comes back empty.
///
/// # Errors
///
/// Returns [`Error::InvalidLink`] if `link` is not an absolute URL.
pub fn parse_folder_reference(link: &str) -> Result<FolderReference> {
    let url = parse_absolute(link)?;
    let mut folder = None;
    let mut hash = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "folder" if folder.is_none() => folder = Some(value.into_owned()),
            "hash" if hash.is_none() => hash = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(FolderReference::new(
        folder.unwrap_or_default(),
        hash.unwrap_or_default(),
    ))
}

fn parse_absolute(link: &str) -> Result<Url> {
    Url::parse(link).map_err(|_| Error::InvalidLink(link.to_string()))
}
