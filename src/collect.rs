//! Expansion of user links into the file codes to download.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::folder::enumerate_folder;
use crate::link::{LinkType, classify_link, parse_file_code, parse_folder_reference};
use crate::transport::HttpTransport;
use crate::types::FileCode;

/// File codes gathered from a list of links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedCodes {
    /// Codes in link order, folder contents in listing order.
    pub file_codes: Vec<FileCode>,
    /// Number of direct file links.
    pub direct_links: usize,
    /// Number of folder links.
    pub folders: usize,
}

impl CollectedCodes {
    /// Returns true if no file code was gathered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_codes.is_empty()
    }
}

/// Resolves links into file codes, enumerating folders through `client`.
///
/// # Errors
///
/// Fails on the first unrecognised link, and propagates folder listing
/// errors.
pub async fn collect_file_codes<T, I, S>(client: &Client<T>, links: I) -> Result<CollectedCodes>
where
    T: HttpTransport,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut collected = CollectedCodes::default();
    for link in links {
        let link = link.as_ref();
        match classify_link(link) {
            LinkType::DirectLink => {
                collected.file_codes.push(parse_file_code(link)?);
                collected.direct_links += 1;
            }
            LinkType::Folder => {
                let folder = parse_folder_reference(link)?;
                collected
                    .file_codes
                    .extend(enumerate_folder(client, &folder).await?);
                collected.folders += 1;
            }
            LinkType::Unknown => return Err(Error::InvalidLink(link.to_string())),
        }
    }
    Ok(collected)
}
