//! Enumeration of shared folders.

use crate::client::Client;
use crate::error::Result;
use crate::transport::HttpTransport;
use crate::types::{FileCode, FolderReference};

/// Number of entries requested per listing page.
pub const PAGE_SIZE: usize = 100;

/// Lists every file code in a shared folder, in server order.
///
/// Pages are requested at offsets 0, 100, 200, … until the first empty page.
/// Codes are not deduplicated.
///
/// # Errors
///
/// Any page failure aborts the enumeration; no partial result is returned.
pub async fn enumerate_folder<T: HttpTransport>(
    client: &Client<T>,
    folder: &FolderReference,
) -> Result<Vec<FileCode>> {
    let mut file_codes = Vec::new();
    let mut offset = 0;
    loop {
        let page = client.list_folder_page(folder, PAGE_SIZE, offset).await?;
        if page.is_empty() {
            break;
        }
        log::debug!(
            "Folder {}: {} entries at offset {offset}",
            folder.folder,
            page.len()
        );
        file_codes.extend(page.into_iter().map(|item| item.file_code));
        offset += PAGE_SIZE;
    }
    log::info!("Folder {} lists {} file(s)", folder.folder, file_codes.len());
    Ok(file_codes)
}
