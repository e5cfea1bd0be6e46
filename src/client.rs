//! Typed wrapper around the Uptobox HTTP API.

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::envelope;
use crate::error::{ClientError, Error, Result};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{FileCode, FileInfo, FolderPage, FolderReference, RemoteList, WaitingToken};

const LINK_PATH: &str = "link";
const FILE_INFO_PATH: &str = "link/info";
const FOLDER_PATH: &str = "user/public";

/// Client for the Uptobox API.
///
/// Owns its transport; tests substitute a fake one through
/// [`Client::with_transport`].
pub struct Client<T: HttpTransport = ReqwestTransport> {
    transport: T,
    base_url: Url,
    user_token: String,
}

impl Client<ReqwestTransport> {
    /// Creates a client from API configuration using a pooled reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if no user token is configured, the base address is
    /// invalid, or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("no Uptobox user token configured".to_string()))?;
        let transport = ReqwestTransport::new(config.timeout())?;
        Self::with_transport(transport, &config.base_url(), token)
    }
}

impl<T: HttpTransport> Client<T> {
    /// Creates a client with a custom transport.
    ///
    /// `base_url` is `scheme://hostname`; API calls go to `api/<operation>`
    /// below it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `base_url` is not an absolute URL.
    pub fn with_transport(transport: T, base_url: &str, user_token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base address {base_url}: {e}")))?;
        Ok(Self {
            transport,
            base_url,
            user_token: user_token.into(),
        })
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Requests a waiting token for `file_code`.
    ///
    /// A token without a delay can be used right away. Otherwise the caller
    /// must wait and, if no token was issued, ask again; see
    /// [`crate::WaitingTokenOrchestrator`].
    ///
    /// # Errors
    ///
    /// Returns a client error for fatal statuses (e.g. unknown file code) and
    /// a transport-class error for network or decoding failures.
    pub async fn get_waiting_token(
        &self,
        file_code: &FileCode,
        password: Option<&str>,
    ) -> Result<WaitingToken> {
        let mut params = vec![("token", self.user_token.as_str()), ("file_code", file_code.as_str())];
        if let Some(password) = password {
            params.push(("password", password));
        }
        self.get_as(LINK_PATH, &params).await
    }

    /// Exchanges a waiting token for the direct download URL of `file_code`.
    ///
    /// # Errors
    ///
    /// Returns a client error for fatal statuses or when `dlLink` is missing
    /// or not an absolute URL.
    pub async fn get_download_link(
        &self,
        file_code: &FileCode,
        waiting_token: &WaitingToken,
    ) -> Result<Url> {
        let params = [
            ("token", self.user_token.as_str()),
            ("file_code", file_code.as_str()),
            ("waitingToken", waiting_token.token.as_deref().unwrap_or_default()),
        ];
        let data = self.get(LINK_PATH, &params).await?;
        let link = data
            .get("dlLink")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::invalid_payload("response has no download link"))?;
        Url::parse(link)
            .map_err(|e| ClientError::invalid_payload(format!("invalid download link {link}: {e}")).into())
    }

    /// Fetches one page of a shared folder listing.
    ///
    /// An empty page is a valid result and marks the end of the listing.
    ///
    /// # Errors
    ///
    /// Returns a client error for fatal statuses and a transport-class error
    /// for network or decoding failures.
    pub async fn list_folder_page(
        &self,
        folder: &FolderReference,
        limit: usize,
        offset: usize,
    ) -> Result<FolderPage> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let params = [
            ("folder", folder.folder.as_str()),
            ("hash", folder.hash.as_str()),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];
        let page: RemoteList<_> = self.get_as(FOLDER_PATH, &params).await?;
        Ok(page.list)
    }

    /// Fetches name and size for a batch of file codes.
    ///
    /// # Errors
    ///
    /// Returns a client error for fatal statuses and a transport-class error
    /// for network or decoding failures.
    pub async fn get_file_info(&self, file_codes: &[FileCode]) -> Result<Vec<FileInfo>> {
        let codes = file_codes
            .iter()
            .map(FileCode::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let params = [("token", self.user_token.as_str()), ("fileCodes", codes.as_str())];
        let infos: RemoteList<_> = self.get_as(FILE_INFO_PATH, &params).await?;
        Ok(infos.list)
    }

    /// Builds `<base>/api/<path>?<params>`, keeping parameter order.
    fn api_url(&self, path: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("api/{path}"));
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        url
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.api_url(path, params);
        log::debug!("Getting uri: {}", redact_token(&url));
        let body = self.transport.get(&url).await?;
        log::debug!("Response body: {}", String::from_utf8_lossy(&body));
        envelope::decode(&body)
    }

    async fn get_as<R: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<R> {
        let data = self.get(path, params).await?;
        serde_json::from_value(data).map_err(|e| {
            Error::from(ClientError::invalid_payload(format!(
                "unexpected {path} payload: {e}"
            )))
        })
    }
}

/// Replaces the user token in a URL for logging.
fn redact_token(url: &Url) -> Url {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }
    redacted
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport shared by the client-level tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::Url;

    use crate::error::{Error, Result};
    use crate::transport::HttpTransport;

    /// Replays canned bodies in order and records every requested URL.
    #[derive(Default)]
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<Bytes>>>,
        requests: Mutex<Vec<Url>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, body: impl Into<String>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(Bytes::from(body.into())));
            self
        }

        pub fn fail(self, message: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(Error::Transport(message.to_string())));
            self
        }

        pub fn requests(&self) -> Vec<Url> {
            self.requests.lock().unwrap().clone()
        }

        pub fn query(&self, index: usize, key: &str) -> Option<String> {
            self.requests()
                .get(index)?
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn get(&self, url: &Url) -> Result<Bytes> {
            self.requests.lock().unwrap().push(url.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport(format!("unexpected request {url}"))))
        }
    }

    pub fn envelope(status_code: i64, data: &serde_json::Value) -> String {
        serde_json::json!({
            "statusCode": status_code,
            "message": "",
            "data": data,
        })
        .to_string()
    }

    pub fn client(transport: MockTransport) -> crate::Client<MockTransport> {
        crate::Client::with_transport(transport, "http://mocked", "userToken").unwrap()
    }
}
