//! Telegram Bot API transport.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use gallery_core::config::FeedConfig;
use gallery_core::{AttachmentRef, ConfigError, FeedError, FeedItem, FeedSource};

use crate::parse::parse_updates;

/// Refuse downloads larger than this; Telegram bots cannot fetch files over
/// 20 MB anyway.
const MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

pub struct TelegramFeed {
    api: ureq::Agent,
    download: ureq::Agent,
    api_base: String,
    token: String,
    chat_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    file_path: Option<String>,
}

impl TelegramFeed {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: Option<i64>,
        timeout: Duration,
        download_timeout: Duration,
    ) -> Self {
        Self {
            api: ureq::AgentBuilder::new().timeout(timeout).build(),
            download: ureq::AgentBuilder::new().timeout(download_timeout).build(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            &config.api_base,
            config.token()?,
            config.chat_id,
            config.timeout(),
            config.download_timeout(),
        ))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.token)
    }

    fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let url = self.method_url(method);
        let mut req = self.api.get(&url);
        for (k, v) in query {
            req = req.query(k, v);
        }
        let resp = req.call().map_err(|e| self.map_err(e, method))?;
        let body: ApiResponse<T> = resp
            .into_json()
            .map_err(|e| FeedError::Validation(format!("{method}: {e}")))?;
        if !body.ok {
            return Err(FeedError::Api(format!(
                "{method}: {}",
                body.description.unwrap_or_else(|| "request failed".into())
            )));
        }
        body.result
            .ok_or_else(|| FeedError::Validation(format!("{method}: response has no result")))
    }

    /// Never let the bot token leak into error messages.
    fn redact(&self, s: &str) -> String {
        s.replace(&self.token, "<token>")
    }

    fn map_err(&self, err: ureq::Error, what: &str) -> FeedError {
        match err {
            ureq::Error::Status(status, resp) => FeedError::Http {
                status,
                url: what.to_string(),
                body: self.redact(&resp.into_string().unwrap_or_default()),
            },
            ureq::Error::Transport(t) => FeedError::Transport(self.redact(&t.to_string())),
        }
    }
}

impl FeedSource for TelegramFeed {
    fn poll(&self, since: Option<u64>) -> Result<Vec<FeedItem>, FeedError> {
        let updates: Vec<Value> = self.call("getUpdates", &updates_query(since))?;
        let items = parse_updates(&updates, since, self.chat_id);
        tracing::info!(
            "polled {} update(s) since {}",
            items.len(),
            since.map_or_else(|| "the beginning".to_string(), |c| c.to_string())
        );
        Ok(items)
    }

    fn fetch(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, FeedError> {
        let file: TgFile = self.call("getFile", &[("file_id", attachment.remote_id.clone())])?;
        let file_path = file.file_path.ok_or_else(|| {
            FeedError::Validation(format!("getFile for {} has no file_path", attachment.remote_id))
        })?;

        let resp = self
            .download
            .get(&self.file_url(&file_path))
            .call()
            .map_err(|e| self.map_err(e, "file download"))?;
        let mut bytes = Vec::new();
        resp.into_reader()
            .take(MAX_DOWNLOAD_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| FeedError::Transport(format!("reading {file_path}: {e}")))?;
        if bytes.len() as u64 > MAX_DOWNLOAD_BYTES {
            return Err(FeedError::Validation(format!(
                "{file_path} exceeds {MAX_DOWNLOAD_BYTES} bytes"
            )));
        }
        tracing::debug!("downloaded {file_path} ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

/// `getUpdates` parameters: never block, start just past the cursor.
fn updates_query(since: Option<u64>) -> Vec<(&'static str, String)> {
    let mut query = vec![("timeout", "0".to_string())];
    if let Some(since) = since {
        query.push(("offset", since.saturating_add(1).to_string()));
    }
    query
}
