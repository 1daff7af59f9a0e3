//! GitHub contents API store.
//!
//! | Operation | Request                                              |
//! |-----------|------------------------------------------------------|
//! | list      | `GET  /repos/{repo}/git/trees/{branch}:{dir}`        |
//! | read      | `GET  /repos/{repo}/contents/{path}?ref={branch}`    |
//! | large read| `GET  /repos/{repo}/git/blobs/{sha}`                 |
//! | create    | `PUT  /repos/{repo}/contents/{path}` without `sha`   |
//! | update    | `PUT  /repos/{repo}/contents/{path}` with `sha`      |
//! | delete    | `DELETE /repos/{repo}/contents/{path}` with `sha`    |
//!
//! Every mutation is a commit on `branch`. A stale `sha` answers 409; a create
//! over an existing file answers 422 ("sha wasn't supplied"). Both surface as
//! [`StoreError::Conflict`].
//!
//! Listing goes through the trees API because the contents API stops at 1000
//! entries per directory. A tree answer flagged `truncated` is an error.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;

use gallery_core::config::GitHubConfig;
use gallery_core::types::join_path;
use gallery_core::{ChangeToken, ConfigError, ObjectStore, StoreEntry, StoreError, Versioned};

pub struct GitHubStore {
    agent: ureq::Agent,
    api_base: String,
    repo: String,
    branch: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Tree {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

/// `path` is relative to the listed tree, so for a non-recursive listing it
/// is the bare file name.
#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct BlobContent {
    content: String,
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenFile,
}

#[derive(Debug, Deserialize)]
struct WrittenFile {
    sha: String,
}

impl GitHubStore {
    pub fn new(
        api_base: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("gallery-sync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &GitHubConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            &config.api_base,
            &config.repo,
            &config.branch,
            config.token()?,
            config.timeout(),
        ))
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repo,
            encode_path(path)
        )
    }

    fn tree_url(&self, dir: &str) -> String {
        format!(
            "{}/repos/{}/git/trees/{}:{}",
            self.api_base,
            self.repo,
            urlencoding::encode(&self.branch),
            encode_path(dir)
        )
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28")
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        path: &str,
    ) -> Result<Option<T>, StoreError> {
        self.get_optional(self.request("GET", url).query("ref", &self.branch), url, path)
    }

    fn get_optional<T: serde::de::DeserializeOwned>(
        &self,
        req: ureq::Request,
        url: &str,
        path: &str,
    ) -> Result<Option<T>, StoreError> {
        match req.call() {
            Ok(resp) => decode(resp, path).map(Some),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(e) => Err(map_err(e, url)),
        }
    }

    fn read_blob(&self, sha: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        let url = format!("{}/repos/{}/git/blobs/{}", self.api_base, self.repo, sha);
        let resp = self
            .request("GET", &url)
            .call()
            .map_err(|e| map_err(e, &url))?;
        let blob: BlobContent = decode(resp, path)?;
        decode_base64(&blob.content, &blob.encoding, path)
    }

    fn write(
        &self,
        path: &str,
        bytes: &[u8],
        token: Option<&ChangeToken>,
        message: &str,
    ) -> Result<ChangeToken, StoreError> {
        let url = self.contents_url(path);
        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(bytes),
            "branch": self.branch,
        });
        if let Some(token) = token {
            body["sha"] = json!(token.0);
        }
        match self.request("PUT", &url).send_json(body) {
            Ok(resp) => {
                let written: WriteResponse = decode(resp, path)?;
                tracing::info!("committed {path}: {message}");
                Ok(ChangeToken(written.content.sha))
            }
            Err(ureq::Error::Status(409 | 422, _)) => Err(StoreError::Conflict {
                path: path.to_string(),
            }),
            Err(ureq::Error::Status(404, _)) if token.is_some() => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(map_err(e, &url)),
        }
    }
}

impl ObjectStore for GitHubStore {
    fn list(&self, dir: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let url = self.tree_url(dir);
        let tree: Tree = match self.get_optional(self.request("GET", &url), &url, dir)? {
            Some(tree) => tree,
            None => return Ok(vec![]),
        };
        if tree.truncated {
            return Err(StoreError::Decode {
                path: dir.to_string(),
                message: format!("listing truncated after {} entries", tree.tree.len()),
            });
        }
        let mut entries: Vec<StoreEntry> = tree
            .tree
            .into_iter()
            .filter(|item| item.kind == "blob" && !item.path.starts_with('.'))
            .map(|item| StoreEntry {
                path: join_path(dir.trim_start_matches('/'), &item.path),
                name: item.path,
                change_token: ChangeToken(item.sha),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Versioned<Vec<u8>>, StoreError> {
        let url = self.contents_url(path);
        let file: FileContent = match self.get_json(&url, path)? {
            Some(file) => file,
            None => return Ok(Versioned::Absent),
        };
        let value = if file.encoding == "none" {
            // Files over 1 MB come back without inline content.
            self.read_blob(&file.sha, path)?
        } else {
            decode_base64(&file.content, &file.encoding, path)?
        };
        Ok(Versioned::Found {
            value,
            token: ChangeToken(file.sha),
        })
    }

    fn create(&self, path: &str, bytes: &[u8], message: &str) -> Result<ChangeToken, StoreError> {
        self.write(path, bytes, None, message)
    }

    fn update(
        &self,
        path: &str,
        bytes: &[u8],
        token: &ChangeToken,
        message: &str,
    ) -> Result<ChangeToken, StoreError> {
        self.write(path, bytes, Some(token), message)
    }

    fn delete(&self, path: &str, token: &ChangeToken, message: &str) -> Result<(), StoreError> {
        let url = self.contents_url(path);
        let body = json!({
            "message": message,
            "sha": token.0,
            "branch": self.branch,
        });
        match self.request("DELETE", &url).send_json(body) {
            Ok(_) => {
                tracing::info!("committed {path}: {message}");
                Ok(())
            }
            Err(ureq::Error::Status(404, _)) => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            Err(ureq::Error::Status(409 | 422, _)) => Err(StoreError::Conflict {
                path: path.to_string(),
            }),
            Err(e) => Err(map_err(e, &url)),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(resp: ureq::Response, path: &str) -> Result<T, StoreError> {
    resp.into_json().map_err(|e| StoreError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn map_err(err: ureq::Error, url: &str) -> StoreError {
    match err {
        ureq::Error::Status(status, resp) => StoreError::Http {
            status,
            url: url.to_string(),
            body: resp.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(t) => StoreError::Transport(t.to_string()),
    }
}

/// GitHub wraps base64 payloads at 60 columns.
fn decode_base64(content: &str, encoding: &str, path: &str) -> Result<Vec<u8>, StoreError> {
    if encoding != "base64" {
        return Err(StoreError::Decode {
            path: path.to_string(),
            message: format!("unsupported content encoding '{encoding}'"),
        });
    }
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| StoreError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Percent-encode each path segment, keeping `/` separators.
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_path_keeps_separators_and_escapes_the_rest() {
        assert_eq!(encode_path("images/image00001.jpg"), "images/image00001.jpg");
        assert_eq!(encode_path("/.state/cursor"), ".state/cursor");
        assert_eq!(encode_path("images/my photo#1.jpg"), "images/my%20photo%231.jpg");
        assert_eq!(encode_path("images/été?.jpg"), "images/%C3%A9t%C3%A9%3F.jpg");
        assert_eq!(encode_path(""), "");
    }

    #[test]
    fn decode_base64_ignores_line_wrapping() {
        let wrapped = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(decode_base64(wrapped, "base64", "p").unwrap(), b"hello world");
        assert!(decode_base64("", "base64", "p").unwrap().is_empty());
    }

    #[test]
    fn decode_base64_rejects_other_encodings() {
        let err = decode_base64("abc", "utf-8", "p").unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }), "got: {err}");
    }

    #[test]
    fn contents_url_uses_repo_and_trims_base() {
        let store = GitHubStore::new(
            "https://api.github.com/",
            "someone/gallery",
            "main",
            "t",
            Duration::from_secs(5),
        );
        assert_eq!(
            store.contents_url("images/a.jpg"),
            "https://api.github.com/repos/someone/gallery/contents/images/a.jpg"
        );
    }

    #[test]
    fn tree_url_names_branch_and_directory() {
        let store = GitHubStore::new(
            "https://api.github.com",
            "someone/gallery",
            "feature/photos",
            "t",
            Duration::from_secs(5),
        );
        assert_eq!(
            store.tree_url("/images/"),
            "https://api.github.com/repos/someone/gallery/git/trees/feature%2Fphotos:images"
        );
    }

    #[test]
    fn tree_payload_deserializes() {
        let tree: Tree = serde_json::from_str(
            r#"{"sha":"t1","url":"u","tree":[
                {"path":"a.jpg","mode":"100644","type":"blob","sha":"abc","size":3},
                {"path":"sub","mode":"040000","type":"tree","sha":"def"}]}"#,
        )
        .unwrap();
        assert_eq!(tree.tree.len(), 2);
        assert_eq!(tree.tree[0].kind, "blob");
        assert_eq!(tree.tree[1].kind, "tree");
        assert!(!tree.truncated);
    }
}
