//! Static file mount.
//!
//! # Responsibilities
//! - Claim every HTTP path under the URL prefix before route lookup
//! - Map the remainder of the path onto the mounted directory
//! - Answer with the file bytes or a plain 404
//!
//! # Design Decisions
//! - Prefix match is a plain string prefix test, so `/staticfoo` is claimed
//!   by a `/static` mount
//! - Only normal path components are accepted; `..`, root, and drive
//!   components resolve to "File Not Found"

pub mod mime;

use std::path::{Component, Path, PathBuf};

use crate::protocol::{Outbound, OutboundEvent, ProtocolError};

const NOT_FOUND: &str = "File Not Found";

/// URL prefix mapped onto a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMount {
    url_prefix: String,
    directory: PathBuf,
}

impl Default for StaticMount {
    fn default() -> Self {
        Self::new("/static", "static")
    }
}

impl StaticMount {
    pub fn new(url_prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            directory: directory.into(),
        }
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether requests for `path` are answered by this mount.
    pub fn claims(&self, path: &str) -> bool {
        path.starts_with(&self.url_prefix)
    }

    /// File path for a claimed request path. `None` if unclaimed or if the
    /// remainder tries to leave the directory.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let rest = path.strip_prefix(&self.url_prefix)?.trim_start_matches('/');
        let mut file = self.directory.clone();
        for component in Path::new(rest).components() {
            match component {
                Component::Normal(part) => file.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(file)
    }

    /// Answer a claimed request. Returns the status sent.
    pub async fn serve(&self, path: &str, outbound: &Outbound) -> Result<u16, ProtocolError> {
        let content = match self.resolve(path) {
            Some(file) => read_file(&file).await.map(|bytes| (file, bytes)),
            None => None,
        };

        let Some((file, bytes)) = content else {
            tracing::debug!(path = %path, "Static file not found");
            outbound.send(OutboundEvent::start(404, "text/plain")).await?;
            outbound.send(OutboundEvent::body(NOT_FOUND)).await?;
            return Ok(404);
        };

        tracing::trace!(path = %path, file = %file.display(), bytes = bytes.len(), "Serving static file");
        outbound
            .send(OutboundEvent::ResponseStart {
                status: 200,
                headers: vec![
                    ("content-type".to_string(), mime::lookup(&file).to_string()),
                    ("content-length".to_string(), bytes.len().to_string()),
                ],
            })
            .await?;
        outbound.send(OutboundEvent::body(bytes)).await?;
        Ok(200)
    }
}

async fn read_file(file: &Path) -> Option<Vec<u8>> {
    let metadata = tokio::fs::metadata(file).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    tokio::fs::read(file).await.ok()
}
