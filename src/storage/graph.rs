//! SharePoint storage through Microsoft Graph.
//!
//! Authentication uses the OAuth 2.0 client-credentials grant against
//! Microsoft Entra ID. The token is cached until shortly before it expires
//! and the site id is resolved once per [`GraphStorage`], so uploading N
//! artifacts costs N uploads plus one folder walk per distinct folder rather
//! than N token and site lookups.
//!
//! All paths are relative to `document_library`, a folder in the site's
//! default drive:
//!
//! ```text
//! GET  /sites/{host}:/{site_path}                         → site id
//! GET  /sites/{id}/drive/root:/{library}/{folder}         → 200 exists / 404 missing
//! POST /sites/{id}/drive/root:/{parent}:/children         → create folder
//! PUT  /sites/{id}/drive/root:/{library}/{folder}/{file}:/content
//! ```

use super::{check_filename, path_segments, RemoteStorage, StorageError};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Refresh the token this long before it actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Connection settings for [`GraphStorage`].
#[derive(Clone)]
pub struct GraphStorageConfig {
    /// Entra ID tenant.
    pub tenant_id: String,
    /// App registration client id.
    pub client_id: String,
    /// App registration client secret.
    pub client_secret: String,
    /// Site URL, e.g. `https://contoso.sharepoint.com`. Only the host is used.
    pub site_url: String,
    /// Server-relative site path, e.g. `/sites/Automation/Prime`. Empty for the root site.
    pub site_path: String,
    /// Folder in the site's default drive that holds all targets. Default: `Files`.
    pub document_library: String,
    /// Default: `https://graph.microsoft.com/v1.0`.
    pub graph_base_url: String,
    /// Default: `https://login.microsoftonline.com`.
    pub login_base_url: String,
    /// Per-request timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,
}

impl GraphStorageConfig {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        site_url: impl Into<String>,
        site_path: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            site_url: site_url.into(),
            site_path: site_path.into(),
            document_library: "Files".to_string(),
            graph_base_url: GRAPH_BASE_URL.to_string(),
            login_base_url: LOGIN_BASE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }

    pub fn document_library(mut self, library: impl Into<String>) -> Self {
        self.document_library = library.into();
        self
    }
}

impl fmt::Debug for GraphStorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStorageConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("site_url", &self.site_url)
            .field("site_path", &self.site_path)
            .field("document_library", &self.document_library)
            .field("graph_base_url", &self.graph_base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItemResponse {
    #[serde(default)]
    web_url: Option<String>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

/// SharePoint document-library backend.
pub struct GraphStorage {
    config: GraphStorageConfig,
    client: reqwest::Client,
    graph_base: Url,
    token: Mutex<Option<CachedToken>>,
    site_id: OnceCell<String>,
}

impl GraphStorage {
    /// Create a backend. No network call is made until the first operation.
    pub fn new(config: GraphStorageConfig) -> Result<Self, StorageError> {
        let graph_base = Url::parse(&config.graph_base_url).map_err(|e| {
            StorageError::InvalidPath(format!("{}: {e}", config.graph_base_url))
        })?;
        if graph_base.cannot_be_a_base() {
            return Err(StorageError::InvalidPath(config.graph_base_url.clone()));
        }
        site_host(&config.site_url)?;

        let builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        // Unit tests talk to a loopback stub.
        #[cfg(test)]
        let builder = builder.no_proxy();
        let client = builder.build()?;

        Ok(Self {
            config,
            client,
            graph_base,
            token: Mutex::new(None),
            site_id: OnceCell::new(),
        })
    }

    /// Acquire (or reuse) an app-only access token for Microsoft Graph.
    async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.login_base_url.trim_end_matches('/'),
            self.config.tenant_id
        );
        debug!("Requesting Graph access token for tenant {}", self.config.tenant_id);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| StorageError::AuthFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::AuthFailed(e.to_string()))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(StorageError::AuthFailed(reason));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| StorageError::AuthFailed(format!("malformed token response: {e}")))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));

        let value = token.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    /// Resolve the site id once.
    async fn site_id(&self) -> Result<&str, StorageError> {
        let id = self
            .site_id
            .get_or_try_init(|| async {
                let url = site_lookup_url(&self.graph_base, &self.config)?;
                let token = self.access_token().await?;
                let response = self.client.get(url).bearer_auth(&token).send().await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(StorageError::UnexpectedResponse(format!(
                        "failed to get site id: HTTP {status} - {body}"
                    )));
                }
                let site: SiteResponse = response.json().await.map_err(|e| {
                    StorageError::UnexpectedResponse(format!("malformed site response: {e}"))
                })?;
                info!("Resolved SharePoint site id {}", site.id);
                Ok::<_, StorageError>(site.id)
            })
            .await?;
        Ok(id.as_str())
    }

    /// Library-relative folder path as segments, library first.
    fn full_segments<'a>(&'a self, folder: &'a str) -> Result<Vec<&'a str>, StorageError> {
        let mut segments = path_segments(&self.config.document_library)?;
        segments.extend(path_segments(folder)?);
        if segments.is_empty() {
            return Err(StorageError::InvalidPath(folder.to_string()));
        }
        Ok(segments)
    }

    /// `true` if the item exists, `false` on 404.
    async fn item_exists(
        &self,
        site_id: &str,
        token: &str,
        segments: &[&str],
    ) -> Result<bool, StorageError> {
        let url = drive_item_url(&self.graph_base, site_id, segments, None)?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::FolderUnavailable {
                    folder: segments.join("/"),
                    reason: format!("HTTP {s} - {body}"),
                })
            }
        }
    }

    async fn create_folder(
        &self,
        site_id: &str,
        token: &str,
        parent: &[&str],
        name: &str,
    ) -> Result<(), StorageError> {
        let url = drive_item_url(&self.graph_base, site_id, parent, Some("children"))?;
        let payload = serde_json::json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                info!("Created folder '{}' in '{}'", name, parent.join("/"));
                Ok(())
            }
            // Created concurrently by someone else
            StatusCode::CONFLICT => Ok(()),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::FolderUnavailable {
                    folder: format!("{}/{}", parent.join("/"), name),
                    reason: format!("HTTP {s} - {body}"),
                })
            }
        }
    }
}

#[async_trait]
impl RemoteStorage for GraphStorage {
    fn describe(&self) -> String {
        format!(
            "SharePoint {}{} ({})",
            self.config.site_url.trim_end_matches('/'),
            self.config.site_path,
            self.config.document_library
        )
    }

    async fn ensure_folder(&self, folder: &str) -> Result<(), StorageError> {
        let segments = self.full_segments(folder)?;
        let site_id = self.site_id().await?;
        let token = self.access_token().await?;

        if self.item_exists(site_id, &token, &segments).await? {
            return Ok(());
        }

        warn!(
            "Folder '{}' not found. Attempting to create...",
            segments.join("/")
        );
        for depth in 1..=segments.len() {
            let path = &segments[..depth];
            if self.item_exists(site_id, &token, path).await? {
                continue;
            }
            let (name, parent) = match path.split_last() {
                Some(split) => split,
                None => continue,
            };
            self.create_folder(site_id, &token, parent, name).await?;
        }
        Ok(())
    }

    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        check_filename(filename)?;
        let mut segments = self.full_segments(folder)?;
        segments.push(filename);

        let site_id = self.site_id().await?;
        let token = self.access_token().await?;
        let url = drive_item_url(&self.graph_base, site_id, &segments, Some("content"))?;

        let response = self
            .client
            .put(url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }

        let item: Option<DriveItemResponse> = response.json().await.ok();
        Ok(item
            .and_then(|i| i.web_url)
            .unwrap_or_else(|| segments.join("/")))
    }
}

// ── URL helpers ──────────────────────────────────────────────────────────

fn site_host(site_url: &str) -> Result<String, StorageError> {
    Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| StorageError::InvalidPath(format!("invalid site URL '{site_url}'")))
}

/// `/sites/{host}:/{site_path}`, or `/sites/{host}` for the root site.
fn site_lookup_url(base: &Url, config: &GraphStorageConfig) -> Result<Url, StorageError> {
    let host = site_host(&config.site_url)?;
    let site_path = path_segments(&config.site_path)?;

    let mut url = base.clone();
    {
        let mut segs = url
            .path_segments_mut()
            .map_err(|_| StorageError::InvalidPath(base.to_string()))?;
        segs.pop_if_empty().push("sites");
        if site_path.is_empty() {
            segs.push(&host);
        } else {
            segs.push(&format!("{host}:"));
            segs.extend(site_path);
        }
    }
    Ok(url)
}

/// `/sites/{id}/drive/root:/{path}[:/{action}]`, or `/sites/{id}/drive/root[/{action}]`
/// when `path` is empty.
fn drive_item_url(
    base: &Url,
    site_id: &str,
    path: &[&str],
    action: Option<&str>,
) -> Result<Url, StorageError> {
    let mut url = base.clone();
    {
        let mut segs = url
            .path_segments_mut()
            .map_err(|_| StorageError::InvalidPath(base.to_string()))?;
        segs.pop_if_empty().extend(["sites", site_id, "drive"]);

        match path.split_last() {
            None => {
                segs.push("root");
                if let Some(action) = action {
                    segs.push(action);
                }
            }
            Some((last, init)) => {
                segs.push("root:");
                segs.extend(init);
                match action {
                    Some(action) => {
                        segs.push(&format!("{last}:"));
                        segs.push(action);
                    }
                    None => {
                        segs.push(last);
                    }
                }
            }
        }
    }
    Ok(url)
}
