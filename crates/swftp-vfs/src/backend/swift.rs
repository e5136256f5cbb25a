//! OpenStack Swift backend over HTTP.
//!
//! A [`SwiftClient`] is one authenticated backend session: a storage URL,
//! a token, and a handle to the process-wide [`HttpPool`]. It speaks the
//! Swift v1 REST API (JSON listings, `X-Copy-From` server-side copy,
//! chunked PUT, streamed GET).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, LAST_MODIFIED};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::{debug, info};

use super::error::{BackendError, BackendResult};
use super::pool::{HttpPool, PoolPermit};
use super::types::{ByteStream, ContainerRecord, ListQuery, ListingEntry, ObjectRecord};
use super::ObjectStore;

const AUTH_TOKEN: &str = "X-Auth-Token";
const STORAGE_URL: &str = "X-Storage-Url";
const COPY_FROM: &str = "X-Copy-From";
const CONTAINER_OBJECT_COUNT: &str = "X-Container-Object-Count";
const CONTAINER_BYTES_USED: &str = "X-Container-Bytes-Used";

/// Perform the Swift v1.0 token exchange.
///
/// Sends `X-Auth-User`/`X-Auth-Key` to `auth_url` and builds a session from
/// the returned `X-Storage-Url` and `X-Auth-Token`.
pub async fn authenticate_v1(
    pool: &HttpPool,
    auth_url: &str,
    user: &str,
    key: &str,
) -> BackendResult<SwiftClient> {
    let url = Url::parse(auth_url)
        .map_err(|e| BackendError::transport(format!("invalid auth url {}: {}", auth_url, e)))?;
    let _permit = pool.acquire(&host_key(&url)).await?;

    let response = pool
        .client()
        .get(url)
        .header("X-Auth-User", user)
        .header("X-Auth-Key", key)
        .send()
        .await?;
    if let Some(err) = BackendError::from_status(response.status().as_u16(), auth_url) {
        return Err(err);
    }

    let headers = response.headers();
    let storage_url = header_str(headers, STORAGE_URL)
        .ok_or_else(|| BackendError::transport("auth response missing X-Storage-Url"))?;
    let token = header_str(headers, AUTH_TOKEN)
        .ok_or_else(|| BackendError::transport("auth response missing X-Auth-Token"))?;

    info!(user, storage_url, "authenticated");
    SwiftClient::new(pool.clone(), storage_url, token)
}

/// Authenticated Swift session.
#[derive(Debug, Clone)]
pub struct SwiftClient {
    pool: HttpPool,
    storage_url: Url,
    host: String,
    token: String,
}

/// Container row of a JSON account listing.
#[derive(Debug, Deserialize)]
struct WireContainer {
    name: String,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    bytes: u64,
    #[serde(default)]
    last_modified: Option<String>,
}

/// Row of a JSON container listing: either an object or a rolled-up prefix.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireEntry {
    Subdir {
        subdir: String,
    },
    Object {
        name: String,
        #[serde(default)]
        bytes: u64,
        #[serde(default)]
        content_type: String,
        #[serde(default)]
        last_modified: Option<String>,
    },
}

impl From<WireEntry> for ListingEntry {
    fn from(wire: WireEntry) -> Self {
        match wire {
            WireEntry::Subdir { subdir } => ListingEntry::Subdir(subdir),
            WireEntry::Object {
                name,
                bytes,
                content_type,
                last_modified,
            } => ListingEntry::Object(ObjectRecord {
                name,
                bytes,
                content_type,
                last_modified: last_modified.as_deref().and_then(parse_listing_time),
            }),
        }
    }
}

/// Parse the listing timestamp format, e.g. `2013-03-11T20:34:12.123456`.
/// Swift reports it in UTC without an offset.
fn parse_listing_time(s: &str) -> Option<f64> {
    let parsed = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    let utc = parsed.and_utc();
    Some(utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_micros()) / 1_000_000.0)
}

/// Parse a `Last-Modified` header (RFC 2822 date).
fn parse_http_time(s: &str) -> Option<f64> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|t| t.timestamp() as f64)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_u64(headers: &HeaderMap, name: impl reqwest::header::AsHeaderName) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn host_key(url: &Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}

/// Percent-encode one path segment of a key (slashes stay literal).
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|seg| {
            seg.bytes()
                .map(|b| match b {
                    b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                        (b as char).to_string()
                    }
                    _ => format!("%{:02X}", b),
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn query_pairs(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("format", "json".to_string())];
    if let Some(prefix) = &query.prefix {
        pairs.push(("prefix", prefix.clone()));
    }
    if let Some(delimiter) = query.delimiter {
        pairs.push(("delimiter", delimiter.to_string()));
    }
    if let Some(marker) = &query.marker {
        pairs.push(("marker", marker.clone()));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit", limit.to_string()));
    }
    pairs
}

impl SwiftClient {
    /// Create a session from an already known storage URL and token.
    pub fn new(
        pool: HttpPool,
        storage_url: impl AsRef<str>,
        token: impl Into<String>,
    ) -> BackendResult<Self> {
        let raw = storage_url.as_ref().trim_end_matches('/');
        let storage_url = Url::parse(raw)
            .map_err(|e| BackendError::transport(format!("invalid storage url {}: {}", raw, e)))?;
        let host = host_key(&storage_url);
        Ok(Self {
            pool,
            storage_url,
            host,
            token: token.into(),
        })
    }

    /// Storage URL of this session.
    pub fn storage_url(&self) -> &Url {
        &self.storage_url
    }

    fn url(&self, container: Option<&str>, key: Option<&str>) -> String {
        let mut url = self.storage_url.as_str().to_string();
        if let Some(container) = container {
            url.push('/');
            url.push_str(&encode_key(container));
        }
        if let Some(key) = key {
            url.push('/');
            url.push_str(&encode_key(key));
        }
        url
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.pool
            .client()
            .request(method, url)
            .header(AUTH_TOKEN, &self.token)
    }

    /// Send a request while holding an admission permit, mapping error
    /// statuses. The permit is returned so that streamed bodies can keep it.
    async fn send(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> BackendResult<(Response, PoolPermit)> {
        let permit = self.pool.acquire(&self.host).await?;
        let response = builder.send().await?;
        let status = response.status().as_u16();
        debug!(status, what, "swift response");
        match BackendError::from_status(status, what) {
            Some(err) => Err(err),
            None => Ok((response, permit)),
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> BackendResult<Vec<T>> {
        let (response, _permit) = self.send(builder, what).await?;
        // 204 means an empty listing.
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&body)
            .map_err(|e| BackendError::transport(format!("bad listing for {}: {}", what, e)))
    }
}

#[async_trait]
impl ObjectStore for SwiftClient {
    async fn list_containers(&self, query: &ListQuery) -> BackendResult<Vec<ContainerRecord>> {
        let builder = self
            .request(Method::GET, self.url(None, None))
            .query(&query_pairs(query));
        let rows: Vec<WireContainer> = self.send_json(builder, "/").await?;
        Ok(rows
            .into_iter()
            .map(|row| ContainerRecord {
                name: row.name,
                object_count: row.count,
                bytes_used: row.bytes,
                last_modified: row.last_modified.as_deref().and_then(parse_listing_time),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        container: &str,
        query: &ListQuery,
    ) -> BackendResult<Vec<ListingEntry>> {
        let what = format!("/{}", container);
        let builder = self
            .request(Method::GET, self.url(Some(container), None))
            .query(&query_pairs(query));
        let rows: Vec<WireEntry> = self.send_json(builder, &what).await?;
        Ok(rows.into_iter().map(ListingEntry::from).collect())
    }

    async fn head_container(&self, container: &str) -> BackendResult<ContainerRecord> {
        let what = format!("/{}", container);
        let builder = self.request(Method::HEAD, self.url(Some(container), None));
        let (response, _permit) = self.send(builder, &what).await?;
        let headers = response.headers();
        Ok(ContainerRecord {
            name: container.to_string(),
            object_count: header_u64(headers, CONTAINER_OBJECT_COUNT).unwrap_or_default(),
            bytes_used: header_u64(headers, CONTAINER_BYTES_USED).unwrap_or_default(),
            last_modified: header_str(headers, LAST_MODIFIED.as_str()).and_then(parse_http_time),
        })
    }

    async fn put_container(&self, container: &str) -> BackendResult<()> {
        let what = format!("/{}", container);
        let builder = self
            .request(Method::PUT, self.url(Some(container), None))
            .header(CONTENT_LENGTH, 0);
        self.send(builder, &what).await.map(|_| ())
    }

    async fn delete_container(&self, container: &str) -> BackendResult<()> {
        let what = format!("/{}", container);
        let builder = self.request(Method::DELETE, self.url(Some(container), None));
        self.send(builder, &what).await.map(|_| ())
    }

    async fn head_object(&self, container: &str, key: &str) -> BackendResult<ObjectRecord> {
        let what = format!("/{}/{}", container, key);
        let builder = self.request(Method::HEAD, self.url(Some(container), Some(key)));
        let (response, _permit) = self.send(builder, &what).await?;
        let headers = response.headers();
        Ok(ObjectRecord {
            name: key.to_string(),
            bytes: header_u64(headers, CONTENT_LENGTH).unwrap_or_default(),
            content_type: header_str(headers, CONTENT_TYPE.as_str())
                .unwrap_or_default()
                .to_string(),
            last_modified: header_str(headers, LAST_MODIFIED.as_str()).and_then(parse_http_time),
        })
    }

    async fn get_object(&self, container: &str, key: &str) -> BackendResult<ByteStream> {
        let what = format!("/{}/{}", container, key);
        let builder = self.request(Method::GET, self.url(Some(container), Some(key)));
        let (response, permit) = self.send(builder, &what).await?;
        let length_declared = response.content_length().is_some();

        // The permit rides along with the body and is released when the
        // stream finishes or is dropped.
        let stream = response.bytes_stream().map(move |chunk| {
            let _held = &permit;
            // hyper normally ends a close-delimited body as a clean EOF and
            // only reaches this arm when it surfaces the close as a body
            // error. Truncated chunked bodies are decode errors and stay
            // `Transport`.
            chunk.map_err(|e| {
                if e.is_body() && !length_declared {
                    BackendError::PotentialDataLoss
                } else {
                    BackendError::from(e)
                }
            })
        });
        Ok(stream.boxed())
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        content_type: Option<&str>,
        body: ByteStream,
    ) -> BackendResult<()> {
        let what = format!("/{}/{}", container, key);
        let body = reqwest::Body::wrap_stream(body);
        let mut builder = self
            .request(Method::PUT, self.url(Some(container), Some(key)))
            .body(body);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        self.send(builder, &what).await.map(|_| ())
    }

    async fn copy_object(&self, from: (&str, &str), to: (&str, &str)) -> BackendResult<()> {
        let what = format!("/{}/{}", to.0, to.1);
        let source = format!("/{}/{}", encode_key(from.0), encode_key(from.1));
        let builder = self
            .request(Method::PUT, self.url(Some(to.0), Some(to.1)))
            .header(COPY_FROM, source)
            .header(CONTENT_LENGTH, 0);
        self.send(builder, &what).await.map(|_| ())
    }

    async fn delete_object(&self, container: &str, key: &str) -> BackendResult<()> {
        let what = format!("/{}/{}", container, key);
        let builder = self.request(Method::DELETE, self.url(Some(container), Some(key)));
        self.send(builder, &what).await.map(|_| ())
    }
}
