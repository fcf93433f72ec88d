use super::traits::{PassthroughClient, ProxyEngine, UrlCodec};
use crate::worker::types::{FetchEvent, HttpRequest, HttpResponse};
use anyhow::{anyhow, Context, Result};
use http::header::{HeaderMap, HeaderName};
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Headers that must not travel across the proxy hop.
const HOP_BY_HOP: [HeaderName; 8] = [
    http::header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    http::header::PROXY_AUTHENTICATE,
    http::header::PROXY_AUTHORIZATION,
    http::header::TE,
    http::header::TRAILER,
    http::header::TRANSFER_ENCODING,
    http::header::UPGRADE,
];

fn outbound_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP.iter() {
        out.remove(name);
    }
    // reqwest derives these from the target and the body
    out.remove(http::header::HOST);
    out.remove(http::header::CONTENT_LENGTH);
    out
}

/// Forwards a buffered request to `target`, preserving method, remaining
/// headers, and body, and buffers the upstream answer back into an
/// `HttpResponse`.
pub async fn forward_request(
    client: &Client,
    target: Url,
    request: HttpRequest,
) -> Result<HttpResponse> {
    let (parts, body) = request.into_parts();

    let upstream = client
        .request(parts.method, target)
        .headers(outbound_headers(&parts.headers))
        .body(body)
        .send()
        .await
        .context("Upstream fetch failed")?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(http::header::CONTENT_LENGTH);

    let bytes = upstream
        .bytes()
        .await
        .context("Failed to read upstream body")?;

    let mut response = http::Response::new(bytes);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Prefix-routed engine: owns every request whose path starts with its
/// prefix, recovers the target URL by running the path remainder through
/// its codec, and forwards the request upstream.
pub struct EncodedPathEngine {
    name: String,
    prefix: String,
    codec: Arc<dyn UrlCodec>,
    client: Client,
}

impl EncodedPathEngine {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        codec: Arc<dyn UrlCodec>,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            codec,
            client,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Builds the path a client would request to reach `url` through this
    /// engine.
    pub fn encode_path(&self, url: &str) -> String {
        format!("{}{}", self.prefix, self.codec.encode(url))
    }
}

#[async_trait::async_trait]
impl ProxyEngine for EncodedPathEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn route(&self, event: &FetchEvent) -> bool {
        event.path().starts_with(&self.prefix)
    }

    fn decode_target(&self, event: &FetchEvent) -> Result<Url> {
        let remainder = event
            .path()
            .strip_prefix(&self.prefix)
            .ok_or_else(|| anyhow!("Path does not carry the engine prefix"))?;
        let decoded = self.codec.decode(remainder)?;
        let mut target = Url::parse(&decoded).context("Decoded target is not a URL")?;
        if target.query().is_none() {
            if let Some(q) = event.request.uri().query() {
                target.set_query(Some(q));
            }
        }
        Ok(target)
    }

    async fn fetch(&self, event: FetchEvent) -> Result<HttpResponse> {
        let target = self.decode_target(&event)?;
        forward_request(&self.client, target, event.request).await
    }
}

/// The passthrough path: re-issue the original request unchanged. The
/// absolute target is rebuilt from the Host header since the front server
/// receives origin-form URIs.
pub struct DirectClient {
    client: Client,
}

impl DirectClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PassthroughClient for DirectClient {
    async fn fetch(&self, event: FetchEvent) -> Result<HttpResponse> {
        let host = event
            .host()
            .ok_or_else(|| anyhow!("Request has no host to pass through to"))?;
        let path_and_query = event
            .request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = Url::parse(&format!("http://{}{}", host, path_and_query))
            .context("Failed to rebuild passthrough URL")?;
        forward_request(&self.client, target, event.request).await
    }
}
