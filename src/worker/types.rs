use bytes::Bytes;
use http::{Request, Response, StatusCode};
use std::time::Instant;

pub type HttpRequest = Request<Bytes>;
pub type HttpResponse = Response<Bytes>;

/// One intercepted request, as delivered to the dispatcher by the front
/// server. Owns the buffered request so an engine can forward the body.
#[derive(Debug)]
pub struct FetchEvent {
    pub request: HttpRequest,
    pub start: Instant,
}

impl FetchEvent {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            start: Instant::now(),
        }
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// Hostname the client addressed, from the URI authority or the Host
    /// header (port stripped).
    pub fn host(&self) -> Option<String> {
        if let Some(authority) = self.request.uri().authority() {
            return Some(authority.host().to_string());
        }
        self.request
            .headers()
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|h| h.split(':').next().unwrap_or(h).to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub host: String,
    pub path: String,
    pub method: String,
    pub start: Instant,
}

/// The veto response: empty body, platform-default status.
pub fn empty_response() -> HttpResponse {
    Response::new(Bytes::new())
}

/// The blocked sentinel: 406, empty body, no custom headers.
pub fn blocked_response() -> HttpResponse {
    let mut resp = Response::new(Bytes::new());
    *resp.status_mut() = StatusCode::NOT_ACCEPTABLE;
    resp
}

pub fn error_response(status: StatusCode) -> HttpResponse {
    let mut resp = Response::new(Bytes::new());
    *resp.status_mut() = status;
    resp
}
