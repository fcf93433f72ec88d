use crate::worker::dispatcher::Dispatcher;
use crate::worker::types::FetchEvent;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use http::StatusCode;
use tokio::net::TcpListener;
use tracing::info;

/// Cap on buffered request bodies before dispatch.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// The interception front: every request, whatever the path, becomes a
/// fetch event for the dispatcher.
pub fn front_router(dispatcher: Dispatcher) -> Router {
    Router::new().fallback(intercept).with_state(dispatcher)
}

async fn intercept(State(dispatcher): State<Dispatcher>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return Response::builder()
                .status(StatusCode::PAYLOAD_TOO_LARGE)
                .body(Body::empty())
                .unwrap_or_default()
        }
    };

    let event = FetchEvent::new(http::Request::from_parts(parts, bytes));
    let response = dispatcher.handle_fetch(event).await;

    let (parts, bytes) = response.into_parts();
    Response::from_parts(parts, Body::from(bytes))
}

pub async fn serve(dispatcher: Dispatcher, listener: TcpListener) -> anyhow::Result<()> {
    info!(
        "Front server listening on {}",
        listener.local_addr().map(|a| a.to_string()).unwrap_or_default()
    );
    axum::serve(listener, front_router(dispatcher)).await?;
    Ok(())
}
