//! Transport-level Tower middleware wrapped around the gateway.
//!
//! Ordering is outer-to-inner: the first layer listed sees the request first
//! and the response last. The gateway sits inside this stack, so rejections
//! it produces are traced and carry the request id like any other response.

use axum::http::header::HeaderName;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Name of the header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The composed layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TraceLayer<
            tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
        >,
        tower::layer::util::Stack<SetRequestIdLayer<MakeRequestUuid>, tower::layer::util::Identity>,
    >,
>;

/// Builds the transport stack.
///
/// 1. `SetRequestId` -- assigns a UUID `x-request-id` unless the caller sent one
/// 2. `Tracing` -- one span per request, 5xx classified as failures
/// 3. `PropagateRequestId` -- copies `x-request-id` onto the response
///
/// The request timeout is applied inside the gateway (see
/// [`NetworkModule::build_router`](super::NetworkModule::build_router)) so
/// `408` responses are CORS-stamped too.
#[must_use]
pub fn build_http_layers() -> HttpLayers {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}
