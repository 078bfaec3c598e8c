//! Stamps the request id onto JSON error bodies

use axum::{
    extract::Request,
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::RequestIdExt;
use crate::error::ErrorResponse;

/// Rewrites responses built by [`ErrorResponse::into_response_with`] so the
/// body carries the `x-request-id` the request was served under.
///
/// Must sit inside the layer that assigns request ids.
pub async fn attach_request_id(request: Request, next: Next) -> Response {
    let request_id = request.headers().request_id().map(str::to_string);
    let mut response = next.run(request).await;

    let Some(mut body) = response.extensions_mut().remove::<ErrorResponse>() else {
        return response;
    };
    let Some(request_id) = request_id else {
        return response;
    };

    body.request_id = Some(request_id);
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Json(body).into_response().into_body())
}
