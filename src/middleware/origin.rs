use crate::state::AppState;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

/// Only lets a request through when its `Origin` has a stored permission.
///
/// The permission is attached to the request as an extension for the
/// downstream handler.
pub async fn origin_guard(
    state: AppState,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .map_err(|_| StatusCode::BAD_REQUEST)?
        .to_owned();

    // Opaque origins ("null") can never hold a grant.
    if origin.is_empty() || origin == "null" {
        return Err(StatusCode::BAD_REQUEST);
    }

    let permission = state
        .permissions
        .get(&origin)
        .await
        .map_err(|err| {
            error!("permission lookup for {origin} failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            debug!("rejected origin without permission: {origin}");
            StatusCode::FORBIDDEN
        })?;

    request.extensions_mut().insert(permission);
    Ok(next.run(request).await)
}
