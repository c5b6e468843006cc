use crate::types::Permission;
use axum::{extract::Query, http::StatusCode, Extension, Json};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct AccountsQuery {
    /// Narrows the answer to a single address the origin wants to use.
    pub address: Option<String>,
}

/// Returns what the calling origin is allowed to see.
pub async fn accounts_handler(
    Extension(permission): Extension<Permission>,
    Query(query): Query<AccountsQuery>,
) -> Result<Json<Permission>, StatusCode> {
    if let Some(address) = &query.address {
        if !permission.allows(address) {
            debug!("{} may not use {address}", permission.origin);
            return Err(StatusCode::FORBIDDEN);
        }
    }
    Ok(Json(permission))
}
