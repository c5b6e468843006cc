pub mod config;
pub mod handlers;
pub mod middleware;
pub mod payment;
pub mod state;
pub mod types;
pub mod utils;

pub use config::{HubConfig, PermissionStoreConfig};
pub use payment::ParsedPaymentOptions;
pub use state::{AppState, PermissionStore};
pub use types::{
    ApiError, Currency, FiatFeeError, Grant, PaymentMethod, Permission, RawPaymentOptions,
    StoreError, ValidationError,
};

use axum::{
    routing::{get, post},
    Router,
};
use handlers::{accounts_handler, checkout, permissions};
use middleware::origin_guard;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let guard_state = state.clone();
    let guarded = Router::new()
        .route("/accounts", get(accounts_handler))
        .layer(axum::middleware::from_fn(move |req, next| {
            let state = guard_state.clone();
            origin_guard(state, req, next)
        }));

    Router::new()
        .route("/checkout/options", post(checkout::parse_options))
        .route("/checkout/options/update", post(checkout::update_options))
        .route("/checkout/fiat-fee", post(checkout::fiat_fee))
        .route(
            "/permissions",
            get(permissions::list_permissions)
                .post(permissions::allow_permission)
                .delete(permissions::remove_permission),
        )
        .route("/permissions/origin", get(permissions::get_permission))
        .merge(guarded)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
