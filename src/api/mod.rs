pub mod disbursement_voucher;
pub mod extract;

use axum::{middleware, Router};
use std::sync::Arc;

use crate::middleware::extract_current_user;
use crate::state::AppState;
use disbursement_voucher::create_disbursement_voucher_router;

pub const DISBURSEMENT_VOUCHER_PREFIX: &str = "/api/v1/reports/disbursement-voucher";

/// Every report route. All of them require a bearer token.
pub fn create_api_router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest(DISBURSEMENT_VOUCHER_PREFIX, create_disbursement_voucher_router())
        .route_layer(middleware::from_fn_with_state(app_state, extract_current_user))
}
