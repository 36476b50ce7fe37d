// Disbursement voucher reports: one voucher per school per date, grouped
// into reporting months.

pub mod handlers;
pub mod memory_store;
pub mod models;
pub mod repository;

pub use handlers::*;
pub use memory_store::InMemoryVoucherStore;
pub use models::*;
pub use repository::{PgVoucherStore, VoucherStore};

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

/// Routes relative to `/api/v1/reports/disbursement-voucher`.
pub fn create_disbursement_voucher_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:school_id/:year/:month/:date",
            get(get_disbursement_voucher).post(upsert_disbursement_voucher),
        )
        .route("/:school_id/:year/:month", get(list_disbursement_vouchers_for_month))
}
