use axum::{
    extract::{Extension, Query, State},
    Json,
};
use shared::{AppError, Permission};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::disbursement_voucher::models::{
    month_start, DisbursementVoucherRequest, DisbursementVoucherResponse, VoucherKey,
    VoucherListQuery,
};
use crate::api::extract::ValidatedPath;
use crate::middleware::CurrentUser;
use crate::observability::record_voucher_operation;
use crate::state::AppState;

fn outcome_label<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::NotFound { .. }) => "not_found",
        Err(_) => "error",
    }
}

// ============================================================================
// HANDLER FUNCTIONS
// ============================================================================

/// POST /api/v1/reports/disbursement-voucher/:school_id/:year/:month/:date
///
/// Creates the voucher at the path key, or replaces its header and all of
/// its child collections.
pub async fn upsert_disbursement_voucher(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedPath((school_id, year, month, day)): ValidatedPath<(i32, i32, i32, i32)>,
    Json(request): Json<DisbursementVoucherRequest>,
) -> Result<Json<DisbursementVoucherResponse>, AppError> {
    let user = state.users.resolve_user(&current_user.user_id).await?;
    user.authorize(Permission::ReportsLocalWrite)?;

    let key = VoucherKey::from_calendar(school_id, year, month, day)?;

    let body_school_differs = request.school_id.is_some_and(|id| id != key.school_id);
    let body_date_differs = request.date.is_some_and(|date| date != key.date);
    if body_school_differs || body_date_differs {
        debug!("Ignoring body schoolId/date in favour of path key {:?}", key);
    }

    let result = state.vouchers.upsert(key, &request).await;
    let label = match &result {
        Ok(outcome) if outcome.created => "created",
        Ok(_) => "updated",
        Err(_) => "error",
    };
    record_voucher_operation("upsert", label);
    let outcome = result?;

    debug!("Upsert took the {} path", if outcome.created { "create" } else { "update" });
    info!(
        user_id = %user.id,
        school_id = key.school_id,
        date = %key.date,
        created = outcome.created,
        entries = outcome.voucher.entries.len(),
        "Disbursement voucher saved"
    );

    Ok(Json(outcome.voucher.into()))
}

/// GET /api/v1/reports/disbursement-voucher/:school_id/:year/:month/:date
pub async fn get_disbursement_voucher(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedPath((school_id, year, month, day)): ValidatedPath<(i32, i32, i32, i32)>,
) -> Result<Json<DisbursementVoucherResponse>, AppError> {
    let user = state.users.resolve_user(&current_user.user_id).await?;
    user.authorize(Permission::ReportsLocalRead)?;

    let key = VoucherKey::from_calendar(school_id, year, month, day)?;

    let result = state
        .vouchers
        .find(key)
        .await
        .and_then(|voucher| voucher.ok_or_else(|| AppError::not_found("Disbursement voucher")));
    record_voucher_operation("get", outcome_label(&result));

    Ok(Json(result?.into()))
}

/// GET /api/v1/reports/disbursement-voucher/:school_id/:year/:month
///
/// Every voucher of the school in that month, ordered by date. An empty
/// month is an empty array, not a 404.
pub async fn list_disbursement_vouchers_for_month(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedPath((school_id, year, month)): ValidatedPath<(i32, i32, i32)>,
    Query(query): Query<VoucherListQuery>,
) -> Result<Json<Vec<DisbursementVoucherResponse>>, AppError> {
    let user = state.users.resolve_user(&current_user.user_id).await?;
    user.authorize(Permission::ReportsLocalRead)?;

    let parent = month_start(year, month)?;
    let category = query.category_filter();

    let result = state.vouchers.list_for_month(school_id, parent, category).await;
    record_voucher_operation("list", outcome_label(&result));
    let vouchers = result?;

    debug!(
        school_id,
        parent = %parent,
        category = ?category,
        "Listed {} disbursement vouchers",
        vouchers.len()
    );

    Ok(Json(vouchers.into_iter().map(Into::into).collect()))
}
