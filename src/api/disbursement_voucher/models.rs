use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::AppError;

// ============================================================================
// REPORT STATUS
// ============================================================================

/// Workflow status of a report. Owned by the review workflow; this module
/// only reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Draft,
    Review,
    Approved,
    Rejected,
    Received,
    Archived,
}

// ============================================================================
// VOUCHER KEY
// ============================================================================

/// Identity of a voucher: the school, the first day of its reporting month,
/// and its exact date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoucherKey {
    pub school_id: i32,
    pub parent: NaiveDate,
    pub date: NaiveDate,
}

/// First day of the reporting month. Path segments arrive signed, so
/// negative months are rejected here rather than by the extractor.
pub fn month_start(year: i32, month: i32) -> Result<NaiveDate, AppError> {
    u32::try_from(month)
        .ok()
        .and_then(|month| NaiveDate::from_ymd_opt(year, month, 1))
        .ok_or_else(|| {
            AppError::validation(format!("Invalid reporting month: {}-{:02}", year, month))
        })
}

impl VoucherKey {
    pub fn from_calendar(
        school_id: i32,
        year: i32,
        month: i32,
        day: i32,
    ) -> Result<Self, AppError> {
        let parent = month_start(year, month)?;
        let date = u32::try_from(day)
            .ok()
            .and_then(|day| parent.with_day(day))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Invalid voucher date: day {} is out of range for {}-{:02}",
                    day, year, month
                ))
            })?;

        Ok(Self {
            school_id,
            parent,
            date,
        })
    }
}

// ============================================================================
// WIRE MODELS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementVoucherEntryData {
    #[serde(default)]
    pub receipt: Option<String>,
    pub particulars: String,
    pub unit: String,
    pub quantity: f64,
    #[serde(rename = "unitPrice")]
    pub unit_price: f64,
}

impl DisbursementVoucherEntryData {
    /// Line amount. Derived, never stored.
    pub fn total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementVoucherAccountingEntryData {
    pub uacs_code: String,
    #[serde(rename = "accountTitle")]
    pub account_title: String,
    pub debit: f64,
    pub credit: f64,
}

/// Body of the create/update endpoint.
///
/// `schoolId` and `date` are accepted for compatibility with existing
/// clients but the path parameters always decide which voucher is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursementVoucherRequest {
    #[serde(default)]
    pub school_id: Option<i32>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub mode_of_payment: String,
    pub payee: String,
    pub tin_or_employee_no: Option<String>,
    pub responsibility_center: Option<String>,
    pub orsburs_no: Option<String>,
    pub address: Option<String>,
    pub linked_liquidation_category: Option<String>,

    // Section C: Certified
    #[serde(default)]
    pub certified_cash_available: bool,
    #[serde(default)]
    pub certified_supporting_docs_complete: bool,
    #[serde(default)]
    pub certified_subject_to_debit_account: bool,

    // Section D: Approved for Payment
    pub approved_by: Option<String>,

    // Section E: Receipt of Payment
    pub check_no: Option<String>,
    pub bank_name_and_account_no: Option<String>,
    pub ada_no: Option<String>,
    pub jev_no: Option<String>,

    #[serde(default)]
    pub entries: Vec<DisbursementVoucherEntryData>,
    #[serde(default)]
    pub accounting_entries: Vec<DisbursementVoucherAccountingEntryData>,
    #[serde(default)]
    pub certified_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursementVoucherResponse {
    pub parent: NaiveDate,
    pub date: NaiveDate,
    pub school_id: i32,
    pub mode_of_payment: String,
    pub payee: String,
    pub tin_or_employee_no: Option<String>,
    pub responsibility_center: Option<String>,
    pub orsburs_no: Option<String>,
    pub address: Option<String>,
    pub linked_liquidation_category: Option<String>,
    pub report_status: ReportStatus,

    pub certified_cash_available: bool,
    pub certified_supporting_docs_complete: bool,
    pub certified_subject_to_debit_account: bool,

    pub approved_by: Option<String>,

    pub check_no: Option<String>,
    pub bank_name_and_account_no: Option<String>,
    pub ada_no: Option<String>,
    pub jev_no: Option<String>,

    pub entries: Vec<DisbursementVoucherEntryData>,
    pub accounting_entries: Vec<DisbursementVoucherAccountingEntryData>,
    pub certified_by: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoucherListQuery {
    pub linked_category: Option<String>,
}

impl VoucherListQuery {
    /// An empty `linked_category` means no filter.
    pub fn category_filter(&self) -> Option<&str> {
        self.linked_category
            .as_deref()
            .filter(|category| !category.is_empty())
    }
}

// ============================================================================
// STORED AGGREGATE
// ============================================================================

/// Header row of `disbursement_vouchers`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VoucherHeader {
    pub school_id: i32,
    pub parent: NaiveDate,
    pub date: NaiveDate,
    pub mode_of_payment: String,
    pub payee: String,
    pub tin_or_employee_no: Option<String>,
    pub responsibility_center: Option<String>,
    pub orsburs_no: Option<String>,
    pub address: Option<String>,
    pub linked_liquidation_category: Option<String>,
    pub report_status: ReportStatus,
    pub certified_cash_available: bool,
    pub certified_supporting_docs_complete: bool,
    pub certified_subject_to_debit_account: bool,
    pub approved_by: Option<String>,
    pub check_no: Option<String>,
    pub bank_name_and_account_no: Option<String>,
    pub ada_no: Option<String>,
    pub jev_no: Option<String>,
}

impl VoucherHeader {
    /// Header with every mutable field taken from `request`. Fields missing
    /// from the request become `None`, never the previous value.
    pub fn from_request(
        key: VoucherKey,
        request: &DisbursementVoucherRequest,
        report_status: ReportStatus,
    ) -> Self {
        Self {
            school_id: key.school_id,
            parent: key.parent,
            date: key.date,
            mode_of_payment: request.mode_of_payment.clone(),
            payee: request.payee.clone(),
            tin_or_employee_no: request.tin_or_employee_no.clone(),
            responsibility_center: request.responsibility_center.clone(),
            orsburs_no: request.orsburs_no.clone(),
            address: request.address.clone(),
            linked_liquidation_category: request.linked_liquidation_category.clone(),
            report_status,
            certified_cash_available: request.certified_cash_available,
            certified_supporting_docs_complete: request.certified_supporting_docs_complete,
            certified_subject_to_debit_account: request.certified_subject_to_debit_account,
            approved_by: request.approved_by.clone(),
            check_no: request.check_no.clone(),
            bank_name_and_account_no: request.bank_name_and_account_no.clone(),
            ada_no: request.ada_no.clone(),
            jev_no: request.jev_no.clone(),
        }
    }

    pub fn key(&self) -> VoucherKey {
        VoucherKey {
            school_id: self.school_id,
            parent: self.parent,
            date: self.date,
        }
    }
}

/// A voucher header together with its three child collections, in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct DisbursementVoucher {
    pub header: VoucherHeader,
    pub entries: Vec<DisbursementVoucherEntryData>,
    pub accounting_entries: Vec<DisbursementVoucherAccountingEntryData>,
    pub certified_by: Vec<String>,
}

/// Result of a create-or-update.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub voucher: DisbursementVoucher,
    pub created: bool,
}

impl From<DisbursementVoucher> for DisbursementVoucherResponse {
    fn from(voucher: DisbursementVoucher) -> Self {
        let header = voucher.header;

        Self {
            parent: header.parent,
            date: header.date,
            school_id: header.school_id,
            mode_of_payment: header.mode_of_payment,
            payee: header.payee,
            tin_or_employee_no: header.tin_or_employee_no,
            responsibility_center: header.responsibility_center,
            orsburs_no: header.orsburs_no,
            address: header.address,
            linked_liquidation_category: header.linked_liquidation_category,
            report_status: header.report_status,
            certified_cash_available: header.certified_cash_available,
            certified_supporting_docs_complete: header.certified_supporting_docs_complete,
            certified_subject_to_debit_account: header.certified_subject_to_debit_account,
            approved_by: header.approved_by,
            check_no: header.check_no,
            bank_name_and_account_no: header.bank_name_and_account_no,
            ada_no: header.ada_no,
            jev_no: header.jev_no,
            entries: voucher.entries,
            accounting_entries: voucher.accounting_entries,
            certified_by: voucher.certified_by,
        }
    }
}
