use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{AppError, Result};
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::api::disbursement_voucher::models::{
    DisbursementVoucher, DisbursementVoucherAccountingEntryData, DisbursementVoucherEntryData,
    DisbursementVoucherRequest, UpsertOutcome, VoucherHeader, VoucherKey,
};
use crate::observability::record_db_query;

/// Persistence for the voucher aggregate.
///
/// `upsert` must be atomic: either the header and all three child
/// collections are written, or nothing is.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Create the voucher at `key`, or overwrite its header and replace all
    /// of its child rows.
    async fn upsert(
        &self,
        key: VoucherKey,
        request: &DisbursementVoucherRequest,
    ) -> Result<UpsertOutcome>;

    async fn find(&self, key: VoucherKey) -> Result<Option<DisbursementVoucher>>;

    /// Every voucher of `school_id` in the month starting at `parent`,
    /// ordered by date.
    async fn list_for_month(
        &self,
        school_id: i32,
        parent: NaiveDate,
        linked_category: Option<&str>,
    ) -> Result<Vec<DisbursementVoucher>>;

    /// Cheap connectivity check for the readiness endpoint.
    async fn ping(&self) -> Result<()>;
}

// ============================================================================
// SQL
// ============================================================================

const UPSERT_HEADER: &str = r#"
    INSERT INTO disbursement_vouchers (
        school_id, parent, date, mode_of_payment, payee,
        tin_or_employee_no, responsibility_center, orsburs_no, address,
        linked_liquidation_category, certified_cash_available,
        certified_supporting_docs_complete, certified_subject_to_debit_account,
        approved_by, check_no, bank_name_and_account_no, ada_no, jev_no
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
    ON CONFLICT (school_id, parent, date) DO UPDATE SET
        mode_of_payment = EXCLUDED.mode_of_payment,
        payee = EXCLUDED.payee,
        tin_or_employee_no = EXCLUDED.tin_or_employee_no,
        responsibility_center = EXCLUDED.responsibility_center,
        orsburs_no = EXCLUDED.orsburs_no,
        address = EXCLUDED.address,
        linked_liquidation_category = EXCLUDED.linked_liquidation_category,
        certified_cash_available = EXCLUDED.certified_cash_available,
        certified_supporting_docs_complete = EXCLUDED.certified_supporting_docs_complete,
        certified_subject_to_debit_account = EXCLUDED.certified_subject_to_debit_account,
        approved_by = EXCLUDED.approved_by,
        check_no = EXCLUDED.check_no,
        bank_name_and_account_no = EXCLUDED.bank_name_and_account_no,
        ada_no = EXCLUDED.ada_no,
        jev_no = EXCLUDED.jev_no,
        updated_at = now()
    RETURNING (xmax = 0) AS inserted
"#;

const DELETE_ENTRIES: &str =
    "DELETE FROM disbursement_voucher_entries WHERE school_id = $1 AND parent = $2 AND date = $3";
const DELETE_ACCOUNTING_ENTRIES: &str = r#"
    DELETE FROM disbursement_voucher_accounting_entries
    WHERE school_id = $1 AND parent = $2 AND date = $3
"#;
const DELETE_CERTIFIED_BY: &str = r#"
    DELETE FROM disbursement_voucher_certified_by
    WHERE school_id = $1 AND parent = $2 AND date = $3
"#;

const INSERT_ENTRY: &str = r#"
    INSERT INTO disbursement_voucher_entries (
        school_id, parent, date, receipt, particulars, unit, quantity, unit_price
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

const INSERT_ACCOUNTING_ENTRY: &str = r#"
    INSERT INTO disbursement_voucher_accounting_entries (
        school_id, parent, date, uacs_code, account_title, debit, credit
    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

const INSERT_CERTIFIED_BY: &str = r#"
    INSERT INTO disbursement_voucher_certified_by (school_id, parent, date, user_id)
    VALUES ($1, $2, $3, $4)
"#;

const SELECT_HEADER: &str = r#"
    SELECT school_id, parent, date, mode_of_payment, payee, tin_or_employee_no,
           responsibility_center, orsburs_no, address, linked_liquidation_category,
           report_status, certified_cash_available, certified_supporting_docs_complete,
           certified_subject_to_debit_account, approved_by, check_no,
           bank_name_and_account_no, ada_no, jev_no
    FROM disbursement_vouchers
    WHERE school_id = $1 AND parent = $2 AND date = $3
"#;

const SELECT_HEADERS_FOR_MONTH: &str = r#"
    SELECT school_id, parent, date, mode_of_payment, payee, tin_or_employee_no,
           responsibility_center, orsburs_no, address, linked_liquidation_category,
           report_status, certified_cash_available, certified_supporting_docs_complete,
           certified_subject_to_debit_account, approved_by, check_no,
           bank_name_and_account_no, ada_no, jev_no
    FROM disbursement_vouchers
    WHERE school_id = $1 AND parent = $2
      AND ($3::text IS NULL OR linked_liquidation_category = $3)
    ORDER BY date
"#;

// Child loaders take an optional date: NULL loads the whole month.
const SELECT_ENTRIES: &str = r#"
    SELECT date, receipt, particulars, unit, quantity, unit_price
    FROM disbursement_voucher_entries
    WHERE school_id = $1 AND parent = $2 AND ($3::date IS NULL OR date = $3)
    ORDER BY id
"#;

const SELECT_ACCOUNTING_ENTRIES: &str = r#"
    SELECT date, uacs_code, account_title, debit, credit
    FROM disbursement_voucher_accounting_entries
    WHERE school_id = $1 AND parent = $2 AND ($3::date IS NULL OR date = $3)
    ORDER BY id
"#;

const SELECT_CERTIFIED_BY: &str = r#"
    SELECT date, user_id
    FROM disbursement_voucher_certified_by
    WHERE school_id = $1 AND parent = $2 AND ($3::date IS NULL OR date = $3)
    ORDER BY id
"#;

// ============================================================================
// CHILD ROWS
// ============================================================================

#[derive(sqlx::FromRow)]
struct EntryRow {
    date: NaiveDate,
    receipt: Option<String>,
    particulars: String,
    unit: String,
    quantity: f64,
    unit_price: f64,
}

#[derive(sqlx::FromRow)]
struct AccountingEntryRow {
    date: NaiveDate,
    uacs_code: String,
    account_title: String,
    debit: f64,
    credit: f64,
}

#[derive(sqlx::FromRow)]
struct CertifiedByRow {
    date: NaiveDate,
    user_id: String,
}

/// Child rows of one month (or one voucher) grouped by voucher date.
#[derive(Default)]
struct ChildRows {
    entries: HashMap<NaiveDate, Vec<DisbursementVoucherEntryData>>,
    accounting_entries: HashMap<NaiveDate, Vec<DisbursementVoucherAccountingEntryData>>,
    certified_by: HashMap<NaiveDate, Vec<String>>,
}

impl ChildRows {
    fn attach(&mut self, header: VoucherHeader) -> DisbursementVoucher {
        let date = header.date;
        DisbursementVoucher {
            header,
            entries: self.entries.remove(&date).unwrap_or_default(),
            accounting_entries: self.accounting_entries.remove(&date).unwrap_or_default(),
            certified_by: self.certified_by.remove(&date).unwrap_or_default(),
        }
    }
}

// ============================================================================
// POSTGRES STORE
// ============================================================================

#[derive(Clone)]
pub struct PgVoucherStore {
    pool: PgPool,
}

impl PgVoucherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_children(
        &self,
        school_id: i32,
        parent: NaiveDate,
        date: Option<NaiveDate>,
    ) -> Result<ChildRows> {
        let mut children = ChildRows::default();

        let entries = sqlx::query_as::<_, EntryRow>(SELECT_ENTRIES)
            .bind(school_id)
            .bind(parent)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        for row in entries {
            children.entries.entry(row.date).or_default().push(DisbursementVoucherEntryData {
                receipt: row.receipt,
                particulars: row.particulars,
                unit: row.unit,
                quantity: row.quantity,
                unit_price: row.unit_price,
            });
        }

        let accounting_entries = sqlx::query_as::<_, AccountingEntryRow>(SELECT_ACCOUNTING_ENTRIES)
            .bind(school_id)
            .bind(parent)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        for row in accounting_entries {
            children
                .accounting_entries
                .entry(row.date)
                .or_default()
                .push(DisbursementVoucherAccountingEntryData {
                    uacs_code: row.uacs_code,
                    account_title: row.account_title,
                    debit: row.debit,
                    credit: row.credit,
                });
        }

        let certified_by = sqlx::query_as::<_, CertifiedByRow>(SELECT_CERTIFIED_BY)
            .bind(school_id)
            .bind(parent)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        for row in certified_by {
            children.certified_by.entry(row.date).or_default().push(row.user_id);
        }

        Ok(children)
    }

    async fn write_voucher(
        &self,
        key: VoucherKey,
        request: &DisbursementVoucherRequest,
    ) -> Result<bool> {
        // Dropping `tx` without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        // 1. Create the header or overwrite every mutable field
        let inserted: bool = sqlx::query_scalar(UPSERT_HEADER)
            .bind(key.school_id)
            .bind(key.parent)
            .bind(key.date)
            .bind(&request.mode_of_payment)
            .bind(&request.payee)
            .bind(&request.tin_or_employee_no)
            .bind(&request.responsibility_center)
            .bind(&request.orsburs_no)
            .bind(&request.address)
            .bind(&request.linked_liquidation_category)
            .bind(request.certified_cash_available)
            .bind(request.certified_supporting_docs_complete)
            .bind(request.certified_subject_to_debit_account)
            .bind(&request.approved_by)
            .bind(&request.check_no)
            .bind(&request.bank_name_and_account_no)
            .bind(&request.ada_no)
            .bind(&request.jev_no)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!("Error upserting voucher header: {}", e);
                AppError::from(e)
            })?;

        // 2. Drop the previous child collections
        if !inserted {
            for statement in [DELETE_ENTRIES, DELETE_ACCOUNTING_ENTRIES, DELETE_CERTIFIED_BY] {
                sqlx::query(statement)
                    .bind(key.school_id)
                    .bind(key.parent)
                    .bind(key.date)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        // 3. Insert the submitted child collections
        for entry in &request.entries {
            sqlx::query(INSERT_ENTRY)
                .bind(key.school_id)
                .bind(key.parent)
                .bind(key.date)
                .bind(&entry.receipt)
                .bind(&entry.particulars)
                .bind(&entry.unit)
                .bind(entry.quantity)
                .bind(entry.unit_price)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Error inserting voucher entry: {}", e);
                    AppError::from(e)
                })?;
        }

        for entry in &request.accounting_entries {
            sqlx::query(INSERT_ACCOUNTING_ENTRY)
                .bind(key.school_id)
                .bind(key.parent)
                .bind(key.date)
                .bind(&entry.uacs_code)
                .bind(&entry.account_title)
                .bind(entry.debit)
                .bind(entry.credit)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Error inserting voucher accounting entry: {}", e);
                    AppError::from(e)
                })?;
        }

        for user_id in &request.certified_by {
            sqlx::query(INSERT_CERTIFIED_BY)
                .bind(key.school_id)
                .bind(key.parent)
                .bind(key.date)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        // 4. Commit
        tx.commit().await.map_err(|e| {
            error!("Error committing voucher transaction: {}", e);
            AppError::from(e)
        })?;

        debug!(
            "Voucher {:?} written: {} entries, {} accounting entries, {} certifiers",
            key,
            request.entries.len(),
            request.accounting_entries.len(),
            request.certified_by.len()
        );

        Ok(inserted)
    }
}

#[async_trait]
impl VoucherStore for PgVoucherStore {
    async fn upsert(
        &self,
        key: VoucherKey,
        request: &DisbursementVoucherRequest,
    ) -> Result<UpsertOutcome> {
        let start = Instant::now();
        let result = self.write_voucher(key, request).await;
        record_db_query("upsert", start.elapsed().as_secs_f64(), result.is_ok());
        let created = result?;

        let voucher = self
            .find(key)
            .await?
            .ok_or_else(|| AppError::internal("Voucher missing right after commit"))?;

        info!(
            school_id = key.school_id,
            date = %key.date,
            created,
            "Disbursement voucher persisted"
        );

        Ok(UpsertOutcome { voucher, created })
    }

    async fn find(&self, key: VoucherKey) -> Result<Option<DisbursementVoucher>> {
        let start = Instant::now();

        let header = sqlx::query_as::<_, VoucherHeader>(SELECT_HEADER)
            .bind(key.school_id)
            .bind(key.parent)
            .bind(key.date)
            .fetch_optional(&self.pool)
            .await;
        let header = match header {
            Ok(Some(header)) => header,
            Ok(None) => {
                record_db_query("find", start.elapsed().as_secs_f64(), true);
                return Ok(None);
            }
            Err(e) => {
                record_db_query("find", start.elapsed().as_secs_f64(), false);
                return Err(e.into());
            }
        };

        let children = self.load_children(key.school_id, key.parent, Some(key.date)).await;
        record_db_query("find", start.elapsed().as_secs_f64(), children.is_ok());

        Ok(Some(children?.attach(header)))
    }

    async fn list_for_month(
        &self,
        school_id: i32,
        parent: NaiveDate,
        linked_category: Option<&str>,
    ) -> Result<Vec<DisbursementVoucher>> {
        let start = Instant::now();

        let headers = sqlx::query_as::<_, VoucherHeader>(SELECT_HEADERS_FOR_MONTH)
            .bind(school_id)
            .bind(parent)
            .bind(linked_category)
            .fetch_all(&self.pool)
            .await;
        let headers = match headers {
            Ok(headers) => headers,
            Err(e) => {
                record_db_query("list_for_month", start.elapsed().as_secs_f64(), false);
                return Err(e.into());
            }
        };

        if headers.is_empty() {
            record_db_query("list_for_month", start.elapsed().as_secs_f64(), true);
            return Ok(Vec::new());
        }

        let children = self.load_children(school_id, parent, None).await;
        record_db_query("list_for_month", start.elapsed().as_secs_f64(), children.is_ok());
        let mut children = children?;

        Ok(headers.into_iter().map(|header| children.attach(header)).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::disbursement_voucher::models::ReportStatus;

    fn header(day: u32) -> VoucherHeader {
        VoucherHeader {
            school_id: 1,
            parent: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            mode_of_payment: "Cash".to_string(),
            payee: "Payee".to_string(),
            tin_or_employee_no: None,
            responsibility_center: None,
            orsburs_no: None,
            address: None,
            linked_liquidation_category: None,
            report_status: ReportStatus::Draft,
            certified_cash_available: false,
            certified_supporting_docs_complete: false,
            certified_subject_to_debit_account: false,
            approved_by: None,
            check_no: None,
            bank_name_and_account_no: None,
            ada_no: None,
            jev_no: None,
        }
    }

    #[test]
    fn test_children_attach_by_date() {
        let mut children = ChildRows::default();
        let day_2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        children.certified_by.insert(day_2, vec!["a".to_string(), "b".to_string()]);

        let with_children = children.attach(header(2));
        assert_eq!(with_children.certified_by, vec!["a", "b"]);
        assert!(with_children.entries.is_empty());

        let without_children = children.attach(header(3));
        assert!(without_children.certified_by.is_empty());
        assert!(without_children.accounting_entries.is_empty());
    }
}
