use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use shared::Result;
use std::collections::BTreeMap;

use crate::api::disbursement_voucher::models::{
    DisbursementVoucher, DisbursementVoucherRequest, ReportStatus, UpsertOutcome, VoucherHeader,
    VoucherKey,
};
use crate::api::disbursement_voucher::repository::VoucherStore;

/// Process-local voucher store. Writers are serialized by the lock and each
/// aggregate is swapped in whole, so readers never see a half-written voucher.
#[derive(Default)]
pub struct InMemoryVoucherStore {
    vouchers: RwLock<BTreeMap<VoucherKey, DisbursementVoucher>>,
}

impl InMemoryVoucherStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a voucher through the review workflow, as the reviewing side of
    /// the system would. Returns false when the voucher does not exist.
    pub fn set_report_status(&self, key: VoucherKey, status: ReportStatus) -> bool {
        match self.vouchers.write().get_mut(&key) {
            Some(voucher) => {
                voucher.header.report_status = status;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.vouchers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vouchers.read().is_empty()
    }
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn upsert(
        &self,
        key: VoucherKey,
        request: &DisbursementVoucherRequest,
    ) -> Result<UpsertOutcome> {
        let mut vouchers = self.vouchers.write();

        let existing_status = vouchers.get(&key).map(|voucher| voucher.header.report_status);
        let voucher = DisbursementVoucher {
            header: VoucherHeader::from_request(key, request, existing_status.unwrap_or_default()),
            entries: request.entries.clone(),
            accounting_entries: request.accounting_entries.clone(),
            certified_by: request.certified_by.clone(),
        };
        vouchers.insert(key, voucher.clone());

        Ok(UpsertOutcome {
            voucher,
            created: existing_status.is_none(),
        })
    }

    async fn find(&self, key: VoucherKey) -> Result<Option<DisbursementVoucher>> {
        Ok(self.vouchers.read().get(&key).cloned())
    }

    async fn list_for_month(
        &self,
        school_id: i32,
        parent: NaiveDate,
        linked_category: Option<&str>,
    ) -> Result<Vec<DisbursementVoucher>> {
        let vouchers = self.vouchers.read();

        Ok(vouchers
            .values()
            .filter(|voucher| {
                voucher.header.school_id == school_id && voucher.header.parent == parent
            })
            .filter(|voucher| match linked_category {
                Some(category) => {
                    voucher.header.linked_liquidation_category.as_deref() == Some(category)
                }
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
