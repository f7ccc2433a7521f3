// src/services/dashboard_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::LabStore,
    models::{
        borrowing::{ApprovalStatus, BorrowStatus, BorrowingFilter},
        dashboard::DashboardSummary,
        item::{ItemCondition, ItemFilter},
        verification::VerificationLogFilter,
    },
};

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn LabStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn LabStore>) -> Self {
        Self { store }
    }

    pub async fn get_summary(&self, recent_scans: i64) -> Result<DashboardSummary, AppError> {
        let items = self.store.list_items(&ItemFilter::default()).await?;
        let borrowings = self.store.query_borrowings(&BorrowingFilter::default()).await?;
        // Total pelo COUNT; da coleção só vêm as N leituras mais recentes
        let total_scans = self.store.count_verification_logs().await?;
        let logs = self
            .store
            .list_verification_logs(&VerificationLogFilter {
                limit: Some(recent_scans.max(0)),
                ..Default::default()
            })
            .await?;

        let count_condition = |c: ItemCondition| items.iter().filter(|i| i.condition == c).count();

        Ok(DashboardSummary {
            total_items: items.len(),
            good_condition: count_condition(ItemCondition::Good),
            need_maintenance: count_condition(ItemCondition::Maintenance),
            broken: count_condition(ItemCondition::Broken),
            total_units_in_stock: items.iter().map(|i| i64::from(i.stock)).sum(),
            pending_borrow_approvals: borrowings
                .iter()
                .filter(|b| b.approval_status == ApprovalStatus::Pending)
                .count(),
            active_borrowings: borrowings
                .iter()
                .filter(|b| b.approval_status == ApprovalStatus::Approved && b.status == BorrowStatus::Borrowed)
                .count(),
            pending_return_approvals: borrowings
                .iter()
                .filter(|b| b.return_approval_status == Some(ApprovalStatus::Pending))
                .count(),
            total_scans,
            recent_scans: logs,
        })
    }
}
