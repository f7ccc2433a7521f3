// src/models/dashboard.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::verification::VerificationLog;

// Os cards do topo do painel do laboratório
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_items: usize,
    pub good_condition: usize,
    pub need_maintenance: usize,
    pub broken: usize,
    pub total_units_in_stock: i64,      // Soma do estoque de todos os itens
    pub pending_borrow_approvals: usize, // Fila de aprovação
    pub active_borrowings: usize,        // Aprovados e ainda não devolvidos
    pub pending_return_approvals: usize, // Devoluções aguardando o técnico
    pub total_scans: i64,
    pub recent_scans: Vec<VerificationLog>,
}
