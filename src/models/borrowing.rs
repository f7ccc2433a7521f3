// src/models/borrowing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "borrow_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Borrowed, // Vira "borrowed"
    Returned, // Vira "returned"
}

// Usado tanto para a aprovação do empréstimo quanto para a da devolução.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

// --- Empréstimo ---
// Um empréstimo = uma unidade de um item para um usuário.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Borrowing {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Ana Souza")]
    pub user_name: String,
    pub item_id: Uuid,
    #[schema(example = "LAB-001")]
    pub item_code: String,
    #[schema(example = "Osciloscópio Digital")]
    pub item_name: String,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub approval_status: ApprovalStatus,
    pub return_approval_status: Option<ApprovalStatus>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(ignore)]
    pub version: i64,
}

impl Borrowing {
    // Pendente de aprovação, ou aprovado e ainda não devolvido
    pub fn is_open(&self) -> bool {
        match self.approval_status {
            ApprovalStatus::Pending => true,
            ApprovalStatus::Approved => self.status == BorrowStatus::Borrowed,
            ApprovalStatus::Rejected => false,
        }
    }
}

// O que o workflow entrega ao store para criar o registro (sempre em "Requested")
#[derive(Debug, Clone)]
pub struct NewBorrowing {
    pub user_id: Uuid,
    pub user_name: String,
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub notes: Option<String>,
}

// Filtros por igualdade. Campos ausentes não filtram.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingFilter {
    pub user_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub status: Option<BorrowStatus>,
    pub approval_status: Option<ApprovalStatus>,
    pub return_approval_status: Option<ApprovalStatus>,
}

impl BorrowingFilter {
    pub fn matches(&self, b: &Borrowing) -> bool {
        self.user_id.is_none_or(|id| b.user_id == id)
            && self.item_id.is_none_or(|id| b.item_id == id)
            && self.status.is_none_or(|s| b.status == s)
            && self.approval_status.is_none_or(|s| b.approval_status == s)
            && self
                .return_approval_status
                .is_none_or(|s| b.return_approval_status == Some(s))
    }
}

/// Resultado de uma decisão do workflow, pronto para ser gravado.
///
/// O store aplica tudo ou nada: a atualização do empréstimo só acontece se
/// `expected_version` ainda for a versão atual, e o `stock_delta` só é aplicado
/// se o estoque do item continuar >= 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowingTransition {
    pub borrowing_id: Uuid,
    pub expected_version: i64,
    pub item_id: Uuid,
    pub stock_delta: i32,
    pub status: BorrowStatus,
    pub approval_status: ApprovalStatus,
    pub return_approval_status: Option<ApprovalStatus>,
    pub return_date: Option<DateTime<Utc>>,
    pub at: DateTime<Utc>,
}

impl BorrowingTransition {
    // Aplica os campos da transição num registro já lido (usado pelo store em memória
    // e para montar a resposta).
    pub fn apply_to(&self, borrowing: &mut Borrowing) {
        borrowing.status = self.status;
        borrowing.approval_status = self.approval_status;
        borrowing.return_approval_status = self.return_approval_status;
        borrowing.return_date = self.return_date;
        borrowing.updated_at = self.at;
        borrowing.version += 1;
    }
}

/// Devolução em andamento: liga a tela de leitura do QR ao empréstimo certo
/// sem estado global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingReturn {
    pub borrowing_id: Uuid,
    pub expected_item_id: Uuid,
}
