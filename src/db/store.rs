// src/db/store.rs

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    borrowing::{Borrowing, BorrowingFilter, BorrowingTransition, NewBorrowing},
    item::{Item, ItemFilter, ItemUpdate, NewItem},
    verification::{NewVerificationLog, VerificationLog, VerificationLogFilter},
};

// Limite padrão da listagem de logs (a tela de histórico mostra os últimos 100)
pub const DEFAULT_LOG_LIMIT: i64 = 100;

// Falhas do contrato de persistência
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item {0} não existe")]
    ItemMissing(Uuid),

    #[error("empréstimo {0} não existe")]
    BorrowingMissing(Uuid),

    // O registro mudou entre a leitura e a escrita (compare-and-set falhou)
    #[error("versão desatualizada do empréstimo {borrowing_id}")]
    StaleVersion { borrowing_id: Uuid },

    // A escrita deixaria o estoque negativo
    #[error("estoque insuficiente no item {item_id}")]
    StockUnderflow { item_id: Uuid },

    #[error("item {item_id} referenciado por {active} empréstimo(s) em aberto")]
    ItemReferenced { item_id: Uuid, active: usize },

    #[error("falha de I/O no banco: {0}")]
    Unavailable(String),

    // Valor fora dos enums fechados, coluna com tipo inesperado etc.
    #[error("registro inválido no banco: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::TypeNotFound { .. } => {
                StoreError::Corrupt(err.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Contrato do banco de documentos consumido pelo workflow.
///
/// Coleções: `items`, `borrowings` e `verification_logs` (só inserção).
/// Consultas de lista voltam do mais novo para o mais antigo.
#[async_trait]
pub trait LabStore: Send + Sync {
    // --- Itens ---
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, StoreError>;

    /// Igualdade exata no campo `code`.
    async fn find_items_by_code(&self, code: &str, limit: Option<i64>) -> Result<Vec<Item>, StoreError>;

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, StoreError>;

    async fn insert_item(&self, new_item: NewItem) -> Result<Item, StoreError>;

    async fn replace_item(&self, id: Uuid, update: ItemUpdate) -> Result<Item, StoreError>;

    /// Remove o item somente se nenhum empréstimo em aberto (pendente ou
    /// aprovado e não devolvido) apontar para ele. A checagem e a remoção são atômicas.
    async fn delete_item_unreferenced(&self, id: Uuid) -> Result<(), StoreError>;

    // --- Empréstimos ---
    async fn get_borrowing(&self, id: Uuid) -> Result<Option<Borrowing>, StoreError>;

    async fn insert_borrowing(&self, new_borrowing: NewBorrowing) -> Result<Borrowing, StoreError>;

    async fn query_borrowings(&self, filter: &BorrowingFilter) -> Result<Vec<Borrowing>, StoreError>;

    /// Grava a decisão do workflow: status do empréstimo + delta de estoque,
    /// tudo ou nada.
    async fn commit_transition(&self, transition: &BorrowingTransition) -> Result<Borrowing, StoreError>;

    // --- Logs de verificação ---
    async fn insert_verification_log(&self, new_log: NewVerificationLog) -> Result<VerificationLog, StoreError>;

    async fn list_verification_logs(&self, filter: &VerificationLogFilter) -> Result<Vec<VerificationLog>, StoreError>;

    /// Total de leituras registradas.
    async fn count_verification_logs(&self) -> Result<i64, StoreError>;
}
