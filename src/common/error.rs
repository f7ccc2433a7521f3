use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::db::StoreError;
use crate::middleware::i18n::Locale;

// Qual registro faltou (para a mensagem e para o código de erro)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Item,
    ItemCode,
    Borrowing,
}

impl Resource {
    fn label(&self, locale: &Locale) -> &'static str {
        match self {
            Resource::Item => locale.pick("Item", "Item"),
            Resource::ItemCode => locale.pick("Código de item", "Item code"),
            Resource::Borrowing => locale.pick("Empréstimo", "Borrowing"),
        }
    }
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{resource:?} não encontrado: {id}")]
    NotFound { resource: Resource, id: String },

    // Ação não permitida no estado atual do empréstimo
    #[error("Transição inválida para o empréstimo {borrowing_id}: {action} a partir de {state}")]
    InvalidState {
        borrowing_id: Uuid,
        action: &'static str,
        state: String,
    },

    #[error("Item {item_id} sem estoque disponível")]
    OutOfStock { item_id: Uuid },

    // O QR lido pertence a outro item (ou a nenhum item do empréstimo)
    #[error("QR não corresponde ao item emprestado (esperado {expected_item_id}, lido '{scanned}')")]
    IdentityMismatch {
        expected_item_id: Uuid,
        expected_item_code: String,
        scanned: String,
        scanned_item_id: Option<Uuid>,
    },

    #[error("Item {item_id} possui {active} empréstimo(s) em aberto")]
    ItemInUse { item_id: Uuid, active: usize },

    #[error("Banco de dados indisponível: {0}")]
    StoreUnavailable(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn not_found(resource: Resource, id: impl ToString) -> Self {
        AppError::NotFound { resource, id: id.to_string() }
    }

    /// Código estável para o cliente decidir a mensagem e o botão de "tentar de novo".
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::InvalidState { .. } => "INVALID_STATE",
            AppError::OutOfStock { .. } => "OUT_OF_STOCK",
            AppError::IdentityMismatch { .. } => "IDENTITY_MISMATCH",
            AppError::ItemInUse { .. } => "CONFLICT",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::InvalidToken | AppError::JwtError(_) => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InternalServerError(_) => "INTERNAL",
        }
    }

    // Só falha de I/O vale repetir a mesma operação.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidState { .. }
            | AppError::OutOfStock { .. }
            | AppError::ItemInUse { .. } => StatusCode::CONFLICT,
            AppError::IdentityMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidToken | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte para a resposta da API, com a mensagem no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        let (message, details) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                (
                    locale
                        .pick("Um ou mais campos são inválidos.", "One or more fields are invalid.")
                        .to_string(),
                    Some(json!(details)),
                )
            }
            AppError::NotFound { resource, id } => (
                format!(
                    "{} {}: {}",
                    resource.label(locale),
                    locale.pick("não encontrado", "not found"),
                    id
                ),
                None,
            ),
            AppError::InvalidState { action, state, .. } => (
                format!(
                    "{} '{}' ({}: {})",
                    locale.pick("Ação não permitida", "Action not allowed"),
                    action,
                    locale.pick("estado atual", "current state"),
                    state
                ),
                None,
            ),
            AppError::OutOfStock { item_id } => (
                locale.pick("Estoque não disponível.", "Stock not available.").to_string(),
                Some(json!({ "itemId": item_id })),
            ),
            AppError::IdentityMismatch {
                expected_item_id,
                expected_item_code,
                scanned,
                scanned_item_id,
            } => (
                locale
                    .pick(
                        "O QR Code não corresponde ao item emprestado.",
                        "The QR code does not match the borrowed item.",
                    )
                    .to_string(),
                Some(json!({
                    "expectedItemId": expected_item_id,
                    "expectedItemCode": expected_item_code,
                    "scanned": scanned,
                    "scannedItemId": scanned_item_id,
                })),
            ),
            AppError::ItemInUse { item_id, active } => (
                locale
                    .pick(
                        "O item possui empréstimos em aberto e não pode ser removido.",
                        "The item has open borrowings and cannot be deleted.",
                    )
                    .to_string(),
                Some(json!({ "itemId": item_id, "openBorrowings": active })),
            ),
            AppError::StoreUnavailable(_) => (
                locale
                    .pick(
                        "Serviço temporariamente indisponível. Tente novamente.",
                        "Service temporarily unavailable. Please retry.",
                    )
                    .to_string(),
                None,
            ),
            AppError::InvalidToken | AppError::JwtError(_) => (
                locale
                    .pick(
                        "Token de autenticação inválido ou ausente.",
                        "Missing or invalid authentication token.",
                    )
                    .to_string(),
                None,
            ),
            AppError::Forbidden => (
                locale
                    .pick(
                        "Você não tem permissão para realizar esta ação.",
                        "You are not allowed to perform this action.",
                    )
                    .to_string(),
                None,
            ),
            AppError::InternalServerError(_) => (
                locale.pick("Ocorreu um erro inesperado.", "An unexpected error occurred.").to_string(),
                None,
            ),
        };

        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        ApiError {
            status,
            kind: self.kind(),
            message,
            details,
        }
    }
}

// Falhas do store viram erros de aplicação
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ItemMissing(id) => AppError::not_found(Resource::Item, id),
            StoreError::BorrowingMissing(id) => AppError::not_found(Resource::Borrowing, id),
            StoreError::StaleVersion { borrowing_id } => AppError::InvalidState {
                borrowing_id,
                action: "commit",
                state: "modificado concorrentemente".to_string(),
            },
            StoreError::StockUnderflow { item_id } => AppError::OutOfStock { item_id },
            StoreError::ItemReferenced { item_id, active } => AppError::ItemInUse { item_id, active },
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            e @ StoreError::Corrupt(_) => AppError::InternalServerError(anyhow::anyhow!(e)),
        }
    }
}

// Erro já pronto para virar resposta HTTP
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Mesmo envelope das respostas de sucesso: {success, message, data}
        let body = Json(json!({
            "success": false,
            "message": self.message,
            "error": self.kind,
            "data": self.details,
        }));
        (self.status, body).into_response()
    }
}

// Usado quando não há `Locale` à mão (rejeições de extratores)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
