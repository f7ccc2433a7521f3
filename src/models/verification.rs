// src/models/verification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "verification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Valid,
    Invalid,
}

// --- Log de verificação (auditoria, só inserção) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLog {
    pub id: Uuid,
    /// Texto lido do QR, exatamente como veio do scanner.
    #[schema(example = "LAB-001")]
    pub barcode: String,
    pub item_id: Option<Uuid>,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub status: VerificationStatus,
    pub scanned_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVerificationLog {
    pub barcode: String,
    pub item_id: Option<Uuid>,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub status: VerificationStatus,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLogFilter {
    pub user_id: Option<Uuid>,
    pub barcode: Option<String>,
    pub limit: Option<i64>,
}

impl VerificationLogFilter {
    pub fn matches(&self, log: &VerificationLog) -> bool {
        self.user_id.is_none_or(|id| log.user_id == Some(id))
            && self.barcode.as_deref().is_none_or(|b| log.barcode == b)
    }
}
