// src/services/verification_service.rs

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::LabStore,
    models::{
        auth::User,
        item::Item,
        verification::{NewVerificationLog, VerificationLog, VerificationLogFilter, VerificationStatus},
    },
    services::qr_resolver::QrResolver,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub log: VerificationLog,
    /// Ausente quando a leitura não corresponde a nenhum item.
    pub item: Option<Item>,
}

/// Leituras avulsas do scanner. Toda leitura vira um log, válida ou não.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn LabStore>,
    resolver: QrResolver,
}

impl VerificationService {
    pub fn new(store: Arc<dyn LabStore>, resolver: QrResolver) -> Self {
        Self { store, resolver }
    }

    pub async fn verify_scan(
        &self,
        actor: &User,
        scanned: &str,
        notes: Option<String>,
    ) -> Result<ScanResult, AppError> {
        let item = match self.resolver.resolve_scan(scanned).await {
            Ok(resolved) => Some(resolved.item),
            // Código desconhecido não é erro aqui: é um log "invalid"
            Err(AppError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let status = if item.is_some() {
            VerificationStatus::Valid
        } else {
            VerificationStatus::Invalid
        };

        let log = self
            .store
            .insert_verification_log(NewVerificationLog {
                barcode: scanned.to_string(),
                item_id: item.as_ref().map(|i| i.id),
                item_code: item.as_ref().map(|i| i.code.clone()),
                item_name: item.as_ref().map(|i| i.name.clone()),
                status,
                user_id: Some(actor.id),
                user_name: Some(actor.name.clone()),
                notes,
            })
            .await?;

        tracing::info!(barcode = %log.barcode, status = ?log.status, "🔎 Leitura registrada");
        Ok(ScanResult { log, item })
    }

    pub async fn list_logs(&self, filter: &VerificationLogFilter) -> Result<Vec<VerificationLog>, AppError> {
        Ok(self.store.list_verification_logs(filter).await?)
    }
}
