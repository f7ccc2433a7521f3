// src/services/qr_resolver.rs

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::LabStore,
    models::{borrowing::Borrowing, item::Item},
};

// Como o texto lido foi reconhecido
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchedBy {
    Id,   // O QR carrega o id do item
    Code, // O QR carrega o código da etiqueta
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    pub item: Item,
    pub matched_by: MatchedBy,
}

/// Traduz o texto de um QR para um item: primeiro pelo id, depois pelo código.
#[derive(Clone)]
pub struct QrResolver {
    store: Arc<dyn LabStore>,
}

// Comparação de id pela forma canônica do UUID
fn as_item_id(scanned: &str) -> Option<Uuid> {
    Uuid::parse_str(scanned).ok()
}

impl QrResolver {
    pub fn new(store: Arc<dyn LabStore>) -> Self {
        Self { store }
    }

    /// Confere se o QR lido é o item do empréstimo.
    ///
    /// O id é sempre testado primeiro: um código que por acaso seja igual ao id
    /// de outro item nunca esconde um match real por id.
    pub async fn resolve_for_borrowing(&self, borrowing: &Borrowing, scanned: &str) -> Result<ResolvedItem, AppError> {
        let code = scanned.trim();

        // 1. Match exato pelo id
        let (actual_id, matched_by) = if as_item_id(code) == Some(borrowing.item_id) {
            (borrowing.item_id, MatchedBy::Id)
        } else {
            // 2. Busca pelo campo code
            let found = self.store.find_items_by_code(code, None).await?;

            if found.is_empty() {
                tracing::warn!(borrowing_id = %borrowing.id, scanned = code, "QR não corresponde a nenhum item");
                return Err(AppError::not_found(Resource::ItemCode, code));
            }

            if found.iter().any(|i| i.id == borrowing.item_id) {
                (borrowing.item_id, MatchedBy::Code)
            } else {
                // Código válido, mas de outro item
                tracing::warn!(
                    borrowing_id = %borrowing.id,
                    expected = %borrowing.item_id,
                    found = %found[0].id,
                    "QR pertence a outro item"
                );
                return Err(AppError::IdentityMismatch {
                    expected_item_id: borrowing.item_id,
                    expected_item_code: borrowing.item_code.clone(),
                    scanned: code.to_string(),
                    scanned_item_id: Some(found[0].id),
                });
            }
        };

        // 3. Carrega o item (ausente aqui = empréstimo apontando para item apagado)
        let item = self
            .store
            .get_item(actual_id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Item, actual_id))?;

        Ok(ResolvedItem { item, matched_by })
    }

    /// Leitura avulsa do scanner, sem empréstimo: id primeiro, depois código.
    pub async fn resolve_scan(&self, scanned: &str) -> Result<ResolvedItem, AppError> {
        let code = scanned.trim();

        if let Some(id) = as_item_id(code) {
            if let Some(item) = self.store.get_item(id).await? {
                return Ok(ResolvedItem { item, matched_by: MatchedBy::Id });
            }
        }

        // Códigos repetidos: fica o cadastro mais recente
        self.store
            .find_items_by_code(code, Some(1))
            .await?
            .into_iter()
            .next()
            .map(|item| ResolvedItem { item, matched_by: MatchedBy::Code })
            .ok_or_else(|| AppError::not_found(Resource::ItemCode, code))
    }
}
