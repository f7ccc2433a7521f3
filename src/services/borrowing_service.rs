// src/services/borrowing_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::{LabStore, StoreError},
    models::{
        auth::User,
        borrowing::{Borrowing, BorrowingFilter, NewBorrowing, PendingReturn},
        item::Item,
    },
    services::{
        qr_resolver::{QrResolver, ResolvedItem},
        workflow::{self, BorrowAction},
    },
};

// Pedido de empréstimo. Código e nome do item são copiados do cadastro se não vierem.
#[derive(Debug, Clone)]
pub struct BorrowRequest {
    pub user_id: Uuid,
    pub user_name: String,
    pub item_id: Uuid,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub notes: Option<String>,
}

// Resultado da devolução enviada pelo usuário
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSubmission {
    pub borrowing: Borrowing,
    pub item: Item,
}

/// O motor do workflow de empréstimo/devolução.
///
/// Cada operação lê o estado atual, decide (regras em `workflow`) e grava a
/// transição de uma vez. Nenhuma operação é repetida automaticamente.
#[derive(Clone)]
pub struct BorrowingService {
    store: Arc<dyn LabStore>,
    resolver: QrResolver,
}

impl BorrowingService {
    pub fn new(store: Arc<dyn LabStore>, resolver: QrResolver) -> Self {
        Self { store, resolver }
    }

    // --- Leitura ---

    pub async fn get_borrowing(&self, borrowing_id: Uuid) -> Result<Borrowing, AppError> {
        self.store
            .get_borrowing(borrowing_id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Borrowing, borrowing_id))
    }

    // Mesmo que `get_borrowing`, mas só para o dono ou um técnico
    pub async fn get_borrowing_for(&self, actor: &User, borrowing_id: Uuid) -> Result<Borrowing, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        ensure_access(actor, &borrowing)?;
        Ok(borrowing)
    }

    pub async fn list_borrowings(&self, filter: &BorrowingFilter) -> Result<Vec<Borrowing>, AppError> {
        Ok(self.store.query_borrowings(filter).await?)
    }

    // --- PEDIDO ---

    /// Cria o empréstimo em "Requested".
    ///
    /// A checagem de estoque aqui é só informativa: nada é reservado, e outra
    /// aprovação pode consumir a última unidade antes desta ser aprovada.
    pub async fn request_borrow(&self, request: BorrowRequest) -> Result<Borrowing, AppError> {
        let item = self
            .store
            .get_item(request.item_id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Item, request.item_id))?;

        if item.stock <= 0 {
            return Err(AppError::OutOfStock { item_id: item.id });
        }

        let borrowing = self
            .store
            .insert_borrowing(NewBorrowing {
                user_id: request.user_id,
                user_name: request.user_name,
                item_id: item.id,
                item_code: request.item_code.unwrap_or(item.code),
                item_name: request.item_name.unwrap_or(item.name),
                notes: request.notes,
            })
            .await?;

        tracing::info!(borrowing_id = %borrowing.id, item_id = %borrowing.item_id, "📥 Pedido de empréstimo criado");
        Ok(borrowing)
    }

    // --- APROVAÇÃO DO EMPRÉSTIMO ---

    /// Aprova e reserva a unidade (estoque - 1). O estoque é relido agora.
    pub async fn approve_borrow(&self, borrowing_id: Uuid) -> Result<Borrowing, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        let stock = self.store.get_item(borrowing.item_id).await?.map(|i| i.stock);
        self.transition(BorrowAction::ApproveBorrow, &borrowing, stock).await
    }

    pub async fn reject_borrow(&self, borrowing_id: Uuid) -> Result<Borrowing, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        self.transition(BorrowAction::RejectBorrow, &borrowing, None).await
    }

    // --- DEVOLUÇÃO ---

    pub async fn request_return(&self, borrowing_id: Uuid) -> Result<Borrowing, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        self.transition(BorrowAction::RequestReturn, &borrowing, None).await
    }

    /// Só confere; não grava nada.
    pub async fn verify_return_identity(&self, borrowing_id: Uuid, scanned: &str) -> Result<ResolvedItem, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        self.resolver.resolve_for_borrowing(&borrowing, scanned).await
    }

    /// Abre a devolução: devolve o contexto que a tela de leitura do QR precisa.
    pub async fn begin_return(&self, actor: &User, borrowing_id: Uuid) -> Result<PendingReturn, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        ensure_access(actor, &borrowing)?;

        // Mesma regra do RequestReturn, sem gravar
        workflow::decide(BorrowAction::RequestReturn, &borrowing, None, Utc::now())?;

        Ok(PendingReturn {
            borrowing_id: borrowing.id,
            expected_item_id: borrowing.item_id,
        })
    }

    /// Leitura do QR na devolução: confere o item e deixa a devolução pendente
    /// de aprovação do técnico.
    pub async fn submit_return(
        &self,
        actor: &User,
        pending: PendingReturn,
        scanned: &str,
    ) -> Result<ReturnSubmission, AppError> {
        let borrowing = self.get_borrowing(pending.borrowing_id).await?;
        ensure_access(actor, &borrowing)?;

        let resolved = self.resolver.resolve_for_borrowing(&borrowing, scanned).await?;
        if resolved.item.id != pending.expected_item_id {
            // Contexto montado para outro item
            return Err(AppError::IdentityMismatch {
                expected_item_id: pending.expected_item_id,
                expected_item_code: borrowing.item_code.clone(),
                scanned: scanned.trim().to_string(),
                scanned_item_id: Some(resolved.item.id),
            });
        }

        let borrowing = self.transition(BorrowAction::RequestReturn, &borrowing, None).await?;
        Ok(ReturnSubmission {
            borrowing,
            item: resolved.item,
        })
    }

    /// Aprova a devolução (estoque + 1). A identidade do item é conferida de
    /// novo antes de qualquer escrita.
    pub async fn approve_return(&self, borrowing_id: Uuid, verified_item_id: &str) -> Result<Borrowing, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        let resolved = self.resolver.resolve_for_borrowing(&borrowing, verified_item_id).await?;
        self.transition(BorrowAction::ApproveReturn, &borrowing, Some(resolved.item.stock))
            .await
    }

    pub async fn reject_return(&self, borrowing_id: Uuid) -> Result<Borrowing, AppError> {
        let borrowing = self.get_borrowing(borrowing_id).await?;
        self.transition(BorrowAction::RejectReturn, &borrowing, None).await
    }

    // Decide e grava. Versão desatualizada = alguém mexeu no registro entre a
    // leitura e a escrita: relê para informar o estado atual.
    async fn transition(
        &self,
        action: BorrowAction,
        borrowing: &Borrowing,
        item_stock: Option<i32>,
    ) -> Result<Borrowing, AppError> {
        let decision = workflow::decide(action, borrowing, item_stock, Utc::now()).inspect_err(|e| {
            tracing::warn!(borrowing_id = %borrowing.id, action = action.name(), "⛔ Transição recusada: {}", e);
        })?;

        match self.store.commit_transition(&decision).await {
            Ok(updated) => {
                tracing::info!(
                    borrowing_id = %updated.id,
                    action = action.name(),
                    stock_delta = decision.stock_delta,
                    state = %workflow::state_label(&updated),
                    "✅ Empréstimo atualizado"
                );
                Ok(updated)
            }
            Err(StoreError::StaleVersion { borrowing_id }) => {
                let current = self.get_borrowing(borrowing_id).await?;
                tracing::warn!(%borrowing_id, action = action.name(), "⚠️ Empréstimo alterado concorrentemente");
                Err(AppError::InvalidState {
                    borrowing_id,
                    action: action.name(),
                    state: workflow::state_label(&current),
                })
            }
            Err(e) => {
                if matches!(e, StoreError::Unavailable(_)) {
                    tracing::error!(borrowing_id = %borrowing.id, "🔥 Falha ao gravar transição: {}", e);
                }
                Err(e.into())
            }
        }
    }
}

// Dono do empréstimo ou técnico
fn ensure_access(actor: &User, borrowing: &Borrowing) -> Result<(), AppError> {
    if actor.can_access(borrowing.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
