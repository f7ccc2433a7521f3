// src/services/item_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::LabStore,
    models::item::{Item, ItemFilter, ItemUpdate, NewItem},
};

#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn LabStore>,
}

impl ItemService {
    pub fn new(store: Arc<dyn LabStore>) -> Self {
        Self { store }
    }

    pub async fn create_item(&self, new_item: NewItem) -> Result<Item, AppError> {
        let item = self.store.insert_item(new_item).await?;
        tracing::info!(item_id = %item.id, code = %item.code, stock = item.stock, "📦 Item cadastrado");
        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<Item, AppError> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Item, item_id))
    }

    // Códigos repetidos: devolve o cadastro mais recente
    pub async fn get_item_by_code(&self, code: &str) -> Result<Item, AppError> {
        let code = code.trim();
        self.store
            .find_items_by_code(code, Some(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(Resource::ItemCode, code))
    }

    pub async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, AppError> {
        Ok(self.store.list_items(filter).await?)
    }

    pub async fn update_item(&self, item_id: Uuid, update: ItemUpdate) -> Result<Item, AppError> {
        let item = self.store.replace_item(item_id, update).await?;
        tracing::info!(item_id = %item.id, "✏️ Item atualizado");
        Ok(item)
    }

    /// Remove o item. Recusado (`ItemInUse`) enquanto houver empréstimo pendente
    /// ou aprovado e não devolvido apontando para ele.
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), AppError> {
        self.store.delete_item_unreferenced(item_id).await.inspect_err(|e| {
            tracing::warn!(%item_id, "Remoção de item recusada: {}", e);
        })?;
        tracing::info!(%item_id, "🗑️ Item removido");
        Ok(())
    }
}
