// src/db/memory_store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::store::{LabStore, StoreError, DEFAULT_LOG_LIMIT},
    models::{
        borrowing::{ApprovalStatus, BorrowStatus, Borrowing, BorrowingFilter, BorrowingTransition, NewBorrowing},
        item::{Item, ItemFilter, ItemUpdate, NewItem},
        verification::{NewVerificationLog, VerificationLog, VerificationLogFilter},
    },
};

#[derive(Default)]
struct Collections {
    items: HashMap<Uuid, Item>,
    borrowings: HashMap<Uuid, Borrowing>,
    // Só inserção, em ordem de chegada
    verification_logs: Vec<VerificationLog>,
}

/// Store em memória. Usado quando não há `DATABASE_URL` e nos testes.
///
/// Um único lock cobre as três coleções, então `commit_transition` é atômico
/// em relação a qualquer outra operação.
#[derive(Default)]
pub struct MemoryLabStore {
    inner: RwLock<Collections>,
}

impl MemoryLabStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Mais novo primeiro, desempate pelo id para ordem estável
    fn newest_first<T, K: Ord>(rows: &mut [T], key: impl Fn(&T) -> K) {
        rows.sort_by(|a, b| key(b).cmp(&key(a)));
    }
}

#[async_trait]
impl LabStore for MemoryLabStore {
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, StoreError> {
        Ok(self.inner.read().await.items.get(&id).cloned())
    }

    async fn find_items_by_code(&self, code: &str, limit: Option<i64>) -> Result<Vec<Item>, StoreError> {
        let guard = self.inner.read().await;
        let mut found: Vec<Item> = guard.items.values().filter(|i| i.code == code).cloned().collect();
        Self::newest_first(&mut found, |i| (i.created_at, i.id));
        if let Some(limit) = limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, StoreError> {
        let guard = self.inner.read().await;
        let mut items: Vec<Item> = guard.items.values().filter(|i| filter.matches(i)).cloned().collect();
        Self::newest_first(&mut items, |i| (i.created_at, i.id));
        Ok(items)
    }

    async fn insert_item(&self, new_item: NewItem) -> Result<Item, StoreError> {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            code: new_item.code,
            name: new_item.name,
            category: new_item.category,
            condition: new_item.condition,
            location: new_item.location,
            stock: new_item.stock,
            description: new_item.description,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.inner.write().await.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn replace_item(&self, id: Uuid, update: ItemUpdate) -> Result<Item, StoreError> {
        let mut guard = self.inner.write().await;
        let item = guard.items.get_mut(&id).ok_or(StoreError::ItemMissing(id))?;
        item.code = update.code;
        item.name = update.name;
        item.category = update.category;
        item.condition = update.condition;
        item.location = update.location;
        item.description = update.description;
        item.updated_at = Utc::now();
        item.version += 1;
        Ok(item.clone())
    }

    async fn delete_item_unreferenced(&self, id: Uuid) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if !guard.items.contains_key(&id) {
            return Err(StoreError::ItemMissing(id));
        }
        let active = guard
            .borrowings
            .values()
            .filter(|b| b.item_id == id && b.is_open())
            .count();
        if active > 0 {
            return Err(StoreError::ItemReferenced { item_id: id, active });
        }
        guard.items.remove(&id);
        Ok(())
    }

    async fn get_borrowing(&self, id: Uuid) -> Result<Option<Borrowing>, StoreError> {
        Ok(self.inner.read().await.borrowings.get(&id).cloned())
    }

    async fn insert_borrowing(&self, new_borrowing: NewBorrowing) -> Result<Borrowing, StoreError> {
        let mut guard = self.inner.write().await;
        // O item precisa existir no momento da inserção, sob o mesmo lock da remoção
        if !guard.items.contains_key(&new_borrowing.item_id) {
            return Err(StoreError::ItemMissing(new_borrowing.item_id));
        }

        let now = Utc::now();
        let borrowing = Borrowing {
            id: Uuid::new_v4(),
            user_id: new_borrowing.user_id,
            user_name: new_borrowing.user_name,
            item_id: new_borrowing.item_id,
            item_code: new_borrowing.item_code,
            item_name: new_borrowing.item_name,
            borrow_date: now,
            return_date: None,
            status: BorrowStatus::Borrowed,
            approval_status: ApprovalStatus::Pending,
            return_approval_status: None,
            notes: new_borrowing.notes,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        guard.borrowings.insert(borrowing.id, borrowing.clone());
        Ok(borrowing)
    }

    async fn query_borrowings(&self, filter: &BorrowingFilter) -> Result<Vec<Borrowing>, StoreError> {
        let guard = self.inner.read().await;
        let mut rows: Vec<Borrowing> = guard.borrowings.values().filter(|b| filter.matches(b)).cloned().collect();
        Self::newest_first(&mut rows, |b| (b.created_at, b.id));
        Ok(rows)
    }

    async fn commit_transition(&self, transition: &BorrowingTransition) -> Result<Borrowing, StoreError> {
        let mut guard = self.inner.write().await;

        // 1. Valida tudo antes de escrever qualquer coisa
        let current = guard
            .borrowings
            .get(&transition.borrowing_id)
            .ok_or(StoreError::BorrowingMissing(transition.borrowing_id))?;
        if current.version != transition.expected_version {
            return Err(StoreError::StaleVersion { borrowing_id: transition.borrowing_id });
        }

        if transition.stock_delta != 0 {
            let item = guard
                .items
                .get(&transition.item_id)
                .ok_or(StoreError::ItemMissing(transition.item_id))?;
            if item.stock + transition.stock_delta < 0 {
                return Err(StoreError::StockUnderflow { item_id: transition.item_id });
            }
        }

        // 2. Aplica as duas escritas sob o mesmo lock
        if transition.stock_delta != 0 {
            if let Some(item) = guard.items.get_mut(&transition.item_id) {
                item.stock += transition.stock_delta;
                item.updated_at = transition.at;
                item.version += 1;
            }
        }

        let borrowing = guard
            .borrowings
            .get_mut(&transition.borrowing_id)
            .ok_or(StoreError::BorrowingMissing(transition.borrowing_id))?;
        transition.apply_to(borrowing);
        Ok(borrowing.clone())
    }

    async fn insert_verification_log(&self, new_log: NewVerificationLog) -> Result<VerificationLog, StoreError> {
        let log = VerificationLog {
            id: Uuid::new_v4(),
            barcode: new_log.barcode,
            item_id: new_log.item_id,
            item_code: new_log.item_code,
            item_name: new_log.item_name,
            status: new_log.status,
            scanned_at: Utc::now(),
            user_id: new_log.user_id,
            user_name: new_log.user_name,
            notes: new_log.notes,
        };
        self.inner.write().await.verification_logs.push(log.clone());
        Ok(log)
    }

    async fn list_verification_logs(&self, filter: &VerificationLogFilter) -> Result<Vec<VerificationLog>, StoreError> {
        let guard = self.inner.read().await;
        // Ordem de inserção invertida = mais novo primeiro, mesmo com timestamps iguais
        let logs = guard
            .verification_logs
            .iter()
            .rev()
            .filter(|l| filter.matches(l))
            .take(filter.limit.unwrap_or(DEFAULT_LOG_LIMIT).max(0) as usize)
            .cloned()
            .collect();
        Ok(logs)
    }

    async fn count_verification_logs(&self) -> Result<i64, StoreError> {
        Ok(self.inner.read().await.verification_logs.len() as i64)
    }
}
