// src/db/pg_store.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::store::{LabStore, StoreError, DEFAULT_LOG_LIMIT},
    models::{
        borrowing::{Borrowing, BorrowingFilter, BorrowingTransition, NewBorrowing},
        item::{Item, ItemFilter, ItemUpdate, NewItem},
        verification::{NewVerificationLog, VerificationLog, VerificationLogFilter},
    },
};

// "Em aberto" = pendente, ou aprovado e ainda não devolvido
const OPEN_BORROWING_CLAUSE: &str =
    "(approval_status = 'pending' OR (approval_status = 'approved' AND status = 'borrowed'))";

#[derive(Clone)]
pub struct PgLabStore {
    pool: PgPool,
}

impl PgLabStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(Self { pool })
    }

    // Roda as migrações do SQLx na inicialização
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
        Ok(())
    }
}

#[async_trait]
impl LabStore for PgLabStore {
    // ---
    // Itens
    // ---

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn find_items_by_code(&self, code: &str, limit: Option<i64>) -> Result<Vec<Item>, StoreError> {
        // LIMIT NULL = sem limite no Postgres
        let items = sqlx::query_as::<_, Item>(
            "SELECT * FROM items WHERE code = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(code)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, StoreError> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM items
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::item_condition IS NULL OR condition = $2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.category.as_deref())
        .bind(filter.condition)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn insert_item(&self, new_item: NewItem) -> Result<Item, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (code, name, category, condition, location, stock, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&new_item.code)
        .bind(&new_item.name)
        .bind(&new_item.category)
        .bind(new_item.condition)
        .bind(&new_item.location)
        .bind(new_item.stock)
        .bind(new_item.description.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn replace_item(&self, id: Uuid, update: ItemUpdate) -> Result<Item, StoreError> {
        // O estoque não entra aqui: só o workflow mexe nele
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET code = $2, name = $3, category = $4, condition = $5,
                location = $6, description = $7,
                updated_at = NOW(), version = version + 1
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.code)
        .bind(&update.name)
        .bind(&update.category)
        .bind(update.condition)
        .bind(&update.location)
        .bind(update.description.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        item.ok_or(StoreError::ItemMissing(id))
    }

    async fn delete_item_unreferenced(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // 1. Trava o item (bloqueia aprovações concorrentes que mexeriam no estoque)
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::ItemMissing(id));
        }

        // 2. Conta empréstimos em aberto
        let (active,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM borrowings WHERE item_id = $1 AND {OPEN_BORROWING_CLAUSE}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if active > 0 {
            // O drop do tx faz rollback
            return Err(StoreError::ItemReferenced { item_id: id, active: active as usize });
        }

        // 3. Remove
        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ---
    // Empréstimos
    // ---

    async fn get_borrowing(&self, id: Uuid) -> Result<Option<Borrowing>, StoreError> {
        let borrowing = sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(borrowing)
    }

    async fn insert_borrowing(&self, new_borrowing: NewBorrowing) -> Result<Borrowing, StoreError> {
        let mut tx = self.pool.begin().await?;

        // 1. Trava o item em modo compartilhado: a remoção (FOR UPDATE) espera
        //    esta transação, e um item já removido não aparece aqui
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM items WHERE id = $1 FOR SHARE")
            .bind(new_borrowing.item_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::ItemMissing(new_borrowing.item_id));
        }

        // 2. Insere. Status iniciais vêm dos DEFAULTs da tabela: borrowed / pending / NULL
        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (user_id, user_name, item_id, item_code, item_name, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_borrowing.user_id)
        .bind(&new_borrowing.user_name)
        .bind(new_borrowing.item_id)
        .bind(&new_borrowing.item_code)
        .bind(&new_borrowing.item_name)
        .bind(new_borrowing.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    async fn query_borrowings(&self, filter: &BorrowingFilter) -> Result<Vec<Borrowing>, StoreError> {
        let rows = sqlx::query_as::<_, Borrowing>(
            r#"
            SELECT * FROM borrowings
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::borrow_status IS NULL OR status = $3)
              AND ($4::approval_status IS NULL OR approval_status = $4)
              AND ($5::approval_status IS NULL OR return_approval_status = $5)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.item_id)
        .bind(filter.status)
        .bind(filter.approval_status)
        .bind(filter.return_approval_status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn commit_transition(&self, transition: &BorrowingTransition) -> Result<Borrowing, StoreError> {
        // Empréstimo e estoque na mesma transação: ou grava os dois, ou nenhum.
        let mut tx = self.pool.begin().await?;

        // 1. Trava o empréstimo e confere a versão lida pelo workflow (compare-and-set)
        let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM borrowings WHERE id = $1 FOR UPDATE")
            .bind(transition.borrowing_id)
            .fetch_optional(&mut *tx)
            .await?;
        match current {
            None => return Err(StoreError::BorrowingMissing(transition.borrowing_id)),
            Some((version,)) if version != transition.expected_version => {
                return Err(StoreError::StaleVersion { borrowing_id: transition.borrowing_id });
            }
            Some(_) => {}
        }

        // 2. Delta de estoque, recusado se deixaria o saldo negativo
        if transition.stock_delta != 0 {
            let updated: Option<(i32,)> = sqlx::query_as(
                r#"
                UPDATE items
                SET stock = stock + $2, updated_at = $3, version = version + 1
                WHERE id = $1 AND stock + $2 >= 0
                RETURNING stock
                "#,
            )
            .bind(transition.item_id)
            .bind(transition.stock_delta)
            .bind(transition.at)
            .fetch_optional(&mut *tx)
            .await?;

            if updated.is_none() {
                let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM items WHERE id = $1")
                    .bind(transition.item_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                return Err(match exists {
                    Some(_) => StoreError::StockUnderflow { item_id: transition.item_id },
                    None => StoreError::ItemMissing(transition.item_id),
                });
            }
        }

        // 3. Status do empréstimo
        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            UPDATE borrowings
            SET status = $2, approval_status = $3, return_approval_status = $4,
                return_date = $5, updated_at = $6, version = version + 1
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(transition.borrowing_id)
        .bind(transition.status)
        .bind(transition.approval_status)
        .bind(transition.return_approval_status)
        .bind(transition.return_date)
        .bind(transition.at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    // ---
    // Logs de verificação
    // ---

    async fn insert_verification_log(&self, new_log: NewVerificationLog) -> Result<VerificationLog, StoreError> {
        let log = sqlx::query_as::<_, VerificationLog>(
            r#"
            INSERT INTO verification_logs
                (barcode, item_id, item_code, item_name, status, scanned_at, user_id, user_name, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&new_log.barcode)
        .bind(new_log.item_id)
        .bind(new_log.item_code.as_deref())
        .bind(new_log.item_name.as_deref())
        .bind(new_log.status)
        .bind(Utc::now())
        .bind(new_log.user_id)
        .bind(new_log.user_name.as_deref())
        .bind(new_log.notes.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    async fn list_verification_logs(&self, filter: &VerificationLogFilter) -> Result<Vec<VerificationLog>, StoreError> {
        let logs = sqlx::query_as::<_, VerificationLog>(
            r#"
            SELECT * FROM verification_logs
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR barcode = $2)
            ORDER BY scanned_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.barcode.as_deref())
        .bind(filter.limit.unwrap_or(DEFAULT_LOG_LIMIT))
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn count_verification_logs(&self) -> Result<i64, StoreError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM verification_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
