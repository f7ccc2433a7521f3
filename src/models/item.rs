// src/models/item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Condição física do equipamento ---
// Fechado de propósito: valor desconhecido vindo do banco é erro de leitura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "item_condition")]
pub enum ItemCondition {
    Good,
    Maintenance,
    Broken,
}

// --- Item de laboratório ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    /// Código curto impresso na etiqueta (não é único no banco).
    #[schema(example = "LAB-001")]
    pub code: String,
    #[schema(example = "Osciloscópio Digital")]
    pub name: String,
    #[schema(example = "Eletrônica")]
    pub category: String,
    pub condition: ItemCondition,
    #[schema(example = "Sala 3, Armário B")]
    pub location: String,
    /// Unidades disponíveis. Nunca negativo.
    #[schema(example = 4)]
    pub stock: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(ignore)]
    pub version: i64,
}

// Dados para cadastrar um item (o store gera id, datas e versão)
#[derive(Debug, Clone)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub category: String,
    pub condition: ItemCondition,
    pub location: String,
    pub stock: i32,
    pub description: Option<String>,
}

// Campos descritivos editáveis. O estoque fica de fora: só o workflow mexe nele.
#[derive(Debug, Clone)]
pub struct ItemUpdate {
    pub code: String,
    pub name: String,
    pub category: String,
    pub condition: ItemCondition,
    pub location: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub condition: Option<ItemCondition>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        self.category.as_deref().is_none_or(|c| item.category == c)
            && self.condition.is_none_or(|c| item.condition == c)
    }
}
