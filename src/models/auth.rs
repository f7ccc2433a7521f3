// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// O login acontece no provedor externo; aqui só importa quem é e qual o papel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student, // Pede empréstimos e devolve
    Staff,   // Técnico do laboratório: aprova, rejeita, cadastra itens
}

// Usuário autenticado, montado a partir das claims do token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "Ana Souza")]
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    // Dono do empréstimo ou técnico
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_staff() || self.id == owner_id
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub name: String,
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}
