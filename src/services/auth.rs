// src/services/auth.rs

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Claims, User},
};

/// Tokens HS256 emitidos pelo provedor de login. Não há tabela de usuários:
/// nome e papel vêm das claims.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token recusado: {}", e);
            AppError::InvalidToken
        })?;

        let claims = token_data.claims;
        Ok(User {
            id: claims.sub,
            name: claims.name,
            role: claims.role,
        })
    }

    // Para ferramentas e testes; em produção quem emite é o provedor.
    pub fn issue_token(&self, user: &User, ttl: chrono::Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Claims {
            sub: user.id,
            name: user.name.clone(),
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
