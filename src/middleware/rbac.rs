// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{Role, User},
};

/// 1. O Trait que define quem pode passar
pub trait RoleDef: Send + Sync + 'static {
    fn allows(role: Role) -> bool;
    fn name() -> &'static str;
}

/// 2. O Extractor (Guardião). Roda depois do `auth_guard`.
pub struct RequireRole<T>(pub User, PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        // A. Extrai Usuário
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state)
            .await
            .map_err(|e| e.to_api_error(&locale))?;

        // B. Confere o papel
        if !T::allows(user.role) {
            tracing::warn!(user_id = %user.id, required = T::name(), "Acesso negado");
            return Err(AppError::Forbidden.to_api_error(&locale));
        }

        Ok(RequireRole(user, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct StaffOnly;
impl RoleDef for StaffOnly {
    fn allows(role: Role) -> bool { role == Role::Staff }
    fn name() -> &'static str { "staff" }
}
