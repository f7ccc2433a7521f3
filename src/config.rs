// src/config.rs

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    db::{LabStore, MemoryLabStore, PgLabStore},
    services::{
        auth::AuthService, BorrowingService, DashboardService, ItemService, QrResolver, VerificationService,
    },
};

// Lidas do ambiente (e do .env, se existir)
#[derive(Debug, Clone)]
pub struct Settings {
    /// Sem DATABASE_URL o servidor sobe com o store em memória.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: SocketAddr,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub recent_scans_limit: i64,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        Ok(Self {
            database_url,
            jwt_secret,
            server_addr: parse_or("SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            recent_scans_limit: parse_or("RECENT_SCANS_LIMIT", 5)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("{key} inválido: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub item_service: ItemService,
    pub borrowing_service: BorrowingService,
    pub verification_service: VerificationService,
    pub dashboard_service: DashboardService,
    pub recent_scans_limit: i64,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn LabStore> = match &settings.database_url {
            Some(url) => {
                let pg = PgLabStore::connect(url, settings.db_max_connections, settings.db_acquire_timeout)
                    .await
                    .context("Falha ao conectar no banco de dados")?;
                pg.migrate().await.context("Falha ao rodar as migrações do banco de dados")?;
                Arc::new(pg)
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL não definida: usando store em memória (dados se perdem ao reiniciar)");
                Arc::new(MemoryLabStore::new())
            }
        };

        Ok(Self::with_store(store, settings.jwt_secret.clone(), settings.recent_scans_limit))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(store: Arc<dyn LabStore>, jwt_secret: String, recent_scans_limit: i64) -> Self {
        let resolver = QrResolver::new(store.clone());

        Self {
            auth_service: AuthService::new(jwt_secret),
            item_service: ItemService::new(store.clone()),
            borrowing_service: BorrowingService::new(store.clone(), resolver.clone()),
            verification_service: VerificationService::new(store.clone(), resolver),
            dashboard_service: DashboardService::new(store),
            recent_scans_limit,
        }
    }
}
