// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Idiomas com mensagens traduzidas. O resto cai no padrão.
const SUPPORTED: [&str; 2] = ["pt", "en"];
const DEFAULT_LANG: &str = "pt";

// Nosso extrator de idioma
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn from_header(header_str: &str) -> Self {
        // "pt-BR,en;q=0.8" -> prioridade ["pt-BR", "en"] -> primeiro suportado
        accept_language::parse(header_str)
            .iter()
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .find(|lang| SUPPORTED.contains(&lang.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }

    pub fn is_english(&self) -> bool {
        self.0 == "en"
    }

    /// Escolhe a versão da mensagem para o idioma do cliente.
    pub fn pick<'a>(&self, pt: &'a str, en: &'a str) -> &'a str {
        if self.is_english() { en } else { pt }
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}
