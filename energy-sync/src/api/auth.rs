use std::collections::HashMap;

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Maps an inbound request to the tenant key addressing its cache entry.
///
/// Token issuance and verification live outside this service; this is the
/// only question the read path asks of them.
pub trait TenantResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;
}

/// Resolves `Authorization: Bearer <token>` against a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, String>,
}

impl StaticTokenResolver {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl TenantResolver for StaticTokenResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        bearer_token(headers).and_then(|t| self.tokens.get(t).cloned())
    }
}
