//! Credential resolution for the search and Azure OpenAI endpoints.
//!
//! A configured key is used when it survives cleaning; otherwise requests
//! are authorized with a bearer token from the ambient delegated identity.

use crate::error::{EvalError, Result};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Token resource for Azure AI Search.
pub const SEARCH_SCOPE: &str = "https://search.azure.com";

/// Token resource for Azure OpenAI (cognitive services).
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com";

/// Placeholder left in sample `.env` files.
const KEY_PLACEHOLDER: &str = "<your-key>";

/// Start of a trailing comment in a configured value.
const COMMENT_MARKER: char = '#';

/// Environment variable holding a pre-issued bearer token for search.
pub const SEARCH_TOKEN_VAR: &str = "AZURE_SEARCH_ACCESS_TOKEN";

/// Environment variable holding a pre-issued bearer token for Azure OpenAI.
pub const OPENAI_TOKEN_VAR: &str = "AZURE_OPENAI_ACCESS_TOKEN";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Clean a configured key: drop a trailing comment, trim, and treat the
/// placeholder or an empty value as absent.
pub fn clean_key(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let without_comment = match raw.find(COMMENT_MARKER) {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    let key = without_comment.trim();

    if key.is_empty() || key.contains(KEY_PLACEHOLDER) {
        None
    } else {
        Some(key.to_string())
    }
}

/// How requests to a service are authenticated.
#[derive(Clone)]
pub enum Credential {
    /// Static key sent as the `api-key` header.
    ApiKey(String),
    /// Bearer token from the ambient identity.
    Delegated(Arc<DelegatedCredential>),
}

impl Credential {
    /// Use the configured key if it is usable, otherwise fall back to the
    /// delegated identity for `scope`.
    pub fn from_configured_key(raw: Option<&str>, scope: &str) -> Self {
        match clean_key(raw) {
            Some(key) => Credential::ApiKey(key),
            None => Self::delegated(scope),
        }
    }

    /// Delegated identity only.
    pub fn delegated(scope: &str) -> Self {
        Credential::Delegated(Arc::new(DelegatedCredential::new(scope)))
    }

    /// Whether this credential is key-based.
    pub fn is_key(&self) -> bool {
        matches!(self, Credential::ApiKey(_))
    }

    /// Attach authentication to a request.
    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self {
            Credential::ApiKey(key) => Ok(request.header("api-key", key)),
            Credential::Delegated(delegated) => {
                let token = delegated.token().await?;
                Ok(request.bearer_auth(token))
            }
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(_) => write!(f, "Credential::ApiKey(..)"),
            Credential::Delegated(d) => write!(f, "Credential::Delegated({})", d.resource),
        }
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: Option<SystemTime>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => SystemTime::now() + EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

/// Environment variable that may carry a pre-issued token for `resource`.
///
/// Tokens are audience-bound, so each scope has its own variable and
/// unknown scopes always go to the Azure CLI.
pub fn token_var(resource: &str) -> Option<&'static str> {
    match resource {
        SEARCH_SCOPE => Some(SEARCH_TOKEN_VAR),
        COGNITIVE_SERVICES_SCOPE => Some(OPENAI_TOKEN_VAR),
        _ => None,
    }
}

/// Output of `az account get-access-token`.
#[derive(Debug, Deserialize)]
struct AzCliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(default)]
    expires_on: Option<u64>,
}

/// Bearer token source for the ambient identity.
///
/// Tries the scope's token variable (see [`token_var`]) first and then the
/// Azure CLI login. The token is cached until shortly before it expires.
pub struct DelegatedCredential {
    resource: String,
    cached: Mutex<Option<AccessToken>>,
}

impl DelegatedCredential {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            cached: Mutex::new(None),
        }
    }

    /// Resource the token is requested for.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Get a bearer token, acquiring a new one if the cached one is stale.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }

        let token = self.acquire().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Pre-issued token for this resource from an environment-style lookup.
    fn token_from_env<F>(&self, lookup: F) -> Option<AccessToken>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = token_var(&self.resource)?;
        let token = lookup(var).filter(|t| !t.trim().is_empty())?;

        log::debug!("Using bearer token from {}", var);
        Some(AccessToken {
            token: token.trim().to_string(),
            expires_at: None,
        })
    }

    async fn acquire(&self) -> Result<AccessToken> {
        if let Some(token) = self.token_from_env(|key| std::env::var(key).ok()) {
            return Ok(token);
        }

        log::debug!("Requesting token for {} from Azure CLI", self.resource);
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                &self.resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| {
                EvalError::Credential(format!(
                    "No key configured and Azure CLI is unavailable ({}). Set {} or run 'az login'.",
                    e,
                    token_var(&self.resource).unwrap_or("an API key")
                ))
            })?;

        if !output.status.success() {
            return Err(EvalError::Credential(format!(
                "Azure CLI could not issue a token for {}: {}",
                self.resource,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_cli_token(&output.stdout)
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let parsed: AzCliToken = serde_json::from_slice(stdout)
        .map_err(|e| EvalError::Credential(format!("Unexpected Azure CLI output: {}", e)))?;

    Ok(AccessToken {
        token: parsed.access_token,
        expires_at: parsed
            .expires_on
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs)),
    })
}
