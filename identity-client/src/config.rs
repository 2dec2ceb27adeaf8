//! Identity provider endpoints and client credentials.

use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    /// Client whose roles are checked on incoming tokens.
    pub role_client: String,
    pub max_retries: u32,
    /// Base delay of the exponential backoff on connection errors.
    pub retry_delay: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            realm: "my-realm".to_string(),
            client_id: "your-client-id".to_string(),
            client_secret: "your-client-secret".to_string(),
            role_client: "your-client-id".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let client_id = env::var("IDP_CLIENT_ID").unwrap_or(defaults.client_id);

        Ok(Self {
            base_url: env::var("IDP_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            realm: env::var("IDP_REALM").unwrap_or(defaults.realm),
            client_secret: env::var("IDP_CLIENT_SECRET").unwrap_or(defaults.client_secret),
            role_client: env::var("IDP_ROLE_CLIENT").unwrap_or_else(|_| client_id.clone()),
            client_id,
            max_retries: parse_var("IDP_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_millis(parse_var(
                "IDP_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
        })
    }

    fn realm_url(&self) -> String {
        format!("{}/realms/{}", self.base_url, self.realm)
    }

    fn admin_url(&self) -> String {
        format!("{}/admin/realms/{}", self.base_url, self.realm)
    }

    /// Public keys used to verify token signatures.
    pub fn jwks_url(&self) -> String {
        format!("{}/protocol/openid-connect/certs", self.realm_url())
    }

    pub fn token_url(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.realm_url())
    }

    pub fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.admin_url(), user_id)
    }

    pub fn realm_roles_url(&self) -> String {
        format!("{}/roles", self.admin_url())
    }

    pub fn realm_role_url(&self, role_name: &str) -> String {
        format!("{}/roles/{}", self.admin_url(), role_name)
    }

    pub fn realm_role_mapping_url(&self, user_id: &str) -> String {
        format!("{}/role-mappings/realm", self.user_url(user_id))
    }

    pub fn client_roles_url(&self, client_id: &str) -> String {
        format!("{}/clients/{}/roles", self.admin_url(), client_id)
    }

    pub fn client_role_url(&self, client_id: &str, role_name: &str) -> String {
        format!("{}/{}", self.client_roles_url(client_id), role_name)
    }

    pub fn client_role_mapping_url(&self, user_id: &str, client_id: &str) -> String {
        format!("{}/role-mappings/clients/{}", self.user_url(user_id), client_id)
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
