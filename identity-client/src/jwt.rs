//! Bearer token verification against the provider's JWKS.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use shared::errors::{
    AUTH_FORBIDDEN, AUTH_INVALID_AUDIENCE, AUTH_INVALID_SESSION, AUTH_SERVER_UNAVAILABLE,
    AUTH_TOKEN_EXPIRED,
};
use shared::BusinessError;

use crate::config::IdentityConfig;
use crate::IdentityResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub resource_access: HashMap<String, ClientAccess>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Claims {
    /// Roles granted on `client`.
    pub fn client_roles(&self, client: &str) -> &[String] {
        self.resource_access
            .get(client)
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_any_role(&self, client: &str, roles: &[&str]) -> bool {
        let granted = self.client_roles(client);
        roles.iter().any(|role| granted.iter().any(|g| g == role))
    }
}

pub struct JwtVerifier {
    config: IdentityConfig,
    http: Client,
    keys: RwLock<Option<HashMap<String, DecodingKey>>>,
}

impl JwtVerifier {
    pub fn new(config: IdentityConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config,
            http,
            keys: RwLock::new(None),
        }
    }

    /// Verify signature, expiry and audience, then require at least one of
    /// `roles` on the role client. An empty `roles` skips the role check.
    pub async fn verify(&self, token: &str, roles: &[&str]) -> IdentityResult<Claims> {
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Malformed token header");
            BusinessError::new(AUTH_INVALID_SESSION)
        })?;
        let kid = header.kid.ok_or_else(|| {
            debug!("Token header has no kid");
            BusinessError::new(AUTH_INVALID_SESSION)
        })?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.config.client_id.as_str()]);

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => BusinessError::new(AUTH_TOKEN_EXPIRED),
                ErrorKind::InvalidAudience => BusinessError::new(AUTH_INVALID_AUDIENCE),
                _ => {
                    debug!(error = %e, "Token rejected");
                    BusinessError::new(AUTH_INVALID_SESSION)
                }
            })?
            .claims;

        if !roles.is_empty() && !claims.has_any_role(&self.config.role_client, roles) {
            warn!(sub = %claims.sub, required = ?roles, "Token lacks required role");
            return Err(BusinessError::new(AUTH_FORBIDDEN));
        }

        Ok(claims)
    }

    /// Cached key for `kid`; a miss refreshes the key set once.
    async fn key_for(&self, kid: &str) -> IdentityResult<DecodingKey> {
        if let Some(keys) = self.keys.read().await.as_ref() {
            if let Some(key) = keys.get(kid) {
                return Ok(key.clone());
            }
        }

        let mut cached = self.keys.write().await;
        let keys = self.fetch_keys().await?;
        let key = keys.get(kid).cloned();
        *cached = Some(keys);

        key.ok_or_else(|| {
            warn!(kid, "Signing key not found after JWKS refresh");
            BusinessError::new(AUTH_INVALID_SESSION)
        })
    }

    async fn fetch_keys(&self) -> IdentityResult<HashMap<String, DecodingKey>> {
        let url = self.config.jwks_url();
        let jwks = async {
            self.http
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<JwkSet>()
                .await
        }
        .await
        .map_err(|e| {
            error!(url = %url, error = %e, "Failed to fetch JWKS");
            BusinessError::new(AUTH_SERVER_UNAVAILABLE)
        })?;

        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!(kid = %kid, error = %e, "Skipping unusable JWK"),
            }
        }

        debug!(count = keys.len(), "Loaded signing keys");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
    use mockito::{Server, ServerGuard};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shared::errors;

    const PRIVATE_KEY: &str = include_str!("../testdata/test_key.pem");
    const JWKS: &str = include_str!("../testdata/jwks.json");
    const CERTS_PATH: &str = "/realms/my-realm/protocol/openid-connect/certs";

    fn verifier_for(server: &ServerGuard) -> JwtVerifier {
        JwtVerifier::new(IdentityConfig {
            base_url: server.url(),
            client_id: "chat-api".to_string(),
            role_client: "chat-api".to_string(),
            ..IdentityConfig::default()
        })
    }

    async fn jwks_mock(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
        server
            .mock("GET", CERTS_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(JWKS)
            .expect(hits)
            .create_async()
            .await
    }

    fn sign(kid: &str, claims: Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();
        encode(&header, &claims, &key).unwrap()
    }

    fn claims(aud: &str, exp: u64, roles: &[&str]) -> Value {
        json!({
            "sub": "user-1",
            "aud": aud,
            "exp": exp,
            "preferred_username": "sara",
            "resource_access": { "chat-api": { "roles": roles } },
        })
    }

    fn in_an_hour() -> u64 {
        get_current_timestamp() + 3600
    }

    #[tokio::test]
    async fn test_valid_token_and_key_cache() {
        let mut server = Server::new_async().await;
        let certs = jwks_mock(&mut server, 1).await;
        let verifier = verifier_for(&server);
        let token = sign("test-key-1", claims("chat-api", in_an_hour(), &["admin"]));

        let first = verifier.verify(&token, &["admin"]).await.unwrap();
        let second = verifier.verify(&token, &[]).await.unwrap();

        assert_eq!(first.sub, "user-1");
        assert_eq!(second.preferred_username.as_deref(), Some("sara"));
        certs.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token() {
        let mut server = Server::new_async().await;
        jwks_mock(&mut server, 1).await;
        let token = sign("test-key-1", claims("chat-api", get_current_timestamp() - 3600, &["admin"]));

        let err = verifier_for(&server).verify(&token, &[]).await.unwrap_err();
        assert!(err.is(errors::AUTH_TOKEN_EXPIRED));
    }

    #[tokio::test]
    async fn test_wrong_audience() {
        let mut server = Server::new_async().await;
        jwks_mock(&mut server, 1).await;
        let token = sign("test-key-1", claims("account", in_an_hour(), &["admin"]));

        let err = verifier_for(&server).verify(&token, &[]).await.unwrap_err();
        assert!(err.is(errors::AUTH_INVALID_AUDIENCE));
    }

    #[tokio::test]
    async fn test_missing_role_is_forbidden() {
        let mut server = Server::new_async().await;
        jwks_mock(&mut server, 1).await;
        let token = sign("test-key-1", claims("chat-api", in_an_hour(), &["viewer"]));

        let err = verifier_for(&server)
            .verify(&token, &["admin", "moderator"])
            .await
            .unwrap_err();
        assert!(err.is(errors::AUTH_FORBIDDEN));
    }

    #[tokio::test]
    async fn test_unknown_kid_refreshes_once_per_verification() {
        let mut server = Server::new_async().await;
        let certs = jwks_mock(&mut server, 2).await;
        let verifier = verifier_for(&server);
        let known = sign("test-key-1", claims("chat-api", in_an_hour(), &[]));
        let rotated = sign("rotated-key", claims("chat-api", in_an_hour(), &[]));

        verifier.verify(&known, &[]).await.unwrap();
        let err = verifier.verify(&rotated, &[]).await.unwrap_err();

        assert!(err.is(errors::AUTH_INVALID_SESSION));
        certs.assert_async().await;
    }

    #[tokio::test]
    async fn test_garbage_token_skips_key_fetch() {
        let mut server = Server::new_async().await;
        let certs = jwks_mock(&mut server, 0).await;

        let err = verifier_for(&server).verify("not-a-jwt", &[]).await.unwrap_err();

        assert!(err.is(errors::AUTH_INVALID_SESSION));
        certs.assert_async().await;
    }

    #[tokio::test]
    async fn test_jwks_outage() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", CERTS_PATH)
            .with_status(500)
            .create_async()
            .await;
        let token = sign("test-key-1", claims("chat-api", in_an_hour(), &[]));

        let err = verifier_for(&server).verify(&token, &[]).await.unwrap_err();
        assert!(err.is(errors::AUTH_SERVER_UNAVAILABLE));
    }

    #[test]
    fn test_role_lookup_by_client() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": "u",
            "exp": 1,
            "resource_access": { "other": { "roles": ["admin"] } },
            "azp": "chat-api",
        }))
        .unwrap();

        assert!(!claims.has_any_role("chat-api", &["admin"]));
        assert!(claims.has_any_role("other", &["viewer", "admin"]));
        assert_eq!(claims.extra["azp"], "chat-api");
    }
}
