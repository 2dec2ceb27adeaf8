//! Admin API client authenticated with client credentials.

use reqwest::{header, Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use shared::errors::{
    AUTH_SERVER_UNAVAILABLE, AUTH_TOKEN_EXPIRED, ROLE_REVOCATION_FAILED, UNEXPECTED_ERROR,
    USER_NOT_FOUND,
};
use shared::{BusinessError, BusinessResult};

use crate::config::IdentityConfig;

/// Fields of a user profile that can be changed. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfoUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdminResponse {
    pub status: u16,
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Why a single request attempt failed.
enum Failure {
    Status(StatusCode, String),
    Connection(String),
    Other(String),
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Failure::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            Failure::Status(status, e.to_string())
        } else {
            Failure::Other(e.to_string())
        }
    }
}

pub struct IdentityAdmin {
    config: IdentityConfig,
    http: Client,
    token: Mutex<Option<String>>,
}

impl IdentityAdmin {
    pub fn new(config: IdentityConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config,
            http,
            token: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Cached admin token, fetched from the token endpoint when missing.
    async fn admin_token(&self) -> Result<String, Failure> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let response = self
            .http
            .post(self.config.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let token = response.json::<TokenResponse>().await?.access_token;

        debug!("Obtained admin token");
        *cached = Some(token.clone());
        Ok(token)
    }

    pub async fn clear_token_cache(&self) {
        self.token.lock().await.take();
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<AdminResponse, Failure> {
        let token = self.admin_token().await?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?.error_for_status()?;
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.starts_with("application/json"));

        let data = if is_json {
            Some(response.json::<Value>().await?)
        } else {
            None
        };
        Ok(AdminResponse { status, data })
    }

    /// Send an admin request, retrying refused tokens and connection errors.
    ///
    /// A 401/403 clears the cached token and tries again; the last such
    /// failure is `AUTH_TOKEN_EXPIRED`. Connection errors back off
    /// exponentially and end as `AUTH_SERVER_UNAVAILABLE`. Other statuses
    /// are not retried.
    pub async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> BusinessResult<AdminResponse> {
        let max_retries = self.config.max_retries.max(1);

        for attempt in 0..max_retries {
            let failure = match self.send_once(&method, url, body).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            match failure {
                Failure::Status(status, message) => {
                    error!(%method, url, status = status.as_u16(), message = %message, "Identity provider API error");

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        if attempt + 1 < max_retries {
                            warn!(attempt = attempt + 1, max_retries, "Admin token rejected, refreshing");
                            self.clear_token_cache().await;
                            continue;
                        }
                        error!("Token refresh failed after all retries");
                        return Err(BusinessError::new(AUTH_TOKEN_EXPIRED));
                    }
                    if status == StatusCode::NOT_FOUND {
                        if url.contains("/users/") {
                            return Err(BusinessError::new(USER_NOT_FOUND));
                        }
                        error!(url, "Identity provider resource not found");
                        return Err(BusinessError::new(UNEXPECTED_ERROR));
                    }
                    if status.is_server_error() {
                        return Err(BusinessError::new(AUTH_SERVER_UNAVAILABLE));
                    }
                    return Err(BusinessError::new(UNEXPECTED_ERROR));
                }
                Failure::Connection(message) => {
                    warn!(attempt = attempt + 1, max_retries, error = %message, "Identity provider connection error");
                    if attempt + 1 < max_retries {
                        tokio::time::sleep(self.config.retry_delay * 2u32.pow(attempt)).await;
                    }
                }
                Failure::Other(message) => {
                    error!(%method, url, error = %message, "Identity provider request failed");
                    return Err(BusinessError::new(AUTH_SERVER_UNAVAILABLE));
                }
            }
        }

        error!(%method, url, "All retry attempts failed");
        Err(BusinessError::new(AUTH_SERVER_UNAVAILABLE))
    }

    async fn fetch_user(&self, user_id: &str) -> BusinessResult<serde_json::Map<String, Value>> {
        let response = self
            .request_with_retry(Method::GET, &self.config.user_url(user_id), None)
            .await?;

        match response.data {
            Some(Value::Object(user)) => Ok(user),
            other => Err(BusinessError::unexpected(
                "reading user representation",
                format!("unexpected body for user {}: {:?}", user_id, other),
            )),
        }
    }

    async fn put_user(&self, user_id: &str, payload: &Value) -> BusinessResult<()> {
        let response = self
            .request_with_retry(Method::PUT, &self.config.user_url(user_id), Some(payload))
            .await?;
        if response.status != 204 {
            error!(user_id, status = response.status, "Failed to update user");
            return Err(BusinessError::new(UNEXPECTED_ERROR));
        }
        Ok(())
    }

    /// Set a single-valued custom attribute on a user.
    pub async fn set_user_attribute(&self, user_id: &str, name: &str, value: &str) -> BusinessResult<()> {
        info!(user_id, attribute = name, "Setting user attribute");

        let mut user = self.fetch_user(user_id).await?;
        let attributes = user
            .entry("attributes")
            .or_insert_with(|| json!({}));
        if !attributes.is_object() {
            *attributes = json!({});
        }
        attributes[name] = json!([value]);

        self.put_user(user_id, &Value::Object(user)).await?;
        info!(user_id, attribute = name, "User attribute set");
        Ok(())
    }

    /// Update profile fields. Existing custom attributes are sent back so the
    /// provider does not drop them.
    pub async fn update_user_info(&self, user_id: &str, update: &UserInfoUpdate) -> BusinessResult<()> {
        info!(user_id, "Updating user info");

        let user = self.fetch_user(user_id).await?;
        let mut payload = serde_json::Map::new();

        if let Some(first_name) = &update.first_name {
            payload.insert("firstName".to_string(), json!(first_name));
        }
        if let Some(last_name) = &update.last_name {
            payload.insert("lastName".to_string(), json!(last_name));
        }
        if let Some(email) = &update.email {
            payload.insert("email".to_string(), json!(email));
        }

        let mut attributes = user
            .get("attributes")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        if let Some(phone) = &update.phone_number {
            attributes.insert("phone_number".to_string(), json!([phone]));
        }
        if !attributes.is_empty() {
            payload.insert("attributes".to_string(), Value::Object(attributes));
        }

        if payload.is_empty() {
            warn!(user_id, "No update fields provided");
            return Ok(());
        }

        self.put_user(user_id, &Value::Object(payload)).await?;
        info!(user_id, "User info updated");
        Ok(())
    }

    /// Assign a realm role, or a client role when `client_id` is given.
    pub async fn assign_role(&self, user_id: &str, role_name: &str, client_id: Option<&str>) -> BusinessResult<()> {
        info!(user_id, role = role_name, client = ?client_id, "Assigning role");

        let (role_url, mapping_url) = match client_id {
            None => (
                self.config.realm_role_url(role_name),
                self.config.realm_role_mapping_url(user_id),
            ),
            Some(client) => (
                self.config.client_role_url(client, role_name),
                self.config.client_role_mapping_url(user_id, client),
            ),
        };

        let role = self
            .request_with_retry(Method::GET, &role_url, None)
            .await?
            .data
            .ok_or_else(|| BusinessError::unexpected("reading role", format!("empty body for role {}", role_name)))?;

        let response = self
            .request_with_retry(Method::POST, &mapping_url, Some(&json!([role])))
            .await?;
        if !matches!(response.status, 200 | 204) {
            error!(user_id, role = role_name, status = response.status, "Failed to assign role");
            return Err(BusinessError::new(UNEXPECTED_ERROR));
        }

        info!(user_id, role = role_name, "Role assigned");
        Ok(())
    }

    /// Remove a role mapping by role id.
    pub async fn revoke_role(&self, user_id: &str, role_id: &str, client_id: Option<&str>) -> BusinessResult<()> {
        info!(user_id, role_id, client = ?client_id, "Revoking role");

        let mapping_url = match client_id {
            None => self.config.realm_role_mapping_url(user_id),
            Some(client) => self.config.client_role_mapping_url(user_id, client),
        };

        let response = self
            .request_with_retry(Method::DELETE, &mapping_url, Some(&json!([{ "id": role_id }])))
            .await?;
        if !matches!(response.status, 200 | 204) {
            error!(user_id, role_id, status = response.status, "Failed to revoke role");
            return Err(BusinessError::new(ROLE_REVOCATION_FAILED));
        }

        info!(user_id, role_id, "Role revoked");
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> BusinessResult<()> {
        info!(user_id, "Deleting user");

        let response = self
            .request_with_retry(Method::DELETE, &self.config.user_url(user_id), None)
            .await?;
        if !matches!(response.status, 200 | 204) {
            error!(user_id, status = response.status, "Failed to delete user");
            return Err(BusinessError::new(UNEXPECTED_ERROR));
        }

        info!(user_id, "User deleted");
        Ok(())
    }

    /// Create a realm role, or a client role when `client_id` is given.
    pub async fn add_role(&self, name: &str, description: &str, client_id: Option<&str>) -> BusinessResult<()> {
        info!(role = name, client = ?client_id, "Creating role");

        let roles_url = match client_id {
            None => self.config.realm_roles_url(),
            Some(client) => self.config.client_roles_url(client),
        };
        let payload = json!({
            "name": name,
            "description": description,
            "composite": false,
        });

        let response = self
            .request_with_retry(Method::POST, &roles_url, Some(&payload))
            .await?;
        if !matches!(response.status, 201 | 204) {
            error!(role = name, status = response.status, "Failed to create role");
            return Err(BusinessError::new(UNEXPECTED_ERROR));
        }

        info!(role = name, "Role created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use shared::errors;

    const TOKEN_PATH: &str = "/realms/my-realm/protocol/openid-connect/token";

    fn admin_for(server: &ServerGuard) -> IdentityAdmin {
        IdentityAdmin::new(IdentityConfig {
            base_url: server.url(),
            retry_delay: Duration::from_millis(10),
            ..IdentityConfig::default()
        })
    }

    async fn token_mock(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
        server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"admin-token","expires_in":300}"#)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_token_is_cached_between_requests() {
        let mut server = Server::new_async().await;
        let token = token_mock(&mut server, 1).await;
        let delete = server
            .mock("DELETE", "/admin/realms/my-realm/users/u1")
            .match_header("authorization", "Bearer admin-token")
            .with_status(204)
            .expect(2)
            .create_async()
            .await;

        let admin = admin_for(&server);
        admin.delete_user("u1").await.unwrap();
        admin.delete_user("u1").await.unwrap();

        token.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_then_expires() {
        let mut server = Server::new_async().await;
        let token = token_mock(&mut server, 3).await;
        let delete = server
            .mock("DELETE", "/admin/realms/my-realm/users/u1")
            .with_status(401)
            .expect(3)
            .create_async()
            .await;

        let err = admin_for(&server).delete_user("u1").await.unwrap_err();

        assert!(err.is(errors::AUTH_TOKEN_EXPIRED));
        token.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_user_maps_to_user_not_found() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        server
            .mock("GET", "/admin/realms/my-realm/users/ghost")
            .with_status(404)
            .create_async()
            .await;

        let err = admin_for(&server)
            .set_user_attribute("ghost", "our_uuidv7", "x")
            .await
            .unwrap_err();

        assert!(err.is(errors::USER_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_missing_role_is_unexpected() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        server
            .mock("GET", "/admin/realms/my-realm/roles/ghost-role")
            .with_status(404)
            .create_async()
            .await;

        let err = admin_for(&server)
            .assign_role("u1", "ghost-role", None)
            .await
            .unwrap_err();

        assert!(err.is(errors::UNEXPECTED_ERROR));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        let roles = server
            .mock("POST", "/admin/realms/my-realm/roles")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let err = admin_for(&server)
            .add_role("moderator", "Moderates rooms", None)
            .await
            .unwrap_err();

        assert!(err.is(errors::AUTH_SERVER_UNAVAILABLE));
        roles.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_server_backs_off_then_gives_up() {
        let admin = IdentityAdmin::new(IdentityConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            retry_delay: Duration::from_millis(10),
            ..IdentityConfig::default()
        });

        let started = std::time::Instant::now();
        let err = admin.delete_user("u1").await.unwrap_err();

        assert!(err.is(errors::AUTH_SERVER_UNAVAILABLE));
        // 10ms + 20ms of backoff between three attempts.
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_set_user_attribute_keeps_other_attributes() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        server
            .mock("GET", "/admin/realms/my-realm/users/u1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"u1","username":"sara","attributes":{"locale":["ar"]}}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/admin/realms/my-realm/users/u1")
            .match_body(Matcher::PartialJson(json!({
                "username": "sara",
                "attributes": {"locale": ["ar"], "our_uuidv7": ["0190-abc"]}
            })))
            .with_status(204)
            .create_async()
            .await;

        admin_for(&server)
            .set_user_attribute("u1", "our_uuidv7", "0190-abc")
            .await
            .unwrap();

        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_user_info_sends_only_changed_fields() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        server
            .mock("GET", "/admin/realms/my-realm/users/u1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"u1","firstName":"Old"}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/admin/realms/my-realm/users/u1")
            .match_body(Matcher::Json(json!({
                "firstName": "Sara",
                "attributes": {"phone_number": ["+201000000000"]}
            })))
            .with_status(204)
            .create_async()
            .await;

        let update = UserInfoUpdate {
            first_name: Some("Sara".to_string()),
            phone_number: Some("+201000000000".to_string()),
            ..UserInfoUpdate::default()
        };
        admin_for(&server).update_user_info("u1", &update).await.unwrap();

        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_update_sends_nothing() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        server
            .mock("GET", "/admin/realms/my-realm/users/u1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"u1"}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/admin/realms/my-realm/users/u1")
            .with_status(204)
            .expect(0)
            .create_async()
            .await;

        admin_for(&server)
            .update_user_info("u1", &UserInfoUpdate::default())
            .await
            .unwrap();

        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_assign_client_role_posts_role_representation() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        server
            .mock("GET", "/admin/realms/my-realm/clients/c1/roles/admin")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"r-1","name":"admin"}"#)
            .create_async()
            .await;
        let mapping = server
            .mock("POST", "/admin/realms/my-realm/users/u1/role-mappings/clients/c1")
            .match_body(Matcher::Json(json!([{"id": "r-1", "name": "admin"}])))
            .with_status(204)
            .create_async()
            .await;

        admin_for(&server)
            .assign_role("u1", "admin", Some("c1"))
            .await
            .unwrap();

        mapping.assert_async().await;
    }

    #[tokio::test]
    async fn test_revoke_realm_role() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        let mapping = server
            .mock("DELETE", "/admin/realms/my-realm/users/u1/role-mappings/realm")
            .match_body(Matcher::Json(json!([{"id": "r-9"}])))
            .with_status(204)
            .create_async()
            .await;

        admin_for(&server).revoke_role("u1", "r-9", None).await.unwrap();

        mapping.assert_async().await;
    }

    #[tokio::test]
    async fn test_unexpected_success_status_on_revoke() {
        let mut server = Server::new_async().await;
        token_mock(&mut server, 1).await;
        server
            .mock("DELETE", "/admin/realms/my-realm/users/u1/role-mappings/clients/c1")
            .with_status(202)
            .create_async()
            .await;

        let err = admin_for(&server)
            .revoke_role("u1", "r-9", Some("c1"))
            .await
            .unwrap_err();

        assert!(err.is(errors::ROLE_REVOCATION_FAILED));
    }
}
