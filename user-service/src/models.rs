use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SetAttributeRequest {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
    /// Client id for a client role; a realm role when absent.
    pub client: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleScope {
    pub client: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub client: Option<String>,
}
