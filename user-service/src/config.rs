use anyhow::Result;
use identity_client::IdentityConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    /// A caller needs at least one of these roles on the role client.
    pub admin_roles: Vec<String>,
    pub localization: LocalizationConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LocalizationConfig {
    pub locales_dir: Option<PathBuf>,
    pub default_locale: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let admin_roles: Vec<String> = std::env::var("ADMIN_ROLES")
            .unwrap_or_else(|_| "admin".to_string())
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(String::from)
            .collect();
        if admin_roles.is_empty() {
            anyhow::bail!("ADMIN_ROLES must name at least one role");
        }

        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8081".to_string())
                    .parse()?,
            },
            identity: IdentityConfig::from_env()?,
            admin_roles,
            localization: LocalizationConfig {
                locales_dir: std::env::var("LOCALES_DIR").ok().map(PathBuf::from),
                default_locale: std::env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_admin_roles_list() {
        std::env::set_var("ADMIN_ROLES", "admin, support ,");

        let config = Config::from_env().unwrap();
        assert_eq!(config.admin_roles, vec!["admin", "support"]);
        assert_eq!(config.server.port, 8081);

        std::env::remove_var("ADMIN_ROLES");
    }

    #[test]
    #[serial]
    fn test_blank_admin_roles_rejected() {
        std::env::set_var("ADMIN_ROLES", " , ");

        assert!(Config::from_env().is_err());

        std::env::remove_var("ADMIN_ROLES");
    }
}
