//! Client for the identity provider: admin REST operations with a cached
//! service token, and verification of user bearer tokens.

pub mod admin;
pub mod config;
pub mod jwt;

pub use admin::{AdminResponse, IdentityAdmin, UserInfoUpdate};
pub use config::{ConfigError, IdentityConfig};
pub use jwt::{Claims, ClientAccess, JwtVerifier};

pub type IdentityError = shared::BusinessError;
pub type IdentityResult<T> = shared::BusinessResult<T>;
