//! Localized user-facing text: message codes, catalogs and the request locale.

pub mod locale;
pub mod localizer;
pub mod messages;
pub mod response;

pub use locale::{current_locale, parse_accept_language, with_locale, DEFAULT_LOCALE};
pub use localizer::{LocalizationError, Localizer};
pub use messages::{errors, success, ErrorCode, SuccessCode};
pub use response::SuccessResponse;
