//! Message catalogs per language with `{placeholder}` substitution.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use thiserror::Error;
use tracing::{debug, error, info};

use super::locale::{current_locale, parse_accept_language, DEFAULT_LOCALE};

const BUILTIN_EN: &str = include_str!("../../locales/en.json");
const BUILTIN_AR: &str = include_str!("../../locales/ar.json");

static SHARED: OnceLock<Arc<Localizer>> = OnceLock::new();

type Catalog = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("failed to access locale file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no locale directory configured")]
    NoDirectory,
}

pub struct Localizer {
    catalogs: RwLock<HashMap<String, Catalog>>,
    base_path: Option<PathBuf>,
    default_locale: String,
}

impl Localizer {
    /// Catalogs compiled into the binary (`en`, `ar`).
    pub fn builtin() -> Self {
        let mut catalogs = HashMap::new();
        for (lang, raw) in [("en", BUILTIN_EN), ("ar", BUILTIN_AR)] {
            match serde_json::from_str::<Catalog>(raw) {
                Ok(catalog) => {
                    catalogs.insert(lang.to_string(), catalog);
                }
                Err(e) => error!(lang, error = %e, "Built-in locale catalog is invalid"),
            }
        }

        Self {
            catalogs: RwLock::new(catalogs),
            base_path: None,
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }

    /// Built-in catalogs overlaid with every `<lang>.json` in `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Result<Self, LocalizationError> {
        let dir = dir.into();
        let mut localizer = Self::builtin();

        let entries = fs::read_dir(&dir).map_err(|source| LocalizationError::Io {
            path: dir.clone(),
            source,
        })?;

        for entry in entries {
            let path = entry
                .map_err(|source| LocalizationError::Io {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let catalog = load_catalog(&path)?;
            debug!(lang, keys = catalog.len(), "Loaded locale catalog");
            localizer.catalogs_mut().insert(lang.to_string(), catalog);
        }

        localizer.base_path = Some(dir);
        Ok(localizer)
    }

    pub fn with_default_locale(mut self, lang: impl Into<String>) -> Self {
        self.default_locale = lang.into();
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Make `localizer` the process-wide instance. Returns false if one was
    /// already installed.
    pub fn install(localizer: Arc<Localizer>) -> bool {
        SHARED.set(localizer).is_ok()
    }

    /// The installed instance, or the built-in catalogs if none was installed.
    pub fn shared() -> Arc<Localizer> {
        SHARED.get_or_init(|| Arc::new(Self::builtin())).clone()
    }

    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.catalogs().keys().cloned().collect();
        langs.sort();
        langs
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs().contains_key(lang)
    }

    /// First supported language of an `Accept-Language` header, or the
    /// default locale.
    pub fn negotiate(&self, accept_language: Option<&str>) -> String {
        accept_language
            .map(parse_accept_language)
            .unwrap_or_default()
            .into_iter()
            .find(|lang| self.supports(lang))
            .unwrap_or_else(|| self.default_locale.clone())
    }

    /// Re-read `<lang>.json` from the locale directory.
    pub fn reload_language(&self, lang: &str) -> Result<(), LocalizationError> {
        let path = self.language_path(lang)?;
        let catalog = if path.exists() {
            load_catalog(&path)?
        } else {
            Catalog::new()
        };

        self.catalogs_mut().insert(lang.to_string(), catalog);
        info!(lang, "Reloaded locale catalog");
        Ok(())
    }

    /// Write the in-memory catalog of `lang` back to `<lang>.json`.
    pub fn save_language(&self, lang: &str) -> Result<(), LocalizationError> {
        let path = self.language_path(lang)?;
        let catalog = self.catalogs().get(lang).cloned().unwrap_or_default();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LocalizationError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&catalog).map_err(|source| {
            LocalizationError::InvalidJson {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| LocalizationError::Io { path, source })
    }

    pub fn set_message(&self, lang: &str, key: &str, message: &str) {
        self.catalogs_mut()
            .entry(lang.to_string())
            .or_default()
            .insert(key.to_string(), message.to_string());
    }

    /// Message for `key` in the current request locale.
    pub fn get_message(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.message_in(&current_locale(), key, args)
    }

    /// Message for `key` in `lang`. Languages without a catalog use the
    /// default locale; unknown keys give a visible placeholder text.
    pub fn message_in(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        let catalogs = self.catalogs();
        let catalog = catalogs
            .get(lang)
            .or_else(|| catalogs.get(&self.default_locale));

        match catalog.and_then(|c| c.get(key)) {
            Some(template) => format_message(template, args),
            None => format!("[Missing message for '{}']", key),
        }
    }

    fn language_path(&self, lang: &str) -> Result<PathBuf, LocalizationError> {
        self.base_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", lang)))
            .ok_or(LocalizationError::NoDirectory)
    }

    fn catalogs(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Catalog>> {
        self.catalogs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn catalogs_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Catalog>> {
        self.catalogs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load_catalog(path: &Path) -> Result<Catalog, LocalizationError> {
    let raw = fs::read_to_string(path).map_err(|source| LocalizationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| LocalizationError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace each `{name}` with its argument in one pass over the template.
/// Unknown placeholders stay as is and argument values are never rescanned.
fn format_message(template: &str, args: &[(&str, &str)]) -> String {
    let mut message = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        message.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            message.push_str(&rest[open..]);
            return message;
        };

        let name = &after[..close];
        match args.iter().find(|(arg, _)| *arg == name) {
            Some((_, value)) => message.push_str(value),
            None => message.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }

    message.push_str(rest);
    message
}
