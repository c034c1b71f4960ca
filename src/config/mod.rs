use crate::error::{Result, StarterError};
use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Exposes `classPath` to clients; when false it renders as `Unknown`
pub const EXPOSE_CLASS_PATH_KEY: &str = "EXCEPTION_HANDLER_EXPOSE_CLASS_PATH";
/// Exposes `originalMessage` to clients; when false it renders as `null`
pub const EXPOSE_ORIGINAL_MESSAGE_KEY: &str = "EXCEPTION_HANDLER_EXPOSE_ORIGINAL_MESSAGE";
/// Language of the generated messages (`en`, `ru`)
pub const LOCALE_KEY: &str = "EXCEPTION_HANDLER_LOCALE";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Load from the process environment
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Language of the messages the handler generates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Locale {
    #[default]
    En,
    Ru,
}

/// Settings of the global exception handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandlerConfig {
    pub expose_class_path: bool,
    pub expose_original_message: bool,
    pub locale: Locale,
}

impl Default for ExceptionHandlerConfig {
    fn default() -> Self {
        Self {
            expose_class_path: true,
            expose_original_message: true,
            locale: Locale::En,
        }
    }
}

impl ExceptionHandlerConfig {
    /// Read the `EXCEPTION_HANDLER_*` keys, using defaults for missing ones
    ///
    /// # Errors
    /// Returns [`StarterError::InvalidConfig`] for values that do not parse.
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            expose_class_path: read_flag(config, EXPOSE_CLASS_PATH_KEY, defaults.expose_class_path)?,
            expose_original_message: read_flag(
                config,
                EXPOSE_ORIGINAL_MESSAGE_KEY,
                defaults.expose_original_message,
            )?,
            locale: match config.get(LOCALE_KEY) {
                Some(value) => Locale::from_str(value.trim()).map_err(|e| {
                    StarterError::invalid_config(LOCALE_KEY, value.as_str(), e.to_string())
                })?,
                None => defaults.locale,
            },
        })
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_config(&ConfigService::new())
    }
}

fn read_flag(config: &ConfigService, key: &str, default: bool) -> Result<bool> {
    let Some(value) = config.get(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(StarterError::invalid_config(
            key,
            value.as_str(),
            "expected a boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_keys_missing() {
        let config = ExceptionHandlerConfig::from_config(&ConfigService::default()).unwrap();
        assert_eq!(config, ExceptionHandlerConfig::default());
    }

    #[test]
    fn test_reads_flags_and_locale() {
        let service = ConfigService::default();
        service.set(EXPOSE_CLASS_PATH_KEY, "false");
        service.set(EXPOSE_ORIGINAL_MESSAGE_KEY, " 0 ");
        service.set(LOCALE_KEY, "RU");

        let config = ExceptionHandlerConfig::from_config(&service).unwrap();
        assert!(!config.expose_class_path);
        assert!(!config.expose_original_message);
        assert_eq!(config.locale, Locale::Ru);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let service = ConfigService::default();
        service.set(EXPOSE_CLASS_PATH_KEY, "sometimes");
        let err = ExceptionHandlerConfig::from_config(&service).unwrap_err();
        assert!(matches!(err, StarterError::InvalidConfig { ref key, .. } if key == EXPOSE_CLASS_PATH_KEY));

        let service = ConfigService::default();
        service.set(LOCALE_KEY, "de");
        assert!(ExceptionHandlerConfig::from_config(&service).is_err());
    }

    #[test]
    fn test_locale_display() {
        assert_eq!(Locale::Ru.to_string(), "ru");
        assert_eq!(Locale::default(), Locale::En);
    }
}
