//! User settings: UI language and marketplace engine.
//!
//! Settings live in a singleton row (id = 1). The row is created with defaults
//! the first time it is read and is only ever changed read-modify-write.

mod sqlite;

pub use sqlite::SqliteSettingsStore;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Language the marketplace is queried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    De,
    Fr,
    It,
    Es,
}

impl Language {
    /// Two-letter code used in marketplace URLs.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
            Language::It => "it",
            Language::Es => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "de" => Ok(Language::De),
            "fr" => Ok(Language::Fr),
            "it" => Ok(Language::It),
            "es" => Ok(Language::Es),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown language: {}",
                other
            ))),
        }
    }
}

/// How the marketplace is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    #[default]
    Direct,
    Proxied,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Direct => "direct",
            Engine::Proxied => "proxied",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Engine::Direct),
            "proxied" => Ok(Engine::Proxied),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown engine: {}",
                other
            ))),
        }
    }
}

/// The settings singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    pub language: Language,
    pub engine: Engine,
}

/// Errors for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait for settings storage.
pub trait SettingsStore: Send + Sync {
    /// Read the settings, creating the row with defaults if absent.
    fn load(&self) -> Result<Settings, SettingsError>;

    /// Read-modify-write the settings in one transaction and return the result.
    fn update(&self, apply: &mut dyn FnMut(&mut Settings)) -> Result<Settings, SettingsError>;
}
