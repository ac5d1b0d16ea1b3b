//! Types shared by the mediator, the paged source and the pager.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheError, ResultItem};
use crate::marketplace::FetchError;

/// Kind of load requested from the mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    /// Reload from the first page.
    Refresh,
    /// Load before the first page. Searches have no such page.
    Prepend,
    /// Load after the last cached page.
    Append,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Refresh => "refresh",
            LoadType::Prepend => "prepend",
            LoadType::Append => "append",
        }
    }
}

/// Result of a successful mediator load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediatorOutcome {
    pub end_of_pagination_reached: bool,
}

/// What the pager should do when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializeAction {
    /// Fetch the first page before serving anything.
    LaunchInitialRefresh,
    /// Serve the cache as is.
    SkipInitialRefresh,
}

/// State of one load direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    NotLoading { end_of_pagination_reached: bool },
    Loading,
    Error { message: String, retryable: bool },
}

impl LoadState {
    pub fn idle() -> Self {
        LoadState::NotLoading {
            end_of_pagination_reached: false,
        }
    }

    pub fn complete() -> Self {
        LoadState::NotLoading {
            end_of_pagination_reached: true,
        }
    }

    pub fn from_error(error: &PagingError) -> Self {
        LoadState::Error {
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }

    pub fn is_end_of_pagination(&self) -> bool {
        matches!(
            self,
            LoadState::NotLoading {
                end_of_pagination_reached: true
            }
        )
    }
}

impl Default for LoadState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Load state per direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl LoadStates {
    pub fn get(&self, load_type: LoadType) -> &LoadState {
        match load_type {
            LoadType::Refresh => &self.refresh,
            LoadType::Prepend => &self.prepend,
            LoadType::Append => &self.append,
        }
    }

    pub fn set(&mut self, load_type: LoadType, state: LoadState) {
        match load_type {
            LoadType::Refresh => self.refresh = state,
            LoadType::Prepend => self.prepend = state,
            LoadType::Append => self.append = state,
        }
    }
}

/// Observable state of a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingState {
    pub term: String,
    /// Every item of the pages loaded so far, in order.
    pub items: Vec<ResultItem>,
    pub pages_loaded: u32,
    pub load_states: LoadStates,
}

impl PagingState {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            items: Vec::new(),
            pages_loaded: 0,
            load_states: LoadStates::default(),
        }
    }
}

/// Errors from loading pages.
#[derive(Debug, Error)]
pub enum PagingError {
    #[error("Marketplace error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl PagingError {
    /// Whether retrying the same load could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PagingError::Fetch(e) => e.is_retryable(),
            PagingError::Cache(_) => true,
        }
    }
}
