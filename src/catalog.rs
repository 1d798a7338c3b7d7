//! Flavor content consumed by the games
//!
//! The catalog is opaque to the room logic: the Infiltrator game draws a theme
//! with its concepts, hints and questions, the Spy game draws one question
//! pair. Content ships embedded and can be replaced with a JSON file.

use crate::games::infiltrator::QUESTIONS_PER_GAME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub type ThemeKey = String;

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog is incomplete: {0}")]
    Empty(String),
}

/// One Infiltrator theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub concepts: Vec<String>,
    /// Vague clue handed to the infiltrator instead of the concept
    #[serde(alias = "infiltratorHints")]
    pub hints: Vec<String>,
    pub questions: Vec<String>,
}

/// Spy question pair: everybody answers `principal`, the spy answers `decoy`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPair {
    pub principal: String,
    #[serde(alias = "paralela")]
    pub decoy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub themes: BTreeMap<ThemeKey, Theme>,
    pub spy_pairs: Vec<QuestionPair>,
}

impl Catalog {
    /// The catalog compiled into the binary
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Load from `path` when given, otherwise use the embedded catalog
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => {
                tracing::info!("Loading catalog from {}", p.display());
                Self::load(p)
            }
            None => Self::embedded(),
        }
    }

    /// Every pick the games make must have something to pick from
    fn validate(&self) -> Result<(), CatalogError> {
        if self.themes.is_empty() {
            return Err(CatalogError::Empty("no themes".to_string()));
        }
        if self.spy_pairs.is_empty() {
            return Err(CatalogError::Empty("no spy question pairs".to_string()));
        }
        for (key, theme) in &self.themes {
            if theme.concepts.is_empty() || theme.hints.is_empty() || theme.questions.is_empty()
            {
                return Err(CatalogError::Empty(format!(
                    "theme '{}' needs concepts, hints and questions",
                    key
                )));
            }
            if theme.questions.len() < QUESTIONS_PER_GAME {
                return Err(CatalogError::Empty(format!(
                    "theme '{}' needs at least {} questions",
                    key, QUESTIONS_PER_GAME
                )));
            }
        }
        Ok(())
    }
}
