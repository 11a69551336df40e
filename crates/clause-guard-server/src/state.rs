//! Application state shared by all handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use clause_guard_core::{load_phrase_set, BuiltinPhrases, FilePhraseRepository, RiskScorer};
use tracing::info;

use crate::db::Database;
use crate::settings::Settings;

pub struct AppState {
    pub db: Database,
    pub scorer: Arc<RiskScorer>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(db: Database, scorer: Arc<RiskScorer>, settings: Settings) -> Self {
        Self {
            db,
            scorer,
            settings,
        }
    }

    /// Connect to the database, ensure the schema and load the phrase set.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let db = Database::connect(&settings.database_url).await?;
        db.init_schema().await?;
        let scorer = build_scorer(&settings).await?;
        Ok(Self::new(db, Arc::new(scorer), settings))
    }
}

/// Scorer over the configured phrase file, or the built-in list when none is set.
pub async fn build_scorer(settings: &Settings) -> Result<RiskScorer> {
    let phrases = match &settings.phrases_file {
        Some(path) => {
            let repo = FilePhraseRepository::new(path);
            load_phrase_set(&repo)
                .await
                .with_context(|| format!("failed to load phrases from {}", path.display()))?
        }
        None => load_phrase_set(&BuiltinPhrases).await?,
    };
    info!(phrases = phrases.len(), "phrase set loaded");
    RiskScorer::new(phrases)
}
