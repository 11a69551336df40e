use std::collections::HashSet;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte span within the scanned text `(start, end)` where `start <= end`.
pub type Span = (usize, usize);

pub mod file_repository;
pub mod risk_scorer;
pub mod sentences;

/// Phrases flagged as risky when no phrase file is configured.
pub const DEFAULT_RISKY_PHRASES: &[&str] = &[
    "indemnify",
    "hold harmless",
    "liquidated damages",
    "termination",
    "arbitration",
    "non-disclosure",
    "penalty",
    "unilateral",
    "binding",
    "force majeure",
    "warranty",
    "liability",
    "exclusive",
    "governing law",
];

/// Number of matches at which the risk score saturates at 100.
pub const SATURATION_MATCHES: f64 = 12.0;

/// Thresholds that map numeric scores into qualitative risk bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 25.0,
            high: 60.0,
        }
    }
}

/// Classification buckets for overall risk scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// Map a numeric risk score (0–100) into a risk band.
    pub fn from_score(score: f64) -> Self {
        Self::from_score_with_thresholds(score, &RiskThresholds::default())
    }

    /// Map a numeric risk score using caller-provided thresholds.
    pub fn from_score_with_thresholds(score: f64, thresholds: &RiskThresholds) -> Self {
        if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Validated, immutable list of lower-cased risky phrases in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhraseSet {
    phrases: Vec<String>,
}

impl PhraseSet {
    /// Build a phrase set, lower-casing entries and rejecting blanks and duplicates.
    pub fn new<I, S>(phrases: I) -> Result<Self, PhraseValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut normalized = Vec::new();
        for (position, phrase) in phrases.into_iter().enumerate() {
            let phrase = phrase.as_ref().trim().to_lowercase();
            if phrase.is_empty() {
                return Err(PhraseValidationError::BlankPhrase { position });
            }
            if !seen.insert(phrase.clone()) {
                return Err(PhraseValidationError::Duplicate { phrase });
            }
            normalized.push(phrase);
        }
        if normalized.is_empty() {
            return Err(PhraseValidationError::Empty);
        }
        Ok(Self {
            phrases: normalized,
        })
    }

    /// The built-in contract-risk vocabulary.
    pub fn builtin() -> Self {
        Self {
            phrases: DEFAULT_RISKY_PHRASES
                .iter()
                .map(|phrase| (*phrase).to_string())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(String::as_str)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.phrases.get(index).map(String::as_str)
    }
}

/// Errors emitted while validating phrase definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhraseValidationError {
    #[error("phrase set must contain at least one phrase")]
    Empty,
    #[error("phrase #{position} must not be blank")]
    BlankPhrase { position: usize },
    #[error("duplicate phrase `{phrase}`")]
    Duplicate { phrase: String },
}

/// Output of scoring one document: the stable contract shared with the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub risk_score: f64,
    pub highlights: Vec<String>,
}

impl AnalysisResult {
    /// Highlights in the newline-joined form stored with analysis logs.
    ///
    /// Sentence segmentation always breaks after line separators, so no
    /// highlight contains a newline and the joined form splits back losslessly.
    pub fn joined_highlights(&self) -> String {
        self.highlights.join("\n")
    }
}

/// A single (sentence, phrase) match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseMatch {
    pub phrase: String,
    pub sentence_index: usize,
    pub span: Span,
}

/// Detailed scan output used by reporting; reduces to an [`AnalysisResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub risk_score: f64,
    pub risk_band: RiskBand,
    pub sentence_count: usize,
    pub highlights: Vec<String>,
    pub matches: Vec<PhraseMatch>,
}

impl ScanReport {
    /// Construct a report from raw matches, computing the normalized score and band.
    pub fn from_matches(
        sentence_count: usize,
        highlights: Vec<String>,
        matches: Vec<PhraseMatch>,
        thresholds: &RiskThresholds,
    ) -> Self {
        let risk_score = normalized_score(matches.len());
        Self {
            risk_score,
            risk_band: RiskBand::from_score_with_thresholds(risk_score, thresholds),
            sentence_count,
            highlights,
            matches,
        }
    }

    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            risk_score: self.risk_score,
            highlights: self.highlights,
        }
    }
}

/// `min(1, matches / 12) * 100`, rounded to one decimal place.
pub fn normalized_score(match_count: usize) -> f64 {
    let ratio = (match_count as f64 / SATURATION_MATCHES).min(1.0);
    (ratio * 1000.0).round() / 10.0
}

/// Abstraction over phrase loading so the built-in list and phrase files can be swapped.
#[async_trait]
pub trait PhraseRepository: Send + Sync {
    /// Retrieve the raw phrase list, in declaration order.
    async fn load_phrases(&self) -> AnyResult<Vec<String>>;
}

/// Load a repository's phrases and validate them into a [`PhraseSet`].
pub async fn load_phrase_set<R>(repo: &R) -> AnyResult<PhraseSet>
where
    R: PhraseRepository + ?Sized,
{
    let phrases = repo.load_phrases().await?;
    Ok(PhraseSet::new(phrases)?)
}
