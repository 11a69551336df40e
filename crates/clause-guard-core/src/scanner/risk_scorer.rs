use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use tracing::{debug, instrument, trace};

use super::{
    sentences::split_sentences, AnalysisResult, PhraseMatch, PhraseSet, RiskThresholds,
    ScanReport,
};

/// Scores document text by counting (sentence, phrase) matches against a fixed phrase set.
///
/// Holds no mutable state; share it behind an `Arc` and call it from any thread.
pub struct RiskScorer {
    phrases: PhraseSet,
    automaton: AhoCorasick,
    thresholds: RiskThresholds,
}

impl RiskScorer {
    pub fn new(phrases: PhraseSet) -> Result<Self> {
        Self::with_thresholds(phrases, RiskThresholds::default())
    }

    pub fn with_thresholds(phrases: PhraseSet, thresholds: RiskThresholds) -> Result<Self> {
        let automaton = AhoCorasick::new(phrases.iter())
            .context("failed to build phrase automaton from phrase set")?;
        Ok(Self {
            phrases,
            automaton,
            thresholds,
        })
    }

    /// Scorer over the built-in phrase list.
    pub fn builtin() -> Result<Self> {
        Self::new(PhraseSet::builtin())
    }

    pub fn phrases(&self) -> &PhraseSet {
        &self.phrases
    }

    /// Risk score and highlighted sentences for `text`.
    pub fn score(&self, text: &str) -> AnalysisResult {
        self.scan(text).into_result()
    }

    /// Full scan including per-match detail and risk band.
    #[instrument(name = "score_document", skip(self, text), fields(text_len = text.len()))]
    pub fn scan(&self, text: &str) -> ScanReport {
        let sentences = split_sentences(text);
        trace!(count = sentences.len(), "segmented sentences");

        let mut highlights = Vec::new();
        let mut matches = Vec::new();
        let mut hit = vec![false; self.phrases.len()];

        for (sentence_index, sentence) in sentences.iter().enumerate() {
            let lowered = sentence.text.to_lowercase();
            hit.iter_mut().for_each(|flag| *flag = false);
            for found in self.automaton.find_overlapping_iter(&lowered) {
                hit[found.pattern().as_usize()] = true;
            }
            for (phrase_idx, _) in hit.iter().enumerate().filter(|(_, flag)| **flag) {
                let Some(phrase) = self.phrases.get(phrase_idx) else {
                    continue;
                };
                highlights.push(sentence.text.to_string());
                matches.push(PhraseMatch {
                    phrase: phrase.to_string(),
                    sentence_index,
                    span: sentence.span,
                });
            }
        }

        let report =
            ScanReport::from_matches(sentences.len(), highlights, matches, &self.thresholds);
        debug!(
            sentences = report.sentence_count,
            matches = report.matches.len(),
            risk_score = report.risk_score,
            "scan completed"
        );
        report
    }
}
