pub mod extract;
pub mod report;
pub mod scanner;

pub use extract::{DocumentFormat, ExtractError, TextExtractor};
pub use report::{render_report, OutputFormat};
pub use scanner::{
    file_repository::{BuiltinPhrases, FilePhraseRepository},
    load_phrase_set,
    risk_scorer::RiskScorer,
    AnalysisResult, PhraseMatch, PhraseRepository, PhraseSet, PhraseValidationError, RiskBand,
    RiskThresholds, ScanReport, Span,
};
