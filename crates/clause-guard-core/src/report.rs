use std::fmt::Write;

use serde::Serialize;

use crate::scanner::{PhraseMatch, RiskBand, ScanReport};

/// Format styles supported when rendering a scan.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string from a `ScanReport` using the desired format.
pub fn render_report(report: &ScanReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport::from(report))?),
    }
}

fn render_human(report: &ScanReport) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Risk Score: {:.1} ({:?})",
        report.risk_score, report.risk_band
    )?;
    writeln!(out, "Sentences: {}", report.sentence_count)?;
    writeln!(out)?;

    if report.matches.is_empty() {
        writeln!(out, "No risky phrases detected.")?;
        return Ok(out);
    }

    writeln!(out, "Highlights ({} matches):", report.matches.len())?;
    for (finding, sentence) in report.matches.iter().zip(&report.highlights) {
        writeln!(
            out,
            "  - [{phrase}] #{index}: \"{sentence}\"",
            phrase = finding.phrase,
            index = finding.sentence_index + 1,
            sentence = sanitize_excerpt(sentence),
        )?;
    }
    Ok(out)
}

fn sanitize_excerpt(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    risk_score: f64,
    risk_band: RiskBand,
    sentence_count: usize,
    highlights: &'a [String],
    matches: &'a [PhraseMatch],
}

impl<'a> From<&'a ScanReport> for JsonReport<'a> {
    fn from(report: &'a ScanReport) -> Self {
        Self {
            risk_score: report.risk_score,
            risk_band: report.risk_band,
            sentence_count: report.sentence_count,
            highlights: &report.highlights,
            matches: &report.matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{RiskThresholds, ScanReport};

    fn sample_report() -> ScanReport {
        let sentence = "Seller disclaims any warranty.".to_string();
        ScanReport::from_matches(
            3,
            vec![sentence],
            vec![PhraseMatch {
                phrase: "warranty".into(),
                sentence_index: 1,
                span: (20, 50),
            }],
            &RiskThresholds::default(),
        )
    }

    #[test]
    fn human_report_lists_highlights() {
        let output = render_report(&sample_report(), OutputFormat::Human).unwrap();
        assert!(output.contains("Risk Score: 8.3 (Low)"));
        assert!(output.contains("Sentences: 3"));
        assert!(output.contains("[warranty] #2: \"Seller disclaims any warranty.\""));
    }

    #[test]
    fn human_report_without_matches() {
        let report = ScanReport::from_matches(2, Vec::new(), Vec::new(), &RiskThresholds::default());
        let output = render_report(&report, OutputFormat::Human).unwrap();
        assert!(output.contains("Risk Score: 0.0 (Low)"));
        assert!(output.contains("No risky phrases detected."));
    }

    #[test]
    fn json_report_serializes() {
        let report = sample_report();
        let output = render_report(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["risk_score"], serde_json::json!(8.3));
        assert_eq!(value["risk_band"], "low");
        assert_eq!(value["matches"][0]["phrase"], "warranty");
        assert!(value["highlights"].is_array());
    }
}
