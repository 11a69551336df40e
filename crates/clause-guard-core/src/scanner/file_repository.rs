use std::{collections::HashSet, fs, path::PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;

use super::{PhraseRepository, DEFAULT_RISKY_PHRASES};

/// Serves the compiled-in phrase list.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPhrases;

#[async_trait::async_trait]
impl PhraseRepository for BuiltinPhrases {
    async fn load_phrases(&self) -> Result<Vec<String>> {
        Ok(DEFAULT_RISKY_PHRASES
            .iter()
            .map(|phrase| (*phrase).to_string())
            .collect())
    }
}

/// Loads phrases from a text file, one phrase per line; `#` starts a comment line.
pub struct FilePhraseRepository {
    path: PathBuf,
    cache: OnceCell<Vec<String>>,
}

impl FilePhraseRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    fn read_phrases(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read phrase file at {}", self.path.display()))?;
        let mut seen = HashSet::new();
        let mut phrases = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let phrase = trimmed.to_lowercase();
            if !seen.insert(phrase.clone()) {
                return Err(anyhow::anyhow!(
                    "duplicate phrase `{phrase}` at {}:{}",
                    self.path.display(),
                    idx + 1
                ));
            }
            phrases.push(phrase);
        }
        if phrases.is_empty() {
            return Err(anyhow::anyhow!(
                "phrase file at {} defines no phrases",
                self.path.display()
            ));
        }
        Ok(phrases)
    }
}

#[async_trait::async_trait]
impl PhraseRepository for FilePhraseRepository {
    async fn load_phrases(&self) -> Result<Vec<String>> {
        let phrases = self.cache.get_or_try_init(|| self.read_phrases())?;
        Ok(phrases.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{load_phrase_set, PhraseSet};
    use proptest::prelude::*;
    use std::path::Path;

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_phrases_skipping_comments_and_blanks() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("phrases.txt");
        write(
            &path,
            r#"
# payment risk
Late Fee
  auto-renewal

# jurisdiction
venue
"#,
        );

        let repo = FilePhraseRepository::new(&path);
        let phrases = futures::executor::block_on(repo.load_phrases()).unwrap();
        assert_eq!(phrases, vec!["late fee", "auto-renewal", "venue"]);
    }

    #[test]
    fn duplicate_phrases_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("phrases.txt");
        write(&path, "penalty\nPENALTY\n");
        let repo = FilePhraseRepository::new(&path);
        let err = futures::executor::block_on(repo.load_phrases()).unwrap_err();
        assert!(err.to_string().contains("duplicate phrase `penalty`"));
    }

    #[test]
    fn missing_file_errors_with_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("absent.txt");
        let repo = FilePhraseRepository::new(&path);
        let err = futures::executor::block_on(repo.load_phrases()).unwrap_err();
        assert!(err.to_string().contains("absent.txt"));
    }

    #[test]
    fn comment_only_file_errors() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("phrases.txt");
        write(&path, "# nothing here\n\n");
        let repo = FilePhraseRepository::new(&path);
        assert!(futures::executor::block_on(repo.load_phrases()).is_err());
    }

    #[test]
    fn sample_phrase_file_matches_builtin_list() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../phrases/risky_phrases.txt");
        let repo = FilePhraseRepository::new(path);
        let set = futures::executor::block_on(load_phrase_set(&repo))
            .expect("sample phrase file should parse");
        assert_eq!(set, PhraseSet::builtin());
    }

    #[tokio::test]
    async fn builtin_repository_yields_default_list() {
        let set = load_phrase_set(&BuiltinPhrases).await.unwrap();
        assert_eq!(set.len(), DEFAULT_RISKY_PHRASES.len());
        assert_eq!(set.get(0), Some("indemnify"));
    }

    fn phrase_text() -> impl Strategy<Value = String> {
        proptest::string::string_regex("[a-z][a-z \\-]{2,30}[a-z]").unwrap()
    }

    proptest! {
        #[test]
        fn unique_phrases_round_trip(
            entries in proptest::collection::hash_set(phrase_text(), 1..16)
        ) {
            let temp = tempfile::tempdir().unwrap();
            let path = temp.path().join("phrases.txt");
            let mut buffer = String::from("# generated\n");
            for phrase in &entries {
                buffer.push_str(phrase);
                buffer.push('\n');
            }
            write(&path, &buffer);

            let repo = FilePhraseRepository::new(&path);
            let phrases = futures::executor::block_on(repo.load_phrases())
                .expect("unique phrases should parse");
            prop_assert_eq!(phrases.len(), entries.len());
            for phrase in phrases {
                prop_assert!(entries.contains(&phrase));
            }
        }
    }
}
