// ============================================================
// Layer 4 — TSV Loader
// ============================================================
// Reads one split file (train.tsv, dev.tsv or test.tsv).
//
// Each non-empty line is tab separated:
//
//   label <TAB> text_a [<TAB> text_b [<TAB> ignored ...]]
//
// text_b is only present for cross-sentence relations. Lines
// with fewer than two columns are rejected with the file name
// and 1-based line number so a broken corpus is easy to fix.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §13 (Iterators)

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::example::RelationExample;
use crate::domain::traits::ExampleSource;

/// Loads one `{split}.tsv` file.
/// Implements the ExampleSource trait from Layer 3.
pub struct TsvLoader {
    path:  PathBuf,
    /// Prefix of each example's guid, e.g. "train"
    split: String,
}

impl TsvLoader {
    pub fn new(path: impl Into<PathBuf>, split: impl Into<String>) -> Self {
        Self { path: path.into(), split: split.into() }
    }
}

impl ExampleSource for TsvLoader {
    fn load_all(&self) -> Result<Vec<RelationExample>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read data file '{}'", self.path.display()))?;

        let preprocessor = Preprocessor::new();
        let mut examples = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let columns: Vec<&str> = line.split('\t').collect();
            if columns.len() < 2 {
                bail!(
                    "'{}' line {}: expected 'label<TAB>sentence[<TAB>sentence]', found {} column",
                    self.path.display(),
                    index + 1,
                    columns.len()
                );
            }

            let text_b = columns.get(2).copied().unwrap_or("");
            examples.push(RelationExample::new(
                format!("{}-{}", self.split, index + 1),
                columns[0].trim(),
                preprocessor.clean(columns[1]),
                preprocessor.clean(text_b),
            ));
        }

        tracing::info!(
            "Loaded {} examples from '{}'",
            examples.len(),
            self.path.display()
        );
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tsv(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("train.tsv");
        fs::write(&path, contents).unwrap();
        (tmp, path)
    }

    #[test]
    fn parses_one_and_two_sentence_rows() {
        let (_tmp, path) = write_tsv(
            "CAUSE\t[s1] aspirin [e1] prevents [s2] stroke [e2] .\n\
             \n\
             NonRel\t[s1] a [e1] b .\t[s2] c [e2] d .\textra\n",
        );
        let examples = TsvLoader::new(&path, "train").load_all().unwrap();

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].guid, "train-1");
        assert_eq!(examples[0].label, "CAUSE");
        assert_eq!(examples[0].text_b, "");
        assert_eq!(examples[1].guid, "train-3");
        assert_eq!(examples[1].text_b, "[s2] c [e2] d .");
    }

    #[test]
    fn short_line_reports_file_and_line() {
        let (_tmp, path) = write_tsv("CAUSE\tok sentence\nbroken line\n");
        let err = TsvLoader::new(&path, "train").load_all().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("train.tsv"), "{msg}");
        assert!(msg.contains("line 2"), "{msg}");
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = TsvLoader::new(tmp.path().join("dev.tsv"), "dev");
        assert!(loader.load_all().is_err());
    }
}
