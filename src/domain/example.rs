// ============================================================
// Layer 3 — Relation Example and Label Map
// ============================================================
// A RelationExample is one row of a TSV split. Entities are marked
// inline in the text:
//
//   "[s1] Aspirin [e1] reduced the risk of [s2] stroke [e2] ."
//
// text_b is only non-empty when the two entities sit in different
// sentences; in that case entity 1 lives in text_a and entity 2 in
// text_b.

use serde::{Deserialize, Serialize};

/// Inline marker opening entity 1.
pub const ENTITY1_START: &str = "[s1]";
/// Inline marker closing entity 1.
pub const ENTITY1_END: &str = "[e1]";
/// Inline marker opening entity 2.
pub const ENTITY2_START: &str = "[s2]";
/// Inline marker closing entity 2.
pub const ENTITY2_END: &str = "[e2]";

/// All four markers, in vocabulary order.
pub const ENTITY_MARKERS: [&str; 4] = [ENTITY1_START, ENTITY1_END, ENTITY2_START, ENTITY2_END];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationExample {
    /// `{split}-{line}`, used in log messages
    pub guid: String,
    pub label: String,
    pub text_a: String,
    pub text_b: String,
}

impl RelationExample {
    pub fn new(
        guid: impl Into<String>,
        label: impl Into<String>,
        text_a: impl Into<String>,
        text_b: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            label: label.into(),
            text_a: text_a.into(),
            text_b: text_b.into(),
        }
    }
}

// ─── LabelMap ────────────────────────────────────────────────────────────────
/// Bidirectional label ↔ class-index mapping.
///
/// Labels are kept sorted so the same training file always
/// produces the same class indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Collect the distinct labels of `examples`.
    pub fn from_examples(examples: &[RelationExample]) -> Self {
        let mut labels: Vec<String> = examples.iter().map(|e| e.label.clone()).collect();
        labels.sort();
        labels.dedup();
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    pub fn label_of(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(label: &str) -> RelationExample {
        RelationExample::new("train-1", label, "[s1] a [e1] b [s2] c [e2]", "")
    }

    #[test]
    fn label_map_is_sorted_and_deduplicated() {
        let examples = vec![example("Treats"), example("NonRel"), example("Treats"), example("Causes")];
        let map = LabelMap::from_examples(&examples);
        assert_eq!(map.labels(), ["Causes", "NonRel", "Treats"]);
        assert_eq!(map.index_of("NonRel"), Some(1));
        assert_eq!(map.label_of(2), Some("Treats"));
        assert_eq!(map.index_of("Unknown"), None);
        assert_eq!(map.label_of(3), None);
    }

    #[test]
    fn single_sentence_detection() {
        assert!(example("x").is_single_sentence());
        let cross = RelationExample::new("g", "x", "[s1] a [e1] .", "[s2] b [e2] .");
        assert!(!cross.is_single_sentence());
    }
}
