// ============================================================
// Layer 3 — Evaluation Report
// ============================================================
// An EvalReport is an ordered list of (metric, value) pairs.
// Order matters: it is the order the lines appear in
// eval_result.txt.
//
// Scoring follows the usual relation-extraction convention:
// the "no relation" class is excluded from precision / recall,
// so a model that always predicts NonRel scores zero F1.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalReport {
    entries: Vec<(String, f64)>,
}

impl EvalReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a metric; a repeated name overwrites the earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// `key:value\n` for every metric, in insertion order.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for EvalReport {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut report = EvalReport::new();
        for (k, v) in iter {
            report.insert(k, v);
        }
        report
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.entries {
            writeln!(f, "  {k:<4} = {v:.4}")?;
        }
        Ok(())
    }
}

// ─── Scoring ─────────────────────────────────────────────────────────────────
/// Score predicted labels against gold labels.
///
/// Produces `acc`, `pre`, `rec`, `f1`. Precision and recall are
/// micro-averaged over every label except `negative_label`.
/// Mismatched lengths are scored over the shorter slice.
pub fn score<S: AsRef<str>>(gold: &[S], predicted: &[S], negative_label: &str) -> EvalReport {
    let n = gold.len().min(predicted.len());
    let mut correct = 0usize;
    let mut true_pos = 0usize;
    let mut pred_pos = 0usize;
    let mut gold_pos = 0usize;

    for (g, p) in gold.iter().zip(predicted.iter()).take(n) {
        let (g, p) = (g.as_ref(), p.as_ref());
        if g == p {
            correct += 1;
        }
        if p != negative_label {
            pred_pos += 1;
        }
        if g != negative_label {
            gold_pos += 1;
            if g == p {
                true_pos += 1;
            }
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(true_pos, pred_pos);
    let recall = ratio(true_pos, gold_pos);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    let mut report = EvalReport::new();
    report.insert("acc", ratio(correct, n));
    report.insert("pre", precision);
    report.insert("rec", recall);
    report.insert("f1", f1);
    report
}
