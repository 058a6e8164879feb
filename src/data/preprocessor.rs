// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans one TSV column before tokenisation.
//
// Corpus exports often carry:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - A byte order mark on the first line
//   - Stray control characters and carriage returns
//   - Runs of spaces around the entity markers
//
// Cleaning steps (applied in order):
//   1. Replace Unicode whitespace variants and controls with a space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//
// Columns are single sentences, so no line structure is kept.
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one sentence; returns an owned String.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                // last_space starts true so leading spaces are dropped
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("[s1]  aspirin   [e1]"), "[s1] aspirin [e1]");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello world  "), "hello world");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\x01world\r"), "hello world");
    }

    #[test]
    fn test_unicode_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("\u{FEFF}a\u{00A0}b\u{200B}c"), "a b c");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert_eq!(p.clean("   "), "");
    }
}
