//! Reference extraction from formula text.
//!
//! A purely lexical scan that finds the distinct slot references (`C<id>`,
//! `V<id>`) a formula depends on. It is deliberately tolerant: identifiers
//! that are not references, and malformed prefixes ("C", "Cx"), are simply
//! ignored here. Reporting unknown references is the validation layer's
//! job; this scan only feeds the dependency graph.
//!
//! References inside string literals are not dependencies.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use super::SlotRef;

/// Extract the set of distinct slot references in a formula.
pub fn extract_references(text: &str) -> BTreeSet<SlotRef> {
    let text = strip_string_literals(text);

    let mut refs = BTreeSet::new();
    for m in ident_re().find_iter(&text) {
        if let Some(slot) = SlotRef::parse(m.as_str()) {
            refs.insert(slot);
        }
    }
    refs
}

fn ident_re() -> &'static Regex {
    static IDENT_RE: OnceLock<Regex> = OnceLock::new();
    IDENT_RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z][A-Za-z0-9_]*\b").expect("identifier regex must compile")
    })
}

fn strip_string_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(' ');
                continue;
            }
            if ch == '\\' {
                escaped = true;
                out.push(' ');
                continue;
            }
            if ch == '"' {
                in_string = false;
                out.push('"');
            } else {
                out.push(' ');
            }
        } else if ch == '"' {
            in_string = true;
            out.push('"');
        } else {
            out.push(ch);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::extract_references;
    use crate::engine::SlotRef;

    #[test]
    fn test_extract_collapses_duplicates() {
        let refs = extract_references("C0 + C0 + V1");
        assert_eq!(
            refs.into_iter().collect::<Vec<_>>(),
            vec![SlotRef::Column(0), SlotRef::Variable(1)]
        );
    }

    #[test]
    fn test_extract_ignores_non_references() {
        let refs = extract_references("C + Cx + foo_1 + X2 + c3");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_extract_ignores_string_literals() {
        let refs = extract_references("\"C1 and V2\" == \"x\"");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_extract_skips_adjacent_alphanumerics() {
        // "C1x" is one identifier and not a reference; "9C2" keeps C2
        // fused to the digit, so it is not an identifier either.
        let refs = extract_references("C1x + 9C2");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_extract_survives_unparseable_text() {
        // Extraction is lexical; grammar errors do not stop it.
        let refs = extract_references("C4 + + ???");
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec![SlotRef::Column(4)]);
    }
}
