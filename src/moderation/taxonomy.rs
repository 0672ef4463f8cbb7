//! Fixed moderation category tables.

use crate::types::ModerationFlag;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Read-only mapping from short category codes to descriptions.
#[derive(Debug, Clone)]
pub struct ModerationTaxonomy {
    name: &'static str,
    categories: BTreeMap<&'static str, &'static str>,
}

impl ModerationTaxonomy {
    pub fn new(name: &'static str, entries: &[(&'static str, &'static str)]) -> Self {
        Self {
            name,
            categories: entries.iter().copied().collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn describe(&self, code: &str) -> Option<&'static str> {
        self.categories.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.categories.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.categories.keys().copied()
    }

    /// Full-confidence flag for `code`, described as `"<category> (<code>)"`.
    pub fn flag(&self, code: &str) -> Option<ModerationFlag> {
        self.describe(code).map(|category| ModerationFlag {
            code: code.to_string(),
            description: format!("{} ({})", category, code),
            confidence: 1.0,
        })
    }
}

static LLAMA_GUARD: Lazy<ModerationTaxonomy> = Lazy::new(|| {
    ModerationTaxonomy::new(
        "llama-guard-2",
        &[
            ("S1", "Violent Crimes"),
            ("S2", "Non-Violent Crimes"),
            ("S3", "Sex-Related Crimes"),
            ("S4", "Child Sexual Exploitation"),
            ("S5", "Specialized Advice"),
            ("S6", "Privacy"),
            ("S7", "Intellectual Property"),
            ("S8", "Indiscriminate Weapons"),
            ("S9", "Hate"),
            ("S10", "Suicide & Self-Harm"),
            ("S11", "Sexual Content"),
        ],
    )
});

/// The Llama Guard 2 hazard taxonomy.
pub fn llama_guard() -> &'static ModerationTaxonomy {
    &LLAMA_GUARD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llama_guard_has_eleven_categories() {
        let t = llama_guard();
        assert_eq!(t.codes().count(), 11);
        assert_eq!(t.describe("S10"), Some("Suicide & Self-Harm"));
        assert!(!t.contains("S12"));
    }

    #[test]
    fn test_flag_description_format() {
        let flag = llama_guard().flag("S9").unwrap();
        assert_eq!(flag.code, "S9");
        assert_eq!(flag.description, "Hate (S9)");
        assert_eq!(flag.confidence, 1.0);
        assert!(llama_guard().flag("S99").is_none());
    }
}
