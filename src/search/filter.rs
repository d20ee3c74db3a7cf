//! Filename filtering criteria.
//!
//! Both axes are optional: an empty keyword set or extension set places no
//! constraint on that axis. A path matches when it passes both checks.

/// Case-insensitive filename filters supplied once per run.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Lowercased keyword substrings; any one must appear in the path.
    keywords: Vec<String>,
    /// Lowercased `.ext` suffixes; the path must end with one of them.
    extension_suffixes: Vec<String>,
}

impl FilterCriteria {
    /// Builds criteria from raw keyword and extension lists.
    ///
    /// Extensions may be given with or without a leading dot; comparison is
    /// case-insensitive on both axes.
    #[must_use]
    pub fn new<S: AsRef<str>>(keywords: &[S], extensions: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let extension_suffixes = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{e}"))
            .collect();
        Self {
            keywords,
            extension_suffixes,
        }
    }

    /// Returns true when neither axis is constrained.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.keywords.is_empty() && self.extension_suffixes.is_empty()
    }

    /// Returns true when the path passes both filters.
    ///
    /// An empty filter set passes vacuously; it never rejects everything.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let path = path.to_lowercase();

        let extension_ok = self.extension_suffixes.is_empty()
            || self
                .extension_suffixes
                .iter()
                .any(|suffix| path.ends_with(suffix));
        if !extension_ok {
            return false;
        }

        self.keywords.is_empty() || self.keywords.iter().any(|keyword| path.contains(keyword))
    }
}
