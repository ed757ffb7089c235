use std::collections::HashSet;
use std::path::Path;

/// HTML5 history-mode fallback: unresolved paths get the root index instead
/// of a 404.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaFallback {
    /// Extensions (lowercase, no dot) that keep a real 404, e.g. a missing `.js`.
    pub exclude_extensions: HashSet<String>,
}

impl SpaFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn excluding<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exclude_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { exclude_extensions }
    }

    /// Whether a miss on `name` may be rewritten to the index document.
    pub fn applies_to(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| !self.exclude_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_falls_back_by_default() {
        let spa = SpaFallback::new();
        assert!(spa.applies_to("/app/settings"));
        assert!(spa.applies_to("/missing.js"));
    }

    #[test]
    fn excluded_extensions_keep_their_404() {
        let spa = SpaFallback::excluding([".JS", "css", ""]);
        assert_eq!(spa.exclude_extensions.len(), 2);
        assert!(!spa.applies_to("/assets/app.js"));
        assert!(!spa.applies_to("/assets/site.CSS"));
        assert!(spa.applies_to("/app/settings"));
        assert!(spa.applies_to("/logo.png"));
    }
}
