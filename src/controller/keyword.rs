//! Trigger keyword matching

/// The phrase whose presence in recognized or typed text fires the trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TriggerKeyword(String);

impl TriggerKeyword {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self(keyword.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Plain substring containment, no normalization
    pub fn matches(&self, text: &str) -> bool {
        text.contains(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_substring() {
        let keyword = TriggerKeyword::new("口約束");
        assert!(keyword.matches("口約束"));
        assert!(keyword.matches("口約束だよ"));
        assert!(keyword.matches("それは口約束でした"));
    }

    #[test]
    fn test_no_match() {
        let keyword = TriggerKeyword::new("口約束");
        assert!(!keyword.matches(""));
        assert!(!keyword.matches("約束"));
        assert!(!keyword.matches("口 約束"));
        assert!(!keyword.matches("くちやくそく"));
    }

    #[test]
    fn test_case_sensitive() {
        let keyword = TriggerKeyword::new("Promise");
        assert!(keyword.matches("a Promise"));
        assert!(!keyword.matches("a promise"));
    }
}
