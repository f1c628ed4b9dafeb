//! Key filter combining the fixed base filter with the interactive user filter.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Case-sensitive substring filter over entry keys.
pub struct KeyFilter {
    base: String,
    user: String,
}

impl KeyFilter {
    /// Creates a filter with a fixed `base` substring and an empty user filter.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            user: String::new(),
        }
    }

    /// Returns the base substring fixed at creation.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the current user substring.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Replaces the user substring.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    /// Returns whether `key` contains both the base and the user substring.
    pub fn matches(&self, key: &str) -> bool {
        key.contains(self.base.as_str()) && key.contains(self.user.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_and_user_substrings_must_both_match() {
        let mut filter = KeyFilter::new("config.");
        filter.set_user("color");
        assert!(filter.matches("config.theme.color"));
        assert!(!filter.matches("config.size"));
        assert!(!filter.matches("theme.color"));
    }

    #[test]
    fn matching_is_substring_not_prefix_or_pattern() {
        let mut filter = KeyFilter::new("");
        filter.set_user("eme");
        assert!(filter.matches("config.theme"));
        filter.set_user("c.*r");
        assert!(!filter.matches("color"));
        assert!(filter.matches("abc.*rx"));
    }

    #[test]
    fn matching_is_case_sensitive_and_empty_filters_match_everything() {
        let mut filter = KeyFilter::default();
        assert!(filter.matches(""));
        assert!(filter.matches("Anything"));
        filter.set_user("Color");
        assert!(!filter.matches("config.color"));
        assert_eq!(filter.base(), "");
        assert_eq!(filter.user(), "Color");
    }
}
