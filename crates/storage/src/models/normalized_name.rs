use serde::{Deserialize, Serialize};

/// A discipline name folded into the form used as its natural key, so that
/// "Judo", " judo " and "JUDO" all refer to the same catalog entry.
///
/// The original spelling is kept for display; comparisons and hashing only
/// look at the folded key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DisciplineName {
    display: String,
    key: String,
}

impl DisciplineName {
    /// Creates a normalized discipline name. Surrounding whitespace is dropped,
    /// inner runs of whitespace collapse to a single space, and the key is
    /// lowercased.
    ///
    /// # Examples
    ///
    /// ```
    /// use storage::models::DisciplineName;
    ///
    /// let a = DisciplineName::new("Brazilian  Jiu-Jitsu");
    /// let b = DisciplineName::new(" brazilian jiu-jitsu ");
    ///
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "Brazilian Jiu-Jitsu");
    /// ```
    pub fn new(name: impl AsRef<str>) -> Self {
        let display = name
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let key = display.to_lowercase();

        Self { display, key }
    }

    /// The name as it should be shown and stored
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The case-folded natural key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn matches(&self, other: &str) -> bool {
        self.key == DisciplineName::new(other).key
    }
}

impl PartialEq for DisciplineName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DisciplineName {}

impl std::hash::Hash for DisciplineName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for DisciplineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<String> for DisciplineName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for DisciplineName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<DisciplineName> for String {
    fn from(value: DisciplineName) -> Self {
        value.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_trims_and_collapses() {
        let name = DisciplineName::new("  Muay   Thai ");
        assert_eq!(name.as_str(), "Muay Thai");
        assert_eq!(name.key(), "muay thai");
    }

    #[test]
    fn test_normalization_case_insensitive() {
        let name1 = DisciplineName::new("JUDO");
        let name2 = DisciplineName::new("judo");
        assert_eq!(name1, name2);
        assert!(name1.matches("Judo"));
    }

    #[test]
    fn test_blank_name_is_empty() {
        assert!(DisciplineName::new("   ").is_empty());
        assert!(!DisciplineName::new("Wrestling").is_empty());
    }

    #[test]
    fn test_different_disciplines_do_not_match() {
        assert!(!DisciplineName::new("Judo").matches("Sambo"));
    }
}
