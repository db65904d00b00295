use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Composite identity of a stock record: `(name, company)`.
///
/// Both components are normalized on construction (surrounding whitespace
/// trimmed, lower-cased), so two keys built from `"  Widget "`/`" Acme "`
/// and `"widget"`/`"acme"` are equal. Callers must not expect the original
/// casing or whitespace to survive.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    name: String,
    company: String,
}

impl StockKey {
    /// Build a key from raw user input, normalizing both components.
    ///
    /// Fails if either component is empty after trimming.
    pub fn new(name: &str, company: &str) -> Result<Self, TypeError> {
        let name = Self::normalize(name);
        if name.is_empty() {
            return Err(TypeError::EmptyKeyComponent("name"));
        }
        let company = Self::normalize(company);
        if company.is_empty() {
            return Err(TypeError::EmptyKeyComponent("company"));
        }
        Ok(Self { name, company })
    }

    /// The normalization applied to each key component.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    /// Rebuild a key from components that are already normalized
    /// (e.g. fields read back from a stored record).
    pub(crate) fn from_normalized(name: String, company: String) -> Self {
        Self { name, company }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.name, self.company)
    }
}

impl fmt::Debug for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StockKey({}/{})", self.name, self.company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_whitespace_and_case() {
        let a = StockKey::new("  Widget ", " Acme ").unwrap();
        let b = StockKey::new("widget", "acme").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name(), "widget");
        assert_eq!(a.company(), "acme");
    }

    #[test]
    fn rejects_blank_components() {
        assert_eq!(
            StockKey::new("   ", "acme"),
            Err(TypeError::EmptyKeyComponent("name"))
        );
        assert_eq!(
            StockKey::new("bolt", ""),
            Err(TypeError::EmptyKeyComponent("company"))
        );
    }

    #[test]
    fn display_reads_naturally() {
        let key = StockKey::new("Bolt", "ACME").unwrap();
        assert_eq!(key.to_string(), "bolt from acme");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(name in "[ a-zA-Z0-9]{1,16}", company in "[ a-zA-Z0-9]{1,16}") {
            prop_assume!(!name.trim().is_empty() && !company.trim().is_empty());
            let once = StockKey::new(&name, &company).unwrap();
            let twice = StockKey::new(once.name(), once.company()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn padding_and_case_do_not_change_identity(name in "[a-z]{1,12}", company in "[a-z]{1,12}", pad in " {0,3}") {
            let plain = StockKey::new(&name, &company).unwrap();
            let noisy = StockKey::new(
                &format!("{pad}{}{pad}", name.to_uppercase()),
                &format!("{pad}{company}"),
            ).unwrap();
            prop_assert_eq!(plain, noisy);
        }
    }
}
