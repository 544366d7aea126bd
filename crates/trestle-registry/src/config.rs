//! Registry configuration.

/// Default number of components a plural anaphor ("them") resolves to.
pub const DEFAULT_PLURAL_REFERENCE_LIMIT: usize = 3;

/// Configuration for a [`ComponentRegistry`](crate::ComponentRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// How many of the most recently touched components a plural anaphor
    /// resolves to.
    pub plural_reference_limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            plural_reference_limit: DEFAULT_PLURAL_REFERENCE_LIMIT,
        }
    }
}

impl RegistryConfig {
    /// Set the plural anaphor limit (at least 1).
    pub fn with_plural_reference_limit(mut self, limit: usize) -> Self {
        self.plural_reference_limit = limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(RegistryConfig::default().plural_reference_limit, 3);
    }

    #[test]
    fn test_plural_limit_floor() {
        let config = RegistryConfig::default().with_plural_reference_limit(0);
        assert_eq!(config.plural_reference_limit, 1);
    }
}
