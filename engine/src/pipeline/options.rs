//! Options for [`crate::FeaturePipeline::apply`].

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ApplyOptions::key_separator`].
pub const KEY_SEPARATOR_ENV: &str = "FEATLINE_KEY_SEPARATOR";

/// Options for one `apply` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOptions {
    /// Columns whose values form the row identity. Empty means positional identity.
    #[serde(default)]
    pub identity_columns: Vec<String>,

    /// Re-invoke units that already ran
    #[serde(default)]
    pub force_reapply_all: bool,

    /// Inserted between identity column values when building keys
    #[serde(default)]
    pub key_separator: String,
}

impl ApplyOptions {
    /// Defaults, with the key separator taken from `FEATLINE_KEY_SEPARATOR` when set.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(separator) = std::env::var(KEY_SEPARATOR_ENV) {
            options.key_separator = separator;
        }
        options
    }

    pub fn with_identity<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.identity_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force_reapply_all = force;
        self
    }

    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ApplyOptions::default();
        assert!(opts.identity_columns.is_empty());
        assert!(!opts.force_reapply_all);
        assert_eq!(opts.key_separator, "");
    }

    #[test]
    fn test_deserialize_partial() {
        let opts: ApplyOptions = serde_json::from_str(r#"{"identity_columns": ["ID"]}"#).unwrap();
        assert_eq!(opts.identity_columns, vec!["ID".to_string()]);
        assert!(!opts.force_reapply_all);
    }
}
