//! Converter settings.
//!
//! Both structs deserialize with every field defaulted, so `{}` is a valid
//! configuration.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Memoize descriptor → handler resolution.
    pub cache_handlers: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self { cache_handlers: true }
    }
}

/// Options for decoding records from JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeOptions {
    /// Drop keys a record does not declare instead of failing.
    pub ignore_extra_keys: bool,
}

impl DecodeOptions {
    pub fn lenient() -> Self {
        Self { ignore_extra_keys: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ConverterConfig = serde_json::from_value(json!({})).unwrap();
        assert!(config.cache_handlers);
        let options: DecodeOptions = serde_json::from_value(json!({})).unwrap();
        assert!(!options.ignore_extra_keys);
        let options: DecodeOptions = serde_json::from_value(json!({"ignore_extra_keys": true})).unwrap();
        assert_eq!(options, DecodeOptions::lenient());
    }

    #[test]
    fn unknown_settings_are_rejected() {
        assert!(serde_json::from_value::<ConverterConfig>(json!({"cache": false})).is_err());
    }
}
