//! Extraction configuration.

use animatch_settings::AnimatchSettings;

/// Parameters the extractor and encoders need from settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractorConfig {
    /// Expected output length of both encoders.
    pub dimensions: usize,
    /// Decimal places kept per component.
    pub precision: u32,
    /// Square input resolution of the visual encoder.
    pub semantic_input_size: u32,
    /// Square input resolution of the face network.
    pub facial_input_size: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::from_settings(&AnimatchSettings::default())
    }
}

impl ExtractorConfig {
    /// Create config from settings.
    pub fn from_settings(s: &AnimatchSettings) -> Self {
        Self {
            dimensions: s.models.embedding_dimension,
            precision: s.extraction.precision,
            semantic_input_size: s.extraction.semantic_input_size,
            facial_input_size: s.extraction.facial_input_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_settings() {
        let config = ExtractorConfig::default();
        assert_eq!(config.dimensions, 512);
        assert_eq!(config.precision, 6);
        assert_eq!(config.semantic_input_size, 224);
        assert_eq!(config.facial_input_size, 112);
    }

    #[test]
    fn from_settings_copies_overrides() {
        let mut s = AnimatchSettings::default();
        s.extraction.precision = 4;
        s.models.embedding_dimension = 128;
        let config = ExtractorConfig::from_settings(&s);
        assert_eq!(config.precision, 4);
        assert_eq!(config.dimensions, 128);
    }
}
