//! Conversion options resolved from configuration.

use heic_core::config::ConfigSchema;
use heic_core::{Error, Result};
use heic_image::{DecoderRegistry, SourceFormat, JPEG_QUALITY};

/// Settings threaded through every conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Strip EXIF from the written JPEG
    pub remove_metadata: bool,
    /// JPEG quality, 0-100
    pub quality: u8,
    /// Convert files of a batch concurrently
    pub parallel: bool,
    /// Skip dot-files when walking directories
    pub skip_hidden: bool,
    /// Source formats to look for
    pub sources: Vec<SourceFormat>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            remove_metadata: false,
            quality: JPEG_QUALITY,
            parallel: true,
            skip_hidden: false,
            sources: SourceFormat::defaults(),
        }
    }
}

impl ConvertOptions {
    /// Options from the `[convert]` and `[scan]` tables.
    pub fn from_config(schema: &ConfigSchema) -> Result<Self> {
        let sources = match &schema.convert.sources {
            Some(names) => parse_sources(names)?,
            None => SourceFormat::defaults(),
        };
        Ok(Self {
            remove_metadata: schema.convert.remove_exif,
            quality: JPEG_QUALITY,
            parallel: schema.convert.parallel,
            skip_hidden: schema.scan.skip_hidden,
            sources,
        })
    }

    /// Decoder registry for the configured sources.
    pub fn registry(&self) -> Result<DecoderRegistry> {
        DecoderRegistry::for_formats(&self.sources).map_err(|e| {
            Error::config(e.to_string()).with_suggestion("Rebuild with `--features heif` or choose other sources")
        })
    }
}

/// Parse source format names, rejecting unknown and empty lists.
pub fn parse_sources<S: AsRef<str>>(names: &[S]) -> Result<Vec<SourceFormat>> {
    if names.is_empty() {
        return Err(Error::invalid_config_value("convert.sources", "[]")
            .with_suggestion("List at least one of: heif, png, webp, gif"));
    }

    names
        .iter()
        .map(|name| {
            name.as_ref()
                .trim()
                .parse::<SourceFormat>()
                .map_err(|reason| Error::invalid_config_value("convert.sources", reason))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use heic_core::ErrorCode;

    #[test]
    fn test_defaults_follow_config_defaults() {
        let options = ConvertOptions::from_config(&ConfigSchema::default()).unwrap();
        assert_eq!(options, ConvertOptions::default());
        assert_eq!(options.quality, 95);
    }

    #[test]
    fn test_from_config() {
        let mut schema = ConfigSchema::default();
        schema.convert.remove_exif = true;
        schema.convert.parallel = false;
        schema.convert.sources = Some(vec!["PNG".to_string(), " gif ".to_string()]);
        schema.scan.skip_hidden = true;

        let options = ConvertOptions::from_config(&schema).unwrap();
        assert!(options.remove_metadata);
        assert!(!options.parallel);
        assert!(options.skip_hidden);
        assert_eq!(options.sources, vec![SourceFormat::Png, SourceFormat::Gif]);
    }

    #[test]
    fn test_rejects_bad_sources() {
        let err = parse_sources(&["bmp"]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);

        let err = parse_sources::<&str>(&[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }

    #[test]
    fn test_registry_from_sources() {
        let options = ConvertOptions {
            sources: vec![SourceFormat::Png, SourceFormat::WebP],
            ..Default::default()
        };
        assert_eq!(options.registry().unwrap().extensions(), vec!["png", "webp"]);
    }

    #[test]
    fn test_default_sources_build_a_registry() {
        let options = ConvertOptions::from_config(&ConfigSchema::default()).unwrap();
        assert_eq!(options.sources, SourceFormat::defaults());
        assert!(!options.registry().unwrap().is_empty());
    }

    #[test]
    fn test_empty_configured_sources_rejected() {
        let mut schema = ConfigSchema::default();
        schema.convert.sources = Some(Vec::new());
        let err = ConvertOptions::from_config(&schema).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_heif_registry_is_config_error() {
        let options = ConvertOptions {
            sources: vec![SourceFormat::Heif],
            ..Default::default()
        };
        let err = options.registry().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
