//! TOML configuration for building a filter without touching code.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::filter::{ConsoleVariant, NtscFilter, Preset, Setup, SetupOverrides};

/// Declarative filter description, loadable from a TOML file.
///
/// ```toml
/// variant = "nes"
/// mode = "svideo"
/// flicker = true
///
/// [setup]
/// hue = 0.05
/// bleed = -0.3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Which console's signal path to model.
    pub variant: ConsoleVariant,
    /// Preset baseline by name; absent means the composite default.
    pub mode: Option<String>,
    /// Parameter overrides layered on the baseline.
    pub setup: SetupOverrides,
    /// Alternate field parity between frames.
    pub flicker: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            variant: ConsoleVariant::Nes,
            mode: None,
            setup: SetupOverrides::default(),
            flicker: false,
        }
    }
}

impl FilterConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into()
            } else {
                crate::NtscError::Io(e)
            }
        })?;

        let config: FilterConfig = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        config.validate()?;
        info!(path = %path.display(), variant = %config.variant, "loaded filter configuration");
        Ok(config)
    }

    /// Save the configuration as pretty-printed TOML.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the preset name and the resolved parameter ranges.
    pub fn validate(&self) -> Result<()> {
        self.resolve_setup()?;
        Ok(())
    }

    /// Build a ready-to-use filter from this configuration.
    pub fn build(&self) -> Result<NtscFilter> {
        let setup = self.resolve_setup()?;
        let mut filter = NtscFilter::with_setup(self.variant, setup)?;
        filter.set_flicker(self.flicker);
        Ok(filter)
    }

    /// The preset selected by `mode`, if any.
    pub fn preset(&self) -> Result<Option<Preset>> {
        match &self.mode {
            Some(name) => Ok(Some(Preset::from_str(name).map_err(|_| {
                ConfigError::InvalidValue {
                    key: "mode".to_string(),
                    value: name.clone(),
                }
            })?)),
            None => Ok(None),
        }
    }

    fn resolve_setup(&self) -> Result<Setup> {
        let mut setup = match self.preset()? {
            Some(preset) => Setup::preset(preset),
            None => Setup::default(),
        };
        setup.apply(&self.setup);
        setup.validate()?;
        Ok(setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn config_round_trip() {
        let mut config = FilterConfig::default();
        config.variant = ConsoleVariant::Sms;
        config.mode = Some("rgb".to_string());
        config.setup.hue = Some(0.25);
        config.flicker = true;

        let file = NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();

        let loaded = FilterConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.variant, ConsoleVariant::Sms);
        assert_eq!(loaded.mode.as_deref(), Some("rgb"));
        assert_eq!(loaded.setup.hue, Some(0.25));
        assert!(loaded.flicker);
    }

    #[test]
    fn missing_file_is_a_distinct_error() {
        match FilterConfig::from_file("/nonexistent/retro-ntsc.toml") {
            Err(crate::NtscError::Config(ConfigError::FileNotFound { .. })) => {}
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn bad_mode_and_bad_range_are_rejected() {
        let mut config = FilterConfig::default();
        config.mode = Some("component".to_string());
        assert!(config.validate().is_err());

        let mut config = FilterConfig::default();
        config.setup.gamma = Some(-3.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn build_applies_mode_and_overrides() {
        let mut config = FilterConfig::default();
        config.mode = Some("svideo".to_string());
        config.setup.resolution = Some(0.5);
        config.flicker = true;

        let filter = config.build().unwrap();
        assert!(filter.is_configured());
        assert!(filter.flicker());
        assert_eq!(filter.setup().artifacts, -1.0);
        assert_eq!(filter.setup().resolution, 0.5);
    }
}
