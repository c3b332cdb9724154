use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ParameterError;

/// Perceptual controls for the NTSC signal path.
///
/// Every float field is a normalized knob in `[-1, 1]` with `0` as the
/// neutral position; values outside that range are rejected by
/// [`Setup::validate`] rather than clamped. A `Setup` only takes effect once
/// compiled into a kernel table, so mutating one has no impact until the next
/// `setup()` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setup {
    /// -1 = -180 degrees, +1 = +180 degrees
    pub hue: f64,
    /// -1 = grayscale, +1 = oversaturated colors
    pub saturation: f64,
    /// -1 = dark, +1 = light
    pub contrast: f64,
    /// -1 = dark, +1 = light
    pub brightness: f64,
    /// edge contrast enhancement/blurring
    pub sharpness: f64,
    /// -1 = dark, +1 = light
    pub gamma: f64,
    /// luma bandwidth; raises or lowers horizontal detail
    pub resolution: f64,
    /// artifacts caused by color changes
    pub artifacts: f64,
    /// color artifacts caused by brightness changes
    pub fringing: f64,
    /// color bleed (chroma resolution reduction)
    pub bleed: f64,
    /// merge even and odd fields together to reduce flicker
    pub merge_fields: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self::preset(Preset::Composite)
    }
}

impl Setup {
    /// Baseline parameter vector for a named preset.
    pub fn preset(preset: Preset) -> Self {
        let base = Setup {
            hue: 0.0,
            saturation: 0.0,
            contrast: 0.0,
            brightness: 0.0,
            sharpness: 0.0,
            gamma: 0.0,
            resolution: 0.0,
            artifacts: 0.0,
            fringing: 0.0,
            bleed: 0.0,
            merge_fields: true,
        };
        match preset {
            Preset::Composite => base,
            Preset::SVideo => Setup {
                sharpness: 0.2,
                resolution: 0.2,
                artifacts: -1.0,
                fringing: -1.0,
                ..base
            },
            Preset::Rgb => Setup {
                sharpness: 0.2,
                resolution: 0.7,
                artifacts: -1.0,
                fringing: -1.0,
                bleed: -1.0,
                ..base
            },
            Preset::Monochrome => Setup {
                saturation: -1.0,
                sharpness: 0.2,
                resolution: 0.2,
                artifacts: -0.2,
                fringing: -0.2,
                bleed: -1.0,
                ..base
            },
        }
    }

    /// Check that every field lies in its documented range.
    pub fn validate(&self) -> Result<(), ParameterError> {
        let fields = [
            ("hue", self.hue),
            ("saturation", self.saturation),
            ("contrast", self.contrast),
            ("brightness", self.brightness),
            ("sharpness", self.sharpness),
            ("gamma", self.gamma),
            ("resolution", self.resolution),
            ("artifacts", self.artifacts),
            ("fringing", self.fringing),
            ("bleed", self.bleed),
        ];
        for (field, value) in fields {
            if !(-1.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ParameterError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    /// Overlay the fields present in `overrides` onto this setup.
    pub fn apply(&mut self, overrides: &SetupOverrides) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if let Some(value) = overrides.$field {
                    self.$field = value;
                })*
            };
        }
        overlay!(
            hue, saturation, contrast, brightness, sharpness, gamma, resolution, artifacts,
            fringing, bleed, merge_fields
        );
    }
}

/// Partial parameter set: only the fields present override the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupOverrides {
    pub hue: Option<f64>,
    pub saturation: Option<f64>,
    pub contrast: Option<f64>,
    pub brightness: Option<f64>,
    pub sharpness: Option<f64>,
    pub gamma: Option<f64>,
    pub resolution: Option<f64>,
    pub artifacts: Option<f64>,
    pub fringing: Option<f64>,
    pub bleed: Option<f64>,
    pub merge_fields: Option<bool>,
}

/// Named baseline configurations, from cleanest to dirtiest signal path:
/// RGB bypasses the analog decode entirely, s-video keeps luma and chroma on
/// separate wires, composite mixes them, monochrome drops chroma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Composite,
    SVideo,
    Rgb,
    Monochrome,
}

impl Preset {
    /// All preset names accepted by [`Preset::from_str`].
    pub const NAMES: [&'static str; 4] = ["composite", "svideo", "rgb", "monochrome"];
}

impl FromStr for Preset {
    type Err = ParameterError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "composite" => Ok(Self::Composite),
            "svideo" => Ok(Self::SVideo),
            "rgb" => Ok(Self::Rgb),
            "monochrome" => Ok(Self::Monochrome),
            _ => Err(ParameterError::UnknownPreset {
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Composite => f.write_str("composite"),
            Self::SVideo => f.write_str("svideo"),
            Self::Rgb => f.write_str("rgb"),
            Self::Monochrome => f.write_str("monochrome"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for preset in [
            Preset::Composite,
            Preset::SVideo,
            Preset::Rgb,
            Preset::Monochrome,
        ] {
            assert!(Setup::preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut setup = Setup::default();
        setup.hue = 1.5;
        match setup.validate() {
            Err(ParameterError::OutOfRange { field, .. }) => assert_eq!(field, "hue"),
            other => panic!("expected OutOfRange, got {other:?}"),
        }

        let mut setup = Setup::default();
        setup.bleed = f64::NAN;
        assert!(setup.validate().is_err());
    }

    #[test]
    fn overrides_only_touch_present_fields() {
        let mut setup = Setup::preset(Preset::SVideo);
        let overrides = SetupOverrides {
            hue: Some(0.3),
            merge_fields: Some(false),
            ..Default::default()
        };
        setup.apply(&overrides);
        assert_eq!(setup.hue, 0.3);
        assert!(!setup.merge_fields);
        // untouched by the override
        assert_eq!(setup.artifacts, -1.0);
    }

    #[test]
    fn preset_names_parse() {
        for name in Preset::NAMES {
            let preset: Preset = name.parse().unwrap();
            assert_eq!(preset.to_string(), name);
        }
        assert!("component".parse::<Preset>().is_err());
    }
}
