use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::PassportError;

/// TD3: two lines of 44 characters.
pub const TD3_LINE_LENGTH: usize = 44;
pub const TD3_TOTAL_LENGTH: usize = TD3_LINE_LENGTH * 2;

/// Width/height fractions a contour box must exceed to count as an MRZ
/// line at one relaxation tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineCriteria {
    pub min_width_fraction: f64,
    pub min_height_fraction: f64,
}

impl LineCriteria {
    pub const fn new(min_width_fraction: f64, min_height_fraction: f64) -> Self {
        LineCriteria {
            min_width_fraction,
            min_height_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Structuring element width is `max(kernel_min_width, W * kernel_width_fraction)`.
    pub kernel_width_fraction: f64,
    pub kernel_min_width: u32,
    /// Structuring element height is `max(kernel_min_height, W * kernel_height_fraction)`.
    pub kernel_height_fraction: f64,
    pub kernel_min_height: u32,
    pub blur_sigma: f64,
    /// Tried in order until one yields a candidate line.
    pub relaxation_tiers: Vec<LineCriteria>,
    pub pad_width_fraction: f64,
    pub pad_height_fraction: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        LocatorConfig {
            kernel_width_fraction: 0.03,
            kernel_min_width: 15,
            kernel_height_fraction: 0.01,
            kernel_min_height: 5,
            // OpenCV's sigma for a 3x3 Gaussian with sigma=0
            blur_sigma: 0.8,
            relaxation_tiers: vec![
                LineCriteria::new(0.7, 0.02),
                LineCriteria::new(0.6, 0.015),
                LineCriteria::new(0.5, 0.01),
            ],
            pad_width_fraction: 0.03,
            pad_height_fraction: 0.04,
        }
    }
}

impl LocatorConfig {
    /// Rectangular structuring element (width, height) for an image `image_width` wide.
    pub fn kernel_size(&self, image_width: u32) -> (u32, u32) {
        let w = (image_width as f64 * self.kernel_width_fraction) as u32;
        let h = (image_width as f64 * self.kernel_height_fraction) as u32;
        (w.max(self.kernel_min_width), h.max(self.kernel_min_height))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    pub document_number: f64,
    pub surname: f64,
    pub given_names: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        MatchThresholds {
            document_number: 0.90,
            surname: 0.85,
            given_names: 0.80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryConfig {
    pub expiring_soon_days: i64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        ExpiryConfig {
            expiring_soon_days: 90,
        }
    }
}

/// Tunables for the whole pipeline. Every key is optional in a config
/// file; missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub locator: LocatorConfig,
    pub matching: MatchThresholds,
    pub expiry: ExpiryConfig,
    pub target_length: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            locator: LocatorConfig::default(),
            matching: MatchThresholds::default(),
            expiry: ExpiryConfig::default(),
            target_length: TD3_TOTAL_LENGTH,
        }
    }
}

impl VerifierConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PassportError> {
        let config: VerifierConfig = serde_json::from_str(json)
            .map_err(|e| PassportError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PassportError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded verifier config from {:?}", path.as_ref());
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), PassportError> {
        if self.target_length != TD3_TOTAL_LENGTH {
            return Err(PassportError::ConfigError(format!(
                "target_length must be {} (TD3), got {}",
                TD3_TOTAL_LENGTH, self.target_length
            )));
        }

        let thresholds = [
            ("matching.document_number", self.matching.document_number),
            ("matching.surname", self.matching.surname),
            ("matching.given_names", self.matching.given_names),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(PassportError::ConfigError(format!(
                    "{} must be within 0..=1, got {}",
                    name, value
                )));
            }
        }

        let locator = &self.locator;
        if !(locator.blur_sigma.is_finite() && locator.blur_sigma > 0.0) {
            return Err(PassportError::ConfigError(format!(
                "locator.blur_sigma must be a positive number, got {}",
                locator.blur_sigma
            )));
        }
        let fractions = [
            ("locator.kernel_width_fraction", locator.kernel_width_fraction),
            ("locator.kernel_height_fraction", locator.kernel_height_fraction),
            ("locator.pad_width_fraction", locator.pad_width_fraction),
            ("locator.pad_height_fraction", locator.pad_height_fraction),
        ];
        for (name, value) in fractions {
            if !(value.is_finite() && (0.0..1.0).contains(&value)) {
                return Err(PassportError::ConfigError(format!(
                    "{} must be within 0..1, got {}",
                    name, value
                )));
            }
        }
        if locator.kernel_min_width == 0 || locator.kernel_min_height == 0 {
            return Err(PassportError::ConfigError(format!(
                "locator kernel minimums must be at least 1, got {}x{}",
                locator.kernel_min_width, locator.kernel_min_height
            )));
        }

        if self.locator.relaxation_tiers.is_empty() {
            return Err(PassportError::ConfigError(
                "locator.relaxation_tiers must not be empty".to_string(),
            ));
        }
        for tier in &self.locator.relaxation_tiers {
            if !(0.0..1.0).contains(&tier.min_width_fraction)
                || !(0.0..1.0).contains(&tier.min_height_fraction)
            {
                return Err(PassportError::ConfigError(format!(
                    "Invalid relaxation tier {:?}",
                    tier
                )));
            }
        }

        if self.expiry.expiring_soon_days < 0 {
            return Err(PassportError::ConfigError(
                "expiry.expiring_soon_days must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_kernel_size_has_minimums() {
        let config = LocatorConfig::default();
        assert_eq!(config.kernel_size(300), (15, 5));
        assert_eq!(config.kernel_size(2000), (60, 20));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = VerifierConfig::from_json_str(r#"{"matching": {"surname": 0.9}}"#).unwrap();
        assert_eq!(config.matching.surname, 0.9);
        assert_eq!(config.matching.document_number, 0.90);
        assert_eq!(config.locator.relaxation_tiers.len(), 3);
        assert_eq!(config.target_length, TD3_TOTAL_LENGTH);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let result = VerifierConfig::from_json_str(r#"{"matching": {"given_names": 1.5}}"#);
        assert!(matches!(result, Err(PassportError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_non_td3_length() {
        let result = VerifierConfig::from_json_str(r#"{"target_length": 90}"#);
        assert!(matches!(result, Err(PassportError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_non_positive_blur_sigma() {
        for sigma in ["0.0", "-1.5"] {
            let json = format!(r#"{{"locator": {{"blur_sigma": {}}}}}"#, sigma);
            let result = VerifierConfig::from_json_str(&json);
            assert!(matches!(result, Err(PassportError::ConfigError(_))), "sigma {}", sigma);
        }

        let mut config = VerifierConfig::default();
        config.locator.blur_sigma = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_kernel_settings() {
        let result = VerifierConfig::from_json_str(r#"{"locator": {"kernel_min_width": 0}}"#);
        assert!(matches!(result, Err(PassportError::ConfigError(_))));
        let result = VerifierConfig::from_json_str(r#"{"locator": {"kernel_height_fraction": -0.01}}"#);
        assert!(matches!(result, Err(PassportError::ConfigError(_))));

        let mut config = VerifierConfig::default();
        config.locator.pad_width_fraction = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"expiry": {{"expiring_soon_days": 30}}}}"#).unwrap();
        let config = VerifierConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.expiry.expiring_soon_days, 30);
    }
}
