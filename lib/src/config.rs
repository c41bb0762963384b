//! Transform configuration
//!
//! [`CwtConfig`] bundles every knob of the transform: band shape, padding,
//! gain and output width. It is a plain value; change it with the `with_*`
//! setters and hand the new copy to the processor.

use crate::band::{frequency_band, FrequencyBand};
use crate::error::CwtError;
use crate::Result;

/// Widest row produced for whole files when no output width is set
pub const DEFAULT_MAX_OUTPUT_WIDTH: usize = 4096;

/// Wavelet transform configuration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CwtConfig {
    /// Number of band rows
    pub height: usize,
    /// Zero samples added to each side of the signal
    pub padding: usize,
    /// Amplitude scale applied before the forward transform
    pub gain: f64,
    /// Span of the band; `0.0` selects `height / 2`
    pub frequency_range: f64,
    /// Lowest band frequency, or lowest exponent for exponential bands
    pub frequency_offset: f64,
    /// `0.0` for a linear band, otherwise the exponential base
    pub frequency_basis: f64,
    /// Time/frequency resolution tradeoff, 1.0 is balanced
    pub deviation: f64,
    /// Row width in samples; `0` keeps the signal length
    pub output_width: usize,
}

impl Default for CwtConfig {
    fn default() -> Self {
        Self {
            height: 512,
            padding: 0,
            gain: 1.0,
            frequency_range: 0.0,
            frequency_offset: 0.0,
            frequency_basis: 0.0,
            deviation: 1.0,
            output_width: 0,
        }
    }
}

impl CwtConfig {
    /// Create a linear-band configuration with validation
    pub fn new(height: usize, deviation: f64) -> Result<Self> {
        Self {
            height,
            deviation,
            ..Default::default()
        }
        .validated()
    }

    /// Check every field and return the configuration unchanged if valid
    pub fn validated(self) -> Result<Self> {
        if self.height == 0 {
            return Err(CwtError::InvalidInput(
                "Height must be at least one row".to_string(),
            ));
        }

        if !self.deviation.is_finite() || self.deviation <= 0.0 {
            return Err(CwtError::InvalidInput(format!(
                "Deviation must be positive and finite, got {}",
                self.deviation
            )));
        }

        if !self.gain.is_finite() {
            return Err(CwtError::InvalidInput(format!(
                "Gain must be finite, got {}",
                self.gain
            )));
        }

        if !self.frequency_range.is_finite() || self.frequency_range < 0.0 {
            return Err(CwtError::InvalidInput(format!(
                "Frequency range must be non-negative, got {}",
                self.frequency_range
            )));
        }

        if !self.frequency_offset.is_finite() {
            return Err(CwtError::InvalidInput(format!(
                "Frequency offset must be finite, got {}",
                self.frequency_offset
            )));
        }

        // A basis of one collapses every row onto the same frequency
        if !self.frequency_basis.is_finite()
            || self.frequency_basis < 0.0
            || self.frequency_basis == 1.0
        {
            return Err(CwtError::InvalidInput(format!(
                "Frequency basis must be 0 or a positive value other than 1, got {}",
                self.frequency_basis
            )));
        }

        Ok(self)
    }

    pub fn with_height(mut self, height: usize) -> Result<Self> {
        self.height = height;
        self.validated()
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_gain(mut self, gain: f64) -> Result<Self> {
        self.gain = gain;
        self.validated()
    }

    /// Set range, offset and basis together
    pub fn with_frequencies(mut self, range: f64, offset: f64, basis: f64) -> Result<Self> {
        self.frequency_range = range;
        self.frequency_offset = offset;
        self.frequency_basis = basis;
        self.validated()
    }

    pub fn with_deviation(mut self, deviation: f64) -> Result<Self> {
        self.deviation = deviation;
        self.validated()
    }

    pub fn with_output_width(mut self, output_width: usize) -> Self {
        self.output_width = output_width;
        self
    }

    /// Whether the band is exponentially spaced
    pub fn is_exponential(&self) -> bool {
        self.frequency_basis > 0.0
    }

    /// Frequency range actually used by the band
    pub fn effective_range(&self) -> f64 {
        if self.frequency_range == 0.0 {
            self.height as f64 / 2.0
        } else {
            self.frequency_range
        }
    }

    /// Build the band described by this configuration
    pub fn band(&self) -> FrequencyBand {
        frequency_band(
            self.height,
            self.frequency_range,
            self.frequency_offset,
            self.frequency_basis,
            self.deviation,
        )
    }
}

/// Commonly used transform configurations
pub mod presets {
    use super::*;

    /// Preset information structure
    pub struct PresetInfo {
        pub id: usize,
        pub name: &'static str,
        pub description: &'static str,
        pub config: CwtConfig,
    }

    /// Default
    pub fn default() -> CwtConfig {
        CwtConfig::default()
    }

    /// Octave-spaced band, 11 octaves above 16 cycles per signal
    pub fn exponential_audio() -> CwtConfig {
        CwtConfig {
            height: 1024,
            padding: 4096,
            frequency_range: 11.0,
            frequency_offset: 4.0,
            frequency_basis: 2.0,
            deviation: 1.0,
            ..Default::default()
        }
    }

    /// Wide windows in frequency, short in time
    pub fn high_time_resolution() -> CwtConfig {
        CwtConfig {
            deviation: 4.0,
            ..Default::default()
        }
    }

    /// Narrow windows in frequency, long in time
    pub fn high_freq_resolution() -> CwtConfig {
        CwtConfig {
            height: 1024,
            deviation: 0.25,
            ..Default::default()
        }
    }

    /// List all presets with detailed info
    pub fn list_presets() -> Vec<PresetInfo> {
        vec![
            PresetInfo {
                id: 0,
                name: "Default",
                description: "Linear, 512 rows, deviation 1",
                config: default(),
            },
            PresetInfo {
                id: 1,
                name: "Exponential Audio",
                description: "Base 2, 1024 rows, 11 octaves",
                config: exponential_audio(),
            },
            PresetInfo {
                id: 2,
                name: "High Time Resolution",
                description: "Linear, 512 rows, deviation 4",
                config: high_time_resolution(),
            },
            PresetInfo {
                id: 3,
                name: "High Frequency Resolution",
                description: "Linear, 1024 rows, deviation 0.25",
                config: high_freq_resolution(),
            },
        ]
    }

    /// Get a preset by ID
    pub fn get_preset(id: usize) -> Option<PresetInfo> {
        list_presets().into_iter().find(|p| p.id == id)
    }

    /// Get a preset by case-insensitive name
    pub fn find_preset(name: &str) -> Option<PresetInfo> {
        list_presets()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CwtConfig::default();
        assert!(config.validated().is_ok());
        assert!(!config.is_exponential());
        assert_eq!(config.effective_range(), 256.0);
        assert_eq!(config.band().len(), 512);
    }

    #[test]
    fn test_validation() {
        assert!(CwtConfig::new(0, 1.0).is_err());
        assert!(CwtConfig::new(10, 0.0).is_err());
        assert!(CwtConfig::new(10, f64::NAN).is_err());
        assert!(CwtConfig::new(10, 0.5).is_ok());

        let config = CwtConfig::default();
        assert!(config.with_gain(f64::INFINITY).is_err());
        assert!(config.with_frequencies(-1.0, 0.0, 0.0).is_err());
        assert!(config.with_frequencies(8.0, 0.0, 1.0).is_err());
        assert!(config.with_frequencies(8.0, 0.0, -2.0).is_err());
        assert!(config.with_frequencies(8.0, 3.0, 2.0).is_ok());
    }

    #[test]
    fn test_setters_keep_value_semantics() {
        let base = CwtConfig::default();
        let changed = base.with_padding(100).with_output_width(250);
        assert_eq!(base.padding, 0);
        assert_eq!(changed.padding, 100);
        assert_eq!(changed.output_width, 250);
    }

    #[test]
    fn test_band_matches_parameters() {
        let config = CwtConfig::default()
            .with_height(16)
            .and_then(|c| c.with_frequencies(4.0, 2.0, 2.0))
            .unwrap();
        let band = config.band();
        assert_eq!(band, frequency_band(16, 4.0, 2.0, 2.0, 1.0));
        assert!((band[0].frequency - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_presets() {
        let presets = presets::list_presets();
        assert_eq!(presets.len(), 4);

        for preset in &presets {
            println!("Testing preset: {}", preset.name);
            assert!(preset.config.validated().is_ok());
            let band = preset.config.band();
            for pair in band.entries().windows(2) {
                assert!(pair[0].frequency > pair[1].frequency);
            }
        }

        assert_eq!(presets::get_preset(1).unwrap().name, "Exponential Audio");
        assert!(presets::find_preset("high time resolution").is_some());
        assert!(presets::get_preset(9).is_none());
    }
}
