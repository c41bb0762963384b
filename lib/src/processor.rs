//! Main wavelet processor implementation
//!
//! [`CwtProcessor`] keeps loaded audio together with the configuration and the
//! data derived from it: the forward spectrum, the frequency band and the last
//! scalogram. Changing audio or configuration drops whatever it invalidates.

use crate::audio_io::{select_channel, AudioInfo, ChannelSelection};
use crate::band::FrequencyBand;
use crate::config::CwtConfig;
use crate::error::CwtError;
use crate::rows::{compute_rows, compute_scalogram};
use crate::scalogram::Scalogram;
use crate::spectrum::{forward_spectrum, Spectrum};
use crate::wavelet::OutputGeometry;
use crate::utils::band_frequency_to_hz;
use crate::Result;
use num_complex::Complex64;
use std::ops::Range;

/// Wavelet processor for decoded audio
#[derive(Default)]
pub struct CwtProcessor {
    config: CwtConfig,
    channel: Option<ChannelSelection>,
    audio_info: Option<AudioInfo>,
    channel_data: Option<Vec<Vec<f64>>>,
    spectrum: Option<Spectrum>,
    band: Option<FrequencyBand>,
    scalogram: Option<Scalogram>,
}

impl CwtProcessor {
    /// Create a new processor with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new processor with custom configuration
    pub fn with_config(config: CwtConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
            ..Self::default()
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &CwtConfig {
        &self.config
    }

    /// Replace the configuration, dropping derived data it invalidates
    pub fn set_config(&mut self, config: CwtConfig) -> Result<()> {
        let config = config.validated()?;

        if config.padding != self.config.padding || config.gain != self.config.gain {
            self.spectrum = None;
        }
        if config.height != self.config.height
            || config.frequency_range != self.config.frequency_range
            || config.frequency_offset != self.config.frequency_offset
            || config.frequency_basis != self.config.frequency_basis
            || config.deviation != self.config.deviation
        {
            self.band = None;
        }
        if config != self.config {
            self.scalogram = None;
        }

        self.config = config;
        Ok(())
    }

    /// Channel that is transformed; mixed down when unset
    pub fn channel(&self) -> ChannelSelection {
        self.channel.unwrap_or(ChannelSelection::Mix)
    }

    pub fn set_channel(&mut self, selection: ChannelSelection) -> Result<()> {
        if let (ChannelSelection::Channel(index), Some(info)) = (selection, &self.audio_info) {
            if index >= info.channels {
                return Err(CwtError::InvalidInput(format!(
                    "Channel {} out of range ({} channels)",
                    index, info.channels
                )));
            }
        }

        if self.channel() != selection {
            self.spectrum = None;
            self.scalogram = None;
        }
        self.channel = Some(selection);
        Ok(())
    }

    /// Load audio data into the processor
    pub fn load_audio(&mut self, audio_info: AudioInfo, channel_data: Vec<Vec<f64>>) -> Result<()> {
        if channel_data.len() != audio_info.channels {
            return Err(CwtError::InvalidInput(format!(
                "Channel count mismatch: expected {}, got {}",
                audio_info.channels,
                channel_data.len()
            )));
        }

        for (i, channel) in channel_data.iter().enumerate() {
            if channel.len() != audio_info.duration_samples {
                return Err(CwtError::InvalidInput(format!(
                    "Channel {} has length {}, expected {}",
                    i,
                    channel.len(),
                    audio_info.duration_samples
                )));
            }
        }

        if let Some(ChannelSelection::Channel(index)) = self.channel {
            if index >= audio_info.channels {
                log::warn!(
                    "Channel {} not present in new audio, mixing down instead",
                    index
                );
                self.channel = None;
            }
        }

        log::info!(
            "Loaded {} channels, {} samples at {} Hz",
            audio_info.channels,
            audio_info.duration_samples,
            audio_info.sample_rate
        );

        self.audio_info = Some(audio_info);
        self.channel_data = Some(channel_data);
        self.spectrum = None;
        self.scalogram = None;

        Ok(())
    }

    /// Get audio information
    pub fn audio_info(&self) -> Option<&AudioInfo> {
        self.audio_info.as_ref()
    }

    /// Get reference to channel data
    pub fn channel_data(&self) -> Option<&Vec<Vec<f64>>> {
        self.channel_data.as_ref()
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    pub fn band(&self) -> Option<&FrequencyBand> {
        self.band.as_ref()
    }

    pub fn scalogram(&self) -> Option<&Scalogram> {
        self.scalogram.as_ref()
    }

    /// Take the last scalogram out of the processor
    pub fn take_scalogram(&mut self) -> Option<Scalogram> {
        self.scalogram.take()
    }

    /// Cap an unset output width at `max_width` for the loaded audio
    ///
    /// An explicit width is left alone. Otherwise the largest width at or below
    /// `max_width` that divides the padded signal evenly is stored in the
    /// configuration. Returns the width now configured.
    pub fn fit_output_width(&mut self, max_width: usize) -> Result<usize> {
        let samples = self
            .audio_info
            .as_ref()
            .map(|info| info.duration_samples)
            .ok_or_else(|| CwtError::InvalidInput("No audio data loaded".to_string()))?;
        if self.config.output_width != 0 || samples <= max_width {
            return Ok(self.config.output_width);
        }

        let padding = self.config.padding;
        let total = padding
            .checked_mul(2)
            .and_then(|p| p.checked_add(samples))
            .ok_or_else(|| CwtError::InvalidInput(format!("Padding {} is too large", padding)))?;

        match OutputGeometry::aligned_output_width(total, padding, max_width) {
            Some(width) => {
                log::info!("Output width {} for {} samples", width, samples);
                self.set_config(self.config.with_output_width(width))?;
                Ok(width)
            }
            None => {
                log::warn!(
                    "No output width up to {} divides {} samples, keeping full width",
                    max_width,
                    samples
                );
                Ok(0)
            }
        }
    }

    /// Build the spectrum and band for the current audio and configuration
    pub fn prepare(&mut self) -> Result<()> {
        if self.spectrum.is_none() {
            let channel_data = self
                .channel_data
                .as_ref()
                .ok_or_else(|| CwtError::InvalidInput("No audio data loaded".to_string()))?;
            let signal = select_channel(channel_data, self.channel())?;

            log::info!(
                "Computing spectrum of {} samples ({:?}), padding {}",
                signal.len(),
                self.channel(),
                self.config.padding
            );
            self.spectrum = Some(forward_spectrum(
                &signal,
                self.config.padding,
                self.config.gain,
            )?);
        }

        if self.band.is_none() {
            self.band = Some(self.config.band());
        }

        Ok(())
    }

    /// Compute the full scalogram using `parts` parallel row ranges
    pub fn transform(&mut self, parts: usize) -> Result<&Scalogram> {
        self.prepare()?;
        let (spectrum, band) = self.prepared()?;

        let scalogram = compute_scalogram(spectrum, band, self.config.output_width, parts)?;
        log::info!(
            "Scalogram ready: {} rows x {} samples",
            scalogram.height(),
            scalogram.width()
        );

        Ok(self.scalogram.insert(scalogram))
    }

    /// Stream band rows `rows` to `on_row` without storing them
    pub fn stream_rows<F>(&mut self, rows: Range<usize>, on_row: F) -> Result<()>
    where
        F: FnMut(usize, &[Complex64], f64),
    {
        self.prepare()?;
        let (spectrum, band) = self.prepared()?;
        compute_rows(spectrum, band, self.config.output_width, rows, on_row)
    }

    fn prepared(&self) -> Result<(&Spectrum, &FrequencyBand)> {
        match (&self.spectrum, &self.band) {
            (Some(spectrum), Some(band)) => Ok((spectrum, band)),
            _ => Err(CwtError::InvalidInput(
                "Spectrum and band are not prepared".to_string(),
            )),
        }
    }

    /// Frequency of band row `y` in Hz, once audio is loaded
    pub fn row_frequency_hz(&self, y: usize) -> Option<f64> {
        let info = self.audio_info.as_ref()?;
        let frequency = match &self.band {
            Some(band) => band.get(y)?.frequency,
            None => self.config.band().get(y)?.frequency,
        };
        Some(band_frequency_to_hz(
            frequency,
            info.sample_rate,
            info.duration_samples,
        ))
    }

    /// Clear all data and reset processor
    pub fn clear(&mut self) {
        self.audio_info = None;
        self.channel_data = None;
        self.spectrum = None;
        self.band = None;
        self.scalogram = None;
    }

    /// Check if processor has audio data loaded
    pub fn has_audio(&self) -> bool {
        self.audio_info.is_some() && self.channel_data.is_some()
    }

    pub fn has_spectrum(&self) -> bool {
        self.spectrum.is_some()
    }

    pub fn has_scalogram(&self) -> bool {
        self.scalogram.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::sine;

    fn generate_test_audio(num_channels: usize) -> (AudioInfo, Vec<Vec<f64>>) {
        let sample_rate = 8000;
        let samples = 2000;
        let channels = (0..num_channels)
            .map(|ch| sine(samples, sample_rate, 1000.0 * (ch + 1) as f64, 0.5).unwrap())
            .collect();
        (AudioInfo::new(sample_rate, num_channels, samples), channels)
    }

    fn test_config() -> CwtConfig {
        CwtConfig::default()
            .with_height(64)
            .and_then(|c| c.with_frequencies(500.0, 0.0, 0.0))
            .unwrap()
            .with_output_width(500)
    }

    #[test]
    fn test_processor_creation() {
        let processor = CwtProcessor::new();
        assert_eq!(processor.config(), &CwtConfig::default());
        assert!(!processor.has_audio());
        assert!(!processor.has_scalogram());
        assert_eq!(processor.channel(), ChannelSelection::Mix);

        let bad = CwtConfig {
            height: 0,
            ..Default::default()
        };
        assert!(CwtProcessor::with_config(bad).is_err());
    }

    #[test]
    fn test_load_audio_validation() {
        let mut processor = CwtProcessor::new();
        let (info, mut data) = generate_test_audio(2);
        data[1].pop();
        assert!(processor.load_audio(info.clone(), data).is_err());
        assert!(processor.load_audio(info, vec![vec![0.0; 2000]]).is_err());
        assert!(processor.transform(1).is_err());
    }

    #[test]
    fn test_transform_finds_tone() {
        let mut processor = CwtProcessor::with_config(test_config()).unwrap();
        let (info, data) = generate_test_audio(2);
        processor.load_audio(info, data).unwrap();
        processor.set_channel(ChannelSelection::Channel(0)).unwrap();

        let scalogram = processor.transform(4).unwrap();
        assert_eq!(scalogram.height(), 64);
        assert_eq!(scalogram.width(), 500);
        // 1000 Hz over 0.25 s is 250 cycles: row 32 of a 500 cycle linear band
        assert_eq!(scalogram.peak_row(), Some(32));

        let hz = processor.row_frequency_hz(32).unwrap();
        assert!((hz - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalidation() {
        let mut processor = CwtProcessor::with_config(test_config()).unwrap();
        let (info, data) = generate_test_audio(1);
        processor.load_audio(info, data).unwrap();
        processor.transform(1).unwrap();
        assert!(processor.has_spectrum());

        // Width only affects the rows
        let narrower = processor.config().with_output_width(250);
        processor.set_config(narrower).unwrap();
        assert!(processor.has_spectrum());
        assert!(processor.band().is_some());
        assert!(!processor.has_scalogram());

        let padded = processor.config().with_padding(100);
        processor.set_config(padded).unwrap();
        assert!(!processor.has_spectrum());

        assert!(processor
            .set_channel(ChannelSelection::Channel(3))
            .is_err());
    }

    #[test]
    fn test_fit_output_width() {
        let mut processor = CwtProcessor::new();
        assert!(processor.fit_output_width(300).is_err());

        let (info, data) = generate_test_audio(1);
        processor.load_audio(info, data).unwrap();
        assert_eq!(processor.fit_output_width(4096).unwrap(), 0);

        // 2200 padded samples, 2000 unpadded: widths step by 10
        let padded = processor.config().with_padding(100);
        processor.set_config(padded).unwrap();
        assert_eq!(processor.fit_output_width(305).unwrap(), 300);
        assert_eq!(processor.config().output_width, 300);

        // Explicit widths are kept
        assert_eq!(processor.fit_output_width(100).unwrap(), 300);

        processor.set_config(processor.config().with_height(8).unwrap()).unwrap();
        let scalogram = processor.transform(2).unwrap();
        assert_eq!(scalogram.width(), 330);
        assert_eq!(scalogram.trimmed_width(), 300);
    }

    #[test]
    fn test_stream_rows() {
        let mut processor = CwtProcessor::with_config(test_config()).unwrap();
        let (info, data) = generate_test_audio(1);
        processor.load_audio(info, data).unwrap();

        let mut seen = Vec::new();
        processor
            .stream_rows(10..14, |y, row, padding| {
                assert_eq!(row.len(), 500);
                assert_eq!(padding, 0.0);
                seen.push(y);
            })
            .unwrap();
        assert_eq!(seen, vec![10, 11, 12, 13]);
        assert!(!processor.has_scalogram());

        processor.clear();
        assert!(!processor.has_audio());
    }
}
