//! Utility functions for frequency conversion and formatting
//!
//! Band frequencies are in cycles per unpadded signal; the helpers here
//! translate them to Hz and produce the text used by client applications.

#[cfg(not(target_arch = "wasm32"))]
use crate::audio_io::read_audio_file;
#[cfg(not(target_arch = "wasm32"))]
use crate::config::DEFAULT_MAX_OUTPUT_WIDTH;
use crate::processor::CwtProcessor;
#[cfg(not(target_arch = "wasm32"))]
use crate::Result;

/// Convert a band frequency to Hz for a signal of `signal_length` samples
pub fn band_frequency_to_hz(frequency: f64, sample_rate: u32, signal_length: usize) -> f64 {
    if signal_length == 0 {
        return 0.0;
    }
    frequency * sample_rate as f64 / signal_length as f64
}

/// Convert Hz to a band frequency for a signal of `signal_length` samples
pub fn hz_to_band_frequency(freq_hz: f64, sample_rate: u32, signal_length: usize) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    freq_hz * signal_length as f64 / sample_rate as f64
}

/// Load audio from file into a CwtProcessor and compute its scalogram
///
/// An unset output width is capped at [`DEFAULT_MAX_OUTPUT_WIDTH`].
#[cfg(not(target_arch = "wasm32"))]
pub fn load_and_transform<P: AsRef<std::path::Path>>(
    processor: &mut CwtProcessor,
    path: P,
    parts: usize,
) -> Result<()> {
    let (audio_info, channel_data) = read_audio_file(path.as_ref())?;
    log::info!(
        "Loaded audio: {} channels, {} Hz, {:.2}s",
        audio_info.channels,
        audio_info.sample_rate,
        audio_info.duration_seconds
    );

    processor.load_audio(audio_info, channel_data)?;
    processor.fit_output_width(DEFAULT_MAX_OUTPUT_WIDTH)?;
    let scalogram = processor.transform(parts)?;

    log::info!(
        "Wavelet transform complete: {} rows of {} samples",
        scalogram.height(),
        scalogram.width()
    );

    Ok(())
}

/// Format a frequency value for display
pub fn format_frequency(freq_hz: f64) -> String {
    if freq_hz >= 1000.0 {
        format!("{:.2} kHz", freq_hz / 1000.0)
    } else {
        format!("{:.1} Hz", freq_hz)
    }
}

/// Format a time value for display
pub fn format_time(time_sec: f64) -> String {
    if time_sec >= 60.0 {
        let minutes = (time_sec / 60.0).floor();
        let seconds = time_sec % 60.0;
        format!("{:.0}m {:.1}s", minutes, seconds)
    } else {
        format!("{:.2}s", time_sec)
    }
}

/// Format duration in samples to time string
pub fn format_duration(samples: usize, sample_rate: u32) -> String {
    format_time(samples as f64 / sample_rate as f64)
}

/// Get a summary of the processor state
pub fn analysis_summary(processor: &CwtProcessor) -> String {
    let mut summary = String::new();

    if let Some(info) = processor.audio_info() {
        summary.push_str(&format!(
            "Audio: {} channels, {} Hz, {}\n",
            info.channels,
            info.sample_rate,
            format_duration(info.duration_samples, info.sample_rate)
        ));
        summary.push_str(&format!("  Transformed signal: {:?}\n", processor.channel()));
    }

    let config = processor.config();
    summary.push_str("Wavelet Config:\n");
    summary.push_str(&format!("  Rows: {}\n", config.height));
    if config.is_exponential() {
        summary.push_str(&format!(
            "  Band: exponential, base {} from exponent {} over {}\n",
            config.frequency_basis,
            config.frequency_offset,
            config.effective_range()
        ));
    } else {
        summary.push_str(&format!(
            "  Band: linear, {} to {} cycles\n",
            config.frequency_offset,
            config.frequency_offset + config.effective_range()
        ));
    }
    summary.push_str(&format!("  Deviation: {}\n", config.deviation));
    summary.push_str(&format!("  Padding: {} samples\n", config.padding));
    summary.push_str(&format!("  Gain: {}\n", config.gain));
    if config.output_width == 0 {
        summary.push_str("  Output width: signal length\n");
    } else {
        summary.push_str(&format!("  Output width: {}\n", config.output_width));
    }

    if let (Some(first), Some(last)) = (
        processor.row_frequency_hz(0),
        processor.row_frequency_hz(config.height.saturating_sub(1)),
    ) {
        summary.push_str(&format!(
            "  Frequencies: {} down to {}\n",
            format_frequency(first),
            format_frequency(last)
        ));
    }

    if let Some(scalogram) = processor.scalogram() {
        summary.push_str("Scalogram:\n");
        summary.push_str(&format!(
            "  {} rows x {} samples ({} after trimming padding)\n",
            scalogram.height(),
            scalogram.width(),
            scalogram.trimmed_width()
        ));
        if let Some(peak) = scalogram.peak_row() {
            let label = processor
                .row_frequency_hz(peak)
                .map(format_frequency)
                .unwrap_or_default();
            summary.push_str(&format!("  Strongest row: {} {}\n", peak, label));
        }
    }

    summary
}
