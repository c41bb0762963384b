//! Test signal generators
//!
//! Frequencies are in Hz; `length` is the number of samples at `sample_rate`.

use crate::error::CwtError;
use crate::Result;
use std::f64::consts::PI;

fn check(length: usize, sample_rate: u32, frequencies: &[f64]) -> Result<()> {
    if length == 0 || sample_rate == 0 {
        return Err(CwtError::InvalidInput(
            "Signal length and sample rate must be non-zero".to_string(),
        ));
    }

    if let Some(f) = frequencies.iter().find(|f| !f.is_finite() || **f < 0.0) {
        return Err(CwtError::InvalidInput(format!(
            "Frequency must be non-negative and finite, got {}",
            f
        )));
    }

    Ok(())
}

/// Constant sinusoid `amplitude * sin(2 pi f t)`
pub fn sine(length: usize, sample_rate: u32, frequency: f64, amplitude: f64) -> Result<Vec<f64>> {
    check(length, sample_rate, &[frequency])?;

    let rate = sample_rate as f64;
    Ok((0..length)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / rate).sin())
        .collect())
}

/// Sweep from `start` to `end` Hz with linearly changing frequency
pub fn linear_chirp(
    length: usize,
    sample_rate: u32,
    start: f64,
    end: f64,
    amplitude: f64,
) -> Result<Vec<f64>> {
    check(length, sample_rate, &[start, end])?;

    let rate = sample_rate as f64;
    let duration = length as f64 / rate;
    let sweep = (end - start) / duration;

    Ok((0..length)
        .map(|i| {
            let t = i as f64 / rate;
            amplitude * (2.0 * PI * (start * t + 0.5 * sweep * t * t)).sin()
        })
        .collect())
}

/// Sweep from `start` to `end` Hz with exponentially changing frequency
///
/// Both frequencies must be positive. Equal frequencies give a sine.
pub fn exponential_chirp(
    length: usize,
    sample_rate: u32,
    start: f64,
    end: f64,
    amplitude: f64,
) -> Result<Vec<f64>> {
    check(length, sample_rate, &[start, end])?;
    if start <= 0.0 || end <= 0.0 {
        return Err(CwtError::InvalidInput(
            "Exponential chirp needs positive frequencies".to_string(),
        ));
    }

    let ratio_ln = (end / start).ln();
    if ratio_ln == 0.0 {
        return sine(length, sample_rate, start, amplitude);
    }

    let rate = sample_rate as f64;
    let duration = length as f64 / rate;

    Ok((0..length)
        .map(|i| {
            let t = i as f64 / rate;
            let phase = start * duration / ratio_ln * ((t / duration * ratio_ln).exp() - 1.0);
            amplitude * (2.0 * PI * phase).sin()
        })
        .collect())
}

/// Instantaneous frequency of an exponential chirp at sample `index`
pub fn exponential_chirp_frequency(length: usize, start: f64, end: f64, index: usize) -> f64 {
    start * (end / start).powf(index as f64 / length as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_crossings(signal: &[f64]) -> usize {
        signal
            .windows(2)
            .filter(|w| w[0] < 0.0 && w[1] >= 0.0)
            .count()
    }

    #[test]
    fn test_sine() {
        let signal = sine(8000, 8000, 100.0, 0.5).unwrap();
        assert_eq!(signal.len(), 8000);
        assert_eq!(signal[0], 0.0);
        assert!((signal[20] - 0.5).abs() < 1e-12);
        assert!((zero_crossings(&signal) as i64 - 100).abs() <= 1);
    }

    #[test]
    fn test_linear_chirp_cycles() {
        // Average frequency 150 Hz over one second
        let signal = linear_chirp(16000, 16000, 100.0, 200.0, 1.0).unwrap();
        assert!((zero_crossings(&signal) as i64 - 150).abs() <= 1);
    }

    #[test]
    fn test_exponential_chirp() {
        let signal = exponential_chirp(16000, 16000, 100.0, 400.0, 1.0).unwrap();
        // Total phase: 100 * 1 / ln 4 * 3 cycles
        let cycles = 300.0 / 4f64.ln();
        assert!((zero_crossings(&signal) as f64 - cycles).abs() <= 1.5);
        assert!((exponential_chirp_frequency(16000, 100.0, 400.0, 8000) - 200.0).abs() < 1e-9);

        let flat = exponential_chirp(100, 1000, 50.0, 50.0, 1.0).unwrap();
        assert_eq!(flat, sine(100, 1000, 50.0, 1.0).unwrap());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(sine(0, 44100, 440.0, 1.0).is_err());
        assert!(sine(10, 0, 440.0, 1.0).is_err());
        assert!(linear_chirp(10, 100, -1.0, 5.0, 1.0).is_err());
        assert!(exponential_chirp(10, 100, 0.0, 5.0, 1.0).is_err());
    }
}
