//! Forward spectrum of a padded signal
//!
//! The signal is zero-padded on both sides, scaled and transformed once.
//! Only the non-negative frequencies of the real-to-complex transform are kept;
//! the negative half of the spectrum stays zero, which makes every row computed
//! from it an analytic (complex) signal.

use crate::error::CwtError;
use crate::fft::{allocate, ForwardPlan};
use crate::Result;
use num_complex::Complex64;

/// Compensates for the one-sided spectrum produced by the real transform
pub const INPUT_TYPE_FACTOR: f64 = 2.0;

/// Complex spectrum of a padded signal, shared read-only by all row computations
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    samples: Vec<Complex64>,
    padding: usize,
}

impl Spectrum {
    /// Wrap an existing spectrum of `signal_length + 2 * padding` samples
    pub fn from_samples(samples: Vec<Complex64>, padding: usize) -> Result<Self> {
        if samples.is_empty() {
            return Err(CwtError::InvalidInput("Spectrum is empty".to_string()));
        }

        match padding.checked_mul(2) {
            Some(total) if total < samples.len() => {}
            _ => {
                return Err(CwtError::InvalidInput(format!(
                    "Padding {} leaves no signal in a spectrum of {} samples",
                    padding,
                    samples.len()
                )))
            }
        }

        Ok(Self { samples, padding })
    }

    /// Spectrum samples (`input_sample_count` long)
    pub fn samples(&self) -> &[Complex64] {
        &self.samples
    }

    /// Padding applied on each side of the signal
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Total transform length including padding
    pub fn input_sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Length of the original, unpadded signal
    pub fn input_width(&self) -> usize {
        self.samples.len() - 2 * self.padding
    }

    pub fn into_samples(self) -> Vec<Complex64> {
        self.samples
    }
}

/// Pad, scale and forward-transform `signal`
///
/// The working buffer is `signal.len() + 2 * padding` long with `padding`
/// zeros at each edge and the signal scaled by `2 * gain` in the middle.
pub fn forward_spectrum(signal: &[f64], padding: usize, gain: f64) -> Result<Spectrum> {
    if signal.is_empty() {
        return Err(CwtError::InvalidInput("Signal is empty".to_string()));
    }

    if !gain.is_finite() {
        return Err(CwtError::InvalidInput(format!("Gain must be finite, got {}", gain)));
    }

    if let Some(index) = signal.iter().position(|s| !s.is_finite()) {
        return Err(CwtError::InvalidInput(format!(
            "Signal sample {} is not finite",
            index
        )));
    }

    let input_sample_count = padding
        .checked_mul(2)
        .and_then(|p| p.checked_add(signal.len()))
        .ok_or_else(|| CwtError::InvalidInput(format!("Padding {} is too large", padding)))?;

    log::debug!(
        "Forward spectrum: {} samples, padding {}, transform length {}",
        signal.len(),
        padding,
        input_sample_count
    );

    let mut padded = allocate(input_sample_count, 0.0f64)?;
    let factor = INPUT_TYPE_FACTOR * gain;
    for (dst, &sample) in padded[padding..padding + signal.len()]
        .iter_mut()
        .zip(signal)
    {
        *dst = sample * factor;
    }

    let mut plan = ForwardPlan::new(input_sample_count)?;
    let mut samples = allocate(input_sample_count, Complex64::new(0.0, 0.0))?;
    let bins = plan.spectrum_len();
    plan.execute(&mut padded, &mut samples[..bins])?;

    Spectrum::from_samples(samples, padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_empty_signal() {
        assert!(matches!(
            forward_spectrum(&[], 4, 1.0),
            Err(CwtError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_finite_signal() {
        assert!(forward_spectrum(&[0.0, f64::NAN, 1.0], 0, 1.0).is_err());
        assert!(forward_spectrum(&[0.0, 1.0], 0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_spectrum_layout() {
        let signal = vec![1.0; 10];
        let spectrum = forward_spectrum(&signal, 3, 0.5).unwrap();

        assert_eq!(spectrum.input_sample_count(), 16);
        assert_eq!(spectrum.input_width(), 10);
        assert_eq!(spectrum.padding(), 3);

        // DC bin is the sum of the scaled samples: 10 * 2 * 0.5
        let dc = spectrum.samples()[0];
        assert!((dc.re - 10.0).abs() < 1e-9);
        assert!(dc.im.abs() < 1e-9);

        // Negative frequencies are left empty
        for value in &spectrum.samples()[9..] {
            assert_eq!(*value, Complex64::new(0.0, 0.0));
        }
    }

    #[test]
    fn test_gain_is_linear() {
        let signal: Vec<f64> = (0..50)
            .map(|i| (2.0 * PI * 3.0 * i as f64 / 50.0).sin())
            .collect();
        let a = forward_spectrum(&signal, 5, 1.0).unwrap();
        let b = forward_spectrum(&signal, 5, 3.0).unwrap();

        for (x, y) in a.samples().iter().zip(b.samples()) {
            assert!((x * 3.0 - y).norm() < 1e-9);
        }
    }

    #[test]
    fn test_from_samples_validation() {
        let samples = vec![Complex64::new(0.0, 0.0); 8];
        assert!(Spectrum::from_samples(samples.clone(), 4).is_err());
        assert!(Spectrum::from_samples(samples.clone(), 3).is_ok());
        assert!(Spectrum::from_samples(Vec::new(), 0).is_err());
        assert!(Spectrum::from_samples(samples, usize::MAX).is_err());
    }
}
