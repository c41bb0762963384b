//! Row wavelet engine
//!
//! Each row of the transform is obtained by multiplying the signal spectrum
//! with a Gaussian (Gabor) window centered on the row frequency and running a
//! backward FFT. When the requested row is shorter than the spectrum, the
//! windowed spectrum is first folded onto the output length: summing the
//! periodic copies in the frequency domain is the same as decimating the full
//! inverse transform in the time domain, at a fraction of the cost.

use crate::band::FrequencyBandEntry;
use crate::error::CwtError;
use crate::fft::{allocate, BackwardPlan};
use crate::spectrum::Spectrum;
use crate::Result;
use num_complex::Complex64;

/// Sizes shared by every row of one transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputGeometry {
    /// Spectrum length (signal plus padding on both sides)
    pub input_sample_count: usize,
    /// Unpadded signal length
    pub input_width: usize,
    /// Padding on each side of the signal
    pub padding: usize,
    /// Requested row width, in unpadded output samples
    pub output_width: usize,
    /// Backward FFT length per row, padding included
    pub output_sample_count: usize,
}

impl OutputGeometry {
    /// Compute the row geometry; `output_width == 0` selects the full input width
    ///
    /// `output_width * input_sample_count` must be a multiple of `input_width`
    /// so that the padded row length is a whole number of samples.
    pub fn new(input_sample_count: usize, padding: usize, output_width: usize) -> Result<Self> {
        let input_width = padding
            .checked_mul(2)
            .and_then(|p| input_sample_count.checked_sub(p))
            .filter(|&w| w > 0)
            .ok_or_else(|| {
                CwtError::InvalidInput(format!(
                    "Padding {} leaves no signal in {} samples",
                    padding, input_sample_count
                ))
            })?;

        let output_width = if output_width == 0 {
            input_width
        } else {
            output_width
        };

        if output_width > input_width {
            return Err(CwtError::InvalidOutputWidth {
                output_width,
                input_width,
            });
        }

        let product = output_width.checked_mul(input_sample_count).ok_or_else(|| {
            CwtError::InvalidInput(format!(
                "Output width {} overflows for {} input samples",
                output_width, input_sample_count
            ))
        })?;

        if product % input_width != 0 {
            return Err(CwtError::UnalignedOutputWidth {
                output_width,
                input_width,
                input_sample_count,
            });
        }

        Ok(Self {
            input_sample_count,
            input_width,
            padding,
            output_width,
            output_sample_count: product / input_width,
        })
    }

    /// Geometry for rows computed from `spectrum`
    pub fn for_spectrum(spectrum: &Spectrum, output_width: usize) -> Result<Self> {
        Self::new(spectrum.input_sample_count(), spectrum.padding(), output_width)
    }

    /// Ratio between padded and unpadded lengths
    pub fn padding_correction(&self) -> f64 {
        self.input_sample_count as f64 / self.input_width as f64
    }

    /// Padding on each side of an output row, in output samples
    pub fn output_padding(&self) -> f64 {
        self.padding as f64 * self.output_width as f64 / self.input_width as f64
    }

    /// Whether rows are folded down before the inverse transform
    pub fn is_folded(&self) -> bool {
        self.output_sample_count < self.input_sample_count
    }

    /// Largest valid output width not exceeding `requested`
    pub fn aligned_output_width(
        input_sample_count: usize,
        padding: usize,
        requested: usize,
    ) -> Option<usize> {
        let input_width = input_sample_count.checked_sub(padding.checked_mul(2)?)?;
        if input_width == 0 {
            return None;
        }

        let step = input_width / gcd(input_sample_count, input_width);
        let width = (requested.min(input_width) / step) * step;
        (width > 0).then_some(width)
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Frequency-domain Gaussian window for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaborWindow {
    frequency: f64,
    deviation: f64,
    half: f64,
    scale: f64,
}

impl GaborWindow {
    pub fn new(entry: &FrequencyBandEntry, geometry: &OutputGeometry) -> Self {
        let padding_correction = geometry.padding_correction();
        Self {
            frequency: entry.frequency * padding_correction,
            deviation: 1.0
                / (entry.derivative * geometry.output_sample_count as f64 * padding_correction),
            half: (geometry.input_sample_count / 2) as f64,
            scale: 1.0 / geometry.input_sample_count as f64,
        }
    }

    /// Window center in bins of the padded spectrum
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Circular distance of spectrum bin `index` from the window center
    ///
    /// Reflects around both 0 and half the spectrum length, so windows near the
    /// edges wrap the way the periodic spectrum does.
    #[inline]
    pub fn distance(&self, index: usize) -> f64 {
        self.half - ((index as f64 - self.frequency).abs() - self.half).abs()
    }

    /// Window weight for spectrum bin `index`, including the `1/N` inverse scaling
    #[inline]
    pub fn weight(&self, index: usize) -> f64 {
        let f = self.distance(index);
        (-f * f * self.deviation).exp() * self.scale
    }
}

/// Window `spectrum` into `buffer`, folding it down to `buffer.len()` samples
///
/// `buffer[j]` receives every windowed spectrum sample whose index is congruent
/// to `j` modulo the buffer length, so each sample contributes exactly once.
pub fn window_and_fold(
    spectrum: &[Complex64],
    window: &GaborWindow,
    buffer: &mut [Complex64],
) -> Result<()> {
    let output_sample_count = buffer.len();
    if output_sample_count == 0 || output_sample_count > spectrum.len() {
        return Err(CwtError::InvalidInput(format!(
            "Row buffer of {} samples does not fit a spectrum of {} samples",
            output_sample_count,
            spectrum.len()
        )));
    }

    for (i, (dst, &sample)) in buffer.iter_mut().zip(spectrum).enumerate() {
        *dst = sample * window.weight(i);
    }

    if output_sample_count < spectrum.len() {
        // Full chunks first, then the remainder onto the head of the buffer
        for (chunk_index, chunk) in spectrum[output_sample_count..]
            .chunks(output_sample_count)
            .enumerate()
        {
            let offset = (chunk_index + 1) * output_sample_count;
            for (j, (dst, &sample)) in buffer.iter_mut().zip(chunk).enumerate() {
                *dst += sample * window.weight(offset + j);
            }
        }
    }

    Ok(())
}

/// Plan and buffers for computing rows of a fixed length
///
/// Owned by one row range at a time; dropping it releases the plan and both
/// buffers.
pub struct RowWorkspace {
    plan: BackwardPlan,
    input: Vec<Complex64>,
    output: Vec<Complex64>,
}

impl RowWorkspace {
    /// Allocate a workspace for rows of `output_sample_count` samples
    pub fn new(output_sample_count: usize) -> Result<Self> {
        let plan = BackwardPlan::new(output_sample_count)?;
        let input = allocate(output_sample_count, Complex64::new(0.0, 0.0))?;
        let output = allocate(output_sample_count, Complex64::new(0.0, 0.0))?;

        Ok(Self {
            plan,
            input,
            output,
        })
    }

    /// Allocate a workspace sized for `geometry`
    pub fn for_geometry(geometry: &OutputGeometry) -> Result<Self> {
        Self::new(geometry.output_sample_count)
    }

    pub fn len(&self) -> usize {
        self.output.len()
    }

    /// Compute one row; the returned slice is overwritten by the next call
    pub fn compute_row(
        &mut self,
        spectrum: &Spectrum,
        entry: &FrequencyBandEntry,
        geometry: &OutputGeometry,
    ) -> Result<&[Complex64]> {
        if spectrum.input_sample_count() != geometry.input_sample_count
            || spectrum.padding() != geometry.padding
        {
            return Err(CwtError::InvalidInput(format!(
                "Spectrum ({} samples, padding {}) does not match geometry ({} samples, padding {})",
                spectrum.input_sample_count(),
                spectrum.padding(),
                geometry.input_sample_count,
                geometry.padding
            )));
        }

        if self.len() != geometry.output_sample_count {
            return Err(CwtError::InvalidInput(format!(
                "Workspace holds {} samples, geometry needs {}",
                self.len(),
                geometry.output_sample_count
            )));
        }

        let window = GaborWindow::new(entry, geometry);
        window_and_fold(spectrum.samples(), &window, &mut self.input)?;
        self.plan.execute(&mut self.input, &mut self.output)?;

        Ok(&self.output)
    }
}

/// One row of wavelet coefficients with the padding it carries on each side
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub coefficients: Vec<Complex64>,
    pub padding: f64,
}

impl Row {
    /// Coefficients without the padded edges
    pub fn trimmed(&self) -> &[Complex64] {
        trim_padding(&self.coefficients, self.padding)
    }
}

/// Drop `padding` samples (rounded) from both ends of a row
pub fn trim_padding(row: &[Complex64], padding: f64) -> &[Complex64] {
    let pad = padding.round().max(0.0) as usize;
    if pad * 2 >= row.len() {
        return &[];
    }
    &row[pad..row.len() - pad]
}

/// Compute a single row with a freshly allocated workspace
pub fn compute_row(
    spectrum: &Spectrum,
    entry: &FrequencyBandEntry,
    geometry: &OutputGeometry,
) -> Result<Row> {
    let mut workspace = RowWorkspace::for_geometry(geometry)?;
    let coefficients = workspace.compute_row(spectrum, entry, geometry)?.to_vec();

    Ok(Row {
        coefficients,
        padding: geometry.output_padding(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    fn test_spectrum(len: usize, padding: usize) -> Spectrum {
        let samples = (0..len)
            .map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()))
            .collect();
        Spectrum::from_samples(samples, padding).unwrap()
    }

    #[test]
    fn test_geometry_defaults() {
        let geometry = OutputGeometry::new(1024, 12, 0).unwrap();
        assert_eq!(geometry.input_width, 1000);
        assert_eq!(geometry.output_width, 1000);
        assert_eq!(geometry.output_sample_count, 1024);
        assert!(!geometry.is_folded());
        assert!((geometry.output_padding() - 12.0).abs() < 1e-12);
        assert!((geometry.padding_correction() - 1.024).abs() < 1e-12);
    }

    #[test]
    fn test_geometry_downsampled() {
        let geometry = OutputGeometry::new(1024, 12, 500).unwrap();
        assert_eq!(geometry.output_sample_count, 512);
        assert!(geometry.is_folded());
        assert!((geometry.output_padding() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_geometry_rejects_wide_output() {
        assert_eq!(
            OutputGeometry::new(1024, 12, 1001),
            Err(CwtError::InvalidOutputWidth {
                output_width: 1001,
                input_width: 1000
            })
        );
    }

    #[test]
    fn test_geometry_rejects_unaligned_output() {
        assert!(matches!(
            OutputGeometry::new(1024, 12, 100),
            Err(CwtError::UnalignedOutputWidth { .. })
        ));
        assert!(matches!(
            OutputGeometry::new(10, 5, 0),
            Err(CwtError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_aligned_output_width() {
        // 1000 / gcd(1024, 1000) = 125
        assert_eq!(OutputGeometry::aligned_output_width(1024, 12, 300), Some(250));
        assert_eq!(OutputGeometry::aligned_output_width(1024, 12, 5000), Some(1000));
        assert_eq!(OutputGeometry::aligned_output_width(1024, 12, 100), None);
        assert_eq!(OutputGeometry::aligned_output_width(640, 0, 123), Some(123));

        let width = OutputGeometry::aligned_output_width(1024, 12, 300).unwrap();
        assert!(OutputGeometry::new(1024, 12, width).is_ok());
    }

    #[test]
    fn test_window_shape() {
        let geometry = OutputGeometry::new(64, 0, 0).unwrap();
        let entry = FrequencyBandEntry {
            frequency: 10.0,
            derivative: 0.05,
        };
        let window = GaborWindow::new(&entry, &geometry);

        assert!((window.weight(10) - 1.0 / 64.0).abs() < 1e-15);
        assert!((window.weight(8) - window.weight(12)).abs() < 1e-15);
        assert!(window.weight(11) > window.weight(13));
    }

    #[test]
    fn test_window_wraps_around_zero() {
        let geometry = OutputGeometry::new(64, 0, 0).unwrap();
        let entry = FrequencyBandEntry {
            frequency: 0.0,
            derivative: 0.1,
        };
        let window = GaborWindow::new(&entry, &geometry);

        assert!((window.distance(1) - 1.0).abs() < 1e-12);
        assert!((window.distance(63) - 1.0).abs() < 1e-12);
        assert!((window.weight(3) - window.weight(61)).abs() < 1e-15);
        assert!((window.distance(32) - 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_unfolded_row_matches_full_inverse() {
        let spectrum = test_spectrum(128, 0);
        let geometry = OutputGeometry::for_spectrum(&spectrum, 0).unwrap();
        let entry = FrequencyBandEntry {
            frequency: 30.0,
            derivative: 0.02,
        };

        let row = compute_row(&spectrum, &entry, &geometry).unwrap();
        assert_eq!(row.coefficients.len(), 128);
        assert_eq!(row.padding, 0.0);

        let window = GaborWindow::new(&entry, &geometry);
        let mut expected: Vec<Complex64> = spectrum
            .samples()
            .iter()
            .enumerate()
            .map(|(i, &s)| s * window.weight(i))
            .collect();
        FftPlanner::<f64>::new()
            .plan_fft_inverse(128)
            .process(&mut expected);

        for (a, b) in row.coefficients.iter().zip(&expected) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_fold_sums_every_segment_once() {
        // 1000 samples folded onto 300: three full chunks and a remainder of 100
        let spectrum = test_spectrum(1000, 0);
        let geometry = OutputGeometry::for_spectrum(&spectrum, 300).unwrap();
        assert_eq!(geometry.output_sample_count, 300);

        let entry = FrequencyBandEntry {
            frequency: 420.0,
            derivative: 0.0005,
        };
        let window = GaborWindow::new(&entry, &geometry);
        let windowed: Vec<Complex64> = spectrum
            .samples()
            .iter()
            .enumerate()
            .map(|(i, &s)| s * window.weight(i))
            .collect();

        let mut folded = vec![Complex64::new(0.0, 0.0); 300];
        window_and_fold(spectrum.samples(), &window, &mut folded).unwrap();

        for (j, value) in folded.iter().enumerate() {
            let expected: Complex64 = windowed.iter().skip(j).step_by(300).sum();
            assert!((value - expected).norm() < 1e-12, "position {}", j);
        }

        let total_folded: Complex64 = folded.iter().sum();
        let total_windowed: Complex64 = windowed.iter().sum();
        assert!((total_folded - total_windowed).norm() < 1e-12);
    }

    #[test]
    fn test_fold_preserves_energy_of_narrow_window() {
        let spectrum = test_spectrum(1024, 0);
        let geometry = OutputGeometry::for_spectrum(&spectrum, 256).unwrap();
        let entry = FrequencyBandEntry {
            frequency: 300.0,
            derivative: 0.008,
        };
        let window = GaborWindow::new(&entry, &geometry);

        let windowed_energy: f64 = spectrum
            .samples()
            .iter()
            .enumerate()
            .map(|(i, &s)| (s * window.weight(i)).norm_sqr())
            .sum();

        let mut folded = vec![Complex64::new(0.0, 0.0); 256];
        window_and_fold(spectrum.samples(), &window, &mut folded).unwrap();
        let folded_energy: f64 = folded.iter().map(|c| c.norm_sqr()).sum();

        assert!(windowed_energy > 0.0);
        assert!(
            ((folded_energy - windowed_energy) / windowed_energy).abs() < 1e-9,
            "folded {} windowed {}",
            folded_energy,
            windowed_energy
        );

        // Parseval: the unnormalized inverse scales energy by the row length
        let row = compute_row(&spectrum, &entry, &geometry).unwrap();
        let row_energy: f64 = row.coefficients.iter().map(|c| c.norm_sqr()).sum();
        assert!(((row_energy / 256.0 - folded_energy) / folded_energy).abs() < 1e-9);
    }

    #[test]
    fn test_workspace_rejects_mismatch() {
        let spectrum = test_spectrum(64, 0);
        let geometry = OutputGeometry::for_spectrum(&spectrum, 32).unwrap();
        let entry = FrequencyBandEntry {
            frequency: 5.0,
            derivative: 0.1,
        };

        let mut workspace = RowWorkspace::new(16).unwrap();
        assert!(workspace.compute_row(&spectrum, &entry, &geometry).is_err());

        let other = test_spectrum(128, 0);
        let mut workspace = RowWorkspace::for_geometry(&geometry).unwrap();
        assert!(workspace.compute_row(&other, &entry, &geometry).is_err());
        assert_eq!(workspace.compute_row(&spectrum, &entry, &geometry).unwrap().len(), 32);
    }

    #[test]
    fn test_trim_padding() {
        let row = Row {
            coefficients: vec![Complex64::new(1.0, 0.0); 10],
            padding: 2.4,
        };
        assert_eq!(row.trimmed().len(), 6);
        assert!(trim_padding(&row.coefficients, 5.0).is_empty());
    }
}
