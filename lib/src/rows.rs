//! Row range computation
//!
//! [`compute_rows`] drives the row engine over a contiguous range of band rows
//! with a single plan and buffer pair. Ranges are independent of each other,
//! so [`compute_scalogram`] splits the band into partitions and runs them on
//! the rayon thread pool, each with its own workspace.

use crate::band::FrequencyBand;
use crate::error::CwtError;
use crate::fft::allocate;
use crate::scalogram::Scalogram;
use crate::spectrum::Spectrum;
use crate::wavelet::{OutputGeometry, RowWorkspace};
use crate::Result;
use num_complex::Complex64;
use rayon::prelude::*;
use std::ops::Range;

/// Compute band rows `rows` and hand each one to `on_row(y, row, output_padding)`
///
/// * `output_width` - row width in unpadded samples; `0` keeps the input width
///
/// The geometry is validated before anything is allocated. The row slice is
/// only valid for the duration of the callback. If a row fails after others
/// were delivered, the error is [`CwtError::RowFailed`] carrying its index.
pub fn compute_rows<F>(
    spectrum: &Spectrum,
    band: &FrequencyBand,
    output_width: usize,
    rows: Range<usize>,
    mut on_row: F,
) -> Result<()>
where
    F: FnMut(usize, &[Complex64], f64),
{
    let geometry = OutputGeometry::for_spectrum(spectrum, output_width)?;

    if rows.start > rows.end || rows.end > band.len() {
        return Err(CwtError::InvalidInput(format!(
            "Row range {}..{} is outside the band of {} rows",
            rows.start,
            rows.end,
            band.len()
        )));
    }

    if rows.is_empty() {
        return Ok(());
    }

    let mut workspace = RowWorkspace::for_geometry(&geometry)?;
    let output_padding = geometry.output_padding();

    log::debug!(
        "Computing rows {}..{}: {} -> {} samples per row{}",
        rows.start,
        rows.end,
        geometry.input_sample_count,
        geometry.output_sample_count,
        if geometry.is_folded() { " (folded)" } else { "" }
    );

    for y in rows {
        let row = workspace
            .compute_row(spectrum, &band[y], &geometry)
            .map_err(|source| CwtError::RowFailed {
                row: y,
                source: Box::new(source),
            })?;
        on_row(y, row, output_padding);
    }

    Ok(())
}

/// Split `total` rows into at most `parts` contiguous, nearly equal ranges
pub fn partition_rows(total: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, total.max(1));
    let base = total / parts;
    let extra = total % parts;

    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for part in 0..parts {
        let len = base + usize::from(part < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Compute every row of `band`, spread over `parts` parallel row ranges
pub fn compute_scalogram(
    spectrum: &Spectrum,
    band: &FrequencyBand,
    output_width: usize,
    parts: usize,
) -> Result<Scalogram> {
    let geometry = OutputGeometry::for_spectrum(spectrum, output_width)?;
    let partitions = partition_rows(band.len(), parts);

    log::info!(
        "Computing scalogram: {} rows x {} samples in {} partitions",
        band.len(),
        geometry.output_sample_count,
        partitions.len()
    );

    let mut rows = allocate_rows(band.len(), geometry.output_sample_count)?;

    let mut slices = Vec::with_capacity(partitions.len());
    let mut rest = rows.as_mut_slice();
    for range in &partitions {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        slices.push(head);
        rest = tail;
    }

    slices
        .into_par_iter()
        .zip(partitions.par_iter())
        .try_for_each(|(slots, range)| {
            compute_rows(spectrum, band, geometry.output_width, range.clone(), |y, row, _| {
                slots[y - range.start].copy_from_slice(row)
            })?;
            log::debug!("Partition {}..{} done", range.start, range.end);
            Ok::<(), CwtError>(())
        })?;

    Scalogram::new(rows, band.frequencies(), geometry.output_padding())
}

/// Allocate a `height` x `width` row matrix, reporting failure instead of aborting
pub fn allocate_rows(height: usize, width: usize) -> Result<Vec<Vec<Complex64>>> {
    let samples = height
        .checked_mul(width)
        .filter(|n| n.checked_mul(std::mem::size_of::<Complex64>()).is_some())
        .ok_or_else(|| CwtError::AllocationFailure {
            requested: usize::MAX,
            reason: format!("{} x {} samples overflow the address space", height, width),
        })?;
    log::debug!("Allocating {} x {} row matrix ({} samples)", height, width, samples);

    let mut rows = Vec::new();
    rows.try_reserve_exact(height)
        .map_err(|e| CwtError::allocation(height, e))?;
    for _ in 0..height {
        rows.push(allocate(width, Complex64::new(0.0, 0.0))?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::frequency_band;
    use crate::spectrum::forward_spectrum;
    use std::f64::consts::PI;

    fn tone(len: usize, cycles: f64) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * cycles * i as f64 / len as f64).sin())
            .collect()
    }

    fn center_magnitudes(
        spectrum: &Spectrum,
        band: &FrequencyBand,
        output_width: usize,
    ) -> Vec<f64> {
        let mut magnitudes = vec![0.0; band.len()];
        compute_rows(spectrum, band, output_width, 0..band.len(), |y, row, _| {
            magnitudes[y] = row[row.len() / 2].norm();
        })
        .unwrap();
        magnitudes
    }

    fn argmax(values: &[f64]) -> usize {
        values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_tone_peaks_on_nearest_linear_row() {
        let spectrum = forward_spectrum(&tone(1000, 50.0), 12, 1.0).unwrap();
        let band = frequency_band(64, 100.0, 0.0, 0.0, 0.5);
        let expected = band.nearest_row(50.0).unwrap();
        assert_eq!(expected, 32);

        for output_width in [0, 500, 250] {
            let magnitudes = center_magnitudes(&spectrum, &band, output_width);
            assert_eq!(argmax(&magnitudes), expected, "output width {}", output_width);
            // Analytic row of a unit tone has unit amplitude
            assert!((magnitudes[expected] - 1.0).abs() < 0.05);
        }
    }

    #[test]
    fn test_tone_peaks_on_nearest_exponential_row() {
        let band = frequency_band(32, 7.0, 0.0, 2.0, 0.25);
        let f0 = band[16].frequency;
        assert!((f0 - 2f64.powf(3.5)).abs() < 1e-9);
        let spectrum = forward_spectrum(&tone(1000, f0), 12, 1.0).unwrap();

        let magnitudes = center_magnitudes(&spectrum, &band, 0);
        assert_eq!(band.nearest_row(f0), Some(16));
        assert_eq!(argmax(&magnitudes), 16);
    }

    #[test]
    fn test_rows_in_order() {
        let spectrum = forward_spectrum(&tone(200, 10.0), 0, 1.0).unwrap();
        let band = frequency_band(16, 0.0, 0.0, 0.0, 1.0);

        let mut seen = Vec::new();
        compute_rows(&spectrum, &band, 100, 3..11, |y, row, padding| {
            assert_eq!(row.len(), 100);
            assert_eq!(padding, 0.0);
            seen.push(y);
        })
        .unwrap();
        assert_eq!(seen, (3..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_output_padding_reported() {
        let spectrum = forward_spectrum(&tone(1000, 10.0), 12, 1.0).unwrap();
        let band = frequency_band(4, 0.0, 0.0, 0.0, 1.0);

        compute_rows(&spectrum, &band, 500, 0..4, |_, row, padding| {
            assert_eq!(row.len(), 512);
            assert!((padding - 6.0).abs() < 1e-12);
        })
        .unwrap();
    }

    #[test]
    fn test_wide_output_rejected() {
        let spectrum = forward_spectrum(&tone(100, 5.0), 10, 1.0).unwrap();
        let band = frequency_band(8, 0.0, 0.0, 0.0, 1.0);

        let mut calls = 0;
        let result = compute_rows(&spectrum, &band, 101, 0..8, |_, _, _| calls += 1);
        assert_eq!(
            result,
            Err(CwtError::InvalidOutputWidth {
                output_width: 101,
                input_width: 100
            })
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_bad_ranges() {
        let spectrum = forward_spectrum(&tone(100, 5.0), 0, 1.0).unwrap();
        let band = frequency_band(8, 0.0, 0.0, 0.0, 1.0);

        let mut calls = 0;
        assert!(matches!(
            compute_rows(&spectrum, &band, 0, 4..9, |_, _, _| calls += 1),
            Err(CwtError::InvalidInput(_))
        ));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 5..2;
        assert!(compute_rows(&spectrum, &band, 0, reversed, |_, _, _| calls += 1).is_err());
        assert!(compute_rows(&spectrum, &band, 0, 4..4, |_, _, _| calls += 1).is_ok());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_partition_rows() {
        assert_eq!(partition_rows(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition_rows(2, 8), vec![0..1, 1..2]);
        assert_eq!(partition_rows(5, 0), vec![0..5]);
        assert_eq!(partition_rows(0, 4), vec![0..0]);
    }

    #[test]
    fn test_partitioning_is_deterministic() {
        let signal: Vec<f64> = (0..600)
            .map(|i| (i as f64 * 0.05).sin() + 0.3 * (i as f64 * 0.71).cos())
            .collect();
        let spectrum = forward_spectrum(&signal, 20, 1.0).unwrap();
        let band = frequency_band(40, 0.0, 0.0, 0.0, 1.0);

        let mut whole = Vec::new();
        compute_rows(&spectrum, &band, 300, 0..40, |_, row, _| whole.push(row.to_vec())).unwrap();

        let mut pieces = Vec::new();
        for range in [0..7, 7..23, 23..40] {
            compute_rows(&spectrum, &band, 300, range, |_, row, _| pieces.push(row.to_vec()))
                .unwrap();
        }
        assert_eq!(whole, pieces);

        let serial = compute_scalogram(&spectrum, &band, 300, 1).unwrap();
        let parallel = compute_scalogram(&spectrum, &band, 300, 6).unwrap();
        assert_eq!(serial, parallel);
        assert_eq!(serial.rows(), whole.as_slice());
    }

    #[test]
    fn test_row_matrix_shape() {
        let rows = allocate_rows(3, 5).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 5));
        assert!(allocate_rows(0, 5).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_row_matrix_is_an_error() {
        // Element count overflows
        assert!(matches!(
            allocate_rows(usize::MAX / 2, 4),
            Err(CwtError::AllocationFailure { .. })
        ));
        // Byte count overflows
        assert!(matches!(
            allocate_rows(1 << 20, 1 << 40),
            Err(CwtError::AllocationFailure { .. })
        ));
        // Single row larger than any allocation
        assert!(matches!(
            allocate_rows(1, usize::MAX / 32),
            Err(CwtError::AllocationFailure { .. })
        ));
    }
}
