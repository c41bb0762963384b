//! Frequency band generation
//!
//! A band holds one `(frequency, derivative)` entry per output row. Frequencies
//! are expressed in cycles per unpadded signal length (i.e. FFT bins of the
//! unpadded signal) and descend with the row index: row 0 is the highest
//! frequency. The derivative is the local frequency step already scaled by the
//! deviation knob, and sets the width of the Gabor window for that row.

use std::f64::consts::PI;
use std::ops::Index;

/// Analysis frequency and window spread for a single row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBandEntry {
    pub frequency: f64,
    pub derivative: f64,
}

/// Immutable table of band entries, one per output row
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyBand {
    entries: Vec<FrequencyBandEntry>,
}

/// Converts the user-facing deviation into the Gaussian spread parameter
pub fn deviation_scale() -> f64 {
    (1.0 / (4.0 * PI)).sqrt()
}

/// Generate a frequency band
///
/// * `band_length` - number of rows
/// * `frequency_range` - span of frequencies covered; `0.0` means `band_length / 2`
/// * `frequency_offset` - lowest frequency (or exponent, for exponential bands)
/// * `frequency_basis` - `> 0.0` produces an exponential band `basis ^ linear_frequency`
/// * `deviation` - time/frequency tradeoff; near zero favours frequency
///   resolution, large values favour time resolution, 1.0 is balanced
pub fn frequency_band(
    band_length: usize,
    frequency_range: f64,
    frequency_offset: f64,
    frequency_basis: f64,
    deviation: f64,
) -> FrequencyBand {
    let deviation = deviation * deviation_scale();
    let frequency_range = if frequency_range == 0.0 {
        band_length as f64 / 2.0
    } else {
        frequency_range
    };

    let length = band_length as f64;
    let entries = (0..band_length)
        .map(|y| {
            let mut frequency = frequency_range * (1.0 - y as f64 / length) + frequency_offset;
            let mut derivative = frequency_range / length;

            if frequency_basis > 0.0 {
                frequency = frequency_basis.powf(frequency);
                derivative *= frequency_basis.ln() * frequency;
            }

            FrequencyBandEntry {
                frequency,
                derivative: derivative * deviation,
            }
        })
        .collect();

    FrequencyBand { entries }
}

impl FrequencyBand {
    /// Build a band from precomputed entries
    pub fn from_entries(entries: Vec<FrequencyBandEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&FrequencyBandEntry> {
        self.entries.get(row)
    }

    pub fn entries(&self) -> &[FrequencyBandEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrequencyBandEntry> {
        self.entries.iter()
    }

    /// Frequencies of all rows, in row order
    pub fn frequencies(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.frequency).collect()
    }

    /// Row whose frequency is closest to `frequency`
    pub fn nearest_row(&self, frequency: f64) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.frequency - frequency).abs();
                let db = (b.frequency - frequency).abs();
                da.total_cmp(&db)
            })
            .map(|(row, _)| row)
    }

    /// Flatten to `[frequency, derivative, frequency, derivative, ...]`
    pub fn to_interleaved(&self) -> Vec<f64> {
        self.entries
            .iter()
            .flat_map(|e| [e.frequency, e.derivative])
            .collect()
    }

    /// Rebuild from the interleaved layout produced by [`to_interleaved`](Self::to_interleaved)
    pub fn from_interleaved(data: &[f64]) -> crate::Result<Self> {
        if data.len() % 2 != 0 {
            return Err(crate::CwtError::InvalidInput(format!(
                "Interleaved band needs an even number of values, got {}",
                data.len()
            )));
        }

        Ok(Self {
            entries: data
                .chunks_exact(2)
                .map(|pair| FrequencyBandEntry {
                    frequency: pair[0],
                    derivative: pair[1],
                })
                .collect(),
        })
    }
}

impl Index<usize> for FrequencyBand {
    type Output = FrequencyBandEntry;

    fn index(&self, row: usize) -> &Self::Output {
        &self.entries[row]
    }
}

impl<'a> IntoIterator for &'a FrequencyBand {
    type Item = &'a FrequencyBandEntry;
    type IntoIter = std::slice::Iter<'a, FrequencyBandEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
