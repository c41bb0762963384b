//! Scalogram storage and visualization
//!
//! A scalogram is the full matrix of wavelet rows for one band, row 0 being
//! the highest frequency. Rows keep their padded edges; the accessors taking a
//! `trim` flag drop them.

use crate::error::CwtError;
use crate::wavelet::trim_padding;
use crate::Result;
use num_complex::Complex64;

/// Matrix of complex wavelet coefficients (rows x time)
#[derive(Debug, Clone, PartialEq)]
pub struct Scalogram {
    rows: Vec<Vec<Complex64>>,
    frequencies: Vec<f64>,
    padding: f64,
}

impl Scalogram {
    /// Create a scalogram from rows of equal length and their band frequencies
    pub fn new(rows: Vec<Vec<Complex64>>, frequencies: Vec<f64>, padding: f64) -> Result<Self> {
        if rows.len() != frequencies.len() {
            return Err(CwtError::InvalidInput(format!(
                "{} rows but {} frequencies",
                rows.len(),
                frequencies.len()
            )));
        }

        if let Some(first) = rows.first() {
            for (y, row) in rows.iter().enumerate() {
                if row.len() != first.len() {
                    return Err(CwtError::InvalidInput(format!(
                        "Row {} has {} samples, expected {}",
                        y,
                        row.len(),
                        first.len()
                    )));
                }
            }
        }

        Ok(Self {
            rows,
            frequencies,
            padding,
        })
    }

    /// Number of rows (band length)
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Samples per row, padding included
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    /// Samples per row without the padded edges
    pub fn trimmed_width(&self) -> usize {
        self.rows.first().map_or(0, |r| trim_padding(r, self.padding).len())
    }

    pub fn rows(&self) -> &[Vec<Complex64>] {
        &self.rows
    }

    /// Row `y`, optionally without padding
    pub fn row(&self, y: usize, trim: bool) -> Option<&[Complex64]> {
        self.rows.get(y).map(|row| {
            if trim {
                trim_padding(row, self.padding)
            } else {
                row.as_slice()
            }
        })
    }

    /// Band frequency of each row
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Padding on each side of every row, in output samples
    pub fn padding(&self) -> f64 {
        self.padding
    }

    fn map_rows<F: Fn(&Complex64) -> f64>(&self, trim: bool, f: F) -> Vec<Vec<f64>> {
        (0..self.height())
            .filter_map(|y| self.row(y, trim))
            .map(|row| row.iter().map(&f).collect())
            .collect()
    }

    /// Magnitude of every coefficient
    pub fn magnitudes(&self, trim: bool) -> Vec<Vec<f64>> {
        self.map_rows(trim, |c| c.norm())
    }

    /// Phase of every coefficient in radians
    pub fn phases(&self, trim: bool) -> Vec<Vec<f64>> {
        self.map_rows(trim, |c| c.arg())
    }

    /// Magnitudes in decibels relative to `reference`, floored at -100 dB
    pub fn to_db(&self, reference: f64, trim: bool) -> Vec<Vec<f64>> {
        let min_db = -100.0;

        self.map_rows(trim, |c| {
            let mag = c.norm();
            if mag > 0.0 {
                (20.0 * (mag / reference).log10()).max(min_db)
            } else {
                min_db
            }
        })
    }

    /// Mean squared magnitude of each trimmed row
    pub fn row_energies(&self) -> Vec<f64> {
        (0..self.height())
            .filter_map(|y| self.row(y, true))
            .map(|row| {
                if row.is_empty() {
                    0.0
                } else {
                    row.iter().map(|c| c.norm_sqr()).sum::<f64>() / row.len() as f64
                }
            })
            .collect()
    }

    /// Row with the highest energy
    pub fn peak_row(&self) -> Option<usize> {
        self.row_energies()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(y, _)| y)
    }

    /// Time of each trimmed sample, for a signal lasting `duration_seconds`
    pub fn time_axis(&self, duration_seconds: f64) -> Vec<f64> {
        let width = self.trimmed_width();
        (0..width)
            .map(|i| i as f64 * duration_seconds / width as f64)
            .collect()
    }
}

/// Render scalograms to images
#[cfg(feature = "image")]
pub mod image {
    use super::*;
    use ::image::{ImageBuffer, Rgb, RgbImage};
    use std::f64::consts::PI;
    use std::path::Path;

    /// Color map types for scalogram visualization
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum ColorMap {
        Viridis,
        Plasma,
        Inferno,
        Magma,
        Grayscale,
        Jet,
    }

    impl ColorMap {
        pub fn from_name(name: &str) -> Option<Self> {
            match name.to_lowercase().as_str() {
                "viridis" => Some(ColorMap::Viridis),
                "plasma" => Some(ColorMap::Plasma),
                "inferno" => Some(ColorMap::Inferno),
                "magma" => Some(ColorMap::Magma),
                "grayscale" | "gray" => Some(ColorMap::Grayscale),
                "jet" => Some(ColorMap::Jet),
                _ => None,
            }
        }
    }

    /// Which quantity of the complex coefficients is drawn
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum RenderMode {
        /// Magnitude through the color map
        Amplitude,
        /// Phase through the color map
        Phase,
        /// Real part, zero at mid scale
        Real,
        /// Imaginary part, zero at mid scale
        Imaginary,
        /// Hue from phase, brightness from magnitude
        Rainbow,
    }

    impl RenderMode {
        pub fn from_name(name: &str) -> Option<Self> {
            match name.to_lowercase().as_str() {
                "amplitude" | "amp" => Some(RenderMode::Amplitude),
                "phase" => Some(RenderMode::Phase),
                "real" => Some(RenderMode::Real),
                "imaginary" | "imag" => Some(RenderMode::Imaginary),
                "rainbow" => Some(RenderMode::Rainbow),
                _ => None,
            }
        }
    }

    const VIRIDIS: [[f64; 3]; 5] = [
        [68.0, 1.0, 84.0],
        [59.0, 82.0, 139.0],
        [33.0, 145.0, 140.0],
        [94.0, 201.0, 98.0],
        [253.0, 231.0, 37.0],
    ];
    const PLASMA: [[f64; 3]; 5] = [
        [13.0, 8.0, 135.0],
        [126.0, 3.0, 168.0],
        [204.0, 71.0, 120.0],
        [248.0, 149.0, 64.0],
        [240.0, 249.0, 33.0],
    ];
    const INFERNO: [[f64; 3]; 5] = [
        [0.0, 0.0, 4.0],
        [87.0, 16.0, 110.0],
        [188.0, 55.0, 84.0],
        [249.0, 142.0, 9.0],
        [252.0, 255.0, 164.0],
    ];
    const MAGMA: [[f64; 3]; 5] = [
        [0.0, 0.0, 4.0],
        [81.0, 18.0, 124.0],
        [183.0, 55.0, 121.0],
        [252.0, 137.0, 97.0],
        [252.0, 253.0, 191.0],
    ];
    const GRAYSCALE: [[f64; 3]; 2] = [[0.0, 0.0, 0.0], [255.0, 255.0, 255.0]];

    /// Linear interpolation between evenly spaced color stops
    fn gradient(v: f64, stops: &[[f64; 3]]) -> Rgb<u8> {
        let position = v * (stops.len() - 1) as f64;
        let lower = (position.floor() as usize).min(stops.len() - 2);
        let t = position - lower as f64;
        let (from, to) = (stops[lower], stops[lower + 1]);
        let mix = |c: usize| (from[c] + (to[c] - from[c]) * t).round() as u8;
        Rgb([mix(0), mix(1), mix(2)])
    }

    /// Convert a value (0.0 to 1.0) to RGB color using the specified colormap
    pub fn value_to_color(value: f64, colormap: ColorMap) -> Rgb<u8> {
        let v = value.clamp(0.0, 1.0);

        match colormap {
            ColorMap::Viridis => gradient(v, &VIRIDIS),
            ColorMap::Plasma => gradient(v, &PLASMA),
            ColorMap::Inferno => gradient(v, &INFERNO),
            ColorMap::Magma => gradient(v, &MAGMA),
            ColorMap::Grayscale => gradient(v, &GRAYSCALE),
            ColorMap::Jet => {
                let channel = |center: f64| (1.5 - (4.0 * v - center).abs()).clamp(0.0, 1.0);
                Rgb([
                    (channel(3.0) * 255.0) as u8,
                    (channel(2.0) * 255.0) as u8,
                    (channel(1.0) * 255.0) as u8,
                ])
            }
        }
    }

    /// Hue from `phase` (radians), value from `brightness` (0.0 to 1.0)
    pub fn phase_to_color(phase: f64, brightness: f64) -> Rgb<u8> {
        let hue = (phase + PI) / (2.0 * PI) * 6.0;
        let v = brightness.clamp(0.0, 1.0);
        let sector = (hue.floor() as i64).rem_euclid(6);
        let f = hue - hue.floor();

        let (r, g, b) = match sector {
            0 => (1.0, f, 0.0),
            1 => (1.0 - f, 1.0, 0.0),
            2 => (0.0, 1.0, f),
            3 => (0.0, 1.0 - f, 1.0),
            4 => (f, 0.0, 1.0),
            _ => (1.0, 0.0, 1.0 - f),
        };

        Rgb([
            (r * v * 255.0) as u8,
            (g * v * 255.0) as u8,
            (b * v * 255.0) as u8,
        ])
    }

    /// Options for scalogram image generation
    pub struct ScalogramImageOptions {
        /// Quantity to draw
        pub render_mode: RenderMode,
        /// Color map for the single-channel modes
        pub colormap: ColorMap,
        /// Use a dB scale for amplitude and rainbow brightness
        pub use_db_scale: bool,
        /// Dynamic range in dB (for dB scale)
        pub dynamic_range_db: f64,
        /// Drop the padded edges of each row
        pub trim_padding: bool,
        /// Output size in pixels; `None` draws one pixel per coefficient
        pub size: Option<(u32, u32)>,
    }

    impl Default for ScalogramImageOptions {
        fn default() -> Self {
            Self {
                render_mode: RenderMode::Amplitude,
                colormap: ColorMap::Viridis,
                use_db_scale: true,
                dynamic_range_db: 80.0,
                trim_padding: true,
                size: None,
            }
        }
    }

    fn normalized_magnitudes(
        scalogram: &Scalogram,
        options: &ScalogramImageOptions,
    ) -> Vec<Vec<f64>> {
        let values = if options.use_db_scale {
            scalogram.to_db(1.0, options.trim_padding)
        } else {
            scalogram.magnitudes(options.trim_padding)
        };

        let max_val = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        let min_val = if options.use_db_scale {
            max_val - options.dynamic_range_db
        } else {
            0.0
        };
        let range = max_val - min_val;

        values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| {
                        if range > 0.0 {
                            ((v - min_val) / range).clamp(0.0, 1.0)
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Generate a scalogram image, highest frequency at the top
    pub fn generate_scalogram_image(
        scalogram: &Scalogram,
        options: &ScalogramImageOptions,
    ) -> Result<RgbImage> {
        let data_height = scalogram.height();
        let data_width = if options.trim_padding {
            scalogram.trimmed_width()
        } else {
            scalogram.width()
        };

        if data_height == 0 || data_width == 0 {
            return Err(CwtError::InvalidInput(
                "Scalogram has no samples to draw".to_string(),
            ));
        }

        let (width, height) = options
            .size
            .unwrap_or((data_width as u32, data_height as u32));
        if width == 0 || height == 0 {
            return Err(CwtError::InvalidInput(format!(
                "Invalid image size {}x{}",
                width, height
            )));
        }

        log::info!(
            "Generating scalogram image: {}x{} pixels from {}x{} coefficients ({:?})",
            width,
            height,
            data_width,
            data_height,
            options.render_mode
        );

        let magnitudes = normalized_magnitudes(scalogram, options);
        let peak = scalogram
            .rows()
            .iter()
            .flatten()
            .map(|c| c.norm())
            .fold(0.0f64, f64::max);

        let mut img = ImageBuffer::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let col = x as usize * data_width / width as usize;
            let row_index = y as usize * data_height / height as usize;
            let row = match scalogram.row(row_index, options.trim_padding) {
                Some(row) => row,
                None => continue,
            };
            let coefficient = row[col];
            let magnitude = magnitudes[row_index][col];

            *pixel = match options.render_mode {
                RenderMode::Amplitude => value_to_color(magnitude, options.colormap),
                RenderMode::Phase => {
                    value_to_color((coefficient.arg() + PI) / (2.0 * PI), options.colormap)
                }
                RenderMode::Real | RenderMode::Imaginary => {
                    let part = if options.render_mode == RenderMode::Real {
                        coefficient.re
                    } else {
                        coefficient.im
                    };
                    let value = if peak > 0.0 { 0.5 + 0.5 * part / peak } else { 0.5 };
                    value_to_color(value, options.colormap)
                }
                RenderMode::Rainbow => phase_to_color(coefficient.arg(), magnitude),
            };
        }

        Ok(img)
    }

    /// Save a scalogram to an image file
    pub fn save_scalogram<P: AsRef<Path>>(
        scalogram: &Scalogram,
        path: P,
        options: &ScalogramImageOptions,
    ) -> Result<()> {
        let img = generate_scalogram_image(scalogram, options)?;
        img.save(path)
            .map_err(|e| CwtError::Codec(format!("Failed to save scalogram image: {}", e)))
    }

}
