use ccwt_lib::{
    audio_io::{read_audio_bytes, AudioInfo, ChannelSelection},
    band::FrequencyBand,
    config::{presets, DEFAULT_MAX_OUTPUT_WIDTH},
    processor::CwtProcessor,
    rows::compute_rows,
    spectrum::{forward_spectrum, Spectrum},
    utils, Complex64, CwtConfig, CwtError,
};
use js_sys::{Float32Array, Function};
use serde::Serialize;
use wasm_bindgen::prelude::*;

type JsResult<T> = std::result::Result<T, JsValue>;

// Set up panic hook for better error messages
fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_error(err: CwtError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(start)]
pub fn start() {
    init_panic_hook();
    ccwt_lib::init();
}

/// Flatten complex samples to `[re, im, re, im, ...]`
fn interleave(samples: &[Complex64]) -> Vec<f32> {
    samples
        .iter()
        .flat_map(|c| [c.re as f32, c.im as f32])
        .collect()
}

/// Rebuild complex samples from `[re, im, re, im, ...]`
fn deinterleave(data: &[f32]) -> Result<Vec<Complex64>, CwtError> {
    if data.len() % 2 != 0 {
        return Err(CwtError::InvalidInput(format!(
            "Interleaved complex data needs an even number of values, got {}",
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(2)
        .map(|pair| Complex64::new(pair[0] as f64, pair[1] as f64))
        .collect())
}

fn to_float32_array(values: &[f32]) -> Float32Array {
    let array = Float32Array::new_with_length(values.len() as u32);
    array.copy_from(values);
    array
}

/// Forward transform of a padded signal, returned as interleaved complex values
#[wasm_bindgen(js_name = fft1d)]
pub fn fft1d(input: &Float32Array, padding: usize, input_gain: f64) -> JsResult<Float32Array> {
    let signal: Vec<f64> = input.to_vec().into_iter().map(f64::from).collect();
    let spectrum = forward_spectrum(&signal, padding, input_gain).map_err(js_error)?;
    Ok(to_float32_array(&interleave(spectrum.samples())))
}

/// Frequency band as `[frequency, derivative, ...]`
#[wasm_bindgen(js_name = frequencyBand)]
pub fn frequency_band(
    band_length: usize,
    frequency_range: f64,
    frequency_offset: f64,
    frequency_basis: f64,
    deviation: f64,
) -> Float32Array {
    let band = ccwt_lib::frequency_band(
        band_length,
        frequency_range,
        frequency_offset,
        frequency_basis,
        deviation,
    );
    let flat: Vec<f32> = band.to_interleaved().into_iter().map(|v| v as f32).collect();
    to_float32_array(&flat)
}

/// Compute rows `start_y..end_y` and call `row_callback(y, row, output_padding)` for each
///
/// `row` is a Float32Array of interleaved complex samples. If the callback
/// throws, the remaining rows are still computed but not delivered and the
/// exception is returned.
#[wasm_bindgen(js_name = numericOutput)]
pub fn numeric_output(
    input_transformed_signal: &Float32Array,
    padding: usize,
    frequency_band: &Float32Array,
    start_y: usize,
    end_y: usize,
    output_width: usize,
    row_callback: &Function,
) -> JsResult<()> {
    let samples = deinterleave(&input_transformed_signal.to_vec()).map_err(js_error)?;
    let spectrum = Spectrum::from_samples(samples, padding).map_err(js_error)?;
    let band_values: Vec<f64> = frequency_band.to_vec().into_iter().map(f64::from).collect();
    let band = FrequencyBand::from_interleaved(&band_values).map_err(js_error)?;

    let mut callback_error = None;
    compute_rows(
        &spectrum,
        &band,
        output_width,
        start_y..end_y,
        |y, row, output_padding| {
            if callback_error.is_some() {
                return;
            }
            let data = to_float32_array(&interleave(row));
            if let Err(e) = row_callback.call3(
                &JsValue::NULL,
                &JsValue::from(y as u32),
                &data,
                &JsValue::from(output_padding),
            ) {
                callback_error = Some(e);
            }
        },
    )
    .map_err(js_error)?;

    match callback_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// Serde-compatible info structs for passing to JavaScript
#[derive(Serialize)]
struct AudioInfoJs {
    sample_rate: u32,
    channels: usize,
    duration_samples: usize,
    duration_seconds: f64,
}

impl From<&AudioInfo> for AudioInfoJs {
    fn from(info: &AudioInfo) -> Self {
        Self {
            sample_rate: info.sample_rate,
            channels: info.channels,
            duration_samples: info.duration_samples,
            duration_seconds: info.duration_seconds,
        }
    }
}

#[derive(Serialize)]
struct CwtConfigJs {
    height: usize,
    padding: usize,
    gain: f64,
    frequency_range: f64,
    frequency_offset: f64,
    frequency_basis: f64,
    deviation: f64,
    output_width: usize,
    exponential: bool,
}

impl From<&CwtConfig> for CwtConfigJs {
    fn from(config: &CwtConfig) -> Self {
        Self {
            height: config.height,
            padding: config.padding,
            gain: config.gain,
            frequency_range: config.frequency_range,
            frequency_offset: config.frequency_offset,
            frequency_basis: config.frequency_basis,
            deviation: config.deviation,
            output_width: config.output_width,
            exponential: config.is_exponential(),
        }
    }
}

#[derive(Serialize)]
struct ProcessorInfoJs {
    audio_info: Option<AudioInfoJs>,
    config: CwtConfigJs,
    has_audio: bool,
    has_scalogram: bool,
    scalogram_height: Option<usize>,
    scalogram_width: Option<usize>,
    output_padding: Option<f64>,
}

#[wasm_bindgen]
pub struct WasmCwtProcessor {
    processor: CwtProcessor,
}

impl Default for WasmCwtProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmCwtProcessor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        init_panic_hook();

        Self {
            processor: CwtProcessor::new(),
        }
    }

    /// Load audio data from a Float32Array (interleaved)
    #[wasm_bindgen]
    pub fn load_audio_data(
        &mut self,
        channels: u16,
        sample_rate: u32,
        audio_data: &Float32Array,
    ) -> JsResult<()> {
        if channels == 0 {
            return Err(JsValue::from_str("Channel count must be non-zero"));
        }

        let buffer = audio_data.to_vec();
        let channels = channels as usize;
        let channel_length = buffer.len() / channels;

        // Deinterleave
        let samples: Vec<Vec<f64>> = (0..channels)
            .map(|ch| {
                (0..channel_length)
                    .map(|i| buffer[i * channels + ch] as f64)
                    .collect()
            })
            .collect();

        let audio_info = AudioInfo::new(sample_rate, channels, channel_length);
        log::info!(
            "Loading {} channels of {} samples from JavaScript",
            channels,
            channel_length
        );
        self.processor
            .load_audio(audio_info, samples)
            .map_err(js_error)
    }

    /// Read audio from byte data (e.g., uploaded file)
    #[wasm_bindgen]
    pub fn read_audio_bytes(&mut self, data: js_sys::Uint8Array) -> JsResult<()> {
        let (audio_info, channel_data) = read_audio_bytes(data.to_vec()).map_err(js_error)?;
        self.processor
            .load_audio(audio_info, channel_data)
            .map_err(js_error)
    }

    /// Select the transformed channel; a negative index mixes all channels
    #[wasm_bindgen]
    pub fn set_channel(&mut self, channel: i32) -> JsResult<()> {
        let selection = if channel < 0 {
            ChannelSelection::Mix
        } else {
            ChannelSelection::Channel(channel as usize)
        };
        self.processor.set_channel(selection).map_err(js_error)
    }

    /// Set the wavelet configuration
    #[wasm_bindgen]
    #[allow(clippy::too_many_arguments)]
    pub fn set_config(
        &mut self,
        height: usize,
        padding: usize,
        gain: f64,
        frequency_range: f64,
        frequency_offset: f64,
        frequency_basis: f64,
        deviation: f64,
        output_width: usize,
    ) -> JsResult<()> {
        let config = CwtConfig {
            height,
            padding,
            gain,
            frequency_range,
            frequency_offset,
            frequency_basis,
            deviation,
            output_width,
        };
        self.processor.set_config(config).map_err(js_error)
    }

    /// Load a configuration preset
    #[wasm_bindgen]
    pub fn load_preset(&mut self, preset_name: &str) -> JsResult<()> {
        let name = preset_name.replace('_', " ");
        let preset = presets::find_preset(&name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown preset: {}", preset_name)))?;
        self.processor.set_config(preset.config).map_err(js_error)
    }

    /// Get available presets
    #[wasm_bindgen]
    pub fn get_presets(&self) -> JsValue {
        let preset_info: Vec<_> = presets::list_presets()
            .iter()
            .map(|preset| {
                serde_json::json!({
                    "name": preset.name,
                    "key": preset.name.to_lowercase().replace(' ', "_"),
                    "description": preset.description,
                    "config": CwtConfigJs::from(&preset.config),
                })
            })
            .collect();

        serde_wasm_bindgen::to_value(&preset_info).unwrap_or(JsValue::null())
    }

    /// Compute the scalogram
    #[wasm_bindgen]
    pub fn transform(&mut self) -> JsResult<()> {
        self.processor
            .fit_output_width(DEFAULT_MAX_OUTPUT_WIDTH)
            .map_err(js_error)?;
        self.processor.transform(1).map(|_| ()).map_err(js_error)
    }

    /// Get processor information
    #[wasm_bindgen]
    pub fn get_info(&self) -> JsValue {
        let scalogram = self.processor.scalogram();
        let info = ProcessorInfoJs {
            audio_info: self.processor.audio_info().map(AudioInfoJs::from),
            config: CwtConfigJs::from(self.processor.config()),
            has_audio: self.processor.has_audio(),
            has_scalogram: self.processor.has_scalogram(),
            scalogram_height: scalogram.map(|s| s.height()),
            scalogram_width: scalogram.map(|s| s.trimmed_width()),
            output_padding: scalogram.map(|s| s.padding()),
        };

        serde_wasm_bindgen::to_value(&info).unwrap_or(JsValue::null())
    }

    /// Row-major magnitudes of the trimmed scalogram, optionally in dB
    #[wasm_bindgen]
    pub fn get_magnitudes(&self, use_db: bool) -> JsResult<Float32Array> {
        let scalogram = self
            .processor
            .scalogram()
            .ok_or_else(|| JsValue::from_str("No scalogram available"))?;

        let rows = if use_db {
            scalogram.to_db(1.0, true)
        } else {
            scalogram.magnitudes(true)
        };
        let flat: Vec<f32> = rows.into_iter().flatten().map(|v| v as f32).collect();
        Ok(to_float32_array(&flat))
    }

    /// A single scalogram row as interleaved complex values, padding included
    #[wasm_bindgen]
    pub fn get_row(&self, y: usize) -> JsResult<Float32Array> {
        self.processor
            .scalogram()
            .and_then(|s| s.row(y, false))
            .map(|row| to_float32_array(&interleave(row)))
            .ok_or_else(|| JsValue::from_str(&format!("Row {} not available", y)))
    }

    /// Frequency of a row in Hz (0 when no audio is loaded)
    #[wasm_bindgen]
    pub fn get_row_frequency(&self, y: usize) -> f64 {
        self.processor.row_frequency_hz(y).unwrap_or(0.0)
    }

    /// Get analysis summary as string
    #[wasm_bindgen]
    pub fn get_analysis_summary(&self) -> String {
        utils::analysis_summary(&self.processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_layout() {
        let samples = vec![Complex64::new(1.0, -2.0), Complex64::new(0.5, 0.25)];
        assert_eq!(interleave(&samples), vec![1.0, -2.0, 0.5, 0.25]);
        assert_eq!(deinterleave(&[1.0, -2.0, 0.5, 0.25]).unwrap(), samples);
        assert!(deinterleave(&[1.0, 2.0, 3.0]).is_err());
    }
}
