//! Audio I/O functionality using Symphonia
//!
//! Decodes audio files or in-memory bytes into per-channel `f64` buffers that
//! can be fed to the forward spectrum, and writes WAV files for generated test
//! signals.

#[cfg(not(target_arch = "wasm32"))]
use std::fs::File;
use std::io::Cursor;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use crate::error::CwtError;
use crate::Result;
use symphonia::core::audio::Signal;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Audio metadata information
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_samples: usize,
    pub duration_seconds: f64,
}

impl AudioInfo {
    pub fn new(sample_rate: u32, channels: usize, duration_samples: usize) -> Self {
        let duration_seconds = if sample_rate > 0 {
            duration_samples as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            sample_rate,
            channels,
            duration_samples,
            duration_seconds,
        }
    }
}

/// Which signal to take from multi-channel audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelection {
    /// Average of all channels
    Mix,
    /// A single channel by index
    Channel(usize),
}

fn is_end_of_stream(err: &SymphoniaError) -> bool {
    matches!(err, SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
}

/// Read audio from a MediaSourceStream and return channel data and metadata
fn read_audio_stream(mss: MediaSourceStream) -> Result<(AudioInfo, Vec<Vec<f64>>)> {
    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| CwtError::Codec("No default track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| CwtError::Codec("Sample rate not specified".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| CwtError::Codec("Channels not specified".to_string()))?
        .count();

    let mut channel_buffers: Vec<Vec<f64>> = vec![Vec::new(); channels];
    let mut format = probed.format;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(err) if is_end_of_stream(&err) => break,
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(err) if is_end_of_stream(&err) => break,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let mut converted = decoded.make_equivalent::<f64>();
        decoded.convert(&mut converted);
        for (c, buffer) in channel_buffers.iter_mut().enumerate() {
            buffer.extend_from_slice(converted.chan(c));
        }
    }

    let duration_samples = channel_buffers.first().map_or(0, |c| c.len());
    let info = AudioInfo::new(sample_rate, channels, duration_samples);

    log::debug!(
        "Decoded {} channels of {} samples at {} Hz",
        info.channels,
        info.duration_samples,
        info.sample_rate
    );

    Ok((info, channel_buffers))
}

/// Read audio file from filesystem path
#[cfg(not(target_arch = "wasm32"))]
pub fn read_audio_file<P: AsRef<Path>>(path: P) -> Result<(AudioInfo, Vec<Vec<f64>>)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    read_audio_stream(mss)
}

/// Read audio data from byte buffer
pub fn read_audio_bytes(data: Vec<u8>) -> Result<(AudioInfo, Vec<Vec<f64>>)> {
    let cursor = Cursor::new(data);
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    read_audio_stream(mss)
}

/// Average all channels into one signal
pub fn mix_to_mono(channel_data: &[Vec<f64>]) -> Vec<f64> {
    let length = channel_data.iter().map(|c| c.len()).min().unwrap_or(0);
    if channel_data.is_empty() {
        return Vec::new();
    }

    let scale = 1.0 / channel_data.len() as f64;
    (0..length)
        .map(|i| channel_data.iter().map(|c| c[i]).sum::<f64>() * scale)
        .collect()
}

/// Pick the signal to transform from decoded channels
pub fn select_channel(channel_data: &[Vec<f64>], selection: ChannelSelection) -> Result<Vec<f64>> {
    match selection {
        ChannelSelection::Mix if channel_data.len() == 1 => Ok(channel_data[0].clone()),
        ChannelSelection::Mix => Ok(mix_to_mono(channel_data)),
        ChannelSelection::Channel(index) => channel_data.get(index).cloned().ok_or_else(|| {
            CwtError::InvalidInput(format!(
                "Channel {} out of range ({} channels)",
                index,
                channel_data.len()
            ))
        }),
    }
}

fn wav_spec(audio_info: &AudioInfo, channel_data: &[Vec<f64>]) -> Result<hound::WavSpec> {
    if channel_data.len() != audio_info.channels {
        return Err(CwtError::InvalidInput(format!(
            "Channel count mismatch: {} buffers for {} channels",
            channel_data.len(),
            audio_info.channels
        )));
    }

    if let Some(first) = channel_data.first() {
        if let Some((i, channel)) = channel_data
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != first.len())
        {
            return Err(CwtError::InvalidInput(format!(
                "Channel {} has {} samples, channel 0 has {}",
                i,
                channel.len(),
                first.len()
            )));
        }
    }

    Ok(hound::WavSpec {
        channels: audio_info.channels as u16,
        sample_rate: audio_info.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    })
}

fn write_samples<W: std::io::Write + std::io::Seek>(
    mut writer: hound::WavWriter<W>,
    channel_data: &[Vec<f64>],
) -> Result<()> {
    let num_samples = channel_data.first().map_or(0, |c| c.len());

    // Interleave the channel data for writing
    for sample_idx in 0..num_samples {
        for channel in channel_data {
            writer.write_sample(channel[sample_idx] as f32)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Write audio data to WAV file
#[cfg(not(target_arch = "wasm32"))]
pub fn write_audio_file<P: AsRef<Path>>(
    path: P,
    audio_info: &AudioInfo,
    channel_data: &[Vec<f64>],
) -> Result<()> {
    let spec = wav_spec(audio_info, channel_data)?;
    let writer = hound::WavWriter::new(std::io::BufWriter::new(File::create(path)?), spec)?;
    write_samples(writer, channel_data)
}

/// Write audio data to WAV format in memory and return bytes
pub fn write_audio_bytes(audio_info: &AudioInfo, channel_data: &[Vec<f64>]) -> Result<Vec<u8>> {
    let spec = wav_spec(audio_info, channel_data)?;

    let mut cursor = Cursor::new(Vec::new());
    write_samples(hound::WavWriter::new(&mut cursor, spec)?, channel_data)?;

    Ok(cursor.into_inner())
}
