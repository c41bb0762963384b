//! CCWT CLI
//!
//! Command-line interface for the wavelet transform library.
//! Provides an interactive shell for loading audio, tuning the transform and
//! exporting scalograms.

use std::process;
use std::str::FromStr;

use ccwt_lib::{
    audio_io::{write_audio_file, AudioInfo, ChannelSelection},
    config::presets,
    signal,
    utils::{self, format_frequency},
    CwtConfig, CwtProcessor, OutputGeometry,
};
use clap::{value_parser, Arg, Command};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[cfg(feature = "image")]
use ccwt_lib::scalogram::image::{save_scalogram, ColorMap, RenderMode, ScalogramImageOptions};

/// Application state
struct AppState {
    processor: CwtProcessor,
    current_file: Option<String>,
    parts: usize,
}

impl AppState {
    fn new() -> Self {
        Self {
            processor: CwtProcessor::new(),
            current_file: None,
            parts: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    fn apply_config(&mut self, config: ccwt_lib::Result<CwtConfig>, what: &str) {
        match config.and_then(|c| self.processor.set_config(c)) {
            Ok(_) => println!("Set {}", what),
            Err(e) => println!("Error: {}", e),
        }
    }
}

/// Print the help message showing available commands
fn print_help() {
    println!("Available commands:");
    println!("  load <filename>                    - Load an audio file and compute its scalogram");
    println!("  tone <filename> <kind> <f0> [f1] [seconds] [rate]");
    println!("                                     - Write a test tone (sine, chirp, expchirp) and load it");
    println!("  config                             - Show current wavelet configuration");
    println!("  set <parameter> <value>            - Change a configuration parameter");
    println!("  preset <n|name>                    - Load a configuration preset");
    println!("  presets                            - List available presets");
    println!("  transform [parts]                  - Recompute the scalogram with current settings");
    println!("  rows <start> <end>                 - Print peak magnitude of a range of rows");
    println!("  align <width>                      - Suggest a valid output width");
    println!("  scalogram <filename> [mode] [colormap] [width] [height] [linear|db]");
    println!("                                     - Save the scalogram as an image");
    println!("  info                               - Show information about loaded audio");
    println!("  status                             - Show processor status");
    println!("  help                               - Show this help message");
    println!("  quit                               - Exit the program");
    println!();
    println!("Parameters:");
    println!("  height <rows>       padding <samples>    gain <factor>");
    println!("  range <span>        offset <lowest>      basis <0|base>");
    println!("  deviation <value>   width <samples|0>    channel <mix|index>");
    println!();
    println!("Render modes: amplitude, phase, real, imaginary, rainbow");
    println!("Color maps: viridis, plasma, inferno, magma, grayscale, jet");
    println!();
    println!("Examples:");
    println!("  tone sweep.wav expchirp 50 4000 2");
    println!("  set basis 2");
    println!("  set range 7");
    println!("  set offset 5");
    println!("  set width 2000");
    println!("  transform");
    println!("  scalogram sweep.png rainbow");
}

fn parse_arg<T: FromStr>(parts: &[&str], index: usize, name: &str) -> Option<T> {
    let value = parts.get(index)?;
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            println!("Invalid {}: {}", name, value);
            None
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn print_scalogram_summary(state: &AppState) {
    if let Some(scalogram) = state.processor.scalogram() {
        println!(
            "Scalogram: {} rows x {} samples (padding {:.1})",
            scalogram.height(),
            scalogram.width(),
            scalogram.padding()
        );
    }
}

fn transform(state: &mut AppState) {
    let parts = state.parts;
    match state.processor.transform(parts) {
        Ok(_) => print_scalogram_summary(state),
        Err(e) => println!("Error during transform: {}", e),
    }
}

fn set_parameter(state: &mut AppState, param: &str, value: &str) {
    let config = *state.processor.config();

    match param {
        "height" => match value.parse::<usize>() {
            Ok(v) => state.apply_config(config.with_height(v), &format!("height to {}", v)),
            Err(_) => println!("Invalid height: {}", value),
        },
        "padding" => match value.parse::<usize>() {
            Ok(v) => state.apply_config(Ok(config.with_padding(v)), &format!("padding to {}", v)),
            Err(_) => println!("Invalid padding: {}", value),
        },
        "gain" => match value.parse::<f64>() {
            Ok(v) => state.apply_config(config.with_gain(v), &format!("gain to {}", v)),
            Err(_) => println!("Invalid gain: {}", value),
        },
        "range" | "offset" | "basis" => match value.parse::<f64>() {
            Ok(v) => {
                let (range, offset, basis) = match param {
                    "range" => (v, config.frequency_offset, config.frequency_basis),
                    "offset" => (config.frequency_range, v, config.frequency_basis),
                    _ => (config.frequency_range, config.frequency_offset, v),
                };
                state.apply_config(
                    config.with_frequencies(range, offset, basis),
                    &format!("{} to {}", param, v),
                );
            }
            Err(_) => println!("Invalid {}: {}", param, value),
        },
        "deviation" => match value.parse::<f64>() {
            Ok(v) => state.apply_config(config.with_deviation(v), &format!("deviation to {}", v)),
            Err(_) => println!("Invalid deviation: {}", value),
        },
        "width" => match value.parse::<usize>() {
            Ok(v) => state.apply_config(
                Ok(config.with_output_width(v)),
                &format!("output width to {}", v),
            ),
            Err(_) => println!("Invalid width: {}", value),
        },
        "channel" => {
            let selection = if value == "mix" {
                Some(ChannelSelection::Mix)
            } else {
                value.parse::<usize>().ok().map(ChannelSelection::Channel)
            };
            match selection {
                Some(s) => match state.processor.set_channel(s) {
                    Ok(_) => println!("Set channel to {:?}", s),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Invalid channel: {} (use 'mix' or an index)", value),
            }
        }
        _ => {
            println!("Unknown parameter: {}", param);
            println!("Valid parameters: height, padding, gain, range, offset, basis, deviation, width, channel");
        }
    }
}

fn write_tone(state: &mut AppState, parts: &[&str]) {
    if parts.len() < 4 {
        println!("Usage: tone <filename> <sine|chirp|expchirp> <f0> [f1] [seconds] [rate]");
        return;
    }

    let filename = parts[1];
    let kind = parts[2];
    let Some(f0) = parse_arg::<f64>(parts, 3, "frequency") else {
        return;
    };
    let f1 = parse_arg::<f64>(parts, 4, "end frequency").unwrap_or(f0);
    let seconds = parse_arg::<f64>(parts, 5, "duration").unwrap_or(1.0);
    let rate = parse_arg::<u32>(parts, 6, "sample rate").unwrap_or(44100);
    let length = (seconds * rate as f64).round() as usize;

    let samples = match kind {
        "sine" => signal::sine(length, rate, f0, 0.5),
        "chirp" => signal::linear_chirp(length, rate, f0, f1, 0.5),
        "expchirp" => signal::exponential_chirp(length, rate, f0, f1, 0.5),
        _ => {
            println!("Unknown tone kind: {} (use sine, chirp or expchirp)", kind);
            return;
        }
    };

    let result = samples.and_then(|samples| {
        let info = AudioInfo::new(rate, 1, samples.len());
        let data = vec![samples];
        write_audio_file(filename, &info, &data)?;
        state.processor.load_audio(info, data)
    });

    match result {
        Ok(_) => {
            println!(
                "Wrote {} tone to {} ({}, {} Hz)",
                kind,
                filename,
                utils::format_time(seconds),
                rate
            );
            state.current_file = Some(filename.to_string());
            transform(state);
        }
        Err(e) => println!("Error writing tone: {}", e),
    }
}

fn print_rows(state: &mut AppState, parts: &[&str]) {
    let (Some(start), Some(end)) = (
        parse_arg::<usize>(parts, 1, "start row"),
        parse_arg::<usize>(parts, 2, "end row"),
    ) else {
        println!("Usage: rows <start> <end>");
        return;
    };

    let mut peaks = Vec::new();
    let result = state.processor.stream_rows(start..end, |y, row, padding| {
        let trimmed = ccwt_lib::wavelet::trim_padding(row, padding);
        let peak = trimmed.iter().map(|c| c.norm()).fold(0.0f64, f64::max);
        peaks.push((y, peak));
    });

    if let Err(e) = result {
        println!("Error computing rows: {}", e);
        if let Some(row) = e.failed_row() {
            println!("  {} rows were delivered before row {}", peaks.len(), row);
        }
    }

    for (y, peak) in peaks {
        let label = state
            .processor
            .row_frequency_hz(y)
            .map(format_frequency)
            .unwrap_or_default();
        println!("  row {:5} {:>12}  peak {:.6}", y, label, peak);
    }
}

#[cfg(feature = "image")]
fn save_image(state: &AppState, parts: &[&str]) {
    if parts.len() < 2 {
        println!("Usage: scalogram <filename> [mode] [colormap] [width] [height] [linear|db]");
        return;
    }

    let Some(scalogram) = state.processor.scalogram() else {
        println!("No scalogram available. Load a file or run 'transform' first.");
        return;
    };

    let filename = parts[1];
    let mode_name = parts.get(2).unwrap_or(&"amplitude");
    let colormap_name = parts.get(3).unwrap_or(&"viridis");

    let render_mode = RenderMode::from_name(mode_name).unwrap_or_else(|| {
        println!("Unknown render mode: {}. Using amplitude.", mode_name);
        RenderMode::Amplitude
    });
    let colormap = ColorMap::from_name(colormap_name).unwrap_or_else(|| {
        println!("Unknown colormap: {}. Using viridis.", colormap_name);
        ColorMap::Viridis
    });
    let size = match (
        parse_arg::<u32>(parts, 4, "width"),
        parse_arg::<u32>(parts, 5, "height"),
    ) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => None,
    };

    let options = ScalogramImageOptions {
        render_mode,
        colormap,
        use_db_scale: parts.get(6).map_or(true, |s| *s != "linear"),
        size,
        ..Default::default()
    };

    match save_scalogram(scalogram, filename, &options) {
        Ok(_) => {
            println!("Saved scalogram to: {}", filename);
            let (width, height) =
                size.unwrap_or((scalogram.trimmed_width() as u32, scalogram.height() as u32));
            println!("  Image size: {}x{} pixels", width, height);
            println!("  Render mode: {:?}, color map: {:?}", render_mode, colormap);
            if let Some(info) = state.processor.audio_info() {
                println!("  Time range: 0.0 - {:.2} seconds", info.duration_seconds);
            }
            if let (Some(top), Some(bottom)) = (
                state.processor.row_frequency_hz(0),
                state.processor.row_frequency_hz(scalogram.height().saturating_sub(1)),
            ) {
                println!(
                    "  Frequency range: {} (top) - {} (bottom)",
                    format_frequency(top),
                    format_frequency(bottom)
                );
            }
        }
        Err(e) => println!("Error saving scalogram: {}", e),
    }
}

/// Process a user command
fn process_command(command: &str, state: &mut AppState) {
    let parts: Vec<&str> = command.split_whitespace().collect();

    if parts.is_empty() {
        return;
    }

    match parts[0] {
        "load" => {
            if parts.len() != 2 {
                println!("Usage: load <filename>");
                return;
            }

            let filename = parts[1];
            println!("Loading file: {}", filename);

            let n_parts = state.parts;
            match utils::load_and_transform(&mut state.processor, filename, n_parts) {
                Ok(_) => {
                    state.current_file = Some(filename.to_string());
                    println!("File loaded successfully!");
                    println!("{}", utils::analysis_summary(&state.processor));
                }
                Err(e) => println!("Error loading file: {}", e),
            }
        }

        "tone" => write_tone(state, &parts),

        "config" => {
            let config = state.processor.config();
            println!("Current Wavelet Configuration:");
            println!("  Height: {}", config.height);
            println!("  Padding: {}", config.padding);
            println!("  Gain: {}", config.gain);
            println!("  Frequency range: {}", config.frequency_range);
            println!("  Frequency offset: {}", config.frequency_offset);
            println!("  Frequency basis: {}", config.frequency_basis);
            println!("  Deviation: {}", config.deviation);
            println!("  Output width: {}", config.output_width);
            println!("  Channel: {:?}", state.processor.channel());
            println!("  Parallel parts: {}", state.parts);
        }

        "set" => {
            if parts.len() < 3 {
                println!("Usage: set <parameter> <value>");
                println!("Parameters: height, padding, gain, range, offset, basis, deviation, width, channel");
                return;
            }
            set_parameter(state, parts[1], parts[2]);
        }

        "preset" => {
            if parts.len() < 2 {
                println!("Usage: preset <number|name>");
                return;
            }

            let name = parts[1..].join(" ");
            let preset = match name.parse::<usize>() {
                Ok(n) => presets::get_preset(n),
                Err(_) => presets::find_preset(&name),
            };

            match preset {
                Some(preset) => match state.processor.set_config(preset.config) {
                    Ok(_) => {
                        println!("Applied preset {}: {}", preset.id, preset.name);
                        println!("{}", preset.description);
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Invalid preset: {}", name),
            }
        }

        "presets" => {
            println!("Available presets:");
            for preset in presets::list_presets() {
                println!("  {}: {} - {}", preset.id, preset.name, preset.description);
            }
        }

        "transform" => {
            if !state.processor.has_audio() {
                println!("No audio loaded. Load a file first.");
                return;
            }
            if let Some(n) = parse_arg::<usize>(&parts, 1, "part count") {
                state.parts = n.max(1);
            }
            println!("Transforming with {} parallel parts...", state.parts);
            transform(state);
        }

        "rows" => print_rows(state, &parts),

        "align" => {
            let Some(info) = state.processor.audio_info() else {
                println!("No audio loaded. Load a file first.");
                return;
            };
            let Some(requested) = parse_arg::<usize>(&parts, 1, "width") else {
                println!("Usage: align <width>");
                return;
            };

            let padding = state.processor.config().padding;
            let total = info.duration_samples + 2 * padding;
            match OutputGeometry::aligned_output_width(total, padding, requested) {
                Some(width) => println!("Nearest valid width: {}", width),
                None => println!("No valid width at or below {}", requested),
            }
        }

        "scalogram" => {
            #[cfg(feature = "image")]
            save_image(state, &parts);
            #[cfg(not(feature = "image"))]
            {
                println!("Scalogram export requires the 'image' feature to be enabled.");
                println!("Rebuild with: cargo build --release --features image");
            }
        }

        "info" => {
            if state.processor.has_audio() {
                println!("{}", utils::analysis_summary(&state.processor));
            } else {
                println!("No audio data available");
            }
        }

        "status" => {
            println!("Processor Status:");
            println!("  Audio loaded: {}", yes_no(state.processor.has_audio()));
            println!("  Spectrum: {}", yes_no(state.processor.has_spectrum()));
            println!("  Scalogram: {}", yes_no(state.processor.has_scalogram()));

            if let Some(filename) = &state.current_file {
                println!("  Current file: {}", filename);
            }
            print_scalogram_summary(state);
        }

        "help" => print_help(),

        "quit" | "exit" => {
            println!("Goodbye!");
            process::exit(0);
        }

        _ => {
            println!("Unknown command: '{}'", parts[0]);
            println!("Type 'help' for available commands");
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command line arguments
    let matches = Command::new("CCWT")
        .version(ccwt_lib::VERSION)
        .about("Complex continuous wavelet transform tool")
        .arg(
            Arg::new("file")
                .help("Audio file to load on startup")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .short('y')
                .help("Number of frequency rows")
                .value_name("ROWS")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("deviation")
                .long("deviation")
                .short('d')
                .help("Time/frequency tradeoff (1.0 is balanced)")
                .value_name("VALUE")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("basis")
                .long("basis")
                .short('b')
                .help("Exponential band base (0 for a linear band)")
                .value_name("BASE")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("padding")
                .long("padding")
                .short('p')
                .help("Zero padding on each side of the signal")
                .value_name("SAMPLES")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .short('w')
                .help("Output row width (0 fits the row to at most 4096 samples on load)")
                .value_name("SAMPLES")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("parts")
                .long("parts")
                .short('j')
                .help("Number of row partitions computed in parallel")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .get_matches();

    println!("CCWT v{}", ccwt_lib::VERSION);
    println!("Type 'help' for available commands\n");

    // Initialize the library
    ccwt_lib::init();

    let mut state = AppState::new();

    // Apply command line configuration
    let mut config = *state.processor.config();
    if let Some(&height) = matches.get_one::<usize>("height") {
        config.height = height;
    }
    if let Some(&deviation) = matches.get_one::<f64>("deviation") {
        config.deviation = deviation;
    }
    if let Some(&basis) = matches.get_one::<f64>("basis") {
        config.frequency_basis = basis;
    }
    if let Some(&padding) = matches.get_one::<usize>("padding") {
        config.padding = padding;
    }
    if let Some(&width) = matches.get_one::<usize>("width") {
        config.output_width = width;
    }
    if let Some(&parts) = matches.get_one::<usize>("parts") {
        state.parts = parts.max(1);
    }

    if let Err(e) = state.processor.set_config(config) {
        eprintln!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // Load file from command line if provided
    if let Some(filename) = matches.get_one::<String>("file") {
        println!("Loading file: {}", filename);
        let n_parts = state.parts;
        match utils::load_and_transform(&mut state.processor, filename, n_parts) {
            Ok(_) => {
                state.current_file = Some(filename.to_string());
                println!("File loaded successfully!");
                println!("{}", utils::analysis_summary(&state.processor));
            }
            Err(e) => eprintln!("Error loading file: {}", e),
        }
    }

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to create readline: {}", e);
            process::exit(1);
        }
    };

    // Main command loop
    loop {
        let readline = rl.readline("ccwt> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    rl.add_history_entry(trimmed).ok();
                    process_command(trimmed, &mut state);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
}
