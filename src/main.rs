use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::Path;

use dx7voice::{Patch, PatchBank};

/// DX7 Voice CLI
///
/// Render a single note from a DX7 SYSEX bank to a WAV file, playing the
/// patch until it naturally decays to silence.
#[derive(Parser, Clone)]
#[command(name = "dx7voice")]
#[command(about = "Render notes from DX7 SYSEX banks")]
#[command(version)]
struct Args {
    /// SYSEX bank file containing 32 DX7 patches
    #[arg(help = "Path to SYSEX bank file (.syx)")]
    sysex_file: String,

    /// MIDI note number to play (0-127)
    #[arg(help = "MIDI note number (0-127, where 60 = Middle C, 69 = A4)")]
    midi_note: u8,

    /// Maximum note length in seconds
    #[arg(help = "Maximum note length in seconds")]
    note_length: f64,

    /// Output WAV filename
    #[arg(help = "Output WAV file path")]
    output_file: String,

    /// Sample rate in Hz
    #[arg(short, long, default_value = "44100", help = "Sample rate in Hz")]
    sample_rate: u32,

    /// Patch number to use (for multi-patch SYSEX banks)
    #[arg(
        short,
        long,
        default_value = "0",
        help = "Patch number to use (0-based, 0-31)"
    )]
    patch: usize,

    /// Verbose output
    #[arg(short = 'v', long, help = "Verbose output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    validate_args(&args)?;

    log::debug!("loading sysex bank from {}", args.sysex_file);
    let data = std::fs::read(&args.sysex_file)
        .with_context(|| format!("failed to read '{}'", args.sysex_file))?;
    let bank = PatchBank::from_bytes(&data).map_err(|e| anyhow!(e.to_string()))?;

    let patch: &Patch = bank
        .patch(args.patch)
        .ok_or_else(|| anyhow!("patch index {} out of range (bank has 32)", args.patch))?;

    log::debug!(
        "rendering patch {} (algorithm {}) at midi note {} ({})",
        args.patch,
        patch.algorithm,
        args.midi_note,
        note_name(args.midi_note)
    );

    let duration_ms = (args.note_length * 1000.0) as u64;
    let samples = (*patch).generate_samples(args.midi_note as f32, args.sample_rate, duration_ms);

    log::info!(
        "generated {} samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / args.sample_rate as f64
    );

    write_wav(&args.output_file, args.sample_rate, &samples)
        .with_context(|| format!("failed to write '{}'", args.output_file))?;

    println!(
        "Generated test vector: {} -> {}",
        args.sysex_file, args.output_file
    );

    Ok(())
}

/// Writes a mono 32-bit float WAV file.
fn write_wav(path: &str, sample_rate: u32, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<()> {
    if !Path::new(&args.sysex_file).exists() {
        return Err(anyhow!("SYSEX file '{}' not found", args.sysex_file));
    }

    if args.midi_note > 127 {
        return Err(anyhow!(
            "Invalid MIDI note: {} (must be 0-127)",
            args.midi_note
        ));
    }

    if args.note_length <= 0.0 {
        return Err(anyhow!(
            "Invalid note length: {} (must be positive)",
            args.note_length
        ));
    }

    if args.note_length > 60.0 {
        return Err(anyhow!(
            "Note length too long: {}s (maximum: 60s)",
            args.note_length
        ));
    }

    if args.sample_rate < 8000 || args.sample_rate > 192000 {
        return Err(anyhow!(
            "Invalid sample rate: {}Hz (must be 8000-192000)",
            args.sample_rate
        ));
    }

    if args.patch >= 32 {
        return Err(anyhow!(
            "Invalid patch index: {} (must be 0-31)",
            args.patch
        ));
    }

    if let Some(parent) = Path::new(&args.output_file).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(anyhow!(
                "Output directory '{}' does not exist",
                parent.display()
            ));
        }
    }

    Ok(())
}

/// Convert MIDI note number to note name
fn note_name(midi_note: u8) -> String {
    let note_names = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = (midi_note / 12) as i32 - 1;
    let note = midi_note % 12;
    format!("{}{}", note_names[note as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_names_match_midi_convention() {
        assert_eq!(note_name(60), "C4"); // Middle C
        assert_eq!(note_name(69), "A4"); // A440
        assert_eq!(note_name(21), "A0"); // Lowest A on piano
        assert_eq!(note_name(108), "C8"); // High C
        assert_eq!(note_name(61), "C#4"); // C# above middle C
    }

    #[test]
    fn validate_args_rejects_missing_file() {
        let args = Args {
            sysex_file: "nonexistent.syx".to_string(),
            midi_note: 60,
            note_length: 1.0,
            output_file: "test.wav".to_string(),
            sample_rate: 44100,
            patch: 0,
            verbose: false,
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn validate_args_rejects_out_of_range_patch() {
        let mut args = Args {
            sysex_file: "nonexistent.syx".to_string(),
            midi_note: 60,
            note_length: 1.0,
            output_file: "test.wav".to_string(),
            sample_rate: 44100,
            patch: 32,
            verbose: false,
        };
        assert!(validate_args(&args).is_err());
        args.patch = 0;
        args.note_length = -1.0;
        assert!(validate_args(&args).is_err());
    }
}
