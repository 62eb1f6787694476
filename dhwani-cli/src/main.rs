//! # Dhwani - Hindustani Vocal Tuner CLI
//!
//! A terminal front-end for the dhwani-core tuning pipeline.
//!
//! ## Architecture
//! - **Audio Thread**: cpal stream callback accumulating 2048-sample frames
//! - **Main Thread**: per-frame pipeline (YIN -> smoother -> mapper -> tracker)
//! - **Communication**: bounded crossbeam channel, stale frames dropped
//!
//! Rendering is a single status line rewritten in place: swar, octave, live
//! frequency and a cents meter.

mod audio;

use anyhow::{Context, Result};
use clap::Parser;
use dhwani_core::{NoteEvent, Octave, Swar, TunerConfig, TunerSession};
use std::io::Write;
use std::path::PathBuf;

/// Width of the cents meter in characters (odd, so it has a center).
const METER_WIDTH: usize = 21;
/// Full-scale deflection of the cents meter.
const METER_RANGE_CENTS: f32 = 50.0;

/// Real-time Hindustani vocal tuner.
#[derive(Parser, Debug)]
#[command(name = "dhwani")]
#[command(about = "Real-time Hindustani vocal tuner")]
struct Args {
    /// Tuner configuration file (JSON); fields omitted there keep defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tonic frequency in Hz (Sa of the Madhya octave), overrides the config
    #[arg(long)]
    tonic: Option<f32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str::<TunerConfig>(&text)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => TunerConfig::default(),
    };
    if let Some(tonic) = args.tonic {
        config.tonic = tonic;
    }

    eprintln!(
        "[MAIN] Starting Dhwani tuner (Sa = {} Hz, YIN threshold {})",
        config.tonic, config.yin_threshold
    );

    // Bounded channel: if analysis falls behind, the capture callback drops
    // frames rather than letting latency grow without bound.
    let (sender, receiver) = crossbeam_channel::bounded::<Vec<f32>>(8);
    let (stream, sample_rate) = audio::start_audio_capture(sender, config.sample_rate)?;
    config.sample_rate = sample_rate;

    let mut session = TunerSession::new(config)?;
    print_scale(&session);
    let mut last_event: Option<NoteEvent> = None;

    eprintln!("[MAIN] Listening. Sing into the microphone (Ctrl-C to quit).");

    for frame in receiver.iter() {
        match session.process(&frame)? {
            Some(event) => {
                render_line(&event);
                last_event = Some(event);
            }
            None => render_idle(last_event.as_ref()),
        }
    }

    // Unreachable while the stream is alive; kept for explicit teardown order.
    drop(stream);
    Ok(())
}

/// Logs the Madhya octave of the session's scale table so the singer can see
/// the targets they are tuning against.
fn print_scale(session: &TunerSession) {
    let scale = session.scale();
    let row = Swar::ALL
        .iter()
        .map(|&swar| format!("{} {:.1}", swar.name(), scale.ideal(Octave::Madhya, swar)))
        .collect::<Vec<_>>()
        .join("  ");
    eprintln!("[MAIN] Madhya octave (Hz): {row}");
}

/// Renders one status line for a note event, rewriting in place.
fn render_line(event: &NoteEvent) {
    let line = format!(
        "{:>3} ({:<8}) {:7.2} Hz {:+4.0} cents  {}",
        event.swar.name(),
        event.octave.name(),
        event.frequency,
        event.cents_deviation,
        cents_meter(event.cents_deviation),
    );
    print!("\r{line:<70}");
    let _ = std::io::stdout().flush();
}

/// Renders the "no sound" state, keeping the last swar visible if one exists.
fn render_idle(last: Option<&NoteEvent>) {
    let line = match last {
        Some(event) => format!(
            "{:>3} ({:<8})      --          --     {}",
            event.swar.name(),
            event.octave.name(),
            cents_meter(0.0),
        ),
        None => "--".to_string(),
    };
    print!("\r{line:<70}");
    let _ = std::io::stdout().flush();
}

/// Builds a fixed-width ASCII meter with a center pipe and a marker at the
/// deviation position, clamped to +/- METER_RANGE_CENTS.
fn cents_meter(cents: f32) -> String {
    let clamped = cents.clamp(-METER_RANGE_CENTS, METER_RANGE_CENTS);
    let center = METER_WIDTH / 2;
    let offset = (clamped / METER_RANGE_CENTS * center as f32).round() as i32;
    let marker = (center as i32 + offset) as usize;

    let mut meter: Vec<char> = vec!['-'; METER_WIDTH];
    meter[center] = '|';
    meter[marker] = if marker == center { '*' } else { '>' };
    format!("[{}]", meter.into_iter().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_config_and_tonic() {
        let args = Args::try_parse_from(["dhwani", "--config", "tuner.json", "--tonic", "256"])
            .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("tuner.json")));
        assert_eq!(args.tonic, Some(256.0));
    }

    #[test]
    fn args_default_to_none() {
        let args = Args::try_parse_from(["dhwani"]).unwrap();
        assert_eq!(args.config, None);
        assert_eq!(args.tonic, None);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Args::try_parse_from(["dhwani", "--tonic", "high"]).is_err());
        assert!(Args::try_parse_from(["dhwani", "--frequency", "240"]).is_err());
    }

    #[test]
    fn meter_is_centered_at_zero() {
        let meter = cents_meter(0.0);
        assert_eq!(meter.len(), METER_WIDTH + 2);
        assert_eq!(meter.chars().nth(1 + METER_WIDTH / 2), Some('*'));
    }

    #[test]
    fn meter_clamps_extremes() {
        assert_eq!(cents_meter(500.0).chars().nth(METER_WIDTH), Some('>'));
        assert_eq!(cents_meter(-500.0).chars().nth(1), Some('>'));
    }
}
