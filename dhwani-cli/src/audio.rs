//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform
//! Audio Library). It selects an input device, configures a mono f32 stream
//! and feeds fixed-size frames into the analysis pipeline over a channel.

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Audio buffer size for processing frames.
///
/// This constant defines the number of samples per audio frame, about 46 ms
/// at 44.1 kHz. Larger buffers resolve lower pitches but increase latency.
pub const BUFFER_SIZE: usize = 2048;

/// Starts audio capture from the default input device.
///
/// Accumulates callback data into `BUFFER_SIZE` frames and sends each frame
/// to the analysis thread, dropping frames when the channel is full.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and actual sample rate
/// * `Err(e)` - Error if audio setup fails
pub fn start_audio_capture(sender: Sender<Vec<f32>>, target_rate: u32) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    eprintln!("[AUDIO] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = cpal::SampleRate(
        target_rate
            .max(supported_config.min_sample_rate().0)
            .min(supported_config.max_sample_rate().0),
    );
    let config = supported_config.with_sample_rate(sample_rate);

    let sample_rate_val = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    eprintln!("[AUDIO] Selected sample rate: {} Hz", sample_rate_val);

    let err_fn = |err| eprintln!("[AUDIO] An error occurred on the audio stream: {}", err);

    // The callback delivers chunks of driver-chosen size; stage them here
    // until a full analysis frame is available.
    let mut staging = Vec::with_capacity(BUFFER_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            staging.extend_from_slice(data);

            // Emit every complete frame currently staged. try_send keeps the
            // callback non-blocking: when the analysis side lags, frames are
            // dropped here instead of queueing up latency.
            while staging.len() >= BUFFER_SIZE {
                let _ = sender.try_send(staging[..BUFFER_SIZE].to_vec());
                staging.drain(..BUFFER_SIZE);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate_val))
}

/// Picks a mono f32 input configuration whose supported rate range lies
/// nearest the target rate. Returns `None` if the device offers no mono f32
/// format at all.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            // Distance from the target to the nearer end of the range; a
            // range containing the target can still score nonzero, but the
            // ordering among candidates is what matters.
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            min_diff.min(max_diff)
        })
}
