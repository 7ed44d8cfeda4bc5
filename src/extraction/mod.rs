//! Fundamental-frequency extraction feeding the comparison engine.

use aus::analysis;
use tracing::debug;

use crate::pronunciation::{ErrorKind, PronunciationError, Result};
use crate::types::PitchTrack;

pub const TARGET_SAMPLE_RATE: u32 = 16_000;
const TARGET_RMS: f32 = 0.1;
const MAX_GAIN: f32 = 5.0;
const PEAK_CEILING: f32 = 0.95;

/// Turns a mono waveform into a pitch track.
pub trait PitchExtractor {
    fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<PitchTrack>;
}

/// Probabilistic YIN tracker.
#[derive(Debug, Clone)]
pub struct PyinExtractor {
    pub floor_hz: f64,
    pub ceiling_hz: f64,
    /// Analysis frame in samples at 16 kHz.
    pub frame_len: usize,
    /// Median filter width applied within voiced runs; 1 disables it.
    pub median_window: usize,
}

impl Default for PyinExtractor {
    fn default() -> Self {
        Self {
            floor_hz: 75.0,
            ceiling_hz: 600.0,
            frame_len: 1024,
            median_window: 5,
        }
    }
}

impl PyinExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PitchExtractor for PyinExtractor {
    fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<PitchTrack> {
        if samples.is_empty() {
            return Err(PronunciationError::new(
                ErrorKind::Extraction,
                "cannot extract pitch from an empty waveform",
            ));
        }
        let audio = to_analysis_rate(&normalize_amplitude(samples), sample_rate)?;
        if audio.len() < self.frame_len {
            return Err(PronunciationError::new(
                ErrorKind::Extraction,
                format!(
                    "waveform of {} samples is shorter than one analysis frame",
                    audio.len()
                ),
            ));
        }
        let (timestamps, pitches, voiced_flags, _confidence) = analysis::pyin_pitch_estimator(
            &audio,
            TARGET_SAMPLE_RATE,
            self.floor_hz,
            self.ceiling_hz,
            self.frame_len,
        );

        let frequencies: Vec<Option<f64>> = pitches
            .iter()
            .zip(voiced_flags.iter())
            .map(|(&pitch, &voiced)| {
                (voiced && pitch.is_finite() && pitch >= self.floor_hz && pitch <= self.ceiling_hz)
                    .then_some(pitch)
            })
            .collect();
        let smoothed = median_filter_voiced(&frequencies, self.median_window);
        let count = timestamps.len().min(smoothed.len());
        let track = PitchTrack::from_parts(&timestamps[..count], &smoothed[..count])?;
        debug!(
            frames = track.len(),
            voiced = track.voiced_count(),
            "extracted pitch track"
        );
        Ok(track)
    }
}

/// Root-mean-square level of a waveform, 0 for an empty one.
pub fn signal_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (energy / samples.len() as f64).sqrt()
}

/// Brings quiet recordings up to a common level without clipping.
fn normalize_amplitude(samples: &[f32]) -> Vec<f32> {
    let rms = signal_rms(samples) as f32;
    if rms <= f32::EPSILON {
        return samples.to_vec();
    }
    let gain = (TARGET_RMS / rms).min(MAX_GAIN);
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs())) * gain;
    let gain = if peak > PEAK_CEILING {
        gain * PEAK_CEILING / peak
    } else {
        gain
    };
    samples.iter().map(|s| s * gain).collect()
}

/// Linearly interpolates `samples` onto the 16 kHz analysis grid, widening
/// to `f64` for the tracker.
fn to_analysis_rate(samples: &[f32], sample_rate: u32) -> Result<Vec<f64>> {
    if sample_rate == 0 {
        return Err(PronunciationError::new(
            ErrorKind::Extraction,
            "waveform sample rate must be positive",
        ));
    }
    let widened = samples.iter().map(|&s| f64::from(s));
    if sample_rate == TARGET_SAMPLE_RATE || samples.len() < 2 {
        return Ok(widened.collect());
    }
    let source: Vec<f64> = widened.collect();
    let step = f64::from(sample_rate) / f64::from(TARGET_SAMPLE_RATE);
    let frames = (source.len() as f64 / step).ceil() as usize;
    let last = source.len() - 1;
    Ok((0..frames)
        .map(|frame| {
            let position = frame as f64 * step;
            let below = (position as usize).min(last);
            let above = (below + 1).min(last);
            let weight = (position - below as f64).clamp(0.0, 1.0);
            source[below] + (source[above] - source[below]) * weight
        })
        .collect())
}

/// Median filter that never crosses an unvoiced frame; windows shrink at the
/// edges of each voiced run.
fn median_filter_voiced(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return values.to_vec();
    }
    let radius = window / 2;
    let mut filtered = values.to_vec();
    let mut idx = 0;
    while idx < values.len() {
        if values[idx].is_none() {
            idx += 1;
            continue;
        }
        let start = idx;
        while idx < values.len() && values[idx].is_some() {
            idx += 1;
        }
        let run: Vec<f64> = values[start..idx].iter().flatten().copied().collect();
        for (offset, slot) in filtered[start..idx].iter_mut().enumerate() {
            let lo = offset.saturating_sub(radius);
            let hi = (offset + radius + 1).min(run.len());
            let mut neighbourhood = run[lo..hi].to_vec();
            neighbourhood.sort_by(f64::total_cmp);
            *slot = Some(neighbourhood[neighbourhood.len() / 2]);
        }
    }
    filtered
}
