use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pronunciation::Result;
use crate::types::{PitchSample, PitchTrack};

const MIN_SPAN_SECONDS: f64 = 1e-6;

/// Closed time interval in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.end > self.start
    }
}

/// Speech timing produced upstream by TTS playback, ASR and VAD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingHints {
    /// Effective duration of the reference audio.
    pub reference_duration: Option<f64>,
    /// Word timestamps recognised in the user recording.
    pub word_spans: Vec<TimeSpan>,
    /// Voice activity segments of the user recording.
    pub speech_segments: Vec<TimeSpan>,
}

impl TimingHints {
    pub fn is_empty(&self) -> bool {
        self.reference_duration.is_none()
            && self.word_spans.is_empty()
            && self.speech_segments.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineSource {
    Asr,
    Vad,
    Duration,
    Uniform,
}

/// How the user recording maps onto the reference timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePlan {
    pub source: TimelineSource,
    pub reference_duration: f64,
    pub user_start: f64,
    pub user_end: f64,
    /// User speech span divided by the reference duration.
    pub scaling_factor: f64,
    pub time_offset: f64,
}

impl TimelinePlan {
    /// Picks the most specific timing available: ASR words, then VAD
    /// segments, then the whole user track.
    pub fn resolve(hints: &TimingHints, standard: &PitchTrack, user: &PitchTrack) -> Self {
        let reference_duration = hints
            .reference_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| standard.duration());

        let (source, span) = if let Some(span) = enclosing_span(&hints.word_spans) {
            (TimelineSource::Asr, span)
        } else if let Some(span) = enclosing_span(&hints.speech_segments) {
            (TimelineSource::Vad, span)
        } else if user.duration() > MIN_SPAN_SECONDS {
            (TimelineSource::Duration, TimeSpan::new(0.0, user.duration()))
        } else {
            (TimelineSource::Uniform, TimeSpan::new(0.0, reference_duration))
        };

        let span_len = span.end - span.start;
        let scaling_factor = if reference_duration > MIN_SPAN_SECONDS {
            span_len / reference_duration
        } else {
            1.0
        };
        let plan = Self {
            source,
            reference_duration,
            user_start: span.start,
            user_end: span.end,
            scaling_factor,
            time_offset: span.start,
        };
        debug!(
            source = ?plan.source,
            user_start = plan.user_start,
            user_end = plan.user_end,
            scaling_factor = plan.scaling_factor,
            "resolved timeline plan"
        );
        plan
    }

    /// Truncates the standard track to the reference duration and remaps
    /// the user speech span onto `[0, reference_duration]`.
    pub fn apply(
        &self,
        standard: &PitchTrack,
        user: &PitchTrack,
    ) -> Result<(PitchTrack, PitchTrack)> {
        let standard = if self.reference_duration > MIN_SPAN_SECONDS {
            standard.truncated(self.reference_duration + MIN_SPAN_SECONDS)
        } else {
            standard.clone()
        };

        let span = self.user_end - self.user_start;
        if self.source == TimelineSource::Uniform
            || span <= MIN_SPAN_SECONDS
            || self.reference_duration <= MIN_SPAN_SECONDS
        {
            return Ok((standard, user.clone()));
        }

        let remapped: Vec<PitchSample> = user
            .samples()
            .iter()
            .filter(|s| {
                s.time >= self.user_start - MIN_SPAN_SECONDS
                    && s.time <= self.user_end + MIN_SPAN_SECONDS
            })
            .map(|s| PitchSample {
                time: ((s.time - self.user_start) / span).clamp(0.0, 1.0) * self.reference_duration,
                frequency: s.frequency,
            })
            .collect();
        Ok((standard, PitchTrack::new(dedup_times(remapped))?))
    }
}

fn enclosing_span(spans: &[TimeSpan]) -> Option<TimeSpan> {
    let valid = spans.iter().filter(|s| s.is_valid());
    let start = valid.clone().map(|s| s.start).min_by(f64::total_cmp)?;
    let end = valid.map(|s| s.end).max_by(f64::total_cmp)?;
    (end - start > MIN_SPAN_SECONDS).then(|| TimeSpan::new(start, end))
}

/// Clamping can collapse the first and last samples onto the span edges.
fn dedup_times(samples: Vec<PitchSample>) -> Vec<PitchSample> {
    let mut out: Vec<PitchSample> = Vec::with_capacity(samples.len());
    for sample in samples {
        match out.last() {
            Some(prev) if sample.time <= prev.time => {}
            _ => out.push(sample),
        }
    }
    out
}
