use serde::Serialize;

use crate::types::{AlignmentMethod, PitchTrack};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationComparison {
    pub standard: f64,
    pub user: f64,
    /// user / standard, 0 when the standard has no duration.
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchSummary {
    pub mean: f64,
    pub std: f64,
    pub valid_ratio: f64,
}

impl PitchSummary {
    fn of(track: &PitchTrack) -> Self {
        let voiced = track.voiced_values();
        let (mean, std) = if voiced.is_empty() {
            (0.0, 0.0)
        } else {
            let len = voiced.len() as f64;
            let mean = voiced.iter().sum::<f64>() / len;
            let var = voiced.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len;
            (mean, var.sqrt())
        };
        Self {
            mean,
            std,
            valid_ratio: track.valid_ratio(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingQuality {
    Good,
    Fair,
    Poor,
}

impl RecordingQuality {
    pub fn from_valid_ratio(ratio: f64) -> Self {
        if ratio > 0.7 {
            Self::Good
        } else if ratio > 0.4 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Re-record somewhere quiet, speaking clearly.
    RecordAgain,
    /// Move closer to the microphone or speak louder.
    SpeakCloser,
    Acceptable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityAssessment {
    pub standard: RecordingQuality,
    pub user: RecordingQuality,
    pub recommendation: Recommendation,
}

/// Descriptive statistics reported next to the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedAnalysis {
    pub duration: DurationComparison,
    pub standard: PitchSummary,
    pub user: PitchSummary,
    pub quality: QualityAssessment,
    pub alignment_method: AlignmentMethod,
}

impl DetailedAnalysis {
    pub fn build(standard: &PitchTrack, user: &PitchTrack, method: AlignmentMethod) -> Self {
        let standard_duration = standard.duration();
        let user_duration = user.duration();
        let ratio = if standard_duration > 0.0 {
            user_duration / standard_duration
        } else {
            0.0
        };
        let standard_summary = PitchSummary::of(standard);
        let user_summary = PitchSummary::of(user);
        let recommendation = if user_summary.valid_ratio < 0.4 {
            Recommendation::RecordAgain
        } else if user_summary.valid_ratio < 0.7 {
            Recommendation::SpeakCloser
        } else {
            Recommendation::Acceptable
        };
        Self {
            duration: DurationComparison {
                standard: standard_duration,
                user: user_duration,
                ratio,
            },
            quality: QualityAssessment {
                standard: RecordingQuality::from_valid_ratio(standard_summary.valid_ratio),
                user: RecordingQuality::from_valid_ratio(user_summary.valid_ratio),
                recommendation,
            },
            standard: standard_summary,
            user: user_summary,
            alignment_method: method,
        }
    }
}
