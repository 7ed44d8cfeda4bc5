pub mod dtw;
pub mod register;
pub mod timeline;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AlignmentConfig;
use crate::pronunciation::preprocess::PreparedTrack;
use crate::pronunciation::Result;
use crate::types::{AlignedPitchPair, AlignmentMethod};

pub use register::{PitchStatistics, RegisterAdjustment, RegisterAligner};
pub use timeline::{TimeSpan, TimelinePlan, TimelineSource, TimingHints};

/// Requested time-alignment strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentStrategy {
    /// DTW when both tracks are long enough, linear resampling otherwise.
    #[default]
    Dtw,
    Linear,
}

/// Output of [`TrackAligner::align`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutcome {
    pub pair: AlignedPitchPair,
    pub register: RegisterAdjustment,
}

/// Aligns a prepared user track to a prepared standard track in time and
/// register.
#[derive(Debug, Clone, Default)]
pub struct TrackAligner {
    config: AlignmentConfig,
    register: RegisterAligner,
}

impl TrackAligner {
    pub fn new(config: AlignmentConfig) -> Self {
        let register = RegisterAligner::new(config.register.clone());
        Self { config, register }
    }

    pub fn align(
        &self,
        standard: &PreparedTrack,
        user: &PreparedTrack,
        strategy: AlignmentStrategy,
    ) -> AlignmentOutcome {
        let mut pair = if self.use_dtw(standard, user, strategy) {
            match self.align_dtw(standard, user) {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "DTW alignment failed, using linear resampling");
                    self.align_linear(standard, user)
                }
            }
        } else {
            self.align_linear(standard, user)
        };

        if pair.jointly_voiced_count() == 0 {
            debug!(method = ?pair.method, "aligned pair has no jointly voiced samples");
        }
        let register = self.register.align(&pair.standard, &mut pair.user);
        info!(
            method = ?pair.method,
            len = pair.len(),
            register = ?register,
            "aligned pitch tracks"
        );
        AlignmentOutcome { pair, register }
    }

    fn use_dtw(
        &self,
        standard: &PreparedTrack,
        user: &PreparedTrack,
        strategy: AlignmentStrategy,
    ) -> bool {
        strategy == AlignmentStrategy::Dtw
            && self.config.dtw_enabled
            && standard.len() > self.config.dtw_min_samples
            && user.len() > self.config.dtw_min_samples
    }

    /// Pairs samples along the DTW path of the z-normalized curves. The time
    /// axis is ordinal: path positions spread evenly over the longer duration.
    /// Positions that land on a filled gap sample stay `None`.
    pub fn align_dtw(
        &self,
        standard: &PreparedTrack,
        user: &PreparedTrack,
    ) -> Result<AlignedPitchPair> {
        let alignment = dtw::warping_path(
            &dtw::znormalize(&standard.values),
            &dtw::znormalize(&user.values),
        )?;
        let duration = standard.duration.max(user.duration);
        let times = linspace(0.0, duration, alignment.path.len());
        let (std_values, user_values) = alignment
            .path
            .iter()
            .map(|&(i, j)| (standard.voiced_value(i), user.voiced_value(j)))
            .unzip();
        debug!(
            path_len = alignment.path.len(),
            total_cost = alignment.total_cost,
            "computed DTW path"
        );
        Ok(AlignedPitchPair {
            times,
            standard: std_values,
            user: user_values,
            method: AlignmentMethod::Dtw,
        })
    }

    /// Resamples both curves onto `[0, max(duration)]`. Positions outside a
    /// track's voiced span or inside one of its gaps stay `None`.
    pub fn align_linear(
        &self,
        standard: &PreparedTrack,
        user: &PreparedTrack,
    ) -> AlignedPitchPair {
        let duration = standard.duration.max(user.duration);
        if !(duration > 0.0) {
            return AlignedPitchPair::empty(AlignmentMethod::Linear);
        }
        let len = standard
            .source_len
            .max(user.source_len)
            .max(self.config.linear_min_points);
        let times = linspace(0.0, duration, len);
        AlignedPitchPair {
            standard: times.iter().map(|&t| standard.voiced_value_at(t)).collect(),
            user: times.iter().map(|&t| user.voiced_value_at(t)).collect(),
            times,
            method: AlignmentMethod::Linear,
        }
    }
}

/// `len` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (len - 1) as f64;
            (0..len).map(|i| start + step * i as f64).collect()
        }
    }
}
