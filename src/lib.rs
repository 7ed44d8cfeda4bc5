//! Pitch-contour comparison and tone scoring for Mandarin pronunciation practice.
//!
//! The [`pronunciation`] module holds the comparison engine: it takes a
//! reference pitch track and a learner pitch track, aligns them, computes
//! contour metrics, classifies syllable tones and produces a 0-100 score with
//! feedback. [`extraction`] and [`audio`] provide the pitch-extraction
//! collaborator used by the command-line tool.

pub mod audio;
pub mod config;
pub mod extraction;
pub mod pronunciation;
pub mod types;

pub use config::EngineConfig;
pub use pronunciation::{compare, CompareOptions, Comparison, PitchComparator};
pub use types::{AlignedPitchPair, PitchSample, PitchTrack};
