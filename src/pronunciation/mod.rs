pub mod alignment;
pub mod cli;
pub mod metrics;
pub mod preprocess;
pub mod quality;
pub mod report;
pub mod scoring;
pub mod tone;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::types::{AlignedPitchPair, AlignmentMethod, PitchTrack};
use alignment::{
    AlignmentOutcome, AlignmentStrategy, RegisterAdjustment, TimelinePlan, TimingHints,
    TrackAligner,
};
use metrics::{ComparisonMetrics, MetricsEngine};
use preprocess::PitchTrackPreprocessor;
use quality::{QualityFlag, QualityGate, QualityHints, QualityReport};
use report::DetailedAnalysis;
use scoring::{ScoreResult, Scorer};
use tone::{ToneAnalysis, ToneClassifier, ToneLabel, ToneObservation};

/// Convenient alias for results returned by pronunciation modules.
pub type Result<T> = std::result::Result<T, PronunciationError>;

/// Broad failure category, matchable without inspecting the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed pitch track (times not finite or not increasing).
    InvalidTrack,
    /// Fewer than two voiced samples reached the preprocessor.
    InsufficientVoicing,
    /// DTW produced no usable path.
    AlignmentDegenerate,
    InvalidConfig,
    /// Pitch extraction from a waveform failed.
    Extraction,
}

/// Lightweight error type for the pronunciation pipeline.
#[derive(Debug, Clone)]
pub struct PronunciationError {
    kind: ErrorKind,
    message: Arc<str>,
}

impl PronunciationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Arc::from(message.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for PronunciationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for PronunciationError {}

/// Optional inputs of a comparison.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// One expected tone per syllable.
    pub expected_tones: Vec<ToneLabel>,
    pub quality_hints: QualityHints,
    pub strategy: AlignmentStrategy,
    pub timing: TimingHints,
}

/// Everything produced by one comparison.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub aligned: AlignedPitchPair,
    pub metrics: ComparisonMetrics,
    pub quality: QualityReport,
    pub analysis: DetailedAnalysis,
    pub score: ScoreResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<TimelinePlan>,
    pub register: RegisterAdjustment,
}

/// Runs the full pipeline with a shared, read-only configuration.
///
/// Holds no mutable state, so one comparator can serve any number of threads.
#[derive(Debug, Clone)]
pub struct PitchComparator {
    config: Arc<EngineConfig>,
    preprocessor: PitchTrackPreprocessor,
    aligner: TrackAligner,
    metrics: MetricsEngine,
    classifier: ToneClassifier,
    gate: QualityGate,
    scorer: Scorer,
}

impl Default for PitchComparator {
    fn default() -> Self {
        Self::new(Arc::new(EngineConfig::default()))
    }
}

impl PitchComparator {
    /// Builds a comparator without validating the configuration.
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            preprocessor: PitchTrackPreprocessor::new(),
            aligner: TrackAligner::new(config.alignment.clone()),
            metrics: MetricsEngine::new(),
            classifier: ToneClassifier::new(config.tone.clone()),
            gate: QualityGate::new(config.quality.clone()),
            scorer: Scorer::new(config.scoring.clone(), config.feedback.locale),
            config,
        }
    }

    pub fn try_new(config: Arc<EngineConfig>) -> Result<Self> {
        config
            .validate()
            .map_err(|err| PronunciationError::new(ErrorKind::InvalidConfig, format!("{err:#}")))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compares a user pitch track against a standard one.
    ///
    /// Quality problems are reported through a zero score, not an `Err`;
    /// errors are reserved for malformed input.
    pub fn compare(
        &self,
        standard: &PitchTrack,
        user: &PitchTrack,
        options: &CompareOptions,
    ) -> Result<Comparison> {
        let (timeline, standard, user) = if options.timing.is_empty() {
            (None, standard.clone(), user.clone())
        } else {
            let plan = TimelinePlan::resolve(&options.timing, standard, user);
            let (standard, user) = plan.apply(standard, user)?;
            (Some(plan), standard, user)
        };

        let pre_report = self
            .gate
            .pre_check(&standard, &user, &options.quality_hints);
        if pre_report.flag != QualityFlag::Ok {
            warn!(flag = ?pre_report.flag, "quality gate rejected input before alignment");
            let metrics = ComparisonMetrics::degenerate();
            let score = self.scorer.score(&metrics, None, Some(&pre_report));
            return Ok(Comparison {
                aligned: AlignedPitchPair::empty(AlignmentMethod::None),
                analysis: DetailedAnalysis::build(&standard, &user, AlignmentMethod::None),
                metrics,
                quality: pre_report,
                score,
                timeline,
                register: RegisterAdjustment::Skipped,
            });
        }

        let AlignmentOutcome { pair, register } =
            self.align(&standard, &user, options.strategy)?;
        let metrics = self.metrics.compute(&pair);
        let quality = self.gate.post_check(pre_report, metrics.valid_point_count);

        let tones = (!options.expected_tones.is_empty())
            .then(|| self.classifier.analyze(&user, &options.expected_tones));
        let score = self.scorer.score(&metrics, tones.as_ref(), Some(&quality));
        info!(
            total_score = score.total_score,
            level = ?score.level,
            method = ?pair.method,
            "comparison finished"
        );
        Ok(Comparison {
            analysis: DetailedAnalysis::build(&standard, &user, pair.method),
            aligned: pair,
            metrics,
            quality,
            score,
            timeline,
            register,
        })
    }

    /// Prepares both tracks and aligns them in time and register.
    pub fn align(
        &self,
        standard: &PitchTrack,
        user: &PitchTrack,
        strategy: AlignmentStrategy,
    ) -> Result<AlignmentOutcome> {
        let standard = self.preprocessor.prepare(standard)?;
        let user = self.preprocessor.prepare(user)?;
        Ok(self.aligner.align(&standard, &user, strategy))
    }

    pub fn compute_metrics(&self, pair: &AlignedPitchPair) -> ComparisonMetrics {
        self.metrics.compute(pair)
    }

    pub fn classify_tone(&self, values: &[f64], times: &[f64]) -> ToneObservation {
        self.classifier.classify(values, times)
    }

    pub fn analyze_tones(&self, track: &PitchTrack, expected: &[ToneLabel]) -> ToneAnalysis {
        self.classifier.analyze(track, expected)
    }

    pub fn score(
        &self,
        metrics: &ComparisonMetrics,
        tones: Option<&ToneAnalysis>,
        quality: Option<&QualityReport>,
    ) -> ScoreResult {
        self.scorer.score(metrics, tones, quality)
    }
}

/// One-off comparison with the default configuration.
pub fn compare(
    standard: &PitchTrack,
    user: &PitchTrack,
    options: &CompareOptions,
) -> Result<Comparison> {
    PitchComparator::default().compare(standard, user, options)
}
