use std::f64::consts::PI;

use tonescore::pronunciation::alignment::{
    AlignmentStrategy, RegisterAdjustment, TimeSpan, TimelineSource, TimingHints,
};
use tonescore::pronunciation::quality::{QualityFlag, QualityHints};
use tonescore::pronunciation::scoring::ScoreLevel;
use tonescore::pronunciation::tone::ToneLabel;
use tonescore::pronunciation::{ErrorKind, Result};
use tonescore::types::AlignmentMethod;
use tonescore::{compare, CompareOptions, PitchComparator, PitchTrack};

fn track(step: f64, values: &[f64]) -> PitchTrack {
    let freqs: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    PitchTrack::uniform(step, &freqs).unwrap()
}

fn arch(len: usize, offset: f64) -> Vec<f64> {
    (0..len)
        .map(|i| 200.0 + 40.0 * (PI * i as f64 / (len - 1) as f64).sin() + offset)
        .collect()
}

#[test]
fn identical_tracks_score_excellent() -> Result<()> {
    let standard = track(0.1, &[200.0, 205.0, 210.0, 215.0, 220.0]);
    let comparison = compare(&standard, &standard, &CompareOptions::default())?;

    assert!(comparison.score.total_score >= 90.0);
    assert_eq!(comparison.score.level, ScoreLevel::Excellent);
    assert!((comparison.metrics.correlation - 1.0).abs() < 1e-9);
    assert!(comparison.metrics.rmse_hz < 1e-9);
    assert_eq!(comparison.quality.flag, QualityFlag::Ok);
    Ok(())
}

#[test]
fn level_tone_copied_exactly_scores_excellent() -> Result<()> {
    let standard = track(0.01, &[250.0; 30]);
    let comparison = compare(&standard, &standard, &CompareOptions::default())?;

    assert_eq!(comparison.metrics.correlation, 1.0);
    assert!(comparison.metrics.rmse_hz < 1e-9);
    assert!(comparison.score.total_score >= 90.0);
    assert_eq!(comparison.score.level, ScoreLevel::Excellent);
    Ok(())
}

#[test]
fn close_imitation_scores_good_or_better() -> Result<()> {
    let standard = track(0.1, &[200.0, 205.0, 210.0, 215.0, 220.0]);
    let user = track(0.1, &[198.0, 206.0, 212.0, 214.0, 221.0]);
    let comparison = compare(&standard, &user, &CompareOptions::default())?;

    println!(
        "close imitation corr={:.3} score={:.1}",
        comparison.metrics.correlation, comparison.score.total_score
    );
    assert!(comparison.metrics.correlation > 0.98);
    assert!(comparison.score.total_score > 85.0);
    assert!(matches!(
        comparison.score.level,
        ScoreLevel::Good | ScoreLevel::Excellent
    ));
    // five samples are too few for DTW
    assert_eq!(comparison.aligned.method, AlignmentMethod::Linear);
    Ok(())
}

#[test]
fn flat_against_falling_scores_low() -> Result<()> {
    let standard = track(0.1, &[220.0; 5]);
    let user = track(0.1, &[260.0, 240.0, 220.0, 200.0, 180.0]);
    let comparison = compare(&standard, &user, &CompareOptions::default())?;

    assert!(comparison.metrics.trend_consistency < 0.3);
    assert!(comparison.score.total_score < 50.0);
    Ok(())
}

#[test]
fn barely_voiced_user_scores_zero() -> Result<()> {
    let standard = track(0.1, &[200.0, 205.0, 210.0, 215.0, 220.0]);
    let mut user: Vec<Option<f64>> = vec![None; 95];
    user.extend([200.0, 205.0, 210.0, 215.0, 220.0].map(Some));
    let user = PitchTrack::uniform(0.01, &user)?;
    let comparison = compare(&standard, &user, &CompareOptions::default())?;

    assert_eq!(comparison.quality.flag, QualityFlag::InsufficientSpeech);
    assert_eq!(comparison.score.total_score, 0.0);
    assert_eq!(comparison.score.level, ScoreLevel::NeedsImprovement);
    assert_eq!(comparison.aligned.method, AlignmentMethod::None);
    assert!(!comparison.score.feedback.is_empty());
    Ok(())
}

#[test]
fn silent_recording_is_flagged() -> Result<()> {
    let standard = track(0.1, &[200.0, 205.0, 210.0, 215.0, 220.0]);
    let options = CompareOptions {
        quality_hints: QualityHints {
            energy: Some(0.001),
            ..QualityHints::default()
        },
        ..CompareOptions::default()
    };
    let comparison = compare(&standard, &standard, &options)?;
    assert_eq!(comparison.quality.flag, QualityFlag::SilenceDetected);
    assert_eq!(comparison.score.total_score, 0.0);
    Ok(())
}

#[test]
fn disjoint_voicing_is_insufficient_data() -> Result<()> {
    let standard = track(0.1, &[200.0, 210.0]);
    let user = PitchTrack::uniform(
        0.1,
        &[None, None, None, None, None, Some(200.0), Some(210.0)],
    )?;
    let comparison = compare(&standard, &user, &CompareOptions::default())?;

    assert!(comparison.metrics.degenerate);
    assert_eq!(comparison.quality.flag, QualityFlag::InsufficientData);
    assert_eq!(comparison.score.total_score, 0.0);
    Ok(())
}

#[test]
fn comparison_is_deterministic() -> Result<()> {
    let standard = track(0.01, &arch(30, 0.0));
    let user = track(0.01, &arch(45, 3.0));
    let comparator = PitchComparator::default();
    let options = CompareOptions::default();

    let first = comparator.compare(&standard, &user, &options)?;
    let second = comparator.compare(&standard, &user, &options)?;
    assert_eq!(first.score, second.score);
    assert_eq!(first.aligned, second.aligned);
    assert_eq!(first.metrics, second.metrics);
    Ok(())
}

#[test]
fn dtw_absorbs_tempo_differences() -> Result<()> {
    let standard = track(0.01, &arch(30, 0.0));
    let user = track(0.01, &arch(45, 3.0));
    let comparator = PitchComparator::default();

    let warped = comparator.compare(&standard, &user, &CompareOptions::default())?;
    let linear = comparator.compare(
        &standard,
        &user,
        &CompareOptions {
            strategy: AlignmentStrategy::Linear,
            ..CompareOptions::default()
        },
    )?;

    assert_eq!(warped.aligned.method, AlignmentMethod::Dtw);
    assert_eq!(linear.aligned.method, AlignmentMethod::Linear);
    assert!(warped.metrics.correlation > 0.99);
    assert!(warped.metrics.correlation > linear.metrics.correlation);
    assert!(warped.score.total_score > linear.score.total_score);
    Ok(())
}

#[test]
fn register_offset_is_shifted_toward_reference() -> Result<()> {
    let base: Vec<f64> = (0..20).map(|i| 200.0 + 15.0 * i as f64 / 19.0).collect();
    let raised: Vec<f64> = base.iter().map(|v| v + 40.0).collect();
    let comparison = compare(
        &track(0.01, &base),
        &track(0.01, &raised),
        &CompareOptions::default(),
    )?;

    let RegisterAdjustment::Shifted {
        baseline_diff,
        shift_hz,
        ..
    } = comparison.register
    else {
        panic!("expected a register shift, got {:?}", comparison.register);
    };
    assert!((baseline_diff - 40.0).abs() < 1e-6);
    assert!((shift_hz - 20.0).abs() < 1e-6);
    assert!((comparison.metrics.rmse_hz - 20.0).abs() < 1e-6);

    let unshifted = compare(
        &track(0.01, &base),
        &track(0.01, &base),
        &CompareOptions::default(),
    )?;
    assert!(unshifted.score.total_score - comparison.score.total_score <= 1.0);
    Ok(())
}

#[test]
fn single_sample_track_is_rejected() {
    let standard = track(0.1, &[200.0, 205.0, 210.0]);
    let user = track(0.1, &[200.0]);
    let err = compare(&standard, &user, &CompareOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientVoicing);
}

#[test]
fn expected_tones_add_syllable_analysis() -> Result<()> {
    let contour: Vec<f64> = (0..40)
        .map(|i| {
            if i < 20 {
                180.0 + 4.0 * i as f64
            } else {
                260.0 - 4.0 * (i - 20) as f64
            }
        })
        .collect();
    let standard = track(0.01, &contour);
    let options = CompareOptions {
        expected_tones: vec![ToneLabel::Rising, ToneLabel::Falling],
        ..CompareOptions::default()
    };
    let comparison = compare(&standard, &standard, &options)?;

    let analysis = comparison
        .score
        .tone_analysis
        .as_ref()
        .expect("tone analysis present");
    assert_eq!(analysis.syllables.len(), 2);
    assert!(comparison.score.tone_enhancement <= 10.0);
    assert!(comparison.score.component_scores.trend <= 100.0);
    Ok(())
}

#[test]
fn speech_segments_remap_user_onto_reference_timeline() -> Result<()> {
    let contour: Vec<f64> = (0..21).map(|i| 200.0 + 2.0 * i as f64).collect();
    let standard = track(0.05, &contour);
    let mut user: Vec<Option<f64>> = vec![None; 10];
    user.extend(contour.iter().copied().map(Some));
    user.extend(vec![None; 10]);
    let user = PitchTrack::uniform(0.05, &user)?;

    let options = CompareOptions {
        timing: TimingHints {
            reference_duration: Some(1.0),
            speech_segments: vec![TimeSpan::new(0.5, 1.5)],
            ..TimingHints::default()
        },
        ..CompareOptions::default()
    };
    let comparison = compare(&standard, &user, &options)?;

    let plan = comparison.timeline.expect("timeline plan");
    assert_eq!(plan.source, TimelineSource::Vad);
    assert!((plan.scaling_factor - 1.0).abs() < 1e-9);
    assert!(comparison
        .aligned
        .times
        .iter()
        .all(|&t| (0.0..=1.0 + 1e-6).contains(&t)));
    assert!(comparison.score.total_score >= 90.0);
    Ok(())
}

#[test]
fn comparison_serializes_to_json() -> Result<()> {
    let standard = track(0.1, &[200.0, 205.0, 210.0, 215.0, 220.0]);
    let comparison = compare(&standard, &standard, &CompareOptions::default())?;
    let json = serde_json::to_value(&comparison).expect("serialize");
    assert_eq!(json["aligned"]["method"], "linear");
    assert_eq!(json["score"]["level"], "excellent");
    assert_eq!(json["quality"]["flag"], "ok");
    assert_eq!(json["register"]["kind"], "unchanged");
    Ok(())
}
