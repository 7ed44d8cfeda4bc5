use approx::assert_relative_eq;
use tonescore::config::{AlignmentConfig, RegisterConfig};
use tonescore::pronunciation::alignment::dtw::warping_path;
use tonescore::pronunciation::alignment::{
    AlignmentStrategy, RegisterAdjustment, RegisterAligner, TrackAligner,
};
use tonescore::pronunciation::preprocess::{PitchTrackPreprocessor, PreparedTrack};
use tonescore::pronunciation::{ErrorKind, Result};
use tonescore::types::AlignmentMethod;
use tonescore::PitchTrack;

fn prepared(step: f64, values: &[Option<f64>]) -> Result<PreparedTrack> {
    PitchTrackPreprocessor::new().prepare(&PitchTrack::uniform(step, values)?)
}

fn voiced(values: impl IntoIterator<Item = f64>) -> Vec<Option<f64>> {
    values.into_iter().map(Some).collect()
}

#[test]
fn dtw_pairs_a_slow_imitation_with_the_reference() -> Result<()> {
    let reference: Vec<f64> = (0..12).map(|i| 200.0 + 5.0 * i as f64).collect();
    // every step held twice
    let learner: Vec<f64> = reference.iter().flat_map(|&v| [v + 10.0, v + 10.0]).collect();
    let outcome = TrackAligner::new(AlignmentConfig::default()).align(
        &prepared(0.01, &voiced(reference.clone()))?,
        &prepared(0.01, &voiced(learner))?,
        AlignmentStrategy::Dtw,
    );

    let pair = &outcome.pair;
    assert_eq!(pair.method, AlignmentMethod::Dtw);
    assert_eq!(pair.len(), 24);
    for (standard, user) in pair.standard.iter().zip(&pair.user) {
        assert_relative_eq!(user.unwrap() - standard.unwrap(), 10.0, epsilon = 1e-9);
    }
    assert!(matches!(outcome.register, RegisterAdjustment::Unchanged { .. }));
    Ok(())
}

#[test]
fn short_tracks_use_linear_resampling() -> Result<()> {
    let outcome = TrackAligner::new(AlignmentConfig::default()).align(
        &prepared(0.1, &voiced([200.0, 210.0, 220.0]))?,
        &prepared(0.1, &voiced([200.0, 205.0, 210.0, 215.0, 220.0]))?,
        AlignmentStrategy::Dtw,
    );
    let pair = outcome.pair;
    assert_eq!(pair.method, AlignmentMethod::Linear);
    assert_eq!(pair.len(), 100);
    assert_relative_eq!(*pair.times.last().unwrap(), 0.4, epsilon = 1e-12);
    // the standard only covers the first 0.2 s
    assert!(pair.standard.last().unwrap().is_none());
    assert!(pair.user.iter().all(Option::is_some));
    Ok(())
}

#[test]
fn interior_gaps_are_interpolated() -> Result<()> {
    let track = prepared(0.1, &[None, Some(200.0), None, None, Some(230.0), None])?;
    for (value, expected) in track.values.iter().zip([200.0, 210.0, 220.0, 230.0]) {
        assert_relative_eq!(*value, expected, epsilon = 1e-9);
    }
    assert_eq!(track.voiced, vec![true, false, false, true]);
    assert_relative_eq!(track.duration, 0.5);
    assert_eq!(track.value_at(0.0), None);
    assert_relative_eq!(track.value_at(0.25).unwrap(), 215.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn single_voiced_sample_cannot_be_prepared() {
    let err = prepared(0.1, &[None, Some(200.0), None]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientVoicing);
}

#[test]
fn dtw_rejects_empty_series() {
    let err = warping_path(&[], &[1.0, 2.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlignmentDegenerate);
}

#[test]
fn disabled_register_alignment_is_skipped() {
    let aligner = RegisterAligner::new(RegisterConfig {
        enabled: false,
        ..RegisterConfig::default()
    });
    let standard = voiced((0..10).map(|i| 200.0 + i as f64));
    let mut user = voiced((0..10).map(|i| 300.0 + i as f64));
    let before = user.clone();
    assert_eq!(aligner.align(&standard, &mut user), RegisterAdjustment::Skipped);
    assert_eq!(user, before);
}

fn ramp_with_gap(len: usize, gap: std::ops::Range<usize>) -> Vec<Option<f64>> {
    (0..len)
        .map(|i| (!gap.contains(&i)).then(|| 200.0 + i as f64))
        .collect()
}

#[test]
fn dtw_keeps_interior_gaps_unvoiced() -> Result<()> {
    let standard = prepared(0.01, &ramp_with_gap(45, 0..0))?;
    let user = prepared(0.01, &ramp_with_gap(45, 15..31))?;
    let aligner = TrackAligner::new(AlignmentConfig::default());
    let outcome = aligner.align(&standard, &user, AlignmentStrategy::Dtw);

    let pair = &outcome.pair;
    assert_eq!(pair.method, AlignmentMethod::Dtw);
    assert_eq!(pair.len(), 45);
    assert_eq!(pair.jointly_voiced_count(), 29);
    assert!(pair.user[15..31].iter().all(Option::is_none));
    Ok(())
}

#[test]
fn linear_resampling_keeps_interior_gaps_unvoiced() -> Result<()> {
    let standard = prepared(0.01, &ramp_with_gap(45, 0..0))?;
    let user = prepared(0.01, &ramp_with_gap(45, 15..31))?;
    let pair = TrackAligner::new(AlignmentConfig::default()).align_linear(&standard, &user);

    assert_eq!(pair.len(), 100);
    for (&time, value) in pair.times.iter().zip(&pair.user) {
        if time > 0.145 && time < 0.305 {
            assert!(value.is_none(), "gap position {time} should be unvoiced");
        } else if time < 0.135 || time > 0.315 {
            assert!(value.is_some(), "voiced position {time} lost");
        }
    }
    assert!(pair.jointly_voiced_count() < 70);
    Ok(())
}
