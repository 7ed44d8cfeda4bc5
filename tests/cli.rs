use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tracks")
        .join(name)
}

fn tonescore() -> Command {
    Command::cargo_bin("tonescore").expect("tonescore binary")
}

/// Writes a mono 16-bit glide from `start_hz` to `end_hz`.
fn write_glide(path: &Path, start_hz: f32, end_hz: f32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    let total = (spec.sample_rate as f32 * seconds) as usize;
    let mut phase = 0.0f32;
    for n in 0..total {
        let progress = n as f32 / total as f32;
        let freq = start_hz + (end_hz - start_hz) * progress;
        phase += 2.0 * PI * freq / spec.sample_rate as f32;
        let sample = 0.3 * phase.sin();
        writer
            .write_sample((sample * i16::MAX as f32) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

#[test]
fn compare_prints_comparison_json() {
    let output = tonescore()
        .args(["compare", "--standard"])
        .arg(fixture("standard.json"))
        .arg("--user")
        .arg(fixture("user.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(json["aligned"]["method"], "linear");
    assert_eq!(json["quality"]["flag"], "ok");
    assert!(json["score"]["total_score"].as_f64().unwrap() > 85.0);
}

#[test]
fn compare_with_tones_reports_syllables_in_chinese() {
    tonescore()
        .args(["compare", "--standard"])
        .arg(fixture("standard.json"))
        .arg("--user")
        .arg(fixture("user.json"))
        .args(["--tones", "2", "--locale", "zh", "--strategy", "linear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tone_analysis\""))
        .stdout(predicate::str::contains("\"expected\": 2"));
}

#[test]
fn low_energy_hint_is_reported_as_silence() {
    tonescore()
        .args(["compare", "--standard"])
        .arg(fixture("standard.json"))
        .arg("--user")
        .arg(fixture("user.json"))
        .args(["--energy", "0.0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"silence_detected\""));
}

#[test]
fn malformed_track_fails_with_context() {
    tonescore()
        .args(["compare", "--standard"])
        .arg(fixture("malformed.json"))
        .arg("--user")
        .arg(fixture("user.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse pitch track"));
}

#[test]
fn missing_track_file_fails() {
    tonescore()
        .args(["compare", "--standard", "nope.json", "--user", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read pitch track"));
}

#[test]
fn config_prints_default_toml() {
    let output = tonescore()
        .arg("config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("[scoring.weights]"));
    let parsed = tonescore::EngineConfig::from_toml_str(&text).expect("round trip");
    assert_eq!(parsed, tonescore::EngineConfig::default());
}

#[test]
fn custom_config_file_is_honoured() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("engine.toml");
    std::fs::write(&config, "[feedback]\nlocale = \"zh\"\n").unwrap();
    tonescore()
        .args(["compare", "--standard"])
        .arg(fixture("standard.json"))
        .arg("--user")
        .arg(fixture("user.json"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("音调"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    tonescore()
        .args(["compare", "--standard"])
        .arg(fixture("standard.json"))
        .arg("--user")
        .arg(fixture("user.json"))
        .arg("--config")
        .arg(dir.path().join("engnie.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read engine config"));
}

#[test]
fn extract_prints_a_track_for_a_wav_file() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("glide.wav");
    write_glide(&wav, 180.0, 260.0, 0.8);

    let output = tonescore()
        .arg("extract")
        .arg("--input")
        .arg(&wav)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let track: tonescore::PitchTrack = serde_json::from_slice(&output).expect("track json");
    assert!(!track.is_empty());
}

#[test]
fn analyze_compares_two_recordings() {
    let dir = TempDir::new().unwrap();
    let standard = dir.path().join("standard.wav");
    let user = dir.path().join("user.wav");
    write_glide(&standard, 180.0, 260.0, 0.8);
    write_glide(&user, 170.0, 250.0, 0.9);

    tonescore()
        .args(["analyze", "--standard"])
        .arg(&standard)
        .arg("--user")
        .arg(&user)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_score\""));
}
