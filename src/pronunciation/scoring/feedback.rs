//! Localized coaching text.

use crate::config::Locale;
use crate::pronunciation::quality::{QualityFlag, QualityWarning};
use crate::pronunciation::tone::{ToneAnalysis, ToneLabel};

use super::{ComponentScores, ScoreLevel};

const CALLOUT_THRESHOLD: f64 = 60.0;

/// Explains why the quality gate rejected the input.
pub fn gate_message(flag: QualityFlag, locale: Locale) -> String {
    let text = match (flag, locale) {
        (QualityFlag::Ok, Locale::En) => "Recording accepted.",
        (QualityFlag::Ok, Locale::Zh) => "录音有效。",
        (QualityFlag::InsufficientData, Locale::En) => {
            "Too little overlapping pitch to compare. Please record the whole phrase again, speaking clearly and a little longer."
        }
        (QualityFlag::InsufficientData, Locale::Zh) => {
            "可比较的有效音高数据太少，请完整、清晰地重新朗读一遍。"
        }
        (QualityFlag::InsufficientSpeech, Locale::En) => {
            "Not enough voiced speech was detected. Move closer to the microphone and speak louder."
        }
        (QualityFlag::InsufficientSpeech, Locale::Zh) => {
            "检测到的有效语音太少，请靠近麦克风并提高音量。"
        }
        (QualityFlag::SilenceDetected, Locale::En) => {
            "The recording is silent. Check that the microphone is working and try again."
        }
        (QualityFlag::SilenceDetected, Locale::Zh) => "录音几乎没有声音，请检查麦克风后重试。",
    };
    text.to_string()
}

pub fn level_sentence(level: ScoreLevel, locale: Locale) -> &'static str {
    match (level, locale) {
        (ScoreLevel::Excellent, Locale::En) => "Excellent! Your pitch closely follows the reference.",
        (ScoreLevel::Excellent, Locale::Zh) => "优秀！您的音调与标准发音非常接近。",
        (ScoreLevel::Good, Locale::En) => "Good job. Your pitch contour is close to the reference.",
        (ScoreLevel::Good, Locale::Zh) => "良好，您的音调曲线与标准发音比较接近。",
        (ScoreLevel::Fair, Locale::En) => "Fair. The main pitch movements are there but need polish.",
        (ScoreLevel::Fair, Locale::Zh) => "中等，主要的音调变化已经具备，还需要打磨。",
        (ScoreLevel::Pass, Locale::En) => "Pass. Keep practicing the pitch changes.",
        (ScoreLevel::Pass, Locale::Zh) => "及格，请继续练习音调的升降。",
        (ScoreLevel::NeedsImprovement, Locale::En) => {
            "Needs improvement. Listen to the reference again and imitate its rises and falls."
        }
        (ScoreLevel::NeedsImprovement, Locale::Zh) => {
            "需要改进，请再听一遍标准发音，模仿它的升降变化。"
        }
    }
}

pub fn tone_hint(tone: ToneLabel, locale: Locale) -> &'static str {
    match (tone, locale) {
        (ToneLabel::Neutral, Locale::En) => "keep it light and short",
        (ToneLabel::Neutral, Locale::Zh) => "读得轻而短",
        (ToneLabel::HighLevel, Locale::En) => "stay high and level without rising or falling",
        (ToneLabel::HighLevel, Locale::Zh) => "保持音高平稳，不要有明显升降",
        (ToneLabel::Rising, Locale::En) => "rise from low to high, like asking a question",
        (ToneLabel::Rising, Locale::Zh) => "音调从低往高上升，像疑问句",
        (ToneLabel::Dipping, Locale::En) => "dip down first, then rise clearly",
        (ToneLabel::Dipping, Locale::Zh) => "先轻微下降，然后明显上升",
        (ToneLabel::Falling, Locale::En) => "fall sharply from high to low",
        (ToneLabel::Falling, Locale::Zh) => "音调从高往低下降，要有力",
    }
}

fn tone_name(tone: ToneLabel, locale: Locale) -> &'static str {
    match (tone, locale) {
        (ToneLabel::Neutral, Locale::En) => "neutral tone",
        (ToneLabel::HighLevel, Locale::En) => "first tone",
        (ToneLabel::Rising, Locale::En) => "second tone",
        (ToneLabel::Dipping, Locale::En) => "third tone",
        (ToneLabel::Falling, Locale::En) => "fourth tone",
        (ToneLabel::Neutral, Locale::Zh) => "轻声",
        (ToneLabel::HighLevel, Locale::Zh) => "阴平(一声)",
        (ToneLabel::Rising, Locale::Zh) => "阳平(二声)",
        (ToneLabel::Dipping, Locale::Zh) => "上声(三声)",
        (ToneLabel::Falling, Locale::Zh) => "去声(四声)",
    }
}

/// Level sentence, weak-component callouts and per-syllable hints, one per
/// line.
pub fn compose(
    level: ScoreLevel,
    components: &ComponentScores,
    tones: Option<&ToneAnalysis>,
    locale: Locale,
) -> String {
    let mut lines = vec![level_sentence(level, locale).to_string()];
    if components.trend < CALLOUT_THRESHOLD {
        lines.push(
            match locale {
                Locale::En => "Focus on the direction of each pitch change: rise where the reference rises and fall where it falls.",
                Locale::Zh => "请注意音调变化的方向：标准发音上升时上升，下降时下降。",
            }
            .to_string(),
        );
    }
    if components.accuracy < CALLOUT_THRESHOLD {
        lines.push(
            match locale {
                Locale::En => "The overall pitch shape differs from the reference. Try to copy its melody more closely.",
                Locale::Zh => "整体音调形状与标准发音差别较大，请尽量模仿它的旋律。",
            }
            .to_string(),
        );
    }
    if let Some(tones) = tones {
        for syllable in tones.syllables.iter().filter(|s| !s.comparison.is_match) {
            let number = syllable.index + 1;
            let expected = syllable.expected;
            let detected = syllable.detected.label;
            lines.push(match locale {
                Locale::En => format!(
                    "Syllable {number}: expected {}, heard {}. Tip: {}.",
                    tone_name(expected, locale),
                    tone_name(detected, locale),
                    tone_hint(expected, locale)
                ),
                Locale::Zh => format!(
                    "第{number}个字应该是{}，您发的是{}。建议：{}。",
                    tone_name(expected, locale),
                    tone_name(detected, locale),
                    tone_hint(expected, locale)
                ),
            });
        }
    }
    lines.join("\n")
}

/// Note attached to de-rated scores.
pub fn quality_note(warning: &QualityWarning, locale: Locale) -> String {
    match locale {
        Locale::En => format!(
            "Recording quality is marginal ({:.0}% voiced, {} usable points); the score was adjusted. Record in a quiet place, close to the microphone.",
            warning.valid_ratio * 100.0,
            warning.valid_points
        ),
        Locale::Zh => format!(
            "录音质量一般（有效语音{:.0}%，可用数据点{}个），评分已相应调整。建议在安静环境中靠近麦克风录音。",
            warning.valid_ratio * 100.0,
            warning.valid_points
        ),
    }
}
