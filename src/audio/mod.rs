//! Audio input for pitch extraction.

pub mod decoder;

/// Mono PCM samples in [-1.0, 1.0].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
