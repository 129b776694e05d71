//! # dialogue-tts
//!
//! A Rust library that turns a speaker-tagged transcript into a single
//! multi-voice WAV file.
//!
//! ## Features
//!
//! - **Transcript parsing**: `Name: dialogue` lines, one utterance per line
//! - **Stable voices**: explicit mappings or a deterministic per-name fallback
//! - **Voice cloning**: per-speaker reference recordings prepared once and cached on disk
//! - **Pluggable backends**: anything implementing [`SynthesisEngine`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use dialogue_tts::{
//!     engines::command::CommandEngine, Orchestrator, OrchestratorConfig, SynthesisEngine,
//!     VoicePool,
//! };
//!
//! let mut engine = CommandEngine::espeak();
//! engine.load_model(Path::new(""))?;
//!
//! let config = OrchestratorConfig {
//!     voice_pool: VoicePool::espeak("en-us"),
//!     ..Default::default()
//! };
//! let mut orchestrator = Orchestrator::new(engine, config);
//! let summary = orchestrator.run(
//!     &PathBuf::from("dialogue.txt"),
//!     &PathBuf::from("dialogue.wav"),
//! )?;
//! println!("{} lines spoken", summary.spoken);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod engines;
pub mod error;
pub mod orchestrator;
pub mod profile;
pub mod transcript;
pub mod voice;

pub use error::DialogueError;
pub use orchestrator::{
    LineOutcome, Orchestrator, OrchestratorConfig, OrchestratorConfigBuilder, RunSummary,
    SkipReason,
};
pub use profile::{ProfileConfig, ProfileStore, SpeakerProfile};
pub use transcript::TranscriptLine;
pub use voice::{VoiceAssignment, VoiceHandle, VoicePool};

use std::path::Path;

/// A block of mono audio produced by a synthesis backend.
///
/// The sample rate is whatever the backend reports; nothing downstream
/// assumes a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio as reported by the backend
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A zeroed segment lasting `secs` seconds.
    pub fn silence(secs: f32, sample_rate: u32) -> Self {
        let len = (secs.max(0.0) as f64 * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        audio::write_wav(path, &self.samples, self.sample_rate)?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for text-to-speech backends.
///
/// Each backend turns one line of text plus a resolved [`VoiceHandle`] into
/// an [`AudioSegment`]. Model loading parameters vary per backend.
pub trait SynthesisEngine {
    /// Parameters for configuring model loading (language, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    ///
    /// An empty path means the backend's built-in model.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Whether [`VoiceHandle::Profile`] voices can be synthesized.
    fn supports_cloning(&self) -> bool {
        false
    }

    /// Synthesize speech for `text` in the given voice.
    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceHandle,
    ) -> Result<AudioSegment, Box<dyn std::error::Error>>;

    /// Synthesize speech and write it to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `AudioSegment::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        voice: &VoiceHandle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, voice)?.write_wav(wav_path)
    }
}

#[cfg(test)]
mod tests {
    use super::AudioSegment;

    #[test]
    fn silence_has_expected_length() {
        let gap = AudioSegment::silence(0.5, 24_000);
        assert_eq!(gap.samples.len(), 12_000);
        assert!(gap.samples.iter().all(|&s| s == 0.0));
        assert!((gap.duration_secs() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        assert_eq!(AudioSegment::new(vec![0.1; 10], 0).duration_secs(), 0.0);
    }
}
