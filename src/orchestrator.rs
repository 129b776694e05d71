//! Transcript orchestration: resolve each speaker's voice, synthesize line by
//! line, and assemble the clips into one file.
//!
//! An [`Orchestrator`] lives for a single run. Its voice cache and profile
//! store are dropped with it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use derive_builder::Builder;

use crate::audio;
use crate::error::DialogueError;
use crate::profile::{ProfileConfig, ProfileStore, SpeakerProfile};
use crate::transcript::{self, TranscriptLine};
use crate::voice::{self, VoiceAssignment, VoiceHandle, VoicePool};
use crate::{AudioSegment, SynthesisEngine};

/// Settings for a run.
///
/// ```rust
/// use dialogue_tts::OrchestratorConfigBuilder;
///
/// let config = OrchestratorConfigBuilder::default()
///     .silence_secs(0.3)
///     .normalize(false)
///     .build()?;
/// assert_eq!(config.peak_threshold, 0.95);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct OrchestratorConfig {
    /// Silence inserted after every spoken line, in seconds.
    pub silence_secs: f32,
    /// Peak level the output is scaled down to when exceeded.
    pub peak_threshold: f32,
    /// Whether to apply peak normalization at all.
    pub normalize: bool,
    /// Explicit speaker -> built-in voice assignments.
    pub voice_mapping: HashMap<String, String>,
    /// Fallback voices for unmapped speakers.
    pub voice_pool: VoicePool,
    /// Enables cloned voices for unmapped speakers.
    #[builder(setter(strip_option))]
    pub profiles: Option<ProfileConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            silence_secs: 0.5,
            peak_threshold: 0.95,
            normalize: true,
            voice_mapping: HashMap::new(),
            voice_pool: VoicePool::default(),
            profiles: None,
        }
    }
}

impl OrchestratorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(secs) = self.silence_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(format!("silence_secs must be >= 0, got {secs}"));
            }
        }
        if let Some(peak) = self.peak_threshold {
            if !(peak > 0.0 && peak <= 1.0) {
                return Err(format!("peak_threshold must be in (0, 1], got {peak}"));
            }
        }
        Ok(())
    }
}

/// Why a line produced no audio.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The speaker's voice could not be prepared earlier in the run.
    SpeakerUnavailable,
    /// The backend returned an error.
    SynthesisFailed(String),
    /// The backend returned zero samples.
    EmptyAudio,
}

/// Result of processing one transcript line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Spoken(AudioSegment),
    Skipped(SkipReason),
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Dialogue lines found in the transcript.
    pub lines: usize,
    pub spoken: usize,
    pub skipped: usize,
    pub sample_rate: Option<u32>,
    pub duration_secs: f64,
    /// Written file, `None` when nothing was spoken.
    pub output: Option<PathBuf>,
}

pub struct Orchestrator<E: SynthesisEngine> {
    engine: E,
    config: OrchestratorConfig,
    voices: VoiceAssignment,
    profiles: Option<ProfileStore>,
}

impl<E: SynthesisEngine> Orchestrator<E> {
    pub fn new(engine: E, config: OrchestratorConfig) -> Self {
        let profiles = config.profiles.clone().map(ProfileStore::new);
        Self {
            engine,
            config,
            voices: VoiceAssignment::new(),
            profiles,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Built-in voice for `name`: the configured mapping, else the pool.
    pub fn assign_voice(&self, name: &str) -> VoiceHandle {
        voice::assign_voice(name, Some(&self.config.voice_mapping), &self.config.voice_pool)
    }

    /// Prepare (or reuse) the cloned-voice profile for `name`.
    pub fn prepare_speaker_profile(&mut self, name: &str) -> Result<SpeakerProfile, DialogueError> {
        let store = self.profiles.as_mut().ok_or_else(|| {
            DialogueError::Config("no reference directory configured for cloned voices".into())
        })?;
        store.prepare(name)
    }

    /// Voice for `name`, cached for the rest of the run.
    ///
    /// Mapped speakers always get their built-in voice. Other speakers get a
    /// cloned profile when profiles are configured and the backend can use
    /// them, else a pool voice. A failed profile marks the speaker
    /// unavailable and returns `None`.
    pub fn resolve_voice(&mut self, name: &str) -> Option<VoiceHandle> {
        if let Some(cached) = self.voices.get(name) {
            return cached.cloned();
        }

        let use_profile = self.profiles.is_some()
            && self.engine.supports_cloning()
            && !self.config.voice_mapping.contains_key(name);

        let voice = if use_profile {
            match self.prepare_speaker_profile(name) {
                Ok(profile) => VoiceHandle::Profile(profile),
                Err(e) => {
                    log::error!("Cannot prepare voice for {name}, skipping their lines: {e}");
                    self.voices.mark_unavailable(name);
                    return None;
                }
            }
        } else {
            self.assign_voice(name)
        };

        self.voices.insert(name, voice.clone());
        Some(voice)
    }

    /// Synthesize one line. Backend failures become [`LineOutcome::Skipped`].
    pub fn synthesize_line(&mut self, text: &str, voice: &VoiceHandle) -> LineOutcome {
        match self.engine.synthesize(text, voice) {
            Ok(segment) if segment.is_empty() => {
                log::warn!("Backend returned no audio for voice {}", voice.label());
                LineOutcome::Skipped(SkipReason::EmptyAudio)
            }
            Ok(segment) => LineOutcome::Spoken(segment),
            Err(e) => {
                log::error!("Synthesis error for voice {}: {e}", voice.label());
                LineOutcome::Skipped(SkipReason::SynthesisFailed(e.to_string()))
            }
        }
    }

    /// Resolve the speaker's voice and synthesize one transcript line.
    pub fn process_line(&mut self, line: &TranscriptLine) -> LineOutcome {
        let Some(voice) = self.resolve_voice(&line.speaker) else {
            log::debug!("Line {}: no voice for {}", line.line_no, line.speaker);
            return LineOutcome::Skipped(SkipReason::SpeakerUnavailable);
        };
        log::info!(
            "Line {}: {} ({}): {}",
            line.line_no,
            line.speaker,
            voice.label(),
            preview(&line.text)
        );
        self.synthesize_line(&line.text, &voice)
    }

    /// Concatenate segments in order with silence after each one.
    ///
    /// The output takes the sample rate of the first segment; later segments
    /// at another rate are resampled to it. Returns `None` for no segments.
    pub fn assemble(&self, segments: &[AudioSegment]) -> Result<Option<AudioSegment>, DialogueError> {
        let Some(first) = segments.first() else {
            return Ok(None);
        };
        let sample_rate = first.sample_rate;
        let gap = AudioSegment::silence(self.config.silence_secs, sample_rate);

        let total: usize = segments.iter().map(|s| s.samples.len()).sum::<usize>()
            + gap.samples.len() * segments.len();
        let mut samples = Vec::with_capacity(total);

        for segment in segments {
            if segment.sample_rate == sample_rate {
                samples.extend_from_slice(&segment.samples);
            } else {
                log::warn!(
                    "Resampling segment from {} Hz to {} Hz",
                    segment.sample_rate,
                    sample_rate
                );
                samples.extend(audio::resample(
                    &segment.samples,
                    segment.sample_rate,
                    sample_rate,
                )?);
            }
            samples.extend_from_slice(&gap.samples);
        }

        if self.config.normalize {
            let gain = audio::normalize_peak(&mut samples, self.config.peak_threshold);
            if gain < 1.0 {
                log::info!("Normalized output peak (gain {gain:.3})");
            }
        }

        Ok(Some(AudioSegment::new(samples, sample_rate)))
    }

    /// Parse `input`, synthesize every line, and write the result to `output`.
    ///
    /// Nothing is written when no line produced audio.
    pub fn run(&mut self, input: &Path, output: &Path) -> Result<RunSummary, DialogueError> {
        let lines = transcript::read_transcript(input)?;
        log::info!("Read {} dialogue lines from {}", lines.len(), input.display());

        let mut summary = RunSummary {
            lines: lines.len(),
            ..Default::default()
        };
        let mut segments = Vec::new();
        for line in &lines {
            match self.process_line(line) {
                LineOutcome::Spoken(segment) => segments.push(segment),
                LineOutcome::Skipped(_) => summary.skipped += 1,
            }
        }
        summary.spoken = segments.len();

        let Some(full) = self.assemble(&segments)? else {
            log::warn!("No audio segments generated. Check your transcript file.");
            return Ok(summary);
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        audio::write_wav(output, &full.samples, full.sample_rate)?;
        log::info!(
            "Audio generated successfully: {} ({:.2}s at {} Hz)",
            output.display(),
            full.duration_secs(),
            full.sample_rate
        );

        summary.sample_rate = Some(full.sample_rate);
        summary.duration_secs = full.duration_secs();
        summary.output = Some(output.to_path_buf());
        Ok(summary)
    }
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 50;
    if text.chars().count() <= MAX_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_CHARS).collect();
    short.push_str("...");
    short
}
