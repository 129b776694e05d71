//! Cloned-voice speaker profiles.
//!
//! A profile is built from a short reference recording found in the
//! reference directory (`<name>.wav` or `<name>.mp3`, lowercased). The
//! recording is downmixed to mono, resampled to a fixed rate, truncated, and
//! written to the profile cache directory together with a JSON descriptor:
//!
//! ```text
//! voice_profiles/
//! ├── alice.wav    # processed reference
//! └── alice.json   # SpeakerProfile
//! ```
//!
//! Later runs load the descriptor instead of reprocessing the recording.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio;
use crate::error::DialogueError;

/// Reference extensions in lookup order.
const REFERENCE_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// A prepared cloned-voice profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    /// Speaker name as it appeared in the transcript.
    pub speaker: String,
    /// Original reference recording.
    pub source: PathBuf,
    /// Processed mono reference handed to the backend.
    pub reference_wav: PathBuf,
    /// JSON file this profile is stored in.
    pub descriptor: PathBuf,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

/// Settings for reference lookup and preparation.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Directory holding `<name>.wav` / `<name>.mp3` reference recordings.
    pub reference_dir: PathBuf,
    /// Directory where processed references and descriptors are cached.
    pub cache_dir: PathBuf,
    /// Sample rate of the processed reference.
    pub sample_rate: u32,
    /// Longest reference kept, in seconds.
    pub max_duration_secs: f32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("voices"),
            cache_dir: PathBuf::from("voice_profiles"),
            sample_rate: 24_000,
            max_duration_secs: 10.0,
        }
    }
}

/// Prepares and caches speaker profiles for one run.
#[derive(Debug)]
pub struct ProfileStore {
    config: ProfileConfig,
    loaded: HashMap<String, SpeakerProfile>,
}

impl ProfileStore {
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            config,
            loaded: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Prepare (or load) the profile for `speaker`.
    ///
    /// Calling this twice for the same speaker returns the cached profile.
    pub fn prepare(&mut self, speaker: &str) -> Result<SpeakerProfile, DialogueError> {
        let key = profile_key(speaker)?;
        if let Some(profile) = self.loaded.get(&key) {
            return Ok(profile.clone());
        }

        let profile = match self.load_cached(&key)? {
            Some(profile) => {
                log::info!(
                    "Reusing cached profile for {speaker} from {}",
                    self.descriptor_path(&key).display()
                );
                profile
            }
            None => self.build(speaker, &key)?,
        };

        self.loaded.insert(key, profile.clone());
        Ok(profile)
    }

    fn descriptor_path(&self, key: &str) -> PathBuf {
        self.config.cache_dir.join(format!("{key}.json"))
    }

    fn load_cached(&self, key: &str) -> Result<Option<SpeakerProfile>, DialogueError> {
        let descriptor = self.descriptor_path(key);
        if !descriptor.exists() {
            return Ok(None);
        }
        let mut profile: SpeakerProfile =
            match serde_json::from_str(&fs::read_to_string(&descriptor)?) {
                Ok(profile) => profile,
                Err(e) => {
                    log::warn!(
                        "Cached profile {} is unreadable ({e}), rebuilding",
                        descriptor.display()
                    );
                    return Ok(None);
                }
            };
        if profile.sample_rate != self.config.sample_rate {
            log::info!(
                "Cached profile {} is at {} Hz, rebuilding at {} Hz",
                descriptor.display(),
                profile.sample_rate,
                self.config.sample_rate
            );
            return Ok(None);
        }
        if !profile.reference_wav.exists() {
            log::warn!(
                "Cached profile {} points at missing {}, rebuilding",
                descriptor.display(),
                profile.reference_wav.display()
            );
            return Ok(None);
        }
        profile.descriptor = descriptor;
        Ok(Some(profile))
    }

    fn build(&self, speaker: &str, key: &str) -> Result<SpeakerProfile, DialogueError> {
        let source = find_reference(&self.config.reference_dir, key).ok_or_else(|| {
            DialogueError::ReferenceNotFound {
                speaker: speaker.to_string(),
                dir: self.config.reference_dir.clone(),
            }
        })?;

        log::info!("Preparing reference audio for {speaker} from {}", source.display());
        let decoded = if source.extension().and_then(|e| e.to_str()) == Some("wav") {
            audio::read_wav(&source)?
        } else {
            audio::decode_file(&source)?
        };
        let mut mono = audio::downmix_mono(&decoded.channels);
        let max_secs = self.config.max_duration_secs;
        audio::truncate(&mut mono, decoded.sample_rate, max_secs);
        let mut samples = audio::resample(&mono, decoded.sample_rate, self.config.sample_rate)?;
        audio::truncate(&mut samples, self.config.sample_rate, max_secs);
        if samples.is_empty() {
            return Err(DialogueError::Config(format!(
                "reference audio {} is empty",
                source.display()
            )));
        }

        fs::create_dir_all(&self.config.cache_dir)?;
        let reference_wav = self.config.cache_dir.join(format!("{key}.wav"));
        audio::write_wav(&reference_wav, &samples, self.config.sample_rate)?;

        let descriptor = self.descriptor_path(key);
        let profile = SpeakerProfile {
            speaker: speaker.to_string(),
            source,
            reference_wav,
            descriptor: descriptor.clone(),
            sample_rate: self.config.sample_rate,
            duration_secs: samples.len() as f64 / self.config.sample_rate as f64,
        };
        fs::write(&descriptor, serde_json::to_string_pretty(&profile)?)?;
        log::info!(
            "Saved profile for {speaker} ({:.2}s reference)",
            profile.duration_secs
        );
        Ok(profile)
    }
}

/// Lowercased speaker name, rejected if it could escape the directory.
fn profile_key(speaker: &str) -> Result<String, DialogueError> {
    let key = speaker.trim().to_lowercase();
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(DialogueError::Config(format!(
            "speaker name '{speaker}' cannot be used as a file name"
        )));
    }
    Ok(key)
}

fn find_reference(dir: &Path, key: &str) -> Option<PathBuf> {
    REFERENCE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{key}.{ext}")))
        .find(|path| path.is_file())
}
