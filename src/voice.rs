//! Speaker to voice resolution.

use std::collections::HashMap;
use std::path::Path;

use crate::error::DialogueError;
use crate::profile::SpeakerProfile;

/// The voice a backend is asked to speak with.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceHandle {
    /// A voice identifier the backend ships with (e.g. `"af_heart"`, `"en-us+m3"`).
    Builtin(String),
    /// A cloned voice built from a speaker's reference recording.
    Profile(SpeakerProfile),
}

impl VoiceHandle {
    pub fn label(&self) -> &str {
        match self {
            VoiceHandle::Builtin(id) => id,
            VoiceHandle::Profile(profile) => &profile.speaker,
        }
    }
}

/// Fallback voices for speakers without an explicit mapping.
///
/// Split into two partitions picked by a crude name-ending heuristic. At
/// least one partition is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePool {
    female: Vec<String>,
    male: Vec<String>,
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::kokoro()
    }
}

impl VoicePool {
    pub fn new(female: Vec<String>, male: Vec<String>) -> Result<Self, DialogueError> {
        if female.is_empty() && male.is_empty() {
            return Err(DialogueError::Config("voice pool is empty".into()));
        }
        Ok(Self { female, male })
    }

    /// American English Kokoro voices.
    pub fn kokoro() -> Self {
        let female = ["af_heart", "af_bella", "af_nicole", "af_kore", "af_aoede", "af_sarah"];
        let male = ["am_michael", "am_fenrir", "am_echo", "am_eric", "am_puck"];
        Self {
            female: female.iter().map(|v| v.to_string()).collect(),
            male: male.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// espeak-ng voice variants for a language tag, e.g. `en-us+f2`.
    pub fn espeak(language: &str) -> Self {
        Self {
            female: (1..=5).map(|n| format!("{language}+f{n}")).collect(),
            male: (1..=7).map(|n| format!("{language}+m{n}")).collect(),
        }
    }

    /// Deterministic voice for `name`: sum of its code points modulo the
    /// partition size.
    pub fn pick(&self, name: &str) -> &str {
        let lower = name.to_lowercase();
        let wants_female = lower.ends_with(['a', 'e', 'i']);
        let partition = match (wants_female, self.female.is_empty(), self.male.is_empty()) {
            (true, false, _) | (false, false, true) => &self.female,
            _ => &self.male,
        };
        let hash: u64 = name.chars().map(|c| c as u64).sum();
        &partition[(hash % partition.len() as u64) as usize]
    }
}

/// Resolve a built-in voice for a speaker: the explicit mapping entry if
/// there is one, else a stable pick from the pool.
pub fn assign_voice(
    name: &str,
    mapping: Option<&HashMap<String, String>>,
    pool: &VoicePool,
) -> VoiceHandle {
    if let Some(voice) = mapping.and_then(|m| m.get(name)) {
        return VoiceHandle::Builtin(voice.clone());
    }
    let voice = pool.pick(name).to_string();
    log::info!("Assigning voice {voice} to {name}");
    VoiceHandle::Builtin(voice)
}

/// Load a `{"Speaker": "voice_id"}` JSON mapping.
pub fn load_voice_mapping(path: &Path) -> Result<HashMap<String, String>, DialogueError> {
    let content = std::fs::read_to_string(path)?;
    let mapping: HashMap<String, String> = serde_json::from_str(&content)?;
    log::info!("Loaded {} voice mappings from {}", mapping.len(), path.display());
    Ok(mapping)
}

#[derive(Debug, Clone)]
enum Entry {
    Ready(VoiceHandle),
    Unavailable,
}

/// Per-run cache of resolved voices, keyed by speaker name.
///
/// Also remembers speakers whose voice could not be prepared so their
/// remaining lines are skipped without another attempt.
#[derive(Debug, Default)]
pub struct VoiceAssignment {
    entries: HashMap<String, Entry>,
}

impl VoiceAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(Some(voice))` when resolved, `Some(None)` when marked
    /// unavailable, `None` when the speaker has not been seen yet.
    pub fn get(&self, speaker: &str) -> Option<Option<&VoiceHandle>> {
        self.entries.get(speaker).map(|entry| match entry {
            Entry::Ready(voice) => Some(voice),
            Entry::Unavailable => None,
        })
    }

    pub fn insert(&mut self, speaker: &str, voice: VoiceHandle) {
        self.entries.insert(speaker.to_string(), Entry::Ready(voice));
    }

    pub fn mark_unavailable(&mut self, speaker: &str) {
        self.entries.insert(speaker.to_string(), Entry::Unavailable);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_gets_same_voice() {
        let pool = VoicePool::default();
        let first = assign_voice("Marguerite", None, &pool);
        for _ in 0..10 {
            assert_eq!(assign_voice("Marguerite", None, &pool), first);
        }
    }

    #[test]
    fn fallback_matches_code_point_sum() {
        let pool = VoicePool::kokoro();
        // A+l+i+c+e = 478, 478 % 6 = 4
        assert_eq!(pool.pick("Alice"), "af_aoede");
        // B+o+b = 275, 275 % 5 = 0
        assert_eq!(pool.pick("Bob"), "am_michael");
    }

    #[test]
    fn ending_heuristic_is_case_insensitive() {
        let pool = VoicePool::kokoro();
        assert!(pool.pick("MARIA").starts_with("af_"));
        assert!(pool.pick("JOHN").starts_with("am_"));
    }

    #[test]
    fn explicit_mapping_wins() {
        let mapping = HashMap::from([("Alice".to_string(), "bf_emma".to_string())]);
        let pool = VoicePool::kokoro();
        assert_eq!(
            assign_voice("Alice", Some(&mapping), &pool),
            VoiceHandle::Builtin("bf_emma".into())
        );
        assert_eq!(
            assign_voice("Bob", Some(&mapping), &pool),
            VoiceHandle::Builtin("am_michael".into())
        );
    }

    #[test]
    fn one_sided_pool_serves_everyone() {
        let pool = VoicePool::new(vec![], vec!["only".into()]).unwrap();
        assert_eq!(pool.pick("Anna"), "only");
        assert!(VoicePool::new(vec![], vec![]).is_err());
    }

    #[test]
    fn espeak_pool_uses_language_variants() {
        let pool = VoicePool::espeak("fr");
        assert!(pool.pick("Julie").starts_with("fr+f"));
        assert!(pool.pick("Marc").starts_with("fr+m"));
    }

    #[test]
    fn cache_tracks_unavailable_speakers() {
        let mut cache = VoiceAssignment::new();
        assert_eq!(cache.get("Alice"), None);
        cache.insert("Alice", VoiceHandle::Builtin("af_heart".into()));
        cache.mark_unavailable("Bob");
        assert_eq!(
            cache.get("Alice"),
            Some(Some(&VoiceHandle::Builtin("af_heart".into())))
        );
        assert_eq!(cache.get("Bob"), Some(None));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn loads_mapping_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.json");
        std::fs::write(&path, r#"{"Jean": "am_michael", "Marie": "af_heart"}"#).unwrap();
        let mapping = load_voice_mapping(&path).unwrap();
        assert_eq!(mapping.get("Marie").map(String::as_str), Some("af_heart"));
    }
}
