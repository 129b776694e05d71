//! Backend that drives an external text-to-speech program.
//!
//! Each transcript line spawns the program once. The text is written to its
//! stdin and the audio comes back as WAV, either on stdout or in a temporary
//! file when the argument template contains `{output}`. The sample rate is
//! read from the WAV header.
//!
//! # Argument Placeholders
//!
//! | Placeholder | Replaced with |
//! |---|---|
//! | `{voice}` | built-in voice id, or the speaker name for cloned voices |
//! | `{language}` | language tag (`en-us`, `fr`, ...) |
//! | `{model}` | model path passed to `load_model()` |
//! | `{reference}` | processed reference WAV of a cloned voice |
//! | `{profile}` | JSON descriptor of a cloned voice (`<cache>/<name>.json`) |
//! | `{output}` | temporary WAV path the program must write |
//!
//! A template containing `{reference}` or `{profile}` can speak cloned voices.
//!
//! # System Requirements
//!
//! The [`CommandEngine::espeak`] preset needs **espeak-ng**:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! # Examples
//!
//! ```rust,no_run
//! use dialogue_tts::{SynthesisEngine, VoiceHandle, engines::command::CommandEngine};
//! use std::path::{Path, PathBuf};
//!
//! let mut engine = CommandEngine::espeak();
//! engine.load_model(Path::new(""))?;
//!
//! let voice = VoiceHandle::Builtin("en-us+f2".to_string());
//! engine.synthesize_to_file("Hello, world!", &PathBuf::from("out.wav"), &voice)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Cloning Command
//!
//! ```rust,no_run
//! use dialogue_tts::engines::command::CommandEngine;
//!
//! let engine = CommandEngine::new(
//!     "f5-tts_infer-cli",
//!     ["--ref_audio", "{reference}", "--gen_file", "{output}"],
//! );
//! assert!(dialogue_tts::SynthesisEngine::supports_cloning(&engine));
//! ```

pub mod engine;
pub mod language;

pub use engine::{CommandEngine, CommandModelParams};
pub use language::{language_help, language_tag, DEFAULT_LANGUAGE, LANGUAGES};
