use std::borrow::Cow;
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::audio;
use crate::error::DialogueError;
use crate::profile::SpeakerProfile;
use crate::{AudioSegment, SynthesisEngine, VoiceHandle};

use super::language::{language_tag, DEFAULT_LANGUAGE};

const VOICE: &str = "{voice}";
const LANGUAGE: &str = "{language}";
const MODEL: &str = "{model}";
const REFERENCE: &str = "{reference}";
const PROFILE: &str = "{profile}";
const OUTPUT: &str = "{output}";

/// Parameters for configuring command backend loading.
#[derive(Debug, Clone, Default)]
pub struct CommandModelParams {
    /// One-letter language code (`"a"`, `"f"`, ...). `None` uses American English.
    pub language: Option<String>,
}

#[derive(Debug)]
struct Loaded {
    model_path: Option<PathBuf>,
    language: &'static str,
}

/// Text-to-speech through an external program.
///
/// # Quick Start
///
/// ```rust,no_run
/// use dialogue_tts::{SynthesisEngine, engines::command::{CommandEngine, CommandModelParams}};
/// use std::path::Path;
///
/// let mut engine = CommandEngine::espeak();
/// engine.load_model_with_params(
///     Path::new(""),
///     CommandModelParams { language: Some("f".to_string()) },
/// )?;
/// assert_eq!(engine.language(), Some("fr"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    loaded: Option<Loaded>,
}

impl CommandEngine {
    /// Create an engine running `program` with an argument template.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            loaded: None,
        }
    }

    /// espeak-ng reading stdin and writing a WAV file; voices look like `en-us+m3`.
    pub fn espeak() -> Self {
        Self::new("espeak-ng", ["--stdin", "-v", VOICE, "-w", OUTPUT])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Language tag of the loaded model.
    pub fn language(&self) -> Option<&'static str> {
        self.loaded.as_ref().map(|l| l.language)
    }

    fn uses(&self, placeholder: &str) -> bool {
        self.args.iter().any(|a| a.contains(placeholder))
    }

    fn expand_args(
        &self,
        loaded: &Loaded,
        voice: &str,
        profile: Option<&SpeakerProfile>,
        output: Option<&Path>,
    ) -> Vec<String> {
        let model = loaded
            .model_path
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let reference = profile
            .map(|p| p.reference_wav.to_string_lossy().into_owned())
            .unwrap_or_default();
        let descriptor = profile
            .map(|p| p.descriptor.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = output
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.args
            .iter()
            .map(|arg| {
                arg.replace(VOICE, voice)
                    .replace(LANGUAGE, loaded.language)
                    .replace(MODEL, &model)
                    .replace(REFERENCE, &reference)
                    .replace(PROFILE, &descriptor)
                    .replace(OUTPUT, &output)
            })
            .collect()
    }

    /// Check the program can be spawned at all.
    fn check_program(&self) -> Result<(), DialogueError> {
        let spawned = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                child.wait()?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(DialogueError::ProgramNotFound(self.program.clone()))
            }
            Err(e) => Err(DialogueError::Io(e)),
        }
    }

    fn run(&self, text: &str, args: &[String]) -> Result<Vec<u8>, DialogueError> {
        log::debug!("Running {} {:?}", self.program, args);
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    DialogueError::ProgramNotFound(self.program.clone())
                } else {
                    DialogueError::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(stdin_payload(text).as_bytes()) {
                // A program that never reads stdin closes the pipe; its exit status decides.
                if e.kind() == ErrorKind::BrokenPipe {
                    log::debug!("{} closed stdin before reading all text", self.program);
                } else {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(DialogueError::Io(e));
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DialogueError::EngineFailed(format!(
                "{} exited with code {:?}: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

// Line-oriented programs can under-process a final token that lacks a newline.
fn stdin_payload(text: &str) -> Cow<'_, str> {
    if text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{text}\n"))
    }
}

impl SynthesisEngine for CommandEngine {
    type ModelParams = CommandModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let code = params.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
        let language =
            language_tag(code).ok_or_else(|| DialogueError::UnsupportedLanguage(code.to_string()))?;

        let model_path = if model_path.as_os_str().is_empty() {
            None
        } else {
            if !model_path.exists() {
                return Err(Box::new(DialogueError::Io(std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("Model not found at {}", model_path.display()),
                ))));
            }
            Some(model_path.to_path_buf())
        };
        if model_path.is_none() && self.uses(MODEL) {
            return Err(Box::new(DialogueError::Config(format!(
                "{} needs a model path",
                self.program
            ))));
        }

        self.check_program()?;
        log::info!(
            "Using {} for language {language}{}",
            self.program,
            model_path
                .as_ref()
                .map(|p| format!(" with model {}", p.display()))
                .unwrap_or_default()
        );
        self.loaded = Some(Loaded {
            model_path,
            language,
        });
        Ok(())
    }

    fn unload_model(&mut self) {
        self.loaded = None;
    }

    fn supports_cloning(&self) -> bool {
        self.uses(REFERENCE) || self.uses(PROFILE)
    }

    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceHandle,
    ) -> Result<AudioSegment, Box<dyn std::error::Error>> {
        let loaded = self.loaded.as_ref().ok_or(DialogueError::ModelNotLoaded)?;

        let (voice_id, profile) = match voice {
            VoiceHandle::Builtin(id) => (id.as_str(), None),
            VoiceHandle::Profile(profile) => {
                if !self.supports_cloning() {
                    return Err(Box::new(DialogueError::CloningUnsupported(
                        profile.speaker.clone(),
                    )));
                }
                (profile.speaker.as_str(), Some(profile))
            }
        };

        let decoded = if self.uses(OUTPUT) {
            let scratch = tempfile::tempdir()?;
            let out_path = scratch.path().join("line.wav");
            let args = self.expand_args(loaded, voice_id, profile, Some(&out_path));
            self.run(text, &args)?;
            if !out_path.exists() {
                return Err(Box::new(DialogueError::EngineFailed(format!(
                    "{} did not write {}",
                    self.program,
                    out_path.display()
                ))));
            }
            audio::read_wav(&out_path)?
        } else {
            let args = self.expand_args(loaded, voice_id, profile, None);
            let stdout = self.run(text, &args)?;
            if stdout.is_empty() {
                return Err(Box::new(DialogueError::EngineFailed(format!(
                    "{} produced no audio on stdout",
                    self.program
                ))));
            }
            audio::read_wav_from(Cursor::new(stdout))?
        };

        Ok(AudioSegment::new(
            audio::downmix_mono(&decoded.channels),
            decoded.sample_rate,
        ))
    }
}
