use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum DialogueError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Resampler setup failed: {0}")]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),
    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
    #[error("No reference audio for speaker '{speaker}' in {}", .dir.display())]
    ReferenceNotFound { speaker: String, dir: PathBuf },
    #[error("Unsupported reference audio format: {}", .0.display())]
    UnsupportedReferenceFormat(PathBuf),
    #[error("Audio decoding failed: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("Backend program '{0}' not found on PATH")]
    ProgramNotFound(String),
    #[error("Backend failed: {0}")]
    EngineFailed(String),
    #[error("Unsupported language code '{0}'")]
    UnsupportedLanguage(String),
    #[error("Backend cannot use cloned voice profile for speaker '{0}'")]
    CloningUnsupported(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid configuration: {0}")]
    Config(String),
}
