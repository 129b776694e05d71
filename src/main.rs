use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

use dialogue_tts::{
    engines::command::{
        language::is_language_code, language_help, CommandEngine, CommandModelParams,
        DEFAULT_LANGUAGE,
    },
    voice::load_voice_mapping,
    DialogueError, Orchestrator, OrchestratorConfigBuilder, ProfileConfig, SynthesisEngine,
    VoicePool,
};

const DEFAULT_OUTPUT: &str = "output.wav";

#[derive(Debug, Parser)]
#[command(name = "dialogue-tts", version)]
#[command(about = "Turn a `Speaker: line` transcript into one multi-voice WAV file")]
#[command(after_help = language_help())]
struct Cli {
    /// [language_code] <transcript_file> [output_file]
    #[arg(value_name = "ARGS", num_args = 1..=3, required = true)]
    positionals: Vec<String>,

    /// External TTS program (default: espeak-ng)
    #[arg(long)]
    program: Option<String>,

    /// Argument template for --program; repeat for each argument
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    args: Vec<String>,

    /// Model file substituted for {model}
    #[arg(long)]
    model: Option<PathBuf>,

    /// JSON object mapping speaker names to voice ids
    #[arg(long, value_name = "FILE")]
    voices: Option<PathBuf>,

    /// Directory of <name>.wav reference recordings; enables cloned voices
    #[arg(long, value_name = "DIR")]
    references: Option<PathBuf>,

    /// Where prepared speaker profiles are cached
    #[arg(long, value_name = "DIR", default_value = "voice_profiles")]
    profiles: PathBuf,

    /// Silence after each line, in seconds
    #[arg(long, default_value_t = 0.5)]
    silence: f32,

    /// Peak level above which the output is scaled down
    #[arg(long, default_value_t = 0.95)]
    peak: f32,

    /// Keep the output level untouched
    #[arg(long)]
    no_normalize: bool,

    /// Sample rate of prepared reference recordings
    #[arg(long, default_value_t = 24_000)]
    reference_rate: u32,

    /// Longest reference recording kept, in seconds
    #[arg(long, default_value_t = 10.0)]
    max_reference_secs: f32,
}

/// `(language, transcript, output)` from one to three positionals.
///
/// With two, the first is a language code only if it is a known one.
fn split_positionals(positionals: &[String]) -> Result<(String, PathBuf, PathBuf), DialogueError> {
    match positionals {
        [transcript] => Ok((
            DEFAULT_LANGUAGE.to_string(),
            PathBuf::from(transcript),
            PathBuf::from(DEFAULT_OUTPUT),
        )),
        [first, second] if is_language_code(first) => Ok((
            first.clone(),
            PathBuf::from(second),
            PathBuf::from(DEFAULT_OUTPUT),
        )),
        [transcript, output] => Ok((
            DEFAULT_LANGUAGE.to_string(),
            PathBuf::from(transcript),
            PathBuf::from(output),
        )),
        [language, transcript, output] => Ok((
            language.clone(),
            PathBuf::from(transcript),
            PathBuf::from(output),
        )),
        _ => Err(DialogueError::Config(
            "expected [language_code] <transcript_file> [output_file]".into(),
        )),
    }
}

/// Load the engine for `language`, falling back to the default language if
/// the backend rejects it.
fn load_engine(
    engine: &mut CommandEngine,
    model: &Path,
    language: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = CommandModelParams {
        language: Some(language.to_string()),
    };
    match engine.load_model_with_params(model, params) {
        Ok(()) => Ok(()),
        Err(e)
            if language != DEFAULT_LANGUAGE
                && matches!(
                    e.downcast_ref::<DialogueError>(),
                    Some(DialogueError::UnsupportedLanguage(_))
                ) =>
        {
            log::warn!("{e}, falling back to American English");
            engine.load_model_with_params(model, CommandModelParams::default())
        }
        Err(e) => Err(e),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let (language, transcript, output) = split_positionals(&cli.positionals)?;

    let (mut engine, espeak) = match &cli.program {
        Some(program) => (CommandEngine::new(program.clone(), cli.args.clone()), false),
        None => {
            if !cli.args.is_empty() {
                log::warn!("--arg is ignored without --program");
            }
            (CommandEngine::espeak(), true)
        }
    };

    let model = cli.model.clone().unwrap_or_default();
    let load_start = Instant::now();
    load_engine(&mut engine, &model, &language)?;
    log::debug!("Backend ready in {:.2?}", load_start.elapsed());

    let mut builder = OrchestratorConfigBuilder::default();
    builder
        .silence_secs(cli.silence)
        .peak_threshold(cli.peak)
        .normalize(!cli.no_normalize);
    if espeak {
        builder.voice_pool(VoicePool::espeak(engine.language().unwrap_or("en-us")));
    }
    if let Some(path) = &cli.voices {
        builder.voice_mapping(load_voice_mapping(path)?);
    }
    if let Some(reference_dir) = &cli.references {
        if !engine.supports_cloning() {
            log::warn!(
                "{} has no {{reference}} argument, reference recordings will not be used",
                engine.program()
            );
        }
        builder.profiles(ProfileConfig {
            reference_dir: reference_dir.clone(),
            cache_dir: cli.profiles.clone(),
            sample_rate: cli.reference_rate,
            max_duration_secs: cli.max_reference_secs,
        });
    }
    let config = builder.build()?;

    let mut orchestrator = Orchestrator::new(engine, config);
    let run_start = Instant::now();
    let summary = orchestrator.run(&transcript, &output)?;

    println!(
        "{} of {} lines spoken, {} skipped in {:.2?}",
        summary.spoken,
        summary.lines,
        summary.skipped,
        run_start.elapsed()
    );
    match &summary.output {
        Some(path) => println!("Saved {:.2}s of audio to {}", summary.duration_secs, path.display()),
        None => println!("No audio segments generated. Check your transcript file."),
    }

    orchestrator.into_engine().unload_model();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_positional_is_transcript() {
        let (language, transcript, output) = split_positionals(&strings(&["talk.txt"])).unwrap();
        assert_eq!(language, "a");
        assert_eq!(transcript, PathBuf::from("talk.txt"));
        assert_eq!(output, PathBuf::from("output.wav"));
    }

    #[test]
    fn two_positionals_detect_language_code() {
        let (language, transcript, output) = split_positionals(&strings(&["f", "talk.txt"])).unwrap();
        assert_eq!(language, "f");
        assert_eq!(transcript, PathBuf::from("talk.txt"));
        assert_eq!(output, PathBuf::from("output.wav"));

        let (language, transcript, output) =
            split_positionals(&strings(&["talk.txt", "talk.wav"])).unwrap();
        assert_eq!(language, "a");
        assert_eq!(transcript, PathBuf::from("talk.txt"));
        assert_eq!(output, PathBuf::from("talk.wav"));
    }

    #[test]
    fn three_positionals_are_taken_in_order() {
        let (language, transcript, output) =
            split_positionals(&strings(&["j", "talk.txt", "talk.wav"])).unwrap();
        assert_eq!(language, "j");
        assert_eq!(transcript, PathBuf::from("talk.txt"));
        assert_eq!(output, PathBuf::from("talk.wav"));
    }

    #[test]
    fn cli_requires_a_transcript() {
        assert!(Cli::try_parse_from(["dialogue-tts"]).is_err());
        assert!(Cli::try_parse_from(["dialogue-tts", "a", "b", "c", "d"]).is_err());
        let cli = Cli::try_parse_from([
            "dialogue-tts",
            "--program",
            "sh",
            "--arg",
            "-c",
            "--arg",
            "cat",
            "talk.txt",
        ])
        .unwrap();
        assert_eq!(cli.args, vec!["-c", "cat"]);
        assert_eq!(cli.positionals, vec!["talk.txt"]);
    }

    #[test]
    fn unsupported_language_falls_back_to_default() {
        let mut engine = CommandEngine::new("sh", ["-c", "cat > /dev/null"]);
        if load_engine(&mut engine, Path::new(""), "q").is_err() {
            // sh missing from this environment
            return;
        }
        assert_eq!(engine.language(), Some("en-us"));
    }
}
