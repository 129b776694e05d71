use std::path::{Path, PathBuf};
use std::time::Instant;

use dialogue_tts::{
    engines::command::CommandEngine, Orchestrator, OrchestratorConfig, SynthesisEngine, VoiceHandle,
    VoicePool,
};

const TRANSCRIPT: &str = "\
Alice: Hello there. Did you finish the recording?
Bob: Almost. The last take had a lot of background noise.
Alice: Then let's redo it after lunch.
Bob: Sounds good to me!
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut engine = CommandEngine::espeak();

    let load_start = Instant::now();
    engine.load_model(Path::new(""))?;
    println!("Backend ready in {:.2?}", load_start.elapsed());

    let single_start = Instant::now();
    let sample = engine.synthesize("Testing one two three.", &VoiceHandle::Builtin("en-us+f3".into()))?;
    let synth_dur = single_start.elapsed();
    println!(
        "Synthesized {:.2}s audio at {} Hz in {:.2?} ({:.1}x real-time)",
        sample.duration_secs(),
        sample.sample_rate,
        synth_dur,
        sample.duration_secs() / synth_dur.as_secs_f64()
    );

    let transcript = PathBuf::from("dialogue_demo.txt");
    std::fs::write(&transcript, TRANSCRIPT)?;

    let config = OrchestratorConfig {
        voice_pool: VoicePool::espeak("en-us"),
        ..Default::default()
    };
    let mut orchestrator = Orchestrator::new(engine, config);
    let summary = orchestrator.run(&transcript, &PathBuf::from("dialogue.wav"))?;
    println!(
        "Spoke {}/{} lines, {:.2}s total",
        summary.spoken, summary.lines, summary.duration_secs
    );
    if let Some(path) = summary.output {
        println!("Saved to {}", path.display());
    }

    orchestrator.into_engine().unload_model();
    Ok(())
}
