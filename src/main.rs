//! Application entry point — voiceturn console binary.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns defaults on first run) and apply
//!    API-key environment overrides.
//! 3. Create the tokio runtime (multi-thread, 2 workers).
//! 4. Build the three remote collaborators from config.
//! 5. Build the capture and playback engines and the key-press stop trigger.
//! 6. Wait for the operator to confirm on the console, then run one turn.
//! 7. Print the transcript and reply; exit non-zero if any stage failed.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;

use voiceturn::{
    audio::{CaptureEngine, PlaybackEngine},
    config::AppConfig,
    hotkey::{parse_stop_key, DEFAULT_STOP_KEY},
    llm::ChatReplier,
    pipeline::{KeyStop, TurnRunner},
    stt::WhisperTranscriber,
    tts::CloudSynthesizer,
};

/// Fill in API keys from the environment when the config file left them out.
fn apply_env_overrides(config: &mut AppConfig) {
    if config.stt.api_key.is_none() {
        config.stt.api_key = std::env::var("OPENAI_API_KEY").ok();
    }
    if config.llm.api_key.is_none() {
        config.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
    }
    if config.tts.api_key.is_none() {
        config.tts.api_key = std::env::var("GOOGLE_API_KEY").ok();
    }
}

/// Block until the operator types `s` and presses Enter.
///
/// Any other line re-prints the prompt; EOF on stdin is treated as a request
/// to quit.
fn wait_for_start(stop_key_name: &str) -> anyhow::Result<bool> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("Press 's' then Enter to start recording ('{stop_key_name}' stops it): ");
        std::io::stdout().flush()?;

        match lines.next() {
            Some(line) => {
                if line?.trim().eq_ignore_ascii_case("s") {
                    return Ok(true);
                }
            }
            None => return Ok(false),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voiceturn starting up");

    // 2. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load config ({e}); using defaults");
        AppConfig::defaults()
    });
    apply_env_overrides(&mut config);

    let stop_key = parse_stop_key(&config.stop_key).unwrap_or_else(|| {
        log::warn!(
            "unrecognised stop key {:?}; falling back to 'q'",
            config.stop_key
        );
        DEFAULT_STOP_KEY
    });

    // 3. Tokio runtime (2 workers cover the blocking device tasks)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Remote collaborators
    let transcriber = Arc::new(WhisperTranscriber::from_config(&config.stt));
    let replier = Arc::new(ChatReplier::from_config(&config.llm));
    let synthesizer = Arc::new(CloudSynthesizer::from_config(&config.tts));

    // 5. Engines and stop trigger
    let capture = CaptureEngine::new(config.audio.format());
    let playback = PlaybackEngine::new();
    let stop = Arc::new(KeyStop::new(stop_key));

    let mut runner = TurnRunner::new(
        config.clone(),
        capture,
        playback,
        stop,
        transcriber,
        replier,
        synthesizer,
    );

    // 6. Confirm and run one turn
    if !wait_for_start(&config.stop_key)? {
        log::info!("stdin closed before a recording was started");
        return Ok(());
    }

    let report = rt
        .block_on(runner.run_turn())
        .context("voice turn failed")?;

    // 7. Report
    println!("You said:  {}", report.transcript);
    println!("Reply:     {}", report.reply);
    log::info!("exiting after one turn");

    Ok(())
}
