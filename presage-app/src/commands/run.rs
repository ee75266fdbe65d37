use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use presage_analysis::SessionAnalysis;
use presage_app::{AppConfig, ConsoleDisplay, SessionExport, Summary, gate, library};
use presage_core::TrialMode;
use presage_experiment::{ChannelGate, TrialScheduler};
use presage_rng::open_source;
use presage_sensor::{Recorder, RecordingPlan};
use presage_timing::{SessionTimer, StopSignal, Timer};

pub fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(dir) = output {
        config.output_dir = dir;
    }
    let experiment = config.experiment.clone();
    let pool = library::load_pool(&config.neutral_dir, &config.excitatory_dir)?;
    let source = open_source(&config.random_source).context("random source unavailable")?;
    let source_name = source.name().to_string();
    let sensor = config
        .physiology
        .as_ref()
        .map(super::sensor::connect)
        .transpose()?;
    let gate = match experiment.mode {
        TrialMode::OnDemand => {
            println!("On-Demand session: type c then Enter to start each trial, a to abort.");
            gate::stdin_gate()?
        }
        TrialMode::FreeRunning => ChannelGate::channel(1).1,
    };

    let timer = SessionTimer::new();
    let recorder = match (&sensor, &config.physiology) {
        (Some(client), Some(physiology)) => {
            let plan = RecordingPlan::new(physiology.rate, experiment.estimated_session_secs());
            Some(Recorder::start(Arc::clone(client), plan, || timer.now())?)
        }
        _ => None,
    };

    let stop = StopSignal::new();
    let mut scheduler = TrialScheduler::new(
        experiment.clone(),
        pool,
        Some(source),
        timer,
        ConsoleDisplay::new(),
        gate,
        stop.token(),
    );
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(async {
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping the session");
                stop.stop();
            }
        });
        let outcome = scheduler.run().await;
        interrupt.abort();
        outcome
    });
    drop(runtime);

    // the sensor client blocks, so it is only touched outside the runtime
    let samples = match recorder {
        Some(recorder) => recorder.finish().unwrap_or_else(|e| {
            warn!("physiological recording lost: {e}");
            Vec::new()
        }),
        None => Vec::new(),
    };
    let session = scheduler.into_session();
    let mut summary = Summary::from_session(
        &config.session_id,
        &source_name,
        experiment.mode,
        experiment.trials,
        experiment.pre_screen_secs,
        &session,
    );

    let mut analysis = SessionAnalysis::default();
    let mut analysis_error = None;
    if let (Some(physiology), false) = (&config.physiology, samples.is_empty()) {
        let rate = physiology.rate.per_second();
        summary.sample_rate_per_sec = Some(rate);
        match super::analyze(
            &samples,
            session.trials(),
            rate,
            experiment.pre_screen_secs,
            config.shuffle_count,
        ) {
            Ok(done) => {
                summary.set_analysis(&done, config.shuffle_count);
                analysis = done;
            }
            Err(e) => {
                error!("analysis halted: {e:#}");
                analysis_error = Some(e);
            }
        }
    }

    let dir = config.session_dir();
    SessionExport {
        summary: &summary,
        trials: session.trials(),
        samples: &samples,
        analysis: &analysis,
    }
    .write(&dir)?;
    info!("session exported to {}", dir.display());
    super::print_summary(&summary, session.trials());

    outcome.context("session ended with an error")?;
    match analysis_error {
        Some(e) => Err(e.context("analysis failed; trials were exported without results")),
        None => Ok(()),
    }
}
