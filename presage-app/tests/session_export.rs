use std::fs;
use std::path::{Path, PathBuf};

use presage_analysis::{AnalysisSettings, analyze_session};
use presage_app::export::{PHYSIOLOGY_FILE, TRIALS_FILE};
use presage_app::{ConsoleDisplay, SessionExport, Summary, library, load_session};
use presage_core::{Channel, PhysiologicalSample, SessionState, TrialMode};
use presage_experiment::{ChannelGate, DelayRange, ExperimentConfig, TrialScheduler};
use presage_rng::{RandomSource, ScriptedSource};
use presage_timing::{SessionTimer, StopToken};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn write_images(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        image::RgbImage::new(8, 6).save(dir.join(name)).unwrap();
    }
}

fn skin_conductance() -> Vec<PhysiologicalSample> {
    // 2 samples per second across the whole session, plus spillover
    (0..26)
        .map(|k| PhysiologicalSample {
            channel: Channel::SkinConductance,
            value: ((k * 5) % 7) as f64 + 0.25,
            timestamp_ms: k * 500,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn recorded_session_round_trips_through_its_directory() {
    let root = tempfile::tempdir().unwrap();
    let neutral: PathBuf = root.path().join("neutral");
    let excitatory: PathBuf = root.path().join("excitatory");
    write_images(&neutral, &["calm.png"]);
    write_images(&excitatory, &["alarm.png"]);
    let pool = library::load_pool(&neutral, &excitatory).unwrap();

    let config = ExperimentConfig {
        trials: 3,
        first_screen_secs: 2,
        pre_screen_secs: 1,
        stimulus_secs: 1,
        post_screen_secs: 1,
        before_delay: DelayRange::fixed(0),
        after_delay: DelayRange::new(0, 1),
        mode: TrialMode::FreeRunning,
        ..Default::default()
    };
    let source: Box<dyn RandomSource + Send> = Box::new(ScriptedSource::new("00 0 01 0 00"));
    let mut scheduler = TrialScheduler::new(
        config.clone(),
        pool,
        Some(source),
        SessionTimer::new(),
        ConsoleDisplay::new(),
        ChannelGate::channel(1).1,
        StopToken::never(),
    );
    assert_eq!(scheduler.run().await.unwrap(), SessionState::Completed);
    assert_eq!(scheduler.display().shown(), 3);
    let session = scheduler.into_session();
    let trials = session.trials();
    assert_eq!(
        trials.iter().map(|t| t.cumulative_onset_secs).collect::<Vec<_>>(),
        [3, 6, 9]
    );

    let samples = skin_conductance();
    let settings = AnalysisSettings {
        shuffle_count: 300,
        ..AnalysisSettings::new(2, config.pre_screen_secs)
    };
    let analysis =
        analyze_session(&samples, trials, &settings, &mut StdRng::seed_from_u64(5)).unwrap();
    assert!(analysis.invalid.is_empty());

    let mut summary = Summary::from_session(
        "p01",
        "scripted",
        config.mode,
        config.trials,
        config.pre_screen_secs,
        &session,
    );
    summary.sample_rate_per_sec = Some(2);
    summary.set_analysis(&analysis, settings.shuffle_count);

    let dir = root.path().join("sessions").join("p01");
    SessionExport {
        summary: &summary,
        trials,
        samples: &samples,
        analysis: &analysis,
    }
    .write(&dir)
    .unwrap();

    let loaded = load_session(&dir).unwrap();
    assert_eq!(loaded.trials, trials);
    assert_eq!(loaded.samples, samples);
    assert_eq!(loaded.summary.state, SessionState::Completed);
    assert_eq!(loaded.summary.trials_recorded, 3);
    assert_eq!(loaded.summary.sample_rate_per_sec, Some(2));
    assert_eq!(loaded.summary.channels.len(), 1);
    assert_eq!(loaded.summary.wall_anchor, summary.wall_anchor);

    let trials_csv = fs::read_to_string(dir.join(TRIALS_FILE)).unwrap();
    assert!(trials_csv.lines().next().unwrap().ends_with(",fn_skin-conductance"));
    // trials span 2 s to 11 s: 18 samples at 2 per second
    let physiology = fs::read_to_string(dir.join(PHYSIOLOGY_FILE)).unwrap();
    assert_eq!(physiology.lines().count(), 1 + 18);
}

#[tokio::test(start_paused = true)]
async fn stopped_session_still_exports_its_trials() {
    let root = tempfile::tempdir().unwrap();
    write_images(&root.path().join("n"), &["1.png"]);
    write_images(&root.path().join("e"), &["1.png"]);
    let pool = library::load_pool(&root.path().join("n"), &root.path().join("e")).unwrap();

    let config = ExperimentConfig {
        trials: 3,
        first_screen_secs: 0,
        pre_screen_secs: 1,
        stimulus_secs: 1,
        post_screen_secs: 1,
        after_delay: DelayRange::fixed(0),
        mode: TrialMode::OnDemand,
        ..Default::default()
    };
    let (tx, gate) = ChannelGate::channel(1);
    drop(tx);
    let source: Box<dyn RandomSource + Send> = Box::new(ScriptedSource::new("01 0"));
    let mut scheduler = TrialScheduler::new(
        config.clone(),
        pool,
        Some(source),
        SessionTimer::new(),
        ConsoleDisplay::new(),
        gate,
        StopToken::never(),
    );
    assert_eq!(scheduler.run().await.unwrap(), SessionState::Stopped);
    let session = scheduler.into_session();

    let summary = Summary::from_session("p02", "scripted", config.mode, 3, 1, &session);
    assert_eq!(summary.interrupted_trial, Some(2));
    let dir = root.path().join("p02");
    SessionExport {
        summary: &summary,
        trials: session.trials(),
        samples: &[],
        analysis: &Default::default(),
    }
    .write(&dir)
    .unwrap();

    let loaded = load_session(&dir).unwrap();
    assert_eq!(loaded.summary.state, SessionState::Stopped);
    assert_eq!(loaded.trials.len(), 1);
    assert_eq!(loaded.trials[0].stimulus.to_string(), "E-2");
    assert!(loaded.samples.is_empty());
}
