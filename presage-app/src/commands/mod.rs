pub mod analyze;
pub mod bits;
pub mod run;
pub mod sensor;
pub mod sources;

use anyhow::Result;
use presage_analysis::{AnalysisSettings, SessionAnalysis, analyze_session};
use presage_app::{AppConfig, Summary};
use presage_core::{PhysiologicalSample, TrialRecord};

pub fn default_config() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&AppConfig::default())?);
    Ok(())
}

/// Per-channel analysis with a fresh thread RNG driving the shuffles.
pub fn analyze(
    samples: &[PhysiologicalSample],
    trials: &[TrialRecord],
    sample_rate_per_sec: u32,
    pre_screen_secs: u64,
    shuffle_count: usize,
) -> Result<SessionAnalysis> {
    let settings = AnalysisSettings {
        sample_rate_per_sec,
        pre_screen_secs,
        shuffle_count,
    };
    Ok(analyze_session(samples, trials, &settings, &mut rand::rng())?)
}

pub fn print_summary(summary: &Summary, trials: &[TrialRecord]) {
    let (neutral, excitatory) = presage_app::export::category_counts(trials);
    println!();
    println!("Session {} ({:?})", summary.session_id, summary.state);
    println!(
        "  trials: {} of {} ({neutral} neutral, {excitatory} excitatory)",
        summary.trials_recorded, summary.trials_planned
    );
    println!("  source: {}", summary.random_source);
    if let Some(trial) = summary.interrupted_trial {
        println!("  interrupted during trial {trial}");
    }
    for c in &summary.channels {
        println!(
            "  {:<18} D = {:>10.4}   ZD = {:>8.4}",
            c.channel.to_string(),
            c.d,
            c.zd
        );
    }
    for invalid in &summary.invalid_channels {
        println!(
            "  {:<18} invalid: {}",
            invalid.channel.to_string(),
            invalid.reason
        );
    }
}
