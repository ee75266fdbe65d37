use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use presage_analysis::DEFAULT_SHUFFLES;
use presage_app::{LoadedSession, SessionExport, load_session};

pub fn run(dir: &Path, shuffles: Option<usize>) -> Result<()> {
    let LoadedSession {
        mut summary,
        trials,
        samples,
    } = load_session(dir)?;
    let rate = summary
        .sample_rate_per_sec
        .context("session has no physiological recording to analyze")?;
    let shuffle_count = shuffles
        .or((summary.shuffle_count > 0).then_some(summary.shuffle_count))
        .unwrap_or(DEFAULT_SHUFFLES);
    info!(
        "re-analyzing {} trial(s), {} sample(s) from {}",
        trials.len(),
        samples.len(),
        dir.display()
    );

    let analysis = super::analyze(&samples, &trials, rate, summary.pre_screen_secs, shuffle_count)?;
    summary.set_analysis(&analysis, shuffle_count);
    SessionExport {
        summary: &summary,
        trials: &trials,
        samples: &samples,
        analysis: &analysis,
    }
    .write(dir)?;
    super::print_summary(&summary, &trials);
    Ok(())
}
