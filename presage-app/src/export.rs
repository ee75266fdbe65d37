//! Session exports: flat CSV tables plus a JSON summary.
//!
//! `trials.csv` and `samples.csv` parse back into the records they were
//! written from, so a session can be re-analyzed from its directory alone.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use presage_analysis::{InvalidChannel, SessionAnalysis};
use presage_core::{
    Category, Channel, PhysiologicalSample, SessionState, StimulusId, TrialDurations, TrialMode,
    TrialRecord, TrialTimestamps,
};
use presage_experiment::Session;
use presage_timing::{CalibrationStats, format_clock, wall_clock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const TRIALS_FILE: &str = "trials.csv";
pub const PHYSIOLOGY_FILE: &str = "physiology.csv";
pub const SAMPLES_FILE: &str = "samples.csv";
pub const SUMMARY_FILE: &str = "summary.json";

const TRIAL_COLUMNS: [&str; 10] = [
    "trial",
    "stimulus",
    "start",
    "end",
    "start_ms",
    "end_ms",
    "before_delay_s",
    "after_delay_s",
    "duration_s",
    "cumulative_onset_s",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: Channel,
    pub d: f64,
    pub zd: f64,
}

/// Session facts and results that do not fit the per-row tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub session_id: String,
    pub state: SessionState,
    pub random_source: String,
    pub mode: TrialMode,
    pub trials_planned: usize,
    pub trials_recorded: usize,
    /// Wall-clock time of session-clock zero.
    pub wall_anchor: DateTime<Local>,
    pub started: Option<DateTime<Local>>,
    pub first_onset: Option<DateTime<Local>>,
    pub finished: Option<DateTime<Local>>,
    pub interrupted_trial: Option<usize>,
    pub pre_screen_secs: u64,
    /// Absent when nothing was recorded.
    pub sample_rate_per_sec: Option<u32>,
    pub shuffle_count: usize,
    pub channels: Vec<ChannelSummary>,
    pub invalid_channels: Vec<InvalidChannel>,
    pub timing: CalibrationStats,
}

impl Summary {
    pub fn from_session(
        session_id: &str,
        random_source: &str,
        mode: TrialMode,
        trials_planned: usize,
        pre_screen_secs: u64,
        session: &Session,
    ) -> Self {
        let at = |ts: Option<u64>| ts.map(|ts| session.wall_clock(ts));
        Self {
            session_id: session_id.to_string(),
            state: session.state(),
            random_source: random_source.to_string(),
            mode,
            trials_planned,
            trials_recorded: session.trials().len(),
            wall_anchor: session.wall_anchor(),
            started: at(session.started_ms()),
            first_onset: at(session.first_onset_ms()),
            finished: at(session.finished_ms()),
            interrupted_trial: session.interrupted().map(|t| t.trial_id),
            pre_screen_secs,
            sample_rate_per_sec: None,
            shuffle_count: 0,
            channels: Vec::new(),
            invalid_channels: Vec::new(),
            timing: session.calibration(),
        }
    }

    pub fn set_analysis(&mut self, analysis: &SessionAnalysis, shuffle_count: usize) {
        self.shuffle_count = shuffle_count;
        self.channels = analysis
            .channels
            .iter()
            .map(|c| ChannelSummary {
                channel: c.channel,
                d: c.result.d,
                zd: c.result.zd,
            })
            .collect();
        self.invalid_channels = analysis.invalid.clone();
    }
}

/// Fn per trial for every valid channel, keyed by trial id.
fn fn_columns(analysis: &SessionAnalysis) -> Vec<(Channel, BTreeMap<usize, f64>)> {
    analysis
        .channels
        .iter()
        .map(|c| {
            let sums = c
                .alignment
                .aggregates
                .iter()
                .map(|a| (a.trial_id, a.fn_sum))
                .collect();
            (c.channel, sums)
        })
        .collect()
}

/// `n{id}` in the tables, the trial id in memory.
mod trial_label {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(trial_id: &usize, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&format_args!("n{trial_id}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
        let label = String::deserialize(d)?;
        label
            .strip_prefix('n')
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| de::Error::custom(format!("bad trial label {label:?}")))
    }
}

/// Stimulus ids as `N-3` / `E-4`.
mod stimulus_label {
    use presage_core::StimulusId;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(id: &StimulusId, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<StimulusId, D::Error> {
        String::deserialize(d)?.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TrialRow {
    #[serde(with = "trial_label")]
    trial: usize,
    #[serde(with = "stimulus_label")]
    stimulus: StimulusId,
    start: String,
    end: String,
    start_ms: u64,
    end_ms: u64,
    before_delay_s: u64,
    after_delay_s: u64,
    duration_s: u64,
    cumulative_onset_s: u64,
}

impl TrialRow {
    fn new(t: &TrialRecord, anchor: DateTime<Local>) -> Self {
        Self {
            trial: t.trial_id,
            stimulus: t.stimulus,
            start: format_clock(wall_clock(anchor, t.timestamps.start_ms)),
            end: format_clock(wall_clock(anchor, t.timestamps.end_ms)),
            start_ms: t.timestamps.start_ms,
            end_ms: t.timestamps.end_ms,
            before_delay_s: t.durations.before_delay_secs,
            after_delay_s: t.durations.after_delay_secs,
            duration_s: t.durations.total_secs,
            cumulative_onset_s: t.cumulative_onset_secs,
        }
    }

    fn into_record(self) -> TrialRecord {
        TrialRecord {
            trial_id: self.trial,
            stimulus: self.stimulus,
            timestamps: TrialTimestamps {
                start_ms: self.start_ms,
                end_ms: self.end_ms,
            },
            durations: TrialDurations {
                before_delay_secs: self.before_delay_s,
                after_delay_secs: self.after_delay_s,
                total_secs: self.duration_s,
            },
            cumulative_onset_secs: self.cumulative_onset_s,
        }
    }
}

const PHYSIOLOGY_COLUMNS: [&str; 10] = [
    "channel",
    "trial",
    "instance",
    "timestamp_ms",
    "time",
    "value",
    "mean",
    "sd",
    "z",
    "f",
];

#[derive(Debug, Serialize)]
struct PhysiologyRow {
    channel: Channel,
    #[serde(with = "trial_label")]
    trial: usize,
    instance: usize,
    timestamp_ms: u64,
    time: String,
    value: f64,
    mean: f64,
    sd: f64,
    z: f64,
    f: f64,
}

const SAMPLE_COLUMNS: [&str; 3] = ["channel", "timestamp_ms", "value"];

#[derive(Debug, Serialize, Deserialize)]
struct SampleRow {
    channel: Channel,
    timestamp_ms: u64,
    value: f64,
}

/// Header first, then one serialized row per item, so empty tables keep
/// their header.
fn write_table<W, I>(out: W, header: &[String], rows: I) -> Result<()>
where
    W: Write,
    I: IntoIterator,
    I::Item: Serialize,
{
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn header(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

pub fn write_trials<W: Write>(
    out: W,
    trials: &[TrialRecord],
    anchor: DateTime<Local>,
    analysis: &SessionAnalysis,
) -> Result<()> {
    let fns = fn_columns(analysis);
    let mut columns = header(&TRIAL_COLUMNS);
    columns.extend(fns.iter().map(|(channel, _)| format!("fn_{}", channel.key())));
    let rows = trials.iter().map(|t| {
        let sums: Vec<Option<f64>> = fns
            .iter()
            .map(|(_, sums)| sums.get(&t.trial_id).copied())
            .collect();
        (TrialRow::new(t, anchor), sums)
    });
    write_table(out, &columns, rows)
}

/// One row per aligned instance per valid channel.
pub fn write_physiology<W: Write>(
    out: W,
    analysis: &SessionAnalysis,
    anchor: DateTime<Local>,
) -> Result<()> {
    let rows = analysis.channels.iter().flat_map(|channel| {
        channel.alignment.instances.iter().map(|i| PhysiologyRow {
            channel: channel.channel,
            trial: i.trial_id,
            instance: i.instance,
            timestamp_ms: i.sample.timestamp_ms,
            time: format_clock(wall_clock(anchor, i.sample.timestamp_ms)),
            value: i.sample.value,
            mean: i.mean,
            sd: i.sd,
            z: i.z,
            f: i.f,
        })
    });
    write_table(out, &header(&PHYSIOLOGY_COLUMNS), rows)
}

pub fn write_samples<W: Write>(out: W, samples: &[PhysiologicalSample]) -> Result<()> {
    let rows = samples.iter().map(|s| SampleRow {
        channel: s.channel,
        timestamp_ms: s.timestamp_ms,
        value: s.value,
    });
    write_table(out, &header(&SAMPLE_COLUMNS), rows)
}

fn read_table<R, T>(input: R, what: &str) -> Result<Vec<T>>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(input);
    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(idx, row)| row.with_context(|| format!("parsing {what} row {}", idx + 1)))
        .collect()
}

/// Trials back from `trials.csv`; Fn columns are ignored.
pub fn parse_trials<R: Read>(input: R) -> Result<Vec<TrialRecord>> {
    let rows: Vec<TrialRow> = read_table(input, TRIALS_FILE)?;
    Ok(rows.into_iter().map(TrialRow::into_record).collect())
}

pub fn parse_samples<R: Read>(input: R) -> Result<Vec<PhysiologicalSample>> {
    let rows: Vec<SampleRow> = read_table(input, SAMPLES_FILE)?;
    Ok(rows
        .into_iter()
        .map(|r| PhysiologicalSample {
            channel: r.channel,
            timestamp_ms: r.timestamp_ms,
            value: r.value,
        })
        .collect())
}

/// Everything written for one session.
pub struct SessionExport<'a> {
    pub summary: &'a Summary,
    pub trials: &'a [TrialRecord],
    pub samples: &'a [PhysiologicalSample],
    pub analysis: &'a SessionAnalysis,
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

impl SessionExport<'_> {
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        let anchor = self.summary.wall_anchor;
        write_trials(create(dir, TRIALS_FILE)?, self.trials, anchor, self.analysis)?;
        write_physiology(create(dir, PHYSIOLOGY_FILE)?, self.analysis, anchor)?;
        write_samples(create(dir, SAMPLES_FILE)?, self.samples)?;
        write_summary(dir, self.summary)
    }
}

pub fn write_summary(dir: &Path, summary: &Summary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(dir.join(SUMMARY_FILE), json)
        .with_context(|| format!("cannot write {SUMMARY_FILE} in {}", dir.display()))
}

/// An exported session read back from its directory.
pub struct LoadedSession {
    pub summary: Summary,
    pub trials: Vec<TrialRecord>,
    pub samples: Vec<PhysiologicalSample>,
}

pub fn load_session(dir: &Path) -> Result<LoadedSession> {
    let open = |name: &str| -> Result<BufReader<File>> {
        let path = dir.join(name);
        let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
        Ok(BufReader::new(file))
    };
    let summary: Summary = serde_json::from_reader(open(SUMMARY_FILE)?)
        .with_context(|| format!("invalid {SUMMARY_FILE}"))?;
    let trials = parse_trials(open(TRIALS_FILE)?)?;
    let samples = parse_samples(open(SAMPLES_FILE)?)?;
    if trials.len() != summary.trials_recorded {
        bail!(
            "{TRIALS_FILE} has {} trials but the summary records {}",
            trials.len(),
            summary.trials_recorded
        );
    }
    Ok(LoadedSession {
        summary,
        trials,
        samples,
    })
}

/// Neutral and excitatory trial counts, for the operator report.
pub fn category_counts(trials: &[TrialRecord]) -> (usize, usize) {
    let excitatory = trials
        .iter()
        .filter(|t| t.stimulus.category == Category::Excitatory)
        .count();
    (trials.len() - excitatory, excitatory)
}
