/// tfr_steps: run each pipeline step and write every intermediate array to a
/// safetensors file for comparison against the analysis scripts.
///
/// Output keys (each array also gets `<key>.<Dim>` label tensors):
///   raw        [F, T, Tr, E]  f64  power as loaded
///   baselined  [F, T, Tr, E]  f64  after baseline normalisation
///   selected   [F, T, Tr', E'] f64 trials of the requested conditions
///                                  (and requested electrodes)
///   averaged   [F, T]         f64  mean over Trial and Electrode
///   heatmap    [F, T]         f64  averaged, clipped into zlim
///   zlim       [2]            f64
///   n_trials   [1]            i64
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use tfpower::{
    baseline::{apply_baseline, BaselineScope, BaselineWindow},
    io::{read_trial_table, StWriter, SafetensorsSource},
    select::{collapse, subset},
    BaselineMethod, Dim, Heatmap, LoadRequest, NanPolicy, SpectrogramRepository, Strictness,
    TrialId, ValueRange,
};

#[derive(Parser, Debug)]
#[command(name = "tfr_steps")]
struct Args {
    /// Input power safetensors.
    #[arg(long)]
    power: PathBuf,

    /// Trial table CSV.
    #[arg(long)]
    trials: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Condition labels to pool (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    conditions: Vec<String>,

    /// Electrodes to average over (comma-separated; default all).
    #[arg(long, value_delimiter = ',')]
    electrodes: Vec<String>,

    /// Baseline window start (s).
    #[arg(long, default_value_t = -0.5, allow_negative_numbers = true)]
    baseline_lo: f64,

    /// Baseline window end (s).
    #[arg(long, default_value_t = -0.1, allow_negative_numbers = true)]
    baseline_hi: f64,

    /// Baseline method.
    #[arg(long, default_value = "decibel")]
    method: BaselineMethod,

    /// Take the baseline reference per trial instead of pooling trials.
    #[arg(long)]
    per_trial: bool,

    /// Fail on condition labels that match no trial.
    #[arg(long)]
    strict: bool,

    /// Ignore NaN samples when averaging.
    #[arg(long)]
    skip_nan: bool,

    /// Color range half-width.
    #[arg(long, default_value_t = 13.0)]
    zlim: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // ── 1. Load ────────────────────────────────────────────────────────────
    let t_load = now();
    let source = SafetensorsSource::new(&args.power);
    let repo = SpectrogramRepository::load(&source, &LoadRequest::default())?;
    let index = read_trial_table(&args.trials)?;
    let ms_load = t_load.elapsed().as_secs_f64() * 1000.0;

    // ── 2. Baseline ────────────────────────────────────────────────────────
    let t_bl = now();
    let window = BaselineWindow::new(args.baseline_lo, args.baseline_hi);
    let scope = if args.per_trial { BaselineScope::PerTrial } else { BaselineScope::Pooled };
    let baselined = apply_baseline(repo.raw(), window, args.method, scope)?;
    let ms_bl = t_bl.elapsed().as_secs_f64() * 1000.0;

    // ── 3. Select trials ───────────────────────────────────────────────────
    let t_sel = now();
    let strictness = if args.strict { Strictness::Strict } else { Strictness::Permissive };
    let trials = index.trials_for(&args.conditions, strictness)?;
    let in_list = |name: &str| args.electrodes.iter().any(|e| e == name);
    let selected = subset(
        &baselined,
        Some(&|id: TrialId| trials.contains(&id)),
        (!args.electrodes.is_empty()).then_some(&in_list as &dyn Fn(&str) -> bool),
    )?;
    let ms_sel = t_sel.elapsed().as_secs_f64() * 1000.0;

    // ── 4. Collapse ────────────────────────────────────────────────────────
    let t_col = now();
    let nan = if args.skip_nan { NanPolicy::Skip } else { NanPolicy::Propagate };
    let averaged = collapse(&selected, &[Dim::Frequency, Dim::Time], nan)?;
    let ms_col = t_col.elapsed().as_secs_f64() * 1000.0;

    // ── 5. Clip ────────────────────────────────────────────────────────────
    let hm = Heatmap::from_array(&averaged, ValueRange::Explicit { min: -args.zlim, max: args.zlim })?;

    eprintln!(
        "TIMING load={ms_load:.4}ms baseline={ms_bl:.4}ms select={ms_sel:.4}ms collapse={ms_col:.4}ms",
    );
    eprintln!(
        "  power {:?}  {} of {} trials, {} of {} electrodes selected",
        repo.shape(),
        selected.shape()[2],
        repo.trials().len(),
        selected.shape()[3],
        repo.electrodes().len()
    );

    // ── 6. Write output ────────────────────────────────────────────────────
    eprintln!("Writing → {}", args.output.display());
    let mut w = StWriter::new();
    w.add_tf_array("raw", repo.raw());
    w.add_tf_array("baselined", &baselined);
    w.add_tf_array("selected", &selected);
    w.add_tf_array("averaged", &averaged);
    w.add_f64_arr("heatmap", hm.data());
    let (lo, hi) = hm.range();
    w.add_f64("zlim", &[lo, hi], &[2]);
    w.add_i64("n_trials", &[selected.shape()[2] as i64], &[1]);
    w.write(&args.output)?;

    eprintln!("Done.");
    Ok(())
}

/// Return `std::time::Instant::now()` (used for internal timing).
#[inline(always)]
fn now() -> std::time::Instant { std::time::Instant::now() }
