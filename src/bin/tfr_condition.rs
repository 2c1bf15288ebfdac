/// tfr_condition: condition-average Frequency × Time heatmap.
///
/// Loads a safetensors power file and a CSV trial table, baselines the power,
/// keeps the trials of the requested conditions (and optionally a subset of
/// electrodes), averages over trials and electrodes, clips into the color
/// range and writes the heatmap as safetensors for a plotting backend.
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use tfpower::{
    condition_spectrogram,
    io::{read_trial_table, write_heatmap, SafetensorsSource},
    BaselineMethod, BaselineScope, BaselineWindow, LoadRequest, NanPolicy, PipelineConfig,
    Session, SpectrogramRepository, Strictness, ValueRange,
};

#[derive(Parser, Debug)]
#[command(name = "tfr_condition", about = "Condition-average time-frequency heatmap")]
struct Args {
    /// Power file ([F, T, Tr, E] safetensors).
    #[arg(long)]
    power: PathBuf,

    /// Trial table CSV (columns Trial, Condition, ...).
    #[arg(long)]
    trials: PathBuf,

    /// Output heatmap safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Condition labels to pool (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    conditions: Vec<String>,

    /// Electrodes to keep (comma-separated; default: all).
    #[arg(long, value_delimiter = ',')]
    electrodes: Vec<String>,

    /// Baseline window start (s).
    #[arg(long, default_value_t = -0.5, allow_negative_numbers = true)]
    baseline_lo: f64,

    /// Baseline window end (s).
    #[arg(long, default_value_t = -0.1, allow_negative_numbers = true)]
    baseline_hi: f64,

    /// Baseline method: decibel, ratio, percent, mean, zscore.
    #[arg(long, default_value = "decibel")]
    method: BaselineMethod,

    /// Take the baseline reference per trial instead of pooling trials.
    #[arg(long)]
    per_trial: bool,

    /// Color range half-width; the heatmap is clipped into [-zlim, zlim].
    #[arg(long, default_value_t = 13.0)]
    zlim: f64,

    /// Derive the color range from the data (symmetric around zero).
    #[arg(long, conflicts_with = "zlim")]
    auto_zlim: bool,

    /// Fail on condition labels that match no trial.
    #[arg(long)]
    strict: bool,

    /// Ignore NaN samples when averaging.
    #[arg(long)]
    skip_nan: bool,

    /// Subject identifier (for logging).
    #[arg(long, default_value = "unknown")]
    subject: String,

    /// Session identifier (for logging).
    #[arg(long)]
    session: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = PipelineConfig {
        baseline_window: BaselineWindow::new(args.baseline_lo, args.baseline_hi),
        baseline_method: args.method,
        baseline_scope: if args.per_trial { BaselineScope::PerTrial } else { BaselineScope::Pooled },
        strictness: if args.strict { Strictness::Strict } else { Strictness::Permissive },
        nan_policy: if args.skip_nan { NanPolicy::Skip } else { NanPolicy::Propagate },
        zlim: if args.auto_zlim {
            ValueRange::Symmetric
        } else {
            ValueRange::Explicit { min: -args.zlim, max: args.zlim }
        },
    };
    let session = Session { subject: args.subject, session: args.session, config };

    let request = LoadRequest {
        electrodes: (!args.electrodes.is_empty()).then(|| args.electrodes.clone()),
        ..LoadRequest::default()
    };
    let source = SafetensorsSource::new(&args.power);
    let mut repo = SpectrogramRepository::load(&source, &request)?;
    let index = read_trial_table(&args.trials)?;
    println!(
        "Loaded power {:?} (F × T × Tr × E), {} trials in table",
        repo.shape(),
        index.len()
    );

    let hm = condition_spectrogram(&mut repo, &index, &session, &args.conditions, None)?;
    println!("Heatmap {:?}, zlim {:?}", hm.data().dim(), hm.range());

    write_heatmap(&args.output, &hm)?;
    println!("Written → {}", args.output.display());
    Ok(())
}
