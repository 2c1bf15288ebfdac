/// tfr_synth: write a synthetic power file and matching trial table.
///
/// Power is 1/f background with multiplicative noise; trials of the `active`
/// condition get a post-stimulus high-gamma (70–150 Hz) increase on the
/// responsive electrodes.  Useful for trying `tfr_condition` end to end.
use anyhow::{Context, Result};
use clap::Parser;
use ndarray::Array4;
use std::path::PathBuf;

use tfpower::{io::write_power, TfArray, TrialId};

#[derive(Parser, Debug)]
#[command(name = "tfr_synth")]
struct Args {
    /// Output power safetensors.
    #[arg(long)]
    power: PathBuf,

    /// Output trial table CSV.
    #[arg(long)]
    trials: PathBuf,

    /// Trials per condition.
    #[arg(long, default_value_t = 20)]
    n_trials: usize,

    /// PRNG seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const CONDITIONS: [&str; 2] = ["active", "passive"];
const ELECTRODES: [&str; 4] = ["LTG1", "LTG2", "LTG3", "LTG4"];
/// Electrodes carrying the high-gamma response.
const RESPONSIVE: [usize; 2] = [1, 2];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    // 30 log-spaced frequencies 4 → 150 Hz; 10 ms steps from -0.5 to 1.0 s.
    let n_f = 30;
    let freqs: Vec<f64> = (0..n_f)
        .map(|i| 4.0 * (150.0_f64 / 4.0).powf(i as f64 / (n_f - 1) as f64))
        .collect();
    let times: Vec<f64> = (0..=150).map(|i| -0.5 + i as f64 * 0.01).collect();
    let n_tr = args.n_trials * CONDITIONS.len();
    let trial_ids: Vec<TrialId> = (1..=n_tr as TrialId).collect();
    let conditions: Vec<&str> = (0..n_tr).map(|r| CONDITIONS[r % CONDITIONS.len()]).collect();

    let mut data = Array4::<f64>::zeros((n_f, times.len(), n_tr, ELECTRODES.len()));
    for ((f, t, r, e), v) in data.indexed_iter_mut() {
        let background = 1.0 / freqs[f];
        let active = conditions[r] == "active"
            && RESPONSIVE.contains(&e)
            && freqs[f] >= 70.0
            && times[t] > 0.1
            && times[t] < 0.6;
        let gain = if active { 3.0 } else { 1.0 };
        *v = background * gain * (0.5 + rng.next_f64());
    }

    let power = TfArray::from_canonical(
        data,
        freqs,
        times,
        trial_ids.clone(),
        ELECTRODES.iter().map(|s| s.to_string()).collect(),
    )?;
    write_power(&args.power, &power)?;
    println!("Written power {:?} → {}", power.shape(), args.power.display());

    let mut w = csv::Writer::from_path(&args.trials)
        .with_context(|| format!("creating {}", args.trials.display()))?;
    w.write_record(["Trial", "Condition", "Block"])?;
    for (r, (&id, cond)) in trial_ids.iter().zip(&conditions).enumerate() {
        w.write_record([id.to_string(), cond.to_string(), (r / 10 + 1).to_string()])?;
    }
    w.flush()?;
    println!("Written {n_tr} trials → {}", args.trials.display());
    Ok(())
}
