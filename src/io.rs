//! File I/O: safetensors power files, CSV trial tables, and exports.
//!
//! Power file layout (all keys required):
//!
//! ```text
//! power       [F, T, Tr, E]  F32 | F64
//! freqs       [F]            F32 | F64   Hz
//! times       [T]            F32 | F64   seconds
//! trials      [Tr]           I32 | I64   trial ids
//! electrodes  [bytes]        U8          newline-joined UTF-8 names
//! ```
//!
//! Trial table: CSV with at least the columns `Trial` and `Condition`; every
//! other column is kept as a string covariate.
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::axis::{Axis, Labels, TfArray, TrialId};
use crate::error::TfError;
use crate::render::Heatmap;
use crate::repository::{apply_request, LoadRequest, PowerSource};
use crate::trials::{TrialIndex, TrialRecord};

// ── Low-level safetensors parser ──────────────────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len);
    let end = usize::try_from(n)
        .ok()
        .and_then(|n| n.checked_add(8))
        .filter(|&end| end <= bytes.len())
        .with_context(|| format!("safetensors header length {n} exceeds file size {}", bytes.len()))?;
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..end]).context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn tensor_bytes<'a>(bytes: &'a [u8], data_start: usize, entry: &serde_json::Value) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"].as_array().context("missing data_offsets")?;
    let offset = |i: usize| -> Result<usize> {
        offsets
            .get(i)
            .and_then(|v| v.as_u64())
            .and_then(|v| usize::try_from(v).ok())
            .and_then(|v| data_start.checked_add(v))
            .context("bad data_offsets")
    };
    let (s, e) = (offset(0)?, offset(1)?);
    if s > e {
        bail!("data_offsets [{s}, {e}] are inverted");
    }
    bytes.get(s..e).context("tensor data out of bounds")
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("missing shape")?
        .iter()
        .map(|v| v.as_u64().map(|n| n as usize).context("bad shape entry"))
        .collect()
}

/// Any numeric tensor, widened to f64.
fn read_numeric(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    let dtype = entry["dtype"].as_str().context("missing dtype")?;
    let vals: Vec<f64> = match dtype {
        "F32" => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "F64" => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        "I32" => raw
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "I64" => raw
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64)
            .collect(),
        other => bail!("unsupported dtype {other}"),
    };
    Ok(vals)
}

fn read_text(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<String>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    let s = std::str::from_utf8(raw).context("names are not UTF-8")?;
    if s.is_empty() {
        return Ok(Vec::new());
    }
    Ok(s.split('\n').map(String::from).collect())
}

/// Names must survive the newline-joined text encoding.
fn check_names(names: &[String]) -> Result<()> {
    for (i, n) in names.iter().enumerate() {
        if n.is_empty() {
            bail!("name {i} is empty");
        }
        if n.contains('\n') {
            bail!("name {n:?} contains a newline");
        }
    }
    Ok(())
}

// ── Power files ───────────────────────────────────────────────────────────────

/// Read a canonical power array from a safetensors file.
pub fn read_power(path: &Path) -> Result<TfArray> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;
    let entry = |key: &str| header.get(key).with_context(|| format!("missing '{key}' key"));

    let power_entry = entry("power")?;
    let shape = shape_of(power_entry)?;
    if shape.len() != 4 {
        bail!("'power' must be 4-D [F, T, Tr, E], got shape {shape:?}");
    }
    let values = read_numeric(&bytes, data_start, power_entry)?;
    let data = ArrayD::from_shape_vec(IxDyn(&shape), values).context("'power' size mismatch")?;

    let freqs = read_numeric(&bytes, data_start, entry("freqs")?)?;
    let times = read_numeric(&bytes, data_start, entry("times")?)?;
    let trials = read_numeric(&bytes, data_start, entry("trials")?)?
        .into_iter()
        .map(|v| {
            if v >= 0.0 && v.fract() == 0.0 && v <= TrialId::MAX as f64 {
                Ok(v as TrialId)
            } else {
                bail!("trial id {v} is not a non-negative integer")
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let electrodes = read_text(&bytes, data_start, entry("electrodes")?)?;
    check_names(&electrodes).context("bad 'electrodes' tensor")?;

    let arr = TfArray::new(
        data,
        vec![
            Axis::frequency(freqs),
            Axis::time(times),
            Axis::trial(trials),
            Axis::electrode(electrodes),
        ],
    )?;
    Ok(arr)
}

/// Write a canonical power array in the layout [`read_power`] expects.
pub fn write_power(path: &Path, power: &TfArray) -> Result<()> {
    if !power.is_canonical() {
        bail!(TfError::ShapeMismatch(format!("not canonical: {:?}", power.dims())));
    }
    if let Some(names) = power.axes()[3].as_names() {
        check_names(names).context("electrode names cannot be written")?;
    }
    let mut w = StWriter::new();
    w.add_f64_arr("power", power.data());
    for (ax, key) in power.axes().iter().zip(["freqs", "times", "trials", "electrodes"]) {
        w.add_labels(key, ax.labels());
    }
    w.write(path)
}

/// [`PowerSource`] reading a safetensors power file on every fetch.
///
/// Any read failure is reported as [`TfError::DataUnavailable`].
#[derive(Debug, Clone)]
pub struct SafetensorsSource {
    path: PathBuf,
}

impl SafetensorsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PowerSource for SafetensorsSource {
    fn fetch(&self, request: &LoadRequest) -> crate::Result<TfArray> {
        let full = read_power(&self.path)
            .map_err(|e| TfError::DataUnavailable(format!("{}: {e:#}", self.path.display())))?;
        apply_request(&full, request)
    }
}

// ── Trial tables ──────────────────────────────────────────────────────────────

/// Read a CSV trial table into a [`TrialIndex`].
pub fn read_trial_table(path: &Path) -> Result<TrialIndex> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening trial table {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let column = |name: &str| -> Result<usize> {
        match headers.iter().position(|h| h == name) {
            Some(i) => Ok(i),
            None => bail!(TfError::DataUnavailable(format!("trial table has no '{name}' column"))),
        }
    };
    let trial_idx = column("Trial")?;
    let cond_idx = column("Condition")?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let trial: TrialId = record
            .get(trial_idx)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("CSV row {row_no}: bad Trial value"))?;
        let mut rec = TrialRecord::new(record.get(cond_idx).unwrap_or("").trim());
        rec.covariates = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != trial_idx && *i != cond_idx)
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect::<BTreeMap<_, _>>();
        rows.push((trial, rec));
    }
    log::debug!("read {} trials from {}", rows.len(), path.display());
    Ok(TrialIndex::from_records(rows)?)
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer for F32, F64, I64 and U8 tensors.
///
/// Usage:
/// ```rust,no_run
/// use tfpower::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("zlim", &[-13.0, 13.0], &[2]);
/// w.add_text("names", &["LA1".to_string(), "LA2".to_string()]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    /// Any-dimensional f64 array, written in logical (row-major) order.
    pub fn add_f64_arr<S, D>(&mut self, name: &str, arr: &ArrayBase<S, D>)
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, arr.shape());
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    /// Newline-joined UTF-8 strings as a `U8` tensor.
    pub fn add_text(&mut self, name: &str, items: &[String]) {
        let bytes = items.join("\n").into_bytes();
        let n = bytes.len();
        self.entries.push((name.to_string(), bytes, "U8", vec![n]));
    }

    /// Axis labels, using the dtype that matches their kind.
    pub fn add_labels(&mut self, name: &str, labels: &Labels) {
        match labels {
            Labels::Numeric(v) => self.add_f64(name, v, &[v.len()]),
            Labels::Trials(v) => {
                let ids: Vec<i64> = v.iter().map(|&id| id as i64).collect();
                self.add_i64(name, &ids, &[ids.len()]);
            }
            Labels::Names(v) => self.add_text(name, v),
        }
    }

    /// A labelled array as `name` plus one `name.<Dim>` label tensor per axis.
    pub fn add_tf_array(&mut self, name: &str, arr: &TfArray) {
        self.add_f64_arr(name, arr.data());
        for ax in arr.axes() {
            self.add_labels(&format!("{name}.{}", ax.dim()), ax.labels());
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

// ── Heatmap writer ────────────────────────────────────────────────────────────

/// Write a heatmap for a rendering backend.
///
/// Keys: `heatmap` `[R, C]` F64, `rows`, `cols` (axis labels), `zlim` `[2]`,
/// `row_dim` / `col_dim` (axis names as text).
pub fn write_heatmap(path: &Path, hm: &Heatmap) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr("heatmap", hm.data());
    w.add_labels("rows", hm.rows().labels());
    w.add_labels("cols", hm.cols().labels());
    let (lo, hi) = hm.range();
    w.add_f64("zlim", &[lo, hi], &[2]);
    w.add_text("row_dim", &[hm.rows().dim().to_string()]);
    w.add_text("col_dim", &[hm.cols().dim().to_string()]);
    w.write(path)
}
