use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, ID_COLUMN, TARGET_COLUMN};

/// The `Dependents` column carries a `"3+"` sentinel for three or more
/// dependents; it is mapped to a plain 3 and the column coerced to numeric.
const DEPENDENTS_COLUMN: &str = "Dependents";
const DEPENDENTS_SENTINEL: &str = "3+";
const DEPENDENTS_SENTINEL_VALUE: &str = "3";

/// A fixed-width numeric feature matrix, row-aligned with the input records.
///
/// Invariant: exactly the fitted column set, in fitted order, no NaN cells.
#[derive(Debug, Clone)]
pub struct EncodedMatrix {
    pub feature_names: Vec<String>,
    pub data: Array2<f64>,
}

impl EncodedMatrix {
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }
}

/// Fitted state for one raw input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnFit {
    /// Numeric column: missing cells are filled with the training median.
    Numeric { name: String, median: f64 },
    /// Categorical column: missing cells are filled with the training mode,
    /// and the column expands into one indicator per observed category after
    /// the lexicographically first (drop-first convention).
    Categorical {
        name: String,
        mode: String,
        categories: Vec<String>,
    },
}

impl ColumnFit {
    pub fn name(&self) -> &str {
        match self {
            ColumnFit::Numeric { name, .. } => name,
            ColumnFit::Categorical { name, .. } => name,
        }
    }
}

/// The immutable output of [`FeatureEncoder::fit`]: per-column imputation
/// statistics, the ordered post-expansion feature names, and the
/// standardization parameters. Shared by the training output and every
/// subsequent prediction or evaluation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoder {
    pub(crate) columns: Vec<ColumnFit>,
    pub feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Deterministic transformation of raw tabular records into a fixed-width
/// numeric feature matrix: fit once on training data, reapply unchanged at
/// prediction and evaluation time.
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Learns imputation statistics, the drop-first categorical expansion,
    /// and the standardization parameters from `dataset`, and returns them
    /// together with the encoded training matrix.
    ///
    /// The target and identifier columns are ignored if present.
    pub fn fit(dataset: &Dataset) -> (FittedEncoder, EncodedMatrix) {
        let prepared = prepare_columns(dataset);
        let n_rows = dataset.len();

        // Per-column typing and imputation statistics, observed at fit time
        // and stored so inference never recomputes them from its own batch.
        let mut fits = Vec::with_capacity(prepared.len());
        for (name, cells) in &prepared {
            fits.push(fit_column(name, cells));
        }

        let feature_names = expand_feature_names(&fits);
        let mut data = Array2::<f64>::zeros((n_rows, feature_names.len()));
        fill_matrix(&mut data, &fits, &prepared);
        fill_residual_missing(&mut data);

        // Standardization is fitted here and only applied afterwards.
        let (mean, scale) = fit_scaler(&data);
        apply_scaler(&mut data, &mean, &scale);

        let encoder = FittedEncoder {
            columns: fits,
            feature_names: feature_names.clone(),
            mean,
            scale,
        };
        debug!(
            "fitted encoder: {} raw columns -> {} features over {} rows",
            encoder.columns.len(),
            encoder.feature_names.len(),
            n_rows
        );
        let matrix = EncodedMatrix {
            feature_names,
            data,
        };
        (encoder, matrix)
    }
}

impl FittedEncoder {
    /// Encodes `dataset` with the stored statistics.
    ///
    /// Alignment policy, logged rather than silent: an unseen category maps
    /// to all-zero indicators; a fitted raw column absent from the input is
    /// treated as all-missing and imputed with the stored statistic; input
    /// columns outside the fitted set are discarded.
    pub fn apply(&self, dataset: &Dataset) -> EncodedMatrix {
        let prepared = prepare_columns(dataset);
        let by_name: HashMap<&str, &Vec<Option<String>>> =
            prepared.iter().map(|(n, c)| (n.as_str(), c)).collect();

        let fitted: HashSet<&str> = self.columns.iter().map(ColumnFit::name).collect();
        for (name, _) in &prepared {
            if !fitted.contains(name.as_str()) {
                warn!("discarding input column '{name}' not present in the fitted feature set");
            }
        }

        let n_rows = dataset.len();
        let all_missing = vec![None; n_rows];
        let mut aligned = Vec::with_capacity(self.columns.len());
        for fit in &self.columns {
            match by_name.get(fit.name()) {
                Some(cells) => aligned.push((fit.name().to_string(), (*cells).clone())),
                None => {
                    warn!(
                        "fitted column '{}' absent from input; imputing with stored statistic",
                        fit.name()
                    );
                    aligned.push((fit.name().to_string(), all_missing.clone()));
                }
            }
        }

        let mut data = Array2::<f64>::zeros((n_rows, self.feature_names.len()));
        fill_matrix(&mut data, &self.columns, &aligned);
        fill_residual_missing(&mut data);
        apply_scaler(&mut data, &self.mean, &self.scale);

        EncodedMatrix {
            feature_names: self.feature_names.clone(),
            data,
        }
    }
}

/// Drops the identifier and target columns and applies the `Dependents`
/// sentinel coercion; cells that fail the numeric coercion become missing.
fn prepare_columns(dataset: &Dataset) -> Vec<(String, Vec<Option<String>>)> {
    let mut prepared = Vec::with_capacity(dataset.columns.len());
    for (idx, name) in dataset.columns.iter().enumerate() {
        if name == ID_COLUMN || name == TARGET_COLUMN {
            continue;
        }
        let mut cells: Vec<Option<String>> = dataset
            .rows
            .iter()
            .map(|row| row.get(idx).cloned().flatten())
            .collect();
        if name == DEPENDENTS_COLUMN {
            for cell in &mut cells {
                *cell = match cell.take() {
                    Some(v) if v == DEPENDENTS_SENTINEL => {
                        Some(DEPENDENTS_SENTINEL_VALUE.to_string())
                    }
                    Some(v) if v.parse::<f64>().is_ok() => Some(v),
                    // Unparseable dependent counts become missing.
                    _ => None,
                };
            }
        }
        prepared.push((name.clone(), cells));
    }
    prepared
}

/// Types one column and computes its stored imputation statistic: a column is
/// numeric iff every non-missing cell parses as `f64`.
fn fit_column(name: &str, cells: &[Option<String>]) -> ColumnFit {
    let present: Vec<&str> = cells.iter().filter_map(|c| c.as_deref()).collect();
    let parsed: Option<Vec<f64>> = present.iter().map(|v| v.parse::<f64>().ok()).collect();

    if let Some(values) = parsed {
        ColumnFit::Numeric {
            name: name.to_string(),
            median: median(&values),
        }
    } else {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &value in &present {
            *counts.entry(value).or_insert(0) += 1;
        }
        // Ties on the most frequent value break lexicographically.
        let mode = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(v, _)| v.to_string())
            .unwrap_or_default();
        let mut categories: Vec<String> = counts.keys().map(|v| v.to_string()).collect();
        categories.sort();
        ColumnFit::Categorical {
            name: name.to_string(),
            mode,
            categories,
        }
    }
}

/// Post-expansion feature names: numeric columns first in raw order, then one
/// indicator group per categorical column, categories sorted, first dropped.
fn expand_feature_names(fits: &[ColumnFit]) -> Vec<String> {
    let mut names = Vec::new();
    for fit in fits {
        if let ColumnFit::Numeric { name, .. } = fit {
            names.push(name.clone());
        }
    }
    for fit in fits {
        if let ColumnFit::Categorical {
            name, categories, ..
        } = fit
        {
            for category in categories.iter().skip(1) {
                names.push(format!("{name}_{category}"));
            }
        }
    }
    names
}

/// Writes the imputed and expanded values into `data`, whose columns follow
/// the [`expand_feature_names`] order for `fits`.
fn fill_matrix(
    data: &mut Array2<f64>,
    fits: &[ColumnFit],
    columns: &[(String, Vec<Option<String>>)],
) {
    let mut feature_idx = 0;
    for (fit, (_, cells)) in fits.iter().zip(columns) {
        if let ColumnFit::Numeric { median, .. } = fit {
            for (row, cell) in cells.iter().enumerate() {
                let value = cell
                    .as_deref()
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(*median);
                data[[row, feature_idx]] = value;
            }
            feature_idx += 1;
        }
    }
    for (fit, (name, cells)) in fits.iter().zip(columns) {
        if let ColumnFit::Categorical {
            mode, categories, ..
        } = fit
        {
            let width = categories.len().saturating_sub(1);
            for (row, cell) in cells.iter().enumerate() {
                let value = cell.as_deref().unwrap_or(mode.as_str());
                match categories.iter().position(|c| c.as_str() == value) {
                    // The first category is the dropped indicator: all zeros.
                    Some(0) => {}
                    Some(pos) => data[[row, feature_idx + pos - 1]] = 1.0,
                    None => {
                        warn!("unseen category '{value}' in column '{name}'; no indicator set");
                    }
                }
            }
            feature_idx += width;
        }
    }
}

/// Residual safety net: any non-finite cell becomes 0 before scaling.
fn fill_residual_missing(data: &mut Array2<f64>) {
    for cell in data.iter_mut() {
        if !cell.is_finite() {
            *cell = 0.0;
        }
    }
}

/// Per-column mean and population standard deviation; a constant column gets
/// scale 1.0 so standardization is a no-op instead of a division by zero.
fn fit_scaler(data: &Array2<f64>) -> (Vec<f64>, Vec<f64>) {
    let n = data.nrows() as f64;
    let mut mean = Vec::with_capacity(data.ncols());
    let mut scale = Vec::with_capacity(data.ncols());
    for column in data.columns() {
        let m = if n > 0.0 { column.sum() / n } else { 0.0 };
        let var = if n > 0.0 {
            column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n
        } else {
            0.0
        };
        let sd = var.sqrt();
        mean.push(m);
        scale.push(if sd > 0.0 { sd } else { 1.0 });
    }
    (mean, scale)
}

fn apply_scaler(data: &mut Array2<f64>, mean: &[f64], scale: &[f64]) {
    for mut row in data.rows_mut() {
        for (idx, cell) in row.iter_mut().enumerate() {
            *cell = (*cell - mean[idx]) / scale[idx];
        }
    }
}

/// Median with the mean-of-middle-two convention; 0.0 for an empty column.
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
