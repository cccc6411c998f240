use std::collections::BTreeMap;

use serde::Serialize;

/// Precision, recall, F1 and support for one class. The `f1-score` field
/// name matches the wire format of the evaluation response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Evaluation output: accuracy rounded to 3 decimal places, per-class
/// metrics at full precision, keyed by class label (`"0"`, `"1"`).
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub classification_report: BTreeMap<String, ClassMetrics>,
}

/// Computes accuracy and per-class precision/recall/F1 for classes {0, 1}.
/// A zero denominator yields 0.0, never a division error.
pub fn classification_report(truth: &[u8], predicted: &[u8]) -> EvaluationReport {
    debug_assert_eq!(truth.len(), predicted.len());
    let total = truth.len();
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    let accuracy = if total == 0 {
        0.0
    } else {
        round3(correct as f64 / total as f64)
    };

    let mut report = BTreeMap::new();
    for class in [0u8, 1u8] {
        report.insert(class.to_string(), class_metrics(truth, predicted, class));
    }
    EvaluationReport {
        accuracy,
        classification_report: report,
    }
}

fn class_metrics(truth: &[u8], predicted: &[u8], class: u8) -> ClassMetrics {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    let mut support = 0usize;
    for (&t, &p) in truth.iter().zip(predicted) {
        if t == class {
            support += 1;
        }
        match (t == class, p == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1_score = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassMetrics {
        precision,
        recall,
        f1_score,
        support,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
