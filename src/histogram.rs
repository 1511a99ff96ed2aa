use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryTag {
    Binary,
}

/// Payload of the histogram service: HU bins for the volume, or label counts
/// for a mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistogramData {
    Binary {
        mode: BinaryTag,
        counts: Vec<u64>,
        labels: Vec<String>,
    },
    Intensity {
        counts: Vec<u64>,
        bin_edges: Vec<f64>,
    },
}

impl HistogramData {
    pub fn counts(&self) -> &[u64] {
        match self {
            HistogramData::Binary { counts, .. } | HistogramData::Intensity { counts, .. } => {
                counts
            }
        }
    }

    /// HU range covered by the bins; only intensity histograms have one.
    pub fn domain(&self) -> Option<(f64, f64)> {
        match self {
            HistogramData::Intensity { bin_edges, .. } => {
                let (first, last) = (bin_edges.first()?, bin_edges.last()?);
                (first < last).then_some((*first, *last))
            }
            HistogramData::Binary { .. } => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, HistogramData::Binary { .. })
    }

    /// Bar heights in `[0, 1]`. Binary histograms are never log-scaled or cut.
    pub fn bar_heights(&self, cutoff_percent: f64, log_scale: bool) -> Vec<f64> {
        if self.is_binary() {
            bar_heights(self.counts(), 0.0, false)
        } else {
            bar_heights(self.counts(), cutoff_percent, log_scale)
        }
    }
}

/// Count used as 100% bar height. The top `cutoff_percent` of bins is ignored
/// so one dominant bin (air, background) does not flatten the rest.
pub fn normalization_max(counts: &[u64], cutoff_percent: f64) -> u64 {
    if counts.is_empty() {
        return 1;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let keep = 1.0 - cutoff_percent.clamp(0.0, 100.0) / 100.0;
    let index = ((n as f64 * keep).floor() as usize).min(n - 1);
    match sorted[index] {
        0 => sorted[n - 1].max(1),
        value => value,
    }
}

pub fn bar_heights(counts: &[u64], cutoff_percent: f64, log_scale: bool) -> Vec<f64> {
    let max = normalization_max(counts, cutoff_percent) as f64;
    counts
        .iter()
        .map(|&count| {
            let count = count as f64;
            let height = if log_scale {
                count.ln_1p() / max.ln_1p()
            } else {
                count / max
            };
            height.clamp(0.0, 1.0)
        })
        .collect()
}
