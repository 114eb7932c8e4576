//! Turns a raw model output vector into the structured report returned to
//! clients.
//!
//! The builder is pure: the same inputs always produce the same report, and
//! nothing here touches shared state or does I/O. Values are taken as the
//! engine produced them. Already-softmaxed probabilities and raw logits are
//! both accepted without validation; NaN entries rank below every number.

use std::cmp::Ordering;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::clinical::{ClinicalInfo, ClinicalInfoStore, UNAVAILABLE_DESCRIPTION};
use crate::labels::{Label, LabelTable, Organ, OrganGroups};

pub const ALTERNATIVE_COUNT: usize = 3;
pub const TOP_RANKED_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("probability vector has {actual} values but the label table has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("label table is empty")]
    EmptyTable,
}

/// Label/confidence pairs in label table order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceMap(Vec<(Label, f32)>);

impl ConfidenceMap {
    pub fn get(&self, label: Label) -> Option<f32> {
        self.0
            .iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, f32)> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ConfidenceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label.id(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(rename = "class")]
    pub label: Label,
    pub confidence: f32,
    pub readable_name: &'static str,
    pub organ: Organ,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    #[serde(rename = "class")]
    pub label: Label,
    pub confidence: f32,
    pub readable_name: &'static str,
    pub organ: Organ,
    pub brief_info: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedConfidence {
    #[serde(rename = "class")]
    pub label: Label,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrganMax {
    pub organ: Organ,
    #[serde(rename = "class")]
    pub label: Label,
    pub confidence: f32,
    pub is_malignant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MalignancyShare {
    pub benign: f32,
    pub malignant: f32,
}

/// Chart-ready aggregates. Nothing here is rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationSummary {
    /// Highest five, ascending so bar charts read bottom to top.
    pub top_ranked: Vec<RankedConfidence>,
    /// One entry per non-empty organ bucket, ordered by the bucket's first
    /// label in the table (`General` leads the standard table).
    pub organ_max: Vec<OrganMax>,
    pub malignancy: MalignancyShare,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub prediction: Prediction,
    pub is_malignant: bool,
    pub clinical_info: ClinicalInfo,
    pub confidences: ConfidenceMap,
    pub alternatives: Vec<Alternative>,
    pub summary: VisualizationSummary,
}

pub fn build_report<S>(
    probabilities: &[f32],
    label_table: &LabelTable,
    organ_groups: &OrganGroups,
    info_db: &S,
) -> Result<PredictionReport, ReportError>
where
    S: ClinicalInfoStore + ?Sized,
{
    if probabilities.len() != label_table.len() {
        return Err(ReportError::ShapeMismatch {
            expected: label_table.len(),
            actual: probabilities.len(),
        });
    }
    if label_table.is_empty() {
        return Err(ReportError::EmptyTable);
    }

    let confidences = ConfidenceMap(label_table.iter().zip(probabilities.iter().copied()).collect());
    let ranking = rank_indices(probabilities);

    let top_index = ranking[0];
    let top_label = label_table.labels()[top_index];
    let top_organ = organ_groups.organ_of(top_label);

    let prediction = Prediction {
        label: top_label,
        confidence: probabilities[top_index],
        readable_name: top_label.readable_name(),
        organ: top_organ,
    };

    let clinical_info = info_db
        .lookup(top_label)
        .cloned()
        .unwrap_or_else(ClinicalInfo::unavailable);

    let alternatives = ranking
        .iter()
        .skip(1)
        .take(ALTERNATIVE_COUNT)
        .map(|&index| {
            let label = label_table.labels()[index];
            Alternative {
                label,
                confidence: probabilities[index],
                readable_name: label.readable_name(),
                organ: organ_groups.organ_of(label),
                brief_info: info_db
                    .lookup(label)
                    .map(|info| info.description.clone())
                    .unwrap_or_else(|| UNAVAILABLE_DESCRIPTION.to_string()),
            }
        })
        .collect();

    let mut top_ranked: Vec<RankedConfidence> = ranking
        .iter()
        .take(TOP_RANKED_COUNT)
        .map(|&index| RankedConfidence {
            label: label_table.labels()[index],
            confidence: probabilities[index],
        })
        .collect();
    top_ranked.reverse();

    let summary = VisualizationSummary {
        top_ranked,
        organ_max: organ_maxima(&confidences, label_table, organ_groups),
        malignancy: malignancy_share(&confidences, label_table),
    };

    Ok(PredictionReport {
        prediction,
        is_malignant: !label_table.is_benign(top_label),
        clinical_info,
        confidences,
        alternatives,
        summary,
    })
}

/// Descending by value; equal values keep index order. NaN sorts last.
fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn rank_indices(values: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    // stable sort, so ties stay in index order
    indices.sort_by(|&a, &b| descending(values[a], values[b]));
    indices
}

/// Entries appear in the order each organ first shows up in the label table.
/// Labels outside every bucket are left out.
fn organ_maxima(
    confidences: &ConfidenceMap,
    label_table: &LabelTable,
    organ_groups: &OrganGroups,
) -> Vec<OrganMax> {
    let mut maxima: Vec<OrganMax> = Vec::new();
    for (label, value) in confidences.iter() {
        let organ = organ_groups.organ_of(label);
        if organ == Organ::Other {
            continue;
        }
        let candidate = OrganMax {
            organ,
            label,
            confidence: value,
            is_malignant: !label_table.is_benign(label),
        };
        match maxima.iter().position(|entry| entry.organ == organ) {
            Some(i) if descending(value, maxima[i].confidence) == Ordering::Less => {
                maxima[i] = candidate
            }
            Some(_) => {}
            None => maxima.push(candidate),
        }
    }
    maxima
}

fn malignancy_share(confidences: &ConfidenceMap, label_table: &LabelTable) -> MalignancyShare {
    let (benign, malignant) =
        confidences
            .iter()
            .fold((0.0f64, 0.0f64), |(benign, malignant), (label, value)| {
                if label_table.is_benign(label) {
                    (benign + value as f64, malignant)
                } else {
                    (benign, malignant + value as f64)
                }
            });

    let total = benign + malignant;
    if total > 0.0 && total.is_finite() {
        MalignancyShare {
            benign: (benign / total) as f32,
            malignant: (malignant / total) as f32,
        }
    } else {
        MalignancyShare {
            benign: 0.0,
            malignant: 0.0,
        }
    }
}
