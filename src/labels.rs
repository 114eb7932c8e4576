use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One classification category of the network, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    AllBenign,
    AllEarly,
    AllPre,
    AllPro,
    BrainGlioma,
    BrainMenin,
    BrainNotumor,
    BrainTumor,
    BreastBenign,
    BreastMalignant,
    CervixDyk,
    CervixKoc,
    CervixMep,
    CervixPab,
    CervixSfi,
    ColonAca,
    ColonBnt,
    KidneyNormal,
    KidneyTumor,
    LungAca,
    LungBnt,
    LungScc,
    LymphCll,
    LymphFl,
    LymphMcl,
    OralNormal,
    OralScc,
}

impl Label {
    pub const ALL: [Label; 27] = [
        Label::AllBenign,
        Label::AllEarly,
        Label::AllPre,
        Label::AllPro,
        Label::BrainGlioma,
        Label::BrainMenin,
        Label::BrainNotumor,
        Label::BrainTumor,
        Label::BreastBenign,
        Label::BreastMalignant,
        Label::CervixDyk,
        Label::CervixKoc,
        Label::CervixMep,
        Label::CervixPab,
        Label::CervixSfi,
        Label::ColonAca,
        Label::ColonBnt,
        Label::KidneyNormal,
        Label::KidneyTumor,
        Label::LungAca,
        Label::LungBnt,
        Label::LungScc,
        Label::LymphCll,
        Label::LymphFl,
        Label::LymphMcl,
        Label::OralNormal,
        Label::OralScc,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Label::AllBenign => "all_benign",
            Label::AllEarly => "all_early",
            Label::AllPre => "all_pre",
            Label::AllPro => "all_pro",
            Label::BrainGlioma => "brain_glioma",
            Label::BrainMenin => "brain_menin",
            Label::BrainNotumor => "brain_notumor",
            Label::BrainTumor => "brain_tumor",
            Label::BreastBenign => "breast_benign",
            Label::BreastMalignant => "breast_malignant",
            Label::CervixDyk => "cervix_dyk",
            Label::CervixKoc => "cervix_koc",
            Label::CervixMep => "cervix_mep",
            Label::CervixPab => "cervix_pab",
            Label::CervixSfi => "cervix_sfi",
            Label::ColonAca => "colon_aca",
            Label::ColonBnt => "colon_bnt",
            Label::KidneyNormal => "kidney_normal",
            Label::KidneyTumor => "kidney_tumor",
            Label::LungAca => "lung_aca",
            Label::LungBnt => "lung_bnt",
            Label::LungScc => "lung_scc",
            Label::LymphCll => "lymph_cll",
            Label::LymphFl => "lymph_fl",
            Label::LymphMcl => "lymph_mcl",
            Label::OralNormal => "oral_normal",
            Label::OralScc => "oral_scc",
        }
    }

    pub fn readable_name(self) -> &'static str {
        match self {
            Label::AllBenign => "Benign (General)",
            Label::AllEarly => "Early Stage Cancer",
            Label::AllPre => "Pre-cancerous",
            Label::AllPro => "Progressive Cancer",
            Label::BrainGlioma => "Brain Glioma",
            Label::BrainMenin => "Brain Meningioma",
            Label::BrainNotumor => "Brain - No Tumor",
            Label::BrainTumor => "Brain Tumor",
            Label::BreastBenign => "Breast - Benign",
            Label::BreastMalignant => "Breast - Malignant",
            Label::CervixDyk => "Cervix Dyskeratosis",
            Label::CervixKoc => "Cervix Koilocytosis",
            Label::CervixMep => "Cervix Metaplasia",
            Label::CervixPab => "Cervix Parabasal",
            Label::CervixSfi => "Cervix Superficial",
            Label::ColonAca => "Colon Adenocarcinoma",
            Label::ColonBnt => "Colon - Benign",
            Label::KidneyNormal => "Kidney - Normal",
            Label::KidneyTumor => "Kidney Tumor",
            Label::LungAca => "Lung Adenocarcinoma",
            Label::LungBnt => "Lung - Benign",
            Label::LungScc => "Lung Squamous Cell Carcinoma",
            Label::LymphCll => "Lymphoma CLL",
            Label::LymphFl => "Lymphoma Follicular",
            Label::LymphMcl => "Lymphoma Mantle Cell",
            Label::OralNormal => "Oral - Normal",
            Label::OralScc => "Oral Squamous Cell Carcinoma",
        }
    }

    /// Anatomical origin tag. `OrganGroups` is derived from this.
    pub fn organ(self) -> Organ {
        match self {
            Label::AllBenign | Label::AllEarly | Label::AllPre | Label::AllPro => Organ::General,
            Label::BrainGlioma | Label::BrainMenin | Label::BrainNotumor | Label::BrainTumor => {
                Organ::Brain
            }
            Label::BreastBenign | Label::BreastMalignant => Organ::Breast,
            Label::CervixDyk
            | Label::CervixKoc
            | Label::CervixMep
            | Label::CervixPab
            | Label::CervixSfi => Organ::Cervix,
            Label::ColonAca | Label::ColonBnt => Organ::Colon,
            Label::KidneyNormal | Label::KidneyTumor => Organ::Kidney,
            Label::LungAca | Label::LungBnt | Label::LungScc => Organ::Lung,
            Label::LymphCll | Label::LymphFl | Label::LymphMcl => Organ::Lymph,
            Label::OralNormal | Label::OralScc => Organ::Oral,
        }
    }

    pub fn is_benign(self) -> bool {
        matches!(
            self,
            Label::AllBenign
                | Label::BrainNotumor
                | Label::BreastBenign
                | Label::ColonBnt
                | Label::KidneyNormal
                | Label::LungBnt
                | Label::OralNormal
        )
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown label `{0}`")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .iter()
            .copied()
            .find(|label| label.id() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Organ {
    Brain,
    Breast,
    Cervix,
    Colon,
    Kidney,
    Lung,
    Lymph,
    Oral,
    General,
    /// Sentinel for labels outside every organ bucket.
    Other,
}

impl Organ {
    /// Bucket order used when grouping; `Other` is never a bucket.
    pub const BUCKETS: [Organ; 9] = [
        Organ::Brain,
        Organ::Breast,
        Organ::Cervix,
        Organ::Colon,
        Organ::Kidney,
        Organ::Lung,
        Organ::Lymph,
        Organ::Oral,
        Organ::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Organ::Brain => "Brain",
            Organ::Breast => "Breast",
            Organ::Cervix => "Cervix",
            Organ::Colon => "Colon",
            Organ::Kidney => "Kidney",
            Organ::Lung => "Lung",
            Organ::Lymph => "Lymph",
            Organ::Oral => "Oral",
            Organ::General => "General",
            Organ::Other => "Other",
        }
    }
}

impl fmt::Display for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered label set matching the network's output vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<Label>,
}

impl LabelTable {
    pub fn new(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    /// The 27-class table the bundled model was trained on.
    pub fn standard() -> Self {
        Self::new(Label::ALL.to_vec())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Label> {
        self.labels.get(index).copied()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        self.labels.iter().copied()
    }

    pub fn is_benign(&self, label: Label) -> bool {
        label.is_benign()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Partition of a label table into organ buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganGroups {
    groups: Vec<(Organ, Vec<Label>)>,
}

impl OrganGroups {
    pub fn new(groups: Vec<(Organ, Vec<Label>)>) -> Self {
        Self { groups }
    }

    /// Buckets follow `Organ::BUCKETS`; members keep table order and empty
    /// buckets are dropped.
    pub fn from_table(table: &LabelTable) -> Self {
        let groups = Organ::BUCKETS
            .iter()
            .map(|&organ| {
                let members: Vec<Label> = table.iter().filter(|l| l.organ() == organ).collect();
                (organ, members)
            })
            .filter(|(_, members)| !members.is_empty())
            .collect();

        Self { groups }
    }

    pub fn organ_of(&self, label: Label) -> Organ {
        self.groups
            .iter()
            .find(|(_, members)| members.contains(&label))
            .map(|(organ, _)| *organ)
            .unwrap_or(Organ::Other)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Organ, &[Label])> + '_ {
        self.groups
            .iter()
            .map(|(organ, members)| (*organ, members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
