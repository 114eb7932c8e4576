use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::labels::Label;

pub const UNAVAILABLE_DESCRIPTION: &str = "Information not available for this classification.";

/// Patient-facing text attached to a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalInfo {
    pub description: String,
    pub details: String,
    pub patient_implications: String,
    pub common_treatments: String,
}

impl ClinicalInfo {
    /// Substituted when a store has nothing for the predicted label.
    pub fn unavailable() -> Self {
        Self {
            description: UNAVAILABLE_DESCRIPTION.to_string(),
            details: "Please consult with a healthcare professional for more information."
                .to_string(),
            patient_implications: "A medical professional should interpret these results."
                .to_string(),
            common_treatments:
                "Treatment options should be discussed with your healthcare provider.".to_string(),
        }
    }
}

pub trait ClinicalInfoStore: Send + Sync {
    fn lookup(&self, label: Label) -> Option<&ClinicalInfo>;
}

impl ClinicalInfoStore for HashMap<Label, ClinicalInfo> {
    fn lookup(&self, label: Label) -> Option<&ClinicalInfo> {
        self.get(&label)
    }
}

/// The reference texts shipped with the service, one per label.
#[derive(Debug, Clone)]
pub struct BuiltinClinicalInfo {
    entries: HashMap<Label, ClinicalInfo>,
}

impl BuiltinClinicalInfo {
    pub fn new() -> Self {
        let entries = ENTRIES
            .iter()
            .map(|&(label, description, details, implications, treatments)| {
                (
                    label,
                    ClinicalInfo {
                        description: description.to_string(),
                        details: details.to_string(),
                        patient_implications: implications.to_string(),
                        common_treatments: treatments.to_string(),
                    },
                )
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BuiltinClinicalInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicalInfoStore for BuiltinClinicalInfo {
    fn lookup(&self, label: Label) -> Option<&ClinicalInfo> {
        self.entries.get(&label)
    }
}

// (label, description, details, patient implications, common treatments)
const ENTRIES: &[(Label, &str, &str, &str, &str)] = &[
    (
        Label::AllBenign,
        "Benign tissues show normal cellular patterns with no signs of malignancy.",
        "Benign tissues typically maintain normal cell structure, controlled growth patterns, clear boundaries, and no invasion into surrounding tissues.",
        "Generally, benign findings suggest no cancer is present, though regular monitoring may be advised.",
        "Usually no treatment is necessary, but regular follow-up may be recommended.",
    ),
    (
        Label::AllEarly,
        "Early stage cancer showing initial malignant transformation.",
        "Early-stage cancers typically exhibit some abnormal cell growth but remain localized, with limited spread beyond the original site.",
        "Early detection significantly improves treatment outcomes and survival rates.",
        "Surgery, targeted radiation therapy, and sometimes mild chemotherapy or immunotherapy regimens.",
    ),
    (
        Label::AllPre,
        "Pre-cancerous tissue showing cellular changes that may develop into cancer if untreated.",
        "Pre-cancerous tissues show abnormal cellular growth that hasn't yet become malignant but carries risk of future malignancy.",
        "Intervention at this stage often prevents cancer development.",
        "Removal of abnormal tissue, lifestyle modifications, and close monitoring.",
    ),
    (
        Label::AllPro,
        "Progressive cancer with significant malignant development.",
        "Progressive cancers show signs of advancement with increased cellular abnormality, potential metastasis, and invasion of surrounding tissues.",
        "Requires prompt intervention and comprehensive treatment strategy.",
        "May include surgery, systemic chemotherapy, radiation therapy, and targeted biological therapies.",
    ),
    (
        Label::BrainGlioma,
        "A tumor that originates in the brain's glial cells, which support and protect neurons.",
        "Gliomas account for about 30% of all brain tumors and 80% of malignant brain tumors. They form in the glial cells that surround nerve cells and help them function.",
        "Symptoms may include headaches, seizures, personality changes, and neurological deficits depending on tumor location.",
        "Surgery (when possible), radiation therapy, chemotherapy, and newer targeted therapies based on molecular profiling.",
    ),
    (
        Label::BrainMenin,
        "A typically slow-growing tumor that forms in the meninges, the layers of tissue covering the brain and spinal cord.",
        "Meningiomas make up about 30% of all brain tumors. Most are benign (90-95%), though some can be aggressive.",
        "May cause headaches, vision problems, or seizures depending on location. Small, asymptomatic meningiomas often require only monitoring.",
        "Observation for small, asymptomatic tumors; surgery for symptomatic or growing tumors; radiation for tumors that can't be completely removed.",
    ),
    (
        Label::BrainNotumor,
        "Normal brain tissue with no detectable neoplastic (tumor) presence.",
        "Normal brain tissue shows regular cellular architecture with appropriate neural and glial components.",
        "No evidence of brain tumor pathology in analyzed tissue.",
        "No tumor-directed treatments needed; follow-up may be recommended depending on clinical symptoms.",
    ),
    (
        Label::BrainTumor,
        "An abnormal growth of cells in brain tissue, either malignant or benign.",
        "Brain tumors can arise from brain tissue itself (primary) or spread from cancers elsewhere in the body (secondary/metastatic).",
        "Symptoms vary by tumor location and size, potentially including headaches, seizures, cognitive changes, or focal neurological deficits.",
        "Depends on type, location, and grade; may include surgery, radiation therapy, chemotherapy, or targeted therapies.",
    ),
    (
        Label::BreastBenign,
        "Non-cancerous breast tissue or benign breast conditions.",
        "Includes conditions like fibrocystic changes, fibroadenomas, intraductal papillomas, and adenosis. These are common and not life-threatening.",
        "Benign conditions may cause discomfort or concern but don't increase cancer risk significantly.",
        "Often no treatment needed beyond monitoring; sometimes surgical removal for symptoms or diagnostic certainty.",
    ),
    (
        Label::BreastMalignant,
        "Cancerous growth in breast tissue that can invade surrounding tissues and spread to other parts of the body.",
        "Most commonly originates in the milk ducts (ductal carcinoma) or milk-producing glands (lobular carcinoma). Can be classified by molecular subtypes (hormone receptor status, HER2 status).",
        "Treatment success rates are highest with early detection. Regular screening is important.",
        "Surgery (lumpectomy or mastectomy), radiation therapy, chemotherapy, hormone therapy, targeted therapy, or immunotherapy depending on cancer type and stage.",
    ),
    (
        Label::CervixDyk,
        "Cervical dyskeratosis showing abnormal keratinization of epithelial cells.",
        "Dyskeratosis indicates premature or abnormal keratinization of cells and can be associated with HPV infection or other inflammatory conditions.",
        "May indicate increased risk for cervical intraepithelial neoplasia or cervical cancer.",
        "Monitoring, colposcopy, and possibly biopsy or removal of affected tissue depending on severity.",
    ),
    (
        Label::CervixKoc,
        "Cervical koilocytosis showing HPV-related cellular changes.",
        "Koilocytes are squamous epithelial cells with perinuclear halos and nuclear abnormalities, typically caused by human papillomavirus (HPV) infection.",
        "Indicates active HPV infection, which can lead to cervical dysplasia or cancer if persistent.",
        "Close monitoring with regular Pap tests, colposcopy, and possible removal of affected tissue.",
    ),
    (
        Label::CervixMep,
        "Cervical metaplasia where one cell type is replaced by another.",
        "Typically involves replacement of columnar epithelium with squamous epithelium at the transformation zone of the cervix.",
        "Usually benign but requires monitoring as it occurs in an area prone to neoplastic changes.",
        "Usually observation only; intervention only if abnormal cells are detected.",
    ),
    (
        Label::CervixPab,
        "Parabasal cervical cells, typically found in the deeper layers of cervical epithelium.",
        "Presence of numerous parabasal cells may indicate atrophy, inflammation, or cellular response to hormonal changes.",
        "Often normal finding but may warrant further evaluation in certain contexts.",
        "Treatment directed at underlying cause if symptomatic; often no specific treatment needed.",
    ),
    (
        Label::CervixSfi,
        "Cervical superficial cells, normally found on the surface layer of the cervical epithelium.",
        "Presence of mature squamous epithelial cells is normal in cervical cytology samples.",
        "Typically indicates normal cervical cellular maturation pattern.",
        "No treatment needed for normal findings; routine screening as recommended.",
    ),
    (
        Label::ColonAca,
        "Colorectal adenocarcinoma, a cancer that begins in the cells of the glands lining the colon or rectum.",
        "Most colorectal cancers begin as polyps, which are abnormal growths inside the colon or rectum that may become cancerous over time.",
        "Prognosis depends on stage at diagnosis; early detection through screening significantly improves outcomes.",
        "Surgery, chemotherapy, radiation therapy, targeted therapy, or immunotherapy depending on stage and location.",
    ),
    (
        Label::ColonBnt,
        "Benign colon tissue without evidence of cancer.",
        "May include normal tissue or benign conditions like hyperplastic polyps or inflammatory conditions.",
        "Regular screening is still important as some benign polyps can become cancerous over time.",
        "Often no treatment needed; removal of polyps if present; management of underlying conditions if diagnosed.",
    ),
    (
        Label::KidneyNormal,
        "Normal kidney tissue showing typical renal architecture.",
        "Healthy kidney tissue with normal glomeruli, tubules, and supporting structures.",
        "No evidence of kidney disease or cancer.",
        "No kidney-specific treatment needed; general health maintenance recommended.",
    ),
    (
        Label::KidneyTumor,
        "Abnormal growth in kidney tissue that may be benign or malignant.",
        "The most common type of kidney cancer is renal cell carcinoma (RCC). Other types include transitional cell carcinoma and rare forms such as Wilms tumor.",
        "Many kidney tumors are found incidentally during imaging for other conditions. Early-stage tumors have better prognosis.",
        "Surgery (partial or complete nephrectomy), ablation therapies, targeted therapy, immunotherapy, or active surveillance for small tumors.",
    ),
    (
        Label::LungAca,
        "Lung adenocarcinoma, a type of non-small cell lung cancer that begins in the cells that line the alveoli.",
        "Most common type of lung cancer, often developing in the outer regions of the lungs. Can occur in non-smokers more commonly than other types of lung cancer.",
        "May be detected earlier than other lung cancers due to peripheral location. Genetic testing may identify targetable mutations.",
        "Surgery, radiation therapy, chemotherapy, targeted therapy (for specific mutations), immunotherapy, or combinations based on stage and molecular profile.",
    ),
    (
        Label::LungBnt,
        "Benign lung tissue without evidence of malignancy.",
        "May include normal lung tissue or benign conditions like hamartoma, inflammatory pseudotumor, or granuloma.",
        "Generally good prognosis; follow-up may be recommended to ensure stability.",
        "Often observation only; sometimes surgical removal for diagnosis or if causing symptoms.",
    ),
    (
        Label::LungScc,
        "Lung squamous cell carcinoma, a type of non-small cell lung cancer that develops in the flat cells lining the airways.",
        "Strongly associated with smoking history. Typically develops in the central part of the lungs, near the major bronchi.",
        "May cause symptoms earlier than adenocarcinoma due to central location. Tends to grow and spread more slowly than small cell lung cancer.",
        "Surgery (if resectable), radiation therapy, chemotherapy, immunotherapy, or combinations depending on stage.",
    ),
    (
        Label::LymphCll,
        "Chronic lymphocytic leukemia/small lymphocytic lymphoma (CLL/SLL), a type of cancer affecting white blood cells.",
        "Slow-growing cancer of B lymphocytes found in the blood, bone marrow, and lymph nodes. CLL and SLL are essentially the same disease, differing only in where the cancer cells collect.",
        "Often asymptomatic and discovered during routine blood tests. Many patients don't require immediate treatment (\"watch and wait\" approach).",
        "Observation for asymptomatic patients; chemotherapy, targeted therapy, immunotherapy, or stem cell transplant for progressive disease.",
    ),
    (
        Label::LymphFl,
        "Follicular lymphoma, a type of non-Hodgkin lymphoma that begins in the lymphatic system.",
        "Slow-growing cancer of B lymphocytes arranged in a circular (follicular) pattern. Second most common type of non-Hodgkin lymphoma.",
        "Often responds well to treatment but typically not curable; can transform to more aggressive lymphoma over time.",
        "Observation for asymptomatic patients; rituximab-based therapy, radiation, chemotherapy, or stem cell transplant for symptomatic or progressive disease.",
    ),
    (
        Label::LymphMcl,
        "Mantle cell lymphoma, an uncommon type of non-Hodgkin lymphoma.",
        "Develops from B lymphocytes in the \"mantle zone\" of lymph nodes. Associated with cyclin D1 protein overexpression due to t(11;14) translocation.",
        "Typically diagnosed at advanced stage and can be aggressive, though some cases may progress slowly.",
        "Chemotherapy with rituximab, targeted therapies (BTK inhibitors, BCL-2 inhibitors), stem cell transplant for eligible patients.",
    ),
    (
        Label::OralNormal,
        "Normal oral tissue showing typical structure without pathological changes.",
        "Healthy oral mucosa with stratified squamous epithelium and typical underlying supportive tissues.",
        "No evidence of oral disease or cancer.",
        "No specific treatment needed; routine oral hygiene and dental care recommended.",
    ),
    (
        Label::OralScc,
        "Oral squamous cell carcinoma, a type of cancer that begins in the flat cells lining the oral cavity.",
        "Most common type of oral cancer. Risk factors include tobacco use, alcohol consumption, and HPV infection.",
        "Early detection improves prognosis significantly. Regular oral examinations are important, especially for those with risk factors.",
        "Surgery, radiation therapy, chemotherapy, targeted therapy, or combinations depending on stage and location.",
    ),
];
