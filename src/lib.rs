//! Histopathology image classification service.
//!
//! An uploaded image is decoded, classified by an injected
//! [`InferenceEngine`](model::InferenceEngine), and the raw score vector is
//! turned into a [`PredictionReport`](report::PredictionReport) with clinical
//! text and chart data by [`build_report`](report::build_report).

pub mod charts;
pub mod clinical;
pub mod config;
pub mod labels;
pub mod model;
pub mod preprocess;
pub mod report;
pub mod server;
pub mod utils;

pub use labels::{Label, LabelTable, Organ, OrganGroups};
pub use report::{build_report, PredictionReport, ReportError};
