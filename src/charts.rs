//! SVG charts for a report's visualization summary.

use std::f64::consts::PI;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;

use crate::report::VisualizationSummary;

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const CRIMSON: RGBColor = RGBColor(220, 20, 60);
const FOREST_GREEN: RGBColor = RGBColor(34, 139, 34);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("chart drawing failed: {0}")]
    Draw(String),
}

fn draw_error<E: std::error::Error>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    BarChart,
    OrganChart,
    PieChart,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::BarChart, ChartKind::OrganChart, ChartKind::PieChart];

    /// Suffix appended to the upload id when the chart is stored.
    pub fn file_suffix(self) -> &'static str {
        match self {
            ChartKind::BarChart => "bar",
            ChartKind::OrganChart => "organ",
            ChartKind::PieChart => "pie",
        }
    }
}

/// Rendered documents, one per chart kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charts {
    pub bar_chart: Vec<u8>,
    pub organ_chart: Vec<u8>,
    pub pie_chart: Vec<u8>,
}

impl Charts {
    pub fn get(&self, kind: ChartKind) -> &[u8] {
        match kind {
            ChartKind::BarChart => &self.bar_chart,
            ChartKind::OrganChart => &self.organ_chart,
            ChartKind::PieChart => &self.pie_chart,
        }
    }
}

/// Stored chart names are `<id>_<suffix>.<extension>`, so a renderer that
/// reports `png` yields `<id>_bar.png` and so on.
pub trait ChartRenderer: Send + Sync {
    /// File extension of the produced documents, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, summary: &VisualizationSummary) -> Result<Charts, RenderError>;
}

/// Writes SVG rather than PNG, so charts are stored as `<id>_bar.svg`,
/// `<id>_organ.svg` and `<id>_pie.svg`. Text is left to the viewer's fonts.
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    pub bar_size: (u32, u32),
    pub organ_size: (u32, u32),
    pub pie_size: (u32, u32),
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self {
            bar_size: (1000, 600),
            organ_size: (1200, 800),
            pie_size: (800, 800),
        }
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn render(&self, summary: &VisualizationSummary) -> Result<Charts, RenderError> {
        let ranked: Vec<Bar> = summary
            .top_ranked
            .iter()
            .map(|entry| Bar {
                name: entry.label.readable_name().to_string(),
                value: entry.confidence as f64,
                color: SKY_BLUE,
            })
            .collect();

        let organs: Vec<Bar> = summary
            .organ_max
            .iter()
            .map(|entry| Bar {
                name: entry.organ.to_string(),
                value: entry.confidence as f64,
                color: if entry.is_malignant {
                    CRIMSON
                } else {
                    FOREST_GREEN
                },
            })
            .collect();

        Ok(Charts {
            bar_chart: horizontal_bars("Top 5 Predictions", "Confidence", &ranked, self.bar_size)?,
            organ_chart: horizontal_bars(
                "Organ-wise Highest Confidence",
                "Max Confidence",
                &organs,
                self.organ_size,
            )?,
            pie_chart: malignancy_pie(
                summary.malignancy.benign as f64,
                summary.malignancy.malignant as f64,
                self.pie_size,
            )?,
        })
    }
}

struct Bar {
    name: String,
    value: f64,
    color: RGBColor,
}

/// Axis range that always contains zero and every finite value.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo < f64::EPSILON {
        (lo, lo + 1.0)
    } else {
        (lo, hi + (hi - lo) * 0.05)
    }
}

fn horizontal_bars(
    caption: &str,
    x_desc: &str,
    bars: &[Bar],
    size: (u32, u32),
) -> Result<Vec<u8>, RenderError> {
    let rows = bars.len().max(1);
    let (lo, hi) = value_range(bars.iter().map(|bar| bar.value));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 24).into_font())
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(260)
            .build_cartesian_2d(lo..hi, (0usize..rows - 1).into_segmented())
            .map_err(draw_error)?;

        let row_name = |row: &SegmentValue<usize>| match row {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
                bars.get(*i).map(|bar| bar.name.clone()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        };

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(rows)
            .y_label_formatter(&row_name)
            .x_desc(x_desc)
            .draw()
            .map_err(draw_error)?;

        chart
            .draw_series(bars.iter().enumerate().map(|(i, bar)| {
                let top = if i + 1 == rows {
                    SegmentValue::Last
                } else {
                    SegmentValue::Exact(i + 1)
                };
                let value = if bar.value.is_finite() { bar.value } else { 0.0 };
                Rectangle::new(
                    [(0.0, SegmentValue::Exact(i)), (value, top)],
                    bar.color.filled(),
                )
            }))
            .map_err(draw_error)?;

        root.present().map_err(draw_error)?;
    }

    Ok(svg.into_bytes())
}

fn malignancy_pie(benign: f64, malignant: f64, size: (u32, u32)) -> Result<Vec<u8>, RenderError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;
        let area = root
            .titled("Benign vs Malignant Assessment", ("sans-serif", 26).into_font())
            .map_err(draw_error)?;

        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = width.min(height) as f64 * 0.35;
        let centered = ("sans-serif", 20)
            .into_font()
            .into_text_style(&area)
            .pos(Pos::new(HPos::Center, VPos::Center));

        let total = benign + malignant;
        if total <= 0.0 || !total.is_finite() {
            area.draw(&Text::new(
                "No confidence mass to compare".to_string(),
                center,
                centered,
            ))
            .map_err(draw_error)?;
        } else {
            // counter-clockwise from twelve o'clock
            let mut start = PI / 2.0;
            for (name, share, color) in [
                ("Benign", benign / total, FOREST_GREEN),
                ("Malignant/Abnormal", malignant / total, CRIMSON),
            ] {
                let sweep = share * 2.0 * PI;
                if sweep > 0.0 {
                    area.draw(&Polygon::new(
                        wedge(center, radius, start, sweep),
                        color.filled(),
                    ))
                    .map_err(draw_error)?;

                    let mid = start + sweep / 2.0;
                    let anchor = polar(center, radius * 1.2, mid);
                    area.draw(&Text::new(
                        format!("{} {:.1}%", name, share * 100.0),
                        anchor,
                        centered.clone(),
                    ))
                    .map_err(draw_error)?;
                }
                start += sweep;
            }
        }

        root.present().map_err(draw_error)?;
    }

    Ok(svg.into_bytes())
}

fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 - (radius * angle.sin()).round() as i32,
    )
}

fn wedge(center: (i32, i32), radius: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep / 0.05).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for step in 0..=steps {
        let angle = start + sweep * step as f64 / steps as f64;
        points.push(polar(center, radius, angle));
    }
    points
}
