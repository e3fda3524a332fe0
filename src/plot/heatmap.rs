//! Cluster heatmap of normalized gradient profiles

use super::Figure;
use crate::cluster::{grouped_sample_order, ClusterAnalysis};
use crate::error::{ProfilerError, Result};
use ndarray::ArrayView2;
use plotters::prelude::*;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 900;

/// Samples × features heatmap with rows grouped by cluster assignment.
/// Features whose raw values associate significantly with the assignment
/// are starred in their column label.
pub fn heatmap(
    gradients: ArrayView2<'_, f64>,
    labels: &[String],
    analysis: &ClusterAnalysis,
) -> Result<Figure> {
    let mut svg = String::new();
    draw(&mut svg, gradients, labels, analysis)
        .map_err(|e| ProfilerError::RenderError(e.to_string()))?;
    Ok(Figure::new("Heatmap", WIDTH, HEIGHT, svg))
}

fn draw(
    svg: &mut String,
    gradients: ArrayView2<'_, f64>,
    labels: &[String],
    analysis: &ClusterAnalysis,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (n_samples, n_features) = gradients.dim();
    let root = SVGBackend::with_string(svg, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    if n_samples == 0 || n_features == 0 {
        root.present()?;
        return Ok(());
    }

    let order = grouped_sample_order(&analysis.assignments);
    let max_abs = gradients
        .iter()
        .fold(0.0f64, |acc, &v| acc.max(v.abs()))
        .max(1e-12);

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(80)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..n_features as f64, 0.0f64..n_samples as f64)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Model Features")
        .y_desc("Samples (grouped by cluster)")
        .x_labels(n_features)
        .x_label_formatter(&|x| {
            let idx = x.floor() as usize;
            if idx < n_features && (x - idx as f64 - 0.5).abs() < 0.5 {
                let starred = analysis
                    .associations
                    .get(idx)
                    .map(|a| a.significant)
                    .unwrap_or(false);
                let name = labels[idx].replace('\n', " ");
                if starred {
                    format!("{} *", name)
                } else {
                    name
                }
            } else {
                String::new()
            }
        })
        .y_labels(0)
        .draw()?;

    for (row, &sample) in order.iter().enumerate() {
        for col in 0..n_features {
            let value = gradients[[sample, col]];
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (col as f64, row as f64),
                    (col as f64 + 1.0, row as f64 + 1.0),
                ],
                diverging_color(value, max_abs).filled(),
            )))?;
        }
    }

    // Separator between cluster blocks
    for row in 1..order.len() {
        if analysis.assignments[order[row]] != analysis.assignments[order[row - 1]] {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(0.0, row as f64), (n_features as f64, row as f64)],
                BLACK.stroke_width(2),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Diverging blue-white-red scale centered at zero
fn diverging_color(value: f64, max_abs: f64) -> RGBColor {
    let t = (value / max_abs).clamp(-1.0, 1.0);
    if t < 0.0 {
        let s = -t;
        RGBColor(lerp(255, 33, s), lerp(255, 102, s), lerp(255, 172, s))
    } else {
        RGBColor(lerp(255, 178, t), lerp(255, 24, t), lerp(255, 43, t))
    }
}

fn lerp(from: u8, to: u8, t: f64) -> u8 {
    (from as f64 + (to as f64 - from as f64) * t).round() as u8
}
