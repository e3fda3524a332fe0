//! Ranked box plot of per-feature gradient distributions

use super::{type_color, Figure};
use crate::error::{ProfilerError, Result};
use ndarray::ArrayView2;
use plotters::prelude::*;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 700;
const BOX_HALF_WIDTH: f64 = 0.3;

/// One box-and-whisker glyph per ranked feature over its gradient column
pub fn ranked_box(
    gradients: ArrayView2<'_, f64>,
    labels: &[String],
    types: &[String],
    x_desc: &str,
    y_desc: &str,
) -> Result<Figure> {
    let mut svg = String::new();
    draw(&mut svg, gradients, labels, types, x_desc, y_desc)
        .map_err(|e| ProfilerError::RenderError(e.to_string()))?;
    Ok(Figure::new("RankedBox", WIDTH, HEIGHT, svg))
}

fn draw(
    svg: &mut String,
    gradients: ArrayView2<'_, f64>,
    labels: &[String],
    types: &[String],
    x_desc: &str,
    y_desc: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let n = gradients.ncols();
    let root = SVGBackend::with_string(svg, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &v in gradients.iter() {
        y_min = y_min.min(v);
        y_max = y_max.max(v);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    }
    let pad = ((y_max - y_min) * 0.05).max(1e-6);
    let x_max = n.max(1) as f64 - 0.5;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..x_max, (y_min - pad)..(y_max + pad))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_labels(n.max(1))
        .x_label_formatter(&|x| {
            let idx = x.round() as usize;
            if (x - idx as f64).abs() < 0.25 && idx < n {
                labels[idx].replace('\n', " ")
            } else {
                String::new()
            }
        })
        .draw()?;

    for j in 0..n {
        let stats = BoxStats::from_column(gradients.column(j).iter().copied());
        let x = j as f64;
        let color = type_color(types, j);

        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, stats.whisker_low), (x, stats.whisker_high)],
            color.stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [
                (x - BOX_HALF_WIDTH, stats.q1),
                (x + BOX_HALF_WIDTH, stats.q3),
            ],
            color.mix(0.4).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [
                (x - BOX_HALF_WIDTH, stats.q1),
                (x + BOX_HALF_WIDTH, stats.q3),
            ],
            color.stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x - BOX_HALF_WIDTH, stats.median), (x + BOX_HALF_WIDTH, stats.median)],
            color.stroke_width(2),
        )))?;
    }

    root.present()?;
    Ok(())
}

struct BoxStats {
    whisker_low: f64,
    q1: f64,
    median: f64,
    q3: f64,
    whisker_high: f64,
}

impl BoxStats {
    fn from_column(values: impl Iterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = values.collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let fence_low = q1 - 1.5 * iqr;
        let fence_high = q3 + 1.5 * iqr;

        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= fence_low)
            .unwrap_or(q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= fence_high)
            .unwrap_or(q3);

        Self {
            whisker_low,
            q1,
            median,
            q3,
            whisker_high,
        }
    }
}

fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
