//! Kaplan-Meier plots for individual features

use super::Figure;
use crate::error::{ProfilerError, Result};
use crate::survival::{kaplan_meier, median_split, KaplanMeierCurve};
use ndarray::{ArrayView1, ArrayView2};
use plotters::prelude::*;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 700;

/// One figure per feature: survival curves for the low/high strata from a
/// median split of the feature's raw values. Figure `i` corresponds to the
/// feature in column `i` of the slice.
pub fn km_plots(
    raw: ArrayView2<'_, f64>,
    labels: &[String],
    survival_times: ArrayView1<'_, f64>,
    censoring: ArrayView1<'_, f64>,
) -> Result<Vec<Figure>> {
    let events: Vec<bool> = censoring.iter().map(|&flag| flag == 0.0).collect();

    let mut figures = Vec::with_capacity(raw.ncols());
    for (col, label) in labels.iter().enumerate().take(raw.ncols()) {
        let split = median_split(raw.column(col));

        let low = stratum_curve(&split.low, survival_times, &events);
        let high = stratum_curve(&split.high, survival_times, &events);

        let mut svg = String::new();
        let title = label.replace('\n', " ");
        draw(&mut svg, &title, &low, &high, survival_times)
            .map_err(|e| ProfilerError::RenderError(e.to_string()))?;
        figures.push(Figure::new(&title, WIDTH, HEIGHT, svg));
    }

    Ok(figures)
}

fn stratum_curve(
    indices: &[usize],
    survival_times: ArrayView1<'_, f64>,
    events: &[bool],
) -> KaplanMeierCurve {
    let times: Vec<f64> = indices.iter().map(|&i| survival_times[i]).collect();
    let stratum_events: Vec<bool> = indices.iter().map(|&i| events[i]).collect();
    kaplan_meier(&times, &stratum_events)
}

fn draw(
    svg: &mut String,
    title: &str,
    low: &KaplanMeierCurve,
    high: &KaplanMeierCurve,
    survival_times: ArrayView1<'_, f64>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let t_max = survival_times
        .iter()
        .fold(0.0f64, |acc, &t| acc.max(t))
        .max(1e-6);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..(t_max * 1.05), 0.0f64..1.05f64)?;

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Survival Probability")
        .draw()?;

    if !low.is_empty() {
        chart
            .draw_series(LineSeries::new(step_points(low), &BLUE))?
            .label("<= median")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    }
    if !high.is_empty() {
        chart
            .draw_series(LineSeries::new(step_points(high), &RED))?
            .label("> median")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Right-continuous step path starting at survival 1.0
fn step_points(curve: &KaplanMeierCurve) -> Vec<(f64, f64)> {
    let mut points = vec![(0.0, 1.0)];
    let mut last = 1.0;
    for (&t, &s) in curve.times.iter().zip(curve.survival.iter()) {
        points.push((t, last));
        points.push((t, s));
        last = s;
    }
    points
}
