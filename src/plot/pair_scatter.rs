//! Paired scatter plots for the top ranked features

use super::{type_color, Figure};
use crate::error::{ProfilerError, Result};
use ndarray::ArrayView2;
use plotters::prelude::*;

const SIZE: u32 = 1000;

/// Lower-triangle grid of pairwise scatter panels. The diagonal carries the
/// feature labels; panel (i, j) plots column j against column i.
pub fn pair_scatter(
    data: ArrayView2<'_, f64>,
    labels: &[String],
    types: &[String],
    title: &str,
) -> Result<Figure> {
    let mut svg = String::new();
    draw(&mut svg, data, labels, types)
        .map_err(|e| ProfilerError::RenderError(e.to_string()))?;
    Ok(Figure::new(title, SIZE, SIZE, svg))
}

fn draw(
    svg: &mut String,
    data: ArrayView2<'_, f64>,
    labels: &[String],
    types: &[String],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let n = data.ncols();
    let root = SVGBackend::with_string(svg, (SIZE, SIZE)).into_drawing_area();
    root.fill(&WHITE)?;

    if n == 0 {
        root.present()?;
        return Ok(());
    }

    let panels = root.split_evenly((n, n));
    for i in 0..n {
        for j in 0..n {
            let panel = &panels[i * n + j];
            if i == j {
                panel.draw(&Text::new(
                    labels[i].replace('\n', " "),
                    (10, 20),
                    ("sans-serif", 14).into_font(),
                ))?;
                continue;
            }
            if j > i {
                continue;
            }

            let (x_range, y_range) = (padded_range(data, j), padded_range(data, i));
            let mut chart = ChartBuilder::on(panel)
                .margin(4)
                .x_label_area_size(14)
                .y_label_area_size(18)
                .build_cartesian_2d(x_range, y_range)?;
            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(2)
                .y_labels(2)
                .label_style(("sans-serif", 8))
                .draw()?;

            let color = type_color(types, i);
            chart.draw_series(
                data.rows()
                    .into_iter()
                    .map(|row| Circle::new((row[j], row[i]), 2, color.filled())),
            )?;
        }
    }

    root.present()?;
    Ok(())
}

fn padded_range(data: ArrayView2<'_, f64>, col: usize) -> std::ops::Range<f64> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for &v in data.column(col).iter() {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-6);
    (lo - pad)..(hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pair_scatter_produces_svg() {
        let data = array![[0.1, 1.0, -0.5], [0.2, 0.8, -0.1], [0.3, 0.9, -0.3]];
        let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let types = vec![String::new(), String::new(), String::new()];
        let figure = pair_scatter(data.view(), &labels, &types, "PairedScatter").unwrap();
        assert!(figure.svg().contains("<svg"));
        assert_eq!(figure.width, SIZE);
    }

    #[test]
    fn test_pair_scatter_empty_slice() {
        let data = ndarray::Array2::<f64>::zeros((3, 0));
        let figure = pair_scatter(data.view(), &[], &[], "PairedScatter").unwrap();
        assert!(figure.svg().contains("<svg"));
    }
}
