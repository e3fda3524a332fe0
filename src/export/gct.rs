//! GCT export: the full gradient matrix
//!
//! GCT 1.2 layout: version line, dimension line, header row, then one row
//! per feature with a `na` description column and one value column per
//! sample. The pipeline's gradient matrix is samples × features, so rows
//! here are the transposed feature columns.

use crate::error::Result;
use ndarray::ArrayView2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render the table to a string
pub fn render_gct(labels: &[String], gradients: ArrayView2<'_, f64>) -> String {
    let (n_samples, n_features) = gradients.dim();

    let mut out = String::new();
    out.push_str("#1.2\n");
    out.push_str(&format!("{}\t{}\n", n_features, n_samples));

    out.push_str("Name\tDescription");
    for sample in 0..n_samples {
        out.push_str(&format!("\tS{}", sample + 1));
    }
    out.push('\n');

    for (feature, label) in labels.iter().enumerate().take(n_features) {
        out.push_str(label);
        out.push_str("\tna");
        for sample in 0..n_samples {
            out.push_str(&format!("\t{:.6}", gradients[[sample, feature]]));
        }
        out.push('\n');
    }

    out
}

/// Write the table to `path`
pub fn write_gct(path: &Path, labels: &[String], gradients: ArrayView2<'_, f64>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(render_gct(labels, gradients).as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_render_gct_layout() {
        let labels = vec!["TP53".to_string(), "EGFR".to_string()];
        let gradients = array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]];
        let table = render_gct(&labels, gradients.view());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "#1.2");
        assert_eq!(lines[1], "2\t3");
        assert_eq!(lines[2], "Name\tDescription\tS1\tS2\tS3");
        assert_eq!(lines[3], "TP53\tna\t0.100000\t0.300000\t0.500000");
        assert_eq!(lines[4], "EGFR\tna\t0.200000\t0.400000\t0.600000");
    }

    #[test]
    fn test_write_gct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Gradients.gct");
        let labels = vec!["a".to_string()];
        let gradients = array![[1.0], [2.0]];
        write_gct(&path, &labels, gradients.view()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#1.2\n1\t2\n"));
    }
}
