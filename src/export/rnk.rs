//! RNK export: ranked feature scores
//!
//! Two-column tab-separated table, one line per feature in ranked order.

use crate::error::Result;
use ndarray::ArrayView1;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render the table to a string
pub fn render_rnk(labels: &[String], scores: ArrayView1<'_, f64>) -> String {
    let mut out = String::new();
    for (label, score) in labels.iter().zip(scores.iter()) {
        out.push_str(label);
        out.push('\t');
        out.push_str(&format!("{:.6}", score));
        out.push('\n');
    }
    out
}

/// Write the table to `path`
pub fn write_rnk(path: &Path, labels: &[String], scores: ArrayView1<'_, f64>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(render_rnk(labels, scores).as_bytes())?;
    writer.flush()?;
    Ok(())
}
