//! Figure rendering
//!
//! Renderers consume truncated ranked slices and produce [`Figure`]
//! objects: standalone SVG documents held in memory until the pipeline
//! decides whether to persist them.

mod heatmap;
mod km;
mod pair_scatter;
mod ranked_box;

pub use heatmap::heatmap;
pub use km::km_plots;
pub use pair_scatter::pair_scatter;
pub use ranked_box::ranked_box;

use crate::error::Result;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A rendered figure: an SVG document with fixed pixel dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub width: u32,
    pub height: u32,
    svg: String,
}

impl Figure {
    pub(crate) fn new(title: &str, width: u32, height: u32, svg: String) -> Self {
        Self {
            title: title.to_string(),
            width,
            height,
            svg,
        }
    }

    /// The rendered SVG document
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Write the document to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.svg.as_bytes())?;
        Ok(())
    }
}

/// Color for the feature at `idx`, keyed by its type tag so features from
/// the same platform share a color across figures
pub(crate) fn type_color(types: &[String], idx: usize) -> RGBAColor {
    let mut distinct: Vec<&String> = Vec::new();
    for tag in types {
        if !distinct.contains(&tag) {
            distinct.push(tag);
        }
    }
    let pos = distinct
        .iter()
        .position(|&tag| tag == &types[idx])
        .unwrap_or(0);
    Palette99::pick(pos).to_rgba()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_figure_save() {
        let dir = tempfile::tempdir().unwrap();
        let figure = Figure::new("Test", 10, 10, "<svg></svg>".to_string());
        let path = dir.path().join("test.svg");
        figure.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg></svg>");
    }

    #[test]
    fn test_same_tag_same_color() {
        let types = vec!["Mut".to_string(), "CNV".to_string(), "Mut".to_string()];
        assert_eq!(type_color(&types, 0), type_color(&types, 2));
        assert_ne!(type_color(&types, 0), type_color(&types, 1));
    }
}
