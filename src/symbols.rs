//! Feature symbol preparation
//!
//! Feature labels arrive as raw strings like `"TP53_Mut"` where a trailing
//! `_Tag` suffix marks the data platform the feature came from. Splitting
//! produces a display name and a type tag; wrapping reflows long display
//! names for plot axes. Original label strings are kept untouched elsewhere
//! in the pipeline for file naming.

/// Default wrap width for plot axis labels
pub const LABEL_WRAP_WIDTH: usize = 20;

/// Split raw labels into (display names, type tags).
///
/// Labels are trimmed of surrounding whitespace. The substring after the
/// last underscore becomes the type tag; labels without an underscore get
/// an empty tag. Output lists keep the input length and order.
pub fn split_symbols(symbols: &[String]) -> (Vec<String>, Vec<String>) {
    let mut display = Vec::with_capacity(symbols.len());
    let mut types = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let trimmed = symbol.trim();
        match trimmed.rsplit_once('_') {
            Some((name, tag)) if !name.is_empty() && !tag.is_empty() => {
                display.push(name.to_string());
                types.push(tag.to_string());
            }
            _ => {
                display.push(trimmed.to_string());
                types.push(String::new());
            }
        }
    }

    (display, types)
}

/// Reflow display labels onto multiple lines at word boundaries.
///
/// Words longer than `width` are hard-split so no line exceeds the width.
pub fn wrap_symbols(labels: &[String], width: usize) -> Vec<String> {
    labels.iter().map(|label| wrap_one(label, width)).collect()
}

fn wrap_one(label: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in label.split_whitespace() {
        for piece in hard_split(word, width) {
            if current.is_empty() {
                current = piece;
            } else if current.len() + 1 + piece.len() <= width {
                current.push(' ');
                current.push_str(&piece);
            } else {
                lines.push(std::mem::take(&mut current));
                current = piece;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}

fn hard_split(word: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
