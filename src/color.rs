use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Bar colours
// ---------------------------------------------------------------------------

/// `n` visually distinct colours on evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Stable colour per category label, so a musical type keeps its colour
/// while filters add and remove bars.
#[derive(Debug, Clone)]
pub struct CategoryColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CategoryColors {
    /// Assign colours to `labels` in sorted order.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sorted: Vec<&str> = labels.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        let mapping = sorted
            .iter()
            .zip(generate_palette(sorted.len()))
            .map(|(label, c)| (label.to_string(), c))
            .collect();
        CategoryColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_distinct() {
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        assert_ne!(p[0], p[1]);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_colors_ignore_input_order() {
        let a = CategoryColors::new(["Fuga", "PEN", "Cadence"]);
        let b = CategoryColors::new(["Cadence", "Fuga", "PEN", "Fuga"]);
        assert_eq!(a.color_for("PEN"), b.color_for("PEN"));
        assert_eq!(a.color_for("Madrigal"), Color32::GRAY);
    }
}
