// THEORY:
// Display colors are configuration, not code. The frame processor receives a
// `Palette` at construction and looks up box colors by label and banner colors by
// risk level, falling back to neutral grays for anything the tables do not name.

use std::collections::HashMap;

use crate::core_modules::canvas::Color;
use crate::core_modules::risk_model::RiskLevel;

pub const OBJECT_FALLBACK: Color = Color::rgb(200, 200, 200);
pub const BANNER_FALLBACK: Color = Color::rgb(50, 50, 50);

#[derive(Debug, Clone)]
pub struct Palette {
    object_colors: HashMap<String, Color>,
    banner_colors: HashMap<RiskLevel, Color>,
}

impl Palette {
    pub fn new(object_colors: HashMap<String, Color>, banner_colors: HashMap<RiskLevel, Color>) -> Self {
        Self {
            object_colors,
            banner_colors,
        }
    }

    pub fn object_color(&self, label: &str) -> Color {
        self.object_colors.get(label).copied().unwrap_or(OBJECT_FALLBACK)
    }

    pub fn banner_color(&self, level: RiskLevel) -> Color {
        self.banner_colors.get(&level).copied().unwrap_or(BANNER_FALLBACK)
    }
}

impl Default for Palette {
    fn default() -> Self {
        let object_colors = [
            ("person", Color::rgb(255, 0, 0)),
            ("car", Color::rgb(0, 255, 0)),
            ("truck", Color::rgb(255, 165, 0)),
            ("dog", Color::rgb(0, 0, 255)),
            ("cat", Color::rgb(255, 0, 255)),
            ("bird", Color::rgb(255, 255, 0)),
        ]
        .into_iter()
        .map(|(label, color)| (label.to_string(), color))
        .collect();

        let banner_colors = HashMap::from([
            (RiskLevel::Low, Color::rgb(0, 180, 0)),
            (RiskLevel::Medium, Color::rgb(255, 140, 0)),
            (RiskLevel::High, Color::rgb(200, 0, 0)),
        ]);

        Self::new(object_colors, banner_colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_labels_fall_back_to_gray() {
        let palette = Palette::default();
        assert_eq!(palette.object_color("person"), Color::rgb(255, 0, 0));
        assert_eq!(palette.object_color("umbrella"), OBJECT_FALLBACK);
    }

    #[test]
    fn missing_banner_entry_falls_back_to_gray() {
        let palette = Palette::new(HashMap::new(), HashMap::from([(RiskLevel::High, Color::rgb(1, 2, 3))]));
        assert_eq!(palette.banner_color(RiskLevel::High), Color::rgb(1, 2, 3));
        assert_eq!(palette.banner_color(RiskLevel::Low), BANNER_FALLBACK);
    }
}
