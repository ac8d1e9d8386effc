use serde::{Deserialize, Serialize};

use crate::Category;

/// Reference color of one dot marker category.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub category: Category,
    pub rgb: [u8; 3],
    /// Pixels closer than this (Euclidean, RGB space) belong to the entry.
    pub max_distance: f32,
}

impl PaletteEntry {
    #[inline]
    pub fn distance(&self, rgb: [u8; 3]) -> f32 {
        let mut sq = 0.0f32;
        for c in 0..3 {
            let d = rgb[c] as f32 - self.rgb[c] as f32;
            sq += d * d;
        }
        sq.sqrt()
    }

    #[inline]
    pub fn matches(&self, rgb: [u8; 3]) -> bool {
        self.distance(rgb) < self.max_distance
    }
}

/// Ordered set of dot marker colors, one per annotated category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub entries: Vec<PaletteEntry>,
}

impl ColorPalette {
    pub const DEFAULT_MAX_DISTANCE: f32 = 32.0;

    /// Average colors of the dot centers used by the annotators.
    pub fn sea_lions() -> Self {
        let colors: [(Category, [u8; 3]); 5] = [
            (Category::AdultMale, [243, 8, 5]),      // red
            (Category::SubadultMale, [244, 8, 242]), // magenta
            (Category::AdultFemale, [87, 46, 10]),   // brown
            (Category::Juvenile, [25, 56, 176]),     // blue
            (Category::Pup, [38, 174, 21]),          // green
        ];
        Self {
            entries: colors
                .into_iter()
                .map(|(category, rgb)| PaletteEntry {
                    category,
                    rgb,
                    max_distance: Self::DEFAULT_MAX_DISTANCE,
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaletteEntry> {
        self.entries.iter()
    }

    pub fn entry(&self, category: Category) -> Option<&PaletteEntry> {
        self.entries.iter().find(|e| e.category == category)
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::sea_lions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_covers_positive_categories_in_order() {
        let palette = ColorPalette::default();
        let cats: Vec<Category> = palette.iter().map(|e| e.category).collect();
        assert_eq!(cats, Category::POSITIVE.to_vec());
        assert!(palette.entry(Category::Background).is_none());
    }

    #[test]
    fn threshold_is_strict() {
        let e = PaletteEntry {
            category: Category::AdultMale,
            rgb: [100, 100, 100],
            max_distance: 32.0,
        };
        assert!(e.matches([131, 100, 100]));
        assert!(!e.matches([132, 100, 100]));
        assert!(e.matches([100, 100, 100]));
    }

    #[test]
    fn reference_colors_are_mutually_exclusive() {
        let palette = ColorPalette::sea_lions();
        for a in palette.iter() {
            for b in palette.iter() {
                if a.category != b.category {
                    assert!(!a.matches(b.rgb), "{:?} vs {:?}", a.category, b.category);
                }
            }
        }
    }
}
