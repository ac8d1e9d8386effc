use serde::{Deserialize, Serialize};

/// Annotation category of a labeled point.
///
/// The discriminants are the integer codes used in every persisted format
/// (coordinate tables, chunk file names).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Category {
    AdultMale = 0,
    SubadultMale = 1,
    AdultFemale = 2,
    Juvenile = 3,
    Pup = 4,
    /// Negative sample drawn from an unannotated region.
    Background = 5,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category code {0} (expected 0..=5)")]
pub struct InvalidCategory(pub i64);

impl Category {
    /// The five annotated categories, in palette order.
    pub const POSITIVE: [Category; 5] = [
        Category::AdultMale,
        Category::SubadultMale,
        Category::AdultFemale,
        Category::Juvenile,
        Category::Pup,
    ];

    pub const ALL: [Category; 6] = [
        Category::AdultMale,
        Category::SubadultMale,
        Category::AdultFemale,
        Category::Juvenile,
        Category::Pup,
        Category::Background,
    ];

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_background(self) -> bool {
        self == Category::Background
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::AdultMale => "adult_males",
            Category::SubadultMale => "subadult_males",
            Category::AdultFemale => "adult_females",
            Category::Juvenile => "juveniles",
            Category::Pup => "pups",
            Category::Background => "not_a_sea_lion",
        }
    }
}

impl TryFrom<i64> for Category {
    type Error = InvalidCategory;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| i64::from(c.code()) == code)
            .ok_or(InvalidCategory(code))
    }
}

/// One annotated (or background) location in a source image.
///
/// `x` is the pixel column and `y` the pixel row, always expressed in the
/// unbordered image space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub image_id: u32,
    pub category: Category,
    pub x: i32,
    pub y: i32,
}

impl LabeledPoint {
    pub fn new(image_id: u32, category: Category, x: i32, y: i32) -> Self {
        Self {
            image_id,
            category,
            x,
            y,
        }
    }

    /// Independent-axis proximity: both `|dx|` and `|dy|` are below `radius`.
    #[inline]
    pub fn within_box(&self, x: i32, y: i32, radius: i32) -> bool {
        (self.x - x).abs() < radius && (self.y - y).abs() < radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_codes_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::try_from(i64::from(c.code())), Ok(c));
        }
        assert_eq!(Category::try_from(6), Err(InvalidCategory(6)));
        assert_eq!(Category::try_from(-1), Err(InvalidCategory(-1)));
    }

    #[test]
    fn only_background_is_background() {
        assert!(Category::Background.is_background());
        assert!(Category::POSITIVE.iter().all(|c| !c.is_background()));
    }

    #[test]
    fn box_test_is_strict_on_both_axes() {
        let p = LabeledPoint::new(1, Category::Pup, 200, 200);
        assert!(p.within_box(81, 319, 120));
        assert!(!p.within_box(80, 200, 120));
        assert!(!p.within_box(200, 320, 120));
        // far on one axis only: still outside
        assert!(!p.within_box(205, 500, 120));
    }

    #[test]
    fn serializes_category_as_snake_case() {
        let json = serde_json::to_string(&Category::SubadultMale).unwrap();
        assert_eq!(json, "\"subadult_male\"");
    }
}
