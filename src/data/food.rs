//! Food temperature table.
//!
//! Maps a category, food and doneness level to a target core temperature in
//! Celsius, and each food to a carryover type that scales the dynamic
//! carryover compensation.

use serde::{Deserialize, Serialize};

/// Sentinel used for category, food and doneness in manual mode.
pub const MANUAL: &str = "manual";

/// How much residual heat a food carries after leaving the heat source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarryoverType {
    /// Large beef roasts, retain a lot of heat.
    BeefRoast,
    /// Steaks and thin beef cuts.
    BeefSteak,
    /// Pork roasts.
    PorkRoast,
    /// Other pork cuts.
    PorkOther,
    /// Poultry, lower density.
    Poultry,
    /// Fish and shellfish, low mass.
    Fish,
    /// Lamb roasts.
    LambRoast,
    /// Other lamb cuts.
    LambOther,
    /// Veal.
    Veal,
    /// Everything else.
    #[default]
    Other,
}

impl CarryoverType {
    /// Relative carryover weight. Higher values retain more heat.
    pub fn weight(&self) -> f64 {
        match self {
            Self::BeefRoast => 1.5,
            Self::BeefSteak => 0.8,
            Self::PorkRoast => 1.3,
            Self::PorkOther => 0.9,
            Self::Poultry => 0.7,
            Self::Fish => 0.5,
            Self::LambRoast => 1.4,
            Self::LambOther => 0.8,
            Self::Veal => 1.0,
            Self::Other => 1.0,
        }
    }
}

/// One food of the table with its doneness levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodEntry {
    /// Category identifier.
    pub category: &'static str,
    /// Food identifier.
    pub food: &'static str,
    /// Carryover behaviour.
    pub carryover: CarryoverType,
    /// `(doneness, °C)` pairs, from least to most done.
    pub doneness: &'static [(&'static str, u8)],
}

impl FoodEntry {
    /// Target temperature for a doneness level.
    pub fn temperature(&self, doneness: &str) -> Option<f64> {
        self.doneness
            .iter()
            .find(|(name, _)| *name == doneness)
            .map(|(_, temp)| f64::from(*temp))
    }
}

use CarryoverType::*;

const STEAK_LEVELS: &[(&str, u8)] = &[
    ("rare", 52),
    ("medium_rare", 55),
    ("medium", 57),
    ("medium_well", 63),
    ("well_done", 68),
];

const TENDER_CUT_LEVELS: &[(&str, u8)] = &[
    ("rare", 52),
    ("medium_rare", 55),
    ("medium", 57),
    ("medium_well", 63),
];

const LAMB_PINK_LEVELS: &[(&str, u8)] = &[("rare", 52), ("pink", 57), ("medium", 63)];

const POULTRY_DONE: &[(&str, u8)] = &[("done", 74)];

/// The complete food table.
pub static FOOD_TABLE: &[FoodEntry] = &[
    // beef
    FoodEntry {
        category: "beef",
        food: "steak",
        carryover: BeefSteak,
        doneness: &[
            ("blue", 46),
            ("rare", 52),
            ("medium_rare", 55),
            ("medium", 57),
            ("medium_well", 63),
            ("well_done", 68),
        ],
    },
    FoodEntry { category: "beef", food: "roast", carryover: BeefRoast, doneness: STEAK_LEVELS },
    FoodEntry { category: "beef", food: "prime_rib", carryover: BeefRoast, doneness: STEAK_LEVELS },
    FoodEntry {
        category: "beef",
        food: "filet_mignon",
        carryover: BeefSteak,
        doneness: TENDER_CUT_LEVELS,
    },
    FoodEntry { category: "beef", food: "ribeye", carryover: BeefSteak, doneness: STEAK_LEVELS },
    FoodEntry {
        category: "beef",
        food: "burger",
        carryover: Other,
        doneness: &[("medium", 63), ("well_done", 71), ("safe", 71)],
    },
    FoodEntry {
        category: "beef",
        food: "brisket",
        carryover: BeefRoast,
        doneness: &[("pulled", 93)],
    },
    FoodEntry {
        category: "beef",
        food: "tenderloin",
        carryover: BeefRoast,
        doneness: TENDER_CUT_LEVELS,
    },
    // pork
    FoodEntry {
        category: "pork",
        food: "chop",
        carryover: PorkOther,
        doneness: &[("medium", 63), ("well_done", 71)],
    },
    FoodEntry {
        category: "pork",
        food: "tenderloin",
        carryover: PorkOther,
        doneness: &[("medium", 63), ("well_done", 68)],
    },
    FoodEntry {
        category: "pork",
        food: "roast",
        carryover: PorkRoast,
        doneness: &[("medium", 63), ("well_done", 71)],
    },
    FoodEntry {
        category: "pork",
        food: "ribs",
        carryover: PorkOther,
        doneness: &[("tender", 88), ("fall_off_bone", 93)],
    },
    FoodEntry {
        category: "pork",
        food: "pulled_pork",
        carryover: PorkRoast,
        doneness: &[("pulled", 93)],
    },
    FoodEntry {
        category: "pork",
        food: "ham",
        carryover: PorkRoast,
        doneness: &[("reheated", 60)],
    },
    FoodEntry {
        category: "pork",
        food: "belly",
        carryover: PorkOther,
        doneness: &[("tender", 77), ("very_tender", 85)],
    },
    // poultry
    FoodEntry {
        category: "poultry",
        food: "chicken_whole",
        carryover: Poultry,
        doneness: POULTRY_DONE,
    },
    FoodEntry {
        category: "poultry",
        food: "chicken_breast",
        carryover: Poultry,
        doneness: POULTRY_DONE,
    },
    FoodEntry {
        category: "poultry",
        food: "chicken_thigh",
        carryover: Poultry,
        doneness: &[("done", 74), ("tender", 76)],
    },
    FoodEntry {
        category: "poultry",
        food: "turkey_whole",
        carryover: Poultry,
        doneness: POULTRY_DONE,
    },
    FoodEntry {
        category: "poultry",
        food: "turkey_breast",
        carryover: Poultry,
        doneness: POULTRY_DONE,
    },
    FoodEntry {
        category: "poultry",
        food: "duck_breast",
        carryover: Poultry,
        doneness: &[("pink", 57), ("medium", 63)],
    },
    FoodEntry {
        category: "poultry",
        food: "duck_leg_confit",
        carryover: Poultry,
        doneness: &[("confit", 82)],
    },
    // lamb
    FoodEntry {
        category: "lamb",
        food: "leg",
        carryover: LambRoast,
        doneness: &[("rare", 52), ("pink", 57), ("medium", 63), ("well_done", 68)],
    },
    FoodEntry { category: "lamb", food: "chops", carryover: LambOther, doneness: LAMB_PINK_LEVELS },
    FoodEntry { category: "lamb", food: "rack", carryover: LambOther, doneness: LAMB_PINK_LEVELS },
    FoodEntry {
        category: "lamb",
        food: "shank",
        carryover: LambOther,
        doneness: &[("braised", 85)],
    },
    FoodEntry {
        category: "lamb",
        food: "shoulder",
        carryover: LambRoast,
        doneness: &[("pulled", 88)],
    },
    // veal
    FoodEntry {
        category: "veal",
        food: "roast",
        carryover: Veal,
        doneness: &[("medium", 63), ("well_done", 68)],
    },
    FoodEntry { category: "veal", food: "chop", carryover: Veal, doneness: &[("medium", 63)] },
    FoodEntry { category: "veal", food: "cutlet", carryover: Veal, doneness: &[("medium", 63)] },
    // fish
    FoodEntry {
        category: "fish",
        food: "salmon",
        carryover: Fish,
        doneness: &[("mi_cuit", 46), ("medium", 52), ("well_done", 60)],
    },
    FoodEntry {
        category: "fish",
        food: "tuna",
        carryover: Fish,
        doneness: &[("rare", 43), ("medium", 52)],
    },
    FoodEntry {
        category: "fish",
        food: "cod",
        carryover: Fish,
        doneness: &[("medium", 55), ("well_done", 60)],
    },
    FoodEntry { category: "fish", food: "sea_bass", carryover: Fish, doneness: &[("medium", 55)] },
    FoodEntry {
        category: "fish",
        food: "halibut",
        carryover: Fish,
        doneness: &[("medium", 55), ("well_done", 60)],
    },
    FoodEntry { category: "fish", food: "shrimp", carryover: Fish, doneness: &[("safe", 63)] },
    FoodEntry { category: "fish", food: "lobster", carryover: Fish, doneness: &[("medium", 60)] },
    // game
    FoodEntry {
        category: "game",
        food: "wild_boar",
        carryover: Other,
        doneness: &[("medium", 63), ("well_done", 68)],
    },
    FoodEntry { category: "game", food: "venison", carryover: Other, doneness: LAMB_PINK_LEVELS },
    FoodEntry {
        category: "game",
        food: "rabbit",
        carryover: Other,
        doneness: &[("medium", 63), ("well_done", 71)],
    },
    // other
    FoodEntry {
        category: "other",
        food: "egg_soft_boiled",
        carryover: Other,
        doneness: &[("soft", 64)],
    },
    FoodEntry {
        category: "other",
        food: "egg_poached",
        carryover: Other,
        doneness: &[("perfect", 67)],
    },
    FoodEntry {
        category: "other",
        food: "egg_hard_boiled",
        carryover: Other,
        doneness: &[("hard", 77)],
    },
];

/// Find a food in the table.
pub fn lookup(category: &str, food: &str) -> Option<&'static FoodEntry> {
    FOOD_TABLE
        .iter()
        .find(|entry| entry.category == category && entry.food == food)
}

/// Target temperature for a food and doneness.
pub fn target_temperature(category: &str, food: &str, doneness: &str) -> Option<f64> {
    lookup(category, food)?.temperature(doneness)
}

/// Carryover type for a food; unknown foods use [`CarryoverType::Other`].
pub fn carryover_type(category: &str, food: &str) -> CarryoverType {
    lookup(category, food)
        .map(|entry| entry.carryover)
        .unwrap_or_default()
}

/// Check if the selection is the manual sentinel.
pub fn is_manual(category: &str, food: &str) -> bool {
    category == MANUAL && food == MANUAL
}

/// All categories, in table order.
pub fn categories() -> Vec<&'static str> {
    let mut result: Vec<&'static str> = Vec::new();
    for entry in FOOD_TABLE {
        if !result.contains(&entry.category) {
            result.push(entry.category);
        }
    }
    result
}

/// Foods of a category, in table order.
pub fn foods(category: &str) -> Vec<&'static str> {
    FOOD_TABLE
        .iter()
        .filter(|entry| entry.category == category)
        .map(|entry| entry.food)
        .collect()
}

/// Doneness levels of a food.
pub fn doneness_levels(category: &str, food: &str) -> Vec<&'static str> {
    lookup(category, food)
        .map(|entry| entry.doneness.iter().map(|(name, _)| *name).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_temperature() {
        assert_eq!(target_temperature("beef", "steak", "medium"), Some(57.0));
        assert_eq!(target_temperature("beef", "steak", "blue"), Some(46.0));
        assert_eq!(target_temperature("poultry", "chicken_breast", "done"), Some(74.0));
        assert_eq!(target_temperature("fish", "tuna", "rare"), Some(43.0));
        assert_eq!(target_temperature("beef", "roast", "blue"), None);
        assert_eq!(target_temperature("beef", "unicorn", "rare"), None);
    }

    #[test]
    fn test_carryover_types() {
        assert_eq!(carryover_type("beef", "steak"), CarryoverType::BeefSteak);
        assert_eq!(carryover_type("beef", "brisket"), CarryoverType::BeefRoast);
        assert_eq!(carryover_type("nope", "steak"), CarryoverType::Other);
        assert_eq!(CarryoverType::BeefSteak.weight(), 0.8);
        assert_eq!(CarryoverType::Fish.weight(), 0.5);
        assert_eq!(CarryoverType::BeefRoast.weight(), 1.5);
    }

    #[test]
    fn test_listing() {
        assert_eq!(
            categories(),
            vec!["beef", "pork", "poultry", "lamb", "veal", "fish", "game", "other"]
        );
        assert_eq!(foods("veal"), vec!["roast", "chop", "cutlet"]);
        assert!(foods("manual").is_empty());
        assert_eq!(doneness_levels("pork", "ribs"), vec!["tender", "fall_off_bone"]);
        assert!(doneness_levels("pork", "nope").is_empty());
    }

    #[test]
    fn test_manual_sentinel() {
        assert!(is_manual("manual", "manual"));
        assert!(!is_manual("manual", "steak"));
        assert!(lookup(MANUAL, MANUAL).is_none());
    }

    #[test]
    fn test_table_is_consistent() {
        for entry in FOOD_TABLE {
            assert!(!entry.doneness.is_empty(), "{}/{}", entry.category, entry.food);
            for (_, temp) in entry.doneness {
                assert!((30..=100).contains(temp));
            }
        }
    }
}
