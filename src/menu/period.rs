use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealPeriod {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            _ => None,
        }
    }
}

impl fmt::Display for MealPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The next dining slot for a campus-local time. Late evening rolls over to
/// tomorrow's breakfast.
pub fn next_meal_slot(now: OffsetDateTime) -> (MealPeriod, Date) {
    match now.hour() {
        0..=9 => (MealPeriod::Breakfast, now.date()),
        10..=13 => (MealPeriod::Lunch, now.date()),
        14..=20 => (MealPeriod::Dinner, now.date()),
        _ => (
            MealPeriod::Breakfast,
            now.date().next_day().unwrap_or(now.date()),
        ),
    }
}
