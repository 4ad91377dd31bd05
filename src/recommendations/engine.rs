use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::menu::{period::MealPeriod, repo::MenuItem};

pub const KNOWN_COURTS: [&str; 5] = ["Hillenbrand", "Earhart", "Ford", "Wiley", "Windsor"];

pub const NO_MENU_MESSAGE: &str = "No menu data available, random selection made";
pub const NO_MATCH_MESSAGE: &str = "None of your favorite foods are on the menu for this meal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedItem {
    pub name: String,
    pub matched_preference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub dining_court: String,
    pub confidence: u32,
    pub matching_items: Vec<MatchedItem>,
    pub meal_period: MealPeriod,
    pub date: String,
    pub random_selection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Substring match in either direction, ignoring case.
pub fn names_match(item: &str, favorite: &str) -> bool {
    let item = item.to_lowercase();
    let favorite = favorite.to_lowercase();
    item.contains(&favorite) || favorite.contains(&item)
}

pub fn confidence(matched: usize, favorites: usize) -> u32 {
    if favorites == 0 {
        return 0;
    }
    let pct = (100.0 * matched as f64 / favorites as f64).round() as u32;
    pct.min(100)
}

struct CourtScore<'a> {
    court: &'a str,
    confidence: u32,
    matches: Vec<MatchedItem>,
}

fn score_court<'a>(court: &'a str, items: &[&MenuItem], favorites: &[&str]) -> CourtScore<'a> {
    let matches: Vec<MatchedItem> = items
        .iter()
        .filter_map(|item| {
            favorites
                .iter()
                .find(|fav| names_match(&item.item_name, fav))
                .map(|fav| MatchedItem {
                    name: item.item_name.clone(),
                    matched_preference: fav.to_string(),
                })
        })
        .collect();
    CourtScore {
        court,
        confidence: confidence(matches.len(), favorites.len()),
        matches,
    }
}

/// Picks the dining court whose menu covers the most favorites. Ties go to the
/// court with more matching items, then to the alphabetically first court.
pub fn recommend<R: Rng + ?Sized>(
    favorites: &[String],
    items: &[MenuItem],
    meal_period: MealPeriod,
    date: String,
    rng: &mut R,
) -> Recommendation {
    if items.is_empty() {
        let court = KNOWN_COURTS.choose(rng).copied().unwrap_or(KNOWN_COURTS[0]);
        return Recommendation {
            dining_court: court.to_string(),
            confidence: 0,
            matching_items: Vec::new(),
            meal_period,
            date,
            random_selection: true,
            message: Some(NO_MENU_MESSAGE.into()),
        };
    }

    let favorites: Vec<&str> = favorites
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();

    let mut by_court: BTreeMap<&str, Vec<&MenuItem>> = BTreeMap::new();
    for item in items {
        by_court.entry(item.dining_court.as_str()).or_default().push(item);
    }

    let mut best: Option<CourtScore<'_>> = None;
    for (court, court_items) in &by_court {
        let score = score_court(court, court_items, &favorites);
        let better = match &best {
            None => true,
            Some(b) => (score.confidence, score.matches.len()) > (b.confidence, b.matches.len()),
        };
        if better {
            best = Some(score);
        }
    }

    // by_court is non-empty because items is
    let best = best.unwrap_or(CourtScore {
        court: KNOWN_COURTS[0],
        confidence: 0,
        matches: Vec::new(),
    });
    let message = (best.confidence == 0).then(|| NO_MATCH_MESSAGE.to_string());

    Recommendation {
        dining_court: best.court.to_string(),
        confidence: best.confidence,
        matching_items: best.matches,
        meal_period,
        date,
        random_selection: false,
        message,
    }
}
