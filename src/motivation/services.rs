use serde::Serialize;

use crate::{dietary::calculator::MacroTargets, meals::dto::DailyTotals};

/// What remains of today's targets; negative once a target is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Remaining {
    pub calories_left: i64,
    pub protein_left: i64,
}

impl Remaining {
    pub fn between(targets: &MacroTargets, consumed: &DailyTotals) -> Self {
        Self {
            calories_left: (f64::from(targets.calories) - consumed.calories).round() as i64,
            protein_left: (f64::from(targets.protein) - consumed.protein).round() as i64,
        }
    }
}

fn is_rest(workout: &str) -> bool {
    let w = workout.trim().to_lowercase();
    w.is_empty() || w.starts_with("rest") || w.ends_with(": rest")
}

pub fn build_prompt(remaining: Remaining, workout: Option<&str>) -> String {
    let calories = if remaining.calories_left > 0 {
        format!("- Has {} calories left to eat today", remaining.calories_left)
    } else {
        "- Has met their calorie goal for today!".to_string()
    };
    let protein = if remaining.protein_left > 0 {
        format!("- Needs {}g more protein", remaining.protein_left)
    } else {
        "- Has hit their protein target!".to_string()
    };
    let training = match workout.filter(|w| !is_rest(w)) {
        Some(w) => format!("- Has this workout planned: {w}"),
        None => "- Is taking a rest day".to_string(),
    };

    format!(
        "Create an enthusiastic, motivational message (2-3 sentences) for someone who:\n\
         {calories}\n{protein}\n{training}\n\n\
         Make it energetic and encouraging, focusing on their progress and potential. \
         Reply with the message only."
    )
}
