use serde::{Deserialize, Serialize};

use crate::survey::dto::{Height, Sex, SurveyAnswers};

const LB_TO_KG: f64 = 0.453592;
const FT_TO_CM: f64 = 30.48;
const IN_TO_CM: f64 = 2.54;
const DEFAULT_AGE: u32 = 25;
const ACTIVITY_BONUS_KCAL: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
}

impl ActivityLevel {
    /// Tier for the share of days with a session.
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction < 0.15 {
            Self::Sedentary
        } else if fraction < 0.43 {
            Self::Light
        } else if fraction < 0.72 {
            Self::Moderate
        } else {
            Self::Active
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
        }
    }
}

/// Daily targets; calories in kcal, macros in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroTargets {
    pub calories: u32,
    pub protein: u32,
    pub fat: u32,
    pub carbs: u32,
}

impl Default for MacroTargets {
    fn default() -> Self {
        Self {
            calories: 2000,
            protein: 150,
            fat: 67,
            carbs: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroInput {
    pub weight_lb: f64,
    pub height: Height,
    pub age: u32,
    pub sex: Sex,
    /// Lifting plus cardio sessions per week.
    pub weekly_sessions: u8,
    pub activity_override: Option<ActivityLevel>,
}

impl From<&SurveyAnswers> for MacroInput {
    fn from(a: &SurveyAnswers) -> Self {
        Self {
            weight_lb: a.weight,
            height: a.height,
            age: a.age.unwrap_or(DEFAULT_AGE),
            sex: a.sex.unwrap_or(Sex::Male),
            weekly_sessions: a.lifting_days() + a.cardio_days(),
            activity_override: a.activity_level,
        }
    }
}

fn clamp(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v as u32
    } else {
        0
    }
}

/// Mifflin-St Jeor BMR scaled by activity, split 25% fat with protein at 2.2 g/kg.
pub fn calculate_macros(input: &MacroInput) -> MacroTargets {
    let kg = input.weight_lb * LB_TO_KG;
    let cm = f64::from(input.height.feet) * FT_TO_CM + f64::from(input.height.inches) * IN_TO_CM;
    let sex_term = match input.sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    };
    let bmr = 10.0 * kg + 6.25 * cm - 5.0 * f64::from(input.age) + sex_term;

    let fraction = f64::from(input.weekly_sessions) / 7.0;
    let level = input
        .activity_override
        .unwrap_or_else(|| ActivityLevel::from_fraction(fraction));

    let calories = ((bmr * level.multiplier()).round() + (fraction * ACTIVITY_BONUS_KCAL).round()).max(0.0);
    let protein = (kg * 2.2).round().max(0.0);
    let fat = (0.25 * calories / 9.0).round().max(0.0);
    let carbs = ((calories - protein * 4.0 - fat * 9.0) / 4.0).round();

    MacroTargets {
        calories: clamp(calories),
        protein: clamp(protein),
        fat: clamp(fat),
        carbs: clamp(carbs),
    }
}

/// Targets for a stored survey, or the default bundle when there is none.
pub fn targets_for(answers: Option<&SurveyAnswers>) -> MacroTargets {
    answers
        .map(|a| calculate_macros(&MacroInput::from(a)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::dto::{sample_answers, YesNo};

    #[test]
    fn non_exerciser_uses_sedentary_tier_and_default_age() {
        let mut a = sample_answers();
        a.workout = YesNo::No;
        let t = targets_for(Some(&a));
        // 160 lb, 5'10", 25, male: BMR 1716.9972 x 1.2
        assert_eq!(t.calories, 2060);
        assert_eq!(t.protein, 160);
        assert_eq!(t.fat, 57);
        assert_eq!(t.carbs, 227);
    }

    #[test]
    fn missing_survey_gives_default_bundle() {
        let t = targets_for(None);
        assert_eq!((t.calories, t.protein, t.fat, t.carbs), (2000, 150, 67, 250));
    }

    #[test]
    fn tiers_follow_session_share() {
        assert_eq!(ActivityLevel::from_fraction(0.0), ActivityLevel::Sedentary);
        assert_eq!(ActivityLevel::from_fraction(2.0 / 7.0), ActivityLevel::Light);
        assert_eq!(ActivityLevel::from_fraction(4.0 / 7.0), ActivityLevel::Moderate);
        assert_eq!(ActivityLevel::from_fraction(5.0 / 7.0), ActivityLevel::Moderate);
        assert_eq!(ActivityLevel::from_fraction(6.0 / 7.0), ActivityLevel::Active);
    }

    #[test]
    fn override_replaces_tier_but_keeps_bonus() {
        let a = sample_answers();
        let base = MacroInput::from(&a);
        assert_eq!(base.weekly_sessions, 5);
        let derived = calculate_macros(&base);
        let forced = calculate_macros(&MacroInput {
            activity_override: Some(ActivityLevel::Sedentary),
            ..base
        });
        assert!(forced.calories < derived.calories);
        // bonus for 5/7 days is round(107.14) = 107
        let mut none = sample_answers();
        none.workout = YesNo::No;
        assert_eq!(forced.calories, targets_for(Some(&none)).calories + 107);
    }

    #[test]
    fn outputs_balance_within_rounding() {
        for weight in [90.0, 130.0, 175.5, 240.0, 320.0] {
            for feet in 4..=7u8 {
                for age in [18, 25, 40, 70] {
                    for sessions in 0..=14u8 {
                        for sex in [Sex::Male, Sex::Female] {
                            let t = calculate_macros(&MacroInput {
                                weight_lb: weight,
                                height: Height { feet, inches: 6 },
                                age,
                                sex,
                                weekly_sessions: sessions,
                                activity_override: None,
                            });
                            let raw_carbs =
                                t.calories as i64 - t.protein as i64 * 4 - t.fat as i64 * 9;
                            if raw_carbs >= 0 {
                                let sum = t.protein * 4 + t.fat * 9 + t.carbs * 4;
                                assert!(
                                    (sum as i64 - t.calories as i64).abs() <= 2,
                                    "{weight} {feet} {age} {sessions}: {t:?}"
                                );
                            } else {
                                assert_eq!(t.carbs, 0);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn zero_weight_never_goes_negative() {
        let t = calculate_macros(&MacroInput {
            weight_lb: 0.0,
            height: Height { feet: 0, inches: 0 },
            age: 120,
            sex: Sex::Female,
            weekly_sessions: 0,
            activity_override: None,
        });
        assert_eq!(t, MacroTargets { calories: 0, protein: 0, fat: 0, carbs: 0 });
    }
}
