use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{dietary::calculator::ActivityLevel, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealSwipes {
    #[serde(rename = "0")]
    None,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "14")]
    Fourteen,
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceImportance {
    #[serde(rename = "Not at all")]
    NotAtAll,
    #[serde(rename = "Not very")]
    NotVery,
    Somewhat,
    Very,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Height {
    pub feet: u8,
    pub inches: u8,
}

/// One user's survey answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub meal_swipes: MealSwipes,
    pub distance_importance: DistanceImportance,
    pub height: Height,
    /// Pounds.
    pub weight: f64,
    pub workout: YesNo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifting_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardio_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wants_plan: Option<YesNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
}

/// The answers that shape a workout plan; a change here makes a cached plan stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutProfile {
    pub workout: YesNo,
    pub lifting_frequency: Option<String>,
    pub cardio_frequency: Option<String>,
    pub workout_duration: Option<String>,
}

fn parse_days(raw: Option<&str>) -> Option<u8> {
    raw.and_then(|v| v.trim().parse::<u8>().ok())
}

impl SurveyAnswers {
    /// Parses and validates a raw `answers` object.
    pub fn from_value(raw: Value) -> Result<Self, AppError> {
        let answers: SurveyAnswers = serde_json::from_value(raw)
            .map_err(|e| AppError::validation(format!("Invalid survey answers: {e}")))?;
        answers.validate()?;
        Ok(answers)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.height.feet > 8 || self.height.inches > 11 {
            return Err(AppError::validation("height must be 0-8 ft and 0-11 in"));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(AppError::validation("weight must be a non-negative number"));
        }
        for (field, value) in [
            ("liftingFrequency", &self.lifting_frequency),
            ("cardioFrequency", &self.cardio_frequency),
        ] {
            if let Some(v) = value {
                match parse_days(Some(v)) {
                    Some(d) if d <= 7 => {}
                    _ => {
                        return Err(AppError::validation(format!(
                            "{field} must be a number of days between 0 and 7"
                        )))
                    }
                }
            }
        }
        if let Some(d) = &self.workout_duration {
            if d.trim() != "More" && duration_minutes(d).is_none() {
                return Err(AppError::validation(
                    "workoutDuration must look like \"45 min\" or \"More\"",
                ));
            }
        }
        if matches!(self.age, Some(a) if a == 0 || a > 120) {
            return Err(AppError::validation("age must be between 1 and 120"));
        }
        Ok(())
    }

    pub fn works_out(&self) -> bool {
        self.workout == YesNo::Yes
    }

    /// Weekly lifting sessions; 0 when absent or when the user does not work out.
    pub fn lifting_days(&self) -> u8 {
        if !self.works_out() {
            return 0;
        }
        parse_days(self.lifting_frequency.as_deref()).unwrap_or(0)
    }

    pub fn cardio_days(&self) -> u8 {
        if !self.works_out() {
            return 0;
        }
        parse_days(self.cardio_frequency.as_deref()).unwrap_or(0)
    }

    pub fn wants_plan(&self) -> bool {
        self.wants_plan == Some(YesNo::Yes)
    }

    pub fn workout_profile(&self) -> WorkoutProfile {
        WorkoutProfile {
            workout: self.workout,
            lifting_frequency: self.lifting_frequency.clone(),
            cardio_frequency: self.cardio_frequency.clone(),
            workout_duration: self.workout_duration.clone(),
        }
    }
}

/// Minutes from a duration answer such as `"45 min"`.
pub fn duration_minutes(raw: &str) -> Option<u32> {
    raw.trim().trim_end_matches("min").trim().parse().ok()
}

/// Survey fields that can be edited one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyField {
    DietaryRestrictions,
    MealSwipes,
    DistanceImportance,
    Height,
    Weight,
    Workout,
    LiftingFrequency,
    CardioFrequency,
    WorkoutDuration,
    WantsPlan,
    Age,
    Sex,
    ActivityLevel,
}

impl SurveyField {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "dietaryRestrictions" => Self::DietaryRestrictions,
            "mealSwipes" => Self::MealSwipes,
            "distanceImportance" => Self::DistanceImportance,
            "height" => Self::Height,
            "weight" => Self::Weight,
            "workout" => Self::Workout,
            "liftingFrequency" => Self::LiftingFrequency,
            "cardioFrequency" => Self::CardioFrequency,
            "workoutDuration" => Self::WorkoutDuration,
            "wantsPlan" => Self::WantsPlan,
            "age" => Self::Age,
            "sex" => Self::Sex,
            "activityLevel" => Self::ActivityLevel,
            _ => return None,
        })
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::DietaryRestrictions => "dietaryRestrictions",
            Self::MealSwipes => "mealSwipes",
            Self::DistanceImportance => "distanceImportance",
            Self::Height => "height",
            Self::Weight => "weight",
            Self::Workout => "workout",
            Self::LiftingFrequency => "liftingFrequency",
            Self::CardioFrequency => "cardioFrequency",
            Self::WorkoutDuration => "workoutDuration",
            Self::WantsPlan => "wantsPlan",
            Self::Age => "age",
            Self::Sex => "sex",
            Self::ActivityLevel => "activityLevel",
        }
    }

    /// Whether changing this field makes the cached workout plan stale.
    pub fn affects_workout_plan(&self) -> bool {
        matches!(
            self,
            Self::Workout | Self::LiftingFrequency | Self::CardioFrequency | Self::WorkoutDuration
        )
    }
}

/// Applies a single-field edit and re-validates the whole survey.
pub fn apply_field(
    answers: &SurveyAnswers,
    field: SurveyField,
    value: Value,
) -> Result<SurveyAnswers, AppError> {
    let mut raw = serde_json::to_value(answers).map_err(|e| AppError::Internal(e.into()))?;
    if let Value::Object(map) = &mut raw {
        if value.is_null() {
            map.remove(field.key());
        } else {
            map.insert(field.key().to_string(), value);
        }
    }
    SurveyAnswers::from_value(raw)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSurveyRequest {
    pub user_id: Option<String>,
    pub answers: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PatchSurveyRequest {
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct SubmitSurveyResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStatus {
    pub has_taken_survey: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub user_id: String,
    pub answers: SurveyAnswers,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
pub(crate) fn sample_answers() -> SurveyAnswers {
    SurveyAnswers::from_value(serde_json::json!({
        "dietaryRestrictions": ["Vegetarian"],
        "mealSwipes": "14",
        "distanceImportance": "Somewhat",
        "height": { "feet": 5, "inches": 10 },
        "weight": 160,
        "workout": "Yes",
        "liftingFrequency": "3",
        "cardioFrequency": "2",
        "workoutDuration": "45 min",
        "wantsPlan": "Yes"
    }))
    .expect("sample answers are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_front_end_payload() {
        let a = sample_answers();
        assert_eq!(a.meal_swipes, MealSwipes::Fourteen);
        assert_eq!(a.distance_importance, DistanceImportance::Somewhat);
        assert_eq!(a.lifting_days(), 3);
        assert_eq!(a.cardio_days(), 2);
        assert!(a.wants_plan());
    }

    #[test]
    fn rejects_out_of_range_height_and_unknown_enum() {
        let mut raw = serde_json::to_value(sample_answers()).unwrap();
        raw["height"] = json!({ "feet": 9, "inches": 0 });
        assert!(SurveyAnswers::from_value(raw.clone()).is_err());

        raw["height"] = json!({ "feet": 5, "inches": 0 });
        raw["mealSwipes"] = json!("12");
        assert!(SurveyAnswers::from_value(raw).is_err());
    }

    #[test]
    fn non_exerciser_has_zero_activity_days() {
        let mut a = sample_answers();
        a.workout = YesNo::No;
        assert_eq!(a.lifting_days(), 0);
        assert_eq!(a.cardio_days(), 0);
    }

    #[test]
    fn frequency_must_be_days_of_week() {
        let err = apply_field(&sample_answers(), SurveyField::LiftingFrequency, json!("9"))
            .unwrap_err();
        assert!(err.to_string().contains("liftingFrequency"));
    }

    #[test]
    fn apply_field_updates_in_place() {
        let a = sample_answers();
        let b = apply_field(&a, SurveyField::CardioFrequency, json!("5")).unwrap();
        assert_eq!(b.cardio_days(), 5);
        assert_eq!(b.height, a.height);
        assert_ne!(a.workout_profile(), b.workout_profile());

        let c = apply_field(&a, SurveyField::Age, json!(30)).unwrap();
        assert_eq!(c.age, Some(30));
        assert_eq!(a.workout_profile(), c.workout_profile());
    }

    #[test]
    fn only_workout_fields_invalidate_plans() {
        for f in ["workout", "liftingFrequency", "cardioFrequency", "workoutDuration"] {
            assert!(SurveyField::parse(f).unwrap().affects_workout_plan(), "{f}");
        }
        for f in ["weight", "height", "mealSwipes", "wantsPlan"] {
            assert!(!SurveyField::parse(f).unwrap().affects_workout_plan(), "{f}");
        }
        assert!(SurveyField::parse("favoriteColor").is_none());
    }

    #[test]
    fn duration_parsing() {
        assert_eq!(duration_minutes("45 min"), Some(45));
        assert_eq!(duration_minutes("60"), Some(60));
        assert_eq!(duration_minutes("More"), None);
    }
}
