use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Weekday;

use crate::{
    ai::parse_model_json,
    survey::dto::{duration_minutes, SurveyAnswers},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reps {
    Count(u32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: Reps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDay {
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePlan {
    pub schedule: Vec<PlanDay>,
}

/// Day-keyed plan: one free-text description per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    #[serde(rename = "Monday")]
    pub monday: String,
    #[serde(rename = "Tuesday")]
    pub tuesday: String,
    #[serde(rename = "Wednesday")]
    pub wednesday: String,
    #[serde(rename = "Thursday")]
    pub thursday: String,
    #[serde(rename = "Friday")]
    pub friday: String,
    #[serde(rename = "Saturday")]
    pub saturday: String,
    #[serde(rename = "Sunday")]
    pub sunday: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkoutPlan {
    Schedule(SchedulePlan),
    Weekly(WeeklyPlan),
}

/// Which plan shape to ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStyle {
    #[default]
    Weekly,
    Schedule,
}

impl WeeklyPlan {
    pub fn days(&self) -> [(&'static str, &str); 7] {
        [
            ("Monday", self.monday.as_str()),
            ("Tuesday", self.tuesday.as_str()),
            ("Wednesday", self.wednesday.as_str()),
            ("Thursday", self.thursday.as_str()),
            ("Friday", self.friday.as_str()),
            ("Saturday", self.saturday.as_str()),
            ("Sunday", self.sunday.as_str()),
        ]
    }

    fn day(&self, weekday: Weekday) -> &str {
        match weekday {
            Weekday::Monday => &self.monday,
            Weekday::Tuesday => &self.tuesday,
            Weekday::Wednesday => &self.wednesday,
            Weekday::Thursday => &self.thursday,
            Weekday::Friday => &self.friday,
            Weekday::Saturday => &self.saturday,
            Weekday::Sunday => &self.sunday,
        }
    }
}

/// Placeholder week served when the model cannot produce a plan.
pub fn fallback_plan() -> WeeklyPlan {
    WeeklyPlan {
        monday: "Rest day".into(),
        tuesday: "Basic cardio - 30 minutes walking".into(),
        wednesday: "Rest day".into(),
        thursday: "Basic strength training".into(),
        friday: "Rest day".into(),
        saturday: "Light cardio".into(),
        sunday: "Rest day".into(),
    }
}

impl WorkoutPlan {
    /// Today's session as text; schedule days are taken Monday-first by position.
    pub fn for_weekday(&self, weekday: Weekday) -> Option<String> {
        match self {
            WorkoutPlan::Weekly(w) => Some(w.day(weekday).to_string()),
            WorkoutPlan::Schedule(s) => {
                let day = s
                    .schedule
                    .get(weekday.number_days_from_monday() as usize)?;
                if day.exercises.is_empty() {
                    return Some(format!("{}: rest", day.name));
                }
                let list: Vec<String> = day
                    .exercises
                    .iter()
                    .map(|e| match &e.reps {
                        Reps::Count(n) => format!("{} {}x{}", e.name, e.sets, n),
                        Reps::Text(t) => format!("{} {}x{}", e.name, e.sets, t),
                    })
                    .collect();
                Some(format!("{}: {}", day.name, list.join(", ")))
            }
        }
    }
}

/// Survey-derived values the prompt embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInputs {
    pub experience: String,
    pub lifting_per_week: String,
    pub cardio_per_week: String,
    pub duration_minutes: String,
}

impl PlanInputs {
    pub fn from_answers(answers: &SurveyAnswers) -> Self {
        let experience = if answers.works_out() {
            "works out regularly"
        } else {
            "beginner"
        };
        Self {
            experience: experience.to_string(),
            lifting_per_week: answers
                .lifting_frequency
                .clone()
                .unwrap_or_else(|| "3".into()),
            cardio_per_week: answers
                .cardio_frequency
                .clone()
                .unwrap_or_else(|| "2".into()),
            duration_minutes: match answers.workout_duration.as_deref() {
                Some(d) => duration_minutes(d)
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "90+".into()),
                None => "30".into(),
            },
        }
    }
}

pub fn build_prompt(inputs: &PlanInputs, style: PlanStyle) -> String {
    let profile = format!(
        "Create a personalized weekly workout plan based on the following information:\n\
         - Workout experience: {}\n\
         - Lifting frequency: {} times per week\n\
         - Cardio frequency: {} times per week\n\
         - Workout duration: {} minutes\n",
        inputs.experience, inputs.lifting_per_week, inputs.cardio_per_week, inputs.duration_minutes
    );
    let shape = match style {
        PlanStyle::Schedule => {
            r#"Return ONLY the following JSON structure with no markdown formatting or code blocks:
{
  "schedule": [
    { "name": "Day 1", "exercises": [ { "name": "Exercise Name", "sets": 3, "reps": 12 } ] }
  ]
}
List seven days, Monday first. Rest days have an empty exercises list."#
        }
        PlanStyle::Weekly => {
            r#"Return ONLY a JSON object with exactly these keys:
{
  "Monday": "Detailed workout description",
  "Tuesday": "Detailed workout description",
  "Wednesday": "Detailed workout description",
  "Thursday": "Detailed workout description",
  "Friday": "Detailed workout description",
  "Saturday": "Detailed workout description",
  "Sunday": "Detailed workout description"
}
Include specific exercises, sets, reps, and rest periods where applicable."#
        }
    };
    format!("{profile}\n{shape}")
}

/// Validates a `schedule`-shaped answer.
pub fn parse_schedule(raw: &str) -> anyhow::Result<SchedulePlan> {
    let value: Value = parse_model_json(raw)?;
    match value.get("schedule") {
        Some(Value::Array(days)) if !days.is_empty() => {}
        Some(Value::Array(_)) => anyhow::bail!("Invalid workout plan structure: empty schedule"),
        Some(_) => anyhow::bail!("Invalid workout plan structure: schedule is not a list"),
        None => anyhow::bail!("Invalid workout plan structure: missing schedule"),
    }
    serde_json::from_value(value)
        .map_err(|e| anyhow::anyhow!("Invalid workout plan structure: {e}"))
}

/// Validates a day-keyed answer: all seven weekdays, none blank.
pub fn parse_weekly(raw: &str) -> anyhow::Result<WeeklyPlan> {
    let plan: WeeklyPlan = parse_model_json(raw)?;
    if let Some((day, _)) = plan.days().iter().find(|(_, d)| d.trim().is_empty()) {
        anyhow::bail!("Invalid workout plan structure: {day} is empty");
    }
    Ok(plan)
}
