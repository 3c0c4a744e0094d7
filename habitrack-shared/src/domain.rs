use serde::{Deserialize, Serialize};

/// Weekly goal applied when a habit is created without one.
pub const DEFAULT_GOAL: i32 = 7;

/// Valid range for a habit's weekly goal (days per week).
pub const GOAL_RANGE: std::ops::RangeInclusive<i32> = 1..=7;

pub fn default_goal() -> i32 {
    DEFAULT_GOAL
}

/// A habit as declared in the server config, inserted into an empty database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default = "default_goal")]
    pub goal: i32,
    #[serde(default)]
    pub auto_complete: bool,
}
