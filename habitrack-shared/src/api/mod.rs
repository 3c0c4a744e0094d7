use serde::{Deserialize, Serialize};

use crate::domain::default_goal;

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_PREFIX: &str = "/api";

// Habits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitReq {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub goal: i32,
    pub auto_complete: bool,
    pub checkins: Vec<CheckInDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResp {
    pub ok: bool,
}

// Check-ins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInReq {
    pub habit_id: i32,
    pub date: String, // YYYY-MM-DD
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInDto {
    pub id: i32,
    pub habit_id: i32,
    pub date: String, // YYYY-MM-DD
    pub status: bool,
}

// Analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySnapshotDto {
    pub date: String, // YYYY-MM-DD
    /// `None` when nothing was recorded that day; `Some(0.0)` when check-ins
    /// exist but none were completed.
    pub percentage: Option<f64>,
    pub completed: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopHabitDto {
    pub name: String,
    pub emoji: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRatioDto {
    pub completed: i64,
    pub remaining: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakDto {
    pub habit_id: i32,
    pub name: String,
    pub emoji: Option<String>,
    pub current_streak: i64,
}
