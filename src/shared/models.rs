//! Fitness Domain Models
//!
//! Data structures exchanged with the remote API and kept in the local cache.
//! They are plain serde types; the offline sync queue embeds the write-side
//! models in operation payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A step count recorded for one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// Server or locally assigned record id
    pub id: String,
    /// Day the steps belong to
    pub date: NaiveDate,
    /// Number of steps
    pub steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    /// When the record was captured on the device
    pub recorded_at: DateTime<Utc>,
}

impl StepRecord {
    /// Create a record for `date` with a fresh local id
    pub fn new(date: NaiveDate, steps: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            steps,
            distance_km: None,
            calories: None,
            recorded_at: Utc::now(),
        }
    }
}

/// Aggregated statistics for a single day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub steps: u32,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_steps: Option<u32>,
}

impl DailyStats {
    /// Progress towards the daily goal in the range `0.0..=1.0`
    pub fn goal_progress(&self) -> Option<f64> {
        self.goal_steps
            .filter(|goal| *goal > 0)
            .map(|goal| (self.steps as f64 / goal as f64).min(1.0))
    }
}

/// Step totals for the trailing seven days
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrend {
    pub days: Vec<DailyStats>,
}

impl WeeklyTrend {
    pub fn total_steps(&self) -> u64 {
        self.days.iter().map(|d| d.steps as u64).sum()
    }

    pub fn average_steps(&self) -> u32 {
        if self.days.is_empty() {
            0
        } else {
            (self.total_steps() / self.days.len() as u64) as u32
        }
    }
}

/// Period a goal is measured over
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
}

/// A step goal, optionally shared with other users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub target_steps: u32,
    pub period: GoalPeriod,
    /// User ids the goal is shared with
    #[serde(default)]
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Create an unshared goal with a fresh local id
    pub fn new(title: impl Into<String>, target_steps: u32, period: GoalPeriod) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            target_steps,
            period,
            shared_with: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add `user_id` to the share list. Returns false if it was already present.
    pub fn share_with(&mut self, user_id: impl Into<String>) -> bool {
        let user_id = user_id.into();
        if self.shared_with.contains(&user_id) {
            return false;
        }
        self.shared_with.push(user_id);
        self.updated_at = Utc::now();
        true
    }
}

/// The signed-in user's profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    pub daily_step_goal: u32,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, daily_step_goal: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            height_cm: None,
            weight_kg: None,
            daily_step_goal,
            updated_at: Utc::now(),
        }
    }
}
