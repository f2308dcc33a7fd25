//! Hours-per-point rate and estimate accuracy comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Story;

/// How many hours one story point represents for a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursPerPointRate {
    pub id: String,
    pub team_id: String,
    pub hours_per_point: f64,
    pub updated_at: DateTime<Utc>,
}

/// Request body for setting a team's rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRateRequest {
    pub hours_per_point: f64,
}

/// Estimated versus actual time for one story.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateComparison {
    pub estimated_hours: f64,
    pub actual_hours: f64,
    /// `actual - estimated`; positive means the story ran over
    pub deviation_hours: f64,
    /// Deviation relative to the actual time, `None` when no time was logged
    pub relative_error: Option<f64>,
}

impl EstimateComparison {
    /// Compare a story's agreed points against its recorded time.
    ///
    /// Returns `None` until the story has both points and actual hours.
    pub fn for_story(story: &Story, rate: &HoursPerPointRate) -> Option<Self> {
        let points = story.story_points?;
        let actual_hours = story.actual_hours?;
        let estimated_hours = points * rate.hours_per_point;
        let deviation_hours = actual_hours - estimated_hours;
        let relative_error = (actual_hours != 0.0).then(|| deviation_hours.abs() / actual_hours);

        Some(Self {
            estimated_hours,
            actual_hours,
            deviation_hours,
            relative_error,
        })
    }
}
