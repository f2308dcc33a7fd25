//! Hours-per-point rate endpoints.

use super::{segment, ApiClient};
use crate::errors::{ClientError, ClientResult};
use crate::models::{HoursPerPointRate, SetRateRequest};

impl ApiClient {
    /// GET /api/teams/:id/rate - Get a team's hours-per-point rate.
    pub async fn get_rate(&self, team_id: &str) -> ClientResult<HoursPerPointRate> {
        let team_id = segment("Team id", team_id)?;
        self.get(&format!("/api/teams/{}/rate", team_id)).await
    }

    /// PUT /api/teams/:id/rate - Set a team's hours-per-point rate.
    pub async fn set_rate(&self, team_id: &str, hours_per_point: f64) -> ClientResult<HoursPerPointRate> {
        let team_id = segment("Team id", team_id)?;
        if !hours_per_point.is_finite() || hours_per_point <= 0.0 {
            return Err(ClientError::Validation(
                "Hours per point must be a positive number".to_string(),
            ));
        }

        self.put(
            &format!("/api/teams/{}/rate", team_id),
            &SetRateRequest { hours_per_point },
        )
        .await
    }
}
