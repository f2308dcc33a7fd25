//! Team endpoints.

use super::{require, segment, ApiClient};
use crate::errors::ClientResult;
use crate::models::{CreateTeamRequest, Team, UpdateTeamRequest};

impl ApiClient {
    /// GET /api/teams - List all teams.
    pub async fn list_teams(&self) -> ClientResult<Vec<Team>> {
        self.get("/api/teams").await
    }

    /// GET /api/teams/:id - Get a single team.
    pub async fn get_team(&self, id: &str) -> ClientResult<Team> {
        let id = segment("Team id", id)?;
        self.get(&format!("/api/teams/{}", id)).await
    }

    /// POST /api/teams - Create a new team.
    pub async fn create_team(&self, request: &CreateTeamRequest) -> ClientResult<Team> {
        require("Team name", &request.name)?;
        self.post("/api/teams", request).await
    }

    /// PUT /api/teams/:id - Update a team.
    pub async fn update_team(&self, id: &str, request: &UpdateTeamRequest) -> ClientResult<Team> {
        let id = segment("Team id", id)?;
        if let Some(name) = &request.name {
            require("Team name", name)?;
        }
        self.put(&format!("/api/teams/{}", id), request).await
    }

    /// DELETE /api/teams/:id - Delete a team.
    pub async fn delete_team(&self, id: &str) -> ClientResult<()> {
        let id = segment("Team id", id)?;
        self.delete(&format!("/api/teams/{}", id)).await
    }
}
