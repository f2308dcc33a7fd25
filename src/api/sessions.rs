//! Planning Poker session endpoints.

use super::{require, segment, ApiClient};
use crate::errors::ClientResult;
use crate::models::{CreateSessionRequest, SessionSummary};

impl ApiClient {
    /// POST /api/sessions - Open a session on a story.
    pub async fn create_session(&self, story_id: &str, team_id: &str) -> ClientResult<SessionSummary> {
        require("Story id", story_id)?;
        require("Team id", team_id)?;

        let request = CreateSessionRequest {
            story_id: story_id.trim().to_string(),
            team_id: team_id.trim().to_string(),
        };
        let session: SessionSummary = self.post("/api/sessions", &request).await?;
        tracing::info!(session_id = %session.id, story_id = %session.story_id, "Session created");
        Ok(session)
    }

    /// GET /api/teams/:id/sessions - List a team's active sessions.
    pub async fn list_sessions(&self, team_id: &str) -> ClientResult<Vec<SessionSummary>> {
        let team_id = segment("Team id", team_id)?;
        self.get(&format!("/api/teams/{}/sessions", team_id)).await
    }

    /// DELETE /api/sessions/:id - End a session.
    pub async fn delete_session(&self, session_id: &str) -> ClientResult<()> {
        let session_id = segment("Session id", session_id)?;
        self.delete(&format!("/api/sessions/{}", session_id)).await?;
        tracing::info!(session_id, "Session ended");
        Ok(())
    }
}
