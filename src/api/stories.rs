//! Story endpoints.

use super::{non_negative, require, segment, ApiClient};
use crate::errors::{ClientError, ClientResult};
use crate::models::{CreateStoryRequest, Story, UpdateStoryRequest};

impl ApiClient {
    /// GET /api/projects/:id/stories - List a project's stories.
    pub async fn list_stories(&self, project_id: &str) -> ClientResult<Vec<Story>> {
        let project_id = segment("Project id", project_id)?;
        self.get(&format!("/api/projects/{}/stories", project_id)).await
    }

    /// GET /api/stories/:id - Get a single story.
    pub async fn get_story(&self, id: &str) -> ClientResult<Story> {
        let id = segment("Story id", id)?;
        self.get(&format!("/api/stories/{}", id)).await
    }

    /// POST /api/stories - Create a new story.
    pub async fn create_story(&self, request: &CreateStoryRequest) -> ClientResult<Story> {
        require("Project id", &request.project_id)?;
        require("Story title", &request.title)?;

        self.post("/api/stories", request).await
    }

    /// PUT /api/stories/:id - Update a story.
    pub async fn update_story(&self, id: &str, request: &UpdateStoryRequest) -> ClientResult<Story> {
        let id = segment("Story id", id)?;
        if let Some(title) = &request.title {
            require("Story title", title)?;
        }
        non_negative("Story points", request.story_points)?;
        non_negative("Actual hours", request.actual_hours)?;

        if request.title.is_none()
            && request.description.is_none()
            && request.story_points.is_none()
            && request.actual_hours.is_none()
        {
            return Err(ClientError::Validation("No changes provided".to_string()));
        }

        self.put(&format!("/api/stories/{}", id), request).await
    }

    /// DELETE /api/stories/:id - Delete a story.
    pub async fn delete_story(&self, id: &str) -> ClientResult<()> {
        let id = segment("Story id", id)?;
        self.delete(&format!("/api/stories/{}", id)).await
    }
}
