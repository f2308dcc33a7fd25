//! Project endpoints.

use super::{require, segment, ApiClient};
use crate::errors::ClientResult;
use crate::models::{CreateProjectRequest, Project, UpdateProjectRequest};

impl ApiClient {
    /// GET /api/projects - List all projects.
    pub async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.get("/api/projects").await
    }

    /// GET /api/projects/:id - Get a single project.
    pub async fn get_project(&self, id: &str) -> ClientResult<Project> {
        let id = segment("Project id", id)?;
        self.get(&format!("/api/projects/{}", id)).await
    }

    /// POST /api/projects - Create a new project.
    pub async fn create_project(&self, request: &CreateProjectRequest) -> ClientResult<Project> {
        require("Project name", &request.name)?;
        self.post("/api/projects", request).await
    }

    /// PUT /api/projects/:id - Update a project.
    pub async fn update_project(
        &self,
        id: &str,
        request: &UpdateProjectRequest,
    ) -> ClientResult<Project> {
        let id = segment("Project id", id)?;
        if let Some(name) = &request.name {
            require("Project name", name)?;
        }
        self.put(&format!("/api/projects/{}", id), request).await
    }

    /// DELETE /api/projects/:id - Delete a project.
    pub async fn delete_project(&self, id: &str) -> ClientResult<()> {
        let id = segment("Project id", id)?;
        self.delete(&format!("/api/projects/{}", id)).await
    }
}
