use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::projects::repo::Project;

/// Raw project creation form. Checkboxes submit "on" when ticked and are
/// absent otherwise.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub default_environment: Option<String>,
    pub jira_token: Option<String>,
    pub mattermost_token: Option<String>,
    pub sentry_token: Option<String>,
    pub email_notifications: Option<String>,
    pub slack_notifications: Option<String>,
    pub mattermost_notifications: Option<String>,
}

#[derive(Debug)]
pub struct CreateProjectForm {
    pub name: String,
    pub description: String,
    pub default_environment: String,
    pub jira_token: Option<String>,
    pub mattermost_token: Option<String>,
    pub sentry_token: Option<String>,
    pub email_notifications: bool,
    pub slack_notifications: bool,
    pub mattermost_notifications: bool,
}

impl CreateProjectRequest {
    pub fn validate(self) -> Result<CreateProjectForm, Vec<String>> {
        let mut problems = Vec::new();

        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let checked = |v: Option<String>| v.as_deref() == Some("on");

        let name = present(self.name);
        if name.is_none() {
            problems.push("name is required".to_string());
        }
        let description = present(self.description);
        if description.is_none() {
            problems.push("description is required".to_string());
        }
        let default_environment = present(self.default_environment);
        if default_environment.is_none() {
            problems.push("defaultEnvironment is required".to_string());
        }

        match (name, description, default_environment) {
            (Some(name), Some(description), Some(default_environment)) => Ok(CreateProjectForm {
                name,
                description,
                default_environment,
                jira_token: present(self.jira_token),
                mattermost_token: present(self.mattermost_token),
                sentry_token: present(self.sentry_token),
                email_notifications: checked(self.email_notifications),
                slack_notifications: checked(self.slack_notifications),
                mattermost_notifications: checked(self.mattermost_notifications),
            }),
            _ => Err(problems),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub default_environment: String,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            status: p.status,
            default_environment: p.default_environment,
            created_by: p.created_by,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProjectResponse {
    pub project_id: Uuid,
}
