use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::projects::dto::CreateProjectForm;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub default_environment: String,
    pub jira_token: Option<String>,
    pub mattermost_token: Option<String>,
    pub sentry_token: Option<String>,
    pub email_notifications: bool,
    pub slack_notifications: bool,
    pub mattermost_notifications: bool,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub status: String,
    pub can_create_tests: bool,
    pub can_execute_tests: bool,
    pub can_manage_members: bool,
    pub can_view_reports: bool,
    pub created_at: OffsetDateTime,
}

impl Project {
    /// Creates the project and the creator's owner membership with every
    /// permission granted; both rows commit or neither.
    pub async fn create(
        db: &PgPool,
        created_by: Uuid,
        form: &CreateProjectForm,
    ) -> anyhow::Result<Project> {
        let mut tx = db.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                name, description, status, default_environment,
                jira_token, mattermost_token, sentry_token,
                email_notifications, slack_notifications, mattermost_notifications,
                created_by
            )
            VALUES ($1, $2, 'active', $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, name, description, status, default_environment,
                      jira_token, mattermost_token, sentry_token,
                      email_notifications, slack_notifications, mattermost_notifications,
                      created_by, created_at
            "#,
        )
        .bind(&form.name)
        .bind(&form.description)
        .bind(&form.default_environment)
        .bind(&form.jira_token)
        .bind(&form.mattermost_token)
        .bind(&form.sentry_token)
        .bind(form.email_notifications)
        .bind(form.slack_notifications)
        .bind(form.mattermost_notifications)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO project_members (
                project_id, user_id, role, status,
                can_create_tests, can_execute_tests, can_manage_members, can_view_reports
            )
            VALUES ($1, $2, 'owner', 'active', TRUE, TRUE, TRUE, TRUE)
            "#,
        )
        .bind(project.id)
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(project)
    }

    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.description, p.status, p.default_environment,
                   p.jira_token, p.mattermost_token, p.sentry_token,
                   p.email_notifications, p.slack_notifications, p.mattermost_notifications,
                   p.created_by, p.created_at
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1 AND m.status = 'active'
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
