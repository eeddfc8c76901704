//! Project entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProjectId, UserId};

/// A project owning a tree of phases and tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,

    pub name: String,

    /// Owning user
    pub owner_id: UserId,

    /// Master instructions injected into every chat system prompt
    /// for this project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_instructions: Option<String>,

    /// Repository URL used to resolve owner/repo for issue and README
    /// operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id,
            ai_instructions: None,
            github_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Extract `(owner, repo)` from the project's GitHub URL, if set.
    ///
    /// Accepts `https://github.com/owner/repo`, with or without a trailing
    /// `.git` or extra path segments.
    pub fn github_owner_repo(&self) -> Option<(String, String)> {
        let url = self.github_url.as_deref()?;
        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("http://github.com/"))
            .or_else(|| url.strip_prefix("git@github.com:"))?;

        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let repo = segments.next()?.trim_end_matches(".git");

        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some((owner.to_string(), repo.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with_url(url: &str) -> Project {
        let mut project = Project::new(Uuid::new_v4(), "Test");
        project.github_url = Some(url.to_string());
        project
    }

    #[test]
    fn test_github_owner_repo() {
        let project = project_with_url("https://github.com/acme/widgets");
        assert_eq!(
            project.github_owner_repo(),
            Some(("acme".to_string(), "widgets".to_string()))
        );
    }

    #[test]
    fn test_github_owner_repo_git_suffix() {
        let project = project_with_url("https://github.com/acme/widgets.git");
        assert_eq!(
            project.github_owner_repo(),
            Some(("acme".to_string(), "widgets".to_string()))
        );
    }

    #[test]
    fn test_github_owner_repo_invalid() {
        let project = project_with_url("https://gitlab.com/acme/widgets");
        assert_eq!(project.github_owner_repo(), None);

        let project = Project::new(Uuid::new_v4(), "Test");
        assert_eq!(project.github_owner_repo(), None);
    }
}
