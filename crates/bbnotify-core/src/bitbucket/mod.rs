// SPDX-License-Identifier: Apache-2.0

//! Bitbucket Cloud integration.
//!
//! - [`Repository`] - validated `owner/repo_slug` coordinate
//! - [`SearchQuery`] - pull request filter expression
//! - [`pulls`] - paginated pull request search with token refresh

use std::fmt;

use crate::error::NotifyError;

pub mod pulls;

pub use pulls::{
    Author, BranchGroup, FetchOptions, GroupedPullRequests, PullRequestFetcher, PullRequestPage,
    RawPullRequest, SerializedPullRequest, serialize_pull_request,
};

/// Repository coordinate on Bitbucket Cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    owner: String,
    repo_slug: String,
}

impl Repository {
    /// Creates a coordinate from a user/team name and a repository slug.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidRepository`] naming the empty part.
    pub fn new(owner: impl Into<String>, repo_slug: impl Into<String>) -> Result<Self, NotifyError> {
        let owner = owner.into();
        let repo_slug = repo_slug.into();
        if owner.trim().is_empty() {
            return Err(NotifyError::InvalidRepository { field: "owner" });
        }
        if repo_slug.trim().is_empty() {
            return Err(NotifyError::InvalidRepository { field: "repo slug" });
        }
        Ok(Self { owner, repo_slug })
    }

    /// User or team owning the repository.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository slug.
    #[must_use]
    pub fn repo_slug(&self) -> &str {
        &self.repo_slug
    }

    /// Pull request collection URL under `api_url`.
    #[must_use]
    pub fn pull_requests_url(&self, api_url: &str) -> String {
        format!(
            "{}/repositories/{}/{}/pullrequests",
            api_url.trim_end_matches('/'),
            self.owner,
            self.repo_slug
        )
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo_slug)
    }
}

/// Structured search fields, conjoined in the order state, updated on,
/// destination branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Pull request state, e.g. `MERGED`.
    pub state: Option<String>,
    /// Lower bound for the last update, e.g. `2024-01-01T00:00:00+00:00`.
    pub updated_on: Option<String>,
    /// Destination branch name.
    pub destination_branch: Option<String>,
}

impl SearchFilter {
    fn clauses(&self) -> Vec<String> {
        let mut clauses = Vec::new();
        if let Some(state) = non_empty(self.state.as_deref()) {
            clauses.push(format!("state=\"{state}\""));
        }
        if let Some(updated_on) = non_empty(self.updated_on.as_deref()) {
            clauses.push(format!("updated_on >= {updated_on}"));
        }
        if let Some(branch) = non_empty(self.destination_branch.as_deref()) {
            clauses.push(format!("destination.branch.name=\"{branch}\""));
        }
        clauses
    }
}

/// Pull request search expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Caller-supplied filter, sent verbatim as `q`.
    Raw(String),
    /// Filter built from structured fields.
    Structured(SearchFilter),
}

impl SearchQuery {
    /// Prefers a non-empty raw filter over the structured fields.
    #[must_use]
    pub fn from_parts(raw: Option<String>, filter: SearchFilter) -> Self {
        match raw.filter(|q| !q.trim().is_empty()) {
            Some(q) => Self::Raw(q),
            None => Self::Structured(filter),
        }
    }

    /// Resolves the `q` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingSearchParameters`] for an empty raw
    /// filter or a structured filter with no fields set.
    pub fn to_filter(&self) -> Result<String, NotifyError> {
        let filter = match self {
            Self::Raw(q) => q.trim().to_string(),
            Self::Structured(filter) => filter.clauses().join(" AND "),
        };
        if filter.is_empty() {
            return Err(NotifyError::MissingSearchParameters);
        }
        Ok(filter)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_validation() {
        assert!(matches!(
            Repository::new("", "repo"),
            Err(NotifyError::InvalidRepository { field: "owner" })
        ));
        assert!(matches!(
            Repository::new("team", " "),
            Err(NotifyError::InvalidRepository { field: "repo slug" })
        ));
    }

    #[test]
    fn test_pull_requests_url() {
        let repo = Repository::new("team", "project").unwrap();
        assert_eq!(
            repo.pull_requests_url("https://api.bitbucket.org/2.0/"),
            "https://api.bitbucket.org/2.0/repositories/team/project/pullrequests"
        );
        assert_eq!(repo.to_string(), "team/project");
    }

    #[test]
    fn test_full_structured_filter() {
        let query = SearchQuery::Structured(SearchFilter {
            state: Some("MERGED".to_string()),
            updated_on: Some("2024-01-01".to_string()),
            destination_branch: Some("develop".to_string()),
        });
        assert_eq!(
            query.to_filter().unwrap(),
            r#"state="MERGED" AND updated_on >= 2024-01-01 AND destination.branch.name="develop""#
        );
    }

    #[test]
    fn test_single_field_filter() {
        let query = SearchQuery::Structured(SearchFilter {
            updated_on: Some("X".to_string()),
            ..SearchFilter::default()
        });
        assert_eq!(query.to_filter().unwrap(), "updated_on >= X");
    }

    #[test]
    fn test_raw_filter_wins() {
        let query = SearchQuery::from_parts(
            Some(r#"state="OPEN""#.to_string()),
            SearchFilter {
                state: Some("MERGED".to_string()),
                ..SearchFilter::default()
            },
        );
        assert_eq!(query.to_filter().unwrap(), r#"state="OPEN""#);
    }

    #[test]
    fn test_blank_raw_falls_back_to_structured() {
        let query = SearchQuery::from_parts(
            Some("  ".to_string()),
            SearchFilter {
                state: Some("MERGED".to_string()),
                ..SearchFilter::default()
            },
        );
        assert_eq!(query.to_filter().unwrap(), r#"state="MERGED""#);
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(matches!(
            SearchQuery::Structured(SearchFilter::default()).to_filter(),
            Err(NotifyError::MissingSearchParameters)
        ));
        assert!(matches!(
            SearchQuery::Raw(String::new()).to_filter(),
            Err(NotifyError::MissingSearchParameters)
        ));
    }
}
