// SPDX-License-Identifier: Apache-2.0

//! Pull request search.
//!
//! Fetches every page of a pull request search, turns each result into an
//! email-ready record and groups the records by destination branch. A failed
//! page triggers one token refresh, after which fetching resumes at the page
//! that failed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use regex::Regex;
use secrecy::ExposeSecret;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, instrument};

use super::{Repository, SearchQuery};
use crate::config::DEFAULT_TICKET_PATTERN;
use crate::error::NotifyError;
use crate::jira::{NoTicketLinks, TicketLinker};
use crate::oauth::OAuthClient;
use crate::retry::{MAX_TOKEN_REFRESHES, with_token_refresh};

/// One page of the search response.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPage {
    /// Pull requests on this page.
    #[serde(default)]
    pub values: Vec<RawPullRequest>,
    /// URL of the next page, absent on the last one.
    #[serde(default)]
    pub next: Option<String>,
}

/// Pull request as returned by the search endpoint, flattened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "WirePullRequest")]
pub struct RawPullRequest {
    /// Title.
    pub title: String,
    /// Branch the pull request merges into.
    pub destination_branch_name: String,
    /// Web page of the pull request.
    pub html_link: String,
    /// Author's display name.
    pub author_display_name: String,
    /// Author's profile page.
    pub author_profile_link: String,
}

#[derive(Deserialize)]
struct WirePullRequest {
    title: String,
    #[serde(default)]
    destination: WireDestination,
    #[serde(default)]
    links: WireLinks,
    #[serde(default)]
    author: WireAuthor,
}

#[derive(Default, Deserialize)]
struct WireDestination {
    #[serde(default)]
    branch: WireBranch,
}

#[derive(Default, Deserialize)]
struct WireBranch {
    #[serde(default)]
    name: String,
}

#[derive(Default, Deserialize)]
struct WireLinks {
    #[serde(default)]
    html: WireHref,
}

#[derive(Default, Deserialize)]
struct WireHref {
    #[serde(default)]
    href: String,
}

#[derive(Default, Deserialize)]
struct WireAuthor {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    links: WireLinks,
}

impl From<WirePullRequest> for RawPullRequest {
    fn from(wire: WirePullRequest) -> Self {
        Self {
            title: wire.title,
            destination_branch_name: wire.destination.branch.name,
            html_link: wire.links.html.href,
            author_display_name: wire.author.display_name,
            author_profile_link: wire.author.links.html.href,
        }
    }
}

/// Pull request author as shown in the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Display name.
    pub display_name: String,
    /// Profile page.
    pub profile_url: String,
}

/// Email-ready pull request record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPullRequest {
    /// Title.
    pub title: String,
    /// First ticket id found in the title.
    pub ticket_id: Option<String>,
    /// Ticket browse URL, `#` when unavailable.
    pub ticket_url: String,
    /// Web page of the pull request.
    pub pull_request_url: String,
    /// Author.
    pub author: Author,
}

/// Records sharing a destination branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchGroup {
    /// Destination branch name.
    pub branch: String,
    /// Records in arrival order.
    pub pull_requests: Vec<SerializedPullRequest>,
}

/// Records grouped by destination branch, branches in first-seen order.
///
/// Append-only; the same pull request appearing twice is kept twice.
/// Serialises as a JSON object keyed by branch name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedPullRequests {
    groups: Vec<BranchGroup>,
}

impl GroupedPullRequests {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` to the bucket of `branch`, creating it if needed.
    pub fn push(&mut self, branch: &str, record: SerializedPullRequest) {
        match self.groups.iter_mut().find(|g| g.branch == branch) {
            Some(group) => group.pull_requests.push(record),
            None => self.groups.push(BranchGroup {
                branch: branch.to_string(),
                pull_requests: vec![record],
            }),
        }
    }

    /// Groups in first-seen order.
    #[must_use]
    pub fn groups(&self) -> &[BranchGroup] {
        &self.groups
    }

    /// Records for one branch.
    #[must_use]
    pub fn get(&self, branch: &str) -> Option<&[SerializedPullRequest]> {
        self.groups
            .iter()
            .find(|g| g.branch == branch)
            .map(|g| g.pull_requests.as_slice())
    }

    /// Branch names in first-seen order.
    pub fn branches(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.branch.as_str())
    }

    /// Every record, branch by branch.
    pub fn iter(&self) -> impl Iterator<Item = &SerializedPullRequest> {
        self.groups.iter().flat_map(|g| g.pull_requests.iter())
    }

    /// Distinct ticket ids in first-seen order.
    #[must_use]
    pub fn ticket_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.iter().filter_map(|pr| pr.ticket_id.as_deref()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.pull_requests.len()).sum()
    }

    /// `true` when no pull request was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for GroupedPullRequests {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.branch, &group.pull_requests)?;
        }
        map.end()
    }
}

/// Ticket extraction and linking options.
#[derive(Clone)]
pub struct FetchOptions {
    ticket_pattern: Regex,
    add_ticket_links: bool,
    linker: Arc<dyn TicketLinker>,
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions")
            .field("ticket_pattern", &self.ticket_pattern.as_str())
            .field("add_ticket_links", &self.add_ticket_links)
            .finish_non_exhaustive()
    }
}

impl FetchOptions {
    /// Default pattern, links disabled.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidTicketPattern`] if the default pattern
    /// fails to compile.
    pub fn new() -> Result<Self, NotifyError> {
        Self::with_pattern(DEFAULT_TICKET_PATTERN)
    }

    /// Custom ticket id pattern, links disabled.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidTicketPattern`] for an invalid pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            ticket_pattern: Regex::new(pattern)?,
            add_ticket_links: false,
            linker: Arc::new(NoTicketLinks),
        })
    }

    /// Enables ticket links through `linker`.
    #[must_use]
    pub fn with_ticket_links(mut self, linker: Arc<dyn TicketLinker>) -> Self {
        self.add_ticket_links = true;
        self.linker = linker;
        self
    }

    /// Whether ticket links are enabled.
    #[must_use]
    pub fn add_ticket_links(&self) -> bool {
        self.add_ticket_links
    }
}

/// Turns a raw pull request into its email record.
///
/// The ticket id is the first match of the pattern in the title. The ticket
/// URL comes from the linker only when links are enabled and an id matched;
/// otherwise it is `#`.
#[must_use]
pub fn serialize_pull_request(raw: &RawPullRequest, options: &FetchOptions) -> SerializedPullRequest {
    let ticket_id = options
        .ticket_pattern
        .find(&raw.title)
        .map(|m| m.as_str().to_string());

    let ticket_url = ticket_id
        .as_deref()
        .filter(|_| options.add_ticket_links)
        .and_then(|id| options.linker.ticket_url(id))
        .unwrap_or_else(|| "#".to_string());

    SerializedPullRequest {
        title: raw.title.clone(),
        ticket_id,
        ticket_url,
        pull_request_url: raw.html_link.clone(),
        author: Author {
            display_name: raw.author_display_name.clone(),
            profile_url: raw.author_profile_link.clone(),
        },
    }
}

/// Next page to request and everything merged so far.
#[derive(Debug)]
struct Cursor {
    page: u32,
    accumulated: GroupedPullRequests,
}

/// Fetches and groups the pull requests of one repository.
#[derive(Debug)]
pub struct PullRequestFetcher {
    oauth: Arc<OAuthClient>,
    repository: Repository,
    url: String,
    options: FetchOptions,
    http: reqwest::Client,
}

impl PullRequestFetcher {
    /// Creates a fetcher against the Bitbucket API rooted at `api_url`.
    #[must_use]
    pub fn new(
        oauth: Arc<OAuthClient>,
        repository: Repository,
        api_url: &str,
        options: FetchOptions,
    ) -> Self {
        let url = repository.pull_requests_url(api_url);
        Self {
            oauth,
            repository,
            url,
            options,
            http: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Repository being searched.
    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Fetches every page matching `query`.
    ///
    /// # Errors
    ///
    /// See [`PullRequestFetcher::get_pull_requests_with`].
    pub async fn get_pull_requests(
        &self,
        query: &SearchQuery,
    ) -> Result<GroupedPullRequests, NotifyError> {
        self.get_pull_requests_with(query, GroupedPullRequests::new())
            .await
    }

    /// Fetches every page matching `query`, appending to `accumulated`.
    ///
    /// Pages are requested from 1 upwards, strictly in order. If a page
    /// fails, the access token is refreshed once and fetching resumes at that
    /// page with the records merged before it.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::MissingSearchParameters`] for an empty query, before
    ///   any request
    /// - [`NotifyError::RetryLimitExceeded`] wrapping the last page failure,
    ///   including [`NotifyError::PullRequestParseFailed`] which is never
    ///   retried
    /// - [`NotifyError::TokenRefreshUnavailable`] if the refresh fails
    #[instrument(skip(self, accumulated), fields(repository = %self.repository))]
    pub async fn get_pull_requests_with(
        &self,
        query: &SearchQuery,
        accumulated: GroupedPullRequests,
    ) -> Result<GroupedPullRequests, NotifyError> {
        let filter = query.to_filter()?;
        debug!(filter = %filter, "Searching pull requests");

        let cursor = Mutex::new(Cursor {
            page: 1,
            accumulated,
        });
        let filter = filter.as_str();
        let cursor_ref = &cursor;
        let oauth = &*self.oauth;

        with_token_refresh(
            MAX_TOKEN_REFRESHES,
            move || self.fetch_remaining(filter, cursor_ref),
            move || oauth.refresh_tokens(),
        )
        .await?;

        let cursor = cursor.into_inner().unwrap_or_else(PoisonError::into_inner);
        debug!(count = cursor.accumulated.len(), "Pull requests fetched");
        Ok(cursor.accumulated)
    }

    /// Fetches from the cursor's page until the last page, merging as it goes.
    async fn fetch_remaining(&self, filter: &str, cursor: &Mutex<Cursor>) -> Result<(), NotifyError> {
        loop {
            let page = lock(cursor).page;
            let body = self.fetch_page(filter, page).await?;
            let parsed: PullRequestPage = serde_json::from_str(&body)
                .map_err(|source| NotifyError::PullRequestParseFailed { page, source })?;

            let mut state = lock(cursor);
            for raw in &parsed.values {
                let record = serialize_pull_request(raw, &self.options);
                state.accumulated.push(&raw.destination_branch_name, record);
            }
            if parsed.next.is_none() {
                return Ok(());
            }
            state.page += 1;
        }
    }

    async fn fetch_page(&self, filter: &str, page: u32) -> Result<String, NotifyError> {
        debug!(page, "Requesting page");
        let fetch_failed = |status: Option<u16>, message: String| NotifyError::PullRequestFetch {
            page,
            status,
            message,
        };

        let response = self
            .http
            .get(&self.url)
            .bearer_auth(self.oauth.access_token().expose_secret())
            .query(&[("q", filter.to_string()), ("page", page.to_string())])
            .send()
            .await
            .map_err(|e| fetch_failed(None, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| fetch_failed(Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(fetch_failed(Some(status.as_u16()), body));
        }
        Ok(body)
    }
}

fn lock(cursor: &Mutex<Cursor>) -> MutexGuard<'_, Cursor> {
    cursor.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLinker;

    impl TicketLinker for FakeLinker {
        fn ticket_url(&self, ticket_id: &str) -> Option<String> {
            Some(format!("https://foo.atlassian.net/browse/{ticket_id}"))
        }
    }

    fn raw(title: &str, branch: &str) -> RawPullRequest {
        RawPullRequest {
            title: title.to_string(),
            destination_branch_name: branch.to_string(),
            html_link: "https://bitbucket.org/team/project/pull-requests/1".to_string(),
            author_display_name: "Jane Doe".to_string(),
            author_profile_link: "https://bitbucket.org/jane".to_string(),
        }
    }

    fn record(title: &str) -> SerializedPullRequest {
        serialize_pull_request(&raw(title, "develop"), &FetchOptions::new().unwrap())
    }

    #[test]
    fn test_parse_wire_page() {
        let page: PullRequestPage = serde_json::from_str(
            r#"{
                "values": [{
                    "title": "FOO-1 Fix",
                    "destination": {"branch": {"name": "develop"}},
                    "links": {"html": {"href": "https://bitbucket.org/pr/1"}},
                    "author": {"display_name": "Jane", "links": {"html": {"href": "https://bitbucket.org/jane"}}}
                }],
                "next": "https://api.bitbucket.org/2.0/...&page=2"
            }"#,
        )
        .unwrap();

        assert!(page.next.is_some());
        let pr = &page.values[0];
        assert_eq!(pr.destination_branch_name, "develop");
        assert_eq!(pr.html_link, "https://bitbucket.org/pr/1");
        assert_eq!(pr.author_display_name, "Jane");
        assert_eq!(pr.author_profile_link, "https://bitbucket.org/jane");
    }

    #[test]
    fn test_ticket_id_extracted_from_title() {
        let serialized = record("FOO-666-Fix-bug");
        assert_eq!(serialized.ticket_id.as_deref(), Some("FOO-666"));
        assert_eq!(serialized.ticket_url, "#");
    }

    #[test]
    fn test_title_without_ticket_id() {
        let serialized = record("Fix-bug-no-id");
        assert!(serialized.ticket_id.is_none());
        assert_eq!(serialized.ticket_url, "#");
    }

    #[test]
    fn test_ticket_url_when_linking_enabled() {
        let options = FetchOptions::new()
            .unwrap()
            .with_ticket_links(Arc::new(FakeLinker));
        let serialized = serialize_pull_request(&raw("FOO-666-Fix-bug", "develop"), &options);
        assert_eq!(
            serialized.ticket_url,
            "https://foo.atlassian.net/browse/FOO-666"
        );
    }

    #[test]
    fn test_linking_without_ticket_id() {
        let options = FetchOptions::new()
            .unwrap()
            .with_ticket_links(Arc::new(FakeLinker));
        let serialized = serialize_pull_request(&raw("Fix-bug-no-id", "develop"), &options);
        assert_eq!(serialized.ticket_url, "#");
    }

    #[test]
    fn test_custom_pattern() {
        let options = FetchOptions::with_pattern("#[0-9]+").unwrap();
        let serialized = serialize_pull_request(&raw("Fix #42 and FOO-1", "main"), &options);
        assert_eq!(serialized.ticket_id.as_deref(), Some("#42"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            FetchOptions::with_pattern("[unclosed"),
            Err(NotifyError::InvalidTicketPattern(_))
        ));
    }

    #[test]
    fn test_grouping_keeps_first_seen_order_and_duplicates() {
        let mut grouped = GroupedPullRequests::new();
        grouped.push("develop", record("FOO-1 a"));
        grouped.push("master", record("FOO-2 b"));
        grouped.push("develop", record("FOO-1 a"));

        assert_eq!(grouped.branches().collect::<Vec<_>>(), ["develop", "master"]);
        assert_eq!(grouped.get("develop").unwrap().len(), 2);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped.ticket_ids(), ["FOO-1", "FOO-2"]);
    }

    #[test]
    fn test_grouped_serializes_as_ordered_object() {
        let mut grouped = GroupedPullRequests::new();
        grouped.push("zeta", record("FOO-1 a"));
        grouped.push("alpha", record("Fix-bug-no-id"));

        let json = serde_json::to_string(&grouped).unwrap();

        assert!(json.find("\"zeta\"").unwrap() < json.find("\"alpha\"").unwrap());
        assert!(json.contains("\"ticketId\":null"));
        assert!(json.contains("\"pullRequestUrl\""));
        assert!(json.contains("\"displayName\":\"Jane Doe\""));
    }
}
