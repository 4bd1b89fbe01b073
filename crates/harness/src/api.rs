//! Direct HTTP client for the Conduit backend
//!
//! Setup and teardown go straight to the API, bypassing the UI, so tests do
//! not pay UI latency for preconditions. Every call here mutates remote
//! state and none of them retry: a failed setup call surfaces as a failed
//! precondition, never a silent no-op.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::ArticleFixture;

/// An authenticated user as returned in the `{user: {...}}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: User,
}

/// An article as returned in the `{article: {...}}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(rename = "tagList", default)]
    pub tag_list: Vec<String>,
    #[serde(default)]
    pub favorited: bool,
    #[serde(rename = "favoritesCount", default)]
    pub favorites_count: u64,
}

#[derive(Debug, Deserialize)]
struct ArticleEnvelope {
    article: Article,
}

/// A page of articles from `GET /articles`
#[derive(Debug, Clone, Deserialize)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    #[serde(rename = "articlesCount")]
    pub articles_count: usize,
}

/// A comment as returned in the `{comment: {...}}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct CommentEnvelope {
    comment: Comment,
}

#[derive(Debug, Deserialize)]
struct CommentsEnvelope {
    comments: Vec<Comment>,
}

/// Another user's public profile, as seen by the requesting user
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub following: bool,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    profile: Profile,
}

#[derive(Debug, Deserialize)]
struct TagsEnvelope {
    tags: Vec<String>,
}

/// Filters accepted by `GET /articles`
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ArticleQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(tag) = &self.tag {
            params.push(("tag", tag.clone()));
        }
        if let Some(author) = &self.author {
            params.push(("author", author.clone()));
        }
        if let Some(favorited) = &self.favorited {
            params.push(("favorited", favorited.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        params
    }
}

/// Outcome of an idempotent-setup registration call.
///
/// A duplicate email is an expected precondition state, not a failure, so it
/// gets its own variant instead of being silently swallowed.
#[derive(Debug, Clone)]
pub enum SetupOutcome {
    Created { token: String },
    AlreadyExists,
    Failed(String),
}

/// Outcome of a login call. Non-2xx is a value, not an error, so scenarios
/// can assert on failure paths.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub status: u16,
    pub token: Option<String>,
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.token.is_some()
    }
}

/// Thin client over the Conduit HTTP API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
}

impl ApiClient {
    pub fn new(config: &HarnessConfig) -> HarnessResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.default_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_header(token: &str) -> String {
        format!("Token {token}")
    }

    /// Poll `GET /tags` until the backend answers, within `timeout`.
    ///
    /// Connection refused is expected while the app is still booting.
    pub async fn wait_until_ready(&self, timeout: Duration) -> HarnessResult<()> {
        let start = Instant::now();
        let mut attempts = 0usize;

        while start.elapsed() < timeout {
            attempts += 1;
            match self.http.get(self.url("/tags")).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Backend ready after {} attempt(s)", attempts);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Readiness probe returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for backend at {}...", self.base_url);
                    }
                    if !e.is_connect() {
                        warn!("Readiness probe error: {}", e);
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(HarnessError::Timeout(format!(
            "backend at {} after {} attempt(s)",
            self.base_url, attempts
        )))
    }

    /// `POST /users` — create an account. Duplicate emails are tolerated.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> HarnessResult<SetupOutcome> {
        let body = json!({
            "user": { "email": email, "username": username, "password": password }
        });

        let resp = self.http.post(self.url("/users")).json(&body).send().await?;
        let status = resp.status();
        if status.is_success() {
            let token = resp.json::<UserEnvelope>().await.ok().map(|e| e.user.token);
            return Ok(register_outcome(status, token, ""));
        }

        let body = resp.text().await.unwrap_or_default();
        Ok(register_outcome(status, None, &body))
    }

    /// `POST /users/login` — authenticate. Never raises on non-2xx.
    pub async fn login(&self, email: &str, password: &str) -> HarnessResult<LoginOutcome> {
        let body = json!({ "user": { "email": email, "password": password } });

        let resp = self
            .http
            .post(self.url("/users/login"))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let token = if resp.status().is_success() {
            resp.json::<UserEnvelope>().await.ok().map(|e| e.user.token)
        } else {
            None
        };

        debug!("Login {} -> {}", email, status);
        Ok(LoginOutcome { status, token })
    }

    /// `POST /articles` — requires a bearer token.
    ///
    /// Backends in the wild answer either 200 or 201 on success; both are
    /// accepted.
    pub async fn create_article(
        &self,
        token: &str,
        title: &str,
        description: &str,
        body: &str,
        tags: &[String],
    ) -> HarnessResult<Article> {
        let payload = json!({
            "article": {
                "title": title,
                "description": description,
                "body": body,
                "tagList": tags,
            }
        });

        let resp = self
            .http
            .post(self.url("/articles"))
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(token))
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: "POST /articles".to_string(),
            });
        }

        let envelope: ArticleEnvelope = resp.json().await?;
        info!("Created article {}", envelope.article.slug);
        Ok(envelope.article)
    }

    /// Create an article from a fixture, perturbing the title for slug
    /// uniqueness.
    pub async fn create_from_fixture(
        &self,
        token: &str,
        fixture: &ArticleFixture,
    ) -> HarnessResult<Article> {
        self.create_article(
            token,
            &fixture.unique_title(),
            &fixture.description,
            &fixture.body,
            &fixture.tag_list,
        )
        .await
    }

    /// `GET /articles/{slug}`
    pub async fn get_article(&self, slug: &str) -> HarnessResult<Article> {
        let resp = self
            .http
            .get(self.url(&format!("/articles/{slug}")))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!("GET /articles/{slug}"),
            });
        }

        let envelope: ArticleEnvelope = resp.json().await?;
        Ok(envelope.article)
    }

    /// `GET /articles?limit=&offset=`
    pub async fn list_articles(&self, limit: usize, offset: usize) -> HarnessResult<ArticlePage> {
        self.list_articles_where(&ArticleQuery {
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        })
        .await
    }

    /// `GET /articles` filtered by tag, author, or favoriting user
    pub async fn list_articles_where(&self, query: &ArticleQuery) -> HarnessResult<ArticlePage> {
        let resp = self
            .http
            .get(self.url("/articles"))
            .query(&query.params())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: "GET /articles".to_string(),
            });
        }

        Ok(resp.json().await?)
    }

    /// `GET /tags` — the popular-tags sidebar source
    pub async fn list_tags(&self) -> HarnessResult<Vec<String>> {
        let resp = self.http.get(self.url("/tags")).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: "GET /tags".to_string(),
            });
        }

        let envelope: TagsEnvelope = resp.json().await?;
        Ok(envelope.tags)
    }

    /// `GET /profiles/{username}` — `following` is only meaningful with a
    /// token.
    pub async fn get_profile(&self, token: Option<&str>, username: &str) -> HarnessResult<Profile> {
        let mut request = self.http.get(self.url(&format!("/profiles/{username}")));
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, Self::auth_header(token));
        }
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!("GET /profiles/{username}"),
            });
        }

        let envelope: ProfileEnvelope = resp.json().await?;
        Ok(envelope.profile)
    }

    /// `POST /profiles/{username}/follow`
    pub async fn follow(&self, token: &str, username: &str) -> HarnessResult<Profile> {
        self.follow_request(token, username, true).await
    }

    /// `DELETE /profiles/{username}/follow`
    pub async fn unfollow(&self, token: &str, username: &str) -> HarnessResult<Profile> {
        self.follow_request(token, username, false).await
    }

    async fn follow_request(
        &self,
        token: &str,
        username: &str,
        follow: bool,
    ) -> HarnessResult<Profile> {
        let url = self.url(&format!("/profiles/{username}/follow"));
        let request = if follow {
            self.http.post(&url)
        } else {
            self.http.delete(&url)
        };

        let resp = request
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!(
                    "{} /profiles/{username}/follow",
                    if follow { "POST" } else { "DELETE" }
                ),
            });
        }

        let envelope: ProfileEnvelope = resp.json().await?;
        Ok(envelope.profile)
    }

    /// `POST /articles/{slug}/favorite`
    pub async fn favorite(&self, token: &str, slug: &str) -> HarnessResult<Article> {
        self.favorite_request(token, slug, true).await
    }

    /// `DELETE /articles/{slug}/favorite`
    pub async fn unfavorite(&self, token: &str, slug: &str) -> HarnessResult<Article> {
        self.favorite_request(token, slug, false).await
    }

    async fn favorite_request(
        &self,
        token: &str,
        slug: &str,
        favorite: bool,
    ) -> HarnessResult<Article> {
        let url = self.url(&format!("/articles/{slug}/favorite"));
        let request = if favorite {
            self.http.post(&url)
        } else {
            self.http.delete(&url)
        };

        let resp = request
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!(
                    "{} /articles/{slug}/favorite",
                    if favorite { "POST" } else { "DELETE" }
                ),
            });
        }

        let envelope: ArticleEnvelope = resp.json().await?;
        Ok(envelope.article)
    }

    /// `DELETE /articles/{slug}` — best-effort teardown.
    ///
    /// Cleanup must never abort a test run, so failures are logged and
    /// suppressed.
    pub async fn delete_article(&self, token: &str, slug: &str) {
        let result = self
            .http
            .delete(self.url(&format!("/articles/{slug}")))
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(token))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!("Deleted article {}", slug);
            }
            Ok(resp) => {
                warn!("Cleanup of article {} returned {}", slug, resp.status());
            }
            Err(e) => {
                warn!("Cleanup of article {} failed: {}", slug, e);
            }
        }
    }

    /// `POST /articles/{slug}/comments`
    pub async fn create_comment(
        &self,
        token: &str,
        slug: &str,
        body: &str,
    ) -> HarnessResult<Comment> {
        let payload = json!({ "comment": { "body": body } });

        let resp = self
            .http
            .post(self.url(&format!("/articles/{slug}/comments")))
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(token))
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!("POST /articles/{slug}/comments"),
            });
        }

        let envelope: CommentEnvelope = resp.json().await?;
        Ok(envelope.comment)
    }

    /// `GET /articles/{slug}/comments`
    pub async fn list_comments(&self, slug: &str) -> HarnessResult<Vec<Comment>> {
        let resp = self
            .http
            .get(self.url(&format!("/articles/{slug}/comments")))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!("GET /articles/{slug}/comments"),
            });
        }

        let envelope: CommentsEnvelope = resp.json().await?;
        Ok(envelope.comments)
    }

    /// `DELETE /articles/{slug}/comments/{id}` — strict, used by
    /// comment-ownership scenarios where a rejection is the expected result.
    pub async fn delete_comment(&self, token: &str, slug: &str, id: u64) -> HarnessResult<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/articles/{slug}/comments/{id}")))
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!("DELETE /articles/{slug}/comments/{id}"),
            });
        }

        Ok(())
    }
}

fn register_outcome(status: StatusCode, token: Option<String>, body: &str) -> SetupOutcome {
    if status.is_success() {
        return match token {
            Some(token) => SetupOutcome::Created { token },
            None => SetupOutcome::Failed("2xx response without a token".to_string()),
        };
    }

    // 422 covers every validation error, not just duplicates; only a
    // duplicate-email body counts as "already exists".
    if status == StatusCode::CONFLICT
        || (status == StatusCode::UNPROCESSABLE_ENTITY && body_reports_duplicate(body))
    {
        SetupOutcome::AlreadyExists
    } else {
        SetupOutcome::Failed(format!("registration returned {status}: {body}"))
    }
}

/// Conduit backends phrase the duplicate error as
/// `{"errors":{"email":["has already been taken"]}}` or close variants.
fn body_reports_duplicate(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("taken") || lower.contains("already") || lower.contains("duplicate")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_outcome_maps_duplicates() {
        let duplicate = r#"{"errors":{"email":["has already been taken"]}}"#;
        assert!(matches!(
            register_outcome(StatusCode::UNPROCESSABLE_ENTITY, None, duplicate),
            SetupOutcome::AlreadyExists
        ));
        assert!(matches!(
            register_outcome(StatusCode::CONFLICT, None, ""),
            SetupOutcome::AlreadyExists
        ));
    }

    #[test]
    fn register_outcome_keeps_validation_errors_as_failures() {
        // A 422 for a malformed payload is a real failure, not a duplicate.
        let invalid = r#"{"errors":{"password":["is too short (minimum is 8 characters)"]}}"#;
        match register_outcome(StatusCode::UNPROCESSABLE_ENTITY, None, invalid) {
            SetupOutcome::Failed(reason) => assert!(reason.contains("too short"), "{reason}"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn register_outcome_maps_created() {
        let outcome = register_outcome(StatusCode::CREATED, Some("jwt".to_string()), "");
        match outcome {
            SetupOutcome::Created { token } => assert_eq!(token, "jwt"),
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[test]
    fn register_outcome_maps_server_error() {
        assert!(matches!(
            register_outcome(StatusCode::INTERNAL_SERVER_ERROR, None, "boom"),
            SetupOutcome::Failed(_)
        ));
    }

    #[test]
    fn login_outcome_success_requires_token() {
        let with_token = LoginOutcome { status: 200, token: Some("jwt".to_string()) };
        assert!(with_token.is_success());

        let no_token = LoginOutcome { status: 200, token: None };
        assert!(!no_token.is_success());

        let unauthorized = LoginOutcome { status: 401, token: None };
        assert!(!unauthorized.is_success());
    }

    #[test]
    fn article_envelope_parses_wire_shape() {
        let json = r#"{
            "article": {
                "slug": "sample-article-1700000000000",
                "title": "Sample Article 1700000000000",
                "description": "A sample article for testing",
                "body": "Body text",
                "tagList": ["testing", "sample"]
            }
        }"#;
        let envelope: ArticleEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.article.tag_list.len(), 2);
        assert!(envelope.article.slug.starts_with("sample-article"));
    }

    #[test]
    fn article_page_parses_count() {
        let json = r#"{ "articles": [], "articlesCount": 42 }"#;
        let page: ArticlePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.articles_count, 42);
    }

    #[test]
    fn profile_envelope_parses_following_flag() {
        let json = r#"{
            "profile": {
                "username": "seconduser",
                "bio": null,
                "image": "",
                "following": true
            }
        }"#;
        let envelope: ProfileEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.profile.username, "seconduser");
        assert!(envelope.profile.following);
    }

    #[test]
    fn tags_envelope_parses() {
        let json = r#"{ "tags": ["welcome", "implementations"] }"#;
        let envelope: TagsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.tags.len(), 2);
    }

    #[test]
    fn article_query_emits_only_set_filters() {
        let query = ArticleQuery {
            tag: Some("profile".to_string()),
            favorited: Some("testuser".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        let params = query.params();
        assert_eq!(
            params,
            vec![
                ("tag", "profile".to_string()),
                ("favorited", "testuser".to_string()),
                ("limit", "10".to_string()),
            ]
        );
        assert!(ArticleQuery::default().params().is_empty());
    }

    #[test]
    fn article_favorite_fields_default_when_absent() {
        let json = r#"{
            "article": {
                "slug": "s",
                "title": "t",
                "description": "d",
                "body": "b"
            }
        }"#;
        let envelope: ArticleEnvelope = serde_json::from_str(json).unwrap();
        assert!(!envelope.article.favorited);
        assert_eq!(envelope.article.favorites_count, 0);
    }
}
