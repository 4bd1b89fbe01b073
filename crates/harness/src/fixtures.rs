//! Named, immutable test data
//!
//! Fixtures are pure data: the provider has no side effects and every record
//! is cloned out, never mutated in place. Records ship with the harness
//! (`builtin`) and can be extended or overridden from YAML files on disk.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

/// A test actor's credentials
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Input for an article-creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFixture {
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(default, rename = "tagList")]
    pub tag_list: Vec<String>,
}

impl ArticleFixture {
    /// Perturb the title so repeated runs never collide on slug.
    ///
    /// The backend derives the slug from the title, so two concurrent
    /// creations with the same title would race; a millisecond timestamp
    /// plus a short random suffix keeps titles unique.
    pub fn unique_title(&self) -> String {
        let ts = chrono::Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{} {} {}", self.title, ts, &suffix[..8])
    }
}

/// A named fixture record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fixture {
    User(Credential),
    Article(ArticleFixture),
}

/// Registry of fixtures keyed by logical name
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    records: HashMap<String, Fixture>,
}

impl FixtureProvider {
    /// Empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider seeded with the records every suite relies on
    pub fn builtin() -> Self {
        let mut provider = Self::new();

        provider.insert(
            "existingUser",
            Fixture::User(Credential {
                email: "user@example.com".to_string(),
                username: "testuser".to_string(),
                password: "Secret123!".to_string(),
            }),
        );
        provider.insert(
            "secondaryUser",
            Fixture::User(Credential {
                email: "second@example.com".to_string(),
                username: "seconduser".to_string(),
                password: "Secret123!".to_string(),
            }),
        );
        provider.insert(
            "perfUser",
            Fixture::User(Credential {
                email: "perf-test1@example.com".to_string(),
                username: "perftest1".to_string(),
                password: "PerfTest1234!".to_string(),
            }),
        );
        provider.insert(
            "sampleArticle",
            Fixture::Article(ArticleFixture {
                title: "Sample Article".to_string(),
                description: "A sample article for testing".to_string(),
                body: "This article exists purely to exercise the editor and feed.".to_string(),
                tag_list: vec!["testing".to_string(), "sample".to_string()],
            }),
        );
        provider.insert(
            "commentArticle",
            Fixture::Article(ArticleFixture {
                title: "Article with Comments".to_string(),
                description: "Testing comments".to_string(),
                body: "Comment testing article".to_string(),
                tag_list: vec!["comments".to_string()],
            }),
        );

        provider
    }

    /// Insert or replace a record
    pub fn insert(&mut self, name: &str, fixture: Fixture) {
        self.records.insert(name.to_string(), fixture);
    }

    /// Merge every `.yaml`/`.yml` file under `dir` into this provider.
    ///
    /// Each file holds a map of name -> record; later files override
    /// earlier names, and on-disk records override builtins.
    pub fn load_dir(&mut self, dir: &Path) -> HarnessResult<usize> {
        let mut loaded = 0;

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let content = std::fs::read_to_string(entry.path())?;
            let records: HashMap<String, Fixture> = serde_yaml::from_str(&content)?;
            debug!("Loaded {} fixture(s) from {}", records.len(), entry.path().display());
            loaded += records.len();
            self.records.extend(records);
        }

        Ok(loaded)
    }

    /// Look up a record by logical name
    pub fn load(&self, name: &str) -> HarnessResult<Fixture> {
        self.records
            .get(name)
            .cloned()
            .ok_or_else(|| HarnessError::FixtureNotFound(name.to_string()))
    }

    /// Look up a user record, failing if the name is missing or not a user
    pub fn user(&self, name: &str) -> HarnessResult<Credential> {
        match self.load(name)? {
            Fixture::User(credential) => Ok(credential),
            Fixture::Article(_) => Err(HarnessError::FixtureNotFound(format!(
                "{name} is an article fixture, not a user"
            ))),
        }
    }

    /// Look up an article record
    pub fn article(&self, name: &str) -> HarnessResult<ArticleFixture> {
        match self.load(name)? {
            Fixture::Article(article) => Ok(article),
            Fixture::User(_) => Err(HarnessError::FixtureNotFound(format!(
                "{name} is a user fixture, not an article"
            ))),
        }
    }

    /// Names of all registered fixtures, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_existing_user() {
        let fixtures = FixtureProvider::builtin();
        let user = fixtures.user("existingUser").unwrap();
        assert_eq!(user.email, "user@example.com");
        assert_eq!(user.password, "Secret123!");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let fixtures = FixtureProvider::builtin();
        let err = fixtures.load("nope").unwrap_err();
        assert!(matches!(err, HarnessError::FixtureNotFound(_)));
    }

    #[test]
    fn wrong_kind_is_not_found() {
        let fixtures = FixtureProvider::builtin();
        assert!(fixtures.user("sampleArticle").is_err());
        assert!(fixtures.article("existingUser").is_err());
    }

    #[test]
    fn unique_titles_do_not_collide() {
        let fixtures = FixtureProvider::builtin();
        let article = fixtures.article("sampleArticle").unwrap();
        let a = article.unique_title();
        let b = article.unique_title();
        assert_ne!(a, b);
        assert!(a.starts_with("Sample Article"));
    }

    #[test]
    fn load_dir_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = r#"
existingUser:
  kind: user
  email: override@example.com
  username: override
  password: Override1!
extraArticle:
  kind: article
  title: Extra
  description: From disk
  body: Loaded from a fixture file
  tagList: [extra]
"#;
        std::fs::write(dir.path().join("users.yaml"), yaml).unwrap();

        let mut fixtures = FixtureProvider::builtin();
        let loaded = fixtures.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(fixtures.user("existingUser").unwrap().email, "override@example.com");
        assert_eq!(fixtures.article("extraArticle").unwrap().title, "Extra");
    }
}
