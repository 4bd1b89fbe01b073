//! API contract tests against a live Conduit backend.
//!
//! Ignored by default; run with a deployment up:
//! `CONDUIT_API_URL=http://localhost:8081/api cargo test -p conduit-harness --test live_api -- --ignored`

use std::time::Duration;

use conduit_harness::{HarnessConfig, HarnessError, RunContext, SetupOutcome};

fn context() -> RunContext {
    RunContext::new(HarnessConfig::from_env()).expect("client construction")
}

async fn ready(ctx: &RunContext) {
    ctx.api
        .wait_until_ready(Duration::from_secs(30))
        .await
        .expect("backend not reachable");
}

#[tokio::test]
#[ignore]
async fn article_round_trips_by_slug() {
    let ctx = context();
    ready(&ctx).await;

    let session = ctx.session_for("existingUser").await.unwrap();
    let fixture = ctx.fixtures.article("sampleArticle").unwrap();

    let created = ctx.api.create_from_fixture(&session.token, &fixture).await.unwrap();
    let fetched = ctx.api.get_article(&created.slug).await.unwrap();

    assert_eq!(fetched.title, created.title);
    assert_eq!(fetched.description, fixture.description);
    assert_eq!(fetched.body, fixture.body);
    assert_eq!(fetched.tag_list, fixture.tag_list);

    ctx.api.delete_article(&session.token, &created.slug).await;
}

#[tokio::test]
#[ignore]
async fn register_twice_keeps_first_account_valid() {
    let ctx = context();
    ready(&ctx).await;

    let user = ctx.fixtures.user("existingUser").unwrap();

    // First call either creates the account or finds it already present.
    let first = ctx
        .api
        .register(&user.email, &user.username, &user.password)
        .await
        .unwrap();
    assert!(matches!(
        first,
        SetupOutcome::Created { .. } | SetupOutcome::AlreadyExists
    ));

    // Second call with the same email must not create a second account.
    let second = ctx
        .api
        .register(&user.email, &user.username, &user.password)
        .await
        .unwrap();
    assert!(matches!(second, SetupOutcome::AlreadyExists));

    // The original credentials still log in.
    let login = ctx.api.login(&user.email, &user.password).await.unwrap();
    assert!(login.is_success());
}

#[tokio::test]
#[ignore]
async fn cached_session_creates_articles() {
    let ctx = context();
    ready(&ctx).await;

    let session = ctx.session_for("existingUser").await.unwrap();
    let again = ctx.session_for("existingUser").await.unwrap();
    assert_eq!(session.token, again.token);

    let fixture = ctx.fixtures.article("sampleArticle").unwrap();
    let article = ctx.api.create_from_fixture(&session.token, &fixture).await.unwrap();
    assert!(!article.slug.is_empty());

    ctx.api.delete_article(&session.token, &article.slug).await;
}

#[tokio::test]
#[ignore]
async fn follow_and_favorite_round_trip() {
    let ctx = context();
    ready(&ctx).await;

    let author = ctx.session_for("existingUser").await.unwrap();
    let follower = ctx.session_for("secondaryUser").await.unwrap();
    let author_name = &author.credential.username;

    // Follow toggles the profile flag both ways.
    let followed = ctx.api.follow(&follower.token, author_name).await.unwrap();
    assert!(followed.following);
    let unfollowed = ctx.api.unfollow(&follower.token, author_name).await.unwrap();
    assert!(!unfollowed.following);

    // Favoriting bumps the count and shows up in the favorited filter.
    let fixture = ctx.fixtures.article("sampleArticle").unwrap();
    let article = ctx.api.create_from_fixture(&author.token, &fixture).await.unwrap();

    let favorited = ctx.api.favorite(&follower.token, &article.slug).await.unwrap();
    assert!(favorited.favorited);
    assert_eq!(favorited.favorites_count, 1);

    let page = ctx
        .api
        .list_articles_where(&conduit_harness::ArticleQuery {
            favorited: Some(follower.credential.username.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(page.articles.iter().any(|a| a.slug == article.slug));

    let unfavorited = ctx.api.unfavorite(&follower.token, &article.slug).await.unwrap();
    assert!(!unfavorited.favorited);

    ctx.api.delete_article(&author.token, &article.slug).await;
}

#[tokio::test]
#[ignore]
async fn tag_filter_narrows_the_global_feed() {
    let ctx = context();
    ready(&ctx).await;

    let session = ctx.session_for("existingUser").await.unwrap();
    let fixture = ctx.fixtures.article("sampleArticle").unwrap();
    let article = ctx.api.create_from_fixture(&session.token, &fixture).await.unwrap();

    let tags = ctx.api.list_tags().await.unwrap();
    assert!(tags.iter().any(|t| t == "testing"));

    let page = ctx
        .api
        .list_articles_where(&conduit_harness::ArticleQuery {
            tag: Some("testing".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(page.articles.iter().all(|a| a.tag_list.contains(&"testing".to_string())));
    assert!(page.articles.iter().any(|a| a.slug == article.slug));

    ctx.api.delete_article(&session.token, &article.slug).await;
}

#[tokio::test]
#[ignore]
async fn deleting_anothers_comment_is_rejected() {
    let ctx = context();
    ready(&ctx).await;

    let author = ctx.session_for("existingUser").await.unwrap();
    let other = ctx.session_for("secondaryUser").await.unwrap();

    let fixture = ctx.fixtures.article("commentArticle").unwrap();
    let article = ctx.api.create_from_fixture(&author.token, &fixture).await.unwrap();
    let comment = ctx
        .api
        .create_comment(&author.token, &article.slug, "mine to delete")
        .await
        .unwrap();

    // The other user must not be able to remove it.
    let denied = ctx
        .api
        .delete_comment(&other.token, &article.slug, comment.id)
        .await;
    assert!(matches!(
        denied,
        Err(HarnessError::UnexpectedStatus { status, .. }) if status == 401 || status == 403
    ));

    // The author still can.
    ctx.api
        .delete_comment(&author.token, &article.slug, comment.id)
        .await
        .unwrap();
    let remaining = ctx.api.list_comments(&article.slug).await.unwrap();
    assert!(remaining.iter().all(|c| c.id != comment.id));

    ctx.api.delete_article(&author.token, &article.slug).await;
}
