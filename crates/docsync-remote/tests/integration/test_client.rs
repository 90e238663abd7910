//! Paced client and tree over the GitHub adapter
//!
//! Verifies that the client folds remote statuses into its own outcomes and
//! that the tree reads documents through the HTTP adapter.

use docsync_core::domain::{Credentials, TreeRef};
use docsync_remote::{client::WriteOutcome, ClientError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_sign_in_sets_user() {
    let (_server, api) = common::setup_github_mock().await;
    let client = common::paced_client(api, Credentials::anonymous());

    let profile = client
        .sign_in(None, Some(common::TOKEN.into()))
        .await
        .unwrap();

    assert_eq!(profile.login, "octocat");
    assert!(client.is_signed_in());
}

#[tokio::test]
async fn test_sign_in_with_bad_token_is_auth_error() {
    let (_server, api) = common::setup_github_mock().await;
    let client = common::paced_client(api, Credentials::anonymous());

    let err = client
        .sign_in(None, Some("wrong".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Auth(_)));
    assert!(!client.is_signed_in());
}

#[tokio::test]
async fn test_first_request_queries_quota() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rate": {"remaining": 100, "reset": chrono::Utc::now().timestamp()}
        })))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_missing(&server, "a.tid").await;
    common::mount_missing(&server, "b.tid").await;

    let client = common::paced_client(
        docsync_remote::github::GitHubApi::with_base_url(server.uri()),
        common::token_credentials(),
    );
    let main = TreeRef::Branch("main".into());

    assert!(client.get_file(&main, "a.tid").await.unwrap().is_none());
    assert!(client.get_file(&main, "b.tid").await.unwrap().is_none());
    // 100 × 8 minus the two requests
    assert_eq!(client.limiter().remaining(), 798);
}

#[tokio::test]
async fn test_quota_failure_is_rate_limit_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = common::paced_client(
        docsync_remote::github::GitHubApi::with_base_url(server.uri()),
        Credentials::anonymous(),
    );
    let err = client
        .get_file(&TreeRef::Branch("main".into()), "a.tid")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RateLimitQuery(_)));
}

#[tokio::test]
async fn test_write_identical_content_is_unchanged() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_file(&server, "a.tid", "title: A", "sha-a").await;
    let client = common::paced_client(api, common::token_credentials());

    let outcome = client
        .write_file("main", "a.tid", "title: A", "Update a", &common::committer())
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Unchanged);
    assert_eq!(outcome.sha(), None);
}

#[tokio::test]
async fn test_delete_missing_file_is_ok() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_missing(&server, "gone.tid").await;
    let client = common::paced_client(api, common::token_credentials());

    client
        .delete_file("main", "gone.tid", "Delete gone", &common::committer())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_forbidden_write_is_remote_error() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_missing(&server, "a.tid").await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/wiki/contents/a.tid"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "Resource not accessible by integration"
        })))
        .mount(&server)
        .await;
    let client = common::paced_client(api, common::token_credentials());

    let err = client
        .write_file("main", "a.tid", "title: A", "Create a", &common::committer())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Remote { status: 403, .. }));
}

#[tokio::test]
async fn test_tree_reads_file_content() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_file(&server, "wiki/a.tid", "title: A", "sha-a").await;
    let client = common::paced_client(api, common::token_credentials());

    let tree = client.tree("main", "wiki");
    let content = tree.get_file_content("a.tid").await.unwrap();
    assert_eq!(content.as_deref(), Some("title: A"));
    assert_eq!(tree.get_file_content("missing.tid").await.unwrap(), None);
}

#[tokio::test]
async fn test_write_and_delete_charge_the_sha_lookup() {
    let server = MockServer::start().await;
    common::mount_rate_limit(&server, 100, chrono::Utc::now().timestamp()).await;
    common::mount_missing(&server, "new.tid").await;
    common::mount_file(&server, "old.tid", "title: Old", "sha-old").await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/wiki/contents/new.tid"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "content": {"sha": "sha-new"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/repos/octo/wiki/contents/old.tid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "commit": {"sha": "commit-2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::paced_client(
        docsync_remote::github::GitHubApi::with_base_url(server.uri()),
        common::token_credentials(),
    );

    client
        .write_file("main", "new.tid", "title: New", "Create new", &common::committer())
        .await
        .unwrap();
    assert_eq!(client.limiter().remaining(), 798);

    client
        .delete_file("main", "old.tid", "Delete old", &common::committer())
        .await
        .unwrap();
    assert_eq!(client.limiter().remaining(), 796);
}
