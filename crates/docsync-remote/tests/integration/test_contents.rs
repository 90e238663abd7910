//! Contents and tree endpoints
//!
//! Verifies file reads, listings, writes and deletes of the GitHub adapter
//! against mocked `/repos/{owner}/{repo}/contents` and `/git/trees` routes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use docsync_core::{
    domain::TreeRef,
    ports::IRemoteApi,
};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_get_file_decodes_content() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_file(&server, "wiki/a.tid", "title: A\n\nbody", "sha-a").await;

    let file = api
        .get_file(
            &common::token_credentials(),
            &common::repo(),
            &TreeRef::Branch("main".into()),
            "wiki/a.tid",
        )
        .await
        .unwrap();

    assert_eq!(file.content, "title: A\n\nbody");
    assert_eq!(file.sha.as_deref(), Some("sha-a"));
}

#[tokio::test]
async fn test_get_file_sends_branch_ref() {
    let (server, api) = common::setup_github_mock().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/wiki/contents/a.tid"))
        .and(query_param("ref", "drafts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "file", "name": "a.tid", "path": "a.tid", "sha": "1",
            "encoding": "base64", "content": BASE64.encode("draft")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = api
        .get_file(
            &common::token_credentials(),
            &common::repo(),
            &TreeRef::Branch("drafts".into()),
            "a.tid",
        )
        .await
        .unwrap();
    assert_eq!(file.content, "draft");
}

#[tokio::test]
async fn test_get_missing_file_is_404() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_missing(&server, "wiki/none.tid").await;

    let err = api
        .get_file(
            &common::token_credentials(),
            &common::repo(),
            &TreeRef::Branch("main".into()),
            "wiki/none.tid",
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_directory_on_branch() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_directory(
        &server,
        "wiki",
        serde_json::json!([
            {"name": "a.tid", "path": "wiki/a.tid", "sha": "1", "type": "file"},
            {"name": "sub", "path": "wiki/sub", "sha": "tree-sub", "type": "dir"}
        ]),
    )
    .await;

    let nodes = api
        .list_tree(
            &common::token_credentials(),
            &common::repo(),
            &TreeRef::Branch("main".into()),
            "wiki",
        )
        .await
        .unwrap();

    assert_eq!(nodes.len(), 2);
    assert!(nodes[0].is_file());
    assert_eq!(nodes[1].path, "wiki/sub");
    assert!(nodes[1].is_directory());
    assert_eq!(nodes[1].sha.as_deref(), Some("tree-sub"));
}

#[tokio::test]
async fn test_list_tree_by_sha() {
    let (server, api) = common::setup_github_mock().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/wiki/git/trees/tree-sub"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "tree-sub",
            "truncated": false,
            "tree": [
                {"path": "d.tid", "mode": "100644", "type": "blob", "sha": "4"},
                {"path": "deeper", "mode": "040000", "type": "tree", "sha": "5"},
                {"path": "vendor", "mode": "160000", "type": "commit", "sha": "6"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let nodes = api
        .list_tree(
            &common::token_credentials(),
            &common::repo(),
            &TreeRef::Sha("tree-sub".into()),
            "wiki/sub",
        )
        .await
        .unwrap();

    let paths: Vec<_> = nodes.iter().map(|n| n.path.as_str()).collect();
    assert_eq!(paths, vec!["wiki/sub/d.tid", "wiki/sub/deeper"]);
    assert!(nodes[1].is_directory());
}

#[tokio::test]
async fn test_put_new_file() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_missing(&server, "wiki/new.tid").await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/wiki/contents/wiki/new.tid"))
        .and(body_partial_json(serde_json::json!({
            "message": "Create new",
            "branch": "main",
            "content": BASE64.encode("title: New"),
            "committer": {"name": "docsync", "email": "no-reply@github.com"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "content": {"name": "new.tid", "path": "wiki/new.tid", "sha": "sha-new"},
            "commit": {"sha": "commit-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = api
        .put_file(
            &common::token_credentials(),
            &common::repo(),
            "main",
            "wiki/new.tid",
            "title: New",
            "Create new",
            &common::committer(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.content_sha, "sha-new");
}

#[tokio::test]
async fn test_put_existing_file_sends_current_sha() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_file(&server, "wiki/a.tid", "title: A", "sha-old").await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/wiki/contents/wiki/a.tid"))
        .and(body_partial_json(serde_json::json!({"sha": "sha-old"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": {"sha": "sha-updated"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = api
        .put_file(
            &common::token_credentials(),
            &common::repo(),
            "main",
            "wiki/a.tid",
            "title: A\n\nchanged",
            "Update a",
            &common::committer(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.content_sha, "sha-updated");
}

#[tokio::test]
async fn test_put_identical_content_is_conflict_without_put() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_file(&server, "wiki/a.tid", "title: A", "sha-a").await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = api
        .put_file(
            &common::token_credentials(),
            &common::repo(),
            "main",
            "wiki/a.tid",
            "title: A",
            "Update a",
            &common::committer(),
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_delete_file_sends_sha() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_file(&server, "wiki/a.tid", "title: A", "sha-a").await;
    Mock::given(method("DELETE"))
        .and(path("/repos/octo/wiki/contents/wiki/a.tid"))
        .and(body_partial_json(serde_json::json!({
            "sha": "sha-a",
            "branch": "main",
            "message": "Delete a"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": null,
            "commit": {"sha": "commit-2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    api.delete_file(
        &common::token_credentials(),
        &common::repo(),
        "main",
        "wiki/a.tid",
        "Delete a",
        &common::committer(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_delete_missing_file_is_404_without_delete() {
    let (server, api) = common::setup_github_mock().await;
    common::mount_missing(&server, "wiki/gone.tid").await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = api
        .delete_file(
            &common::token_credentials(),
            &common::repo(),
            "main",
            "wiki/gone.tid",
            "Delete gone",
            &common::committer(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
