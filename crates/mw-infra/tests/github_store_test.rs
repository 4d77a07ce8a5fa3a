//! GitHub content store tests against a mock HTTP server

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mockito::{Matcher, Mock, Server, ServerGuard};
use mw_core::ports::{FileUpdate, RemoteEntryKind, RemoteStoreError, RemoteStorePort};
use mw_core::ImageUpload;
use mw_infra::{GithubContentStore, GithubStoreConfig};
use serde_json::json;

const REPO: &str = "/repos/octo/gallery";

fn store(server: &ServerGuard, max_attempts: u32) -> GithubContentStore {
    GithubContentStore::new(GithubStoreConfig {
        api_base: server.url(),
        raw_host: "raw.githubusercontent.com".to_string(),
        owner: "octo".to_string(),
        repo: "gallery".to_string(),
        branch: "main".to_string(),
        token: "ghp_test".to_string(),
        max_attempts,
        retry_backoff: Duration::from_millis(1),
        request_timeout: Duration::from_secs(5),
    })
    .expect("store should build")
}

async fn contents_get(server: &mut ServerGuard, path: &str, status: usize, body: String) -> Mock {
    server
        .mock("GET", format!("{REPO}/contents/{path}").as_str())
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

fn file_body(path: &str, sha: &str, content: &[u8]) -> String {
    json!({
        "type": "file",
        "path": path,
        "sha": sha,
        "encoding": "base64",
        "content": STANDARD.encode(content)
    })
    .to_string()
}

#[tokio::test]
async fn get_file_decodes_content_and_sends_auth_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", format!("{REPO}/contents/data/entries/1.json").as_str())
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .match_header("authorization", "Bearer ghp_test")
        .match_header("x-github-api-version", "2022-11-28")
        .with_status(200)
        .with_body(file_body("data/entries/1.json", "abc", br#"{"id":"1"}"#))
        .create_async()
        .await;

    let file = store(&server, 3)
        .get_file("data/entries/1.json")
        .await
        .expect("get should succeed")
        .expect("file should exist");

    mock.assert_async().await;
    assert_eq!(file.sha, "abc");
    assert_eq!(file.text().unwrap(), r#"{"id":"1"}"#);
}

#[tokio::test]
async fn get_file_returns_none_when_missing() {
    let mut server = Server::new_async().await;
    contents_get(&mut server, "data/entries/9.json", 404, r#"{"message":"Not Found"}"#.into()).await;

    let file = store(&server, 3).get_file("data/entries/9.json").await.unwrap();
    assert!(file.is_none());
}

#[tokio::test]
async fn get_file_falls_back_to_blob_api_for_large_files() {
    let mut server = Server::new_async().await;
    contents_get(
        &mut server,
        "images/originals/BIG.PNG",
        200,
        json!({ "path": "images/originals/BIG.PNG", "sha": "bigsha", "encoding": "none", "content": "" })
            .to_string(),
    )
    .await;
    let blob = server
        .mock("GET", format!("{REPO}/git/blobs/bigsha").as_str())
        .with_status(200)
        .with_body(json!({ "content": STANDARD.encode(b"big bytes"), "encoding": "base64" }).to_string())
        .create_async()
        .await;

    let file = store(&server, 3)
        .get_file("images/originals/BIG.PNG")
        .await
        .unwrap()
        .unwrap();

    blob.assert_async().await;
    assert_eq!(file.content, b"big bytes");
}

#[tokio::test]
async fn transient_read_failures_are_retried() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", format!("{REPO}/contents/data/entries/1.json").as_str())
        .match_query(Matcher::Any)
        .with_status(502)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", format!("{REPO}/contents/data/entries/1.json").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(file_body("data/entries/1.json", "abc", b"{}"))
        .expect(1)
        .create_async()
        .await;

    let file = store(&server, 3).get_file("data/entries/1.json").await.unwrap();

    failing.assert_async().await;
    ok.assert_async().await;
    assert!(file.is_some());
}

#[tokio::test]
async fn list_directory_maps_entries_and_tolerates_missing_dirs() {
    let mut server = Server::new_async().await;
    contents_get(
        &mut server,
        "data/entries",
        200,
        json!([
            { "name": "1.json", "path": "data/entries/1.json", "type": "file" },
            { "name": "nested", "path": "data/entries/nested", "type": "dir" }
        ])
        .to_string(),
    )
    .await;
    contents_get(&mut server, "images/originals", 404, "{}".into()).await;

    let store = store(&server, 3);
    let listing = store.list_directory("data/entries").await.unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].name, "1.json");
    assert_eq!(listing[0].kind, RemoteEntryKind::File);
    assert_eq!(listing[1].kind, RemoteEntryKind::Dir);

    assert!(store.list_directory("images/originals").await.unwrap().is_empty());
}

#[tokio::test]
async fn put_file_retries_conflict_with_refetched_sha() {
    let mut server = Server::new_async().await;
    let path = "data/entries/3.json";
    let stale = server
        .mock("PUT", format!("{REPO}/contents/{path}").as_str())
        .match_body(Matcher::PartialJson(json!({ "sha": "stale", "branch": "main" })))
        .with_status(409)
        .with_body(r#"{"message":"does not match"}"#)
        .expect(1)
        .create_async()
        .await;
    let refetch = contents_get(&mut server, path, 200, file_body(path, "fresh", b"{}")).await;
    let fresh = server
        .mock("PUT", format!("{REPO}/contents/{path}").as_str())
        .match_body(Matcher::PartialJson(json!({ "sha": "fresh" })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    store(&server, 3)
        .put_file(path, b"{\"id\":\"3\"}", "Update entry 3", Some("stale"))
        .await
        .expect("conflict should be absorbed");

    stale.assert_async().await;
    refetch.assert_async().await;
    fresh.assert_async().await;
}

#[tokio::test]
async fn put_file_gives_up_after_max_attempts() {
    let mut server = Server::new_async().await;
    let path = "data/entries/3.json";
    let put = server
        .mock("PUT", format!("{REPO}/contents/{path}").as_str())
        .with_status(422)
        .with_body(r#"{"message":"sha wasn't supplied"}"#)
        .expect(2)
        .create_async()
        .await;
    contents_get(&mut server, path, 200, file_body(path, "moving", b"{}")).await;

    let err = store(&server, 2)
        .put_file(path, b"{}", "Update", None)
        .await
        .expect_err("should exhaust retries");

    put.assert_async().await;
    assert!(matches!(
        err,
        RemoteStoreError::RetriesExhausted { attempts: 2, .. }
    ));
}

#[tokio::test]
async fn delete_file_treats_missing_file_as_deleted() {
    let mut server = Server::new_async().await;
    contents_get(&mut server, "data/entries/4.json", 404, "{}".into()).await;
    let delete = server
        .mock("DELETE", format!("{REPO}/contents/data/entries/4.json").as_str())
        .expect(0)
        .create_async()
        .await;

    store(&server, 3)
        .delete_file("data/entries/4.json", "Delete entry 4")
        .await
        .expect("missing file counts as deleted");

    delete.assert_async().await;
}

#[tokio::test]
async fn delete_file_sends_current_sha() {
    let mut server = Server::new_async().await;
    let path = "images/originals/A.PNG";
    contents_get(&mut server, path, 200, file_body(path, "img-sha", b"png")).await;
    let delete = server
        .mock("DELETE", format!("{REPO}/contents/{path}").as_str())
        .match_body(Matcher::PartialJson(json!({ "sha": "img-sha", "branch": "main" })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    store(&server, 3).delete_file(path, "Delete image").await.unwrap();
    delete.assert_async().await;
}

async fn mock_commit_chain(server: &mut ServerGuard, ref_reads: usize) -> Vec<Mock> {
    vec![
        server
            .mock("GET", format!("{REPO}/git/ref/heads/main").as_str())
            .with_status(200)
            .with_body(json!({ "object": { "sha": "head" } }).to_string())
            .expect(ref_reads)
            .create_async()
            .await,
        server
            .mock("GET", format!("{REPO}/git/commits/head").as_str())
            .with_status(200)
            .with_body(json!({ "sha": "head", "tree": { "sha": "base-tree" } }).to_string())
            .expect(ref_reads)
            .create_async()
            .await,
        server
            .mock("POST", format!("{REPO}/git/commits").as_str())
            .match_body(Matcher::PartialJson(json!({ "tree": "new-tree", "parents": ["head"] })))
            .with_status(201)
            .with_body(json!({ "sha": "new-commit" }).to_string())
            .expect(ref_reads)
            .create_async()
            .await,
    ]
}

#[tokio::test]
async fn batch_commit_writes_one_revision() {
    let mut server = Server::new_async().await;
    let chain = mock_commit_chain(&mut server, 1).await;
    let blobs = server
        .mock("POST", format!("{REPO}/git/blobs").as_str())
        .match_body(Matcher::PartialJson(json!({ "encoding": "base64" })))
        .with_status(201)
        .with_body(json!({ "sha": "blob" }).to_string())
        .expect(2)
        .create_async()
        .await;
    let tree = server
        .mock("POST", format!("{REPO}/git/trees").as_str())
        .match_body(Matcher::PartialJson(json!({ "base_tree": "base-tree" })))
        .with_status(201)
        .with_body(json!({ "sha": "new-tree" }).to_string())
        .create_async()
        .await;
    let update_ref = server
        .mock("PATCH", format!("{REPO}/git/refs/heads/main").as_str())
        .match_body(Matcher::Json(json!({ "sha": "new-commit", "force": false })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    store(&server, 3)
        .batch_commit(
            &[
                FileUpdate::new("data/entries/5.json", b"{}".to_vec()),
                FileUpdate::new("images/originals/B.PNG", b"png".to_vec()),
            ],
            "Add entry 5",
        )
        .await
        .expect("batch commit should land");

    for mock in chain {
        mock.assert_async().await;
    }
    blobs.assert_async().await;
    tree.assert_async().await;
    update_ref.assert_async().await;
}

#[tokio::test]
async fn batch_commit_restarts_when_the_branch_moved() {
    let mut server = Server::new_async().await;
    let chain = mock_commit_chain(&mut server, 2).await;
    let blobs = server
        .mock("POST", format!("{REPO}/git/blobs").as_str())
        .with_status(201)
        .with_body(json!({ "sha": "blob" }).to_string())
        .expect(1)
        .create_async()
        .await;
    let _tree = server
        .mock("POST", format!("{REPO}/git/trees").as_str())
        .with_status(201)
        .with_body(json!({ "sha": "new-tree" }).to_string())
        .create_async()
        .await;
    let rejected = server
        .mock("PATCH", format!("{REPO}/git/refs/heads/main").as_str())
        .with_status(422)
        .with_body(r#"{"message":"Update is not a fast forward"}"#)
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("PATCH", format!("{REPO}/git/refs/heads/main").as_str())
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    store(&server, 3)
        .batch_commit(&[FileUpdate::new("data/entries/6.json", b"{}".to_vec())], "Add entry 6")
        .await
        .expect("retry should land the commit");

    for mock in chain {
        mock.assert_async().await;
    }
    blobs.assert_async().await;
    rejected.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn batch_delete_removes_paths_with_null_shas() {
    let mut server = Server::new_async().await;
    let _chain = mock_commit_chain(&mut server, 1).await;
    let tree = server
        .mock("POST", format!("{REPO}/git/trees").as_str())
        .match_body(Matcher::PartialJson(json!({
            "tree": [{ "path": "images/originals/ORPHAN.PNG", "sha": null }]
        })))
        .with_status(201)
        .with_body(json!({ "sha": "new-tree" }).to_string())
        .create_async()
        .await;
    let _update_ref = server
        .mock("PATCH", format!("{REPO}/git/refs/heads/main").as_str())
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    store(&server, 3)
        .batch_delete(&["images/originals/ORPHAN.PNG".to_string()], "Prune")
        .await
        .expect("prune should land");

    tree.assert_async().await;
}

#[tokio::test]
async fn upload_image_moves_to_next_name_on_collision() {
    let mut server = Server::new_async().await;
    let taken = server
        .mock("PUT", format!("{REPO}/contents/images/originals/KOI.PNG").as_str())
        .with_status(422)
        .with_body(r#"{"message":"sha wasn't supplied"}"#)
        .expect(1)
        .create_async()
        .await;
    let free = server
        .mock(
            "PUT",
            Matcher::Regex(r"^/repos/octo/gallery/contents/images/originals/\d+_KOI\.PNG$".into()),
        )
        .match_body(Matcher::PartialJson(json!({ "branch": "main" })))
        .with_status(201)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let url = store(&server, 3)
        .upload_image(&ImageUpload::new("photos/koi.png", b"png".to_vec()))
        .await
        .expect("upload should pick a free name");

    taken.assert_async().await;
    free.assert_async().await;
    assert!(url.starts_with("https://raw.githubusercontent.com/octo/gallery/main/images/originals/"));
    assert!(url.ends_with("_KOI.PNG"));
}

#[tokio::test]
async fn upload_image_reports_exhausted_names() {
    let mut server = Server::new_async().await;
    let _taken = server
        .mock("PUT", Matcher::Regex(r"^/repos/octo/gallery/contents/images/originals/.*$".into()))
        .with_status(422)
        .with_body("{}")
        .expect(3)
        .create_async()
        .await;

    let err = store(&server, 3)
        .upload_image(&ImageUpload::new("koi.png", b"png".to_vec()))
        .await
        .expect_err("all names are taken");

    assert!(matches!(err, RemoteStoreError::UploadNamesExhausted { .. }));
}
