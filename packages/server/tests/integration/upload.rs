use common::storage::{ContentHash, ObjectStore};

use crate::common::{TestApp, routes};

fn intent(hash: &ContentHash, size: i64, name: &str) -> serde_json::Value {
    serde_json::json!({
        "hash": hash.to_hex(),
        "size": size,
        "type": "application/octet-stream",
        "name": name,
    })
}

mod single_shot {
    use super::*;

    #[tokio::test]
    async fn upload_creates_node_and_ledger_entry() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("up1", "pass1234").await;
        let owner = app.user_id(&token).await;

        let res = app
            .upload_bytes("report.pdf", b"%PDF-1.4 content".to_vec(), None, &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"].as_str().unwrap(), "report.pdf");
        assert_eq!(res.body["size"].as_i64().unwrap(), 16);
        assert!(!res.body["is_dir"].as_bool().unwrap());

        let account = app.account(owner).await;
        assert_eq!(account.used_bytes, 16);

        let logs = app.usage_logs(owner).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "upload");
        assert_eq!(logs[0].size_delta, 16);
        assert_eq!(logs[0].old_usage, 0);
        assert_eq!(logs[0].new_usage, 16);
    }

    #[tokio::test]
    async fn uploaded_bytes_round_trip_through_the_store() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("up2", "pass1234").await;

        let content = b"the exact bytes that went in".to_vec();
        let res = app
            .upload_bytes("roundtrip.bin", content.clone(), None, &token)
            .await;
        assert_eq!(res.status, 201);

        let stored = app.blob_for_node(&res.id()).await;
        assert_eq!(stored.content_hash, ContentHash::compute(&content).to_hex());

        let bytes = app.store.get(&stored.storage_path).await.unwrap();
        assert_eq!(bytes, content);
    }

    #[tokio::test]
    async fn identical_content_shares_one_blob() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("up3", "pass1234").await;
        let owner = app.user_id(&token).await;

        let content = b"duplicated content".to_vec();
        let first = app
            .upload_bytes("a.txt", content.clone(), None, &token)
            .await;
        let second = app
            .upload_bytes("b.txt", content.clone(), None, &token)
            .await;
        assert_eq!(first.status, 201);
        assert_eq!(second.status, 201);
        assert_ne!(first.id(), second.id());

        // One blob row, one stored object, two nodes.
        assert_eq!(app.blob_count().await, 1);
        assert_eq!(app.store.object_count(), 1);

        // Both uploads count against quota.
        let account = app.account(owner).await;
        assert_eq!(account.used_bytes, 2 * content.len() as i64);
    }

    #[tokio::test]
    async fn duplicate_name_in_same_folder_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("up4", "pass1234").await;

        let first = app
            .upload_bytes("same-name.txt", b"v1".to_vec(), None, &token)
            .await;
        assert_eq!(first.status, 201);

        let second = app
            .upload_bytes("same-name.txt", b"v2".to_vec(), None, &token)
            .await;
        assert_eq!(second.status, 409);
    }

    #[tokio::test]
    async fn upload_into_folder() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("up5", "pass1234").await;

        let folder_id = app.create_folder(&token, "Inbox", None).await;
        let res = app
            .upload_bytes("letter.txt", b"hello".to_vec(), Some(&folder_id), &token)
            .await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["parent_id"].as_str().unwrap(), folder_id);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("up6", "pass1234").await;

        let form = reqwest::multipart::Form::new().text("parent_id", "");
        let res = app
            .client
            .put(app.url(routes::UPLOAD))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn quota_exceeded_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("up7", "pass1234").await;
        let owner = app.user_id(&token).await;

        app.set_quota(owner, 10).await;

        let res = app
            .upload_bytes("too-big.bin", vec![0u8; 64], None, &token)
            .await;
        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"].as_str().unwrap(), "QUOTA_EXCEEDED");

        // Nothing committed.
        let account = app.account(owner).await;
        assert_eq!(account.used_bytes, 0);
        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"].as_u64().unwrap(), 0);
    }
}

mod check {
    use super::*;

    #[tokio::test]
    async fn hit_links_a_node_without_bytes() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("chk1", "pass1234").await;
        let owner = app.user_id(&token).await;

        let content = b"content uploaded once".to_vec();
        let first = app
            .upload_bytes("original.txt", content.clone(), None, &token)
            .await;
        assert_eq!(first.status, 201);

        let hash = ContentHash::compute(&content);
        let res = app
            .post_with_token(
                routes::UPLOAD_CHECK,
                &intent(&hash, content.len() as i64, "copy.txt"),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["exists"].as_bool().unwrap());
        assert_eq!(res.body["data"]["name"].as_str().unwrap(), "copy.txt");

        // Still exactly one blob and one stored object.
        assert_eq!(app.blob_count().await, 1);
        assert_eq!(app.store.object_count(), 1);

        // The dedup link still pays quota.
        let account = app.account(owner).await;
        assert_eq!(account.used_bytes, 2 * content.len() as i64);
    }

    #[tokio::test]
    async fn miss_reports_not_exists() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("chk2", "pass1234").await;

        let hash = ContentHash::compute(b"never uploaded");
        let res = app
            .post_with_token(routes::UPLOAD_CHECK, &intent(&hash, 14, "new.txt"), &token)
            .await;
        assert_eq!(res.status, 200);
        assert!(!res.body["exists"].as_bool().unwrap());
        assert!(res.body.get("data").is_none() || res.body["data"].is_null());
    }

    #[tokio::test]
    async fn malformed_hash_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("chk3", "pass1234").await;

        let res = app
            .post_with_token(
                routes::UPLOAD_CHECK,
                &serde_json::json!({
                    "hash": "not-a-sha256",
                    "size": 10,
                    "name": "x.txt",
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn check_enforces_quota_preflight() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("chk4", "pass1234").await;
        let owner = app.user_id(&token).await;

        app.set_quota(owner, 5).await;

        let hash = ContentHash::compute(b"whatever");
        let res = app
            .post_with_token(routes::UPLOAD_CHECK, &intent(&hash, 100, "big.bin"), &token)
            .await;
        assert_eq!(res.status, 413);
    }
}

mod signed {
    use super::*;

    #[tokio::test]
    async fn signed_flow_commits_after_client_put() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("sig1", "pass1234").await;

        let content = b"bytes sent straight to the backend".to_vec();
        let hash = ContentHash::compute(&content);

        let signed = app
            .post_with_token(
                routes::UPLOAD_SIGNED,
                &intent(&hash, content.len() as i64, "direct.bin"),
                &token,
            )
            .await;
        assert_eq!(signed.status, 200, "{}", signed.text);
        let upload_id = signed.body["upload_id"].as_str().unwrap();
        let key = signed.body["key"].as_str().unwrap();
        assert!(!signed.body["url"].as_str().unwrap().is_empty());

        // Play the client: PUT the bytes to the presigned destination.
        app.store.client_put(key, &content);

        let complete = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(complete.status, 201, "{}", complete.text);
        assert_eq!(complete.body["name"].as_str().unwrap(), "direct.bin");

        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"].as_u64().unwrap(), 1);
    }

    #[tokio::test]
    async fn tampered_bytes_fail_completion() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("sig2", "pass1234").await;

        let declared = b"the content I promised".to_vec();
        let hash = ContentHash::compute(&declared);

        let signed = app
            .post_with_token(
                routes::UPLOAD_SIGNED,
                &intent(&hash, declared.len() as i64, "promised.bin"),
                &token,
            )
            .await;
        let upload_id = signed.body["upload_id"].as_str().unwrap();
        let key = signed.body["key"].as_str().unwrap();

        // Same length, different bytes: size passes, the hash must not.
        let tampered = b"the content I uploaded".to_vec();
        assert_eq!(tampered.len(), declared.len());
        app.store.client_put(key, &tampered);

        let complete = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(complete.status, 409, "{}", complete.text);
        assert_eq!(complete.body["code"].as_str().unwrap(), "CONFLICT");

        // Commit aborted: no node, no usage.
        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"].as_u64().unwrap(), 0);
    }

    #[tokio::test]
    async fn size_mismatch_fails_completion() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("sig3", "pass1234").await;

        let declared = b"twelve bytes".to_vec();
        let hash = ContentHash::compute(&declared);

        let signed = app
            .post_with_token(
                routes::UPLOAD_SIGNED,
                &intent(&hash, declared.len() as i64, "short.bin"),
                &token,
            )
            .await;
        let upload_id = signed.body["upload_id"].as_str().unwrap();
        let key = signed.body["key"].as_str().unwrap();

        app.store.client_put(key, b"way more bytes than declared");

        let complete = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(complete.status, 409);
    }

    #[tokio::test]
    async fn completing_without_uploading_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("sig4", "pass1234").await;

        let hash = ContentHash::compute(b"never sent");
        let signed = app
            .post_with_token(
                routes::UPLOAD_SIGNED,
                &intent(&hash, 10, "ghost.bin"),
                &token,
            )
            .await;
        let upload_id = signed.body["upload_id"].as_str().unwrap();
        let key = signed.body["key"].as_str().unwrap();

        let complete = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(complete.status, 409);
    }

    #[tokio::test]
    async fn unknown_session_is_expired() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("sig5", "pass1234").await;

        let complete = app
            .post_with_token(
                &routes::upload_complete("no-such-session", "blobs/ab/cd"),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(complete.status, 410);
        assert_eq!(complete.body["code"].as_str().unwrap(), "SESSION_EXPIRED");
    }

    #[tokio::test]
    async fn committed_session_cannot_be_replayed() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("sig6", "pass1234").await;

        let content = b"commit once".to_vec();
        let hash = ContentHash::compute(&content);

        let signed = app
            .post_with_token(
                routes::UPLOAD_SIGNED,
                &intent(&hash, content.len() as i64, "once.bin"),
                &token,
            )
            .await;
        let upload_id = signed.body["upload_id"].as_str().unwrap();
        let key = signed.body["key"].as_str().unwrap();
        app.store.client_put(key, &content);

        let first = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(first.status, 201);

        let replay = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(replay.status, 410);
    }
}

mod multipart {
    use super::*;

    #[tokio::test]
    async fn multipart_flow_assembles_and_commits() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("mp1", "pass1234").await;

        let part1 = b"first half of the file ".to_vec();
        let part2 = b"and the second half".to_vec();
        let mut whole = part1.clone();
        whole.extend_from_slice(&part2);
        let hash = ContentHash::compute(&whole);

        let created = app
            .post_with_token(
                routes::MULTIPART_SIGNED,
                &intent(&hash, whole.len() as i64, "large.bin"),
                &token,
            )
            .await;
        assert_eq!(created.status, 200, "{}", created.text);
        let upload_id = created.body["upload_id"].as_str().unwrap();
        let key = created.body["key"].as_str().unwrap();

        // Sign both parts; the URLs are what a browser would PUT to.
        for part_number in [1u32, 2] {
            let sign = app
                .get_with_token(&routes::multipart(upload_id, key, part_number), &token)
                .await;
            assert_eq!(sign.status, 200, "{}", sign.text);
            assert!(!sign.body["url"].as_str().unwrap().is_empty());
        }

        // Play the client against the backend directly.
        let backend_id = app
            .sessions_backend_upload_id(upload_id)
            .await
            .expect("session should carry a backend upload id");
        let etag1 = app.store.client_put_part(&backend_id, 1, &part1).unwrap();
        let etag2 = app.store.client_put_part(&backend_id, 2, &part2).unwrap();

        let complete = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({
                    "parts": [
                        { "ETag": etag1, "PartNumber": 1 },
                        { "ETag": etag2, "PartNumber": 2 },
                    ],
                }),
                &token,
            )
            .await;
        assert_eq!(complete.status, 201, "{}", complete.text);

        // Assembled object matches the declared content.
        let stored = app.blob_for_node(&complete.id()).await;
        let bytes = app.store.get(&stored.storage_path).await.unwrap();
        assert_eq!(bytes, whole);
    }

    #[tokio::test]
    async fn completing_multipart_without_parts_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("mp2", "pass1234").await;

        let hash = ContentHash::compute(b"some content");
        let created = app
            .post_with_token(
                routes::MULTIPART_SIGNED,
                &intent(&hash, 12, "noparts.bin"),
                &token,
            )
            .await;
        let upload_id = created.body["upload_id"].as_str().unwrap();
        let key = created.body["key"].as_str().unwrap();

        let complete = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(complete.status, 400);
    }

    #[tokio::test]
    async fn abort_discards_the_session() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("mp3", "pass1234").await;

        let hash = ContentHash::compute(b"to be aborted");
        let created = app
            .post_with_token(
                routes::MULTIPART_SIGNED,
                &intent(&hash, 13, "aborted.bin"),
                &token,
            )
            .await;
        let upload_id = created.body["upload_id"].as_str().unwrap();
        let key = created.body["key"].as_str().unwrap();

        let abort = app
            .delete_with_token(&routes::multipart_abort(upload_id, key), &token)
            .await;
        assert_eq!(abort.status, 204, "{}", abort.text);

        // The protocol is over: completion now reports an expired session.
        let complete = app
            .post_with_token(
                &routes::upload_complete(upload_id, key),
                &serde_json::json!({ "parts": [{ "ETag": "x", "PartNumber": 1 }] }),
                &token,
            )
            .await;
        assert_eq!(complete.status, 410);
    }

    #[tokio::test]
    async fn part_numbers_are_validated() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("mp4", "pass1234").await;

        let hash = ContentHash::compute(b"parts");
        let created = app
            .post_with_token(
                routes::MULTIPART_SIGNED,
                &intent(&hash, 5, "parts.bin"),
                &token,
            )
            .await;
        let upload_id = created.body["upload_id"].as_str().unwrap();
        let key = created.body["key"].as_str().unwrap();

        let res = app
            .get_with_token(&routes::multipart(upload_id, key, 0), &token)
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn foreign_sessions_are_invisible() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("mp5a", "pass1234").await;
        let bob = app.create_authenticated_user("mp5b", "pass1234").await;

        let hash = ContentHash::compute(b"alice's upload");
        let created = app
            .post_with_token(
                routes::MULTIPART_SIGNED,
                &intent(&hash, 14, "private.bin"),
                &alice,
            )
            .await;
        let upload_id = created.body["upload_id"].as_str().unwrap();
        let key = created.body["key"].as_str().unwrap();

        let res = app
            .get_with_token(&routes::multipart(upload_id, key, 1), &bob)
            .await;
        assert_eq!(res.status, 404);
    }
}
