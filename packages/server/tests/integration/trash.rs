use common::storage::ObjectStore;

use crate::common::{TestApp, routes};

/// Builds a folder holding two files and returns
/// (folder_id, file_a_id, file_b_id). File A is 6 bytes, file B is 6 bytes.
async fn folder_with_two_files(app: &TestApp, token: &str) -> (String, String, String) {
    let folder_id = app.create_folder(token, "Projects", None).await;
    let a = app
        .upload_bytes("a.txt", b"aaaaaa".to_vec(), Some(&folder_id), token)
        .await;
    assert_eq!(a.status, 201, "{}", a.text);
    let b = app
        .upload_bytes("b.txt", b"bbbbbb".to_vec(), Some(&folder_id), token)
        .await;
    assert_eq!(b.status, 201, "{}", b.text);
    (folder_id, a.id(), b.id())
}

mod soft_delete {
    use super::*;

    #[tokio::test]
    async fn folder_delete_cascades_to_descendants() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("tr1", "pass1234").await;

        let (folder_id, file_a, file_b) = folder_with_two_files(&app, &token).await;
        let nested = app.create_folder(&token, "nested", Some(&folder_id)).await;
        let deep = app
            .upload_bytes("deep.txt", b"cc".to_vec(), Some(&nested), &token)
            .await;

        let res = app
            .delete_with_body(
                routes::DELETE,
                &serde_json::json!({ "id": folder_id }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["nodes_affected"].as_u64().unwrap(), 5);
        assert_eq!(res.body["total_bytes"].as_i64().unwrap(), 14);

        // Every member of the subtree is stamped.
        for id in [&folder_id, &file_a, &file_b, &nested, &deep.id()] {
            let row = app.node_row(id).await.expect("row still exists");
            assert!(row.deleted_at.is_some(), "node {id} should be trashed");
        }

        // Invisible to normal listing.
        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"].as_u64().unwrap(), 0);
    }

    #[tokio::test]
    async fn trash_lists_only_the_highest_deleted_ancestor() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("tr2", "pass1234").await;

        let (folder_id, _, _) = folder_with_two_files(&app, &token).await;
        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": folder_id }),
            &token,
        )
        .await;

        let trash = app.get_with_token(routes::TRASH, &token).await;
        assert_eq!(trash.status, 200);
        assert_eq!(trash.body["total"].as_u64().unwrap(), 1);
        assert_eq!(trash.body["data"][0]["id"].as_str().unwrap(), folder_id);
    }

    #[tokio::test]
    async fn separately_deleted_items_each_surface() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("tr3", "pass1234").await;

        let one = app
            .upload_bytes("one.txt", b"1".to_vec(), None, &token)
            .await;
        let two = app
            .upload_bytes("two.txt", b"2".to_vec(), None, &token)
            .await;

        for id in [one.id(), two.id()] {
            app.delete_with_body(routes::DELETE, &serde_json::json!({ "id": id }), &token)
                .await;
        }

        let trash = app.get_with_token(routes::TRASH, &token).await;
        assert_eq!(trash.body["total"].as_u64().unwrap(), 2);
    }

    #[tokio::test]
    async fn soft_delete_does_not_reduce_usage() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("tr4", "pass1234").await;
        let owner = app.user_id(&token).await;

        let upload = app
            .upload_bytes("keep-counting.bin", vec![0u8; 100], None, &token)
            .await;
        assert_eq!(app.account(owner).await.used_bytes, 100);

        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": upload.id() }),
            &token,
        )
        .await;

        // Trashed content still occupies quota.
        assert_eq!(app.account(owner).await.used_bytes, 100);

        let logs = app.usage_logs(owner).await;
        let delete_log = logs.iter().find(|l| l.action == "delete").unwrap();
        assert_eq!(delete_log.size_delta, 100);
        assert_eq!(delete_log.old_usage, delete_log.new_usage);
    }

    #[tokio::test]
    async fn deleting_a_trashed_node_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("tr5", "pass1234").await;

        let upload = app
            .upload_bytes("gone.txt", b"data".to_vec(), None, &token)
            .await;
        let id = upload.id();

        app.delete_with_body(routes::DELETE, &serde_json::json!({ "id": id }), &token)
            .await;
        let again = app
            .delete_with_body(routes::DELETE, &serde_json::json!({ "id": id }), &token)
            .await;
        assert_eq!(again.status, 404);
    }
}

mod restore {
    use super::*;

    #[tokio::test]
    async fn restore_brings_the_subtree_back() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("rs1", "pass1234").await;

        let (folder_id, file_a, _) = folder_with_two_files(&app, &token).await;
        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": folder_id }),
            &token,
        )
        .await;

        let res = app
            .post_with_token(
                &routes::trash_restore(&folder_id),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["deleted_at"].is_null());

        // The folder and its contents are active again.
        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"].as_u64().unwrap(), 1);
        let inside = app
            .get_with_token(&routes::files_in(&folder_id), &token)
            .await;
        assert_eq!(inside.body["total"].as_u64().unwrap(), 2);
        assert!(app.node_row(&file_a).await.unwrap().deleted_at.is_none());

        let trash = app.get_with_token(routes::TRASH, &token).await;
        assert_eq!(trash.body["total"].as_u64().unwrap(), 0);
    }

    #[tokio::test]
    async fn restoring_an_active_node_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("rs2", "pass1234").await;

        let upload = app
            .upload_bytes("active.txt", b"data".to_vec(), None, &token)
            .await;

        let res = app
            .post_with_token(
                &routes::trash_restore(&upload.id()),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn restore_conflicts_when_the_name_is_retaken() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("rs3", "pass1234").await;

        let first = app
            .upload_bytes("doc.txt", b"original".to_vec(), None, &token)
            .await;
        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": first.id() }),
            &token,
        )
        .await;

        // A new active file takes the name while the old one is trashed.
        let second = app
            .upload_bytes("doc.txt", b"replacement".to_vec(), None, &token)
            .await;
        assert_eq!(second.status, 201);

        let res = app
            .post_with_token(
                &routes::trash_restore(&first.id()),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(res.status, 409);

        // Still in the trash.
        assert!(
            app.node_row(&first.id())
                .await
                .unwrap()
                .deleted_at
                .is_some()
        );
    }

    #[tokio::test]
    async fn restore_is_all_or_nothing_under_quota_pressure() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("rs4", "pass1234").await;
        let owner = app.user_id(&token).await;

        let (folder_id, file_a, file_b) = folder_with_two_files(&app, &token).await;
        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": folder_id }),
            &token,
        )
        .await;

        // used = 12; restoring needs 12 more headroom, so a 20-byte quota fails.
        app.set_quota(owner, 20).await;

        let res = app
            .post_with_token(
                &routes::trash_restore(&folder_id),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(res.status, 413, "{}", res.text);
        assert_eq!(res.body["code"].as_str().unwrap(), "QUOTA_EXCEEDED");

        // Nothing came back: every subtree member is still trashed.
        for id in [&folder_id, &file_a, &file_b] {
            assert!(
                app.node_row(id).await.unwrap().deleted_at.is_some(),
                "node {id} should still be trashed"
            );
        }

        // With enough headroom the same restore succeeds.
        app.set_quota(owner, 100).await;
        let res = app
            .post_with_token(
                &routes::trash_restore(&folder_id),
                &serde_json::json!({}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}

mod permanent_delete {
    use super::*;

    #[tokio::test]
    async fn purge_reduces_usage_and_removes_rows() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("pd1", "pass1234").await;
        let owner = app.user_id(&token).await;

        let (folder_id, file_a, file_b) = folder_with_two_files(&app, &token).await;
        assert_eq!(app.account(owner).await.used_bytes, 12);

        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": folder_id }),
            &token,
        )
        .await;

        let res = app
            .delete_with_token(&routes::trash_item(&folder_id), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["nodes_affected"].as_u64().unwrap(), 3);
        assert_eq!(res.body["total_bytes"].as_i64().unwrap(), 12);

        // Rows are gone, usage came back.
        for id in [&folder_id, &file_a, &file_b] {
            assert!(app.node_row(id).await.is_none());
        }
        assert_eq!(app.account(owner).await.used_bytes, 0);

        // Blob rows and backend bytes are retained (no GC).
        assert_eq!(app.blob_count().await, 2);
        assert_eq!(app.store.object_count(), 2);
    }

    #[tokio::test]
    async fn purging_an_active_node_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("pd2", "pass1234").await;

        let upload = app
            .upload_bytes("still-active.txt", b"data".to_vec(), None, &token)
            .await;

        let res = app
            .delete_with_token(&routes::trash_item(&upload.id()), &token)
            .await;
        assert_eq!(res.status, 404);

        let via_files = app
            .delete_with_body(
                routes::PERMANENT_DELETE,
                &serde_json::json!({ "id": upload.id() }),
                &token,
            )
            .await;
        assert_eq!(via_files.status, 404);
    }

    #[tokio::test]
    async fn files_permanent_delete_is_an_alias() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("pd3", "pass1234").await;
        let owner = app.user_id(&token).await;

        let upload = app
            .upload_bytes("purge-me.bin", vec![0u8; 50], None, &token)
            .await;
        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": upload.id() }),
            &token,
        )
        .await;

        let res = app
            .delete_with_body(
                routes::PERMANENT_DELETE,
                &serde_json::json!({ "id": upload.id() }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.account(owner).await.used_bytes, 0);
    }

    #[tokio::test]
    async fn shared_blob_survives_one_owners_purge() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("pd4a", "pass1234").await;
        let bob = app.create_authenticated_user("pd4b", "pass1234").await;

        let content = b"shared across owners".to_vec();
        let alice_file = app
            .upload_bytes("shared.bin", content.clone(), None, &alice)
            .await;
        let bob_file = app
            .upload_bytes("shared.bin", content.clone(), None, &bob)
            .await;
        assert_eq!(app.blob_count().await, 1);

        app.delete_with_body(
            routes::DELETE,
            &serde_json::json!({ "id": alice_file.id() }),
            &alice,
        )
        .await;
        app.delete_with_token(&routes::trash_item(&alice_file.id()), &alice)
            .await;

        // Bob's node still resolves to the shared blob.
        let stored = app.blob_for_node(&bob_file.id()).await;
        assert_eq!(app.store.get(&stored.storage_path).await.unwrap(), content);
    }
}
