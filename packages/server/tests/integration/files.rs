use crate::common::{TestApp, routes};

mod folders {
    use super::*;

    #[tokio::test]
    async fn create_folder_and_list_it() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("fold1", "pass1234").await;

        let folder_id = app.create_folder(&token, "Documents", None).await;

        let res = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"].as_u64().unwrap(), 1);
        assert_eq!(res.body["data"][0]["id"].as_str().unwrap(), folder_id);
        assert!(res.body["data"][0]["is_dir"].as_bool().unwrap());
        assert_eq!(res.body["data"][0]["size"].as_i64().unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_folder_name_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("fold2", "pass1234").await;

        app.create_folder(&token, "Documents", None).await;

        let res = app
            .post_with_token(
                routes::CREATE_FOLDER,
                &serde_json::json!({ "name": "Documents" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"].as_str().unwrap(), "CONFLICT");
    }

    #[tokio::test]
    async fn same_folder_name_allowed_in_different_parents() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("fold3", "pass1234").await;

        let a = app.create_folder(&token, "A", None).await;
        let b = app.create_folder(&token, "B", None).await;

        app.create_folder(&token, "shared-name", Some(&a)).await;
        app.create_folder(&token, "shared-name", Some(&b)).await;
    }

    #[tokio::test]
    async fn create_folder_under_missing_parent_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("fold4", "pass1234").await;

        let res = app
            .post_with_token(
                routes::CREATE_FOLDER,
                &serde_json::json!({
                    "name": "Orphan",
                    "parent_id": "0193b000-0000-7000-8000-000000000000",
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn create_folder_under_a_file_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("fold5", "pass1234").await;

        let upload = app
            .upload_bytes("not-a-folder.txt", b"data".to_vec(), None, &token)
            .await;
        assert_eq!(upload.status, 201);
        let file_id = upload.id();

        let res = app
            .post_with_token(
                routes::CREATE_FOLDER,
                &serde_json::json!({ "name": "Nested", "parent_id": file_id }),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn invalid_folder_names_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("fold6", "pass1234").await;

        for name in ["", "a/b", "..", "bad\r\nname"] {
            let res = app
                .post_with_token(
                    routes::CREATE_FOLDER,
                    &serde_json::json!({ "name": name }),
                    &token,
                )
                .await;
            assert_eq!(res.status, 400, "name {name:?} should be rejected");
        }
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn listing_scopes_to_parent() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("list1", "pass1234").await;

        let folder_id = app.create_folder(&token, "Photos", None).await;
        let upload = app
            .upload_bytes("in-folder.png", b"PNG".to_vec(), Some(&folder_id), &token)
            .await;
        assert_eq!(upload.status, 201);
        app.upload_bytes("at-root.txt", b"TXT".to_vec(), None, &token)
            .await;

        let root = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(root.body["total"].as_u64().unwrap(), 2); // folder + root file

        let inside = app
            .get_with_token(&routes::files_in(&folder_id), &token)
            .await;
        assert_eq!(inside.body["total"].as_u64().unwrap(), 1);
        assert_eq!(
            inside.body["data"][0]["name"].as_str().unwrap(),
            "in-folder.png"
        );
    }

    #[tokio::test]
    async fn folders_sort_before_files() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("list2", "pass1234").await;

        app.upload_bytes("aaa.txt", b"data".to_vec(), None, &token)
            .await;
        app.create_folder(&token, "zzz", None).await;

        let res = app.get_with_token(routes::FILES, &token).await;
        assert!(res.body["data"][0]["is_dir"].as_bool().unwrap());
        assert_eq!(res.body["data"][1]["name"].as_str().unwrap(), "aaa.txt");
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("list3a", "pass1234").await;
        let bob = app.create_authenticated_user("list3b", "pass1234").await;

        let folder_id = app.create_folder(&alice, "Private", None).await;

        let bob_view = app.get_with_token(routes::FILES, &bob).await;
        assert_eq!(bob_view.body["total"].as_u64().unwrap(), 0);

        let res = app.get_with_token(&routes::file(&folder_id), &bob).await;
        assert_eq!(res.status, 404);

        let res = app
            .get_with_token(&routes::files_in(&folder_id), &bob)
            .await;
        assert_eq!(res.status, 404);
    }
}

mod rename {
    use super::*;

    #[tokio::test]
    async fn rename_changes_the_name() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ren1", "pass1234").await;

        let upload = app
            .upload_bytes("old-name.txt", b"data".to_vec(), None, &token)
            .await;
        let id = upload.id();

        let res = app
            .post_with_token(
                routes::RENAME,
                &serde_json::json!({ "id": id, "name": "new-name.txt" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"].as_str().unwrap(), "new-name.txt");

        let fetched = app.get_with_token(&routes::file(&id), &token).await;
        assert_eq!(fetched.body["name"].as_str().unwrap(), "new-name.txt");
    }

    #[tokio::test]
    async fn rename_collision_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ren2", "pass1234").await;

        app.upload_bytes("taken.txt", b"one".to_vec(), None, &token)
            .await;
        let upload = app
            .upload_bytes("free.txt", b"two".to_vec(), None, &token)
            .await;

        let res = app
            .post_with_token(
                routes::RENAME,
                &serde_json::json!({ "id": upload.id(), "name": "taken.txt" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn rename_to_own_name_is_allowed() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ren3", "pass1234").await;

        let upload = app
            .upload_bytes("same.txt", b"data".to_vec(), None, &token)
            .await;

        let res = app
            .post_with_token(
                routes::RENAME,
                &serde_json::json!({ "id": upload.id(), "name": "same.txt" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}

mod breadcrumbs {
    use super::*;

    #[tokio::test]
    async fn chain_walks_to_the_synthetic_root() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("crumb1", "pass1234").await;

        let a = app.create_folder(&token, "A", None).await;
        let b = app.create_folder(&token, "B", Some(&a)).await;

        let res = app.get_with_token(&routes::breadcrumbs(&b), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let crumbs = res.body["breadcrumbs"].as_array().unwrap();
        assert_eq!(crumbs.len(), 3);
        assert!(crumbs[0]["id"].is_null());
        assert_eq!(crumbs[0]["name"].as_str().unwrap(), "Root");
        assert_eq!(crumbs[1]["name"].as_str().unwrap(), "A");
        assert_eq!(crumbs[2]["name"].as_str().unwrap(), "B");
    }

    #[tokio::test]
    async fn breadcrumbs_for_missing_node_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("crumb2", "pass1234").await;

        let res = app
            .get_with_token(
                &routes::breadcrumbs("0193b000-0000-7000-8000-000000000000"),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }
}

mod download {
    use super::*;

    #[tokio::test]
    async fn download_redirects_to_a_presigned_url() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("dl1", "pass1234").await;

        let upload = app
            .upload_bytes("file.bin", b"binary content".to_vec(), None, &token)
            .await;
        let id = upload.id();

        // Don't follow the redirect; inspect it.
        let no_redirect = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let res = no_redirect
            .get(app.url(&routes::download(&id)))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 307);
        let location = res.headers().get("location").unwrap().to_str().unwrap();

        let stored = app.blob_for_node(&id).await;
        assert!(
            location.contains(&stored.storage_path),
            "redirect should point at the blob's object key: {location}"
        );
    }

    #[tokio::test]
    async fn folders_cannot_be_downloaded() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("dl2", "pass1234").await;

        let folder_id = app.create_folder(&token, "Folder", None).await;
        let res = app
            .get_with_token(&routes::download(&folder_id), &token)
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn foreign_files_are_invisible() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("dl3a", "pass1234").await;
        let bob = app.create_authenticated_user("dl3b", "pass1234").await;

        let upload = app
            .upload_bytes("secret.txt", b"classified".to_vec(), None, &alice)
            .await;

        let res = app
            .get_with_token(&routes::download(&upload.id()), &bob)
            .await;
        assert_eq!(res.status, 404);
    }
}
