mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{error_message, id_of, setup};
use tms_api::authz::Role;

#[tokio::test]
async fn anonymous_can_read_every_collection() -> Result<()> {
    let t = setup().await?;

    for uri in ["/users/", "/projects/", "/tasks/", "/comments/"] {
        let (status, body) = t.get(uri, None).await?;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert!(body.is_array());
    }

    Ok(())
}

#[tokio::test]
async fn anonymous_writes_are_unauthorized() -> Result<()> {
    let t = setup().await?;
    let admin = t.account("admin", Role::Admin).await?;
    let project_id = t.create_project(&admin.token, "Launch").await?;
    let task_id = t
        .create_task(&admin.token, json!({ "title": "Checklist", "project": project_id }))
        .await?;

    let attempts = [
        ("POST", "/users/".to_string(), Some(json!({ "username": "mallory" }))),
        ("POST", "/projects/".to_string(), Some(json!({ "name": "Nope" }))),
        ("POST", "/tasks/".to_string(), Some(json!({ "title": "Nope", "project": project_id }))),
        (
            "POST",
            "/comments/".to_string(),
            Some(json!({ "content": "Nope", "task": task_id, "project": project_id })),
        ),
        ("PATCH", format!("/tasks/{task_id}/"), Some(json!({ "status": "done" }))),
        ("DELETE", format!("/projects/{project_id}/"), None),
        ("DELETE", format!("/users/{}/", admin.id), None),
    ];

    for (method, uri, body) in attempts {
        let (status, body) = t.request(method, &uri, None, body).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}: {body}");
        assert_eq!(body["error"]["code"], "unauthorized");
        assert_eq!(error_message(&body), "Authentication credentials were not provided.");
    }

    Ok(())
}

#[tokio::test]
async fn client_is_limited_to_comments() -> Result<()> {
    let t = setup().await?;
    let admin = t.account("admin", Role::Admin).await?;
    let client = t.account("client", Role::Client).await?;
    let project_id = t.create_project(&admin.token, "Launch").await?;
    let task_id = t
        .create_task(&admin.token, json!({ "title": "Checklist", "project": project_id }))
        .await?;

    let token = Some(client.token.as_str());

    let (status, _) = t.post("/users/", token, json!({ "username": "someone" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.post("/projects/", token, json!({ "name": "Mine" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = t
        .post("/tasks/", token, json!({ "title": "Mine", "project": project_id }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "permission_denied");
    assert_eq!(error_message(&body), "You do not have permission to perform this action.");

    let (status, _) = t.delete(&format!("/tasks/{task_id}/"), token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.delete(&format!("/projects/{project_id}/"), token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.delete(&format!("/users/{}/", admin.id), token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .post(
            "/comments/",
            token,
            json!({ "content": "Looks good", "task": task_id, "project": project_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let comment_id = id_of(&body)?;

    let (status, _) = t
        .patch(&format!("/comments/{comment_id}/"), token, json!({ "content": "Looks great" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.delete(&format!("/comments/{comment_id}/"), token).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for uri in ["/users/", "/projects/", "/tasks/", "/comments/"] {
        let (status, _) = t.get(uri, token).await?;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }

    Ok(())
}

#[tokio::test]
async fn every_authenticated_role_may_update_tasks() -> Result<()> {
    let t = setup().await?;
    let admin = t.account("admin", Role::Admin).await?;
    let project_id = t.create_project(&admin.token, "Launch").await?;
    let task_id = t
        .create_task(&admin.token, json!({ "title": "Checklist", "project": project_id }))
        .await?;

    for (i, role) in Role::ALL.into_iter().enumerate() {
        let account = t.account(&format!("member{i}"), role).await?;
        let (status, body) = t
            .patch(
                &format!("/tasks/{task_id}/"),
                Some(&account.token),
                json!({ "description": format!("touched by {role}") }),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{role}: {body}");
        assert_eq!(body["created_by"], admin.id.to_string());
    }

    Ok(())
}

#[tokio::test]
async fn only_admins_and_project_managers_manage_projects() -> Result<()> {
    let t = setup().await?;

    for (username, role, expected) in [
        ("admin", Role::Admin, StatusCode::CREATED),
        ("manager", Role::ProjectManager, StatusCode::CREATED),
        ("lead", Role::ProjectLead, StatusCode::FORBIDDEN),
        ("dev", Role::Developer, StatusCode::FORBIDDEN),
        ("client", Role::Client, StatusCode::FORBIDDEN),
    ] {
        let account = t.account(username, role).await?;
        let (status, body) = t
            .post("/projects/", Some(&account.token), json!({ "name": format!("{username}'s project") }))
            .await?;
        assert_eq!(status, expected, "{role}: {body}");
        if status == StatusCode::CREATED {
            assert_eq!(body["created_by"], account.id.to_string());
        }
    }

    Ok(())
}

#[tokio::test]
async fn developers_create_and_delete_tasks() -> Result<()> {
    let t = setup().await?;
    let admin = t.account("admin", Role::Admin).await?;
    let dev = t.account("dev", Role::Developer).await?;
    let project_id = t.create_project(&admin.token, "Launch").await?;

    let task_id = t
        .create_task(&dev.token, json!({ "title": "Write docs", "project": project_id }))
        .await?;
    let (status, _) = t.delete(&format!("/tasks/{task_id}/"), Some(&dev.token)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn bad_tokens_are_rejected_before_permissions() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t.get("/projects/", Some("not-a-real-token")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "Invalid token.");

    Ok(())
}

#[tokio::test]
async fn malformed_ids_still_go_through_permissions() -> Result<()> {
    let t = setup().await?;
    let client = t.account("client", Role::Client).await?;
    let admin = t.account("admin", Role::Admin).await?;

    for (method, uri) in [
        ("DELETE", "/users/abc/"),
        ("DELETE", "/projects/abc/"),
        ("DELETE", "/tasks/abc/"),
        ("DELETE", "/comments/abc/"),
        ("PATCH", "/projects/abc/"),
    ] {
        let body = (method == "PATCH").then(|| json!({ "name": "Renamed" }));
        let (status, body) = t.request(method, uri, None, body).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}: {body}");
        assert_eq!(body["error"]["code"], "unauthorized");
    }

    for (method, uri) in [("DELETE", "/users/abc/"), ("DELETE", "/projects/abc/"), ("DELETE", "/tasks/abc/")] {
        let (status, body) = t.request(method, uri, Some(&client.token), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}: {body}");
        assert_eq!(body["error"]["code"], "permission_denied");
    }

    let (status, body) = t.delete("/projects/abc/", Some(&admin.token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Not found.");
    let (status, _) = t.get("/tasks/abc/", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn unrecognised_stored_role_is_a_server_error_for_its_owner() -> Result<()> {
    let t = setup().await?;
    let admin = t.account("admin", Role::Admin).await?;
    let broken = t.account("broken", Role::Developer).await?;
    let project_id = t.create_project(&admin.token, "Launch").await?;
    let (status, _) = t
        .patch(
            &format!("/projects/{project_id}/"),
            Some(&admin.token),
            json!({ "user_ids": [admin.id, broken.id] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    sqlx::query("UPDATE users SET role = 'Owner' WHERE id = ?")
        .bind(broken.id)
        .execute(&t.pool)
        .await?;

    let (status, body) = t.get("/auth/profile/", Some(&broken.token)).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "server_error");
    assert_eq!(error_message(&body), "A server error occurred.");

    let (status, body) = t
        .post("/projects/", Some(&broken.token), json!({ "name": "Never stored" }))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "server_error");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM projects WHERE name = 'Never stored'")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(count, 0);

    // Other readers still see every well-formed row.
    let (status, body) = t.get("/users/", None).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let usernames: Vec<&str> = body
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| row["username"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(usernames, ["admin"]);

    let (status, body) = t.get(&format!("/projects/{project_id}/"), Some(&admin.token)).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["users"].as_array().map(Vec::len), Some(1));

    Ok(())
}
