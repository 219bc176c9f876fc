//! End-to-end checks against an in-process server backed by the memory store.

use api_lib::{
    adapters::{LogMailer, MemoryAdapter},
    config::Config,
    web::{build_router, dto::event_payload, state::AppState},
};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use workflow_core::realtime::{Channel, RealtimeEvent};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    base: String,
    http: Client,
    mailer: Arc<LogMailer>,
    state: Arc<AppState>,
}

/// A signed-up user and their bearer token.
struct Session {
    id: String,
    token: String,
}

/// Start the router on an ephemeral port with a fresh memory store.
async fn spawn_app() -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("memory".to_string()),
        "PUBLIC_URL" => Some("http://app.test".to_string()),
        _ => None,
    })
    .expect("test config");
    let mailer = Arc::new(LogMailer::new("noreply@workflow.test"));
    let state = Arc::new(AppState::new(
        Arc::new(MemoryAdapter::new()),
        Arc::new(config),
        mailer.clone(),
    ));
    let app = build_router(state.clone()).expect("router");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind to ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("web server error in test");
    });

    TestApp {
        base: format!("http://127.0.0.1:{port}"),
        http: Client::new(),
        mailer,
        state,
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn signup(&self, name: &str, email: &str) -> Session {
        let resp = self
            .http
            .post(self.url("/api/auth/signup"))
            .json(&json!({"name": name, "email": email, "password": "hunter2hunter2"}))
            .send()
            .await
            .expect("signup request");
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.expect("signup body");
        Session {
            id: body["userId"].as_str().expect("userId").to_string(),
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        session: &Session,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = self
            .http
            .request(method.clone(), self.url(path))
            .bearer_auth(&session.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req
            .send()
            .await
            .unwrap_or_else(|e| panic!("{method} {path} failed: {e}"));
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, session: &Session) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, session, None).await
    }

    async fn post(&self, path: &str, session: &Session, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, session, Some(body)).await
    }

    async fn patch(&self, path: &str, session: &Session, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PATCH, path, session, Some(body)).await
    }

    async fn delete(&self, path: &str, session: &Session) -> (StatusCode, Value) {
        self.send(reqwest::Method::DELETE, path, session, None).await
    }

    async fn create_project(&self, owner: &Session, name: &str) -> String {
        let (status, body) = self
            .post("/api/projects", owner, json!({"name": name}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("project id").to_string()
    }
}

fn ids(list: &Value) -> Vec<&str> {
    list.as_array()
        .expect("array body")
        .iter()
        .filter_map(|v| v["id"].as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_login_and_me() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "Ana@Example.com").await;

    let resp = app
        .http
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": "ana@example.com", "password": "hunter2hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("set-cookie").is_some());

    let (status, me) = app.get("/api/auth/me", &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ana@example.com");
    assert_eq!(me["id"], ana.id.as_str());

    let resp = app
        .http
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": "ana@example.com", "password": "wrong-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = spawn_app().await;
    let resp = app.http.get(app.url("/api/projects")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Not Authenticated");

    let ana = app.signup("Ana", "ana@example.com").await;
    let (status, _) = app
        .send(reqwest::Method::POST, "/api/auth/logout", &ana, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/auth/me", &ana).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = spawn_app().await;
    app.signup("Ana", "ana@example.com").await;
    let resp = app
        .http
        .post(app.url("/api/auth/signup"))
        .json(&json!({"email": "ana@example.com", "password": "another-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unreadable_bodies_are_bad_requests() {
    let app = spawn_app().await;

    let resp = app
        .http
        .post(app.url("/api/auth/signup"))
        .json(&json!({"password": "longenough1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let ana = app.signup("Ana", "ana@example.com").await;
    let resp = app
        .http
        .post(app.url("/api/projects"))
        .bearer_auth(&ana.token)
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    // Incomplete credentials are a failed login, not a malformed request.
    let resp = app
        .http
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": "ana@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_flow() {
    let app = spawn_app().await;
    app.signup("Ana", "ana@example.com").await;

    for email in ["ana@example.com", "ghost@example.com"] {
        let resp = app
            .http
            .post(app.url("/api/auth/forgot-password"))
            .json(&json!({"email": email}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], "If account exists, a reset link will be sent.");
    }

    let sent = app.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    let link_start = sent[0]
        .html_body
        .find("http://app.test/reset-password?token=")
        .expect("reset link in mail");
    let token: String = sent[0].html_body[link_start..]
        .trim_start_matches("http://app.test/reset-password?token=")
        .chars()
        .take_while(|c| *c != '"')
        .collect();

    let reset = |token: String| {
        app.http
            .post(app.url("/api/auth/reset-password"))
            .json(&json!({"token": token, "password": "brand-new-secret"}))
            .send()
    };
    assert_eq!(reset(token.clone()).await.unwrap().status(), StatusCode::OK);
    assert_eq!(reset(token).await.unwrap().status(), StatusCode::BAD_REQUEST);

    let resp = app
        .http
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": "ana@example.com", "password": "brand-new-secret"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Projects and members
// ---------------------------------------------------------------------------

#[tokio::test]
async fn projects_are_visible_to_owners_and_members_only() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let bo = app.signup("Bo", "bo@example.com").await;
    let project = app.create_project(&ana, "Launch").await;

    let (status, list) = app.get("/api/projects", &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list), vec![project.as_str()]);

    let (_, list) = app.get("/api/projects", &bo).await;
    assert!(ids(&list).is_empty());
    let (status, _) = app
        .get(&format!("/api/tasks?projectId={project}"), &bo)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, membership) = app
        .get(&format!("/api/projects/{project}/membership"), &bo)
        .await;
    assert_eq!(membership, json!({"role": null, "allowed": false}));

    let (status, _) = app
        .post(
            &format!("/api/projects/{project}/members"),
            &ana,
            json!({"email": "bo@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, list) = app.get("/api/projects", &bo).await;
    assert_eq!(ids(&list), vec![project.as_str()]);
    let (_, membership) = app
        .get(&format!("/api/projects/{project}/membership"), &bo)
        .await;
    assert_eq!(membership, json!({"role": "MEMBER", "allowed": true}));

    let (_, notifications) = app.get("/api/notifications", &bo).await;
    assert_eq!(
        notifications[0]["message"],
        "Ana added you to the project: Launch"
    );
}

#[tokio::test]
async fn only_owners_edit_or_delete_projects() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let bo = app.signup("Bo", "bo@example.com").await;
    let project = app.create_project(&ana, "Launch").await;
    app.post(
        &format!("/api/projects/{project}/members"),
        &ana,
        json!({"email": "bo@example.com"}),
    )
    .await;

    let path = format!("/api/projects/{project}");
    let (status, _) = app
        .send(reqwest::Method::PUT, &path, &bo, Some(json!({"name": "Mine"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            reqwest::Method::PUT,
            &path,
            &ana,
            Some(json!({"name": "Relaunch", "status": "archived"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Relaunch");
    assert_eq!(body["status"], "archived");

    let (status, _) = app.delete(&path, &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.delete(&path, &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    let (status, _) = app.delete(&path, &ana).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn member_removal_rules() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let bo = app.signup("Bo", "bo@example.com").await;
    let project = app.create_project(&ana, "Launch").await;

    let members_path = format!("/api/projects/{project}/members");
    let (_, added) = app
        .post(&members_path, &ana, json!({"email": "bo@example.com"}))
        .await;
    let (status, _) = app
        .post(&members_path, &ana, json!({"email": "bo@example.com"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .post(&members_path, &ana, json!({"email": "nobody@example.com"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, members) = app.get(&members_path, &bo).await;
    let owner_row = members
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["role"] == "OWNER")
        .expect("owner row");
    let owner_member_id = owner_row["id"].as_str().unwrap();

    let (status, body) = app
        .delete(&format!("{members_path}/{owner_member_id}"), &ana)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot remove project owner");

    app.signup("Cy", "cy@example.com").await;
    let (_, cy_row) = app
        .post(&members_path, &ana, json!({"email": "cy@example.com"}))
        .await;
    let cy_member_id = cy_row["id"].as_str().unwrap();
    let bo_member_id = added["id"].as_str().unwrap();

    let (status, _) = app
        .delete(&format!("{members_path}/{cy_member_id}"), &bo)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .delete(&format!("{members_path}/{cy_member_id}"), &ana)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .delete(&format!("{members_path}/{bo_member_id}"), &bo)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&members_path, &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, feed) = app
        .get(&format!("/api/activities?projectId={project}"), &ana)
        .await;
    assert_eq!(feed[0]["type"], "MEMBER_REMOVED");
    assert_eq!(feed[0]["message"], "Bo left the project");
    assert_eq!(feed[1]["type"], "MEMBER_REMOVED");
    assert_eq!(feed[1]["message"], "Cy was removed from the project by Ana");
    assert_eq!(feed[2]["type"], "MEMBER_ADDED");
}

// ---------------------------------------------------------------------------
// Tasks, comments, activities
// ---------------------------------------------------------------------------

#[tokio::test]
async fn task_lifecycle_is_recorded_in_the_feed() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let project = app.create_project(&ana, "Launch").await;

    let (status, body) = app
        .post("/api/tasks", &ana, json!({"title": "  "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title and projectId required");

    let (status, task) = app
        .post(
            "/api/tasks",
            &ana,
            json!({"title": "Write copy", "projectId": project, "description": "Landing page"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "todo");
    let task_id = task["id"].as_str().unwrap().to_string();
    let task_path = format!("/api/tasks/{task_id}");

    let (status, patched) = app
        .patch(
            &task_path,
            &ana,
            json!({"status": "in_progress", "description": null}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["status"], "in_progress");
    assert_eq!(patched["description"], Value::Null);
    assert_eq!(patched["title"], "Write copy");

    let (status, _) = app
        .patch(&task_path, &ana, json!({"status": "blocked"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deleted) = app.delete(&task_path, &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"success": true}));
    let (status, _) = app.get(&task_path, &ana).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, feed) = app
        .get(&format!("/api/activities?projectId={project}"), &ana)
        .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = feed
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["TASK_DELETED", "TASK_UPDATED", "TASK_CREATED", "PROJECT_CREATED"]
    );
    assert_eq!(feed[0]["message"], "Task \"Write copy\" was deleted by Ana");
    assert_eq!(feed[0]["taskId"], Value::Null);
    assert_eq!(feed[1]["taskId"], Value::Null);

    let (status, _) = app.get("/api/activities", &ana).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn handlers_publish_project_events_in_order() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let project = app.create_project(&ana, "Launch").await;
    let project_id: Uuid = project.parse().unwrap();
    let mut events = app.state.hub.subscribe(Channel::Project(project_id)).await;

    let (_, task) = app
        .post("/api/tasks", &ana, json!({"title": "Write copy", "projectId": project}))
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();
    app.patch(&format!("/api/tasks/{task_id}"), &ana, json!({"status": "done"}))
        .await;
    app.post("/api/comments", &ana, json!({"content": "Shipped", "taskId": task_id}))
        .await;
    let (status, _) = app.delete(&format!("/api/tasks/{task_id}"), &ana).await;
    assert_eq!(status, StatusCode::OK);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    let names: Vec<&str> = received.iter().map(|e| e.event_name()).collect();
    assert_eq!(
        names,
        vec![
            "task-created",
            "activity-created",
            "activity-created",
            "task-updated",
            "comment-created",
            "activity-created",
            "activity-created",
            "task-deleted",
        ]
    );

    let created = event_payload(&received[0]).unwrap();
    assert_eq!(created["title"], "Write copy");
    assert_eq!(created["id"], task_id.as_str());
    let updated = event_payload(&received[3]).unwrap();
    assert_eq!(updated["status"], "done");
    let comment = event_payload(&received[4]).unwrap();
    assert_eq!(comment["content"], "Shipped");
    match received[7].as_ref() {
        RealtimeEvent::TaskDeleted(t) => {
            assert_eq!(t.id.to_string(), task_id);
            assert_eq!(t.title, "Write copy");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn task_listing_filters_and_sorts() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let project = app.create_project(&ana, "Launch").await;

    let mut created = Vec::new();
    for (title, due) in [
        ("Later", "2031-05-01T00:00:00Z"),
        ("Sooner", "2030-01-01T00:00:00Z"),
    ] {
        let (_, task) = app
            .post(
                "/api/tasks",
                &ana,
                json!({"title": title, "projectId": project, "dueDate": due}),
            )
            .await;
        created.push(task["id"].as_str().unwrap().to_string());
    }
    app.patch(
        &format!("/api/tasks/{}", created[0]),
        &ana,
        json!({"status": "done"}),
    )
    .await;

    let (_, done) = app
        .get(&format!("/api/tasks?projectId={project}&status=done"), &ana)
        .await;
    assert_eq!(ids(&done), vec![created[0].as_str()]);

    let (_, all) = app
        .get(&format!("/api/tasks?projectId={project}&status=all&sort=due"), &ana)
        .await;
    assert_eq!(ids(&all), vec![created[1].as_str(), created[0].as_str()]);

    let (status, body) = app.get("/api/tasks", &ana).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Project ID required");
}

#[tokio::test]
async fn assignees_must_belong_to_the_project_and_get_notified() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let bo = app.signup("Bo", "bo@example.com").await;
    let project = app.create_project(&ana, "Launch").await;

    let (status, _) = app
        .post(
            "/api/tasks",
            &ana,
            json!({"title": "Review", "projectId": project, "assignedToId": bo.id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.post(
        &format!("/api/projects/{project}/members"),
        &ana,
        json!({"email": "bo@example.com"}),
    )
    .await;
    let (status, task) = app
        .post(
            "/api/tasks",
            &ana,
            json!({"title": "Review", "projectId": project, "assignedToId": bo.id}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["assignedTo"]["email"], "bo@example.com");
    let task_id = task["id"].as_str().unwrap();

    let (_, notifications) = app.get("/api/notifications", &bo).await;
    assert_eq!(notifications[0]["message"], "Ana assigned you a task: Review");
    assert_eq!(
        notifications[0]["link"],
        format!("/projects/{project}/tasks/{task_id}")
    );

    let (status, unassigned) = app
        .patch(
            &format!("/api/tasks/{task_id}"),
            &ana,
            json!({"assignedToId": null}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unassigned["assignedToId"], Value::Null);
    assert_eq!(unassigned["assignedTo"], Value::Null);
}

#[tokio::test]
async fn comments_notify_the_assignee() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let bo = app.signup("Bo", "bo@example.com").await;
    let project = app.create_project(&ana, "Launch").await;
    app.post(
        &format!("/api/projects/{project}/members"),
        &ana,
        json!({"email": "bo@example.com"}),
    )
    .await;
    let (_, task) = app
        .post(
            "/api/tasks",
            &ana,
            json!({"title": "Review", "projectId": project, "assignedToId": bo.id}),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, _) = app
        .post("/api/comments", &ana, json!({"content": "", "taskId": task_id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for content in ["First pass done", "Second look"] {
        let (status, comment) = app
            .post("/api/comments", &ana, json!({"content": content, "taskId": task_id}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["author"]["name"], "Ana");
    }
    // Comments by the assignee do not notify them.
    app.post("/api/comments", &bo, json!({"content": "Thanks", "taskId": task_id}))
        .await;

    let (_, comments) = app
        .get(&format!("/api/comments?taskId={task_id}"), &bo)
        .await;
    let contents: Vec<&str> = comments
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["First pass done", "Second look", "Thanks"]);

    let (_, notifications) = app.get("/api/notifications", &bo).await;
    let comment_notes = notifications
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["message"] == "Ana commented on your task: Review")
        .count();
    assert_eq!(comment_notes, 2);

    let (status, body) = app.get("/api/comments", &bo).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "taskId is required");
}

// ---------------------------------------------------------------------------
// Notifications and analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn marking_notifications_read_only_touches_your_own() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let bo = app.signup("Bo", "bo@example.com").await;
    let project = app.create_project(&ana, "Launch").await;
    app.post(
        &format!("/api/projects/{project}/members"),
        &ana,
        json!({"email": "bo@example.com"}),
    )
    .await;

    let (_, notifications) = app.get("/api/notifications", &bo).await;
    let bo_ids: Vec<String> = ids(&notifications).into_iter().map(String::from).collect();
    assert_eq!(bo_ids.len(), 1);

    let (status, body) = app
        .patch("/api/notifications", &ana, json!({"ids": bo_ids}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "updated": 0}));

    let (_, body) = app
        .patch("/api/notifications", &bo, json!({"ids": bo_ids}))
        .await;
    assert_eq!(body, json!({"success": true, "updated": 1}));
    let (_, notifications) = app.get("/api/notifications", &bo).await;
    assert_eq!(notifications[0]["read"], true);
}

#[tokio::test]
async fn analytics_cover_owned_projects() {
    let app = spawn_app().await;
    let ana = app.signup("Ana", "ana@example.com").await;
    let bo = app.signup("Bo", "bo@example.com").await;
    let project = app.create_project(&ana, "Launch").await;
    let other = app.create_project(&bo, "Side project").await;

    for title in ["One", "Two", "Three"] {
        app.post("/api/tasks", &ana, json!({"title": title, "projectId": project}))
            .await;
    }
    app.post("/api/tasks", &bo, json!({"title": "Not Ana's", "projectId": other}))
        .await;
    let (_, tasks) = app
        .get(&format!("/api/tasks?projectId={project}"), &ana)
        .await;
    let first = tasks[0]["id"].as_str().unwrap();
    app.patch(&format!("/api/tasks/{first}"), &ana, json!({"status": "done"}))
        .await;

    let (status, stats) = app.get("/api/analytics", &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalTasks"], 3);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["pending"], 2);
    assert_eq!(
        stats["tasksByProject"],
        json!([{"projectId": project, "count": 3}])
    );
    assert_eq!(
        stats["tasksByUser"],
        json!([{"assignedToId": null, "count": 3}])
    );
}
