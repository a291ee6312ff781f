//! End-to-end tests driving the router in-process

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use rango::config::SessionBackend;
use rango::{api, Config, Database, Rango};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ADMIN_KEY: &str = "test-admin-key";

struct TestApp {
    router: Router,
    db: Arc<Database>,
}

async fn app_with(backend: SessionBackend, admin_key: Option<&str>) -> TestApp {
    let mut config = Config::default();
    config.session.backend = backend;
    config.server.admin_key = admin_key.map(str::to_string);

    let db = Arc::new(Database::open_in_memory().unwrap());
    let rango = Rango::with_database(config, db.clone());
    rango.populate().await.unwrap();

    TestApp {
        router: api::create_router(rango.app_state()),
        db,
    }
}

async fn app() -> TestApp {
    app_with(SessionBackend::Db, Some(ADMIN_KEY)).await
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("sessionid={}", cookie));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("sessionid={}", cookie));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Register and log in, returning the authenticated session key
    async fn logged_in(&self, username: &str) -> String {
        let resp = self
            .post(
                "/rango/register/",
                None,
                json!({ "username": username, "password": "pw-123", "email": "x@example.com" }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = self
            .post(
                "/rango/login/",
                None,
                json!({ "username": username, "password": "pw-123" }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        session_cookie(&resp).expect("login sets a session cookie")
    }
}

fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("sessionid="))
        .map(|rest| rest.split(';').next().unwrap_or("").to_string())
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn body_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_session() {
    let app = app().await;
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn index_lists_top_categories_and_pages() {
    let app = app().await;
    let resp = app.get("/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_some());

    let body = body_json(resp).await;
    assert_eq!(body["boldmessage"], "Crunchy, creamy, cookie, candy, cupcake!");
    assert_eq!(body["visits"], 1);
    assert_eq!(body["categories"][0]["name"], "Python");
    assert_eq!(body["pages"][0]["title"], "How to Tango with Django");
    assert!(body["pages"].as_array().unwrap().len() <= 5);
}

#[tokio::test]
async fn visit_counter_survives_between_requests() {
    for backend in [SessionBackend::Db, SessionBackend::Memory] {
        let app = app_with(backend, None).await;

        let first = app.get("/rango/about/", None).await;
        let key = session_cookie(&first).unwrap();
        assert_eq!(body_json(first).await["visits"], 1);

        // Same day: no increment, same session
        let second = app.get("/rango/about/", Some(&key)).await;
        assert_eq!(session_cookie(&second).as_deref(), Some(key.as_str()));
        assert_eq!(body_json(second).await["visits"], 1);
    }
}

#[tokio::test]
async fn visit_counter_increments_after_a_day() {
    let app = app().await;
    let first = app.get("/rango/about/", None).await;
    let key = session_cookie(&first).unwrap();

    // Age the stored last_visit by two days
    let two_days_ago = rango::visits::format_timestamp(chrono::Utc::now() - chrono::Duration::days(2));
    let data = json!({ "visits": 1, "last_visit": two_days_ago }).to_string();
    app.db
        .conn()
        .execute(
            "UPDATE sessions SET data = ? WHERE session_key = ?",
            rusqlite::params![data, key],
        )
        .unwrap();

    let resp = app.get("/rango/about/", Some(&key)).await;
    assert_eq!(body_json(resp).await["visits"], 2);

    let resp = app.get("/", Some(&key)).await;
    assert_eq!(body_json(resp).await["visits"], 2);
}

#[tokio::test]
async fn show_category_known_and_unknown() {
    let app = app().await;

    let resp = app.get("/rango/category/python/", None).await;
    let body = body_json(resp).await;
    assert_eq!(body["category"]["name"], "Python");
    assert_eq!(body["category"]["views"], 129);
    assert_eq!(body["pages"].as_array().unwrap().len(), 3);

    let resp = app.get("/rango/category/cobol/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["category"].is_null());
    assert!(body["pages"].is_null());
}

#[tokio::test]
async fn goto_redirects_and_counts() {
    let app = app().await;
    let page_id: i64 = app
        .db
        .conn()
        .query_row("SELECT id FROM pages WHERE title = 'Flask'", [], |r| r.get(0))
        .unwrap();

    let resp = app.get(&format!("/rango/goto/?page_id={}", page_id), None).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "http://flask.pocoo.org");

    let views: i64 = app
        .db
        .conn()
        .query_row("SELECT views FROM pages WHERE id = ?", [page_id], |r| r.get(0))
        .unwrap();
    assert_eq!(views, 65);

    let resp = app.get("/rango/goto/?page_id=99999", None).await;
    assert_eq!(location(&resp), "/rango/");
    let resp = app.get("/rango/goto/", None).await;
    assert_eq!(location(&resp), "/rango/");
}

#[tokio::test]
async fn login_required_routes_reject_anonymous() {
    let app = app().await;

    let resp = app.post("/rango/add_category/", None, json!({ "name": "Rust" })).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["login_url"], "/rango/login/");

    let resp = app.get("/rango/restricted/", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.post("/rango/like_category/", None, json!({ "category_id": 1 })).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logged_in_user_adds_and_likes() {
    let app = app().await;
    let key = app.logged_in("leifos").await;

    let resp = app.get("/rango/restricted/", Some(&key)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["username"], "leifos");

    // New category
    let resp = app
        .post("/rango/add_category/", Some(&key), json!({ "name": "Rust Web" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let category = body_json(resp).await;
    assert_eq!(category["slug"], "rust-web");
    assert_eq!(category["likes"], 0);

    // Duplicate name
    let resp = app
        .post("/rango/add_category/", Some(&key), json!({ "name": "Rust Web" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["errors"]["name"].is_array());

    // Page under it, URL gains a scheme
    let resp = app
        .post(
            "/rango/category/rust-web/add_page/",
            Some(&key),
            json!({ "title": "Axum", "url": "docs.rs/axum" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["page"]["url"], "http://docs.rs/axum");
    assert_eq!(body["page"]["views"], 0);

    // Unknown category redirects home
    let resp = app
        .post(
            "/rango/category/nope/add_page/",
            Some(&key),
            json!({ "title": "x", "url": "http://x.org" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/rango/");

    // Likes
    let id = category["id"].as_i64().unwrap();
    let resp = app
        .post("/rango/like_category/", Some(&key), json!({ "category_id": id }))
        .await;
    assert_eq!(body_json(resp).await["likes"], 1);

    let resp = app
        .post("/rango/like_category/", Some(&key), json!({ "category_id": 424242 }))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app().await;
    let key = app.logged_in("maxwell").await;

    let resp = app.post("/rango/logout/", Some(&key), json!({})).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(session_cookie(&resp).as_deref(), Some(""));

    let resp = app.get("/rango/restricted/", Some(&key)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rotates_pre_login_session_key() {
    let app = app().await;
    let resp = app.get("/rango/about/", None).await;
    let anonymous_key = session_cookie(&resp).unwrap();

    app.post(
        "/rango/register/",
        None,
        json!({ "username": "david", "password": "pw" }),
    )
    .await;
    let resp = app
        .post(
            "/rango/login/",
            Some(&anonymous_key),
            json!({ "username": "david", "password": "pw" }),
        )
        .await;
    let new_key = session_cookie(&resp).unwrap();
    assert_ne!(new_key, anonymous_key);

    // Visit history carried over to the new key
    let resp = app.get("/rango/about/", Some(&new_key)).await;
    assert_eq!(body_json(resp).await["visits"], 1);

    // The old key is dead
    let resp = app.get("/rango/restricted/", Some(&anonymous_key)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_logins_are_rejected() {
    let app = app().await;
    app.post(
        "/rango/register/",
        None,
        json!({ "username": "jill", "password": "right" }),
    )
    .await;

    let resp = app
        .post("/rango/login/", None, json!({ "username": "jill", "password": "wrong" }))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Invalid login details supplied");

    app.db
        .conn()
        .execute("UPDATE users SET is_active = 0 WHERE username = 'jill'", [])
        .unwrap();
    let resp = app
        .post("/rango/login/", None, json!({ "username": "jill", "password": "right" }))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"], "Your Rango account is disabled");
}

#[tokio::test]
async fn registration_validation_errors() {
    let app = app().await;
    let resp = app
        .post(
            "/rango/register/",
            None,
            json!({ "username": "bad name", "password": "", "website": "http://exa mple" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let errors = &body_json(resp).await["errors"];
    assert!(errors["username"].is_array());
    assert!(errors["password"].is_array());
    assert!(errors["website"].is_array());
}

#[tokio::test]
async fn admin_routes_need_key() {
    let app = app().await;

    let resp = app.get("/admin/pages", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/admin/pages")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/admin/pages")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let resp = app.send(request).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["total"], 8);
    assert!(body["pages"][0].get("category").is_some());
}

#[tokio::test]
async fn admin_delete_category() {
    let app = app().await;
    let delete = |id: i64| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/admin/categories/{}", id))
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
            .body(Body::empty())
            .unwrap()
    };

    let id: i64 = app
        .db
        .conn()
        .query_row("SELECT id FROM categories WHERE slug = 'django'", [], |r| r.get(0))
        .unwrap();

    assert_eq!(app.send(delete(id)).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.send(delete(id)).await.status(), StatusCode::NOT_FOUND);

    let resp = app.get("/rango/category/django/", None).await;
    assert!(body_json(resp).await["category"].is_null());
}

#[tokio::test]
async fn admin_disabled_without_key() {
    let app = app_with(SessionBackend::Memory, None).await;
    let request = Request::builder()
        .uri("/admin/categories")
        .header(header::AUTHORIZATION, "Bearer anything")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_fetches_single_records() {
    let app = app().await;
    let get = |uri: String| {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
            .body(Body::empty())
            .unwrap()
    };

    let id: i64 = app
        .db
        .conn()
        .query_row("SELECT id FROM categories WHERE slug = 'python'", [], |r| r.get(0))
        .unwrap();
    let resp = app.send(get(format!("/admin/categories/{}", id))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["likes"], 64);

    let resp = app.send(get("/admin/pages/99999".to_string())).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
