//! End-to-end flows through the full router: registration, login, and the
//! admin approval workflow.

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use warden::config::Config;
use warden::db::User;
use warden::domain::{Role, UserId};
use warden::web::AppState;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

/// One browser: remembers the session cookie between requests.
struct Client {
    router: Router,
    cookie: Option<String>,
}

async fn spawn_app() -> TestApp {
    let db_path =
        std::env::temp_dir().join(format!("warden-web-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_url = format!("sqlite:{}", db_path.display());
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = warden::web::create_app_state(config, None)
        .await
        .expect("failed to create app state");
    let router = warden::web::router(state.clone())
        .await
        .expect("failed to build router");

    TestApp { router, state }
}

impl TestApp {
    fn client(&self) -> Client {
        Client {
            router: self.router.clone(),
            cookie: None,
        }
    }

    async fn user(&self, email: &str) -> User {
        self.state
            .store
            .get_user_by_email_with_password(email)
            .await
            .unwrap()
            .expect("user should exist")
            .0
    }

    async fn roles(&self) -> Vec<(String, Role)> {
        self.state
            .store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| (u.email, u.role))
            .collect()
    }
}

impl Client {
    async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string();
            self.cookie = Some(pair);
        }

        response
    }

    async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_form(&mut self, uri: &str, form: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn register(&mut self, username: &str, email: &str, role: &str) -> Response<Body> {
        self.post_form(
            "/auth/register",
            &format!("username={username}&email={email}&password=secret-pw&role={role}"),
        )
        .await
    }

    async fn login(&mut self, email: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/auth/login",
            &format!("email={email}&password={password}"),
        )
        .await
    }
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn set_cookie(response: &Response<Body>) -> &str {
    response.headers()[header::SET_COOKIE].to_str().unwrap()
}

fn max_age(set_cookie: &str) -> i64 {
    set_cookie
        .split(';')
        .find_map(|attr| attr.trim().strip_prefix("Max-Age="))
        .expect("session cookie should carry Max-Age")
        .parse()
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Registers an admin, a plain user and one pending account, and logs the
/// admin in.
async fn seeded() -> (TestApp, Client) {
    let app = spawn_app().await;

    let mut anon = app.client();
    anon.register("root", "root%40example.com", "Admin").await;
    anon.register("plain", "plain%40example.com", "User").await;
    anon.register("hopeful", "hopeful%40example.com", "Admin").await;

    let mut admin = app.client();
    let response = admin.login("root%40example.com", "secret-pw").await;
    assert_eq!(response.status(), StatusCode::FOUND);

    (app, admin)
}

#[tokio::test]
async fn test_landing_page_for_anonymous() {
    let app = spawn_app().await;
    let mut client = app.client();

    let response = client.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Welcome"));
    assert!(body.contains(r#"href="/auth/register""#));
}

#[tokio::test]
async fn test_register_then_login() {
    let app = spawn_app().await;
    let mut client = app.client();

    let response = client.register("ana", "ana%40example.com", "User").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/login");
    assert_eq!(app.user("ana@example.com").await.role, Role::User);

    let body = body_text(client.get("/auth/login").await).await;
    assert!(body.contains("Your account has been created! You can now log in."));

    let response = client.login("ana%40example.com", "secret-pw").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/dashboard");

    let response = client.get("/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Login successful!"));
    assert!(body.contains("Hello, ana."));

    let response = client.get("/").await;
    assert_eq!(location(&response), "/dashboard");
    let response = client.get("/auth/register").await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_first_admin_then_pending() {
    let app = spawn_app().await;
    let mut client = app.client();

    let response = client.register("first", "first%40example.com", "Admin").await;
    assert_eq!(location(&response), "/auth/login");

    let response = client.register("second", "second%40example.com", "Admin").await;
    assert_eq!(location(&response), "/admin_dashboard");

    let response = client.register("third", "third%40example.com", "Admin").await;
    assert_eq!(location(&response), "/admin_dashboard");

    assert_eq!(
        app.roles().await,
        vec![
            ("first@example.com".to_string(), Role::Admin),
            ("second@example.com".to_string(), Role::Pending),
            ("third@example.com".to_string(), Role::Pending),
        ]
    );

    // The pending registrant is anonymous, so the admin dashboard bounces to login.
    let response = client.get("/admin_dashboard").await;
    assert_eq!(location(&response), "/auth/login?next=%2Fadmin_dashboard");
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let app = spawn_app().await;
    let mut client = app.client();
    client.register("ana", "ana%40example.com", "User").await;

    let wrong_password = client.login("ana%40example.com", "nope").await;
    let wrong_status = wrong_password.status();
    let wrong_body = body_text(wrong_password).await;

    let unknown_email = client.login("ghost%40example.com", "secret-pw").await;
    let unknown_status = unknown_email.status();
    let unknown_body = body_text(unknown_email).await;

    assert_eq!(wrong_status, StatusCode::OK);
    assert_eq!(wrong_status, unknown_status);
    let message = "Login unsuccessful. Please check email and password";
    assert!(wrong_body.contains(message));
    assert!(unknown_body.contains(message));
    assert_eq!(
        wrong_body.replace("ana@example.com", "EMAIL"),
        unknown_body.replace("ghost@example.com", "EMAIL")
    );

    let response = client.get("/dashboard").await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_validation_errors_rerender_form() {
    let app = spawn_app().await;
    let mut client = app.client();

    let response = client
        .post_form("/auth/register", "username=&email=nope&password=&role=Pending")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("This field is required."));
    assert!(body.contains("Invalid email address."));
    assert!(body.contains("Not a valid choice."));
    assert!(app.roles().await.is_empty());

    client.register("ana", "ana%40example.com", "User").await;
    let response = client.register("other", "ana%40example.com", "User").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("That email is already registered."));
    assert_eq!(app.roles().await.len(), 1);
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let app = spawn_app().await;
    let mut client = app.client();

    for path in ["/dashboard", "/admin_dashboard", "/auth/logout", "/approve_admin/1"] {
        let response = client.get(path).await;
        assert_eq!(response.status(), StatusCode::FOUND, "{path}");
        assert_eq!(
            location(&response),
            format!("/auth/login?next={}", urlencoding::encode(path))
        );
    }
}

#[tokio::test]
async fn test_next_is_followed_only_on_site() {
    let app = spawn_app().await;
    let mut anon = app.client();
    anon.register("ana", "ana%40example.com", "User").await;

    let mut client = app.client();
    let response = client
        .post_form(
            "/auth/login?next=%2Fadmin_dashboard",
            "email=ana%40example.com&password=secret-pw",
        )
        .await;
    assert_eq!(location(&response), "/admin_dashboard");

    let mut client = app.client();
    let response = client
        .post_form(
            "/auth/login?next=https%3A%2F%2Fevil.example%2F",
            "email=ana%40example.com&password=secret-pw",
        )
        .await;
    assert_eq!(location(&response), "/dashboard");

    let mut client = app.client();
    let response = client
        .post_form(
            "/auth/login?next=%2F%2Fevil.example",
            "email=ana%40example.com&password=secret-pw",
        )
        .await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_admin_approves_pending() {
    let (app, mut admin) = seeded().await;
    let hopeful = app.user("hopeful@example.com").await;

    let body = body_text(admin.get("/admin_dashboard").await).await;
    assert!(body.contains("hopeful"));
    assert!(body.contains(&format!("/approve_admin/{}", hopeful.id)));
    assert!(!body.contains("plain@example.com"));

    let response = admin.get(&format!("/approve_admin/{}", hopeful.id)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/admin_dashboard");

    assert_eq!(
        app.roles().await,
        vec![
            ("root@example.com".to_string(), Role::Admin),
            ("plain@example.com".to_string(), Role::User),
            ("hopeful@example.com".to_string(), Role::Admin),
        ]
    );

    let body = body_text(admin.get("/admin_dashboard").await).await;
    assert!(body.contains("User hopeful has been approved as an Admin."));
    assert!(body.contains("No pending admin requests."));
}

#[tokio::test]
async fn test_admin_rejects_pending() {
    let (app, mut admin) = seeded().await;
    let hopeful = app.user("hopeful@example.com").await;

    let response = admin.get(&format!("/reject_admin/{}", hopeful.id)).await;
    assert_eq!(location(&response), "/admin_dashboard");
    assert_eq!(app.user("hopeful@example.com").await.role, Role::User);

    let body = body_text(admin.get("/admin_dashboard").await).await;
    assert!(body.contains("User hopeful has been rejected as an Admin."));
}

#[tokio::test]
async fn test_non_admin_cannot_decide() {
    let (app, _admin) = seeded().await;
    let hopeful = app.user("hopeful@example.com").await;
    let before = app.roles().await;

    let mut plain = app.client();
    plain.login("plain%40example.com", "secret-pw").await;

    let response = plain.get(&format!("/approve_admin/{}", hopeful.id)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/dashboard");
    let body = body_text(plain.get("/dashboard").await).await;
    assert!(body.contains("You do not have permission to approve users."));

    let response = plain.get(&format!("/reject_admin/{}", hopeful.id)).await;
    assert_eq!(location(&response), "/dashboard");
    let body = body_text(plain.get("/dashboard").await).await;
    assert!(body.contains("You do not have permission to reject users."));

    let response = plain.get("/admin_dashboard").await;
    assert_eq!(location(&response), "/dashboard");

    assert_eq!(app.roles().await, before);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (app, mut admin) = seeded().await;
    let before = app.roles().await;

    for path in ["/approve_admin/9999", "/reject_admin/9999", "/approve_admin/abc"] {
        let response = admin.get(path).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }

    assert_eq!(app.roles().await, before);
}

#[tokio::test]
async fn test_deciding_a_settled_user_changes_nothing() {
    let (app, mut admin) = seeded().await;
    let plain = app.user("plain@example.com").await;
    let before = app.roles().await;

    let response = admin.get(&format!("/approve_admin/{}", plain.id)).await;
    assert_eq!(location(&response), "/admin_dashboard");
    assert_eq!(app.roles().await, before);

    let body = body_text(admin.get("/admin_dashboard").await).await;
    assert!(body.contains("User plain is not awaiting admin approval."));
}

#[tokio::test]
async fn test_remember_me_extends_session() {
    let app = spawn_app().await;
    app.client().register("ana", "ana%40example.com", "User").await;

    let mut short = app.client();
    let response = short.login("ana%40example.com", "secret-pw").await;
    assert_eq!(max_age(set_cookie(&response)), 3600);

    let mut long = app.client();
    let response = long
        .post_form(
            "/auth/login",
            "email=ana%40example.com&password=secret-pw&remember=y",
        )
        .await;
    let remembered = max_age(set_cookie(&response));
    assert!(remembered > 364 * 24 * 3600, "got {remembered}");
    assert!(remembered <= 365 * 24 * 3600, "got {remembered}");
}

#[tokio::test]
async fn test_login_issues_fresh_session_id() {
    let app = spawn_app().await;
    app.client().register("ana", "ana%40example.com", "User").await;

    // An anonymous visit to a protected page starts a session for the flash.
    let mut client = app.client();
    client.get("/dashboard").await;
    let before = client.cookie.clone().expect("anonymous session cookie");

    let response = client
        .post_form(
            "/auth/login?next=%2Fdashboard",
            "email=ana%40example.com&password=secret-pw",
        )
        .await;
    assert_eq!(location(&response), "/dashboard");
    let after = client.cookie.clone().unwrap();

    assert_ne!(before, after);
    assert!(after.starts_with("warden_session="));
}

#[tokio::test]
async fn test_responses_carry_logged_in_user() {
    let app = spawn_app().await;
    app.client().register("ana", "ana%40example.com", "User").await;
    let ana = app.user("ana@example.com").await;

    let mut client = app.client();
    let response = client.login("ana%40example.com", "secret-pw").await;
    assert_eq!(response.extensions().get::<UserId>(), Some(&ana.id));

    let response = client.get("/dashboard").await;
    assert_eq!(response.extensions().get::<UserId>(), Some(&ana.id));

    let response = app.client().get("/").await;
    assert!(response.extensions().get::<UserId>().is_none());
}

#[tokio::test]
async fn test_logout_ends_session() {
    let (_app, mut admin) = seeded().await;

    let response = admin.get("/auth/logout").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let body = body_text(admin.get("/").await).await;
    assert!(body.contains("You have been logged out."));

    let response = admin.get("/dashboard").await;
    assert_eq!(location(&response), "/auth/login?next=%2Fdashboard");
}

#[tokio::test]
async fn test_support_routes() {
    let app = spawn_app().await;
    let mut client = app.client();

    let response = client.get("/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get("/static/style.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

    let response = client.get("/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get("/").await;
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}
