//! Shared setup for router-level tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
    Router,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use blog_dashboard::{
    config::Config,
    db::{
        create_test_pool,
        migrations::run_migrations,
        repositories::{
            SqlxCategoryRepository, SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
        },
    },
    forms::UserForm,
    media::MediaStore,
    models::User,
    services::{CategoryService, PostService, UserService},
    view::ViewEngine,
    web::{build_router, AppState},
};

pub const PASSWORD: &str = "correct-horse-battery";
const BOUNDARY: &str = "----dashboard-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Holds the media root alive for the test
    pub media_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");

    let media_dir = tempfile::tempdir().expect("Failed to create media dir");
    let mut config = Config::default();
    config.upload.media_root = media_dir.path().to_path_buf();

    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let state = AppState {
        user_service: Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        )),
        category_service: Arc::new(CategoryService::new(category_repo.clone())),
        post_service: Arc::new(PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            category_repo,
            MediaStore::new(config.upload.clone()),
        )),
        views: Arc::new(ViewEngine::embedded().expect("Templates should load")),
        config: Arc::new(config),
    };

    TestApp {
        router: build_router(state.clone()),
        state,
        media_dir,
    }
}

impl TestApp {
    pub async fn create_user(&self, username: &str, is_staff: bool) -> User {
        let form = UserForm {
            username: username.to_string(),
            is_staff,
            password1: PASSWORD.to_string(),
            password2: PASSWORD.to_string(),
            ..UserForm::new()
        };
        self.state
            .user_service
            .create(&form)
            .await
            .expect("Failed to create user")
    }

    /// Session cookie header value for `username`
    pub async fn login(&self, username: &str) -> String {
        let (session, _) = self
            .state
            .user_service
            .login(username, PASSWORD)
            .await
            .expect("Login should succeed");
        format!("session={}", session.id)
    }

    /// A logged-in staff account
    pub async fn staff_cookie(&self) -> String {
        self.create_user("staff", true).await;
        self.login("staff").await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router should respond")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// POST a multipart form; `image` is (file name, content type, bytes)
    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<(&str, &str, &[u8])>,
    ) -> Response<Body> {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, data)) = image {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"featured_image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, file_name, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Count the files stored under the media root
    pub fn stored_files(&self) -> usize {
        fn walk(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                walk(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        walk(self.media_dir.path())
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
