pub mod auth;
pub mod bm;
pub mod events;
pub mod health;
pub mod intake;
pub mod medications;
pub mod messages;
pub mod team;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::response::Response;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::services::feed::ChangeFeed;
    use crate::AppState;

    pub async fn setup_state() -> Arc<AppState> {
        // A single connection keeps the in-memory database alive and shared.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let mut config = Config::default();
        config.jwt.secret = "test-secret".to_string();

        Arc::new(AppState {
            db: pool,
            config,
            feed: ChangeFeed::default(),
        })
    }

    pub async fn request(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Sign up a fresh admin and return (token, caregiver_id, patient_id).
    pub async fn signup_admin(app: &Router, email: &str) -> (String, String, String) {
        let response = request(
            app,
            "POST",
            "/api/auth/signup",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": "correct-horse",
                "name": "Admin",
                "patient_name": "Patient"
            })),
        )
        .await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let body = body_json(response).await;
        (
            body["token"].as_str().unwrap().to_string(),
            body["caregiver"]["id"].as_str().unwrap().to_string(),
            body["caregiver"]["patient_id"].as_str().unwrap().to_string(),
        )
    }

    /// Invite an email into the admin's circle, then sign it up as a member.
    /// Returns the member's (token, caregiver_id).
    pub async fn join_member(app: &Router, admin_token: &str, email: &str) -> (String, String) {
        let invite = request(
            app,
            "POST",
            "/api/team/invite",
            Some(admin_token),
            Some(serde_json::json!({ "email": email, "name": "Member" })),
        )
        .await;
        assert_eq!(invite.status(), http::StatusCode::OK);

        let signup = request(
            app,
            "POST",
            "/api/auth/signup",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": "correct-horse",
                "name": "Member"
            })),
        )
        .await;
        assert_eq!(signup.status(), http::StatusCode::OK);
        let body = body_json(signup).await;
        (
            body["token"].as_str().unwrap().to_string(),
            body["caregiver"]["id"].as_str().unwrap().to_string(),
        )
    }
}
