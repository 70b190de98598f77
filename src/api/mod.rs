pub mod activities;
pub mod auth;
pub mod badges;
pub mod comments;
pub mod photos;
pub mod social;
pub mod users;

use axum::{response::Html, routing::get, Router};
use sqlx::PgPool;

use crate::{db, error::AppError};

pub fn router(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(activities::routes())
        .merge(comments::routes())
        .merge(social::routes())
        .merge(badges::routes())
        .merge(photos::routes())
        .with_state(pool)
}

async fn index() -> Html<&'static str> {
    Html("<h1>Still Strava</h1>")
}

pub(crate) async fn require_user(pool: &PgPool, id: i32) -> Result<(), AppError> {
    if db::users::user_exists(pool, id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("User"))
    }
}

pub(crate) async fn require_activity(pool: &PgPool, id: i32) -> Result<(), AppError> {
    if db::activities::activity_exists(pool, id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("Activity"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::{auth, db::tests::user};

    // The pool never connects: every request here is answered before a query runs.
    async fn send(request: Request<Body>) -> Response {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        router(pool).oneshot(request).await.unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sign_in(pool: &PgPool, username: &str) -> (i32, String) {
        let id = user(pool, username).await;
        let token = auth::generate_token();
        db::sessions::create_session(pool, id, &auth::token_digest(&token))
            .await
            .unwrap();
        (id, token)
    }

    async fn call(
        pool: &PgPool,
        method: Method,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = router(pool.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post_activity(pool: &PgPool, token: &str, title: &str) -> i64 {
        let (status, body) = call(
            pool,
            Method::POST,
            "/activities",
            token,
            Some(json!({ "title": title, "activity_type": "Bird Watching" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn index_serves_the_banner() {
        let response = send(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>Still Strava</h1>");
    }

    #[tokio::test]
    async fn me_requires_a_token() {
        let response = send(Request::get("/me").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Missing bearer token");
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let create = json_request(
            Method::POST,
            "/activities",
            json!({ "title": "Dusk", "activity_type": "Stargazing" }),
        );
        assert_eq!(send(create).await.status(), StatusCode::UNAUTHORIZED);

        let like = Request::post("/activities/1/like").body(Body::empty()).unwrap();
        assert_eq!(send(like).await.status(), StatusCode::UNAUTHORIZED);

        let follow = Request::post("/users/2/follow").body(Body::empty()).unwrap();
        assert_eq!(send(follow).await.status(), StatusCode::UNAUTHORIZED);

        let comment = json_request(
            Method::POST,
            "/comments",
            json!({ "activity_id": 1, "content": "Nice" }),
        );
        assert_eq!(send(comment).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_authorization_is_rejected() {
        let request = Request::get("/users/search?q=owl")
            .header(header::AUTHORIZATION, "Basic b3dsOmhvb3Q=")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(request).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn following_feed_needs_login() {
        let request = Request::get("/activities?following=true")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(request).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn blank_search_is_a_bad_request() {
        let request = Request::get("/users/search?q=%20").body(Body::empty()).unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing search term");
    }

    #[tokio::test]
    async fn comments_need_an_activity_id() {
        let response = send(Request::get("/comments").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signup_validates_before_touching_storage() {
        let request = json_request(
            Method::POST,
            "/signup",
            json!({ "username": "fern", "email": "fern@woods.org", "password": "123" }),
        );
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await["error"],
            "Password must be at least 6 characters long"
        );
    }

    #[tokio::test]
    async fn reset_rejects_malformed_tokens() {
        let request = json_request(
            Method::POST,
            "/reset-password",
            json!({ "token": "not-a-token", "password": "longenough" }),
        );
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Invalid or expired reset token"
        );
    }

    #[tokio::test]
    async fn photo_endpoint_rejects_heic() {
        let request = json_request(
            Method::POST,
            "/photos",
            json!({ "data_url": "data:image/heic;base64,AAAA", "file_name": "IMG_1.heic" }),
        );
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .starts_with("HEIC files are not supported"));
    }

    #[tokio::test]
    async fn photo_endpoint_scales_large_images() {
        let img = image::RgbImage::from_pixel(1200, 1600, image::Rgb([200, 120, 40]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png));

        let response = send(json_request(
            Method::POST,
            "/photos",
            json!({ "data_url": data_url, "file_name": "tidepool.png" }),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["width"], 450);
        assert_eq!(body["height"], 600);
        assert!(body["data_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn badge_catalog_is_static() {
        let response = send(Request::get("/badges").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn activity_type_catalog_is_served() {
        let response = send(Request::get("/activity-types").body(Body::empty()).unwrap()).await;
        let body = body_json(response).await;
        assert_eq!(body[0], "Hammocking");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_the_owner_edits_or_deletes_an_activity(pool: PgPool) {
        let (_, owner) = sign_in(&pool, "heron").await;
        let (_, other) = sign_in(&pool, "otter").await;
        let id = post_activity(&pool, &owner, "Marsh at dawn").await;
        let uri = format!("/activities/{id}");
        let patch = json!({ "title": "Marsh at noon" });

        let (status, body) = call(&pool, Method::PATCH, &uri, &other, Some(patch.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].is_string());
        let (status, _) = call(&pool, Method::DELETE, &uri, &other, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&pool, Method::PATCH, &uri, &owner, Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Marsh at noon");
        assert_eq!(body["activity_type"], "Bird Watching");

        let (status, _) = call(&pool, Method::DELETE, &uri, &owner, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&pool, Method::GET, &uri, &owner, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn comment_removal_rights(pool: PgPool) {
        let (_, owner) = sign_in(&pool, "cedar").await;
        let (_, author) = sign_in(&pool, "brook").await;
        let (_, stranger) = sign_in(&pool, "moss").await;
        let activity_id = post_activity(&pool, &owner, "Creek sit").await;

        let mut comment_ids = Vec::new();
        for _ in 0..2 {
            let (status, body) = call(
                &pool,
                Method::POST,
                "/comments",
                &author,
                Some(json!({ "activity_id": activity_id, "content": "So calm" })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            comment_ids.push(body["id"].as_i64().unwrap());
        }
        let first = format!("/comments/{}", comment_ids[0]);
        let second = format!("/comments/{}", comment_ids[1]);

        let edit = Some(json!({ "content": "Edited" }));
        let (status, _) = call(&pool, Method::PATCH, &first, &stranger, edit.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&pool, Method::PATCH, &first, &owner, edit).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&pool, Method::DELETE, &first, &stranger, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&pool, Method::DELETE, &first, &owner, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&pool, Method::DELETE, &second, &author, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&pool, Method::DELETE, &second, &author, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn liking_and_following_twice_changes_nothing(pool: PgPool) {
        let (owner_id, owner) = sign_in(&pool, "fern").await;
        let (_, fan) = sign_in(&pool, "wren").await;
        let id = post_activity(&pool, &owner, "Cloud watching").await;
        let like = format!("/activities/{id}/like");

        for _ in 0..2 {
            let (status, body) = call(&pool, Method::POST, &like, &fan, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["like_count"], 1);
            assert_eq!(body["user_liked"], true);
        }

        let follow = format!("/users/{owner_id}/follow");
        for _ in 0..2 {
            let (status, body) = call(&pool, Method::POST, &follow, &fan, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["follower_count"], 1);
        }

        let (status, _) = call(&pool, Method::POST, &follow, &owner, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn earned_badges_survive_deleting_activities(pool: PgPool) {
        let (id, token) = sign_in(&pool, "juniper").await;
        let activity_id = post_activity(&pool, &token, "First sit").await;
        let badges_uri = format!("/users/{id}/badges");

        let first_activity = |badges: &Value| {
            badges
                .as_array()
                .unwrap()
                .iter()
                .find(|b| b["id"] == "first_activity")
                .cloned()
                .unwrap()
        };

        let (status, body) = call(&pool, Method::GET, &badges_uri, &token, None).await;
        assert_eq!(status, StatusCode::OK);
        let earned = first_activity(&body);
        assert_eq!(earned["earned"], true);
        assert!(earned["earned_date"].is_string());

        let uri = format!("/activities/{activity_id}");
        let (status, _) = call(&pool, Method::DELETE, &uri, &token, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = call(&pool, Method::GET, &badges_uri, &token, None).await;
        let kept = first_activity(&body);
        assert_eq!(kept["earned"], true);
        assert_eq!(kept["earned_date"], earned["earned_date"]);

        let stored = db::badges::earned_badges(&pool, id).await.unwrap();
        assert!(stored.iter().any(|b| b.badge_id == "first_activity"));
    }
}
