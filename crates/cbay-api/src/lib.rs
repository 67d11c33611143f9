pub mod chats;
mod convert;
pub mod error;
pub mod extract;
pub mod images;
pub mod listings;
pub mod state;
pub mod users;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/by-email/{email}", get(users::get_user_by_email))
        .route(
            "/users/{user_id}",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        .route("/users/{user_id}/ratings", post(users::rate_user))
        .route("/users/{user_id}/chats", get(users::user_chats))
        .route("/listings", get(listings::filter_listings).post(listings::create_listing))
        .route(
            "/listings/{listing_id}",
            get(listings::get_listing)
                .patch(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/listings/{listing_id}/sold", put(listings::set_sold))
        .route(
            "/images/orphaned",
            get(images::orphaned_images).delete(images::purge_orphaned_images),
        )
        .route("/chats", post(chats::create_chat))
        .route("/chats/{chat_id}", get(chats::get_chat))
        .route("/chats/{chat_id}/members", post(chats::add_member))
        .route("/chats/{chat_id}/members/{user_id}", delete(chats::remove_member))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use cbay_db::Database;

    use super::*;

    fn app() -> Router {
        router(AppStateInner::new(Database::open_in_memory().unwrap()))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_user(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/users",
            Some(json!({
                "email": email,
                "first_name": "Test",
                "last_name": "Case",
                "university": "Texas A&M",
                "classification": "Senior"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_listing(app: &Router, owner: &str, name: &str, price: &str, categories: &[&str]) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/listings",
            Some(json!({
                "user_id": owner,
                "item_name": name,
                "price": price,
                "negotiable": false,
                "condition": "used",
                "location": "Campus",
                "categories": categories,
                "images": [format!("https://img.example.com/{name}.png")]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    fn listing_ids(body: &Value) -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_check() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn non_edu_email_is_unprocessable() {
        let (status, body) = send(
            &app(),
            "POST",
            "/users",
            Some(json!({
                "email": "nonstudent@gmail.com",
                "first_name": "Test",
                "last_name": "Case",
                "university": "Nowhere"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let app = app();
        create_user(&app, "ana@tamu.edu").await;
        let (status, body) = send(
            &app,
            "POST",
            "/users",
            Some(json!({
                "email": "ana@tamu.edu",
                "first_name": "Other",
                "last_name": "Person",
                "university": "Texas A&M"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn listing_for_unknown_owner_is_not_found() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/listings",
            Some(json!({
                "user_email": "ghost@tamu.edu",
                "item_name": "Desk",
                "price": "10.00",
                "negotiable": true,
                "condition": "used",
                "location": "Campus"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (_, all) = send(&app, "GET", "/listings", None).await;
        assert_eq!(all, json!([]));
    }

    #[tokio::test]
    async fn filter_listings_over_http() {
        let app = app();
        let owner = create_user(&app, "ana@tamu.edu").await;
        let book = create_listing(&app, &owner, "Calculus", "10", &["books"]).await;
        let futon = create_listing(&app, &owner, "Futon", "50", &["furniture"]).await;

        let (status, body) = send(&app, "GET", "/listings?maxPrice=20", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing_ids(&body), vec![book.clone()]);
        assert_eq!(body[0]["price"], "10.00");
        assert_eq!(body[0]["owner"]["email"], "ana@tamu.edu");
        assert_eq!(body[0]["categories"], json!(["books"]));

        let (_, body) = send(&app, "GET", "/listings?categories=books,furniture&university=a%26m", None).await;
        assert_eq!(listing_ids(&body).len(), 2);
        assert!(listing_ids(&body).contains(&futon));

        let (_, body) = send(&app, "GET", &format!("/listings?userID={owner}&name=FUT"), None).await;
        assert_eq!(listing_ids(&body), vec![futon.clone()]);

        let (status, _) = send(&app, "PUT", &format!("/listings/{futon}/sold"), Some(json!({ "sold": true }))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/listings?sold=false", None).await;
        assert_eq!(listing_ids(&body), vec![book]);
    }

    #[tokio::test]
    async fn malformed_filter_is_invalid_argument() {
        let (status, body) = send(&app(), "GET", "/listings?maxPrice=cheap", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");
        assert!(body["message"].as_str().unwrap().contains("maxPrice"));
    }

    #[tokio::test]
    async fn repeated_categories_are_merged() {
        let app = app();
        let owner = create_user(&app, "ana@tamu.edu").await;
        create_listing(&app, &owner, "Calculus", "10", &["books"]).await;
        create_listing(&app, &owner, "Futon", "50", &["furniture"]).await;
        create_listing(&app, &owner, "Bike", "80", &["outdoors"]).await;

        let (status, body) = send(&app, "GET", "/listings?categories=books&categories=furniture", None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(listing_ids(&body).len(), 2);

        let (status, body) = send(&app, "GET", "/listings?sold=true&sold=false", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");
        assert!(body["message"].as_str().unwrap().contains("sold"));
    }

    #[tokio::test]
    async fn undecodable_requests_get_json_errors() {
        let app = app();

        let (status, body) = send(&app, "GET", "/listings/42", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");

        let (status, body) = send(&app, "DELETE", "/chats/not-a-chat/members/nobody", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");

        let (status, body) = send(&app, "POST", "/users", Some(json!({ "email": 7 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");
        assert!(body["message"].is_string());

        let req = Request::builder()
            .method("POST")
            .uri("/chats")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "invalid_argument");
    }

    #[tokio::test]
    async fn owner_email_lookup_ignores_case() {
        let app = app();
        let id = create_user(&app, "ana@tamu.edu").await;

        let (status, body) = send(&app, "GET", "/users/by-email/ANA@tamu.edu", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());

        let (status, body) = send(
            &app,
            "POST",
            "/listings",
            Some(json!({
                "user_email": "Ana@Tamu.EDU",
                "item_name": "Lamp",
                "price": "5",
                "negotiable": false,
                "condition": "used",
                "location": "Campus"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["owner"]["id"], id.as_str());
    }

    #[tokio::test]
    async fn deleting_listing_orphans_images() {
        let app = app();
        let owner = create_user(&app, "ana@tamu.edu").await;
        let desk = create_listing(&app, &owner, "Desk", "40", &["furniture"]).await;

        let (status, _) = send(&app, "DELETE", &format!("/listings/{desk}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/listings/{desk}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, "GET", "/images/orphaned", None).await;
        assert_eq!(body["images"][0]["image_url"], "https://img.example.com/Desk.png");
        assert_eq!(body["images"][0]["listing_id"], Value::Null);

        let (_, body) = send(&app, "DELETE", "/images/orphaned", None).await;
        assert_eq!(body["purged"], 1);
    }

    #[tokio::test]
    async fn update_and_rate_user() {
        let app = app();
        let id = create_user(&app, "ana@tamu.edu").await;

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/users/{id}"),
            Some(json!({ "bio": "Selling books", "classification": "Graduate" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bio"], "Selling books");
        assert_eq!(body["classification"], "Graduate");

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/users/{id}"),
            Some(json!({ "classification": "senior" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = send(&app, "POST", &format!("/users/{id}/ratings"), Some(json!({ "thumbs": "up" }))).await;
        assert_eq!(body["thumbs_up"], 1);

        let (status, body) = send(&app, "GET", "/users/by-email/ana@tamu.edu", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());
    }

    #[tokio::test]
    async fn chat_membership_over_http() {
        let app = app();
        let a = create_user(&app, "a@tamu.edu").await;
        let b = create_user(&app, "b@tamu.edu").await;

        let (status, _) = send(&app, "POST", "/chats", Some(json!({ "members": [a, a] }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, chat) = send(&app, "POST", "/chats", Some(json!({ "members": [a, b] }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let chat_id = chat["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "DELETE", &format!("/chats/{chat_id}/members/{b}"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, chats) = send(&app, "GET", &format!("/users/{a}/chats"), None).await;
        assert_eq!(chats[0]["id"], chat_id.as_str());
        assert_eq!(chats[0]["members"], json!([a, b]));
    }
}
