use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use fitness_center::settings::Settings;
use fitness_center::store::BackendKind;
use fitness_center::{AppState, build_router};
use serde_json::{Value, json};
use tower::Service;

const TOKEN: &str = "test-token-123";

/// Helper function to create app state on a fresh in-memory database
async fn create_test_state() -> AppState {
    let settings = Settings {
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        storage_backend: BackendKind::Sql,
        mongo_url: None,
        mongo_database: "fitness_center_test".to_string(),
        debug: true,
        auth_token: TOKEN.to_string(),
        enable_swagger: true,
        port: 8080,
    };
    AppState::connect(settings).await.unwrap()
}

async fn create_test_app() -> Router {
    build_router(create_test_state().await)
}

/// Helper to send a request and decode the JSON response body
async fn send(app: &mut Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.call(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authorized(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn post(uri: &str, body: Value) -> Request<Body> {
    authorized(Method::POST, uri, Some(body))
}

fn person(email: &str) -> Value {
    json!({
        "first_name": "Jane",
        "last_name": "Doe",
        "email": email,
        "phone": "12345678",
        "address": "Main Street 1",
        "date_of_birth": "1990-05-17"
    })
}

fn member(email: &str) -> Value {
    let mut body = person(email);
    body["join_date"] = json!("2025-01-06");
    body
}

fn class(max_participants: i64) -> Value {
    json!({
        "class_name": "Spinning",
        "class_type": "cardio",
        "duration_min": 45,
        "max_participants": max_participants,
        "center_id": 1,
        "schedule_date": "2025-11-24",
        "start_time": "18:00:00",
        "end_time": "18:45:00"
    })
}

async fn create(app: &mut Router, uri: &str, body: Value) -> i64 {
    let (status, created) = send(app, post(uri, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let mut app = create_test_app().await;

    let (status, body) = send(&mut app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Fitness Center API");
    assert!(body["endpoints"]["/bookings"].is_string());
}

#[tokio::test]
async fn test_healthz_ready() {
    let mut app = create_test_app().await;

    let (status, body) = send(&mut app, get("/healthz/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "sql");
}

#[tokio::test]
async fn test_healthz_live() {
    let mut app = create_test_app().await;
    let (status, body) = send(&mut app, get("/healthz/live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_mutation_requires_token() {
    let mut app = create_test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/classes")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(class(10).to_string()))
        .unwrap();
    let (status, body) = send(&mut app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authentication token");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/classes")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(class(10).to_string()))
        .unwrap();
    let (status, _) = send(&mut app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay public.
    let (status, body) = send(&mut app, get("/classes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_token_in_query() {
    let mut app = create_test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/products?token={TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"product_name": "Chalk", "price": 25.0, "stock_quantity": 10}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&mut app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product_name"], "Chalk");
}

#[tokio::test]
async fn test_single_seat_class_admits_one_member() {
    let mut app = create_test_app().await;
    let class_id = create(&mut app, "/classes", class(1)).await;
    let first = create(&mut app, "/members", member("x@gym.dk")).await;
    let second = create(&mut app, "/members", member("y@gym.dk")).await;

    let (status, booking) = send(
        &mut app,
        post("/bookings", json!({"class_id": class_id, "member_id": first})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "CONFIRMED");

    let (status, body) = send(
        &mut app,
        post("/bookings", json!({"class_id": class_id, "member_id": second})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Class is already full");
    assert_eq!(body["reasons"], json!(["Class is already full"]));

    let (_, bookings) = send(&mut app, get("/bookings")).await;
    assert_eq!(bookings.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_repeat_booking_reports_every_reason() {
    let mut app = create_test_app().await;
    let class_id = create(&mut app, "/classes", class(1)).await;
    let member_id = create(&mut app, "/members", member("again@gym.dk")).await;
    let booking = json!({"class_id": class_id, "member_id": member_id});

    create(&mut app, "/bookings", booking.clone()).await;
    let (status, body) = send(&mut app, post("/bookings", booking)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "You have already booked this class, Class is already full"
    );
    assert_eq!(
        body["reasons"],
        json!(["You have already booked this class", "Class is already full"])
    );
}

#[tokio::test]
async fn test_malformed_body_is_json_bad_request() {
    let mut app = create_test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/bookings")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"class_id": "one""#))
        .unwrap();
    let (status, body) = send(&mut app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = send(&mut app, post("/classes", json!({"class_name": "Yoga"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn test_booking_unknown_class() {
    let mut app = create_test_app().await;
    let member_id = create(&mut app, "/members", member("lost@gym.dk")).await;

    let (status, body) = send(
        &mut app,
        post("/bookings", json!({"class_id": 77, "member_id": member_id})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reasons"], json!(["Class does not exist"]));
}

#[tokio::test]
async fn test_member_and_employee_share_person() {
    let mut app = create_test_app().await;

    let (status, created) = send(&mut app, post("/members", member("coach@gym.dk"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["person_origin"], "created");

    let mut employee = person("Coach@Gym.dk");
    employee["hire_date"] = json!("2024-08-01");
    employee["salary"] = json!(32000.0);
    employee["employment_status"] = json!("active");
    let (status, hired) = send(&mut app, post("/employees", employee)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(hired["person_origin"], "found");
    assert_eq!(hired["person"]["id"], created["person"]["id"]);

    let (status, body) = send(&mut app, post("/members", member("coach@gym.dk"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Member already exists");
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let mut app = create_test_app().await;

    let (status, body) = send(
        &mut app,
        post(
            "/memberships",
            json!({"membership_name": "Platinum", "price_per_month": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid PricePerMonth provided.");

    let mut backwards = class(10);
    backwards["end_time"] = json!("17:00:00");
    let (status, body) = send(&mut app, post("/classes", backwards)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Start time must be before end time");

    let mut bad_phone = member("phone@gym.dk");
    bad_phone["phone"] = json!("123");
    let (status, _) = send(&mut app, post("/members", bad_phone)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_and_malformed_ids() {
    let mut app = create_test_app().await;

    let (status, body) = send(&mut app, get("/products/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");

    let (status, body) = send(&mut app, get("/members/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid Member id: abc");
}

#[tokio::test]
async fn test_update_and_delete_membership() {
    let mut app = create_test_app().await;
    let id = create(
        &mut app,
        "/memberships",
        json!({"membership_name": "Basic", "price_per_month": 199.0}),
    )
    .await;
    let uri = format!("/memberships/{id}");

    let (status, updated) = send(
        &mut app,
        authorized(
            Method::PUT,
            &uri,
            Some(json!({"membership_name": "Basic+", "price_per_month": 249.456})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["membership_name"], "Basic+");
    assert_eq!(updated["price_per_month"], 249.46);

    let (status, body) = send(&mut app, authorized(Method::DELETE, &uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&mut app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let mut app = create_test_app().await;

    let (status, body) = send(&mut app, get("/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/bookings"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}
