use std::sync::Arc;

use ac2_server::{
    api::{AppState, setup_routes},
    config::Limits,
    store::CommitmentStore,
};
use actix_web::{App, http::StatusCode, test, web};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

fn state() -> web::Data<AppState> {
    web::Data::new(AppState {
        store: Arc::new(CommitmentStore::temporary().unwrap()),
        limits: Limits::default(),
        recently_published_limit: 10,
    })
}

fn objective_body(names: &[&str], strategy: &str, minimum: Value) -> Value {
    let mut body = json!({
        "title": "Tenants union",
        "description": "Withhold rent until repairs are made",
        "invited_names": names,
        "resolution_date": (Utc::now() + Duration::days(7)).to_rfc3339(),
        "resolution_strategy": strategy,
    });
    if let Value::Object(map) = &mut body {
        if let Value::Object(extra) = minimum {
            map.extend(extra);
        }
    }
    body
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state.clone()).configure(setup_routes)).await
    };
}

macro_rules! create {
    ($app:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/objective")
            .set_json($body)
            .to_request();
        let resp: Value = test::call_and_read_body_json(&$app, req).await;
        resp["objective_id"].as_str().unwrap().to_owned()
    }};
}

macro_rules! commit {
    ($app:expr, $id:expr, $name:expr, $number:expr) => {{
        let req = test::TestRequest::patch()
            .uri(&format!("/commit/{}", $id))
            .set_json(json!({ "name": $name, "Number": $number }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

macro_rules! get_json {
    ($app:expr, $uri:expr) => {{
        let req = test::TestRequest::get().uri($uri).to_request();
        let resp = test::call_service(&$app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

#[actix_web::test]
async fn banner_and_health() {
    let state = state();
    let app = app!(state);

    let (status, body) = get_json!(app, "/");
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Running"));

    let (status, body) = get_json!(app, "/health");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objectives"], json!(0));
}

#[actix_web::test]
async fn staggered_thresholds_reveal_in_order() {
    let state = state();
    let app = app!(state);

    let names: Vec<String> = (0..10).map(|i| format!("member {i}")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let id = create!(app, objective_body(&names, "DEADLINE", json!({"minimum_number": 1})));

    let (status, body) = commit!(app, id, "member 0", 2);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Commitment stored."));
    assert!(!body["ciphertext"].as_str().unwrap().is_empty());

    let (_, body) = commit!(app, id, "member 1", 3);
    assert_eq!(body["revealed"], json!(1));
    let (_, body) = commit!(app, id, "member 2", 5);
    assert_eq!(body["revealed"], json!(1));

    let (status, view) = get_json!(app, &format!("/objective/{id}"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["eligible_count"], json!(10));
    assert_eq!(view["committed_people"], json!(3));
    assert_eq!(view["closed"], json!(false));
    assert_eq!(view["committers"], json!(["member 0", "member 1"]));

    let commitments = view["commitments"].as_array().unwrap();
    assert_eq!(commitments[0]["decrypted_name"], json!("member 0"));
    assert_eq!(commitments[1]["decrypted_name"], json!("member 1"));
    assert_eq!(commitments[2]["decrypted"], json!(false));
    assert_eq!(commitments[2]["decrypted_name"], Value::Null);

    // coefficients and points travel as decimal strings
    let coefficients = commitments[0]["coefficients"].as_array().unwrap();
    assert_eq!(coefficients.len(), 2);
    assert!(
        coefficients
            .iter()
            .all(|c| c.as_str().unwrap().chars().all(|ch| ch.is_ascii_digit()))
    );
    let points = commitments[2]["points"].as_array().unwrap();
    assert_eq!(points.len(), 10);
    assert!(points[0].as_array().unwrap().iter().all(Value::is_string));

    let (status, points) = get_json!(app, &format!("/objective/{id}/points"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points.as_array().unwrap().len(), 30);
}

#[actix_web::test]
async fn asap_closes_and_rejects_late_commitments() {
    let state = state();
    let app = app!(state);

    let id = create!(app, objective_body(&["a", "b", "c"], "asap", json!({})));

    let (_, body) = commit!(app, id, "a", 1);
    assert_eq!(body["revealed"], json!(1));
    assert_eq!(body["closed"], json!(true));

    let (status, body) = commit!(app, id, "b", 1);
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already resolved"));

    let (_, published) = get_json!(app, "/recently_published");
    let published = published.as_array().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0]["objective_id"], json!(id));
    assert_eq!(published[0]["committers"], json!(["a"]));
}

#[actix_web::test]
async fn minimum_percentage_gates_reveals() {
    let state = state();
    let app = app!(state);

    let id = create!(
        app,
        objective_body(
            &["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"],
            "DEADLINE",
            json!({"minimum_percentage": 50})
        )
    );

    let (_, view) = get_json!(app, &format!("/objective/{id}"));
    assert_eq!(view["minimum_number"], json!(5));

    commit!(app, id, "a", 1);
    let (_, body) = commit!(app, id, "b", 1);
    assert_eq!(body["revealed"], json!(0));

    let (_, view) = get_json!(app, &format!("/objective/{id}"));
    assert_eq!(view["revealed_count"], json!(0));
}

#[actix_web::test]
async fn domain_and_validation_errors() {
    let state = state();
    let app = app!(state);

    let id = create!(app, objective_body(&["a", "b"], "DEADLINE", json!({})));

    let (status, body) = commit!(app, "000000000000000000000000", "a", 1);
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Objective not found."));

    let (status, body) = commit!(app, id, "mallory", 1);
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Not invited. Ignored"));

    let (status, _) = commit!(app, id, "a", 3);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = commit!(app, id, "a", 0);
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = commit!(app, id, "a", -1);
    assert_eq!(status, StatusCode::OK);
    let (status, _) = commit!(app, id, "a", 2);
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, view) = get_json!(app, &format!("/objective/{id}"));
    assert_eq!(view["decline_count"], json!(1));
    assert_eq!(view["commitments"][0]["is_decline"], json!(true));
    assert_eq!(view["commitments"][0]["decrypted"], json!(false));

    let req = test::TestRequest::post()
        .uri("/objective")
        .set_json(objective_body(&[], "ASAP", json!({})))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/objective")
        .set_json(objective_body(&["a"], "sometime", json!({})))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/objective")
        .set_json(json!({"title": "missing fields"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].is_string());
}

#[actix_web::test]
async fn listing_sorts() {
    let state = state();
    let app = app!(state);

    let mut first = objective_body(&["a"], "DEADLINE", json!({}));
    first["title"] = json!("Zebra crossing");
    let first = create!(app, first);

    let mut second = objective_body(&["a", "b"], "DEADLINE", json!({}));
    second["title"] = json!("Allotment");
    second["resolution_date"] = json!((Utc::now() + Duration::days(1)).to_rfc3339());
    let second = create!(app, second);

    let (_, titles) = get_json!(app, "/objectives?sort_by=title");
    let ids: Vec<&str> = titles
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["objective_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let (_, by_deadline) = get_json!(app, "/objectives?sort_by=deadline&limit=1");
    assert_eq!(by_deadline.as_array().unwrap().len(), 1);
    assert_eq!(by_deadline[0]["objective_id"], json!(second));

    let (status, _) = get_json!(app, "/objectives?sort_by=popularity");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
