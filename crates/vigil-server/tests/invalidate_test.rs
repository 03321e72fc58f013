//! Tests de los endpoints de invalidacion.

mod helpers;

use axum::http::StatusCode;
use helpers::{TestApp, assert_error_body, assert_invalidated};
use serde_json::{Value, json};
use vigil_server::cache::{AdminResource, QueryFingerprint};

async fn warm_admin_users(app: &TestApp) {
    let admin = app.state().cache().admin();

    for page in ["1", "2"] {
        let fingerprint = QueryFingerprint::of_params([("page", page)]);
        admin
            .list(AdminResource::Users, &fingerprint, || async {
                Ok(Some(json!([{ "id": "u1" }])))
            })
            .await
            .unwrap();
    }
    admin
        .count(AdminResource::Users, || async { Ok(Some(json!(1))) })
        .await
        .unwrap();
    admin
        .detail(AdminResource::Users, "u1", || async {
            Ok(Some(json!({ "id": "u1" })))
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn invalidates_lists_and_count() {
    let app = TestApp::new();
    warm_admin_users(&app).await;

    let response = app.client().delete("/cache/admin/users").await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_invalidated(&body, 3);
    // el detalle sigue en cache
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn invalidates_detail() {
    let app = TestApp::new();
    warm_admin_users(&app).await;

    let response = app.client().delete("/cache/admin/users/u1").await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_invalidated(&body, 1);
    assert_eq!(body["keys"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_collection_invalidates_nothing() {
    let response = TestApp::new().client().delete("/cache/blog/post").await;

    response.assert_status(StatusCode::OK);
    assert_invalidated(&response.json(), 0);
}

#[tokio::test]
async fn domain_is_case_insensitive() {
    let response = TestApp::new().client().delete("/cache/Blog/post").await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn unknown_domain_is_400() {
    let response = TestApp::new().client().delete("/cache/billing/invoices").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_error_body(&response.json(), "Bad Request");
}

#[tokio::test]
async fn proxy_entries_reload_after_invalidation() {
    let app = TestApp::new();
    let client = app.client();

    client.get("/proxy/ecommerce/products").await;
    let response = client.delete("/cache/ecommerce/response").await;
    assert_invalidated(&response.json(), 1);

    client
        .get("/proxy/ecommerce/products")
        .await
        .assert_header("x-vigil-cache", "MISS");
    assert_eq!(app.upstream.calls(), 2);
}
