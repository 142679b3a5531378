use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use shopdesk_ai::{AggregatorConfig, DisabledModel, LanguageModel, ModelError, Prompt};
use shopdesk_api::app::{AppServices, build_app_with};
use shopdesk_auth::{JwtClaims, Role};
use shopdesk_core::{TenantId, UserId};

const SECRET: &str = "test-secret";

const MODEL_REPLY: &str = r#"Here you go:
```json
{
  "predictions": [
    {"product": "Tea", "predicted_units": 12, "period": "next 7 days", "confidence": 0.6}
  ],
  "summary": "Tea is selling steadily and is close to its reorder level.",
  "restocking": [
    {"product": "Tea", "current_stock": 2, "suggested_quantity": 20, "urgency": "high", "reason": "below reorder level"}
  ]
}
```"#;

#[derive(Default)]
struct FakeModel {
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn model_id(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, _prompt: &Prompt) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(MODEL_REPLY.to_string())
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(model: Arc<dyn LanguageModel>) -> Self {
        // Same router as prod, in-memory storage, ephemeral port.
        let services = Arc::new(AppServices::in_memory(model, AggregatorConfig::default()));
        let app = build_app_with(services, SECRET);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(tenant_id: TenantId, roles: &[&'static str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        tenant_id,
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_shop(client: &reqwest::Client, srv: &TestServer, token: &str) -> String {
    let res = client
        .post(srv.url("/shops"))
        .bearer_auth(token)
        .json(&json!({ "name": "Corner Shop", "currency": "eur" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["currency"], "EUR");
    body["id"].as_str().unwrap().to_string()
}

async fn add_tea(client: &reqwest::Client, srv: &TestServer, token: &str, shop_id: &str) -> String {
    let res = client
        .post(srv.url(&format!("/shops/{shop_id}/products")))
        .bearer_auth(token)
        .json(&json!({
            "sku": "TEA-1",
            "name": "Tea",
            "unit_price": 350,
            "stock": 10,
            "reorder_level": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_authenticated");

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenant_context_is_derived_from_token() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let tenant_id = TenantId::new();
    let token = mint_jwt(tenant_id, &["manager"]);

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["tenant_id"].as_str().unwrap(), tenant_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "manager"));
}

#[tokio::test]
async fn viewer_cannot_create_shops() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let token = mint_jwt(TenantId::new(), &["viewer"]);

    let res = reqwest::Client::new()
        .post(srv.url("/shops"))
        .bearer_auth(token)
        .json(&json!({ "name": "Nope", "currency": "USD" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let token = mint_jwt(TenantId::new(), &["admin"]);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/shops"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
    assert!(!body["message"].as_str().unwrap().is_empty());

    let shop_id = create_shop(&client, &srv, &token).await;
    let res = client
        .post(srv.url(&format!("/shops/{shop_id}/sales")))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn sales_reduce_stock_and_raise_low_stock_notification() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let token = mint_jwt(TenantId::new(), &["admin"]);
    let client = reqwest::Client::new();

    let shop_id = create_shop(&client, &srv, &token).await;
    let product_id = add_tea(&client, &srv, &token, &shop_id).await;

    let res = client
        .post(srv.url(&format!("/shops/{shop_id}/sales")))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 8 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let sale: serde_json::Value = res.json().await.unwrap();
    assert_eq!(sale["total"], 2800);

    // Overselling is rejected and leaves stock untouched.
    let res = client
        .post(srv.url(&format!("/shops/{shop_id}/sales")))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url(&format!("/products/{product_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let product: serde_json::Value = res.json().await.unwrap();
    assert_eq!(product["stock"], 2);
    assert_eq!(product["low_stock"], true);

    let res = client
        .get(srv.url("/notifications?unread=true"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "low_stock");

    let id = items[0]["id"].as_str().unwrap();
    let res = client
        .post(srv.url(&format!("/notifications/{id}/read")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/notifications?unread=true"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn insights_are_generated_once_then_served_from_cache() {
    let model = Arc::new(FakeModel::default());
    let srv = TestServer::spawn(model.clone()).await;
    let token = mint_jwt(TenantId::new(), &["manager"]);
    let client = reqwest::Client::new();

    let shop_id = create_shop(&client, &srv, &token).await;
    let product_id = add_tea(&client, &srv, &token, &shop_id).await;
    client
        .post(srv.url(&format!("/shops/{shop_id}/sales")))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 8 }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(srv.url(&format!("/shops/{shop_id}/insights")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let first: serde_json::Value = res.json().await.unwrap();
    assert_eq!(first["predictions"][0]["product"], "Tea");
    assert_eq!(first["restocking"][0]["urgency"], "high");
    assert!(!first["summary"].as_str().unwrap().is_empty());

    let res = client
        .get(srv.url(&format!("/shops/{shop_id}/insights")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let second: serde_json::Value = res.json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    let res = client
        .post(srv.url(&format!("/shops/{shop_id}/insights/refresh")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn insights_for_unknown_or_malformed_shop_fail_cleanly() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let token = mint_jwt(TenantId::new(), &["viewer"]);
    let client = reqwest::Client::new();

    let unknown = shopdesk_core::ShopId::new();
    let res = client
        .get(srv.url(&format!("/shops/{unknown}/insights")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "data_unavailable");

    let res = client
        .get(srv.url("/shops/not-a-uuid/insights"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "shop_context_missing");
}

#[tokio::test]
async fn shops_of_other_tenants_are_invisible() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let client = reqwest::Client::new();
    let owner = mint_jwt(TenantId::new(), &["admin"]);
    let stranger = mint_jwt(TenantId::new(), &["admin"]);

    let shop_id = create_shop(&client, &srv, &owner).await;

    let res = client
        .get(srv.url(&format!("/shops/{shop_id}")))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url(&format!("/shops/{shop_id}/insights")))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabled_model_reports_generation_failure() {
    let srv = TestServer::spawn(Arc::new(DisabledModel)).await;
    let token = mint_jwt(TenantId::new(), &["admin"]);
    let client = reqwest::Client::new();
    let shop_id = create_shop(&client, &srv, &token).await;

    let res = client
        .get(srv.url(&format!("/shops/{shop_id}/insights")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "generation_failure");
}

#[tokio::test]
async fn rbac_explain_names_granting_roles() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let token = mint_jwt(TenantId::new(), &["staff"]);

    let res = reqwest::Client::new()
        .get(srv.url("/rbac/explain?permission=insights.refresh"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let explanation = &body["explanation"];
    assert_eq!(explanation["granted"], false);
    assert_eq!(explanation["denial"], "missing_permission");
    assert!(
        explanation["granting_roles"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r == "manager")
    );
}

#[tokio::test]
async fn admin_can_inspect_insights_cache() {
    let srv = TestServer::spawn(Arc::new(FakeModel::default())).await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(TenantId::new(), &["admin"]);

    let shop_id = create_shop(&client, &srv, &admin).await;
    client
        .get(srv.url(&format!("/shops/{shop_id}/insights")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();

    let res = client
        .get(srv.url("/admin/insights-cache"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["entries"], 1);
    assert_eq!(body["in_flight"], 0);
    assert_eq!(body["model"], "fake-model");
    assert_eq!(body["ttl_minutes"], 30);

    let manager = mint_jwt(TenantId::new(), &["manager"]);
    let res = client
        .get(srv.url("/admin/insights-cache"))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
