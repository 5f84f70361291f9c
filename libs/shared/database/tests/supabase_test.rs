use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

fn client_for(server: &MockServer) -> SupabaseClient {
    SupabaseClient::new(&AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "anon-key".to_string(),
        supabase_jwt_secret: "unused".to_string(),
        clinic_hours: Default::default(),
    })
}

#[tokio::test]
async fn requests_carry_apikey_and_bearer_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/things"))
        .and(header("apikey", "anon-key"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "ok": true }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/things", Some("user-token"), None)
        .await
        .expect("request should succeed");

    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn empty_body_decodes_as_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/things"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows: Vec<Value> = client
        .request(Method::DELETE, "/rest/v1/things", None, None)
        .await
        .expect("empty responses should decode");

    assert!(rows.is_empty());
}

#[tokio::test]
async fn conflict_status_is_detectable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/things"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .request::<Vec<Value>>(Method::POST, "/rest/v1/things", None, Some(json!({})))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    match err {
        SupabaseError::Api { status, body } => {
            assert_eq!(status.as_u16(), 409);
            assert!(body.contains("23505"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_conflict_failures_are_not_conflicts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/things"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .request::<Vec<Value>>(Method::GET, "/rest/v1/things", None, None)
        .await
        .unwrap_err();

    assert!(!err.is_conflict());
}
