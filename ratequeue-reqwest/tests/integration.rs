use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use ratequeue::transport::{Transport, TransportRequest};
use ratequeue::{Client, Route};
use ratequeue_reqwest::ReqwestTransport;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(format!("{}/v3", server.uri()))
        .access_token("tok")
        .transport(ReqwestTransport::new())
        .build()
        .unwrap()
}

#[tokio::test]
async fn transport_returns_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/ping"))
        .respond_with(
            ResponseTemplate::new(418)
                .insert_header("RateLimit-Remaining", "7")
                .set_body_string("teapot"),
        )
        .mount(&server)
        .await;

    let request = TransportRequest {
        method: Method::GET,
        url: Url::parse(&format!("{}/v3/ping", server.uri())).unwrap(),
        headers: HeaderMap::new(),
        body: Bytes::new(),
    };
    let response = ReqwestTransport::new().execute(&request).await.unwrap();
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(response.header("ratelimit-remaining"), Some("7"));
    assert_eq!(response.body_text(), "teapot");
}

#[tokio::test]
async fn client_sends_headers_query_and_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers"))
        .and(query_param("notify", "false"))
        .and(header("access_token", "tok"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "name": "Ana" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cus_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = client
        .post(Route::new("customers").with_query("notify", false), &json!({ "name": "Ana" }))
        .await
        .unwrap();
    assert_eq!(created["id"], "cus_1");
}

#[tokio::test]
async fn rate_limited_call_is_retried_against_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/payments"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "retry_after": 0.05 })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let page = client.get("payments").await.unwrap();
    assert_eq!(page["data"], json!([]));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn not_found_maps_to_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/customers/cus_x"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "code": "not_found" })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get(Route::bind("customers/:id", ["cus_x"])).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.remote().unwrap().code.as_deref(), Some("not_found"));
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    let client = Client::builder()
        .base_url("http://127.0.0.1:1/v3")
        .transport(ReqwestTransport::new())
        .build()
        .unwrap();
    let err = client.get("customers").await.unwrap_err();
    assert!(err.is_transport());
}
