use khipu::{
    verify, CallbackUrls, KhipuClient, KhipuError, ParameterSet, PaymentRequest, Secret,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> PaymentRequest {
    PaymentRequest::new(
        "12345",
        "Test Order",
        1000.0,
        CallbackUrls::from_base("https://shop.example"),
    )
    .with_transaction_id("ORDER_0badf00d")
    .with_bank_id(Some("demobank".to_string()))
}

fn client(server: &MockServer) -> KhipuClient {
    KhipuClient::new(server.uri(), Secret::from("s3cr3t")).unwrap()
}

#[tokio::test]
async fn create_payment_posts_signed_form_and_returns_redirect() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("subject=Test+Order"))
        .and(body_string_contains("amount=1000.00"))
        .and(body_string_contains("bank_id=demobank"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "payment_id": "p-1",
            "payment_url": "https://khipu.com/payment/info/p-1",
            "khipu_url": "https://khipu.com/payment/show/p-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server).create_payment(&request()).await.unwrap();
    assert_eq!(created.payment_id.as_deref(), Some("p-1"));
    assert_eq!(
        created.redirect_url(),
        Some("https://khipu.com/payment/show/p-1")
    );

    // The transmitted body verifies under the shared secret.
    let received = server.received_requests().await.unwrap();
    let params = ParameterSet::from_form(&received[0].body).unwrap();
    let hash = params.get_text("hash").unwrap();
    assert!(verify(&params, hash, &Secret::from("s3cr3t")));
    assert_eq!(
        params.get_text("notify_url"),
        Some("https://shop.example/khipu/notify")
    );
}

#[tokio::test]
async fn gateway_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "status": 400,
            "message": "Invalid hash"
        })))
        .mount(&server)
        .await;

    let err = client(&server).create_payment(&request()).await.unwrap_err();
    match err {
        KhipuError::Gateway { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid hash");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn gateway_error_without_body_uses_status_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).create_payment(&request()).await.unwrap_err();
    assert!(
        matches!(err, KhipuError::Gateway { status: 503, ref message } if message == "Service Unavailable")
    );
}

#[tokio::test]
async fn success_without_url_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "payment_id": "p-2" })),
        )
        .mount(&server)
        .await;

    let err = client(&server).create_payment(&request()).await.unwrap_err();
    assert!(matches!(err, KhipuError::MissingRedirect));
}

#[tokio::test]
async fn unreachable_gateway_is_http_error() {
    let client = KhipuClient::new("http://127.0.0.1:1", Secret::from("s3cr3t")).unwrap();
    let err = client.create_payment(&request()).await.unwrap_err();
    assert!(matches!(err, KhipuError::Http(_)));
}
