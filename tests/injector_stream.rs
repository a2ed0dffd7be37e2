//! Ad injector integration tests

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use simula_ad_sdk::injector::{AdInjector, InjectorOptions, InsertOptions, InsertionSchedule};
use simula_ad_sdk::types::ChatMessage;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn collect(stream: simula_ad_sdk::injector::TextStream) -> Vec<String> {
    stream
        .map(|chunk| chunk.expect("chunk decodes"))
        .collect()
        .await
}

async fn mock_injector_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/create_session/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sessionId": "inj-7" })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_inserts_follow_the_schedule() {
    let server = MockServer::start().await;
    mock_injector_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/ad_integrate/"))
        .and(body_partial_json(json!({ "session_id": "inj-7" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: Pack light,\n\ndata: and try Trailhead boots.\n\n"),
        )
        .expect(20)
        .mount(&server)
        .await;

    let options = InjectorOptions::new("Hiking planner")
        .with_frequency(0.2)
        .with_api_base_url(server.uri());
    let mut injector = AdInjector::init(options)
        .await
        .unwrap()
        .with_schedule(InsertionSchedule::seeded(0.2, 11));
    assert_eq!(injector.session_id(), "inj-7");

    let history = vec![ChatMessage::user("Which trail?")];
    let mut with_ad = 0;
    for _ in 0..100 {
        let chunks = collect(
            injector
                .insert_ad(&history, "Take the ridge trail", InsertOptions::default())
                .await
                .unwrap(),
        )
        .await;
        if chunks == ["Pack light,", "and try Trailhead boots."] {
            with_ad += 1;
        } else {
            assert_eq!(chunks, ["Take", "the", "ridge", "trail"]);
        }
    }
    assert_eq!(with_ad, 20);
}

#[tokio::test]
async fn test_overrides_replace_defaults_for_one_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ad_integrate/"))
        .and(body_partial_json(json!({
            "description": "Gear shop",
            "filters": ["alcohol"],
            "fidelity": 0.9
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("data: ok\n\n"))
        .expect(1)
        .mount(&server)
        .await;

    let options = InjectorOptions::new("Hiking planner")
        .with_frequency(1.0)
        .with_api_base_url(server.uri());
    let mut injector = AdInjector::new("inj-1", options).unwrap();

    let overrides = InsertOptions {
        fidelity: Some(0.9),
        description: Some("Gear shop".to_string()),
        filters: Some(vec!["alcohol".to_string()]),
    };
    let chunks = collect(injector.insert_ad(&[], "fine", overrides).await.unwrap()).await;
    assert_eq!(chunks, ["ok"]);
}

#[tokio::test]
async fn test_invalid_override_fidelity_is_rejected() {
    let options = InjectorOptions::new("Hiking planner")
        .with_frequency(1.0)
        .with_api_base_url("http://127.0.0.1:9");
    let mut injector = AdInjector::new("inj-1", options).unwrap();

    let overrides = InsertOptions {
        fidelity: Some(2.0),
        ..InsertOptions::default()
    };
    let err = injector.insert_ad(&[], "fine", overrides).await.err().unwrap();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_session_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/create_session/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let options = InjectorOptions::new("Hiking planner").with_api_base_url(server.uri());
    assert!(AdInjector::init(options).await.is_err());
}
