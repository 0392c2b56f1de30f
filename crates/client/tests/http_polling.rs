//! HTTP client behaviour against a mock job server.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use stepwatch_client::{ClientError, HttpProgressApi, PollConfig, PollOutput, PollingClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STARTED_AT: &str = "2026-02-05T12:00:00Z";

fn start_body() -> Value {
    json!({
        "status": "started",
        "message": "Process started, poll /api/status for progress",
        "processId": STARTED_AT,
        "jobId": 1,
        "totalSteps": 3
    })
}

fn status_body(current_step: u32, status: &str) -> Value {
    let messages: Vec<Value> = (1..=current_step)
        .map(|step| {
            json!({
                "step": step,
                "message": format!("Completed step {step} of 3"),
                "timestamp": STARTED_AT,
                "progress": f64::from(step) / 3.0 * 100.0
            })
        })
        .collect();
    json!({
        "jobId": 1,
        "status": status,
        "currentStep": current_step,
        "totalSteps": 3,
        "progressPercentage": f64::from(current_step) / 3.0 * 100.0,
        "isComplete": status == "completed",
        "messages": messages,
        "startedAt": STARTED_AT
    })
}

fn client(server: &MockServer) -> PollingClient<HttpProgressApi> {
    let api = HttpProgressApi::new(server.uri(), Duration::from_secs(2)).unwrap();
    PollingClient::new(
        api,
        PollConfig {
            poll_interval: Duration::from_millis(10),
            stall_timeout: None,
        },
    )
}

async fn mount_start(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/start-process"))
        .respond_with(ResponseTemplate::new(202).set_body_json(start_body()))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_polls_until_complete() {
    let server = MockServer::start().await;
    mount_start(&server).await;

    // First matching mock with remaining uses answers; the last one is unbounded.
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(1, "running")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(3, "completed")))
        .mount(&server)
        .await;

    let mut outputs = Vec::new();
    let snapshot = client(&server).run(|o| outputs.push(o)).await.unwrap();

    assert!(snapshot.is_complete);
    assert_eq!(snapshot.current_step, 3);

    let steps: Vec<u32> = outputs
        .iter()
        .filter_map(|o| match o {
            PollOutput::Event(e) => Some(e.step),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![1, 2, 3]);
    assert!(matches!(outputs.first(), Some(PollOutput::Started(s)) if s.total_steps == 3));
    assert!(matches!(outputs.last(), Some(PollOutput::Finished(_))));
}

#[tokio::test]
async fn test_conflict_on_start() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/start-process"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "Conflict",
            "details": "job 4 is still running"
        })))
        .mount(&server)
        .await;

    let err = client(&server).run(|_| {}).await.unwrap_err();
    match err {
        ClientError::Status { status, body, .. } => {
            assert_eq!(status, 409);
            assert!(body.contains("still running"));
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_status_body() {
    let server = MockServer::start().await;
    mount_start(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).run(|_| {}).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test]
async fn test_server_unreachable() {
    // Nothing listens on a freshly closed port.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpProgressApi::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let err = PollingClient::new(api, PollConfig::default())
        .run(|_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }));
}
