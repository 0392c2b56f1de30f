//! Real listener, real HTTP client, real worker.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use stepwatch_client::{ClientError, HttpProgressApi, PollConfig, PollOutput, PollingClient};
use stepwatch_jobs::{JobConfig, JobController, JobStatus};
use stepwatch_server::{create_app, AppState};

async fn spawn_server(config: JobConfig) -> (SocketAddr, Arc<JobController>) {
    let jobs = Arc::new(JobController::new(config));
    let app = create_app(AppState::with_controller(Arc::clone(&jobs)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, jobs)
}

fn polling_client(addr: SocketAddr) -> PollingClient<HttpProgressApi> {
    let api = HttpProgressApi::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    PollingClient::new(
        api,
        PollConfig {
            poll_interval: Duration::from_millis(15),
            stall_timeout: Some(Duration::from_secs(5)),
        },
    )
}

fn event_steps(outputs: &[PollOutput]) -> Vec<u32> {
    outputs
        .iter()
        .filter_map(|o| match o {
            PollOutput::Event(e) => Some(e.step),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_client_observes_every_step_once() {
    let config = JobConfig::new(NonZeroU32::new(5).unwrap(), Duration::from_millis(40));
    let (addr, jobs) = spawn_server(config).await;

    let mut outputs = Vec::new();
    let snapshot = polling_client(addr)
        .run(|o| outputs.push(o))
        .await
        .unwrap();

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.current_step, 5);
    assert_eq!(snapshot.progress_percentage, 100.0);
    assert_eq!(event_steps(&outputs), vec![1, 2, 3, 4, 5]);

    // Replayed events match the server's final log exactly.
    let replayed: Vec<_> = outputs
        .iter()
        .filter_map(|o| match o {
            PollOutput::Event(e) => Some(e.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(replayed, jobs.status().messages);
}

#[tokio::test]
async fn test_three_step_run_without_delay() {
    let config = JobConfig::new(NonZeroU32::new(3).unwrap(), Duration::ZERO);
    let (addr, _jobs) = spawn_server(config).await;

    let mut outputs = Vec::new();
    let snapshot = polling_client(addr)
        .run(|o| outputs.push(o))
        .await
        .unwrap();

    assert!(snapshot.is_complete);
    assert_eq!(snapshot.total_steps, 3);
    let progress: Vec<f64> = snapshot.messages.iter().map(|m| m.progress).collect();
    assert!((progress[0] - 100.0 / 3.0).abs() < 1e-9);
    assert!((progress[1] - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(progress[2], 100.0);
    assert_eq!(event_steps(&outputs), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_restart_ends_client_as_superseded() {
    let config = JobConfig::new(NonZeroU32::new(10).unwrap(), Duration::from_millis(50));
    let (addr, jobs) = spawn_server(config).await;

    let restarter = {
        let jobs = Arc::clone(&jobs);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(130)).await;
            jobs.start().await.unwrap()
        })
    };

    let mut outputs = Vec::new();
    let err = polling_client(addr)
        .run(|o| outputs.push(o))
        .await
        .unwrap_err();

    let second = restarter.await.unwrap();
    assert_eq!(second.superseded, Some(1));
    match err {
        ClientError::Superseded { expected, found } => {
            assert_eq!(expected, 1);
            assert_eq!(found, second.job_id);
        }
        other => panic!("expected Superseded, got {other:?}"),
    }

    // Only the first job's steps were printed, as a gapless prefix.
    let steps = event_steps(&outputs);
    let expected: Vec<u32> = (1..=steps.len() as u32).collect();
    assert_eq!(steps, expected);
    assert!(steps.len() < 10);

    jobs.shutdown().await;
}

#[tokio::test]
async fn test_health_over_http() {
    let (addr, _jobs) = spawn_server(JobConfig::default()).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["job"], "idle");
}
