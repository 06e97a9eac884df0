//! End-to-end tests driving the tracker against a mocked indexing
//! service over real HTTP.

use indexr::core::backend::{ErrorLogReader, IndexBackend};
use indexr::core::config::ServerConfig;
use indexr::core::events::{EventReceiver, TrackerEvent};
use indexr::core::http::HttpBackend;
use indexr::core::job::JobStatus;
use indexr::core::models::DataPath;
use indexr::core::panels::PanelRegistry;
use indexr::core::tracker::JobTracker;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TICK: Duration = Duration::from_millis(50);

fn tracker_for(server: &MockServer, dir: &TempDir) -> (JobTracker, EventReceiver) {
    let config = ServerConfig {
        url: server.uri(),
        request_timeout_secs: 5,
    };
    let data_path = DataPath {
        root: dir.path().to_path_buf(),
    };
    let backend = Arc::new(HttpBackend::new(config, data_path));
    JobTracker::new(backend as Arc<dyn IndexBackend>, PanelRegistry::new(), TICK)
}

fn drain(events: &mut EventReceiver) -> Vec<TrackerEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn test_recovery_attaches_to_already_running_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": true,
            "task_id": "T1",
            "status": "running",
            "progress": {"percent": 42}
        })))
        .expect(2..)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (tracker, mut events) = tracker_for(&server, &dir);

    // No prior local state; one reconciliation step attaches.
    tracker.recover().await;

    let state = tracker.state();
    assert!(state.is_polling);
    assert_eq!(state.percent, 42);
    assert_eq!(state.task_id.as_deref(), Some("T1"));

    // Polling began automatically: the mock expects at least one more
    // status call beyond the recovery query.
    tokio::time::sleep(TICK * 4).await;

    let seen = drain(&mut events);
    assert!(matches!(
        seen[0],
        TrackerEvent::Reattached { percent: 42, .. }
    ));

    tracker.stop_polling();
}

#[tokio::test]
async fn test_polls_to_completion_and_reports_outcome_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/index/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "started",
            "task_id": "T2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": true,
            "task_id": "T2",
            "status": "running",
            "progress": {"percent": 60, "operation": "storing symbols"}
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": false,
            "task_id": "T2",
            "status": "completed",
            "stats": {"files_scanned": 240, "items_stored": 1200}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (tracker, mut events) = tracker_for(&server, &dir);

    tracker.start().await.expect("Start should succeed");
    tokio::time::sleep(TICK * 8).await;

    let state = tracker.state();
    assert_eq!(state.status, JobStatus::Completed);
    assert_eq!(state.percent, 100);
    assert!(!state.is_polling);
    assert_eq!(state.stats.files_scanned, 240);
    assert_eq!(state.stats.items_stored, 1200);

    let seen = drain(&mut events);
    assert!(matches!(seen[0], TrackerEvent::Started { .. }));
    let completions = seen
        .iter()
        .filter(|event| matches!(event, TrackerEvent::Completed { .. }))
        .count();
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn test_transient_server_error_does_not_stop_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/index/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "started",
            "task_id": "T3"
        })))
        .mount(&server)
        .await;
    // First status call blows up; the loop must carry on.
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": true,
            "task_id": "T3",
            "status": "running",
            "progress": {"percent": 30}
        })))
        .expect(1..)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (tracker, _events) = tracker_for(&server, &dir);

    tracker.start().await.expect("Start should succeed");
    tokio::time::sleep(TICK * 5).await;

    let state = tracker.state();
    assert!(state.is_polling);
    assert_eq!(state.status, JobStatus::Running);
    assert_eq!(state.percent, 30);

    tracker.stop_polling();

    // The 5xx tick landed in the structured error log.
    let data_path = DataPath {
        root: dir.path().to_path_buf(),
    };
    let errors = ErrorLogReader::read_recent_errors(&data_path, 10, Some("job_status"))
        .expect("Should read error log");
    assert!(!errors.is_empty());
    assert_eq!(errors[0].error_type, "api_error");
}

#[tokio::test]
async fn test_cancel_is_not_reverted_by_stale_running_report() {
    let server = MockServer::start().await;
    // The server keeps reporting the job as running, simulating an
    // in-flight response that lands after the cancel.
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": true,
            "task_id": "T1",
            "status": "running",
            "progress": {"percent": 45}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/index/cancel"))
        .and(body_json(json!({"task_id": "T1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "cancellation requested"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (tracker, mut events) = tracker_for(&server, &dir);

    tracker.recover().await;
    tokio::time::sleep(TICK * 2).await;

    tracker.cancel().await.expect("Cancel should succeed");

    let state = tracker.state();
    assert_eq!(state.status, JobStatus::Cancelled);
    assert!(!state.is_polling);

    // Give any straggler response time to arrive; it must be discarded.
    tokio::time::sleep(TICK * 3).await;
    assert_eq!(tracker.state().status, JobStatus::Cancelled);

    let seen = drain(&mut events);
    let cancels = seen
        .iter()
        .filter(|event| matches!(event, TrackerEvent::Cancelled))
        .count();
    assert_eq!(cancels, 1);
}

#[tokio::test]
async fn test_cancel_rejection_leaves_polling_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": true,
            "task_id": "T4",
            "status": "running",
            "progress": {"percent": 80}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/index/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "job is finalizing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (tracker, mut events) = tracker_for(&server, &dir);

    tracker.recover().await;
    tracker.cancel().await.expect("Rejected cancel is not an error");

    let state = tracker.state();
    assert_eq!(state.status, JobStatus::Running);
    assert!(state.is_polling);

    let seen = drain(&mut events);
    assert!(seen.iter().any(|event| matches!(
        event,
        TrackerEvent::CancelFailed { .. }
    )));

    tracker.stop_polling();
}

#[tokio::test]
async fn test_queued_start_reports_position_then_runs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/index/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "queued",
            "task_id": "T5",
            "position": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": true,
            "task_id": "T5",
            "status": "queued"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/index/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_active_job": true,
            "task_id": "T5",
            "status": "running",
            "progress": {"percent": 5}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (tracker, mut events) = tracker_for(&server, &dir);

    tracker.start().await.expect("Start should succeed");

    let line = tracker.state().status_line();
    assert!(line.contains("Queued"));
    assert!(line.contains("3"));

    // Polling continues until a later tick reports running.
    tokio::time::sleep(TICK * 8).await;
    let state = tracker.state();
    assert_eq!(state.status, JobStatus::Running);
    assert!(state.is_polling);

    let seen = drain(&mut events);
    assert!(matches!(seen[0], TrackerEvent::Queued { position: 3, .. }));

    tracker.stop_polling();
}
