// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::FakeTransport;
use super::*;
use serde_json::json;

#[tokio::test]
async fn run_job_polls_until_completed_then_fetches_result() {
    let transport = FakeTransport::new();
    transport.script("/dgm/jobs/advance", json!({"jobId": "job-1"}));
    transport.script("/dgm/jobs/job-1/status", json!({"status": "running"}));
    transport.script("/dgm/jobs/job-1/status", json!({"status": "completed"}));
    transport.script("/dgm/jobs/job-1/result", json!({"result": {"runs": ["r1"]}}));

    let result = run_job(
        &transport,
        "/dgm/jobs/advance",
        json!({}),
        |id| format!("/dgm/jobs/{id}/status"),
        |id| format!("/dgm/jobs/{id}/result"),
        Duration::from_millis(1),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(result, json!({"result": {"runs": ["r1"]}}));
}

#[tokio::test]
async fn run_job_surfaces_failed_status() {
    let transport = FakeTransport::new();
    transport.script("/dgm/jobs/advance", json!({"jobId": "job-1"}));
    transport.script("/dgm/jobs/job-1/status", json!({"status": "failed"}));

    let err = run_job(
        &transport,
        "/dgm/jobs/advance",
        json!({}),
        |id| format!("/dgm/jobs/{id}/status"),
        |id| format!("/dgm/jobs/{id}/result"),
        Duration::from_millis(1),
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AdapterError::JobFailed(_)));
}

#[tokio::test]
async fn missing_job_id_is_a_protocol_error() {
    let transport = FakeTransport::new();
    transport.script("/dgm/jobs/advance", json!({}));

    let err = run_job(
        &transport,
        "/dgm/jobs/advance",
        json!({}),
        |id| format!("/dgm/jobs/{id}/status"),
        |id| format!("/dgm/jobs/{id}/result"),
        Duration::from_millis(1),
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AdapterError::Protocol(_)));
}

/// A job that never leaves `running` must not poll forever: the whole
/// submit→poll→result sequence is bounded by `request_timeout`, not just
/// each individual HTTP call within it.
#[tokio::test(start_paused = true)]
async fn run_job_times_out_on_a_job_stuck_running() {
    let transport = FakeTransport::new();
    transport.script("/dgm/jobs/advance", json!({"jobId": "job-1"}));
    for _ in 0..1000 {
        transport.script("/dgm/jobs/job-1/status", json!({"status": "running"}));
    }

    let err = run_job(
        &transport,
        "/dgm/jobs/advance",
        json!({}),
        |id| format!("/dgm/jobs/{id}/status"),
        |id| format!("/dgm/jobs/{id}/result"),
        Duration::from_millis(50),
        Duration::from_millis(500),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AdapterError::Timeout(d) if d == Duration::from_millis(500)));
    assert!(err.is_retriable());
}
