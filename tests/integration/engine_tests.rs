//! End-to-end submission runs against mock remotes

use crate::common::TestEnv;
use chrono::Duration;
use serde_json::json;
use sitemap_indexer::auth::{AuthFlow, CredentialStore};
use sitemap_indexer::http::build_http_client;
use sitemap_indexer::storage::{RunStatus, SqliteStorage, Storage};
use sitemap_indexer::{IndexerError, StopReason, SubmissionOutcome};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_daily_limit_leaves_rest_for_next_run() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a", "b", "c"]).await;
    env.mount_publish_ok().await;
    env.seed_credential("access-1", Duration::hours(1));

    let config = env.config(2, 0);
    let summary = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!((summary.submitted, summary.skipped, summary.failed), (2, 0, 0));
    assert_eq!(summary.stop_reason, StopReason::DailyLimit);
    assert_eq!(env.published().await, vec![urls[0].clone(), urls[1].clone()]);

    let ledger = env.ledger(&config);
    assert!(ledger.contains(&urls[0]));
    assert!(ledger.contains(&urls[1]));
    assert!(!ledger.contains(&urls[2]));
}

#[tokio::test]
async fn test_ledger_urls_are_skipped() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a", "b", "c"]).await;
    env.mount_publish_ok().await;
    env.seed_credential("access-1", Duration::hours(1));

    let config = env.config(10, 0);
    env.ledger(&config).record(&urls[0]).unwrap();

    let summary = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!((summary.submitted, summary.skipped, summary.failed), (2, 1, 0));
    assert_eq!(env.publish_count(&urls[0]).await, 0);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a", "b", "c"]).await;
    env.seed_credential("access-1", Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/publish"))
        .and(body_partial_json(json!({"url": urls[1]})))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&env.server)
        .await;
    env.mount_publish_ok().await;

    let config = env.config(10, 0);
    let summary = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!(summary.submitted, 3);
    let (url, outcome) = &summary.outcomes[1];
    assert_eq!(url, &urls[1]);
    assert!(matches!(outcome, SubmissionOutcome::Success { attempts: 3, .. }));
    assert_eq!(env.publish_count(&urls[1]).await, 3);
    assert!(env.ledger(&config).contains(&urls[1]));
}

#[tokio::test]
async fn test_rejected_url_is_attempted_once() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a", "b"]).await;
    env.seed_credential("access-1", Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/publish"))
        .and(body_partial_json(json!({"url": urls[0]})))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Permission denied. Failed to verify the URL ownership."}
        })))
        .with_priority(1)
        .mount(&env.server)
        .await;
    env.mount_publish_ok().await;

    let config = env.config(10, 0);
    let summary = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!((summary.submitted, summary.failed), (1, 1));
    assert_eq!(env.publish_count(&urls[0]).await, 1);
    match &summary.outcomes[0].1 {
        SubmissionOutcome::Failed { message, .. } => {
            assert!(message.contains("Failed to verify the URL ownership"))
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(!env.ledger(&config).contains(&urls[0]));
}

#[tokio::test]
async fn test_rerun_never_resubmits() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a", "b", "c"]).await;
    env.mount_publish_ok().await;
    env.seed_credential("access-1", Duration::hours(1));

    let config = env.config(2, 0);
    env.engine(&config).run(&config, "hash").await.unwrap();
    let second = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!((second.submitted, second.skipped), (1, 2));
    assert_eq!(second.stop_reason, StopReason::Exhausted);

    let third = env.engine(&config).run(&config, "hash").await.unwrap();
    assert_eq!((third.submitted, third.skipped), (0, 3));

    for url in &urls {
        assert_eq!(env.publish_count(url).await, 1);
    }
}

#[tokio::test]
async fn test_start_offset_is_never_checked_or_submitted() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a", "b", "c", "d"]).await;
    env.mount_publish_ok().await;
    env.seed_credential("access-1", Duration::hours(1));

    let config = env.config(10, 2);
    let summary = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!(summary.submitted, 2);
    let seen: Vec<&String> = summary.outcomes.iter().map(|(url, _)| url).collect();
    assert_eq!(seen, vec![&urls[2], &urls[3]]);
    assert_eq!(env.publish_count(&urls[0]).await, 0);
    assert_eq!(env.publish_count(&urls[1]).await, 0);
}

#[tokio::test]
async fn test_daily_quota_aborts_and_keeps_progress() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a", "b", "c"]).await;
    env.seed_credential("access-1", Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/publish"))
        .and(body_partial_json(json!({"url": urls[1]})))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded for quota metric 'Publish requests' and limit 'Publish requests per day' of service 'indexing.googleapis.com'",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .with_priority(1)
        .mount(&env.server)
        .await;
    env.mount_publish_ok().await;

    let config = env.config(10, 0);
    let result = env.engine(&config).run(&config, "hash").await;

    match result {
        Err(IndexerError::QuotaExceeded { url, .. }) => assert_eq!(url, urls[1]),
        other => panic!("expected QuotaExceeded, got {:?}", other.map(|s| s.submitted)),
    }
    assert_eq!(env.publish_count(&urls[1]).await, 1);
    assert_eq!(env.publish_count(&urls[2]).await, 0);

    let ledger = env.ledger(&config);
    assert!(ledger.contains(&urls[0]));
    assert!(!ledger.contains(&urls[1]));

    let storage = SqliteStorage::new(&config.output.ledger_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::QuotaExceeded);
}

#[tokio::test]
async fn test_unauthorized_triggers_single_refresh() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a"]).await;
    env.seed_credential("stale", Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/publish"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/publish"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let config = env.config(10, 0);
    let summary = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.outcomes[0].1.attempts(), 2);
    assert!(env.ledger(&config).contains(&urls[0]));

    let saved = env.credential_store().load().unwrap().unwrap();
    assert_eq!(saved.access_token, "fresh");
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_unauthorized_after_refresh_fails_url() {
    let env = TestEnv::start().await;
    let urls = env.mount_sitemap(&["a"]).await;
    env.seed_credential("stale", Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/publish"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let config = env.config(10, 0);
    let summary = env.engine(&config).run(&config, "hash").await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(env.publish_count(&urls[0]).await, 2);
}

#[tokio::test]
async fn test_sitemap_failure_happens_before_auth() {
    let env = TestEnv::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.server)
        .await;

    let config = env.config(10, 0);
    let result = env.engine(&config).run(&config, "hash").await;

    assert!(matches!(result, Err(IndexerError::Sitemap(_))));
    let storage = SqliteStorage::new(&config.output.ledger_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_reauth_keeps_credential_when_sitemap_fails() {
    let env = TestEnv::start().await;
    env.seed_credential("cached", Duration::hours(1));
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&env.server)
        .await;

    let config = env.config(10, 0);
    let client = build_http_client(config.submission.request_timeout()).unwrap();
    let mut auth = AuthFlow::new(&config.auth, client).unwrap();
    auth.require_consent();

    let result = env.engine_with(&config, auth).run(&config, "hash").await;

    assert!(matches!(result, Err(IndexerError::Sitemap(_))));
    let saved = env.credential_store().load().unwrap().unwrap();
    assert_eq!(saved.access_token, "cached");
}

#[tokio::test]
async fn test_abandoned_run_is_marked_interrupted() {
    let env = TestEnv::start().await;
    env.mount_sitemap(&["a"]).await;
    env.mount_publish_ok().await;
    env.seed_credential("access-1", Duration::hours(1));

    let config = env.config(10, 0);
    let abandoned = env.ledger(&config).begin_run("hash").unwrap();

    env.engine(&config).run(&config, "hash").await.unwrap();

    let storage = SqliteStorage::new(&config.output.ledger_path).unwrap();
    assert_eq!(
        storage.get_run(abandoned).unwrap().status,
        RunStatus::Interrupted
    );
    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.status, RunStatus::Completed);
    assert_eq!(latest.counts.submitted, 1);
}
