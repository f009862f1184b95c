//! Client recreation against a real endpoint, with credentials from the secret cache.

use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

use community_bff::config::{DataStoreConfig, HealthCheckConfig, SecretsConfig};
use community_bff::datastore::{ClientFactory, HttpClientFactory};
use community_bff::{HealthMonitor, SecretCache};

mod common;

const TOKEN_VAR: &str = "ITEST_DATASTORE_TOKEN";

/// A data store that only accepts `Bearer tok-2`.
async fn start_strict_store() -> std::net::SocketAddr {
    common::start_programmable_backend(|req| {
        let authorized = req.header("authorization") == Some("Bearer tok-2");
        async move {
            if authorized {
                (200, r#"{"tables":["events"]}"#.to_string())
            } else {
                (403, r#"{"code":"UnrecognizedClientException","message":"bad token"}"#.to_string())
            }
        }
    })
    .await
}

fn monitor_config() -> HealthCheckConfig {
    HealthCheckConfig {
        enabled: true,
        interval_secs: 30,
        probe_timeout_secs: 2,
        failure_threshold: 3,
    }
}

async fn monitor_for(addr: std::net::SocketAddr) -> HealthMonitor {
    let secrets = Arc::new(
        SecretCache::from_config(&SecretsConfig {
            cache_ttl_secs: 1,
            required: Vec::new(),
            ..SecretsConfig::default()
        })
        .unwrap(),
    );
    let factory: Arc<dyn ClientFactory> = Arc::new(HttpClientFactory::new(
        DataStoreConfig {
            endpoint: format!("http://{}", addr),
            credentials_secret: Some("itest/datastore-token".into()),
            ..DataStoreConfig::default()
        },
        Some(secrets),
    ));
    HealthMonitor::connect(factory, monitor_config()).await.unwrap()
}

#[tokio::test]
#[serial]
async fn test_recreation_picks_up_rotated_credentials() {
    let addr = start_strict_store().await;
    std::env::set_var(TOKEN_VAR, "tok-1");
    let monitor = monitor_for(addr).await;

    monitor.check().await;
    monitor.check().await;
    assert_eq!(monitor.consecutive_failure_count(), 2);

    // rotate, and let the cached token expire
    std::env::set_var(TOKEN_VAR, "tok-2");
    tokio::time::sleep(Duration::from_millis(1100)).await;

    // the third failure crosses the threshold; the rebuilt client authenticates
    monitor.check().await;
    assert!(monitor.is_healthy());
    assert_eq!(monitor.consecutive_failure_count(), 0);
    assert_eq!(monitor.handle().generation(), 1);

    let tables = monitor.client().list_tables(10).await.unwrap();
    assert_eq!(tables, vec!["events"]);

    std::env::remove_var(TOKEN_VAR);
}

#[tokio::test]
#[serial]
async fn test_failed_recreation_keeps_old_client() {
    let addr = start_strict_store().await;
    std::env::set_var(TOKEN_VAR, "tok-1");
    let monitor = monitor_for(addr).await;

    let mut counts = Vec::new();
    for _ in 0..5 {
        monitor.check().await;
        counts.push(monitor.consecutive_failure_count());
    }
    assert_eq!(counts, vec![1, 2, 3, 4, 5]);
    assert!(!monitor.is_healthy());
    assert_eq!(monitor.handle().generation(), 0);

    std::env::remove_var(TOKEN_VAR);
}
