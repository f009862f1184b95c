//! Concurrent requests while the health monitor keeps swapping the client.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use community_bff::BffConfig;

mod common;

#[tokio::test]
async fn test_requests_during_client_swaps() {
    // every other probe fails, so each check() fails once and installs a replacement
    let probes = Arc::new(AtomicU32::new(0));
    let probe_counter = probes.clone();
    let store_addr = common::start_programmable_backend(move |req| {
        let fail = req.target == "/tables?limit=1"
            && probe_counter.fetch_add(1, Ordering::SeqCst) % 2 == 0;
        async move {
            if fail {
                (503, r#"{"code":"ServiceUnavailable","message":"flap"}"#.to_string())
            } else {
                (200, r#"{"tables":["events","donations"]}"#.to_string())
            }
        }
    })
    .await;

    let mut config = BffConfig::default();
    config.data_store.endpoint = format!("http://{}", store_addr);
    config.health_check.failure_threshold = 1;
    config.retries.delay_ms = 10;
    config.secrets.required = Vec::new();

    let (addr, services, shutdown) = common::spawn_bff(config).await;

    let stop = Arc::new(AtomicBool::new(false));
    let swapper = {
        let monitor = services.monitor.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            while !stop.load(Ordering::SeqCst) {
                monitor.check().await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
    };

    let concurrency = 10;
    let requests_per_task = 20;
    let client = common::http_client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/api/tables", addr);
        tasks.push(tokio::spawn(async move {
            let (mut ok, mut gated) = (0u32, 0u32);
            for _ in 0..requests_per_task {
                let res = client.get(&url).send().await.expect("BFF unreachable");
                match res.status().as_u16() {
                    200 => ok += 1,
                    503 => {
                        assert_eq!(res.headers()["retry-after"], "30");
                        gated += 1;
                    }
                    other => panic!("unexpected status {}", other),
                }
            }
            (ok, gated)
        }));
    }

    let (mut ok, mut gated) = (0, 0);
    for task in tasks {
        let (o, g) = task.await.unwrap();
        ok += o;
        gated += g;
    }
    stop.store(true, Ordering::SeqCst);
    swapper.await.unwrap();

    // gate probes can shift the flap parity; two quiet cycles always swap once
    for _ in 0..2 {
        services.monitor.check().await;
    }

    println!("\n--- Swap Load Results ---");
    println!("Requests:    {}", concurrency * requests_per_task);
    println!("Succeeded:   {}", ok);
    println!("Gated (503): {}", gated);
    println!("Duration:    {:?}", start.elapsed());
    println!("Generation:  {}", services.monitor.handle().generation());
    println!("-------------------------\n");

    assert_eq!(ok + gated, concurrency * requests_per_task);
    assert!(ok > 0, "No successful requests recorded");
    assert!(services.monitor.handle().generation() >= 1);

    shutdown.trigger();
}
