use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use async_flow::contract::{MockProber, ProbeError, ProbeOutcome, Prober, Target};
use async_flow::probe::{probe_all, probe_pipeline, HttpProber, ProbeReport};
use async_flow::MapOptions;

fn targets(names: &[&str]) -> Vec<Target> {
    names
        .iter()
        .map(|name| Target {
            name: name.to_string(),
            url: format!("https://{name}.example.com/health"),
        })
        .collect()
}

fn outcome_for(target: &Target, status: u16) -> ProbeOutcome {
    ProbeOutcome {
        name: target.name.clone(),
        url: target.url.clone(),
        status,
        healthy: (200..400).contains(&status),
        elapsed_ms: 1,
    }
}

#[tokio::test]
async fn probe_all_reports_outcomes_in_target_order() {
    let mut prober = MockProber::new();
    prober.expect_probe().times(4).returning(|target: &Target| {
        let status = if target.name == "db" { 503 } else { 200 };
        Ok(outcome_for(target, status))
    });

    let report = probe_all(
        Arc::new(prober),
        targets(&["api", "db", "cache", "queue"]),
        MapOptions::with_concurrency(2),
    )
    .await
    .expect("probe run should succeed");

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["api", "db", "cache", "queue"]);
    assert_eq!(report.healthy, 3);
    assert_eq!(report.unhealthy, 1);
    assert!(!report.all_healthy());
}

#[tokio::test]
async fn probe_failure_fails_the_whole_run() {
    let mut prober = MockProber::new();
    prober.expect_probe().returning(|target: &Target| {
        if target.name == "broken" {
            Err(ProbeError::Other(format!("cannot reach {}", target.name)))
        } else {
            Ok(outcome_for(target, 200))
        }
    });

    let err = probe_all(
        Arc::new(prober),
        targets(&["api", "broken", "cache"]),
        MapOptions::unbounded(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "cannot reach broken");
}

#[tokio::test]
async fn empty_target_list_never_probes() {
    let mut prober = MockProber::new();
    prober.expect_probe().never();

    let report = probe_all(Arc::new(prober), Vec::new(), MapOptions::default())
        .await
        .unwrap();

    assert!(report.outcomes.is_empty());
    assert!(report.all_healthy());
}

#[tokio::test]
async fn pipeline_is_reusable_across_calls() {
    let mut prober = MockProber::new();
    prober
        .expect_probe()
        .times(3)
        .returning(|target: &Target| Ok(outcome_for(target, 204)));

    let pipeline = probe_pipeline(Arc::new(prober), MapOptions::with_concurrency(1));
    assert_eq!(pipeline.len(), 2);

    let first = pipeline.call(targets(&["a", "b"])).await.unwrap();
    let second = pipeline.call(targets(&["c"])).await.unwrap();
    assert_eq!(first.outcomes.len(), 2);
    assert_eq!(second.outcomes[0].name, "c");
}

#[tokio::test]
async fn trait_objects_can_drive_the_fan_out() {
    let mut prober = MockProber::new();
    prober
        .expect_probe()
        .returning(|target: &Target| Ok(outcome_for(target, 301)));
    let prober: Arc<dyn Prober> = Arc::new(prober);

    let report = probe_all(prober, targets(&["redirect"]), MapOptions::default())
        .await
        .unwrap();
    assert!(report.outcomes[0].healthy);
}

#[tokio::test]
async fn http_prober_rejects_invalid_urls_without_sending() {
    let prober = HttpProber::new().expect("client builds");
    let target = Target {
        name: "bad".into(),
        url: "not a url".into(),
    };

    match prober.probe(&target).await {
        Err(ProbeError::InvalidUrl(url)) => assert_eq!(url, "not a url"),
        other => panic!("expected InvalidUrl, got {other:?}"),
    }
}

#[test]
fn report_counts_healthy_and_unhealthy() {
    let all = targets(&["a", "b", "c"]);
    let report = ProbeReport::new(vec![
        outcome_for(&all[0], 200),
        outcome_for(&all[1], 500),
        outcome_for(&all[2], 404),
    ]);
    assert_eq!(report.healthy, 1);
    assert_eq!(report.unhealthy, 2);
}

/// Answers exactly one HTTP request with `response`, then stops listening.
async fn serve_once(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.expect("read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.expect("write response");
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}/health")
}

fn local_target(url: String) -> Target {
    Target {
        name: "local".into(),
        url,
    }
}

#[tokio::test]
async fn http_prober_reports_error_status_as_unhealthy_outcome() {
    let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
    let prober = HttpProber::new().expect("client builds");

    let outcome = prober
        .probe(&local_target(url.clone()))
        .await
        .expect("an error status is an outcome, not a failure");

    assert_eq!(outcome.status, 404);
    assert!(!outcome.healthy);
    assert_eq!(outcome.url, url);
}

#[tokio::test]
async fn http_prober_reports_success_status_as_healthy() {
    let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok").await;
    let prober = HttpProber::new().expect("client builds");

    let outcome = prober.probe(&local_target(url)).await.expect("probe should succeed");

    assert_eq!(outcome.status, 200);
    assert!(outcome.healthy);
}

#[tokio::test]
async fn http_prober_does_not_follow_redirects() {
    // The listener is gone after one answer, so following the Location would fail.
    let url = serve_once(
        "HTTP/1.1 302 Found\r\nLocation: /elsewhere\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let prober = HttpProber::new().expect("client builds");

    let outcome = prober.probe(&local_target(url)).await.expect("redirect is an outcome");

    assert_eq!(outcome.status, 302);
    assert!(outcome.healthy);
}
