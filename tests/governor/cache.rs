use billable_client::{Error, RequestGovernor};
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};

use crate::common::ms;

fn counting_projects(calls: &Arc<AtomicUsize>) -> impl Future<Output = Result<Value, Error>> + use<> {
    let calls = calls.clone();
    async move {
        sleep(ms(50)).await;
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "projects": [{ "id": n, "name": "Website redesign" }] }))
    }
}

#[tokio::test(start_paused = true)]
async fn get_is_served_from_cache_until_timeout() {
    let gov: RequestGovernor = RequestGovernor::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let t0 = Instant::now();

    let first = gov
        .throttle("/projects", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep_until(t0 + Duration::from_secs(10)).await;
    let second = gov
        .throttle("/projects", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep_until(t0 + Duration::from_secs(31)).await;
    let third = gov
        .throttle("/projects", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_ne!(third, first);

    let stats = gov.stats().await;
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test(start_paused = true)]
async fn cached_read_still_waits_out_endpoint_spacing() {
    let gov: RequestGovernor = RequestGovernor::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let t0 = Instant::now();

    gov.throttle("/clients", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    gov.throttle("/clients", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    crate::common::assert_near(t0.elapsed(), ms(1_000));
}

#[tokio::test(start_paused = true)]
async fn non_get_methods_never_touch_the_cache() {
    let gov: RequestGovernor = RequestGovernor::new();
    let calls = Arc::new(AtomicUsize::new(0));

    for method in [Method::POST, Method::PUT, Method::DELETE] {
        gov.throttle("/time-entries", &method, || counting_projects(&calls))
            .await
            .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(gov.cached("/time-entries").await.is_none());
    assert_eq!(gov.stats().await.cache_entries, 0);

    // a fresh GET still has to reach the network
    gov.throttle("/time-entries", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn clear_cache_forces_a_fresh_dispatch() {
    let gov: RequestGovernor = RequestGovernor::new();
    let calls = Arc::new(AtomicUsize::new(0));

    gov.throttle("/x", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    gov.throttle("/y", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    assert_eq!(gov.stats().await.cache_entries, 2);

    gov.clear_cache(Some("/x")).await;
    assert!(gov.cached("/x").await.is_none());
    assert!(gov.cached("/y").await.is_some());

    gov.throttle("/x", &Method::GET, || counting_projects(&calls))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    gov.clear_cache(None).await;
    assert_eq!(gov.stats().await.cache_entries, 0);
}
