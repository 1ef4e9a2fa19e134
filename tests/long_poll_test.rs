mod common;

use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use tokio::time::Instant;

use crate::common::start_node;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_orders_scenario_over_http() {
    let node = start_node().await;
    assert_eq!(node.version("orders").await, 0);

    let reply = node
        .call("put-value", json!(["orders", {"id": 7, "item": "lamp"}]))
        .await;
    assert_eq!(reply, json!([true, "", null]));
    assert_eq!(node.version("orders").await, 1);

    let reply = node
        .call("take-values", json!(["orders", {"eq": ["/item", "chair"]}]))
        .await;
    assert_eq!(reply, json!([true, "", []]));
    assert_eq!(node.version("orders").await, 1);

    let waiting = {
        let args = json!([{"version": "1", "col": "orders", "wait-time-sec": 20}]);
        let service = node.node.service().clone();
        tokio::spawn(async move { service.dispatch("valu-long-waiter", args.as_array().unwrap()).await })
    };
    node.wait_for_listeners("orders", 1).await;

    let reply = node
        .call("take-values", json!(["orders", {"eq": ["/item", "lamp"]}]))
        .await;
    assert_eq!(reply, json!([true, "", [{"id": 7, "item": "lamp"}]]));

    let woken = tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(woken, json!([true, "", {"version": "2", "was-timedout": false}]));
    assert_eq!(node.listeners("orders").await, 0);

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_client_poll_loop_never_misses_a_change() {
    let node = start_node().await;

    // First call: nothing known yet
    let reply = node
        .call(
            "valu-long-waiter",
            json!({"is-init": true, "col": "feed", "wait-time-sec": 1}),
        )
        .await;
    assert_eq!(reply, json!([true, "", {"version": "", "was-timedout": true}]));

    // A change lands between two polls; the next poll sees it at once
    node.call("put-value", json!(["feed", "a"])).await;
    let started = Instant::now();
    let reply = node
        .call(
            "valu-long-waiter",
            json!({"is-init": false, "version": "0", "col": "feed", "wait-time-sec": 10}),
        )
        .await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(reply, json!([true, "", {"version": "1", "was-timedout": false}]));

    // Up to date: the poll runs to its deadline and echoes the version back
    let started = Instant::now();
    let reply = node
        .call(
            "valu-long-waiter",
            json!({"is-init": false, "version": "1", "col": "feed", "wait-time-sec": 1}),
        )
        .await;
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(reply, json!([true, "", {"version": "1", "was-timedout": true}]));

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_puts_advance_version_once_each() {
    const WRITERS: u64 = 50;
    let node = start_node().await;

    let writes = (0..WRITERS).map(|i| {
        let service = node.node.service().clone();
        async move {
            service
                .dispatch("put-value", &[json!("metrics"), json!({"seq": i})])
                .await
        }
    });
    let replies = join_all(writes).await;

    assert!(replies.iter().all(|r| r == &json!([true, "", null])));
    assert_eq!(node.version("metrics").await, WRITERS);

    let reply = node.call("get-values", json!(["metrics", true])).await;
    assert_eq!(reply[2].as_array().unwrap().len(), WRITERS as usize);
    // Reads leave the version alone
    assert_eq!(node.version("metrics").await, WRITERS);

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_of_a_collection() {
    const CALLERS: usize = 32;
    let node = start_node().await;

    let calls = (0..CALLERS).map(|i| {
        let service = node.node.service().clone();
        tokio::spawn(async move {
            service
                .dispatch("put-value", &[json!("brand-new"), json!(i)])
                .await
        })
    });
    let replies = join_all(calls).await;

    assert_eq!(replies.len(), CALLERS);
    for reply in replies {
        assert_eq!(reply.unwrap(), json!([true, "", null]));
    }
    assert_eq!(node.node.registry().len(), 1);
    assert_eq!(node.version("brand-new").await, CALLERS as u64);

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_waiters_woken_by_one_update() {
    const WAITERS: usize = 20;
    let node = start_node().await;
    node.call("put-value", json!(["jobs", {"id": 1, "state": "new"}]))
        .await;

    let waiting: Vec<_> = (0..WAITERS)
        .map(|_| {
            let service = node.node.service().clone();
            tokio::spawn(async move {
                service
                    .dispatch(
                        "valu-long-waiter",
                        &[json!({"version": "1", "col": "jobs", "wait-time-sec": 20})],
                    )
                    .await
            })
        })
        .collect();
    node.wait_for_listeners("jobs", WAITERS).await;

    let reply = node
        .call(
            "update",
            json!(["jobs", {"where": {"eq": ["/id", 1]}, "set": {"/state": "running"}}]),
        )
        .await;
    assert_eq!(reply, json!([true, "", true]));

    for pending in waiting {
        let reply = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, json!([true, "", {"version": "2", "was-timedout": false}]));
    }
    assert_eq!(node.listeners("jobs").await, 0);

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timeout_only_polls_leave_no_listeners() {
    let node = start_node().await;

    for _ in 0..5 {
        let reply = node
            .call(
                "valu-long-waiter",
                json!({"is-init": true, "col": "quiet", "wait-time-sec": 0}),
            )
            .await;
        assert_eq!(reply[2]["was-timedout"], json!(true));
    }
    assert_eq!(node.listeners("quiet").await, 0);
    assert_eq!(node.version("quiet").await, 0);

    node.shutdown().await;
}
