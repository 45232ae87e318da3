//! Drive two engines by hand, printing every frame on the wire.
//!
//! Run with `cargo run --example raw_frames`.

use std::sync::{Arc, Mutex};

use corr_rpc::{CorrelationEngine, ResultFn, RpcConfig};

type Inbox = Arc<Mutex<Vec<(String, String, String)>>>;

fn main() {
    // ---
    let inbox: Inbox = Arc::default();
    let requests = inbox.clone();

    let server = CorrelationEngine::new(&RpcConfig::server()).with_request_handler(
        move |id: &str, name: &str, payload: &str| {
            requests
                .lock()
                .unwrap()
                .push((id.into(), name.into(), payload.into()));
        },
    );

    let client = CorrelationEngine::new(&RpcConfig::client()).with_orphan_handler(ResultFn::new(
        |data: &str| println!("orphan return: {data}"),
        |error: &str| println!("orphan error: {error}"),
    ));

    let request = client.create_request(
        "add",
        "2,3",
        Some(Box::new(ResultFn::new(
            |sum: &str| println!("add returned {sum}"),
            |err: &str| println!("add failed: {err}"),
        ))),
    );
    println!("-> {request}");
    server.ingest(&request);

    let received: Vec<_> = inbox.lock().unwrap().drain(..).collect();
    for (id, name, payload) in received {
        let sum: i64 = payload
            .split(',')
            .filter_map(|n| n.trim().parse::<i64>().ok())
            .sum();
        let reply = server.create_return(&id, &name, &sum.to_string());
        println!("<- {reply}");

        client.ingest(&reply);
        // The same reply again has no pending entry left.
        client.ingest(&reply);
    }

    println!("malformed accepted: {}", client.ingest("return,only-two"));
    println!("pending: {}", client.pending_count());
}
