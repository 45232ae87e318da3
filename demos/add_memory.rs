//! Client and server engines talking over an in-memory link.
//!
//! Run with `cargo run --example add_memory`.

use std::sync::Arc;

use corr_rpc::{
    // ---
    create_memory_pair,
    runner,
    CorrelationEngine,
    Error,
    Frame,
    FrameKind,
    Result,
    ResultFn,
    RpcClient,
    RpcConfig,
    TransportPtr,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct AddRequest {
    a: i32,
    b: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AddResponse {
    sum: i32,
}

/// Answer `add` requests; anything else gets an `error` frame.
fn serve(transport: TransportPtr) -> CorrelationEngine {
    // ---
    CorrelationEngine::new(&RpcConfig::server()).with_request_handler(
        move |id: &str, name: &str, payload: &str| {
            let reply = match (name, serde_json::from_str::<AddRequest>(payload)) {
                ("add", Ok(req)) => {
                    let body = serde_json::json!({ "sum": req.a + req.b }).to_string();
                    Frame::new(FrameKind::Return, id, name, body)
                }
                ("add", Err(err)) => Frame::new(FrameKind::Error, id, name, err.to_string()),
                _ => Frame::new(FrameKind::Error, id, name, format!("unknown function {name}")),
            };

            let transport = transport.clone();
            tokio::spawn(async move {
                if let Err(err) = transport.publish(reply.encode().into()).await {
                    eprintln!("failed to send reply: {err}");
                }
            });
        },
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (client_side, server_side) = create_memory_pair("client", "math");

    let server = Arc::new(serve(server_side.clone()));
    let server_task = runner::run(server_side.clone(), server).await?;

    let config = RpcConfig::client();
    let engine = Arc::new(
        CorrelationEngine::new(&config).with_orphan_handler(ResultFn::new(
            |data: &str| println!("unmatched return: {data}"),
            |error: &str| println!("unmatched error: {error}"),
        )),
    );
    let (client, client_task) = RpcClient::start(engine, client_side.clone(), &config).await?;

    let resp: AddResponse = client
        .request_json("add", &AddRequest { a: 20, b: 3 })
        .await?;
    println!("20 + 3 = {}", resp.sum);

    match client
        .request_json::<_, AddResponse>("mul", &AddRequest { a: 2, b: 2 })
        .await
    {
        Err(Error::Remote(msg)) => println!("mul failed as expected: {msg}"),
        other => println!("unexpected: {other:?}"),
    }

    client_side.close().await?;
    server_side.close().await?;
    client_task.await.expect("client runner panicked")?;
    server_task.await.expect("server runner panicked")?;
    Ok(())
}
