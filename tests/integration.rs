use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use corr_rpc::{
    //
    create_memory_pair,
    runner,
    CorrelationEngine,
    Error,
    Frame,
    FrameKind,
    Reply,
    Result,
    ResultFn,
    RpcClient,
    RpcConfig,
    TransportPtr,
};

#[derive(Debug, Serialize, Deserialize)]
struct AddRequest {
    a: i32,
    b: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AddResponse {
    sum: i32,
}

/// A peer answering `add` with JSON and ignoring `sleep`.
struct MathServer {
    // ---
    handle: JoinHandle<Result<()>>,
    transport: TransportPtr,
}

impl MathServer {
    // ---
    async fn start(transport: TransportPtr) -> Result<Self> {
        // ---
        let replies = transport.clone();
        let engine = CorrelationEngine::new(&RpcConfig::server()).with_request_handler(
            move |id: &str, name: &str, payload: &str| {
                let reply = match name {
                    "add" => match serde_json::from_str::<AddRequest>(payload) {
                        Ok(req) => Frame::new(
                            FrameKind::Return,
                            id,
                            name,
                            serde_json::to_string(&AddResponse { sum: req.a + req.b })
                                .unwrap(),
                        ),
                        Err(err) => Frame::new(FrameKind::Error, id, name, err.to_string()),
                    },
                    "echo" => Frame::new(FrameKind::Return, id, name, payload),
                    "sleep" => return,
                    other => Frame::new(FrameKind::Error, id, name, format!("no such call: {other}")),
                };

                let replies = replies.clone();
                tokio::spawn(async move {
                    let _ = replies.publish(reply.encode().into()).await;
                });
            },
        );

        let handle = runner::run(transport.clone(), Arc::new(engine)).await?;
        Ok(Self { handle, transport })
    }

    async fn shutdown(self) -> Result<()> {
        // ---
        self.transport.close().await?;
        self.handle.await.expect("server task panicked")?;
        Ok(())
    }
}

struct Harness {
    client: RpcClient,
    client_task: JoinHandle<Result<()>>,
    client_transport: TransportPtr,
    server: MathServer,
    orphans: Arc<AtomicUsize>,
}

impl Harness {
    async fn new(config: RpcConfig) -> Result<Self> {
        // ---
        init_logging();

        let (client_transport, server_transport) = create_memory_pair("client", "server");
        let server = MathServer::start(server_transport).await?;

        let orphans = Arc::new(AtomicUsize::new(0));
        let (on_return, on_error) = (orphans.clone(), orphans.clone());
        let engine = CorrelationEngine::new(&config).with_orphan_handler(ResultFn::new(
            move |_: &str| {
                on_return.fetch_add(1, Ordering::SeqCst);
            },
            move |_: &str| {
                on_error.fetch_add(1, Ordering::SeqCst);
            },
        ));

        let (client, client_task) =
            RpcClient::start(Arc::new(engine), client_transport.clone(), &config).await?;

        Ok(Self {
            client,
            client_task,
            client_transport,
            server,
            orphans,
        })
    }

    async fn shutdown(self) -> Result<()> {
        // ---
        self.client_transport.close().await?;
        self.client_task.await.expect("client task panicked")?;
        self.server.shutdown().await
    }
}

#[tokio::test]
async fn test_basic_request() -> Result<()> {
    // ---
    let harness = Harness::new(RpcConfig::client()).await?;

    let resp: AddResponse = harness
        .client
        .request_json("add", &AddRequest { a: 2, b: 3 })
        .await?;
    assert_eq!(resp.sum, 5);
    assert_eq!(harness.client.engine().pending_count(), 0);

    harness.shutdown().await
}

#[tokio::test]
async fn test_payload_with_commas_round_trips() -> Result<()> {
    // ---
    let harness = Harness::new(RpcConfig::client()).await?;

    let reply = harness.client.request("echo", "a,b,,c,").await?;
    assert_eq!(reply, Reply::Return("a,b,,c,".into()));

    harness.shutdown().await
}

#[tokio::test]
async fn test_error_reply_maps_to_remote() -> Result<()> {
    // ---
    let harness = Harness::new(RpcConfig::client()).await?;

    let reply = harness.client.request("mul", "{}").await?;
    assert_eq!(reply, Reply::Error("no such call: mul".into()));

    let err = harness
        .client
        .request_json::<_, AddResponse>("mul", &AddRequest { a: 1, b: 1 })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote(msg) if msg == "no such call: mul"));

    harness.shutdown().await
}

#[tokio::test]
async fn test_concurrent_requests() -> Result<()> {
    // ---
    let harness = Harness::new(RpcConfig::client()).await?;

    let mut handles = Vec::new();

    for i in 0..10 {
        // ---
        let c = harness.client.clone();

        handles.push(tokio::spawn(async move {
            let resp: AddResponse = c
                .request_json("add", &AddRequest { a: i, b: i })
                .await
                .unwrap();
            resp.sum
        }));
    }

    for (i, task) in handles.into_iter().enumerate() {
        let sum = task.await.unwrap();
        assert_eq!(sum, (i as i32) * 2);
    }

    assert_eq!(harness.client.engine().pending_count(), 0);
    harness.shutdown().await
}

#[tokio::test]
async fn test_timeout_forgets_pending_entry() -> Result<()> {
    // ---
    let config = RpcConfig::client().with_request_timeout(Duration::from_millis(50));
    let harness = Harness::new(config).await?;

    let err = harness.client.request("sleep", "").await.unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert_eq!(harness.client.engine().pending_count(), 0);

    harness.shutdown().await
}

#[tokio::test]
async fn test_timeout_covers_blocked_publish() -> Result<()> {
    // ---
    init_logging();

    // The peer subscribes but never drains its inbox.
    let (client_side, server_side) = create_memory_pair("client", "stalled");
    let _unread = server_side.subscribe().await?;

    let config = RpcConfig::client().with_request_timeout(Duration::from_millis(50));
    let engine = Arc::new(CorrelationEngine::new(&config));
    let client = RpcClient::new(engine.clone(), client_side, &config);

    // Fill the peer's inbox so the next publish cannot complete.
    for _ in 0..64 {
        client.notify("echo", "fill").await?;
    }

    let outcome = tokio::time::timeout(Duration::from_secs(2), client.request("echo", "x"))
        .await
        .expect("request outlived its own timeout");

    assert!(matches!(outcome, Err(Error::Timeout)));
    assert_eq!(engine.pending_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_dropped_request_future_releases_pending_slot() -> Result<()> {
    // ---
    let config = RpcConfig::client().with_max_pending_requests(1);
    let harness = Harness::new(config).await?;

    // The server never answers `sleep`; abandon the call from the outside.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        harness.client.request("sleep", ""),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(harness.client.engine().pending_count(), 0);

    // The single slot is free again.
    let reply = harness.client.request("echo", "after").await?;
    assert_eq!(reply, Reply::Return("after".into()));

    harness.shutdown().await
}

#[tokio::test]
async fn test_full_table_still_sends_but_reply_is_orphaned() -> Result<()> {
    // ---
    let config = RpcConfig::client().with_max_pending_requests(0);
    let harness = Harness::new(config).await?;

    let err = harness.client.request("echo", "hi").await.unwrap_err();
    assert!(matches!(err, Error::NotRegistered(_)));

    // The frame went out anyway; its reply lands on the orphan handler.
    tokio::time::timeout(Duration::from_secs(1), async {
        while harness.orphans.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("reply never reached the orphan handler");

    harness.shutdown().await
}

#[tokio::test]
async fn test_notify_reply_goes_to_orphan_handler() -> Result<()> {
    // ---
    let harness = Harness::new(RpcConfig::client()).await?;

    harness.client.notify("echo", "fire and forget").await?;

    tokio::time::timeout(Duration::from_secs(1), async {
        while harness.orphans.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("reply never reached the orphan handler");
    assert_eq!(harness.client.engine().pending_count(), 0);

    harness.shutdown().await
}

#[tokio::test]
async fn test_runner_survives_malformed_frames() -> Result<()> {
    // ---
    let harness = Harness::new(RpcConfig::client()).await?;

    let raw = harness.server.transport.clone();
    raw.publish("garbage".into()).await?;
    raw.publish("cancel,abc,add,1".into()).await?;

    let reply = harness.client.request("echo", "still alive").await?;
    assert_eq!(reply.payload(), "still alive");

    harness.shutdown().await
}

#[cfg(feature = "logging")]
mod imp {
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }
}

#[cfg(not(feature = "logging"))]
mod imp {
    #[inline]
    pub fn init() {}
}

pub fn init_logging() {
    imp::init();
}
