//! End-to-end tests over real TCP connections.

use respkv::connection::ConnectionStats;
use respkv::server::{Server, ServerError};
use respkv::storage::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct TestServer {
    addr: SocketAddr,
    server: Arc<Server>,
    store: Store,
    accept_loop: JoinHandle<Result<(), ServerError>>,
    lifecycle: watch::Sender<bool>,
}

async fn start() -> TestServer {
    let (lifecycle, signal) = watch::channel(false);
    let store = Store::new();
    store.start(signal);

    let server = Arc::new(Server::new(store.clone(), Arc::new(ConnectionStats::new())));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let serving = Arc::clone(&server);
    let accept_loop = tokio::spawn(async move { serving.serve(listener).await });

    TestServer {
        addr,
        server,
        store,
        accept_loop,
        lifecycle,
    }
}

async fn expect(client: &mut TcpStream, expected: &[u8]) {
    let mut buf = vec![0u8; expected.len()];
    timeout(Duration::from_secs(2), client.read_exact(&mut buf))
        .await
        .expect("timed out waiting for reply")
        .unwrap();
    assert_eq!(
        buf,
        expected,
        "got {:?}",
        String::from_utf8_lossy(&buf)
    );
}

async fn read_until_closed(client: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    timeout(Duration::from_secs(2), client.read_to_end(&mut out))
        .await
        .expect("connection was not closed")
        .unwrap();
    out
}

#[tokio::test]
async fn set_then_get_on_one_connection() {
    let t = start().await;
    let mut client = TcpStream::connect(t.addr).await.unwrap();

    client
        .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+OK\r\n").await;

    client
        .write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+bar\r\n").await;
}

#[tokio::test]
async fn last_write_wins_across_connections() {
    let t = start().await;
    let mut a = TcpStream::connect(t.addr).await.unwrap();
    let mut b = TcpStream::connect(t.addr).await.unwrap();

    a.write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$2\r\nv1\r\n")
        .await
        .unwrap();
    expect(&mut a, b"+OK\r\n").await;

    b.write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$2\r\nv2\r\n")
        .await
        .unwrap();
    expect(&mut b, b"+OK\r\n").await;

    a.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await.unwrap();
    expect(&mut a, b"+v2\r\n").await;
}

#[tokio::test]
async fn missing_key_reports_error_and_keeps_connection() {
    let t = start().await;
    let mut client = TcpStream::connect(t.addr).await.unwrap();

    client
        .write_all(b"*2\r\n$3\r\nGET\r\n$5\r\nnever\r\n")
        .await
        .unwrap();
    expect(&mut client, b"-ERR: key 'never' not found\r\n").await;

    client
        .write_all(b"*3\r\n$3\r\nSET\r\n$5\r\nnever\r\n:7\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+OK\r\n").await;

    client
        .write_all(b"*2\r\n$3\r\nGET\r\n$5\r\nnever\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+7\r\n").await;
}

#[tokio::test]
async fn unsupported_command_closes_connection() {
    let t = start().await;
    let mut client = TcpStream::connect(t.addr).await.unwrap();

    client.write_all(b"*1\r\n$3\r\nFOO\r\n").await.unwrap();
    let out = read_until_closed(&mut client).await;
    assert_eq!(
        out,
        b"-ERR: unsupported command: 'FOO' (use uppercase instead)\r\n"
    );
}

#[tokio::test]
async fn truncated_array_is_a_protocol_error() {
    let t = start().await;
    let mut client = TcpStream::connect(t.addr).await.unwrap();

    client.write_all(b"*2\r\n$3\r\nGET\r\n").await.unwrap();
    client.shutdown().await.unwrap();

    let out = read_until_closed(&mut client).await;
    assert_eq!(out, b"-ERR: unexpected end of stream\r\n");
}

#[tokio::test]
async fn quit_closes_after_ok() {
    let t = start().await;
    let mut client = TcpStream::connect(t.addr).await.unwrap();

    client
        .write_all(b"*2\r\n$6\r\nCLIENT\r\n$7\r\nSETNAME\r\n*1\r\n$4\r\nQUIT\r\n")
        .await
        .unwrap();
    let out = read_until_closed(&mut client).await;
    assert_eq!(out, b"+OK\r\n+OK\r\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_do_not_lose_writes() {
    let t = start().await;

    let mut tasks = Vec::new();
    for i in 0..32 {
        let addr = t.addr;
        tasks.push(tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            let key = format!("key:{}", i);
            let value = format!("value:{}", i);
            let request = format!(
                "*3\r\n$3\r\nSET\r\n${}\r\n{}\r\n${}\r\n{}\r\n",
                key.len(),
                key,
                value.len(),
                value
            );
            client.write_all(request.as_bytes()).await.unwrap();
            expect(&mut client, b"+OK\r\n").await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for i in 0..32 {
        let value = t.store.get(format!("key:{}", i)).await.unwrap();
        assert_eq!(
            value.map(|v| v.to_string()),
            Some(format!("value:{}", i))
        );
    }
}

#[tokio::test]
async fn store_shutdown_turns_commands_into_noops() {
    let t = start().await;
    let mut client = TcpStream::connect(t.addr).await.unwrap();

    client
        .write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+OK\r\n").await;

    t.lifecycle.send(true).unwrap();
    timeout(Duration::from_secs(1), async {
        while !t.store.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    client
        .write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+OK\r\n").await;
}

#[tokio::test]
async fn server_shutdown_leaves_open_connections_running() {
    let t = start().await;
    let mut client = TcpStream::connect(t.addr).await.unwrap();

    client
        .write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+OK\r\n").await;

    t.server.shutdown();
    let result = timeout(Duration::from_secs(1), t.accept_loop)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ServerError::Closed)));

    client
        .write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut client, b"+v\r\n").await;
}
