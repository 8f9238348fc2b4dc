//! End-to-end tests over real TCP connections

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use ferrokv::error::Result;
use ferrokv::network::NetworkConfig;
use ferrokv::{Server, StorageEngine};

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

async fn start(max_clients: usize) -> Running {
    let config = NetworkConfig {
        bind_addr: "127.0.0.1".into(),
        port: 0,
        max_clients,
    };
    let server = Server::bind(config, StorageEngine::new()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = stopped.await;
    }));
    Running { addr, stop, handle }
}

fn encode(words: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", words.len()).into_bytes();
    for word in words {
        out.extend_from_slice(format!("${}\r\n{}\r\n", word.len(), word).as_bytes());
    }
    out
}

/// Read until `expected` bytes have arrived
async fn read_exact_reply(stream: &mut TcpStream, expected: &[u8]) -> Vec<u8> {
    let mut got = vec![0u8; expected.len()];
    timeout(Duration::from_secs(5), stream.read_exact(&mut got))
        .await
        .expect("reply timed out")
        .unwrap();
    got
}

async fn roundtrip(stream: &mut TcpStream, words: &[&str], expected: &[u8]) {
    stream.write_all(&encode(words)).await.unwrap();
    assert_eq!(
        read_exact_reply(stream, expected).await,
        expected,
        "reply to {:?}",
        words
    );
}

#[tokio::test]
async fn test_basic_commands_over_tcp() {
    let server = start(16).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    roundtrip(&mut stream, &["PING"], b"+PONG\r\n").await;
    roundtrip(&mut stream, &["SET", "greeting", "hello"], b"+OK\r\n").await;
    roundtrip(&mut stream, &["GET", "greeting"], b"$5\r\nhello\r\n").await;
    roundtrip(&mut stream, &["GET", "nothing"], b"$-1\r\n").await;
    roundtrip(&mut stream, &["ZADD", "z", "1", "a", "2", "b"], b":2\r\n").await;
    roundtrip(
        &mut stream,
        &["ZRANGE", "z", "0", "-1", "WITHSCORES"],
        b"*4\r\n$1\r\na\r\n$1\r\n1\r\n$1\r\nb\r\n$1\r\n2\r\n",
    )
    .await;
    roundtrip(
        &mut stream,
        &["GET", "z"],
        b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n",
    )
    .await;
    roundtrip(&mut stream, &["TTL", "greeting"], b":-1\r\n").await;

    let _ = server.stop.send(());
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_pipelined_and_inline_requests() {
    let server = start(16).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    let mut batch = encode(&["SET", "a", "1"]);
    batch.extend(encode(&["SET", "b", "2"]));
    batch.extend(encode(&["DBSIZE"]));
    batch.extend_from_slice(b"EXISTS a b c\r\n");
    stream.write_all(&batch).await.unwrap();

    let expected = b"+OK\r\n+OK\r\n:2\r\n:2\r\n";
    assert_eq!(read_exact_reply(&mut stream, expected).await, expected);

    let _ = server.stop.send(());
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_quit_closes_connection() {
    let server = start(16).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    roundtrip(&mut stream, &["QUIT"], b"+OK\r\n").await;
    let mut rest = Vec::new();
    let read = timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .expect("close timed out")
        .unwrap();
    assert_eq!(read, 0);

    let _ = server.stop.send(());
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_protocol_error_closes_connection() {
    let server = start(16).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    stream.write_all(b"*1\r\n$abc\r\n").await.unwrap();
    let mut reply = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut reply))
        .await
        .expect("close timed out")
        .unwrap();
    assert!(reply.starts_with(b"-ERR Protocol error"));

    let _ = server.stop.send(());
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_max_clients_rejects_extra_connections() {
    let server = start(1).await;
    let mut first = TcpStream::connect(server.addr).await.unwrap();
    roundtrip(&mut first, &["PING"], b"+PONG\r\n").await;

    let mut second = TcpStream::connect(server.addr).await.unwrap();
    let mut reply = Vec::new();
    timeout(Duration::from_secs(5), second.read_to_end(&mut reply))
        .await
        .expect("rejection timed out")
        .unwrap();
    assert_eq!(reply, b"-ERR max number of clients reached\r\n");

    roundtrip(&mut first, &["ECHO", "still here"], b"$10\r\nstill here\r\n").await;

    let _ = server.stop.send(());
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_drains_idle_connections() {
    let server = start(16).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    roundtrip(&mut stream, &["SET", "k", "v"], b"+OK\r\n").await;

    let _ = server.stop.send(());
    timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server did not drain")
        .unwrap()
        .unwrap();

    let mut rest = Vec::new();
    let read = timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .expect("connection was not closed")
        .unwrap();
    assert_eq!(read, 0);
}
