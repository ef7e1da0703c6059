//! Integration tests for the polling client
//!
//! Loopback servers speak raw HTTP/1.1 bytes on spawned threads; the
//! client runs over the plain-TCP connector so the full poll cycle is
//! exercised end to end.

use httpoll::client::{Client, ClientConfig, PollMode};
use httpoll::response::Response;
use httpoll::session::TcpConnector;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

type Delivered = (u16, Vec<u8>);

/// Read one request's header block (none of the tests send bodies).
fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        buf.extend_from_slice(&chunk[..n]);
        if n == 0 || buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8(buf).unwrap()
}

fn new_client(
    port: u16,
    configure: impl FnOnce(&mut ClientConfig),
) -> (Client<TcpConnector>, mpsc::Receiver<Delivered>) {
    let (tx, rx) = mpsc::channel();
    let mut config = ClientConfig::new("127.0.0.1", port);
    configure(&mut config);

    let connector = TcpConnector::new("127.0.0.1", port);
    let client = Client::with_connector(connector, config, move |r: Response| {
        tx.send((r.status(), r.content().to_vec())).unwrap();
    })
    .unwrap();

    (client, rx)
}

fn poll_until_response(
    client: &mut Client<TcpConnector>,
    rx: &mpsc::Receiver<Delivered>,
) -> Delivered {
    for _ in 0..500 {
        client.poll().unwrap();
        if let Ok(item) = rx.try_recv() {
            return item;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("no response delivered after 500 poll cycles");
}

#[test]
fn test_request_wire_format_and_delivery() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);

        assert!(request.starts_with("GET /price HTTP/1.1\r\n"));
        assert!(request.contains("Host: 127.0.0.1\r\n"));
        assert!(request.contains("Accept: */*\r\n"));
        assert!(request.contains("Connection: keep-alive\r\n"));

        stream
            .write_all(b"HTTP/1.1 200 OK\r\nConnection: keep-alive\r\nContent-Length: 5\r\n\r\nhello")
            .unwrap();

        // Hold the connection until the client goes away.
        let _ = stream.read(&mut [0u8; 1]);
    });

    let (mut client, rx) = new_client(port, |_| {});
    client.get("/price", "").unwrap();

    let (status, content) = poll_until_response(&mut client, &rx);
    assert_eq!(status, 200);
    assert_eq!(content, b"hello");

    // Delivered exactly once.
    for _ in 0..10 {
        client.poll().unwrap();
    }
    assert!(rx.try_recv().is_err());

    drop(client);
    handle.join().unwrap();
}

#[test]
fn test_sequential_delivery_order() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        for body in ["one", "two"] {
            let _ = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 200 OK\r\nConnection: keep-alive\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
        let _ = stream.read(&mut [0u8; 1]);
    });

    let (mut client, rx) = new_client(port, |_| {});

    client.get("/first", "").unwrap();
    let (_, first) = poll_until_response(&mut client, &rx);
    client.get("/second", "").unwrap();
    let (_, second) = poll_until_response(&mut client, &rx);

    assert_eq!(first, b"one");
    assert_eq!(second, b"two");

    drop(client);
    handle.join().unwrap();
}

#[test]
fn test_reconnect_on_connection_close() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        // First connection declares close and is dropped.
        let (mut first, _) = listener.accept().unwrap();
        let _ = read_request(&mut first);
        first
            .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 3\r\n\r\nbye")
            .unwrap();
        drop(first);

        // The client reconnects and issues its next request here.
        let (mut second, _) = listener.accept().unwrap();
        let _ = read_request(&mut second);
        second
            .write_all(b"HTTP/1.1 200 OK\r\nConnection: keep-alive\r\nContent-Length: 5\r\n\r\nagain")
            .unwrap();
        let _ = second.read(&mut [0u8; 1]);
    });

    let (mut client, rx) = new_client(port, |_| {});

    client.get("/last", "").unwrap();
    let (status, content) = poll_until_response(&mut client, &rx);
    assert_eq!(status, 200);
    assert_eq!(content, b"bye");

    // The close signal makes the next cycles tear down and reconnect.
    for _ in 0..50 {
        client.poll().unwrap();
        if client.is_connected() {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(client.is_connected());

    client.get("/fresh", "").unwrap();
    let (_, content) = poll_until_response(&mut client, &rx);
    assert_eq!(content, b"again");

    drop(client);
    handle.join().unwrap();
}

#[test]
fn test_zero_length_body() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_request(&mut stream);
        stream
            .write_all(b"HTTP/1.1 204 No Content\r\nConnection: keep-alive\r\nContent-Length: 0\r\n\r\n")
            .unwrap();
        let _ = stream.read(&mut [0u8; 1]);
    });

    let (mut client, rx) = new_client(port, |_| {});
    client.get("/ack", "").unwrap();

    let (status, content) = poll_until_response(&mut client, &rx);
    assert_eq!(status, 204);
    assert!(content.is_empty());

    drop(client);
    handle.join().unwrap();
}

#[test]
fn test_bounded_wait_poll_mode() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_request(&mut stream);
        thread::sleep(Duration::from_millis(50));
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nConnection: keep-alive\r\nContent-Length: 4\r\n\r\nlate")
            .unwrap();
        let _ = stream.read(&mut [0u8; 1]);
    });

    let (mut client, rx) = new_client(port, |config| {
        config.poll_mode = PollMode::Wait(Duration::from_millis(5));
    });
    client.get("/slow", "").unwrap();

    // The response is still in flight; a bounded-wait cycle returns
    // without delivering anything.
    client.poll().unwrap();
    assert!(rx.try_recv().is_err());

    let (status, content) = poll_until_response(&mut client, &rx);
    assert_eq!(status, 200);
    assert_eq!(content, b"late");

    drop(client);
    handle.join().unwrap();
}

#[test]
fn test_connect_failure_is_fatal() {
    // Bind then drop to find a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let connector = TcpConnector::new("127.0.0.1", port);
    let config = ClientConfig::new("127.0.0.1", port);
    let result = Client::with_connector(connector, config, |_: Response| {});
    assert!(result.is_err());
}
