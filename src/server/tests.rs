//! Tests for the HTTP server implementation.

#[cfg(test)]
mod connection_tests {
    use std::collections::VecDeque;
    use std::io::{self, ErrorKind, Read, Write};

    use crate::registry::{MemorySource, RegistryLimits, ResponseRegistry, NOT_FOUND_RESPONSE};
    use crate::server::{on_readable, CloseReason, Outcome, ParseState, SlotKey, SlotPool};

    const HELLO: &str = "<html><body>Hello World!</body></html>";
    const GET_TEST: &[u8] = b"GET /test HTTP/1.1\r\n\r\n";

    enum Step {
        Data(Vec<u8>),
        Eof,
        Fail(ErrorKind),
    }

    // Scripted socket: reads replay the steps, then report would-block
    struct MockStream {
        reads: VecDeque<Step>,
        written: Vec<u8>,
        write_budget: Option<usize>,
    }

    impl MockStream {
        fn new() -> Self {
            Self {
                reads: VecDeque::new(),
                written: Vec::new(),
                write_budget: None,
            }
        }

        fn with_data(data: &[u8]) -> Self {
            let mut stream = Self::new();
            stream.push(Step::Data(data.to_vec()));
            stream
        }

        fn push(&mut self, step: Step) {
            self.reads.push_back(step);
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Err(ErrorKind::WouldBlock.into()),
                Some(Step::Eof) => Ok(0),
                Some(Step::Fail(kind)) => Err(kind.into()),
                Some(Step::Data(mut data)) => {
                    let n = buf.len().min(data.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.reads.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = match self.write_budget.as_mut() {
                Some(0) => return Err(ErrorKind::WouldBlock.into()),
                Some(budget) => {
                    let n = (*budget).min(buf.len());
                    *budget -= n;
                    n
                }
                None => buf.len(),
            };
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn registry() -> ResponseRegistry {
        let source = MemorySource::new().with("test", HELLO).with("other", "other body");
        ResponseRegistry::build(source, RegistryLimits::default()).unwrap()
    }

    fn ok_response() -> Vec<u8> {
        format!("HTTP/1.1 200 OK\r\nContent-Length:38\r\n\r\n{HELLO}").into_bytes()
    }

    fn connect(stream: MockStream, capacity: usize) -> (SlotPool<MockStream>, SlotKey) {
        let mut pool = SlotPool::new(1, capacity);
        let key = pool.allocate(stream).ok().unwrap();
        (pool, key)
    }

    fn written(pool: &SlotPool<MockStream>, key: SlotKey) -> Vec<u8> {
        pool.get(key).unwrap().stream().unwrap().written.clone()
    }

    #[test]
    fn test_exact_match_is_served() {
        let registry = registry();
        let (mut pool, key) = connect(MockStream::with_data(GET_TEST), 1000);

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Open));

        let response = written(&pool, key);
        assert!(response.starts_with(b"HTTP/1.1 200 OK\r\nContent-Length:38\r\n\r\n"));
        assert_eq!(response, ok_response());
    }

    #[test]
    fn test_missing_url_gets_404() {
        let registry = registry();
        let (mut pool, key) = connect(MockStream::with_data(b"GET /missing HTTP/1.1\r\n\r\n"), 1000);

        on_readable(pool.get_mut(key).unwrap(), &registry);
        assert_eq!(written(&pool, key), NOT_FOUND_RESPONSE);
    }

    #[test]
    fn test_non_get_method_gets_404() {
        let registry = registry();
        let (mut pool, key) = connect(MockStream::with_data(b"POST /test HTTP/1.1\r\n\r\n"), 1000);

        on_readable(pool.get_mut(key).unwrap(), &registry);
        assert_eq!(written(&pool, key), NOT_FOUND_RESPONSE);
    }

    #[test]
    fn test_headers_are_skipped() {
        let registry = registry();
        let request = b"GET /test HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n\r\n";
        let (mut pool, key) = connect(MockStream::with_data(request), 1000);

        on_readable(pool.get_mut(key).unwrap(), &registry);
        assert_eq!(written(&pool, key), ok_response());
    }

    #[test]
    fn test_only_the_first_line_is_matched() {
        let registry = registry();
        let request = b"GET /missing HTTP/1.1\r\nGET /test HTTP/1.1\r\n\r\n";
        let (mut pool, key) = connect(MockStream::with_data(request), 1000);

        on_readable(pool.get_mut(key).unwrap(), &registry);
        assert_eq!(written(&pool, key), NOT_FOUND_RESPONSE);
    }

    #[test]
    fn test_one_byte_per_read() {
        let registry = registry();
        let request = b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (mut pool, key) = connect(MockStream::new(), 1000);

        for (i, byte) in request.iter().enumerate() {
            let slot = pool.get_mut(key).unwrap();
            slot.stream_mut().unwrap().push(Step::Data(vec![*byte]));
            assert!(matches!(on_readable(slot, &registry), Outcome::Open));

            if i + 1 < request.len() {
                assert!(slot.stream().unwrap().written.is_empty(), "responded early at byte {i}");
            }
            if i + 1 == b"GET /test HTTP/1.1\r\n".len() {
                assert_eq!(slot.state(), ParseState::AwaitingBlankLine);
                assert_eq!(slot.matched(), Some(0));
                assert_eq!(slot.line_cursor(), i + 1);
            }
        }

        assert_eq!(written(&pool, key), ok_response());
    }

    #[test]
    fn test_every_split_point_gives_same_response() {
        let registry = registry();
        let request = b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n";

        for split in 1..request.len() {
            let (mut pool, key) = connect(MockStream::with_data(&request[..split]), 1000);
            on_readable(pool.get_mut(key).unwrap(), &registry);

            let slot = pool.get_mut(key).unwrap();
            slot.stream_mut().unwrap().push(Step::Data(request[split..].to_vec()));
            on_readable(slot, &registry);

            assert_eq!(written(&pool, key), ok_response(), "split at {split}");
        }
    }

    #[test]
    fn test_slot_is_reset_after_response() {
        let registry = registry();
        let (mut pool, key) = connect(MockStream::with_data(GET_TEST), 1000);

        let slot = pool.get_mut(key).unwrap();
        on_readable(slot, &registry);

        assert_eq!(slot.write_cursor(), 0);
        assert_eq!(slot.line_cursor(), 0);
        assert_eq!(slot.state(), ParseState::AwaitingRequestLine);
        assert_eq!(slot.matched(), None);
        assert_eq!(slot.pending(), None);
    }

    #[test]
    fn test_bytes_after_blank_line_are_dropped() {
        let registry = registry();
        let pipelined = [GET_TEST, &b"GET /other HTTP/1.1\r\n\r\n"[..]].concat();
        let (mut pool, key) = connect(MockStream::with_data(&pipelined), 1000);

        on_readable(pool.get_mut(key).unwrap(), &registry);
        assert_eq!(written(&pool, key), ok_response());

        // The next request on the connection starts from a clean buffer.
        let slot = pool.get_mut(key).unwrap();
        slot.stream_mut().unwrap().push(Step::Data(b"GET /missing HTTP/1.1\r\n\r\n".to_vec()));
        on_readable(slot, &registry);
        assert_eq!(written(&pool, key), [ok_response().as_slice(), NOT_FOUND_RESPONSE].concat());
    }

    #[test]
    fn test_buffer_exhaustion_closes_without_response() {
        let registry = registry();
        let (mut pool, key) = connect(MockStream::with_data(&[b'a'; 16]), 16);

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Close(CloseReason::BufferExhausted)));
        assert!(written(&pool, key).is_empty());
    }

    #[test]
    fn test_headers_overflowing_buffer_close() {
        let registry = registry();
        let (mut pool, key) = connect(MockStream::with_data(b"GET /test HTTP/1.1\r\nHost: a-very-long-host\r\n"), 32);

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Close(CloseReason::BufferExhausted)));
        assert!(written(&pool, key).is_empty());
    }

    #[test]
    fn test_request_filling_buffer_exactly_is_served() {
        let registry = registry();
        let (mut pool, key) = connect(MockStream::with_data(GET_TEST), GET_TEST.len());

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Open));
        assert_eq!(written(&pool, key), ok_response());
    }

    #[test]
    fn test_peer_close_releases_connection() {
        let registry = registry();
        let mut stream = MockStream::with_data(b"GET /test HTTP/1.1\r\n");
        stream.push(Step::Eof);
        let (mut pool, key) = connect(stream, 1000);

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Close(CloseReason::PeerClosed)));
        assert!(written(&pool, key).is_empty());
    }

    #[test]
    fn test_receive_error_closes() {
        let registry = registry();
        let mut stream = MockStream::new();
        stream.push(Step::Fail(ErrorKind::ConnectionReset));
        let (mut pool, key) = connect(stream, 1000);

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Close(CloseReason::Io(ref e)) if e.kind() == ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let registry = registry();
        let mut stream = MockStream::new();
        stream.push(Step::Fail(ErrorKind::Interrupted));
        stream.push(Step::Data(GET_TEST.to_vec()));
        let (mut pool, key) = connect(stream, 1000);

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Open));
        assert_eq!(written(&pool, key), ok_response());
    }

    #[test]
    fn test_blocked_send_resumes_before_reading() {
        let registry = registry();
        let mut stream = MockStream::with_data(GET_TEST);
        stream.write_budget = Some(10);
        let (mut pool, key) = connect(stream, 1000);

        let slot = pool.get_mut(key).unwrap();
        assert!(matches!(on_readable(slot, &registry), Outcome::Open));
        assert_eq!(slot.pending().map(|p| p.written), Some(10));

        // A second request is already waiting, but must not be answered before the first.
        let stream = slot.stream_mut().unwrap();
        stream.push(Step::Data(b"GET /missing HTTP/1.1\r\n\r\n".to_vec()));
        stream.write_budget = None;
        assert!(matches!(on_readable(slot, &registry), Outcome::Open));
        assert_eq!(slot.pending(), None);

        assert_eq!(written(&pool, key), [ok_response().as_slice(), NOT_FOUND_RESPONSE].concat());
    }

    #[test]
    fn test_send_error_closes() {
        let registry = registry();

        struct BrokenPipe(Option<Vec<u8>>);

        impl Read for BrokenPipe {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match self.0.take() {
                    Some(data) => {
                        buf[..data.len()].copy_from_slice(&data);
                        Ok(data.len())
                    }
                    None => Err(ErrorKind::WouldBlock.into()),
                }
            }
        }

        impl Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut pool = SlotPool::new(1, 1000);
        let key = pool.allocate(BrokenPipe(Some(GET_TEST.to_vec()))).ok().unwrap();

        let outcome = on_readable(pool.get_mut(key).unwrap(), &registry);
        assert!(matches!(outcome, Outcome::Close(CloseReason::Io(ref e)) if e.kind() == ErrorKind::BrokenPipe));
    }
}

#[cfg(test)]
mod server_tests {
    use std::net::SocketAddr;
    use std::thread::JoinHandle;
    use std::time::Duration;

    use log::debug;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time;

    use crate::registry::{MemorySource, ResponseRegistry, NOT_FOUND_RESPONSE};
    use crate::server::{Error, HttpServer, ServerConfig, ShutdownHandle};

    const HELLO: &str = "<html><body>Hello World!</body></html>";
    const GET_TEST: &[u8] = b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n";

    struct TestServer {
        addr: SocketAddr,
        handle: ShutdownHandle,
        thread: Option<JoinHandle<Result<(), Error>>>,
    }

    impl TestServer {
        fn start(config: ServerConfig) -> Self {
            let registry = ResponseRegistry::build(MemorySource::new().with("test", HELLO), config.registry_limits()).unwrap();
            let server = HttpServer::bind(config, registry).unwrap();
            let addr = server.local_addr().unwrap();
            let handle = server.shutdown_handle();

            let thread = std::thread::spawn(move || {
                let mut server = server;
                server.run()
            });

            Self {
                addr,
                handle,
                thread: Some(thread),
            }
        }

        fn with_max_connections(max_connections: usize) -> Self {
            Self::start(ServerConfig {
                addr: "127.0.0.1:0".parse().unwrap(),
                max_connections,
                ..ServerConfig::default()
            })
        }

        fn stop(&mut self) -> Option<Result<(), Error>> {
            self.handle.shutdown().unwrap();
            self.thread.take().map(|thread| thread.join().unwrap())
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if self.thread.is_some() {
                let _ = self.stop();
            }
        }
    }

    fn ok_response() -> Vec<u8> {
        format!("HTTP/1.1 200 OK\r\nContent-Length:38\r\n\r\n{HELLO}").into_bytes()
    }

    async fn round_trip(stream: &mut TcpStream, request: &[u8], expected_len: usize) -> Vec<u8> {
        stream.write_all(request).await.unwrap();
        let mut buf = vec![0; expected_len];
        time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
            .await
            .expect("Timed out waiting for response")
            .unwrap();
        buf
    }

    // The server closed the connection without sending anything
    async fn assert_closed(stream: &mut TcpStream) {
        let mut buf = [0u8; 64];
        let read = time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("Timed out waiting for close");
        match read {
            Ok(n) => assert_eq!(n, 0, "Expected close, got {:?}", &buf[..n]),
            Err(e) => debug!("Connection reset: {e}"),
        }
    }

    #[tokio::test]
    async fn test_serves_registered_response() {
        let server = TestServer::with_max_connections(8);
        let mut stream = TcpStream::connect(server.addr).await.unwrap();

        let response = round_trip(&mut stream, GET_TEST, ok_response().len()).await;
        assert_eq!(response, ok_response());
    }

    #[tokio::test]
    async fn test_unknown_url_gets_404() {
        let server = TestServer::with_max_connections(8);
        let mut stream = TcpStream::connect(server.addr).await.unwrap();

        let response = round_trip(&mut stream, b"GET /missing HTTP/1.1\r\n\r\n", NOT_FOUND_RESPONSE.len()).await;
        assert_eq!(response, NOT_FOUND_RESPONSE);
    }

    #[tokio::test]
    async fn test_connection_serves_consecutive_requests() {
        let server = TestServer::with_max_connections(8);
        let mut stream = TcpStream::connect(server.addr).await.unwrap();

        for _ in 0..3 {
            let response = round_trip(&mut stream, GET_TEST, ok_response().len()).await;
            assert_eq!(response, ok_response());
        }
        let response = round_trip(&mut stream, b"POST /test HTTP/1.1\r\n\r\n", NOT_FOUND_RESPONSE.len()).await;
        assert_eq!(response, NOT_FOUND_RESPONSE);
    }

    #[tokio::test]
    async fn test_fragmented_request() {
        let server = TestServer::with_max_connections(8);
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.set_nodelay(true).unwrap();

        for byte in GET_TEST {
            stream.write_all(&[*byte]).await.unwrap();
            time::sleep(Duration::from_millis(1)).await;
        }

        let mut buf = vec![0; ok_response().len()];
        time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
            .await
            .expect("Timed out waiting for response")
            .unwrap();
        assert_eq!(buf, ok_response());
    }

    #[tokio::test]
    async fn test_pool_exhaustion_rejects_one_connection() {
        let server = TestServer::with_max_connections(2);

        let mut first = TcpStream::connect(server.addr).await.unwrap();
        let mut second = TcpStream::connect(server.addr).await.unwrap();
        assert_eq!(round_trip(&mut first, GET_TEST, ok_response().len()).await, ok_response());
        assert_eq!(round_trip(&mut second, GET_TEST, ok_response().len()).await, ok_response());

        let mut third = TcpStream::connect(server.addr).await.unwrap();
        assert_closed(&mut third).await;

        // The two admitted connections are unaffected.
        assert_eq!(round_trip(&mut first, GET_TEST, ok_response().len()).await, ok_response());
        assert_eq!(round_trip(&mut second, GET_TEST, ok_response().len()).await, ok_response());
    }

    #[tokio::test]
    async fn test_released_slot_is_reused() {
        let server = TestServer::with_max_connections(1);

        let mut first = TcpStream::connect(server.addr).await.unwrap();
        assert_eq!(round_trip(&mut first, GET_TEST, ok_response().len()).await, ok_response());
        first.shutdown().await.unwrap();
        assert_closed(&mut first).await;
        drop(first);

        // Closing is asynchronous on the server side, so allow a few attempts.
        for attempt in 0..50 {
            let mut next = TcpStream::connect(server.addr).await.unwrap();
            if next.write_all(GET_TEST).await.is_ok() {
                let mut buf = vec![0; ok_response().len()];
                if let Ok(Ok(_)) = time::timeout(Duration::from_millis(200), next.read_exact(&mut buf)).await {
                    assert_eq!(buf, ok_response());
                    return;
                }
            }
            debug!("Slot not free yet, attempt {attempt}");
            time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Released slot was never reused");
    }

    #[tokio::test]
    async fn test_oversized_request_is_closed() {
        let server = TestServer::with_max_connections(8);
        let mut stream = TcpStream::connect(server.addr).await.unwrap();

        stream.write_all(&[b'a'; 1000]).await.unwrap();
        assert_closed(&mut stream).await;
    }

    #[tokio::test]
    async fn test_shutdown_returns_from_run() {
        let mut server = TestServer::with_max_connections(8);
        let _idle = TcpStream::connect(server.addr).await.unwrap();

        let result = server.stop().expect("Server thread already joined");
        assert!(result.is_ok());
    }
}
