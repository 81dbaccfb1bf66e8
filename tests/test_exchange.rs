//! リクエストからボディ読み取りまでの一連のやり取りのテスト
//!
//! インメモリのトランスポートに決められたレスポンスを流し、
//! 送信されたリクエストと受信結果を確認する。

mod common;

use std::io::{Read, Seek, SeekFrom};

use blocking_http11::{
    Client, ClientConfig, Connection, ErrorKind, HttpVersion, Method, make_request,
};
use common::ScriptedServer;

#[test]
fn redirect_loop_is_bounded() {
    let redirect = "HTTP/1.1 302 Found\r\nLocation: http://example.com/loop\r\nContent-Length: 0\r\n\r\n";
    let server = ScriptedServer::new(vec![redirect; 10]);
    let mut conn = server.connection("example.com", 80);

    let response = make_request(&mut conn, "/start").unwrap().get().unwrap();
    assert_eq!(response.status_code(), 302);
    drop(response);

    // 5 回送信して 5 回目のレスポンスを受け取る
    assert_eq!(server.request_lines().len(), 5);
    assert_eq!(server.connects().len(), 5);
}

#[test]
fn redirect_then_partial_content() {
    let server = ScriptedServer::new([
        "HTTP/1.1 307 Temporary Redirect\r\nLocation: http://mirror.example.org/reads.bam\r\nContent-Length: 0\r\n\r\n",
        "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 100-149/1000\r\nContent-Length: 50\r\n\r\n01234567890123456789012345678901234567890123456789",
    ]);
    let mut conn = server.connection("example.com", 80);

    let mut request = make_request(&mut conn, "/reads.bam").unwrap();
    request.byte_range(100, 50);
    let response = request.get().unwrap();
    assert_eq!(response.status(), (206, "Partial Content"));
    assert_eq!(response.range().unwrap(), Some((100, 50)));
    assert_eq!(response.url().host(), "mirror.example.org");
    assert_eq!(response.read_body().unwrap().len(), 50);

    assert_eq!(
        server.request_lines(),
        [
            "GET /reads.bam HTTP/1.1",
            "GET /reads.bam HTTP/1.1"
        ]
    );
    // Range はリダイレクト後も送る
    assert_eq!(server.requests().matches("Range: bytes=100-149\r\n").count(), 2);
    assert!(server.requests().contains("Host: mirror.example.org\r\n"));
    assert_eq!(conn.host(), "mirror.example.org");
}

#[test]
fn chunked_body_over_fragmented_reads() {
    let server = ScriptedServer::with_read_size(
        ["HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n"],
        2,
    );
    let mut conn = server.connection("example.com", 80);
    let response = make_request(&mut conn, "/").unwrap().get().unwrap();

    let mut body = response.body_stream();
    let mut out = Vec::new();
    body.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"hello");
    assert!(body.is_finished());
}

#[test]
fn chunked_error_is_sticky() {
    let server = ScriptedServer::new([
        "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nnot-hex\r\n",
    ]);
    let mut conn = server.connection("example.com", 80);
    let mut body = make_request(&mut conn, "/")
        .unwrap()
        .get()
        .unwrap()
        .body_stream();

    let mut buf = [0u8; 8];
    for _ in 0..3 {
        let err = body.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChunkedDecodeError);
    }
}

#[test]
fn reserved_headers_do_not_reach_the_wire() {
    let server = ScriptedServer::new(["HTTP/1.1 204 No Content\r\n\r\n"]);
    let mut conn = server.connection("example.com", 80);

    let mut request = make_request(&mut conn, "/").unwrap();
    assert_eq!(
        request.add_header("Host", "x").unwrap_err().kind(),
        ErrorKind::ReservedHeaderRejected
    );
    assert_eq!(
        request.add_header("Content-Length", "1").unwrap_err().kind(),
        ErrorKind::ReservedHeaderRejected
    );
    request.add_header("User-Agent", "blocking_http11-test").unwrap();
    request.get().unwrap();

    assert_eq!(
        server.requests(),
        "GET / HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\nUser-Agent: blocking_http11-test\r\n\r\n"
    );
}

#[test]
fn content_range_must_agree_with_length() {
    let server = ScriptedServer::new([
        "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 10-19/100\r\nContent-Length: 10\r\n\r\n0123456789\
HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 10-19/100\r\nContent-Length: 11\r\n\r\n0123456789X",
    ]);
    let mut conn = server.connection("example.com", 80);

    let response = make_request(&mut conn, "/").unwrap().get().unwrap();
    assert_eq!(response.range().unwrap(), Some((10, 10)));
    response.read_body().unwrap();

    let response = make_request(&mut conn, "/").unwrap().get().unwrap();
    assert_eq!(
        response.range().unwrap_err().kind(),
        ErrorKind::InconsistentContentRange
    );
}

#[test]
fn version_downgrade_on_505() {
    let server = ScriptedServer::new([
        "HTTP/1.1 505 HTTP Version Not Supported\r\nContent-Length: 0\r\n\r\n",
        "HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nok",
    ]);
    let mut conn = server.connection("legacy.example.com", 80);
    let response = make_request(&mut conn, "/cgi").unwrap().get().unwrap();
    assert_eq!(response.version(), HttpVersion::HTTP_1_0);
    assert_eq!(response.read_body().unwrap(), b"ok");

    assert_eq!(
        server.request_lines(),
        ["GET /cgi HTTP/1.1", "GET /cgi HTTP/1.0"]
    );
    assert_eq!(conn.version(), HttpVersion::HTTP_1_0);
    // HTTP/1.0 で keep-alive がなければ閉じる
    assert!(!conn.is_open());
}

#[test]
fn continue_is_returned_as_is() {
    let server = ScriptedServer::new(["HTTP/1.1 100 Continue\r\n\r\n"]);
    let mut conn = server.connection("example.com", 80);
    let response = make_request(&mut conn, "/").unwrap().post().unwrap();
    assert_eq!(response.status_code(), 100);
}

#[test]
fn continue_does_not_leak_into_next_request() {
    let server = ScriptedServer::new([
        "HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nfirst",
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n",
    ]);
    let mut conn = server.connection("example.com", 80);

    let mut request = make_request(&mut conn, "/upload").unwrap();
    request.add_post_param("a=1");
    let response = request.post().unwrap();
    assert_eq!(response.status_code(), 100);
    drop(response);
    assert!(!conn.is_open());

    // 100 の後ろの 200 を次のリクエストの応答として読まない
    let response = make_request(&mut conn, "/other").unwrap().get().unwrap();
    assert_eq!(response.status_code(), 404);
    assert_eq!(server.connects().len(), 2);
}

#[test]
fn repeated_content_length_is_accepted() {
    let server = ScriptedServer::new([
        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\nhello",
    ]);
    let mut conn = server.connection("example.com", 80);
    let response = make_request(&mut conn, "/").unwrap().get().unwrap();
    assert_eq!(response.size().unwrap(), Some(5));
    assert_eq!(response.read_body().unwrap(), b"hello");
}

#[test]
fn unread_body_forces_reconnect() {
    let server = ScriptedServer::new([
        "HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n0123456789",
        "HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabc",
    ]);
    let mut conn = server.connection("example.com", 80);

    let response = make_request(&mut conn, "/big").unwrap().get().unwrap();
    let mut body = response.body_stream();
    let mut buf = [0u8; 4];
    body.read_exact(&mut buf).unwrap();
    drop(body);

    let response = make_request(&mut conn, "/small").unwrap().get().unwrap();
    assert_eq!(response.read_body().unwrap(), b"abc");
    assert_eq!(server.connects().len(), 2);
}

#[test]
fn head_then_get_on_one_connection() {
    let server = ScriptedServer::new([
        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello",
    ]);
    let mut conn = server.connection("example.com", 80);

    let response = make_request(&mut conn, "/").unwrap().head().unwrap();
    assert_eq!(response.size().unwrap(), Some(5));
    drop(response);

    let response = make_request(&mut conn, "/").unwrap().get().unwrap();
    assert_eq!(response.read_body().unwrap(), b"hello");
    assert_eq!(server.connects().len(), 1);
}

#[test]
fn header_into_reports_needed_size() {
    let server = ScriptedServer::new([
        "HTTP/1.1 200 OK\r\nETag: \"0123456789\"\r\nContent-Length: 0\r\n\r\n",
    ]);
    let mut conn = server.connection("example.com", 80);
    let response = make_request(&mut conn, "/").unwrap().get().unwrap();

    let mut small = [0u8; 4];
    let err = response.header_into("etag", &mut small).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBuffer);
    assert_eq!(err.to_string(), "buffer too small: 12 bytes needed");

    let mut buf = [0u8; 12];
    assert_eq!(response.header_into("ETag", &mut buf).unwrap(), Some(12));
    assert_eq!(&buf, b"\"0123456789\"");
    assert_eq!(response.header_into("X-Missing", &mut buf).unwrap(), None);
}

#[test]
fn connection_failure_surfaces() {
    let server = ScriptedServer::new(Vec::<&str>::new());
    let mut conn = Connection::new("down.example.com", 8080, ClientConfig::default(), server);
    let err = make_request(&mut conn, "/").unwrap().get().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
}

#[test]
fn http_file_reads_through_client() {
    let server = ScriptedServer::new([
        "HTTP/1.1 301 Moved Permanently\r\nLocation: /v2/data.bin\r\nContent-Length: 0\r\n\r\n",
        "HTTP/1.1 200 OK\r\nContent-Length: 8\r\n\r\n\
HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 0-3/8\r\nContent-Length: 4\r\n\r\nABCD",
    ]);
    let client = Client::with_config(ClientConfig::default()).connector(server.clone());
    let mut file = client.open_file("http://example.com/data.bin").unwrap();
    assert_eq!(file.size(), Some(8));
    assert_eq!(file.url().path(), "/v2/data.bin");

    let mut buf = [0u8; 4];
    file.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ABCD");

    // サイズを越えた位置はリクエストせずに EOF
    file.seek(SeekFrom::Start(8)).unwrap();
    assert_eq!(file.read(&mut buf).unwrap(), 0);

    assert_eq!(
        server.request_lines(),
        [
            "HEAD /data.bin HTTP/1.1",
            "HEAD /v2/data.bin HTTP/1.1",
            "GET /v2/data.bin HTTP/1.1"
        ]
    );
}

#[test]
fn method_names() {
    assert_eq!(Method::Get.to_string(), "GET");
    assert_eq!(Method::Head.as_str(), "HEAD");
    assert_eq!(Method::Post.as_str(), "POST");
}
