use std::collections::HashMap;
use std::io::Read;

use porter::app::build_environ;
use porter::http::request::Request;

fn sample_request() -> Request {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "text".to_string());
    headers.insert("content-length".to_string(), "10".to_string());
    headers.insert("other-header".to_string(), "Value".to_string());

    Request {
        method: "GET".to_string(),
        path: "/path".to_string(),
        query: "a=1&b=2".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: b"abc".to_vec(),
    }
}

#[test]
fn test_environ_cgi_variables() {
    let environ = build_environ(&sample_request(), "localhost", 9000, "http");

    assert_eq!(environ.var("REQUEST_METHOD").unwrap(), "GET");
    assert_eq!(environ.var("SCRIPT_NAME").unwrap(), "");
    assert_eq!(environ.var("PATH_INFO").unwrap(), "/path");
    assert_eq!(environ.var("QUERY_STRING").unwrap(), "a=1&b=2");
    assert_eq!(environ.var("SERVER_NAME").unwrap(), "localhost");
    assert_eq!(environ.var("SERVER_PORT").unwrap(), "9000");
    assert_eq!(environ.var("SERVER_PROTOCOL").unwrap(), "HTTP/1.1");
}

#[test]
fn test_environ_content_headers_extracted() {
    let environ = build_environ(&sample_request(), "localhost", 9000, "http");

    assert_eq!(environ.var("CONTENT_TYPE").unwrap(), "text");
    assert_eq!(environ.var("CONTENT_LENGTH").unwrap(), "10");
    // Consumed into dedicated keys, not expanded as HTTP_*.
    assert!(environ.var("HTTP_CONTENT_TYPE").is_none());
    assert!(environ.var("HTTP_CONTENT_LENGTH").is_none());
}

#[test]
fn test_environ_http_header_expansion() {
    let environ = build_environ(&sample_request(), "localhost", 9000, "http");
    assert_eq!(environ.var("HTTP_OTHER_HEADER").unwrap(), "Value");
}

#[test]
fn test_environ_content_keys_absent_without_headers() {
    let request = Request {
        method: "GET".to_string(),
        path: "/".to_string(),
        query: String::new(),
        version: "HTTP/1.1".to_string(),
        headers: HashMap::new(),
        body: Vec::new(),
    };
    let environ = build_environ(&request, "localhost", 9000, "http");

    assert!(environ.var("CONTENT_TYPE").is_none());
    assert!(environ.var("CONTENT_LENGTH").is_none());
    assert_eq!(environ.var("QUERY_STRING").unwrap(), "");
}

#[test]
fn test_environ_input_positioned_at_body() {
    let environ = build_environ(&sample_request(), "localhost", 9000, "http");

    let mut body = Vec::new();
    environ.input().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"abc");
}

#[test]
fn test_environ_capability_flags() {
    let environ = build_environ(&sample_request(), "localhost", 9000, "http");

    assert!(environ.multithread());
    assert!(environ.multiprocess());
    assert!(!environ.run_once());
}

#[test]
fn test_environ_url_scheme() {
    let environ = build_environ(&sample_request(), "localhost", 9000, "https");
    assert_eq!(environ.url_scheme(), "https");
}
