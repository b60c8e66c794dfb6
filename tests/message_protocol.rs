use http_body_util::BodyExt;
use missive::query::normalize_query_string;
use missive::{
    Error, Message, Method, Request, RequestConfig, Response, ServerRequest, ServerVariables,
    StatusCode, Stream, Uri, Version,
};

#[test]
fn test_should_batch_edit_response_without_touching_original() {
    let r = Response::new(StatusCode::OK);
    let edited = r.modify(|b| {
        b.header("X-One", "1")
            .header("X-Two", "2")
            .header("X-Three", "3")
    });

    assert_eq!(edited.headers().len(), 3);
    assert!(r.headers().is_empty());
}

#[test]
fn test_should_keep_every_accessor_stable_across_edits() {
    let req = Request::builder()
        .method(Method::POST)
        .target("http://example.com/a?x=1")
        .header("X-Foo", "1")
        .body("payload")
        .build()
        .unwrap();

    let _ = req.with_method(Method::DELETE);
    let _ = req.with_header("X-Foo", "2");
    let _ = req.with_added_header("X-Bar", "b");
    let _ = req.without_header("x-foo");
    let _ = req.with_protocol_version(Version::HTTP_2);
    let _ = req.with_body("other");
    let _ = req.without_body();
    let _ = req.with_uri(Uri::parse("http://other.test/").unwrap(), false);
    let _ = req.with_request_target("*");

    assert_eq!(req.method(), Method::POST);
    assert_eq!(req.header("x-foo"), ["1"]);
    assert!(!req.has_header("x-bar"));
    assert_eq!(req.protocol_version(), Version::HTTP_11);
    assert_eq!(req.body().unwrap().contents().unwrap(), "payload");
    assert_eq!(req.uri().to_string(), "http://example.com/a?x=1");
    assert_eq!(req.header_line("host"), "example.com");
    assert_eq!(req.request_target(), "/a?x=1");
}

#[test]
fn test_should_identify_headers_case_insensitively() {
    let r = Response::text("hi").with_header("X-Foo", "1");
    assert!(r.has_header("x-foo"));
    let names: Vec<_> = r.headers().iter().map(|(name, _)| name).collect();
    assert!(names.contains(&"X-Foo"));
}

#[test]
fn test_should_share_one_stream_between_derived_messages() {
    let original = Response::builder().body(Stream::memory()).build();
    let derived = original.with_header("X", "1");

    derived.body().unwrap().lock().write(b"written once").unwrap();
    assert_eq!(original.body().unwrap().contents().unwrap(), "written once");
}

#[test]
fn test_should_elide_port_as_scheme_changes() {
    let uri = Uri::parse("http://example.com:80/test.html").unwrap();
    assert_eq!(uri.port(), None);

    let https = uri.with_scheme("https");
    assert_eq!(https.port(), Some(80));
    assert_eq!(https.with_port(443).port(), None);
    assert_eq!(https.with_scheme("http").port(), uri.port());
}

#[test]
fn test_should_reject_out_of_range_port_everywhere() {
    assert!(matches!(Uri::parse("http://example.com:99999/x"), Err(Error::InvalidPort(_))));
    assert!(matches!(
        Request::new(Method::GET, "http://example.com:99999/x"),
        Err(Error::InvalidPort(_))
    ));
}

#[test]
fn test_should_use_normalized_query_as_cache_key() {
    let vars = |uri: &str| -> ServerVariables {
        [("REQUEST_URI", uri), ("HTTP_HOST", "example.com")].into_iter().collect()
    };
    let config = RequestConfig::default();

    let first = ServerRequest::from_server(vars("/s?b=2&a=hello+world"), &config).unwrap();
    let second = ServerRequest::from_server(vars("/s?a=hello%20world&&b=2"), &config).unwrap();

    let key = |req: &ServerRequest| normalize_query_string(req.uri().query().unwrap_or(""));
    assert_eq!(key(&first), key(&second));
    assert_eq!(key(&first), "a=hello%20world&b=2");
}

#[tokio::test]
async fn test_should_round_trip_through_http_crate() {
    let http_req = http::Request::builder()
        .method("POST")
        .uri("http://example.com/echo")
        .header("Content-Type", "text/plain")
        .body("ping")
        .unwrap();

    let req = Request::try_from(http_req).unwrap();
    let echo = req.body().unwrap().contents().unwrap();

    let res = Response::builder()
        .status(StatusCode::OK)
        .bytes(missive::ContentType::Text, echo);

    let http_res = res.into_http().unwrap();
    assert_eq!(http_res.headers()["content-type"], "text/plain; charset=utf-8");
    let body = http_res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, "ping");
}
