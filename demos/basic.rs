//! Minimal missive example: a CGI-style request in, an `http` response out.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Pass a path to simulate a different request:
//!   cargo run --example basic -- '/users/42?fields=name'

use http_body_util::BodyExt;
use missive::query::normalize_query_string;
use missive::{
    Cookie, Message, Method, RequestConfig, Response, ServerRequest, ServerVariables, StatusCode,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let target = std::env::args().nth(1).unwrap_or_else(|| "/users/42?b=2&a=1".to_owned());
    let vars: ServerVariables = [
        ("REQUEST_METHOD", "GET"),
        ("REQUEST_URI", target.as_str()),
        ("SERVER_PROTOCOL", "HTTP/1.1"),
        ("HTTP_HOST", "localhost:3000"),
        ("HTTP_ACCEPT", "application/json"),
        ("HTTP_COOKIE", "session=abc123"),
    ]
    .into_iter()
    .collect();

    let config = RequestConfig::default().with_trusted_hosts(["localhost"]);
    let req = ServerRequest::from_server(vars, &config)?;

    println!("uri:          {}", req.uri());
    println!("target:       {}", req.request_target());
    println!("cache key:    {}", normalize_query_string(req.uri().query().unwrap_or("")));
    println!("session:      {:?}", req.cookie_params().get("session"));

    let res = handle(&req);
    let res = res.modify(|b| b.cookie(Cookie::new("seen", "yes").path("/").http_only(true)));

    let http_res = res.into_http()?;
    println!("status:       {}", http_res.status());
    for (name, value) in http_res.headers() {
        println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
    }
    let body = http_res.into_body().collect().await?.to_bytes();
    println!("\n{}", String::from_utf8_lossy(&body));
    Ok(())
}

// GET /users/:id
//
// Response::json takes anything convertible to Bytes; pass what your
// serialiser produced:
//   serde_json:  Response::json(serde_json::to_vec(&user)?)
//   hand-built:  Response::json(format!(...))
fn handle(req: &ServerRequest) -> Response {
    if req.method() != Method::GET {
        return Response::new(StatusCode::METHOD_NOT_ALLOWED).with_header("Allow", "GET");
    }

    match req.uri().path().strip_prefix("/users/") {
        Some(id) if !id.is_empty() => Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#)),
        _ => Response::builder().status(StatusCode::NOT_FOUND).text("no such user"),
    }
}
