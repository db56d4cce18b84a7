//! Minimal tsu-log example: a couple of endpoints behind the access log.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!   ACCESS_LOG_FORMAT=combined RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -u frank:secret http://localhost:3000/healthz

use http::{Method, StatusCode};
use tsu_log::{AccessLog, BoxedHandler, Format, Request, Response, Server, TracingLogger};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let format = match std::env::var("ACCESS_LOG_FORMAT") {
        Ok(name) => name.parse().unwrap_or_else(|e| {
            tracing::warn!("{e}, falling back to common");
            Format::Common
        }),
        Err(_) => Format::Common,
    };

    let app = BoxedHandler::new(route).layer(&AccessLog::with_format(format, TracingLogger));

    Server::bind(([0, 0, 0, 0], 3000))
        .serve(app)
        .await
        .expect("server error");
}

// No router here: tsu-log only needs something to wrap.
fn route(res: &mut Response, req: &Request) {
    let result = match (req.method(), req.path()) {
        (&Method::GET, "/healthz") => res.text("ok"),
        (&Method::GET, path) if path.starts_with("/users/") => {
            let id = &path["/users/".len()..];
            res.json(format!(r#"{{"id":"{id}","name":"alice"}}"#).as_bytes())
        }
        (&Method::POST, "/users") if !req.body().is_empty() => {
            res.set_status(StatusCode::CREATED);
            res.header("location", "/users/99");
            res.json(br#"{"id":"99","name":"new_user"}"#)
        }
        (&Method::POST, "/users") => {
            res.set_status(StatusCode::BAD_REQUEST);
            Ok(())
        }
        _ => {
            res.set_status(StatusCode::NOT_FOUND);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::warn!(path = req.path(), "failed to write response: {e}");
    }
}
