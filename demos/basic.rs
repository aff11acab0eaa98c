//! Minimal trellis example — JSON endpoints behind logging, IP capture and a
//! bearer-token check.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/active
//!   curl -X POST http://localhost:3000/users \
//!        -H 'authorization: Bearer s3cret' \
//!        -d '{"name":"alice"}'
//!   curl -X GET http://localhost:3000/users      ← 405

use serde::{Deserialize, Serialize};
use trellis::middleware::{CaptureAuth, CaptureIp, MethodGuard, RequestLogger};
use trellis::{
    App, Endpoint, Json, Method, Request, Response, Router, Server, StatusCode, read_json_body,
    write_json,
};

#[derive(Serialize)]
struct User {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), trellis::Error> {
    tracing_subscriber::fmt::init();

    let require_token = CaptureAuth::new(|err, res| {
        let body = serde_json::json!({ "error": err.to_string() });
        write_json(res, StatusCode::UNAUTHORIZED, &body);
    });

    let router = Router::new()
        .on(Method::GET, "/users/{id}", get_user)
        .on(Method::GET, "/users/active", active_users)
        .route(
            Endpoint::new("/users", create_user)
                .with(MethodGuard::new(Method::POST))
                .with(require_token),
        );

    let app = App::rest(router)
        .with(RequestLogger)
        .with(CaptureIp)
        .build()?;

    Server::bind("0.0.0.0:3000").serve(app).await
}

// GET /users/{id}
async fn get_user(req: Request) -> Json<User> {
    Json(User {
        id: req.param("id").unwrap_or("unknown").to_owned(),
        name: "alice".to_owned(),
    })
}

// GET /users/active — wins over /users/{id} because static routes go first
async fn active_users(req: Request) -> Response {
    let caller = req.context().ip().unwrap_or("unknown");
    Response::text(format!("active users, as seen from {caller}"))
}

// POST /users — 201 with the new user, 400 on a bad body
async fn create_user(req: Request) -> Response {
    let input: NewUser = match read_json_body(&req) {
        Ok(input) => input,
        Err(e) => {
            return Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .text(e.to_string());
        }
    };

    let created = User { id: "99".to_owned(), name: input.name };
    match serde_json::to_vec(&created) {
        Ok(body) => Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(body),
        Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
