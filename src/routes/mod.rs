pub mod generate;

use rocket::serde::json::Json;
use rocket::{Build, Request, Rocket};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;

pub fn routes() -> Vec<rocket::Route> {
    routes![generate::generate]
}

#[catch(400)]
fn bad_request() -> Json<Value> {
    Json(json!({"error": "Bad request"}))
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Json<Value> {
    Json(json!({"error": format!("No route for {}", req.uri())}))
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    Json(json!({"error": "Request body does not match the expected shape"}))
}

#[catch(500)]
fn server_error() -> Json<Value> {
    Json(json!({"error": "Internal server error"}))
}

/// Assemble the server with its managed config.
pub fn build(config: Config) -> Rocket<Build> {
    rocket::build()
        .manage(Arc::new(config))
        .mount("/", routes())
        .register("/", catchers![bad_request, not_found, unprocessable, server_error])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::{ContentType, Status};
    use rocket::local::blocking::Client;

    fn client() -> Client {
        Client::tracked(build(Config::default())).expect("valid rocket instance")
    }

    #[test]
    fn generate_without_site_is_bad_request() {
        let client = client();
        let resp = client
            .post("/api/generate")
            .header(ContentType::JSON)
            .body(r#"{"brand":{},"article":{"keyword":"decaf"}}"#)
            .dispatch();
        assert_eq!(resp.status(), Status::BadRequest);
        let body: Value = resp.into_json().unwrap();
        assert_eq!(body["error"], "Missing site/sitemap_url");
    }

    #[test]
    fn body_without_content_type_is_accepted() {
        let client = client();
        let resp = client
            .post("/api/generate")
            .body(r#"{"article":{"keyword":"decaf"}}"#)
            .dispatch();
        assert_eq!(resp.status(), Status::BadRequest);
        let body: Value = resp.into_json().unwrap();
        assert_eq!(body["error"], "Missing site/sitemap_url");
    }

    #[test]
    fn malformed_body_gets_json_error() {
        let client = client();
        let resp = client
            .post("/api/generate")
            .header(ContentType::JSON)
            .body("not json")
            .dispatch();
        assert_eq!(resp.status(), Status::BadRequest);
        let body: Value = resp.into_json().unwrap();
        assert!(body.get("error").is_some());
    }

    #[test]
    fn unknown_route_is_json_404() {
        let client = client();
        let resp = client.get("/api/nope").dispatch();
        assert_eq!(resp.status(), Status::NotFound);
        let body: Value = resp.into_json().unwrap();
        assert_eq!(body["error"], "No route for /api/nope");
    }
}
