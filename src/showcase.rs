//! Demo application served by the `balboa` binary.
//!
//! Routes:
//! - `GET /`                         plain greeting
//! - `GET /search?name=..`           greeting from a query parameter
//! - `GET /sphere?radius=..`         sphere surface area (templates read from `[templates] directory`)
//! - `GET /cylinder?radius=..&height=..` cylinder surface area
//! - `GET /api/status`               JSON status
//! - `GET /about`, `/about/{name}`, `/about/{name}/hello` (mounted under `/about`)
//! - `SSE /events`, `SSE /ticker`
//! - `WS /chat` (broadcast), `WS /hello` (one message then close)

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::App;
use crate::config::AppConfig;
use crate::handlers::{ConnectionRegistry, EventStream, HandlerError, Request, WebSocket};
use crate::routing::{ParameterSet, RouteError};
use crate::template;

pub fn build(config: &AppConfig) -> Result<App, RouteError> {
    let mut app = App::from_config("balboa", config);

    app.get("/").send_as("Hello, World!", "text/plain");
    app.get("/search").send_fn_as(search, "text/plain");

    let about = app.get("/").send("Hello!").finish()?;
    let about_hello = app.get("/{name}/hello").send("Hello, {name}!").finish()?;
    let about_name = app.get("/{name}").send_fn_as(introduce, "text/plain").finish()?;

    let templates = PathBuf::from(&config.templates.directory);
    app.get("/sphere").send_fn({
        let templates = templates.clone();
        move |req: &Request| sphere(req, &templates)
    });
    app.get("/cylinder").send_fn(move |req: &Request| cylinder(req, &templates));
    app.get("/api/status").scoped(|route| {
        let address = config.server.bind_address.clone();
        route.json_fn(move |_req| {
            serde_json::to_string(&serde_json::json!({ "status": "ok", "address": address }))
                .map_err(|e| HandlerError::failed(e.to_string()))
        });
        Ok::<_, RouteError>(())
    })?;

    app.sse("/events").send_fn(countdown);
    app.sse("/ticker").send("tick");

    app.ws("/chat").send_fn(chat);
    app.ws("/hello").send("Welcome to Balboa!");

    for id in [about_name, about_hello, about].into_iter().flatten() {
        app.mount_route("/about", id)?;
    }

    Ok(app)
}

fn search(req: &Request) -> Result<String, HandlerError> {
    Ok(match req.params().get("name") {
        Some(name) => format!("Hello, {name}!"),
        None => "Hello, World!".to_string(),
    })
}

fn introduce(req: &Request) -> Result<String, HandlerError> {
    let name = req.params().require("name")?;
    let age = req.params().get("age").unwrap_or("10");
    Ok(format!("Your name is {name} and you are {age} years old."))
}

/// `radius` or its short form `r`, parsed as a float.
fn dimension(params: &ParameterSet, long: &str, short: &str) -> Option<f64> {
    params.get(long).or_else(|| params.get(short))?.parse().ok()
}

fn sphere(req: &Request, templates: &Path) -> Result<String, HandlerError> {
    let Some(radius) = dimension(req.params(), "radius", "r") else {
        return Ok("<p>Invalid radius provided.</p>".to_string());
    };
    let area = 4.0 * PI * radius * radius;
    Ok(template::render_file(
        templates.join("sphere.html"),
        &[("radius", radius.to_string()), ("area", format!("{area:.3}"))],
    )?)
}

fn cylinder(req: &Request, templates: &Path) -> Result<String, HandlerError> {
    let (Some(radius), Some(height)) = (
        dimension(req.params(), "radius", "r"),
        dimension(req.params(), "height", "h"),
    ) else {
        return Ok("<p>Invalid radius or height provided.</p>".to_string());
    };
    let area = 2.0 * PI * radius * (radius + height);
    Ok(template::render_file(
        templates.join("cylinder.html"),
        &[
            ("radius", radius.to_string()),
            ("height", height.to_string()),
            ("area", format!("{area:.3}")),
        ],
    )?)
}

async fn countdown(stream: EventStream, params: ParameterSet) -> Result<(), HandlerError> {
    let count = match params.get("count") {
        Some(_) => params.parse::<u32>("count")?,
        None => 5,
    };
    for i in 0..count {
        stream.send(&format!("{i} This is a server-sent event")).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    Ok(())
}

async fn chat(mut socket: WebSocket, registry: ConnectionRegistry) -> Result<(), HandlerError> {
    while let Some(message) = socket.next_message().await {
        let delivered = socket.broadcast(&registry, &message).await;
        tracing::trace!(session_id = %socket.id(), delivered, "Chat message relayed");
    }
    Ok(())
}
