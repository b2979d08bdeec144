//! Single-page form front end: `GET /` shows the form, `POST /` asks the
//! selected model and shows the answer inline.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatcher::{Dispatcher, SelectionNotFound};
use crate::registry::Registry;

pub struct AppState {
    dispatcher: Dispatcher,
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    model: String,
    #[serde(default)]
    question: String,
}

#[derive(Debug, Default)]
struct PageView<'a> {
    selected: Option<&'a str>,
    response: &'a str,
    notice: Option<String>,
}

pub fn router(dispatcher: Dispatcher) -> Router {
    let state = Arc::new(AppState { dispatcher });
    Router::new()
        .route("/", get(show_form).post(submit_form))
        .with_state(state)
}

pub async fn serve(cfg: &Config, dispatcher: Dispatcher) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&cfg.web_bind_addr)
        .await
        .with_context(|| format!("Failed to bind web front end to '{}'", cfg.web_bind_addr))?;
    info!(addr = %cfg.web_bind_addr, "web front end listening");

    axum::serve(listener, router(dispatcher))
        .await
        .context("Web server stopped unexpectedly")
}

async fn show_form(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(state.dispatcher.registry(), &PageView::default()))
}

async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AskForm>,
) -> (StatusCode, Html<String>) {
    let registry = state.dispatcher.registry();

    match state.dispatcher.ask(&form.model, &form.question).await {
        Ok(response) => {
            let view = PageView {
                selected: Some(form.model.as_str()),
                response: &response,
                notice: None,
            };
            (StatusCode::OK, Html(render_page(registry, &view)))
        }
        Err(SelectionNotFound(name)) => {
            warn!(model = %name, "web request named an unknown model");
            let view = PageView {
                notice: Some(format!("Unknown model: {name}")),
                ..PageView::default()
            };
            (StatusCode::BAD_REQUEST, Html(render_page(registry, &view)))
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn render_page(registry: &Registry, view: &PageView<'_>) -> String {
    let options: String = registry
        .entries()
        .iter()
        .map(|entry| {
            let name = escape_html(&entry.display_name);
            let selected = if view.selected == Some(entry.display_name.as_str()) {
                " selected"
            } else {
                ""
            };
            format!("        <option value=\"{name}\"{selected}>{name}</option>\n")
        })
        .collect();

    let notice = view
        .notice
        .as_deref()
        .map(|text| format!("    <p class=\"notice\">{}</p>\n", escape_html(text)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
  <meta charset=\"utf-8\">
  <title>Model Relay</title>
</head>
<body>
  <h1>Ask a model</h1>
{notice}  <form method=\"post\" action=\"/\">
    <label for=\"model\">Model</label>
    <select id=\"model\" name=\"model\">
{options}    </select>
    <label for=\"question\">Question</label>
    <textarea id=\"question\" name=\"question\" rows=\"4\"></textarea>
    <button type=\"submit\">Ask</button>
  </form>
  <h2>Response</h2>
  <pre id=\"response\">{response}</pre>
</body>
</html>
",
        response = escape_html(view.response),
    )
}
