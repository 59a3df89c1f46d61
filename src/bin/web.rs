use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[path = "../catalog.rs"]
mod catalog;
#[path = "../config.rs"]
mod config;
#[path = "../controller.rs"]
mod controller;
#[path = "../prediction.rs"]
mod prediction;
#[path = "../products.rs"]
mod products;
#[path = "../view.rs"]
mod view;

use catalog::{find_tile, tiles, Tile};
use config::load_settings;
use controller::{ControllerError, PairState};
use prediction::{HttpPredictionService, PredictionService};
use view::View;

struct AppState {
    pair: Mutex<PairState>,
    predictor: Arc<dyn PredictionService>,
}

type SharedState = Arc<AppState>;

#[derive(Deserialize)]
struct SelectRequest {
    identifier: String,
}

#[derive(Deserialize)]
struct SwapRequest {
    index: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum ErrorCode {
    NotFound,
    Conflict,
}

#[derive(Debug, Serialize)]
struct ApiError {
    code: ErrorCode,
    message: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            code,
            message: message.into(),
        }),
    )
}

fn conflict(err: ControllerError) -> (StatusCode, Json<ApiError>) {
    api_error(StatusCode::CONFLICT, ErrorCode::Conflict, err.to_string())
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Reaction Lab</title>
    <link rel="preconnect" href="https://fonts.googleapis.com" />
    <link rel="preconnect" href="https://fonts.gstatic.com" crossorigin />
    <link href="https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&display=swap" rel="stylesheet" />
    <style>
      :root { --text-color: #e6e6e6; }
      html, body { margin: 0; padding: 0; min-height: 100%; background: #0b0c10; color: var(--text-color); font-family: "Space Grotesk", "Segoe UI", sans-serif; }
      .page { max-width: 980px; margin: 0 auto; padding: 24px; }
      .brand { font-size: 22px; font-weight: 600; letter-spacing: 0.02em; }
      .bench { display: flex; align-items: center; justify-content: center; gap: 18px; margin-top: 24px; }
      .slot { display: flex; flex-direction: column; align-items: center; gap: 8px; }
      .box { width: 150px; height: 150px; display: flex; align-items: center; justify-content: center; background: #0f1218; border: 1px solid #2a2f36; border-radius: 10px; font-size: 48px; color: #9aa3ad; transition: opacity 0.15s; }
      .box img { width: 100%; height: 100%; object-fit: contain; border-radius: 8px; }
      .op { font-size: 28px; color: #7f8895; }
      .name { font-size: 14px; }
      .tone-idle { color: var(--text-color); }
      .tone-filled { color: #4fffaa; }
      .tone-product { color: #c58bff; }
      .tone-muted { color: #aaa; }
      .tone-error { color: red; }
      #yield { font-size: 12px; color: #9aa3ad; }
      #status { margin-top: 16px; text-align: center; font-size: 13px; color: #b2bac4; }
      #detail { margin-top: 4px; text-align: center; font-size: 11px; color: #7f8895; }
      .section-title { font-size: 11px; text-transform: uppercase; letter-spacing: 0.12em; color: #9aa3ad; margin: 24px 0 8px; }
      #others { display: flex; justify-content: center; min-height: 90px; }
      .alt { display: flex; flex-direction: column; align-items: center; margin: 0 10px; cursor: pointer; transition: transform 0.2s; }
      .alt:hover { transform: scale(1.1); }
      .alt img { width: 60px; height: 60px; border-radius: 6px; border: 1px solid #777; }
      .alt span { color: #ccc; font-size: 0.8rem; margin-top: 5px; }
      .note { color: #555; font-size: 0.9rem; }
      #tiles { display: grid; grid-template-columns: repeat(8, minmax(0, 1fr)); gap: 8px; }
      .tile { background: #11151b; border: 1px solid #2a2f36; border-radius: 8px; padding: 6px; cursor: pointer; display: flex; flex-direction: column; align-items: center; gap: 4px; }
      .tile:hover { border-color: #3c6a9e; }
      .tile img { width: 56px; height: 56px; object-fit: contain; }
      .tile span { font-size: 11px; color: #c9d1d9; }
      button { background: #11151b; color: #e6e6e6; border: 1px solid #2a2f36; border-radius: 6px; padding: 6px 10px; font-size: 12px; cursor: pointer; }
    </style>
  </head>
  <body>
    <div class="page">
      <div class="brand">Reaction Lab</div>
      <div class="bench">
        <div class="slot"><div id="r1-box" class="box"></div><div id="r1-name" class="name">Empty</div></div>
        <div class="op">+</div>
        <div class="slot"><div id="r2-box" class="box"></div><div id="r2-name" class="name">Empty</div></div>
        <div class="op">&rarr;</div>
        <div class="slot"><div id="product-box" class="box">?</div><div id="product-name" class="name">Unknown</div><div id="yield">0%</div></div>
      </div>
      <div id="status">Waiting for input...</div>
      <div id="detail"></div>
      <div class="section-title">Other products</div>
      <div id="others"></div>
      <div class="section-title">Reactants <button id="reset">Reset</button></div>
      <div id="tiles"></div>
    </div>
    <script type="module">
      const el = (id) => document.getElementById(id);

      async function call(method, path, body) {
        const response = await fetch(path, {
          method,
          headers: body ? { "Content-Type": "application/json" } : {},
          body: body ? JSON.stringify(body) : undefined,
        });
        if (!response.ok) {
          const err = await response.json().catch(() => ({ message: response.statusText }));
          throw new Error(err.message);
        }
        return response.json();
      }

      function image(url, cls) {
        const img = document.createElement("img");
        img.src = url;
        if (cls) img.className = cls;
        return img;
      }

      function fillSlot(box, label, slot) {
        box.innerHTML = "";
        if (slot.image) box.appendChild(image(slot.image));
        label.textContent = slot.name;
        label.className = "name tone-" + slot.tone;
      }

      function render(view) {
        fillSlot(el("r1-box"), el("r1-name"), view.first);
        fillSlot(el("r2-box"), el("r2-name"), view.second);

        const box = el("product-box");
        box.innerHTML = "";
        if (view.product_box.kind === "image") {
          box.appendChild(image(view.product_box.url));
          box.style.opacity = "0.5";
          setTimeout(() => (box.style.opacity = "1"), 150);
        } else {
          box.textContent = view.product_box.text;
        }
        el("product-name").textContent = view.product_label;
        el("product-name").className = "name tone-" + view.product_tone;
        el("yield").textContent = view.yield_text;
        el("status").textContent = view.status;
        el("detail").textContent = view.detail || "";

        const others = el("others");
        others.innerHTML = "";
        for (const alt of view.alternates) {
          const card = document.createElement("div");
          card.className = "alt";
          card.appendChild(image(alt.image));
          const label = document.createElement("span");
          label.textContent = alt.formula;
          card.appendChild(label);
          card.onclick = () => call("POST", "/api/swap", { index: alt.index }).then(render).catch(fail);
          others.appendChild(card);
        }
        if (view.side_note) {
          const note = document.createElement("span");
          note.className = "note";
          note.textContent = view.side_note;
          others.appendChild(note);
        }
      }

      function fail(err) {
        el("status").textContent = err.message;
      }

      async function loadTiles() {
        const tiles = await call("GET", "/api/tiles");
        const grid = el("tiles");
        for (const tile of tiles) {
          const cell = document.createElement("div");
          cell.className = "tile";
          cell.appendChild(image(tile.image_ref));
          const name = document.createElement("span");
          name.textContent = tile.display_name;
          cell.appendChild(name);
          cell.onclick = async () => {
            el("status").textContent = "Consulting prediction engine...";
            try {
              render(await call("POST", "/api/select", { identifier: tile.identifier }));
            } catch (err) {
              fail(err);
            }
          };
          grid.appendChild(cell);
        }
      }

      el("reset").onclick = () => call("POST", "/api/reset").then(render).catch(fail);

      loadTiles().catch(fail);
      call("GET", "/api/view").then(render).catch(fail);
    </script>
  </body>
</html>
"##;

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn list_tiles() -> Json<&'static [Tile]> {
    Json(tiles())
}

async fn current_view(State(state): State<SharedState>) -> Json<View> {
    let pair = state.pair.lock().await;
    Json(view::render(&pair))
}

async fn select(
    State(state): State<SharedState>,
    Json(req): Json<SelectRequest>,
) -> ApiResult<View> {
    let tile = find_tile(&req.identifier).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            format!("unknown reactant '{}'", req.identifier),
        )
    })?;

    let pending = {
        let mut pair = state.pair.lock().await;
        let transition = pair.select(tile);
        *pair = transition.state;
        transition.prediction
    };

    // The lock is released while the prediction is in flight; a reset in
    // the meantime bumps the generation and this result is dropped.
    let pair = match pending {
        Some(pending) => {
            let outcome = state.predictor.predict(&pending.request).await;
            let mut pair = state.pair.lock().await;
            *pair = pair.resolve(&pending, outcome);
            pair
        }
        None => state.pair.lock().await,
    };
    debug!(phase = pair.phase().name(), "selection handled");
    Ok(Json(view::render(&pair)))
}

async fn swap(
    State(state): State<SharedState>,
    Json(req): Json<SwapRequest>,
) -> ApiResult<View> {
    let mut pair = state.pair.lock().await;
    *pair = pair.swap(req.index).map_err(conflict)?;
    Ok(Json(view::render(&pair)))
}

async fn reset(State(state): State<SharedState>) -> Json<View> {
    let mut pair = state.pair.lock().await;
    *pair = pair.reset();
    info!(generation = pair.generation(), "pair reset");
    Json(view::render(&pair))
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/tiles", get(list_tiles))
        .route("/api/view", get(current_view))
        .route("/api/select", post(select))
        .route("/api/swap", post(swap))
        .route("/api/reset", post(reset))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings(None).context("loading settings")?;
    let predictor = HttpPredictionService::new(&settings.predict_url, settings.request_timeout())
        .context("building prediction client")?;
    info!(endpoint = predictor.endpoint(), "prediction service configured");

    let state = Arc::new(AppState {
        pair: Mutex::new(PairState::new()),
        predictor: Arc::new(predictor),
    });
    let app = build_router(state);

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Serving on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
