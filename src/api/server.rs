use std::sync::{Arc, RwLock};

use anyhow::Result;
use axum::extract::State;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Router, extract::Request, response::Response};
use http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::public::ApiError;
use super::routes;
use crate::api::state::{AppState, RelayState};
use crate::core::{AppConfig, StartupError};
use crate::gemini::{GeminiClient, SharedGenerator, select_model};

type SharedState = Arc<RwLock<AppState>>;

pub const LIVENESS_TEXT: &str = "Hello world! Gemini";

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

/// Reject any request whose `Origin` is not on the allow-list.
/// Requests without an `Origin` header are not cross-origin and pass.
async fn reject_disallowed_origin(
    State(allowed): State<Arc<Vec<String>>>,
    request: Request,
    next: middleware::Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let is_allowed = origin
            .to_str()
            .map(|o| allowed.iter().any(|a| a == o))
            .unwrap_or(false);
        if !is_allowed {
            return ApiError::Forbidden("Origin not allowed".to_string()).into_response();
        }
    }
    next.run(request).await
}

pub fn app(shared_state: SharedState) -> Router {
    let allowed_origins: Vec<String> = shared_state
        .read()
        .map(|s| s.config.allowed_origins.clone())
        .unwrap_or_default();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Liveness probe
        .route("/", get(liveness))
        // API routes
        .nest("/api", routes::router())
        .layer(middleware::from_fn_with_state(
            Arc::new(allowed_origins),
            reject_disallowed_origin,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&shared_state))
}

/// Pick the active model and build the shared state. Fails when no
/// candidate model works, in which case nothing should be served.
pub async fn initialize(
    config: AppConfig,
    generator: SharedGenerator,
) -> Result<SharedState, StartupError> {
    let mut app_state = AppState::new(Arc::clone(&generator), config.clone());
    app_state.relay = RelayState::Selecting;

    match select_model(
        &*generator,
        &config.model_candidates,
        &config.smoke_test_prompt,
    )
    .await
    {
        Ok(model) => {
            app_state.relay = RelayState::Ready { model };
            Ok(Arc::new(RwLock::new(app_state)))
        }
        Err(e) => {
            app_state.relay = RelayState::Fatal {
                reason: e.to_string(),
            };
            tracing::error!("Model selection failed, relay is {:?}", app_state.relay);
            Err(e)
        }
    }
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format! {
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                }
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let generator: SharedGenerator = Arc::new(GeminiClient::new(
        &config.gemini_api_hostname,
        &config.gemini_api_key,
    ));

    // Model selection happens before binding so a server without a
    // working model never accepts a connection
    let shared_state = initialize(config, generator).await?;
    let app = app(Arc::clone(&shared_state));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::info!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
