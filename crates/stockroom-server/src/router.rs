use std::any::Any;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::ServerConfig;
use crate::envelope::Reply;
use crate::error::{FailureDetail, GENERIC_FAILURE};
use crate::handler::{auth, health, inventory, logs};
use crate::state::AppState;

/// Build the axum router with every Stockroom endpoint.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/create_user", post(auth::create_user))
        .route("/inventory", get(inventory::list))
        .route("/inventory/", get(inventory::list))
        .route("/inventory/add", post(inventory::add))
        .route("/inventory/add-multiple", post(inventory::add_multiple))
        .route("/inventory/sell", post(inventory::sell))
        .route("/inventory/sell-multiple", post(inventory::sell_multiple))
        .route("/inventory/delete", delete(inventory::delete))
        .route("/inventory/dashboard", get(inventory::dashboard))
        .route("/inventory/by-date", get(inventory::by_date))
        .route("/inventory/names", get(inventory::names))
        .route("/logs", get(logs::all))
        .route("/logs/", get(logs::all))
        .route("/logs/allot", post(logs::allot))
        .route("/logs/return", post(logs::return_stock))
        .fallback(not_found)
        .with_state(state);

    if config.debug {
        router = router.layer(map_response(expose_failure_detail));
    }

    let debug = config.debug;
    router
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(panic, debug)
        }))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| warn!(%origin, "ignoring invalid CORS origin"))
                .ok()
        }))
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

async fn not_found() -> Reply {
    Reply::failure(StatusCode::NOT_FOUND, "Resource not found")
}

/// Replace the generic 500 body with the underlying failure text.
pub(crate) async fn expose_failure_detail(mut response: Response) -> Response {
    match response.extensions_mut().remove::<FailureDetail>() {
        Some(FailureDetail(detail)) => Reply::failure(response.status(), detail).into_response(),
        None => response,
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, debug: bool) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".into());
    error!(panic = %detail, "handler panicked");
    let message = if debug { detail } else { GENERIC_FAILURE.to_string() };
    Reply::failure(StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}
