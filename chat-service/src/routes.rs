//! 对话服务路由模块

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// 创建对话服务路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/connection",
            post(handlers::connect).get(handlers::connection_info),
        )
        .route("/api/languages", get(handlers::list_languages))
        .route("/api/language", put(handlers::select_language))
        .route(
            "/api/chat",
            post(handlers::ask)
                .get(handlers::get_history)
                .delete(handlers::clear_history),
        )
        .route("/api/artifacts/response.txt", get(handlers::download_text))
        .route("/api/artifacts/response.mp3", get(handlers::download_audio))
        .route("/api/health", get(handlers::health_check))
}
