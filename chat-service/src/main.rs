//! 数据库对话服务
//!
//! 用自然语言查询已连接的 MySQL / PostgreSQL 数据库，包括：
//! - 由语言模型生成并执行 SQL
//! - 根据查询结果生成自然语言回答
//! - 回答翻译与语音合成
//! - 对话记录与最新回答的文本、语音文件

mod artifacts;
mod chunking;
mod gateway;
mod handlers;
mod llm;
mod orchestrator;
mod prompts;
mod routes;
mod session;
mod speech;
mod state;
mod translation;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{AppConfig, ServiceUrls};
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "chat-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "对话服务 API",
        version = "0.1.0",
        description = "数据库对话微服务：Text2SQL、多语言回答、语音合成"
    ),
    paths(
        handlers::connect,
        handlers::connection_info,
        handlers::list_languages,
        handlers::select_language,
        handlers::ask,
        handlers::get_history,
        handlers::clear_history,
        handlers::download_text,
        handlers::download_audio,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectRequest,
        common::models::ConnectionInfo,
        common::models::DbType,
        common::models::AskRequest,
        common::models::AskResponse,
        common::models::ChatTurn,
        common::models::ChatRole,
        common::models::Language,
        common::models::LanguagesResponse,
        common::models::SelectLanguageRequest,
        handlers::HealthResponse,
    )),
    tags(
        (name = "connection", description = "数据库连接端点"),
        (name = "language", description = "回答语言端点"),
        (name = "chat", description = "问答与对话记录端点"),
        (name = "artifacts", description = "最新回答文件端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 先加载 .env（可选）
    dotenvy::dotenv().ok();

    // 初始化日志追踪（LOG_FORMAT=json 输出结构化日志）
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);
    let urls = ServiceUrls::load();
    info!(
        llm = %urls.llm,
        model = %config.llm_model,
        output_dir = %config.output_dir.display(),
        "配置已加载"
    );

    // 创建应用状态与输出目录
    let state = AppState::new(config.clone(), urls);
    state
        .orchestrator
        .artifacts()
        .ensure_dir()
        .await
        .with_context(|| {
            format!(
                "创建输出目录失败: {}",
                state.orchestrator.artifacts().dir().display()
            )
        })?;

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_addr();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
