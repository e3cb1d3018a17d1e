//! Handler模块

use std::time::Instant;

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::{AppError, AppResult};
use common::models::{
    AskRequest, AskResponse, ChatTurn, ConnectRequest, ConnectionInfo, Language,
    LanguagesResponse, SelectLanguageRequest, SUPPORTED_LANGUAGES,
};
use common::response::ApiResponse;

use crate::artifacts::{AUDIO_FILE, TEXT_FILE};
use crate::state::AppState;

/// 连接数据库（替换当前连接）
#[utoipa::path(
    post,
    path = "/api/connection",
    tag = "connection",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "连接成功", body = ApiResponse<ConnectionInfo>),
        (status = 400, description = "参数错误或不支持的数据库类型"),
        (status = 502, description = "数据库无法连接")
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> AppResult<Json<ApiResponse<ConnectionInfo>>> {
    let config = req.into_config()?;
    let gateway = state.connector.connect(&config).await?;
    let info = state.session.lock().await.attach(gateway, &config);

    tracing::info!(
        db_type = %info.db_type,
        host = %info.host,
        port = info.port,
        database = %info.database,
        "数据库已连接"
    );
    Ok(Json(ApiResponse::ok_with_service(info, state.config.service.clone())))
}

/// 获取当前连接信息
#[utoipa::path(
    get,
    path = "/api/connection",
    tag = "connection",
    responses(
        (status = 200, description = "当前连接", body = ApiResponse<ConnectionInfo>),
        (status = 409, description = "尚未连接数据库")
    )
)]
pub async fn connection_info(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ConnectionInfo>>> {
    let info = state
        .session
        .lock()
        .await
        .connection_info()
        .cloned()
        .ok_or(AppError::NotConnected)?;
    Ok(Json(ApiResponse::ok_with_service(info, state.config.service.clone())))
}

/// 列出支持的语言及当前选择
#[utoipa::path(
    get,
    path = "/api/languages",
    tag = "language",
    responses(
        (status = 200, description = "语言列表", body = ApiResponse<LanguagesResponse>)
    )
)]
pub async fn list_languages(State(state): State<AppState>) -> Json<ApiResponse<LanguagesResponse>> {
    let selected = state.session.lock().await.language();
    Json(ApiResponse::ok_with_service(
        LanguagesResponse {
            selected,
            supported: SUPPORTED_LANGUAGES.to_vec(),
        },
        state.config.service.clone(),
    ))
}

/// 选择回答语言（名称或代码）
#[utoipa::path(
    put,
    path = "/api/language",
    tag = "language",
    request_body = SelectLanguageRequest,
    responses(
        (status = 200, description = "语言已切换", body = ApiResponse<Language>),
        (status = 400, description = "不支持的语言")
    )
)]
pub async fn select_language(
    State(state): State<AppState>,
    Json(req): Json<SelectLanguageRequest>,
) -> AppResult<Json<ApiResponse<Language>>> {
    req.validate()?;
    let language = state.session.lock().await.select_language(&req.language)?;
    tracing::info!(language = language.code, "回答语言已切换");
    Ok(Json(ApiResponse::ok_with_service(language, state.config.service.clone())))
}

/// 提问：生成 SQL、执行、回答、翻译并合成语音
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = AskRequest,
    responses(
        (status = 200, description = "回答", body = ApiResponse<AskResponse>),
        (status = 400, description = "问题为空"),
        (status = 409, description = "尚未连接数据库"),
        (status = 502, description = "模型、翻译或语音服务失败")
    )
)]
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> AppResult<Json<ApiResponse<AskResponse>>> {
    let question = req.question()?;
    let started = Instant::now();

    // 整个流水线期间持有会话锁，同一时间只处理一个问题
    let mut session = state.session.lock().await;
    let response = state.orchestrator.ask(&mut session, question).await?;

    Ok(Json(
        ApiResponse::ok_with_service(response, state.config.service.clone())
            .with_duration(started.elapsed().as_millis() as u64),
    ))
}

/// 获取对话记录
#[utoipa::path(
    get,
    path = "/api/chat",
    tag = "chat",
    responses(
        (status = 200, description = "对话记录（按时间顺序）", body = ApiResponse<Vec<ChatTurn>>)
    )
)]
pub async fn get_history(State(state): State<AppState>) -> Json<ApiResponse<Vec<ChatTurn>>> {
    let transcript = state.session.lock().await.transcript().to_vec();
    Json(ApiResponse::ok_with_service(transcript, state.config.service.clone()))
}

/// 清空对话记录（保留连接与产物文件）
#[utoipa::path(
    delete,
    path = "/api/chat",
    tag = "chat",
    responses(
        (status = 200, description = "已清空", body = ApiResponse<bool>)
    )
)]
pub async fn clear_history(State(state): State<AppState>) -> Json<ApiResponse<bool>> {
    state.session.lock().await.clear_history();
    tracing::info!("对话记录已清空");
    Json(ApiResponse::ok_with_service(true, state.config.service.clone()))
}

/// 下载最新回答文本
#[utoipa::path(
    get,
    path = "/api/artifacts/response.txt",
    tag = "artifacts",
    responses(
        (status = 200, description = "最新回答文本", body = String, content_type = "text/plain"),
        (status = 404, description = "尚未生成")
    )
)]
pub async fn download_text(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let text = state.orchestrator.artifacts().read_text().await?;
    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", TEXT_FILE)),
        ],
        text,
    ))
}

/// 获取最新回答语音
#[utoipa::path(
    get,
    path = "/api/artifacts/response.mp3",
    tag = "artifacts",
    responses(
        (status = 200, description = "最新回答语音（audio/mpeg）"),
        (status = 404, description = "尚未生成")
    )
)]
pub async fn download_audio(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let audio = state.orchestrator.artifacts().read_audio().await?;
    Ok((
        [
            (CONTENT_TYPE, "audio/mpeg".to_string()),
            (CONTENT_DISPOSITION, format!("inline; filename=\"{}\"", AUDIO_FILE)),
        ],
        audio,
    ))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // 正在回答问题时不等待会话锁
    let session = state.session.try_lock().ok();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        connected: session.as_ref().map(|s| s.is_connected()),
        busy: session.is_none(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 是否已连接数据库（处理问题期间未知）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    /// 是否正在处理问题
    pub busy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use common::config::AppConfig;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::artifacts::ArtifactStore;
    use crate::orchestrator::Orchestrator;
    use crate::routes;
    use crate::test_support::{MockConnector, MockGateway, MockLlm, MockSpeech, MockTranslator};

    const QUESTION: &str = "How many albums are in the database?";
    const ANSWER: &str = "There are 34 albums in the database.";

    fn app_with(connector: MockConnector, dir: &TempDir) -> Router {
        let orchestrator = Orchestrator::new(
            Arc::new(MockLlm::replying(&["SELECT COUNT(*) FROM album;", ANSWER])),
            Arc::new(MockTranslator::default()),
            Arc::new(MockSpeech::default()),
            ArtifactStore::new(dir.path()),
        );
        let state = AppState::with_parts(AppConfig::default(), orchestrator, Arc::new(connector));
        routes::router().with_state(state)
    }

    fn app(dir: &TempDir) -> Router {
        let gateway = Arc::new(MockGateway::returning(vec![vec![json!(34)]]));
        app_with(MockConnector::accepting(gateway), dir)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send_raw(app, method, uri, body).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn send_raw(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn connect_body() -> Value {
        json!({
            "db_type": "MySQL",
            "username": "root",
            "password": "p@ss word",
            "database": "chinook"
        })
    }

    #[tokio::test]
    async fn test_ask_before_connect_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let (status, body) = send(&app, Method::POST, "/api/chat", Some(json!({"question": QUESTION}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_CONNECTED");
        assert_eq!(body["error"]["message"], "Please connect to the database first.");

        let (status, _) = send(&app, Method::GET, "/api/connection", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_connect_applies_defaults_and_hides_password() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let (status, body) = send(&app, Method::POST, "/api/connection", Some(connect_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["host"], "localhost");
        assert_eq!(body["data"]["port"], 3306);
        assert_eq!(body["meta"]["service"], "chat-service");

        let (status, body) = send(&app, Method::GET, "/api/connection", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["database"], "chinook");
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_connect_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(MockConnector::refusing(), &dir);

        let (status, body) = send(&app, Method::POST, "/api/connection", Some(connect_body())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "DATABASE_CONNECTION_ERROR");

        let mut oracle = connect_body();
        oracle["db_type"] = json!("Oracle");
        let (status, body) = send(&app, Method::POST, "/api/connection", Some(oracle)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_DATABASE_TYPE");
    }

    #[tokio::test]
    async fn test_ask_then_download_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        send(&app, Method::POST, "/api/connection", Some(connect_body())).await;

        let (status, body) = send(&app, Method::POST, "/api/chat", Some(json!({"question": QUESTION}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["result"], "[(34,)]");
        assert_eq!(body["data"]["answer"], ANSWER);
        assert!(body["meta"]["duration_ms"].is_u64());

        let (_, body) = send(&app, Method::GET, "/api/chat", None).await;
        let turns = body["data"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[1]["content"], ANSWER);

        let request = Request::get("/api/artifacts/response.txt").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"response.txt\""
        );
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&text[..], ANSWER.as_bytes());

        let (status, audio) = send_raw(&app, Method::GET, "/api/artifacts/response.mp3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(audio, format!("mp3:en:{}", ANSWER).into_bytes());

        let (status, _) = send(&app, Method::DELETE, "/api/chat", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, Method::GET, "/api/chat", None).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let (status, _) = send_raw(&app, Method::GET, "/api/artifacts/response.txt", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        send(&app, Method::POST, "/api/connection", Some(connect_body())).await;

        for blank in ["", "   \n\t"] {
            let (status, body) =
                send(&app, Method::POST, "/api/chat", Some(json!({"question": blank}))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }

        let (_, body) = send(&app, Method::GET, "/api/chat", None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_language_selection() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let (_, body) = send(&app, Method::GET, "/api/languages", None).await;
        assert_eq!(body["data"]["selected"]["code"], "en");
        assert_eq!(body["data"]["supported"].as_array().unwrap().len(), 16);

        let (status, body) = send(&app, Method::PUT, "/api/language", Some(json!({"language": "Hindi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["code"], "hi");

        let (status, _) = send(&app, Method::PUT, "/api/language", Some(json!({"language": "Klingon"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, Method::GET, "/api/languages", None).await;
        assert_eq!(body["data"]["selected"]["name"], "Hindi");
    }

    #[tokio::test]
    async fn test_missing_artifacts_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let (status, body) = send(&app, Method::GET, "/api/artifacts/response.mp3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let (status, body) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connected"], false);
        assert_eq!(body["busy"], false);
    }
}
