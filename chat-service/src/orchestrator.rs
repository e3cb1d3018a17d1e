//! 问答流水线模块

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use common::errors::AppResult;
use common::models::{AskResponse, ChatTurn, QueryOutcome};

use crate::artifacts::ArtifactStore;
use crate::llm::LanguageModel;
use crate::prompts::PromptTemplate;
use crate::session::ChatSession;
use crate::speech::SpeechSynthesizer;
use crate::translation::Translator;

/// 问答编排器：问题 → SQL → 执行 → 回答 → 翻译 → 语音 → 记录
pub struct Orchestrator {
    llm: Arc<dyn LanguageModel>,
    translator: Arc<dyn Translator>,
    speech: Arc<dyn SpeechSynthesizer>,
    artifacts: ArtifactStore,
}

impl Orchestrator {
    /// 创建新的编排器实例
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        translator: Arc<dyn Translator>,
        speech: Arc<dyn SpeechSynthesizer>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            llm,
            translator,
            speech,
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// 回答一个问题
    ///
    /// 任一外部服务失败都会中止本轮：不追加对话、不改动产物文件。
    /// SQL 执行失败不算失败，错误文本会交给模型生成回答。
    pub async fn ask(&self, session: &mut ChatSession, question: &str) -> AppResult<AskResponse> {
        let gateway = session.gateway()?;
        let language = session.language();
        let started = Instant::now();

        // 1. 生成 SQL
        let schema = gateway.schema().await?;
        let mut variables = HashMap::from([
            ("schema", schema),
            ("question", question.to_string()),
        ]);
        let query = self
            .llm
            .complete_template(PromptTemplate::sql_query(), &variables)
            .await?;
        tracing::info!(query = %query, "SQL 已生成");

        // 2. 执行 SQL
        let outcome = gateway.execute(&query).await;
        if let QueryOutcome::Failed(message) = &outcome {
            tracing::warn!(error = %message, "SQL 执行失败，错误将交给模型");
        }
        let result = outcome.to_prompt_text();

        // 3. 生成回答
        variables.insert("query", query.clone());
        variables.insert("result", result.clone());
        let mut answer = self
            .llm
            .complete_template(PromptTemplate::response(), &variables)
            .await?;

        // 4. 翻译
        if language.needs_translation() {
            answer = self.translator.translate(&answer, &language).await?;
            tracing::debug!(language = language.code, "回答已翻译");
        }

        // 5. 先合成语音，再落盘，保证两个文件对应同一回答
        let audio = self.speech.synthesize(&answer, language.code).await?;
        self.artifacts.save(&answer, &audio).await?;

        // 6. 记录对话
        session.append(ChatTurn::user(question));
        session.append(ChatTurn::assistant(answer.clone()));

        tracing::info!(
            language = language.code,
            query_failed = outcome.is_failure(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "问题已回答"
        );

        Ok(AskResponse {
            question: question.to_string(),
            query,
            result,
            answer,
            language,
        })
    }
}
