use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::chat::{PatientContext, ReplySource, Role, SessionId};
use crate::services::conversation::{ConversationTurn, SessionStore, TurnMetadata};
use crate::services::response_cache::{ResponseCache, ResponseSource, RiskBucket};
use crate::utils::error::ApiError;

/// Why a generator call produced no usable answer
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("generator timed out")]
    Timeout,

    #[error("response blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("generator returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("generator unreachable: {0}")]
    Network(String),

    #[error("malformed generator payload: {0}")]
    Malformed(String),

    #[error("generator not configured")]
    NotConfigured,
}

/// Input handed to the generative collaborator
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_context: String,
    /// Turns before the current question, oldest first
    pub prior_turns: Vec<ConversationTurn>,
    pub user_message: String,
}

/// Trait for the generative answer service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeResponder: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError>;
}

/// Trait for the deterministic local responder
pub trait FallbackResponder: Send + Sync {
    fn respond(&self, message: &str, bucket: RiskBucket) -> String;
}

/// One incoming user turn
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub session_id: SessionId,
    pub user_id: Option<String>,
    pub message: String,
    pub patient_context: Option<PatientContext>,
}

/// Answer to one user turn
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    pub session_id: SessionId,
    pub source: ReplySource,
    /// Transcript length once the user turn was recorded
    pub conversation_length: usize,
}

/// Answers user turns with as few generator calls as possible.
///
/// Owns the session store and the response cache; every reply, wherever it
/// came from, is appended to the transcript.
pub struct AiResponseOrchestrator {
    sessions: SessionStore,
    cache: Arc<ResponseCache>,
    generator: Arc<dyn GenerativeResponder>,
    fallback: Arc<dyn FallbackResponder>,
    timeout: Duration,
}

impl AiResponseOrchestrator {
    pub fn new(
        sessions: SessionStore,
        cache: Arc<ResponseCache>,
        generator: Arc<dyn GenerativeResponder>,
        fallback: Arc<dyn FallbackResponder>,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            cache,
            generator,
            fallback,
            timeout,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Answer one user turn.
    ///
    /// Only an empty message is rejected; generator failures of any kind
    /// degrade to the local responder.
    pub async fn respond(&self, request: TurnRequest) -> Result<ChatReply, ApiError> {
        if request.message.trim().is_empty() {
            return Err(ApiError::BadRequest("Message is required".to_string()));
        }

        let start = Instant::now();
        let TurnRequest {
            session_id,
            user_id,
            message,
            patient_context,
        } = request;

        let metric = patient_context.as_ref().and_then(|c| c.risk_metric());
        let bucket = RiskBucket::from_metric(metric);
        let metadata = TurnMetadata::new(user_id, patient_context.clone());

        // ===== STEP 1: Cache =====
        if let Some(cached) = self.cache.get(&message, metric) {
            let conversation_length = self
                .sessions
                .append(&session_id, Role::User, &message, metadata.clone());
            self.sessions.append(
                &session_id,
                Role::Assistant,
                &cached.response,
                metadata.with_source(ReplySource::Cache),
            );

            info!(
                "Session {} answered from cache in {}ms",
                session_id,
                start.elapsed().as_millis()
            );
            return Ok(ChatReply {
                reply: cached.response,
                session_id,
                source: ReplySource::Cache,
                conversation_length,
            });
        }

        // ===== STEP 2: Generator =====
        let prior_turns = self.sessions.get(&session_id);
        let conversation_length = self
            .sessions
            .append(&session_id, Role::User, &message, metadata.clone());

        debug!(
            "Session {}: cache miss, {} prior turn(s) sent as context",
            session_id,
            prior_turns.len()
        );

        let generation = GenerationRequest {
            system_context: build_system_context(patient_context.as_ref()),
            prior_turns,
            user_message: message.clone(),
        };

        let outcome = match tokio::time::timeout(self.timeout, self.generator.generate(generation)).await {
            Ok(result) => result,
            Err(_) => Err(GeneratorError::Timeout),
        };

        // ===== STEP 3: Fallback on failure =====
        let (reply, source) = match outcome {
            Ok(reply) => (reply, ReplySource::Generator),
            Err(e) => {
                warn!("Generator failed for session {}: {}; using local responder", session_id, e);
                (self.fallback.respond(&message, bucket), ReplySource::Fallback)
            }
        };

        let provenance = match source {
            ReplySource::Fallback => ResponseSource::Fallback,
            _ => ResponseSource::Generated,
        };
        self.cache.put(&message, metric, &reply, provenance);
        self.sessions.append(
            &session_id,
            Role::Assistant,
            &reply,
            metadata.with_source(source),
        );

        info!(
            "Session {} answered by {:?} in {}ms",
            session_id,
            source,
            start.elapsed().as_millis()
        );

        Ok(ChatReply {
            reply,
            session_id,
            source,
            conversation_length,
        })
    }
}

/// Five-level stage label used in the generator's system context
pub fn kidney_stage(egfr: f64) -> &'static str {
    if egfr >= 90.0 {
        "Stage 1 (Normal)"
    } else if egfr >= 60.0 {
        "Stage 2 (Mild)"
    } else if egfr >= 45.0 {
        "Stage 3a (Moderate)"
    } else if egfr >= 30.0 {
        "Stage 3b (Moderate-Severe)"
    } else {
        "Stage 4-5 (Severe/Critical)"
    }
}

fn build_system_context(patient: Option<&PatientContext>) -> String {
    let metric = patient.and_then(|p| p.risk_metric());
    let egfr = metric
        .map(|v| format!("{} mL/min/1.73m²", v))
        .unwrap_or_else(|| "Unknown".to_string());
    let stage = metric.map(kidney_stage).unwrap_or("Unknown");
    let risk = patient
        .and_then(|p| p.risk_level.as_deref())
        .unwrap_or("Unknown");

    format!(
        "You are a compassionate, knowledgeable kidney health assistant.\n\
         Use the earlier turns of this conversation to keep advice personal and relevant, \
         and do not repeat what was already covered.\n\
         Keep answers concise (2-3 paragraphs). Give general guidance only, never a diagnosis.\n\
         \n\
         Patient Context:\n\
         - eGFR: {}\n\
         - Kidney Stage: {}\n\
         - Risk Level: {}",
        egfr, stage, risk
    )
}
