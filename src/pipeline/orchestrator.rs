use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::GenerationConfig;
use crate::knowledge::{KnowledgeError, KnowledgeStore};
use crate::pipeline::latency::{LatencyReport, LatencyTracker};
use crate::pipeline::models::{
    call_with_policy, CallPolicy, GenerationRequest, MediaInput, ModelError, SpeechToText,
    TextGenerator, VisionExtractor,
};
use crate::pipeline::rag::conversation::ConversationSession;
use crate::pipeline::rag::prompt::{build_user_prompt, retrieval_query, IMAGE_EXTRACTION_PROMPT};
use crate::pipeline::rag::{KnowledgeRetriever, QueryType};
use crate::pipeline::safety::{
    CrisisAssessment, CrisisPolicy, InputPresence, InputRejection, SafetyGuardrail,
};

/// Retrieval parameters passed through to the retriever.
const RETRIEVAL_TOP_K: usize = 5;
const RETRIEVAL_INCLUDE_SUBGRAPH: bool = true;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] KnowledgeError),

    #[error("{0}")]
    InputValidation(#[from] InputRejection),

    #[error("{phase} call failed: {source}")]
    ModelInvocation {
        phase: &'static str,
        #[source]
        source: ModelError,
    },
}

/// One patient request: up to four optional inputs.
#[derive(Debug, Clone, Default)]
pub struct AssistRequest {
    pub text: Option<String>,
    pub audio: Option<MediaInput>,
    pub image: Option<MediaInput>,
    pub document: Option<MediaInput>,
    /// Selects the disclaimer; classified from the question when absent.
    pub query_type: Option<QueryType>,
}

impl AssistRequest {
    pub fn text(question: &str) -> Self {
        Self {
            text: Some(question.to_string()),
            ..Self::default()
        }
    }

    fn presence(&self) -> InputPresence<'_> {
        InputPresence {
            text: self.text.as_deref(),
            audio: self.audio.is_some(),
            image: self.image.is_some(),
            document: self.document.is_some(),
        }
    }
}

/// What the patient sees, plus metadata for the caller.
#[derive(Debug, Clone)]
pub struct AssistOutcome {
    pub response: String,
    pub crisis_detected: bool,
    /// Input was rejected; no answer was generated.
    pub rejected: bool,
    /// Set only when the full pipeline ran.
    pub answer: Option<AnswerDetails>,
}

#[derive(Debug, Clone)]
pub struct AnswerDetails {
    pub query_type: QueryType,
    pub entity_keys: Vec<String>,
    pub sources: Vec<String>,
    pub latency: Option<LatencyReport>,
}

/// Knobs for one pipeline instance.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub generation: GenerationConfig,
    pub call_policy: CallPolicy,
    pub crisis_policy: CrisisPolicy,
}

/// The request pipeline: validate → crisis check → transcribe → extract →
/// retrieve → generate → guard.
///
/// Holds no per-request state; conversation history lives in the session
/// passed to [`AssistantPipeline::respond`].
pub struct AssistantPipeline {
    retriever: KnowledgeRetriever,
    guardrail: SafetyGuardrail,
    stt: Arc<dyn SpeechToText>,
    vision: Arc<dyn VisionExtractor>,
    llm: Arc<dyn TextGenerator>,
    config: PipelineConfig,
}

impl AssistantPipeline {
    pub fn new(
        store: Arc<KnowledgeStore>,
        stt: Arc<dyn SpeechToText>,
        vision: Arc<dyn VisionExtractor>,
        llm: Arc<dyn TextGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever: KnowledgeRetriever::new(store),
            guardrail: SafetyGuardrail::new(),
            stt,
            vision,
            llm,
            config,
        }
    }

    /// Load the knowledge base from `path` (file or index directory) and
    /// build the pipeline over it.
    pub fn from_knowledge_path(
        path: &Path,
        stt: Arc<dyn SpeechToText>,
        vision: Arc<dyn VisionExtractor>,
        llm: Arc<dyn TextGenerator>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let store = KnowledgeStore::load(path)?;
        Ok(Self::new(Arc::new(store), stt, vision, llm, config))
    }

    pub fn retriever(&self) -> &KnowledgeRetriever {
        &self.retriever
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer one request. Never fails: rejections, crises and model errors
    /// all become patient-facing text.
    pub fn respond(
        &self,
        session: &mut ConversationSession,
        request: &AssistRequest,
    ) -> AssistOutcome {
        let _span = tracing::info_span!("assist", session = %session.id).entered();

        // Crisis screening runs on the raw text, before any rejection.
        let mut crisis = request
            .text
            .as_deref()
            .map(|t| self.guardrail.detect_crisis(t))
            .unwrap_or_else(CrisisAssessment::none);

        if crisis.detected && self.config.crisis_policy == CrisisPolicy::Replace {
            return crisis_only(crisis);
        }

        if let Err(rejection) = self.guardrail.validate_input(&request.presence()) {
            tracing::info!(reason = ?rejection, "Request rejected before model invocation");
            return rejected(crisis, rejection);
        }

        match self.run(session, request, &mut crisis) {
            Ok(Some(answered)) => AssistOutcome {
                response: with_crisis(crisis, answered.text),
                crisis_detected: crisis.detected,
                rejected: false,
                answer: Some(answered.details),
            },
            Ok(None) => crisis_only(crisis),
            Err(PipelineError::InputValidation(rejection)) => {
                tracing::info!(reason = ?rejection, "Request rejected after transcription");
                rejected(crisis, rejection)
            }
            Err(e) => {
                tracing::error!(error = %e, "Pipeline failed, returning friendly error");
                AssistOutcome {
                    response: with_crisis(crisis, self.guardrail.error_message().to_string()),
                    crisis_detected: crisis.detected,
                    rejected: false,
                    answer: None,
                }
            }
        }
    }

    /// Runs the model phases. `Ok(None)` means a crisis found in the
    /// transcript ended the request under [`CrisisPolicy::Replace`].
    fn run(
        &self,
        session: &mut ConversationSession,
        request: &AssistRequest,
        crisis: &mut CrisisAssessment,
    ) -> Result<Option<Answered>, PipelineError> {
        let policy = self.config.call_policy;
        let mut latency = LatencyTracker::new();
        latency.start();

        let mut question = request.text.clone().unwrap_or_default();
        if let Some(audio) = &request.audio {
            latency.checkpoint("stt_start");
            let stt = self.stt.clone();
            let audio = audio.clone();
            question = invoke("stt", policy, move || stt.transcribe(&audio))?;
            latency.checkpoint("stt_end");
            tracing::debug!(transcript_len = question.len(), "Audio transcribed");

            if !crisis.detected {
                *crisis = self.guardrail.detect_crisis(&question);
                if crisis.detected && self.config.crisis_policy == CrisisPolicy::Replace {
                    return Ok(None);
                }
            }
        }

        if question.trim().is_empty() {
            return Err(InputRejection::NoQuestion.into());
        }

        let mut visual_context = String::new();
        if let Some(image) = &request.image {
            latency.checkpoint("vlm_start");
            let vision = self.vision.clone();
            let image = image.clone();
            visual_context = invoke("vlm", policy, move || {
                vision.analyze_image(&image, IMAGE_EXTRACTION_PROMPT)
            })?;
            latency.checkpoint("vlm_end");
        }

        if let Some(document) = &request.document {
            latency.checkpoint("pdf_start");
            let vision = self.vision.clone();
            let document = document.clone();
            let pdf_context = invoke("pdf", policy, move || vision.analyze_pdf(&document))?;
            visual_context.push_str("\n\n");
            visual_context.push_str(&pdf_context);
            latency.checkpoint("pdf_end");
        }

        latency.checkpoint("rag_start");
        let query = retrieval_query(&question, &visual_context);
        let retrieval = self
            .retriever
            .retrieve(&query, RETRIEVAL_TOP_K, RETRIEVAL_INCLUDE_SUBGRAPH);
        latency.checkpoint("rag_end");

        let query_type = request.query_type.unwrap_or_default();

        let generation = &self.config.generation;
        let generation_request = GenerationRequest {
            system_prompt: self.guardrail.system_prompt().to_string(),
            user_prompt: build_user_prompt(&question, &visual_context, &retrieval),
            history: session.window(generation.history_window).to_vec(),
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
        };

        latency.checkpoint("llm_start");
        let llm = self.llm.clone();
        let draft = invoke("llm", policy, move || llm.generate(&generation_request))?;
        latency.checkpoint("llm_end");

        let guarded = self
            .guardrail
            .process(&draft, query_type, retrieval.entities.len());

        session.record_exchange(&query, &guarded.text, generation.turn_max_chars);

        latency.stop();
        let mut text = guarded.text;
        let report = match latency.report() {
            Ok(report) => {
                text.push_str(&report.summary_line());
                Some(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Latency report unavailable");
                None
            }
        };

        tracing::info!(
            query_type = query_type.as_str(),
            entities = ?retrieval.entity_keys(),
            fallback = retrieval.used_fallback,
            history_turns = session.len(),
            total_ms = ?report.as_ref().map(|r| r.total.as_millis()),
            "Request answered"
        );

        Ok(Some(Answered {
            text,
            details: AnswerDetails {
                query_type,
                entity_keys: retrieval.entity_keys().into_iter().map(str::to_string).collect(),
                sources: retrieval.sources,
                latency: report,
            },
        }))
    }
}

struct Answered {
    text: String,
    details: AnswerDetails,
}

fn invoke<T, F>(phase: &'static str, policy: CallPolicy, call: F) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: Fn() -> Result<T, ModelError> + Send + Sync + Clone + 'static,
{
    call_with_policy(phase, policy, call)
        .map_err(|source| PipelineError::ModelInvocation { phase, source })
}

fn rejected(crisis: CrisisAssessment, rejection: InputRejection) -> AssistOutcome {
    AssistOutcome {
        response: with_crisis(crisis, rejection.to_string()),
        crisis_detected: crisis.detected,
        rejected: true,
        answer: None,
    }
}

fn crisis_only(crisis: CrisisAssessment) -> AssistOutcome {
    AssistOutcome {
        response: crisis.message.unwrap_or_default().trim().to_string(),
        crisis_detected: true,
        rejected: false,
        answer: None,
    }
}

/// Put the crisis block ahead of `response` when a crisis was detected.
fn with_crisis(crisis: CrisisAssessment, response: String) -> String {
    match crisis.message {
        Some(block) if crisis.detected => format!("{}\n\n---\n\n{}", block.trim(), response),
        _ => response,
    }
}
