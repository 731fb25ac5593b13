use std::process::ExitCode;
use std::sync::Arc;

use tanit_lib::api::{server, ApiContext};
use tanit_lib::config::{self, Settings};
use tanit_lib::knowledge::{KnowledgeError, KnowledgeStore};
use tanit_lib::pipeline::models::ollama::OllamaClient;
use tanit_lib::pipeline::models::{
    MockSpeechToText, MockTextGenerator, MockVisionExtractor, ModelError, OllamaTextGenerator,
    OllamaVisionExtractor, SpeechToText, TextGenerator, VisionExtractor, WhisperClient,
};
use tanit_lib::pipeline::{AssistantPipeline, PipelineConfig};

struct Collaborators {
    stt: Arc<dyn SpeechToText>,
    vision: Arc<dyn VisionExtractor>,
    llm: Arc<dyn TextGenerator>,
}

fn main() -> ExitCode {
    tanit_lib::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env();

    let store = match load_store(&settings) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let collaborators = match build_collaborators(&settings) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to build model clients: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = AssistantPipeline::new(
        Arc::new(store),
        collaborators.stt,
        collaborators.vision,
        collaborators.llm,
        PipelineConfig {
            generation: settings.generation.clone(),
            call_policy: settings.call_policy,
            crisis_policy: settings.crisis_policy,
        },
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::serve(ApiContext::new(pipeline), settings.bind_addr)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(addr = %settings.bind_addr, "API server error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// A missing knowledge base is fatal unless demo mode asks for an empty store.
fn load_store(settings: &Settings) -> Result<KnowledgeStore, KnowledgeError> {
    match KnowledgeStore::load(&settings.knowledge_base_path) {
        Ok(store) => Ok(store),
        Err(KnowledgeError::NotFound { path }) if settings.demo_mode => {
            tracing::warn!(
                path = %path.display(),
                "Knowledge base missing; demo mode continues with an empty store"
            );
            Ok(KnowledgeStore::empty())
        }
        Err(e) => Err(e),
    }
}

fn build_collaborators(settings: &Settings) -> Result<Collaborators, ModelError> {
    if settings.demo_mode {
        tracing::info!("Demo mode: using canned model responses");
        return Ok(Collaborators {
            stt: Arc::new(MockSpeechToText::default()),
            vision: Arc::new(MockVisionExtractor::default()),
            llm: Arc::new(MockTextGenerator::demo()),
        });
    }

    let timeout = settings.call_policy.timeout;
    let ollama = OllamaClient::new(&settings.ollama_url, timeout)?;
    tracing::info!(
        ollama = %settings.ollama_url,
        llm = %settings.llm_model,
        vision = %settings.vision_model,
        whisper = %settings.whisper_url,
        "Using local model services"
    );

    Ok(Collaborators {
        stt: Arc::new(WhisperClient::new(&settings.whisper_url, timeout)?),
        vision: Arc::new(OllamaVisionExtractor::new(ollama.clone(), &settings.vision_model)),
        llm: Arc::new(OllamaTextGenerator::new(ollama, &settings.llm_model)),
    })
}
