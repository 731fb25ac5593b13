//! Full request pipeline over the bundled knowledge base with mock models.

use std::path::Path;
use std::sync::Arc;

use tanit_lib::knowledge::{KnowledgeError, KnowledgeStore};
use tanit_lib::pipeline::models::{
    MediaInput, MockSpeechToText, MockTextGenerator, MockVisionExtractor, TextGenerator,
};
use tanit_lib::pipeline::rag::{ConversationSession, QueryType};
use tanit_lib::pipeline::safety::CrisisPolicy;
use tanit_lib::pipeline::{AssistRequest, AssistantPipeline, PipelineConfig, PipelineError};

fn bundled_store() -> Arc<KnowledgeStore> {
    let data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    Arc::new(KnowledgeStore::load(&data_dir).unwrap())
}

fn pipeline_with(llm: Arc<dyn TextGenerator>, config: PipelineConfig) -> AssistantPipeline {
    AssistantPipeline::new(
        bundled_store(),
        Arc::new(MockSpeechToText::default()),
        Arc::new(MockVisionExtractor::default()),
        llm,
        config,
    )
}

fn demo_pipeline() -> AssistantPipeline {
    pipeline_with(Arc::new(MockTextGenerator::demo()), PipelineConfig::default())
}

#[test]
fn voice_and_lab_photo_produce_a_guarded_answer() {
    let pipeline = demo_pipeline();
    let mut session = ConversationSession::new();
    let request = AssistRequest {
        audio: Some(MediaInput::new(vec![0u8; 64], "question.wav")),
        image: Some(MediaInput::new(vec![0x89u8, b'P', b'N', b'G'], "panel.png")),
        query_type: Some(QueryType::Fertility),
        ..AssistRequest::default()
    };

    let outcome = pipeline.respond(&mut session, &request);

    assert!(!outcome.rejected);
    assert!(!outcome.crisis_detected);
    assert!(outcome.response.contains("Understanding Your AMH Level"));
    assert!(outcome.response.contains("💡 **Important Note:**"));
    assert!(outcome.response.contains("⚡ Processing Time: "));
    assert!(outcome.response.contains("STT: "));
    assert!(outcome.response.contains("VLM: "));

    let details = outcome.answer.expect("full pipeline ran");
    assert!(details.entity_keys.contains(&"amh_levels".to_string()));
    assert!(details.entity_keys.contains(&"pcos".to_string()));
    assert_eq!(session.len(), 2);
}

#[test]
fn chest_pain_answer_gets_urgent_banner() {
    let pipeline = pipeline_with(
        Arc::new(MockTextGenerator::fixed(
            "Chest pain during stimulation is unusual and should be checked.",
        )),
        PipelineConfig::default(),
    );
    let outcome = pipeline.respond(
        &mut ConversationSession::new(),
        &AssistRequest::text("I have chest pain after my injections"),
    );
    assert!(outcome.response.contains("🚨 **IMPORTANT:**"));
}

#[test]
fn crisis_message_leads_the_answer_by_default() {
    let pipeline = demo_pipeline();
    let outcome = pipeline.respond(
        &mut ConversationSession::new(),
        &AssistRequest::text("After three failed IVF rounds I want to die"),
    );
    assert!(outcome.crisis_detected);
    assert!(outcome.response.starts_with("🆘 **Crisis Support:**"));
    assert!(outcome.answer.is_some());
}

#[test]
fn crisis_replace_policy_skips_the_models() {
    let llm = Arc::new(MockTextGenerator::demo());
    let pipeline = pipeline_with(
        llm.clone(),
        PipelineConfig {
            crisis_policy: CrisisPolicy::Replace,
            ..PipelineConfig::default()
        },
    );
    let outcome = pipeline.respond(
        &mut ConversationSession::new(),
        &AssistRequest::text("I feel like there is no reason to live"),
    );
    assert!(outcome.crisis_detected);
    assert!(outcome.answer.is_none());
    assert_eq!(llm.calls(), 0);
}

#[test]
fn overlong_question_is_rejected() {
    let pipeline = demo_pipeline();
    let outcome = pipeline.respond(
        &mut ConversationSession::new(),
        &AssistRequest::text(&"a".repeat(2_001)),
    );
    assert!(outcome.rejected);
    assert_eq!(
        outcome.response,
        "Please keep your question under 2000 characters."
    );
}

#[test]
fn overlong_crisis_message_still_gets_resources() {
    let pipeline = demo_pipeline();
    let text = format!("I want to kill myself. {}", "a".repeat(2_400));
    let outcome = pipeline.respond(&mut ConversationSession::new(), &AssistRequest::text(&text));
    assert!(outcome.rejected);
    assert!(outcome.crisis_detected);
    assert!(outcome.response.starts_with("🆘"));
    assert!(outcome
        .response
        .ends_with("Please keep your question under 2000 characters."));
}

#[test]
fn follow_up_questions_see_earlier_turns() {
    let llm = Arc::new(MockTextGenerator::demo());
    let pipeline = pipeline_with(llm.clone(), PipelineConfig::default());
    let mut session = ConversationSession::new();

    pipeline.respond(&mut session, &AssistRequest::text("What is AMH?"));
    pipeline.respond(&mut session, &AssistRequest::text("How do I track ovulation?"));

    let request = llm.last_request().unwrap();
    assert_eq!(request.history.len(), 2);
    assert_eq!(request.history[0].content, "What is AMH?");
    assert!(request.user_prompt.contains("Cycle Tracking"));
}

#[test]
fn knowledge_base_loads_from_index_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("knowledge_base.json"),
        r#"{"egg_freezing": {"description": "Oocyte cryopreservation", "sources": ["ASRM 2021"]}}"#,
    )
    .unwrap();

    let store = KnowledgeStore::load(dir.path()).unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.contains("egg_freezing"));
}

#[test]
fn missing_knowledge_base_names_the_remedy() {
    let dir = tempfile::tempdir().unwrap();
    let err = KnowledgeStore::load(dir.path()).unwrap_err();
    assert!(matches!(err, KnowledgeError::NotFound { .. }));
    assert!(err.to_string().contains("TANIT_KB_PATH"));
}

#[test]
fn pipeline_from_missing_path_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AssistantPipeline::from_knowledge_path(
        &dir.path().join("absent.json"),
        Arc::new(MockSpeechToText::default()),
        Arc::new(MockVisionExtractor::default()),
        Arc::new(MockTextGenerator::demo()),
        PipelineConfig::default(),
    );
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}
