use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::models::CallPolicy;
use crate::pipeline::safety::CrisisPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Tanit";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the persisted knowledge base inside the index directory.
pub const KNOWLEDGE_BASE_FILE: &str = "knowledge_base.json";

/// Default bind address for the HTTP surface.
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 7860));

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,tanit_lib=debug,tower_http=info"
}

/// Get the application data directory
/// ~/Tanit/ on all platforms.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the knowledge index directory.
pub fn default_index_dir() -> PathBuf {
    app_data_dir().join("graphrag_index")
}

/// Sampling and history parameters for the text generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Number of most recent turns handed to the generator.
    pub history_window: usize,
    /// Stored turns are cut to this many characters.
    pub turn_max_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 800,
            history_window: 4,
            turn_max_chars: 500,
        }
    }
}

/// Process settings, read from `TANIT_*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Knowledge base file, or the index directory containing it.
    pub knowledge_base_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub ollama_url: String,
    pub llm_model: String,
    pub vision_model: String,
    pub whisper_url: String,
    pub call_policy: CallPolicy,
    pub crisis_policy: CrisisPolicy,
    pub generation: GenerationConfig,
    /// Mock collaborators, and an explicit empty store when the knowledge base is absent.
    pub demo_mode: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unparseable values fall back
    /// to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let knowledge_base_path = lookup("TANIT_KB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.knowledge_base_path);

        let bind_addr = parse_or(&lookup, "TANIT_BIND_ADDR", defaults.bind_addr);

        let timeout_secs = parse_or(
            &lookup,
            "TANIT_MODEL_TIMEOUT_SECS",
            defaults.call_policy.timeout.as_secs(),
        );
        let max_retries = parse_or(
            &lookup,
            "TANIT_MODEL_RETRIES",
            defaults.call_policy.max_retries,
        );

        let crisis_policy = match lookup("TANIT_CRISIS_POLICY") {
            Some(raw) => CrisisPolicy::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(key = "TANIT_CRISIS_POLICY", "Ignoring unknown crisis policy, using default");
                defaults.crisis_policy
            }),
            None => defaults.crisis_policy,
        };

        let demo_mode = lookup("TANIT_DEMO")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.demo_mode);

        Self {
            knowledge_base_path,
            bind_addr,
            ollama_url: lookup("TANIT_OLLAMA_URL").unwrap_or(defaults.ollama_url),
            llm_model: lookup("TANIT_LLM_MODEL").unwrap_or(defaults.llm_model),
            vision_model: lookup("TANIT_VISION_MODEL").unwrap_or(defaults.vision_model),
            whisper_url: lookup("TANIT_WHISPER_URL").unwrap_or(defaults.whisper_url),
            call_policy: CallPolicy {
                timeout: Duration::from_secs(timeout_secs),
                max_retries,
            },
            crisis_policy,
            generation: defaults.generation,
            demo_mode,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            knowledge_base_path: default_index_dir(),
            bind_addr: DEFAULT_BIND_ADDR,
            ollama_url: "http://localhost:11434".to_string(),
            llm_model: "qwen2.5:3b-instruct".to_string(),
            vision_model: "qwen2.5vl:3b".to_string(),
            whisper_url: "http://localhost:8080".to_string(),
            call_policy: CallPolicy::default(),
            crisis_policy: CrisisPolicy::default(),
            generation: GenerationConfig::default(),
            demo_mode: false,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, "Ignoring unparseable setting, using default");
                default
            }
        },
        None => default,
    }
}
