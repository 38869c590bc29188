use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings, resolved once at startup from `URBIA_*` environment
/// variables with sensible defaults for a local deployment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_host: String,
    pub api_port: u16,
    pub ollama_host: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub knowledge_base_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
    pub cache_capacity: u64,
    /// Results are cached only when confidence is strictly above this.
    pub cache_confidence_threshold: f64,
    /// Direct answers at or above this skip the agent pipeline.
    pub escalation_threshold: f64,
    /// Feed per-hit relevance scores into the confidence model.
    pub surface_relevance: bool,
    pub generation_timeout_secs: u64,
    pub escalation_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            ollama_host: "http://localhost:11434".to_string(),
            generation_model: "mistral:7b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            knowledge_base_path: PathBuf::from("knowledge.json"),
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_k: 7,
            cache_capacity: 1024,
            cache_confidence_threshold: 0.7,
            escalation_threshold: 0.7,
            surface_relevance: false,
            generation_timeout_secs: 120,
            escalation_timeout_secs: 300,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_host: env_string("URBIA_API_HOST", defaults.api_host),
            api_port: env_parse("URBIA_API_PORT", defaults.api_port),
            ollama_host: env_string("URBIA_OLLAMA_HOST", defaults.ollama_host),
            generation_model: env_string("URBIA_GENERATION_MODEL", defaults.generation_model),
            embedding_model: env_string("URBIA_EMBEDDING_MODEL", defaults.embedding_model),
            knowledge_base_path: env::var("URBIA_KNOWLEDGE_BASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.knowledge_base_path),
            chunk_size: env_parse("URBIA_CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("URBIA_CHUNK_OVERLAP", defaults.chunk_overlap),
            retrieval_k: env_parse("URBIA_RETRIEVAL_K", defaults.retrieval_k),
            cache_capacity: env_parse("URBIA_CACHE_CAPACITY", defaults.cache_capacity),
            cache_confidence_threshold: env_parse(
                "URBIA_CACHE_CONFIDENCE_THRESHOLD",
                defaults.cache_confidence_threshold,
            ),
            escalation_threshold: env_parse(
                "URBIA_ESCALATION_THRESHOLD",
                defaults.escalation_threshold,
            ),
            surface_relevance: env_parse("URBIA_SURFACE_RELEVANCE", defaults.surface_relevance),
            generation_timeout_secs: env_parse(
                "URBIA_GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout_secs,
            ),
            escalation_timeout_secs: env_parse(
                "URBIA_ESCALATION_TIMEOUT_SECS",
                defaults.escalation_timeout_secs,
            ),
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn escalation_timeout(&self) -> Duration {
        Duration::from_secs(self.escalation_timeout_secs)
    }
}

fn env_string(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Filesystem locations owned by the service: data dir, logs, and the
/// persisted vector index.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");
        let index_db_path = data_dir.join("vector_index.db");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            index_db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("URBIA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("Urbia");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("Urbia");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("urbia")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
