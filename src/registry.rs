//! The fixed, ordered list of models offered to the user.
//!
//! Each entry pairs a display name with the backend that serves it. The
//! backend is classified once, when the registry is built, so dispatch never
//! has to re-inspect identifier strings.

const BUILTIN_MODELS: &[(&str, &str)] = &[
    ("Meta-llama3", "llama3-8b-8192"),
    ("Gemma 2 9B", "gemma2-9b-it"),
    ("GPT2", "openai-community/gpt2"),
    ("Zephyr-7b", "HuggingFaceH4/zephyr-7b-beta"),
    ("Gemma-7b", "google/gemma-7b"),
    ("DialoGPT", "microsoft/DialoGPT-medium"),
    ("Llama3 local", "llama3"),
];

const LOCAL_MARKER: &str = "local";
const INFERENCE_PATH_SEPARATOR: char = '/';

/// Which service answers for a model, carrying the identifier used on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Per-model inference endpoint; `path` is appended to the inference base URL.
    Cloud { path: String },
    /// Hosted chat-completion service addressed by model name.
    Hosted { name: String },
    /// Locally running model daemon addressed by model tag.
    Local { name: String },
}

impl Backend {
    /// Classification order matters: a display name containing "local" wins
    /// over an identifier containing '/'.
    pub fn classify(display_name: &str, backend_id: &str) -> Self {
        let id = backend_id.to_string();
        if display_name.contains(LOCAL_MARKER) {
            Self::Local { name: id }
        } else if backend_id.contains(INFERENCE_PATH_SEPARATOR) {
            Self::Cloud { path: id }
        } else {
            Self::Hosted { name: id }
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Cloud { path } => path.as_str(),
            Self::Hosted { name } | Self::Local { name } => name.as_str(),
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            Self::Cloud { .. } => "Huggingface API",
            Self::Hosted { .. } => "Groq API",
            Self::Local { .. } => "Ollama",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub display_name: String,
    pub backend: Backend,
}

impl ModelEntry {
    pub fn new(display_name: impl Into<String>, backend_id: &str) -> Self {
        let display_name = display_name.into();
        let backend = Backend::classify(&display_name, backend_id);
        Self {
            display_name,
            backend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<ModelEntry>,
}

impl Registry {
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_MODELS)
    }

    /// Backend identifiers are not validated here; a bad one fails on first use.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(display_name, backend_id)| ModelEntry::new(*display_name, backend_id))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ModelEntry> {
        self.entries.get(index)
    }

    /// First entry whose display name matches exactly.
    pub fn find(&self, display_name: &str) -> Option<&ModelEntry> {
        self.entries
            .iter()
            .find(|entry| entry.display_name == display_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
