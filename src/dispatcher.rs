use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::providers::AdapterError;
use crate::providers::hosted::HostedChatClient;
use crate::providers::inference::InferenceClient;
use crate::providers::ollama::OllamaClient;
use crate::registry::{Backend, ModelEntry, Registry};

pub type BackendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, AdapterError>> + Send + 'a>>;

/// One outbound call to a model service, normalized to plain text.
pub trait ChatBackend: Send + Sync {
    fn ask<'a>(&'a self, model: &'a str, question: &'a str) -> BackendFuture<'a>;
}

/// The display name is not in the registry. No backend was called.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("selection not found: '{0}'")]
pub struct SelectionNotFound(pub String);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    SelectionNotFound(#[from] SelectionNotFound),

    #[error("model '{model}' failed: {source}")]
    Adapter {
        model: String,
        #[source]
        source: AdapterError,
    },
}

/// Routes a display name to the adapter its registry entry names.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
    cloud: Arc<dyn ChatBackend>,
    hosted: Arc<dyn ChatBackend>,
    local: Arc<dyn ChatBackend>,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        cloud: Arc<dyn ChatBackend>,
        hosted: Arc<dyn ChatBackend>,
        local: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            registry,
            cloud,
            hosted,
            local,
        }
    }

    /// Wires the real adapters around one shared HTTP client.
    pub fn from_config(registry: Registry, client: &Client, cfg: &Config) -> Self {
        Self::new(
            registry,
            Arc::new(InferenceClient::new(client.clone(), cfg)),
            Arc::new(HostedChatClient::new(client.clone(), cfg)),
            Arc::new(OllamaClient::new(client.clone(), cfg)),
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolve(&self, display_name: &str) -> Result<&ModelEntry, SelectionNotFound> {
        self.registry
            .find(display_name)
            .ok_or_else(|| SelectionNotFound(display_name.to_string()))
    }

    fn backend_for(&self, backend: &Backend) -> &dyn ChatBackend {
        match backend {
            Backend::Cloud { .. } => self.cloud.as_ref(),
            Backend::Hosted { .. } => self.hosted.as_ref(),
            Backend::Local { .. } => self.local.as_ref(),
        }
    }

    async fn call(&self, entry: &ModelEntry, question: &str) -> Result<String, AdapterError> {
        debug!(
            display_name = %entry.display_name,
            service = entry.backend.service(),
            model = %entry.backend.id(),
            "dispatching question"
        );
        self.backend_for(&entry.backend)
            .ask(entry.backend.id(), question)
            .await
    }

    /// Sends `question` to the model behind `display_name`, propagating adapter errors.
    pub async fn dispatch(
        &self,
        display_name: &str,
        question: &str,
    ) -> Result<String, DispatchError> {
        let entry = self.resolve(display_name)?;
        self.call(entry, question)
            .await
            .map_err(|source| DispatchError::Adapter {
                model: entry.backend.id().to_string(),
                source,
            })
    }

    /// Like [`Dispatcher::dispatch`], but adapter failures are logged here, once,
    /// and answered with empty text.
    pub async fn ask(
        &self,
        display_name: &str,
        question: &str,
    ) -> Result<String, SelectionNotFound> {
        let entry = self.resolve(display_name)?;
        match self.call(entry, question).await {
            Ok(answer) => Ok(answer),
            Err(err) => {
                warn!(
                    display_name = %entry.display_name,
                    service = %entry.backend.service(),
                    model = %entry.backend.id(),
                    error = %err,
                    "model request failed; returning empty response"
                );
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use std::io;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{BackendFuture, ChatBackend, DispatchError, Dispatcher, SelectionNotFound};
    use crate::config::{Config, test_config};
    use crate::providers::AdapterError;
    use crate::registry::Registry;

    #[derive(Debug)]
    enum StubOutcome {
        Ok(String),
        Err(String),
    }

    #[derive(Debug)]
    pub(crate) struct StubBackend {
        calls: Mutex<Vec<(String, String)>>,
        outcome: StubOutcome,
    }

    impl StubBackend {
        pub(crate) fn ok(content: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                outcome: StubOutcome::Ok(content.into()),
            })
        }

        pub(crate) fn err(message: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                outcome: StubOutcome::Err(message.into()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl ChatBackend for StubBackend {
        fn ask<'a>(&'a self, model: &'a str, question: &'a str) -> BackendFuture<'a> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((model.to_string(), question.to_string()));
            let result = match &self.outcome {
                StubOutcome::Ok(content) => Ok(content.clone()),
                StubOutcome::Err(message) => Err(AdapterError::Backend(message.clone())),
            };
            Box::pin(async move { result })
        }
    }

    pub(crate) struct Stubs {
        pub cloud: Arc<StubBackend>,
        pub hosted: Arc<StubBackend>,
        pub local: Arc<StubBackend>,
    }

    impl Stubs {
        pub(crate) fn answering() -> Self {
            Self {
                cloud: StubBackend::ok("from cloud"),
                hosted: StubBackend::ok("from hosted"),
                local: StubBackend::ok("from local"),
            }
        }

        pub(crate) fn dispatcher(&self, registry: Registry) -> Dispatcher {
            Dispatcher::new(
                registry,
                self.cloud.clone(),
                self.hosted.clone(),
                self.local.clone(),
            )
        }

        fn total_calls(&self) -> usize {
            self.cloud.calls().len() + self.hosted.calls().len() + self.local.calls().len()
        }
    }

    #[tokio::test]
    async fn dispatch_routes_each_builtin_entry_to_exactly_one_adapter() {
        let stubs = Stubs::answering();
        let dispatcher = stubs.dispatcher(Registry::builtin());

        let cases = [
            ("Meta-llama3", "from hosted"),
            ("Gemma 2 9B", "from hosted"),
            ("GPT2", "from cloud"),
            ("Zephyr-7b", "from cloud"),
            ("Gemma-7b", "from cloud"),
            ("DialoGPT", "from cloud"),
            ("Llama3 local", "from local"),
        ];
        for (idx, (display_name, expected)) in cases.iter().enumerate() {
            let answer = dispatcher
                .dispatch(display_name, "question")
                .await
                .expect("dispatch should succeed");
            assert_eq!(answer, *expected, "wrong adapter for {display_name}");
            assert_eq!(stubs.total_calls(), idx + 1);
        }

        assert_eq!(
            stubs.cloud.calls()[0],
            ("openai-community/gpt2".to_string(), "question".to_string())
        );
        assert_eq!(stubs.hosted.calls()[0].0, "llama3-8b-8192");
        assert_eq!(stubs.local.calls()[0].0, "llama3");
    }

    #[tokio::test]
    async fn dispatch_is_stable_across_repeated_calls() {
        let stubs = Stubs::answering();
        let dispatcher = stubs.dispatcher(Registry::builtin());

        for _ in 0..3 {
            let answer = dispatcher.dispatch("GPT2", "again").await.expect("dispatch");
            assert_eq!(answer, "from cloud");
        }
        assert_eq!(stubs.cloud.calls().len(), 3);
        assert!(stubs.hosted.calls().is_empty());
    }

    #[tokio::test]
    async fn local_name_takes_priority_over_path_identifier() {
        let stubs = Stubs::answering();
        let dispatcher = stubs.dispatcher(Registry::from_pairs(&[("Phi local", "microsoft/phi3")]));

        let answer = dispatcher.dispatch("Phi local", "hi").await.expect("dispatch");
        assert_eq!(answer, "from local");
        assert_eq!(stubs.local.calls()[0].0, "microsoft/phi3");
    }

    #[tokio::test]
    async fn unknown_selection_fails_without_calling_any_adapter() {
        let stubs = Stubs::answering();
        let dispatcher = stubs.dispatcher(Registry::builtin());

        let err = dispatcher
            .ask("GPT-5", "hi")
            .await
            .expect_err("unknown name should fail");

        assert_eq!(err, SelectionNotFound("GPT-5".to_string()));
        assert_eq!(stubs.total_calls(), 0);

        let err = dispatcher
            .dispatch("GPT-5", "hi")
            .await
            .expect_err("unknown name should fail");
        assert!(matches!(
            &err,
            DispatchError::SelectionNotFound(SelectionNotFound(name)) if name == "GPT-5"
        ));
        assert_eq!(err.to_string(), "selection not found: 'GPT-5'");
        assert_eq!(stubs.total_calls(), 0);
    }

    #[tokio::test]
    async fn dispatch_preserves_adapter_errors() {
        let stubs = Stubs {
            hosted: StubBackend::err("rate limited"),
            ..Stubs::answering()
        };
        let dispatcher = stubs.dispatcher(Registry::builtin());

        let err = dispatcher
            .dispatch("Meta-llama3", "hi")
            .await
            .expect_err("adapter failure should propagate");

        let msg = err.to_string();
        assert!(msg.contains("llama3-8b-8192"), "unexpected message: {msg}");
        assert!(msg.contains("rate limited"), "unexpected message: {msg}");
    }

    #[tokio::test]
    async fn ask_soft_fails_adapter_errors_on_every_branch() {
        let stubs = Stubs {
            cloud: StubBackend::err("model loading"),
            hosted: StubBackend::err("bad key"),
            local: StubBackend::err("daemon down"),
        };
        let dispatcher = stubs.dispatcher(Registry::builtin());

        for display_name in ["GPT2", "Meta-llama3", "Llama3 local"] {
            let answer = dispatcher
                .ask(display_name, "hi")
                .await
                .expect("soft failure should not error");
            assert_eq!(answer, "");
        }
        assert_eq!(stubs.total_calls(), 3);
    }

    /// Collects formatted log output so a test can assert on it.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().expect("log lock").clone()).expect("utf8 logs")
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn ask_through_inference_adapter_returns_empty_and_logs_failure_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/openai-community/gpt2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/google/gemma-7b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "model loading"})))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = Config {
            inference_base_url: format!("{}/models/", server.uri()),
            ..test_config()
        };
        let dispatcher =
            Dispatcher::from_config(Registry::builtin(), &reqwest::Client::new(), &cfg);

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let answer = dispatcher
            .ask("GPT2", "hi")
            .await
            .expect("500 should soft-fail");
        assert_eq!(answer, "");
        let answer = dispatcher
            .ask("Gemma-7b", "hi")
            .await
            .expect("error body should soft-fail");
        assert_eq!(answer, "");

        let output = logs.contents();
        let warnings: Vec<&str> = output.lines().filter(|line| line.contains("WARN")).collect();
        assert_eq!(warnings.len(), 2, "expected one warning per failure:\n{output}");
        assert!(warnings[0].contains("Huggingface API"), "missing service: {}", warnings[0]);
        assert!(warnings[0].contains("openai-community/gpt2"), "missing model: {}", warnings[0]);
        assert!(warnings[0].contains("boom"), "missing status body: {}", warnings[0]);
        assert!(warnings[1].contains("google/gemma-7b"), "missing model: {}", warnings[1]);
        assert!(warnings[1].contains("model loading"), "missing error text: {}", warnings[1]);
    }
}
