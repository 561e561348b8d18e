use crate::cli::ServeArgs;
use crate::config::persona::PersonaConfig;
use crate::llm::chat::ChatClientFactory;
use std::env;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::State,
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Router,
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

use super::relay::{ relay_chat, RelayError };

#[derive(Clone)]
pub struct AppState {
    pub persona: Arc<PersonaConfig>,
    pub providers: Arc<dyn ChatClientFactory>,
    /// Name of the environment variable holding the provider key.
    pub api_key_env: String,
}

impl AppState {
    pub fn new(
        persona: Arc<PersonaConfig>,
        providers: Arc<dyn ChatClientFactory>,
        api_key_env: impl Into<String>
    ) -> Self {
        Self {
            persona,
            providers,
            api_key_env: api_key_env.into(),
        }
    }

    /// Read on every request so a missing key fails requests, not startup.
    pub fn resolve_credential(&self) -> Result<String, RelayError> {
        env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RelayError::MissingCredential(self.api_key_env.clone()))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/healthz", get(health_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    args: &ServeArgs,
    state: AppState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("{}:{}", args.bind, args.http_port).parse::<SocketAddr>()?;
    let app = router(state);

    match (args.enable_tls, &args.tls_cert_path, &args.tls_key_path) {
        (true, Some(cert_path), Some(key_path)) => {
            info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("Starting HTTPS relay on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        (true, _, _) => {
            error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
            return Err("TLS enabled without cert/key".into());
        }
        (false, _, _) => {
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
            })?;
            info!("Starting HTTP relay on: http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    info!("Chat relay hit");
    match relay_chat(&state, &body).await {
        Ok(response) => response,
        Err(e) => {
            error!("Error in chat relay: {}", e);
            e.into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::{ ChatClient, TokenStream };
    use crate::models::chat::{ ChatMessage, Role };
    use async_trait::async_trait;
    use axum::body::{ to_bytes, Body };
    use axum::http::{ header, Request, StatusCode };
    use futures::stream;
    use std::error::Error as StdError;
    use std::sync::Mutex;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder {
        connects: AtomicUsize,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    struct StubFactory {
        recorder: Arc<Recorder>,
        fragments: Vec<&'static str>,
        fail_open: bool,
    }

    struct StubClient {
        recorder: Arc<Recorder>,
        fragments: Vec<&'static str>,
        fail_open: bool,
    }

    #[async_trait]
    impl ChatClient for StubClient {
        async fn stream_chat(
            &self,
            messages: Vec<ChatMessage>
        ) -> Result<TokenStream, Box<dyn StdError + Send + Sync>> {
            self.recorder.seen.lock().unwrap().push(messages);
            if self.fail_open {
                return Err("connection refused".into());
            }
            let items: Vec<Result<String, Box<dyn StdError + Send + Sync>>> = self.fragments
                .iter()
                .map(|f| Ok(f.to_string()))
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }

        fn get_model(&self) -> String {
            "stub".to_string()
        }

        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    impl ChatClientFactory for StubFactory {
        fn connect(
            &self,
            _api_key: &str
        ) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
            self.recorder.connects.fetch_add(1, Ordering::SeqCst);
            Ok(
                Arc::new(StubClient {
                    recorder: self.recorder.clone(),
                    fragments: self.fragments.clone(),
                    fail_open: self.fail_open,
                })
            )
        }
    }

    fn state_with(key_env: &str, fragments: Vec<&'static str>, fail_open: bool) -> (AppState, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let factory = StubFactory { recorder: recorder.clone(), fragments, fail_open };
        let state = AppState::new(Arc::new(PersonaConfig::default()), Arc::new(factory), key_env);
        (state, recorder)
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_credential_fails_without_calling_provider() {
        let (state, recorder) = state_with("NADIYA_TEST_KEY_NEVER_SET", vec!["x"], false);

        for _ in 0..2 {
            let response = router(state.clone())
                .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = json_body(response).await;
            assert_eq!(body["error"], "Internal Server Error");
            assert_eq!(body["details"], "NADIYA_TEST_KEY_NEVER_SET is not set");
        }

        assert_eq!(recorder.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        std::env::set_var("NADIYA_TEST_KEY_BLANK", "  ");
        let (state, recorder) = state_with("NADIYA_TEST_KEY_BLANK", vec!["x"], false);

        let response = router(state)
            .oneshot(chat_request(r#"{"messages":[]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(recorder.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_structured_error() {
        std::env::set_var("NADIYA_TEST_KEY_MALFORMED", "sk-test");
        let (state, recorder) = state_with("NADIYA_TEST_KEY_MALFORMED", vec!["x"], false);

        let response = router(state).oneshot(chat_request("{\"messages\": oops")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Internal Server Error");
        assert!(body["details"].as_str().unwrap().starts_with("Invalid request body"));
        assert_eq!(recorder.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_open_failure_is_structured_error() {
        std::env::set_var("NADIYA_TEST_KEY_OPEN_FAIL", "sk-test");
        let (state, recorder) = state_with("NADIYA_TEST_KEY_OPEN_FAIL", vec![], true);

        let response = router(state)
            .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["details"], "connection refused");
        assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn streams_fragments_with_prompt_prepended() {
        std::env::set_var("NADIYA_TEST_KEY_STREAM", "sk-test");
        let (state, recorder) = state_with("NADIYA_TEST_KEY_STREAM", vec!["Hey", " there!"], false);
        let system_prompt = state.persona.system_prompt.clone();

        let body =
            r#"{"messages":[{"id":"initial-message","role":"assistant","content":"hello"},{"id":"u1","role":"user","content":"hi"}]}"#;
        let response = router(state).oneshot(chat_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Hey there!");

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            vec![
                ChatMessage::new(Role::System, system_prompt),
                ChatMessage::new(Role::Assistant, "hello"),
                ChatMessage::new(Role::User, "hi")
            ]
        );
    }

    #[tokio::test]
    async fn health_route_answers() {
        let (state, _) = state_with("NADIYA_TEST_KEY_HEALTH", vec![], false);
        let response = router(state)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
