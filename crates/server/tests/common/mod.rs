#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use axum::Router;
use gateway::{
    Embedder, Embedding, IndexError, Match, Pipeline, QueryRequest, SemanticError, VectorIndex,
};
use http_body_util::BodyExt;
use server::state::pipeline_config;
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

pub const TOKEN: &str = "test-token";

pub struct StubEmbedder {
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
    pub failure: Option<SemanticError>,
    pub delay: Option<Duration>,
}

impl StubEmbedder {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
            failure: None,
            delay: None,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok()
        }
    }

    pub fn failing(err: SemanticError) -> Self {
        Self {
            failure: Some(err),
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, SemanticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Embedding {
                vector: vec![0.1; 1536],
                model_name: "text-embedding-3-small".into(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "text-embedding-3-small"
    }
}

pub struct StubIndex {
    pub calls: AtomicUsize,
    pub response: Result<Vec<Match>, IndexError>,
}

impl StubIndex {
    pub fn returning(ids: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Ok(ids.iter().map(|id| Match::new(*id)).collect()),
        }
    }

    pub fn failing(err: IndexError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Err(err),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for StubIndex {
    async fn query(&self, _request: QueryRequest<'_>) -> Result<Vec<Match>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }

    fn index_name(&self) -> &str {
        "alloratesting"
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        access_token: TOKEN.into(),
        openai_api_key: "sk-test".into(),
        pinecone_api_key: "pc-test".into(),
        ..ServerConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub embedder: Arc<StubEmbedder>,
    pub index: Arc<StubIndex>,
}

impl TestApp {
    pub fn new(embedder: StubEmbedder, index: StubIndex) -> Self {
        Self::with_config(test_config(), embedder, index)
    }

    pub fn with_config(config: ServerConfig, embedder: StubEmbedder, index: StubIndex) -> Self {
        let embedder = Arc::new(embedder);
        let index = Arc::new(index);
        let pipeline = Pipeline::new(embedder.clone(), index.clone(), pipeline_config(&config));
        let state = Arc::new(ServerState::with_pipeline(config, pipeline));
        Self {
            router: build_router(state),
            embedder,
            index,
        }
    }

    pub fn upstream_calls(&self) -> usize {
        self.embedder.calls() + self.index.calls()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn results_request(peer: &str, auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/get_results")
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let mut request = builder.body(Body::from(body.to_string())).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    request
}

pub fn authorized(body: &str) -> Request<Body> {
    results_request("192.0.2.10:40000", Some(&format!("Bearer {TOKEN}")), body)
}

// Helper to parse JSON response body
pub async fn json_body(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
