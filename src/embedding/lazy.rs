use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{error, info};

use agri_knowledge_core::embedding::EmbeddingProvider;
use agri_knowledge_core::error::KnowledgeError;

type Factory = dyn Fn() -> anyhow::Result<Arc<dyn EmbeddingProvider>> + Send + Sync;

/// Defers provider construction (model load, client build, API-key check)
/// to the first `embed` call.
///
/// The factory runs on a blocking thread at most once per successful
/// initialization. Concurrent first callers wait on the same
/// [`OnceCell`]. A failed initialization is reported as
/// [`KnowledgeError::Init`] and retried by the next call.
pub struct LazyProvider {
    model_name: String,
    dims: usize,
    factory: Arc<Factory>,
    cell: OnceCell<Arc<dyn EmbeddingProvider>>,
    init_attempts: AtomicUsize,
}

impl LazyProvider {
    pub fn new<F>(model_name: String, dims: usize, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn EmbeddingProvider>> + Send + Sync + 'static,
    {
        Self {
            model_name,
            dims,
            factory: Arc::new(factory),
            cell: OnceCell::new(),
            init_attempts: AtomicUsize::new(0),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// How many times the factory has been invoked.
    pub fn init_attempts(&self) -> usize {
        self.init_attempts.load(Ordering::SeqCst)
    }

    async fn get(&self) -> agri_knowledge_core::Result<&Arc<dyn EmbeddingProvider>> {
        self.cell
            .get_or_try_init(|| async {
                self.init_attempts.fetch_add(1, Ordering::SeqCst);
                let factory = Arc::clone(&self.factory);
                let built = tokio::task::spawn_blocking(move || factory())
                    .await
                    .map_err(|e| KnowledgeError::Init(e.to_string()))?;

                match built {
                    Ok(provider) => {
                        info!(model = %self.model_name, dims = self.dims, "embedding provider initialized");
                        Ok(provider)
                    }
                    Err(e) => {
                        error!(model = %self.model_name, error = %format!("{:#}", e), "embedding provider failed to initialize");
                        Err(KnowledgeError::Init(format!("{:#}", e)))
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl EmbeddingProvider for LazyProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> agri_knowledge_core::Result<Vec<Vec<f32>>> {
        let provider = self.get().await?;
        provider.embed(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_knowledge_core::embedding::HashingProvider;
    use agri_knowledge_core::error::ErrorKind;
    use std::sync::atomic::AtomicBool;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_initializes_once_under_concurrency() {
        let lazy = Arc::new(LazyProvider::new("hashing".to_string(), 16, || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(Arc::new(HashingProvider::new(16)?) as Arc<dyn EmbeddingProvider>)
        }));
        assert!(!lazy.is_initialized());

        let mut handles = Vec::new();
        for i in 0..8 {
            let lazy = Arc::clone(&lazy);
            handles.push(tokio::spawn(async move {
                lazy.embed(&[format!("text {}", i)]).await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap()[0].len(), 16);
        }

        assert!(lazy.is_initialized());
        assert_eq!(lazy.init_attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_init_is_fatal_and_retried() {
        let ready = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ready);
        let lazy = LazyProvider::new("flaky".to_string(), 8, move || {
            if !flag.load(Ordering::SeqCst) {
                anyhow::bail!("model download failed");
            }
            Ok(Arc::new(HashingProvider::new(8)?) as Arc<dyn EmbeddingProvider>)
        });

        let err = lazy.embed(&["x".to_string()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(err.to_string().contains("model download failed"));
        assert!(!lazy.is_initialized());

        ready.store(true, Ordering::SeqCst);
        assert!(lazy.embed(&["x".to_string()]).await.is_ok());
        assert_eq!(lazy.init_attempts(), 2);
    }

    #[test]
    fn test_identity_known_before_init() {
        let lazy = LazyProvider::new("all-minilm-l6-v2".to_string(), 384, || {
            anyhow::bail!("never called")
        });
        assert_eq!(lazy.model_name(), "all-minilm-l6-v2");
        assert_eq!(lazy.dims(), 384);
        assert_eq!(lazy.init_attempts(), 0);
    }
}
