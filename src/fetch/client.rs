use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for the backend client: swap in wrappers that decorate
/// outgoing requests (auth headers) without touching the callers.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl HttpClient for Box<dyn HttpClient> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
