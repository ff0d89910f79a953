//! Escrow/agent backend HTTP client.
//!
//! The backend holds the server wallet that creates tasks, allocates budget
//! and settles requests on the escrow contract, and fronts the LLM agents.
//! Requests carry no client-side timeout and are never retried.

pub mod agents_api;
pub mod escrow_api;

pub use agents_api::{RunAgentPayload, RunAgentResponse};
pub use escrow_api::{
    AllocatePayload, AllocateResponse, CompleteRequestPayload, CompleteRequestResponse,
    CompleteTaskPayload, CompleteTaskResponse, CreateTaskPayload, CreateTaskResponse, IdValue,
};

use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

const CREATE_TASK_PATH: &str = "api/escrow/create-task";
const ALLOCATE_PATH: &str = "api/escrow/allocate";
const COMPLETE_REQUEST_PATH: &str = "api/escrow/complete-request";
const COMPLETE_TASK_PATH: &str = "api/escrow/complete-task";
const RUN_AGENT_PATH: &str = "api/agents/run";

#[async_trait]
pub trait EscrowBackend: Send + Sync {
    async fn create_task(&self, payload: &CreateTaskPayload) -> Result<CreateTaskResponse>;
    async fn allocate(&self, payload: &AllocatePayload) -> Result<AllocateResponse>;
    async fn complete_request(&self, payload: &CompleteRequestPayload) -> Result<CompleteRequestResponse>;
    async fn complete_task(&self, payload: &CompleteTaskPayload) -> Result<CompleteTaskResponse>;
    async fn run_agent(&self, payload: &RunAgentPayload) -> Result<RunAgentResponse>;
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| AppError::Config(format!("Invalid BACKEND_URL '{}': {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("Invalid backend path '{}': {}", path, e)))
    }

    async fn post<P, R>(&self, endpoint: &'static str, path: &str, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(path)?;
        log::debug!("[backend] POST {}", url);

        let response = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Transport {
                endpoint,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[backend] {} returned {}: {}", endpoint, status.as_u16(), body);
            return Err(AppError::Backend {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AppError::Protocol(format!("{} API returned an invalid body: {}", endpoint, e)))
    }
}

#[async_trait]
impl EscrowBackend for BackendClient {
    async fn create_task(&self, payload: &CreateTaskPayload) -> Result<CreateTaskResponse> {
        self.post("Create task", CREATE_TASK_PATH, payload).await
    }

    async fn allocate(&self, payload: &AllocatePayload) -> Result<AllocateResponse> {
        self.post("Allocate", ALLOCATE_PATH, payload).await
    }

    async fn complete_request(&self, payload: &CompleteRequestPayload) -> Result<CompleteRequestResponse> {
        self.post("Complete request", COMPLETE_REQUEST_PATH, payload).await
    }

    async fn complete_task(&self, payload: &CompleteTaskPayload) -> Result<CompleteTaskResponse> {
        self.post("Complete task", COMPLETE_TASK_PATH, payload).await
    }

    async fn run_agent(&self, payload: &RunAgentPayload) -> Result<RunAgentResponse> {
        self.post("Run agent", RUN_AGENT_PATH, payload).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls_keep_base_path() {
        let client = BackendClient::new("http://localhost:3001").unwrap();
        assert_eq!(
            client.endpoint_url(CREATE_TASK_PATH).unwrap().as_str(),
            "http://localhost:3001/api/escrow/create-task"
        );

        let client = BackendClient::new("https://demo.example.com/backend").unwrap();
        assert_eq!(
            client.endpoint_url(RUN_AGENT_PATH).unwrap().as_str(),
            "https://demo.example.com/backend/api/agents/run"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = BackendClient::new("::not a url").err().unwrap();
        assert_eq!(err.kind(), "config");
    }

    /// Serve one canned HTTP response on a local port
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_non_2xx_maps_to_backend_error() {
        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
        )
        .await;
        let client = BackendClient::new(&base).unwrap();
        let payload = AllocatePayload {
            task_id: "1".to_string(),
            to_agent_id: 2,
            amount: "10".to_string(),
            input: None,
        };

        let err = client.allocate(&payload).await.unwrap_err();
        assert_eq!(err.to_string(), "Allocate API failed: 500 boom");
    }

    #[tokio::test]
    async fn test_success_body_is_decoded() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 44\r\nConnection: close\r\n\r\n{\"success\":true,\"taskId\":\"9\",\"txHash\":\"0x1\"}",
        )
        .await;
        let client = BackendClient::new(&base).unwrap();
        let payload = CreateTaskPayload {
            client: "0x0000000000000000000000000000000000000001".to_string(),
            coordinator_agent_id: 1,
            total_budget: "25".to_string(),
            task_hash: None,
        };

        let response = client.create_task(&payload).await.unwrap();
        assert_eq!(response.require_task_id().unwrap(), "9");
        assert_eq!(response.tx_hash.as_deref(), Some("0x1"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is closed on test machines
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let payload = CompleteTaskPayload {
            task_id: "1".to_string(),
            success: true,
        };
        let err = client.complete_task(&payload).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert!(err.to_string().starts_with("Complete task API request failed"));
    }
}
