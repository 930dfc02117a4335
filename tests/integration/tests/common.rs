//! Common test utilities and fixtures.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::sleep;

use kc_server::{Server, ServerConfig};

/// Admin token accepted by the test server.
pub const ADMIN_TOKEN: &str = "integration-admin-token";

/// Test environment running a server on an ephemeral port.
pub struct TestEnv {
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client for testing.
    pub client: Client,
    /// Server shutdown signal.
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Starts a fresh server with only the `master` realm.
    pub async fn new() -> anyhow::Result<Self> {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter("kc_server=debug,kc_admin_api=debug")
            .try_init();

        let server = Server::new(ServerConfig::for_testing(ADMIN_TOKEN)).await?;
        let listener = server.bind().await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        // Create shutdown channel
        let (_shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.serve(listener, shutdown).await {
                tracing::error!("Server error: {}", e);
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        wait_for_server(&client, &base_url).await?;

        Ok(Self {
            base_url,
            client,
            _shutdown_tx,
        })
    }

    /// Returns the authentication admin URL of a realm.
    pub fn auth_url(&self, realm: &str, path: &str) -> String {
        format!(
            "{}/admin/realms/{realm}/authentication/{path}",
            self.base_url
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(ADMIN_TOKEN)
    }

    /// Sends an authorized GET.
    pub async fn get(&self, url: &str) -> anyhow::Result<Response> {
        Ok(self.authorized(self.client.get(url)).send().await?)
    }

    /// Sends an authorized GET and decodes the JSON body.
    pub async fn get_json(&self, url: &str) -> anyhow::Result<Value> {
        let response = self.get(url).await?;
        anyhow::ensure!(
            response.status().is_success(),
            "GET {url} returned {}",
            response.status()
        );
        Ok(response.json().await?)
    }

    /// Sends an authorized POST with a JSON body.
    pub async fn post(&self, url: &str, body: &Value) -> anyhow::Result<Response> {
        Ok(self.authorized(self.client.post(url)).json(body).send().await?)
    }

    /// Sends an authorized POST without a body.
    pub async fn post_empty(&self, url: &str) -> anyhow::Result<Response> {
        Ok(self.authorized(self.client.post(url)).send().await?)
    }

    /// Sends an authorized PUT with a JSON body.
    pub async fn put(&self, url: &str, body: &Value) -> anyhow::Result<Response> {
        Ok(self.authorized(self.client.put(url)).json(body).send().await?)
    }

    /// Sends an authorized DELETE.
    pub async fn delete(&self, url: &str) -> anyhow::Result<Response> {
        Ok(self.authorized(self.client.delete(url)).send().await?)
    }

    /// Lists the top-level flows of a realm.
    pub async fn flows(&self, realm: &str) -> anyhow::Result<Vec<Value>> {
        let flows = self.get_json(&self.auth_url(realm, "flows")).await?;
        Ok(flows.as_array().cloned().unwrap_or_default())
    }

    /// Finds a top-level flow by alias.
    pub async fn find_flow(&self, realm: &str, alias: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .flows(realm)
            .await?
            .into_iter()
            .find(|f| f["alias"] == alias))
    }

    /// Lists the flattened executions of a flow.
    pub async fn executions(&self, realm: &str, alias: &str) -> anyhow::Result<Vec<Value>> {
        let url = self.auth_url(realm, &format!("flows/{}/executions", encode(alias)));
        let executions = self.get_json(&url).await?;
        Ok(executions.as_array().cloned().unwrap_or_default())
    }
}

/// Percent-encodes a path segment.
pub fn encode(segment: &str) -> String {
    segment.replace('%', "%25").replace(' ', "%20").replace('/', "%2F")
}

/// Waits for the server to be ready.
async fn wait_for_server(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let health_url = format!("{base_url}/health");
    let max_attempts = 50;

    for attempt in 1..=max_attempts {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Server ready after {} attempts", attempt);
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!(
                    "Server not ready (status {}), attempt {}/{}",
                    response.status(),
                    attempt,
                    max_attempts
                );
            }
            Err(e) => {
                tracing::debug!(
                    "Server not ready ({}), attempt {}/{}",
                    e,
                    attempt,
                    max_attempts
                );
            }
        }
        sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Server did not become ready in time")
}
