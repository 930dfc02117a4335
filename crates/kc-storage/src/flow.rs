//! Authentication flow storage provider trait.

use async_trait::async_trait;
use kc_model::{AuthenticationExecution, AuthenticationFlow, AuthenticatorConfig};
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for authentication flow storage operations.
///
/// Flows, executions and authenticator configs are all scoped to a realm.
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait AuthFlowProvider: Send + Sync {
    // === Flows ===

    /// Creates a new flow.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a flow with the same alias
    /// exists in the realm.
    async fn create_flow(&self, flow: &AuthenticationFlow) -> StorageResult<()>;

    /// Updates an existing flow.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the flow doesn't exist, or
    /// `StorageError::Duplicate` if the new alias belongs to another flow.
    async fn update_flow(&self, flow: &AuthenticationFlow) -> StorageResult<()>;

    /// Deletes a flow by ID. Executions are not touched.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the flow doesn't exist.
    async fn delete_flow(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()>;

    /// Gets a flow by ID.
    async fn get_flow(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<AuthenticationFlow>>;

    /// Gets a flow by alias.
    async fn get_flow_by_alias(
        &self,
        realm_id: Uuid,
        alias: &str,
    ) -> StorageResult<Option<AuthenticationFlow>>;

    /// Lists all flows of a realm (top-level and nested), sorted by alias.
    async fn list_flows(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticationFlow>>;

    /// Lists top-level flows of a realm, sorted by alias.
    async fn list_top_level_flows(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticationFlow>> {
        let mut flows = self.list_flows(realm_id).await?;
        flows.retain(|f| f.top_level);
        Ok(flows)
    }

    // === Executions ===

    /// Creates a new execution.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the parent flow doesn't exist.
    async fn create_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()>;

    /// Updates an existing execution.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist.
    async fn update_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()>;

    /// Deletes an execution by ID. A nested flow it points to is not touched.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist.
    async fn delete_execution(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()>;

    /// Gets an execution by ID.
    async fn get_execution(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<AuthenticationExecution>>;

    /// Lists the executions of a flow, sorted by ascending priority.
    /// Executions with equal priority keep their insertion order.
    async fn list_executions(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>>;

    // === Authenticator configs ===

    /// Creates a new authenticator config.
    async fn create_config(&self, config: &AuthenticatorConfig) -> StorageResult<()>;

    /// Updates an existing authenticator config.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the config doesn't exist.
    async fn update_config(&self, config: &AuthenticatorConfig) -> StorageResult<()>;

    /// Deletes an authenticator config and clears every execution's
    /// reference to it.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the config doesn't exist.
    async fn delete_config(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()>;

    /// Gets an authenticator config by ID.
    async fn get_config(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<AuthenticatorConfig>>;

    /// Lists the authenticator configs of a realm, sorted by alias.
    async fn list_configs(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticatorConfig>>;

    // === Realm lifecycle ===

    /// Removes every flow, execution and config of a realm.
    async fn delete_realm_data(&self, realm_id: Uuid) -> StorageResult<()>;
}
