//! # kc-storage-memory
//!
//! In-memory implementation of the storage provider traits.
//!
//! All tables live behind a single [`tokio::sync::RwLock`], so every
//! provider call observes a consistent snapshot. Cloning the storage
//! shares the underlying tables.
//!
//! ## Example
//!
//! ```ignore
//! use kc_storage_memory::InMemoryStorage;
//! use kc_storage::RealmProvider;
//!
//! let storage = InMemoryStorage::new();
//! storage.create(&Realm::new("demo")).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kc_model::{AuthenticationExecution, AuthenticationFlow, AuthenticatorConfig, Realm};
use kc_storage::{AuthFlowProvider, RealmProvider, StorageError, StorageResult};
use tokio::sync::RwLock;
use uuid::Uuid;

/// An execution plus the sequence number it was inserted with.
#[derive(Debug, Clone)]
struct StoredExecution {
    seq: u64,
    execution: AuthenticationExecution,
}

#[derive(Debug, Default)]
struct Tables {
    realms: HashMap<Uuid, Realm>,
    flows: HashMap<Uuid, AuthenticationFlow>,
    executions: HashMap<Uuid, StoredExecution>,
    configs: HashMap<Uuid, AuthenticatorConfig>,
    next_seq: u64,
}

impl Tables {
    fn alias_taken(&self, realm_id: Uuid, alias: &str, except: Option<Uuid>) -> bool {
        self.flows
            .values()
            .any(|f| f.realm_id == realm_id && f.alias == alias && Some(f.id) != except)
    }

    fn flow_in_realm(&self, realm_id: Uuid, id: Uuid) -> Option<&AuthenticationFlow> {
        self.flows.get(&id).filter(|f| f.realm_id == realm_id)
    }
}

/// Thread-safe in-memory storage for realms and authentication flows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RealmProvider for InMemoryStorage {
    async fn create(&self, realm: &Realm) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.realms.values().any(|r| r.name == realm.name) {
            return Err(StorageError::duplicate("Realm", "name", &realm.name));
        }
        tables.realms.insert(realm.id, realm.clone());
        tracing::debug!(realm = %realm.name, "realm stored");
        Ok(())
    }

    async fn update(&self, realm: &Realm) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.realms.contains_key(&realm.id) {
            return Err(StorageError::not_found("Realm", realm.id));
        }
        if tables
            .realms
            .values()
            .any(|r| r.name == realm.name && r.id != realm.id)
        {
            return Err(StorageError::duplicate("Realm", "name", &realm.name));
        }
        let mut updated = realm.clone();
        updated.updated_at = Utc::now();
        tables.realms.insert(realm.id, updated);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .realms
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("Realm", id))
    }

    async fn get_by_id(&self, id: Uuid) -> StorageResult<Option<Realm>> {
        Ok(self.tables.read().await.realms.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Realm>> {
        let tables = self.tables.read().await;
        Ok(tables.realms.values().find(|r| r.name == name).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<Realm>> {
        let tables = self.tables.read().await;
        let mut realms: Vec<Realm> = tables.realms.values().cloned().collect();
        realms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(realms)
    }
}

#[async_trait]
impl AuthFlowProvider for InMemoryStorage {
    async fn create_flow(&self, flow: &AuthenticationFlow) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.alias_taken(flow.realm_id, &flow.alias, None) {
            return Err(StorageError::duplicate(
                "AuthenticationFlow",
                "alias",
                &flow.alias,
            ));
        }
        tables.flows.insert(flow.id, flow.clone());
        Ok(())
    }

    async fn update_flow(&self, flow: &AuthenticationFlow) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.flow_in_realm(flow.realm_id, flow.id).is_none() {
            return Err(StorageError::not_found("AuthenticationFlow", flow.id));
        }
        if tables.alias_taken(flow.realm_id, &flow.alias, Some(flow.id)) {
            return Err(StorageError::duplicate(
                "AuthenticationFlow",
                "alias",
                &flow.alias,
            ));
        }
        let mut updated = flow.clone();
        updated.updated_at = Utc::now();
        tables.flows.insert(flow.id, updated);
        Ok(())
    }

    async fn delete_flow(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.flow_in_realm(realm_id, id).is_none() {
            return Err(StorageError::not_found("AuthenticationFlow", id));
        }
        tables.flows.remove(&id);
        Ok(())
    }

    async fn get_flow(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<AuthenticationFlow>> {
        let tables = self.tables.read().await;
        Ok(tables.flow_in_realm(realm_id, id).cloned())
    }

    async fn get_flow_by_alias(
        &self,
        realm_id: Uuid,
        alias: &str,
    ) -> StorageResult<Option<AuthenticationFlow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .flows
            .values()
            .find(|f| f.realm_id == realm_id && f.alias == alias)
            .cloned())
    }

    async fn list_flows(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticationFlow>> {
        let tables = self.tables.read().await;
        let mut flows: Vec<AuthenticationFlow> = tables
            .flows
            .values()
            .filter(|f| f.realm_id == realm_id)
            .cloned()
            .collect();
        flows.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(flows)
    }

    async fn create_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .flow_in_realm(execution.realm_id, execution.parent_flow)
            .is_none()
        {
            return Err(StorageError::not_found(
                "AuthenticationFlow",
                execution.parent_flow,
            ));
        }
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.executions.insert(
            execution.id,
            StoredExecution {
                seq,
                execution: execution.clone(),
            },
        );
        Ok(())
    }

    async fn update_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        match tables.executions.get_mut(&execution.id) {
            Some(stored) if stored.execution.realm_id == execution.realm_id => {
                stored.execution = execution.clone();
                Ok(())
            }
            _ => Err(StorageError::not_found(
                "AuthenticationExecution",
                execution.id,
            )),
        }
    }

    async fn delete_execution(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        match tables.executions.get(&id) {
            Some(stored) if stored.execution.realm_id == realm_id => {
                tables.executions.remove(&id);
                Ok(())
            }
            _ => Err(StorageError::not_found("AuthenticationExecution", id)),
        }
    }

    async fn get_execution(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<AuthenticationExecution>> {
        let tables = self.tables.read().await;
        Ok(tables
            .executions
            .get(&id)
            .filter(|s| s.execution.realm_id == realm_id)
            .map(|s| s.execution.clone()))
    }

    async fn list_executions(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let tables = self.tables.read().await;
        let mut stored: Vec<&StoredExecution> = tables
            .executions
            .values()
            .filter(|s| s.execution.realm_id == realm_id && s.execution.parent_flow == flow_id)
            .collect();
        stored.sort_by_key(|s| (s.execution.priority, s.seq));
        Ok(stored.into_iter().map(|s| s.execution.clone()).collect())
    }

    async fn create_config(&self, config: &AuthenticatorConfig) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.configs.insert(config.id, config.clone());
        Ok(())
    }

    async fn update_config(&self, config: &AuthenticatorConfig) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        match tables.configs.get_mut(&config.id) {
            Some(existing) if existing.realm_id == config.realm_id => {
                *existing = config.clone();
                Ok(())
            }
            _ => Err(StorageError::not_found("AuthenticatorConfig", config.id)),
        }
    }

    async fn delete_config(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        match tables.configs.get(&id) {
            Some(config) if config.realm_id == realm_id => {}
            _ => return Err(StorageError::not_found("AuthenticatorConfig", id)),
        }
        tables.configs.remove(&id);
        for stored in tables.executions.values_mut() {
            if stored.execution.authenticator_config == Some(id) {
                stored.execution.authenticator_config = None;
            }
        }
        Ok(())
    }

    async fn get_config(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<AuthenticatorConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .configs
            .get(&id)
            .filter(|c| c.realm_id == realm_id)
            .cloned())
    }

    async fn list_configs(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticatorConfig>> {
        let tables = self.tables.read().await;
        let mut configs: Vec<AuthenticatorConfig> = tables
            .configs
            .values()
            .filter(|c| c.realm_id == realm_id)
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(configs)
    }

    async fn delete_realm_data(&self, realm_id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.flows.retain(|_, f| f.realm_id != realm_id);
        tables
            .executions
            .retain(|_, s| s.execution.realm_id != realm_id);
        tables.configs.retain(|_, c| c.realm_id != realm_id);
        tracing::debug!(%realm_id, "realm flow data removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_model::{FlowType, Requirement};

    fn flow(realm_id: Uuid, alias: &str) -> AuthenticationFlow {
        AuthenticationFlow::new_top_level(realm_id, alias, FlowType::BasicFlow)
    }

    #[tokio::test]
    async fn realm_names_are_unique() {
        let storage = InMemoryStorage::new();
        storage.create(&Realm::new("demo")).await.unwrap();

        let err = storage.create(&Realm::new("demo")).await.unwrap_err();
        assert!(err.is_duplicate());
        assert!(storage.exists_by_name("demo").await.unwrap());
        assert!(!storage.exists_by_name("other").await.unwrap());
    }

    #[tokio::test]
    async fn realms_listed_by_name() {
        let storage = InMemoryStorage::new();
        storage.create(&Realm::new("zeta")).await.unwrap();
        storage.create(&Realm::new("alpha")).await.unwrap();

        let names: Vec<String> = storage
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn flow_alias_unique_per_realm() {
        let storage = InMemoryStorage::new();
        let realm_a = Uuid::now_v7();
        let realm_b = Uuid::now_v7();

        storage.create_flow(&flow(realm_a, "browser")).await.unwrap();
        let err = storage.create_flow(&flow(realm_a, "browser")).await.unwrap_err();
        assert!(err.is_duplicate());

        // Same alias in another realm is fine.
        storage.create_flow(&flow(realm_b, "browser")).await.unwrap();
    }

    #[tokio::test]
    async fn flow_rename_to_taken_alias_rejected() {
        let storage = InMemoryStorage::new();
        let realm_id = Uuid::now_v7();
        storage.create_flow(&flow(realm_id, "one")).await.unwrap();
        let mut two = flow(realm_id, "two");
        storage.create_flow(&two).await.unwrap();

        two.alias = "one".to_string();
        assert!(storage.update_flow(&two).await.unwrap_err().is_duplicate());

        two.alias = "three".to_string();
        storage.update_flow(&two).await.unwrap();
        let found = storage.get_flow_by_alias(realm_id, "three").await.unwrap();
        assert_eq!(found.map(|f| f.id), Some(two.id));
    }

    #[tokio::test]
    async fn flows_are_realm_scoped() {
        let storage = InMemoryStorage::new();
        let realm_id = Uuid::now_v7();
        let f = flow(realm_id, "browser");
        storage.create_flow(&f).await.unwrap();

        assert!(storage.get_flow(Uuid::now_v7(), f.id).await.unwrap().is_none());
        assert!(storage
            .delete_flow(Uuid::now_v7(), f.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn top_level_flows_filtered() {
        let storage = InMemoryStorage::new();
        let realm_id = Uuid::now_v7();
        storage.create_flow(&flow(realm_id, "browser")).await.unwrap();
        storage
            .create_flow(&AuthenticationFlow::new_nested(
                realm_id,
                "forms",
                FlowType::BasicFlow,
            ))
            .await
            .unwrap();

        assert_eq!(storage.list_flows(realm_id).await.unwrap().len(), 2);
        let top = storage.list_top_level_flows(realm_id).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].alias, "browser");
    }

    #[tokio::test]
    async fn executions_sorted_by_priority_then_insertion() {
        let storage = InMemoryStorage::new();
        let realm_id = Uuid::now_v7();
        let parent = flow(realm_id, "browser");
        storage.create_flow(&parent).await.unwrap();

        for (provider, priority) in [("c", 20), ("a", 10), ("b", 10)] {
            let exec = AuthenticationExecution::authenticator(
                realm_id,
                parent.id,
                provider,
                Requirement::Required,
                priority,
            );
            storage.create_execution(&exec).await.unwrap();
        }

        let order: Vec<String> = storage
            .list_executions(realm_id, parent.id)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|e| e.authenticator)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn execution_requires_parent_flow() {
        let storage = InMemoryStorage::new();
        let realm_id = Uuid::now_v7();
        let exec = AuthenticationExecution::authenticator(
            realm_id,
            Uuid::now_v7(),
            "auth-cookie",
            Requirement::Alternative,
            0,
        );

        assert!(storage.create_execution(&exec).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn deleting_config_clears_references() {
        let storage = InMemoryStorage::new();
        let realm_id = Uuid::now_v7();
        let parent = flow(realm_id, "browser");
        storage.create_flow(&parent).await.unwrap();

        let config = AuthenticatorConfig::new(realm_id, "otp-settings", HashMap::new());
        storage.create_config(&config).await.unwrap();

        let mut exec = AuthenticationExecution::authenticator(
            realm_id,
            parent.id,
            "auth-otp-form",
            Requirement::Required,
            0,
        );
        exec.authenticator_config = Some(config.id);
        storage.create_execution(&exec).await.unwrap();

        storage.delete_config(realm_id, config.id).await.unwrap();

        let reloaded = storage.get_execution(realm_id, exec.id).await.unwrap().unwrap();
        assert!(reloaded.authenticator_config.is_none());
        assert!(storage.get_config(realm_id, config.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_realm_data_only_touches_that_realm() {
        let storage = InMemoryStorage::new();
        let gone = Uuid::now_v7();
        let kept = Uuid::now_v7();
        let f = flow(gone, "browser");
        storage.create_flow(&f).await.unwrap();
        storage
            .create_execution(&AuthenticationExecution::authenticator(
                gone,
                f.id,
                "auth-cookie",
                Requirement::Alternative,
                0,
            ))
            .await
            .unwrap();
        storage.create_flow(&flow(kept, "browser")).await.unwrap();

        storage.delete_realm_data(gone).await.unwrap();

        assert!(storage.list_flows(gone).await.unwrap().is_empty());
        assert!(storage.list_executions(gone, f.id).await.unwrap().is_empty());
        assert_eq!(storage.list_flows(kept).await.unwrap().len(), 1);
    }
}
