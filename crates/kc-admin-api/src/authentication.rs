//! Authentication management endpoints.
//!
//! Routes under `/admin/realms/{realm}/authentication` manage a realm's
//! flows, the executions inside them and the configs attached to those
//! executions. Built-in flows are read-only apart from execution
//! requirements. Nested flows are owned by the execution that wraps them:
//! deleting the execution or the parent flow deletes them too, and copying
//! a flow copies them under `"{newName} {alias}"`.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use kc_auth::{FlowTree, ProviderKind, ProviderRegistry, flow_requirement_choices};
use kc_core::EventType;
use kc_model::{
    AuthenticationExecution, AuthenticationFlow, AuthenticatorConfig, FlowType, Realm, Requirement,
};
use kc_storage::{AuthFlowProvider, RealmProvider};
use uuid::Uuid;

use crate::auth::{AdminAuth, Permission};
use crate::dto::{
    AddExecutionFlowRequest, AddExecutionRequest, AuthenticationExecutionExportRepresentation,
    AuthenticationExecutionInfoRepresentation, AuthenticationExecutionRepresentation,
    AuthenticationFlowRepresentation, AuthenticatorConfigRepresentation, ConfigRequest,
    CopyFlowRequest, FlowRequest, ProviderRepresentation, UpdateExecutionRequest,
};
use crate::error::{AdminError, AdminResult};
use crate::events::{AdminEventBuilder, AdminEventLogger};
use crate::paths;
use crate::state::AdminState;

// ============================================================================
// Lookups
// ============================================================================

/// Returns a non-blank value.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses an id taken from the URL; malformed ids name nothing.
fn parse_id(entity_type: &'static str, raw: &str) -> AdminResult<Uuid> {
    raw.parse()
        .map_err(|_| AdminError::not_found(entity_type, raw))
}

async fn flow_by_alias<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    alias: &str,
) -> AdminResult<AuthenticationFlow> {
    storage
        .get_flow_by_alias(realm_id, alias)
        .await?
        .ok_or_else(|| AdminError::not_found("AuthenticationFlow", alias))
}

async fn flow_by_id<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    id: Uuid,
) -> AdminResult<AuthenticationFlow> {
    storage
        .get_flow(realm_id, id)
        .await?
        .ok_or_else(|| AdminError::not_found_id("AuthenticationFlow", id))
}

/// Looks up the parent of a new execution. A missing parent is a bad
/// request rather than a missing resource.
async fn parent_flow<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    alias: &str,
) -> AdminResult<AuthenticationFlow> {
    let parent = storage
        .get_flow_by_alias(realm_id, alias)
        .await?
        .ok_or_else(|| AdminError::BadRequest("Parent flow doesn't exist".to_string()))?;
    if parent.built_in {
        return Err(AdminError::BadRequest(
            "It is illegal to add to a built in flow".to_string(),
        ));
    }
    Ok(parent)
}

async fn execution_by_id<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    id: Uuid,
) -> AdminResult<AuthenticationExecution> {
    storage
        .get_execution(realm_id, id)
        .await?
        .ok_or_else(|| AdminError::not_found_id("AuthenticationExecution", id))
}

async fn config_by_id<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    id: Uuid,
) -> AdminResult<AuthenticatorConfig> {
    storage
        .get_config(realm_id, id)
        .await?
        .ok_or_else(|| AdminError::not_found_id("AuthenticatorConfig", id))
}

async fn delete_config_if_present<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    id: Uuid,
) -> AdminResult<()> {
    match storage.delete_config(realm_id, id).await {
        Err(e) if !e.is_not_found() => Err(e.into()),
        _ => Ok(()),
    }
}

fn ensure_editable(flow: &AuthenticationFlow) -> AdminResult<()> {
    if flow.built_in {
        return Err(AdminError::BadRequest(format!(
            "It is illegal to modify the built in flow '{}'",
            flow.alias
        )));
    }
    Ok(())
}

fn priority_out_of_range() -> AdminError {
    AdminError::BadRequest("Execution priority is out of range".to_string())
}

/// Priority for an execution appended after `executions`.
fn next_priority(executions: &[AuthenticationExecution]) -> AdminResult<i32> {
    match executions.last() {
        Some(last) => last.priority.checked_add(1).ok_or_else(priority_out_of_range),
        None => Ok(0),
    }
}

/// 201 with a `Location` header. The response owns its header value.
fn created(
    realm: &Realm,
    path: impl std::fmt::Display,
) -> (StatusCode, [(&'static str, String); 1]) {
    (
        StatusCode::CREATED,
        [("Location", paths::admin_location(&realm.name, path))],
    )
}

fn choice_names(choices: &[Requirement]) -> Vec<String> {
    choices.iter().map(ToString::to_string).collect()
}

// ============================================================================
// Tree helpers
// ============================================================================

/// Appends the depth-first listing of a flow's executions.
fn flatten_executions(
    tree: &FlowTree,
    level: u32,
    providers: &ProviderRegistry,
    config_aliases: &HashMap<Uuid, String>,
    out: &mut Vec<AuthenticationExecutionInfoRepresentation>,
) {
    for (index, execution) in (0u32..).zip(tree.executions()) {
        let nested = execution
            .flow_id
            .filter(|_| execution.authenticator_flow)
            .and_then(|id| tree.sub_flow(id));

        if let Some(nested) = nested {
            let sub = nested.flow();
            let form = sub.is_form_flow();
            out.push(AuthenticationExecutionInfoRepresentation {
                id: execution.id,
                requirement: execution.requirement.to_string(),
                display_name: sub.alias.clone(),
                alias: None,
                description: sub.description.clone(),
                requirement_choices: choice_names(flow_requirement_choices(sub.provider_id)),
                configurable: false,
                authentication_flow: true,
                provider_id: execution.authenticator.clone().filter(|_| form),
                authentication_config: execution.authenticator_config.filter(|_| form),
                flow_id: Some(sub.id),
                level,
                index,
                priority: execution.priority,
            });
            flatten_executions(nested, level + 1, providers, config_aliases, out);
        } else {
            let provider_id = execution.authenticator.clone().unwrap_or_default();
            let descriptor = providers.get(&provider_id);
            out.push(AuthenticationExecutionInfoRepresentation {
                id: execution.id,
                requirement: execution.requirement.to_string(),
                display_name: descriptor
                    .as_ref()
                    .map_or_else(|| provider_id.clone(), |d| d.display_name.to_string()),
                alias: execution
                    .authenticator_config
                    .and_then(|id| config_aliases.get(&id).cloned()),
                description: descriptor
                    .as_ref()
                    .map(|d| d.description.to_string())
                    .filter(|d| !d.is_empty()),
                requirement_choices: descriptor
                    .as_ref()
                    .map(|d| choice_names(d.requirement_choices))
                    .unwrap_or_default(),
                configurable: descriptor.as_ref().is_some_and(|d| d.configurable),
                authentication_flow: false,
                provider_id: Some(provider_id),
                authentication_config: execution.authenticator_config,
                flow_id: None,
                level,
                index,
                priority: execution.priority,
            });
        }
    }
}

/// Collects every flow and execution below (and including) the tree root.
fn collect_subtree(
    tree: &FlowTree,
    flows: &mut Vec<Uuid>,
    executions: &mut Vec<AuthenticationExecution>,
) {
    flows.push(tree.flow().id);
    for execution in tree.executions() {
        executions.push(execution.clone());
        if let Some(nested) = execution.flow_id.and_then(|id| tree.sub_flow(id)) {
            collect_subtree(nested, flows, executions);
        }
    }
}

/// Deletes a flow with all its executions, their configs and nested flows.
async fn delete_flow_tree<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    flow_id: Uuid,
) -> AdminResult<()> {
    let tree = FlowTree::load(storage, realm_id, flow_id).await?;
    let mut flows = Vec::new();
    let mut executions = Vec::new();
    collect_subtree(&tree, &mut flows, &mut executions);

    for execution in &executions {
        storage.delete_execution(realm_id, execution.id).await?;
        if let Some(config) = execution.authenticator_config {
            delete_config_if_present(storage, realm_id, config).await?;
        }
    }
    for id in flows {
        storage.delete_flow(realm_id, id).await?;
    }
    tracing::debug!(%flow_id, executions = executions.len(), "deleted flow tree");
    Ok(())
}

/// Flows and executions a copy will create, parents before children.
#[derive(Default)]
struct CopyPlan {
    flows: Vec<AuthenticationFlow>,
    executions: Vec<AuthenticationExecution>,
}

fn plan_copy(tree: &FlowTree, copy: AuthenticationFlow, new_name: &str, plan: &mut CopyPlan) {
    let copy_id = copy.id;
    plan.flows.push(copy);

    for execution in tree.executions() {
        let mut cloned = AuthenticationExecution {
            id: Uuid::now_v7(),
            parent_flow: copy_id,
            ..execution.clone()
        };
        if let Some(nested) = execution.flow_id.and_then(|id| tree.sub_flow(id)) {
            let source = nested.flow();
            let mut sub_copy = AuthenticationFlow::new_nested(
                source.realm_id,
                format!("{new_name} {}", source.alias),
                source.provider_id,
            );
            sub_copy.description = source.description.clone();
            cloned.flow_id = Some(sub_copy.id);
            plan_copy(nested, sub_copy, new_name, plan);
        }
        plan.executions.push(cloned);
    }
}

/// Removes the executions that wrap a nested flow.
async fn detach_nested_flow<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
    flow_id: Uuid,
) -> AdminResult<()> {
    for flow in storage.list_flows(realm_id).await? {
        for execution in storage.list_executions(realm_id, flow.id).await? {
            if execution.flow_id == Some(flow_id) {
                storage.delete_execution(realm_id, execution.id).await?;
            }
        }
    }
    Ok(())
}

async fn export_flow<S: AuthFlowProvider>(
    storage: &S,
    providers: &ProviderRegistry,
    flow: &AuthenticationFlow,
    flow_aliases: &HashMap<Uuid, String>,
    config_aliases: &HashMap<Uuid, String>,
) -> AdminResult<AuthenticationFlowRepresentation> {
    let executions = storage.list_executions(flow.realm_id, flow.id).await?;
    let exported = executions
        .iter()
        .map(|execution| {
            let user_setup_allowed = !execution.authenticator_flow
                && execution
                    .authenticator
                    .as_deref()
                    .and_then(|id| providers.get(id))
                    .is_some_and(|d| d.user_setup_allowed);
            AuthenticationExecutionExportRepresentation::new(
                execution,
                execution.flow_id.and_then(|id| flow_aliases.get(&id).cloned()),
                execution
                    .authenticator_config
                    .and_then(|id| config_aliases.get(&id).cloned()),
                user_setup_allowed,
            )
        })
        .collect();
    Ok(AuthenticationFlowRepresentation::new(flow, exported))
}

async fn alias_maps<S: AuthFlowProvider>(
    storage: &S,
    realm_id: Uuid,
) -> AdminResult<(Vec<AuthenticationFlow>, HashMap<Uuid, String>, HashMap<Uuid, String>)> {
    let flows = storage.list_flows(realm_id).await?;
    let flow_aliases = flows.iter().map(|f| (f.id, f.alias.clone())).collect();
    let config_aliases = storage
        .list_configs(realm_id)
        .await?
        .into_iter()
        .map(|c| (c.id, c.alias))
        .collect();
    Ok((flows, flow_aliases, config_aliases))
}

// ============================================================================
// Flow Handlers
// ============================================================================

/// GET /authentication/flows - List top-level flows
async fn get_flows<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
) -> AdminResult<Json<Vec<AuthenticationFlowRepresentation>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let (flows, flow_aliases, config_aliases) = alias_maps(storage, realm.id).await?;
    let mut result = Vec::new();
    for flow in flows.iter().filter(|f| f.top_level) {
        result.push(export_flow(storage, &state.providers, flow, &flow_aliases, &config_aliases).await?);
    }
    Ok(Json(result))
}

/// POST /authentication/flows - Create a top-level flow
async fn create_flow<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
    Json(request): Json<FlowRequest>,
) -> AdminResult<impl IntoResponse>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let Some(alias) = non_blank(request.alias.as_deref()) else {
        return Err(AdminError::conflict("AuthenticationFlow", "alias", ""));
    };
    if storage.get_flow_by_alias(realm.id, alias).await?.is_some() {
        return Err(AdminError::conflict("AuthenticationFlow", "alias", alias));
    }
    let flow_type = match request.provider_id.as_deref() {
        Some(provider_id) => provider_id.parse()?,
        None => FlowType::BasicFlow,
    };

    let mut flow = AuthenticationFlow::new_top_level(realm.id, alias, flow_type);
    flow.description.clone_from(&request.description);
    flow.top_level = request.top_level.unwrap_or(true);
    storage.create_flow(&flow).await?;

    tracing::info!(realm = %realm.name, alias = %flow.alias, id = %flow.id, "created authentication flow");
    state
        .emit(
            AdminEventBuilder::new(EventType::AuthFlowCreated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_flow(flow.id))
                .representation(&AuthenticationFlowRepresentation::new(&flow, Vec::new()))
                .success(),
        )
        .await;

    Ok(created(&realm, paths::auth_flow(flow.id)))
}

/// GET /authentication/flows/{id} - Get a flow
async fn get_flow<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<Json<AuthenticationFlowRepresentation>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let flow = flow_by_id(storage, realm.id, parse_id("AuthenticationFlow", &id)?).await?;
    let (_, flow_aliases, config_aliases) = alias_maps(storage, realm.id).await?;
    let rep = export_flow(storage, &state.providers, &flow, &flow_aliases, &config_aliases).await?;
    Ok(Json(rep))
}

/// PUT /authentication/flows/{id} - Update alias or description
async fn update_flow<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
    Json(request): Json<FlowRequest>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let mut flow = flow_by_id(storage, realm.id, parse_id("AuthenticationFlow", &id)?).await?;
    ensure_editable(&flow)?;

    if let Some(alias) = request.alias.as_deref() {
        if alias.trim().is_empty() {
            return Err(AdminError::BadRequest("Flow alias cannot be empty".to_string()));
        }
        if alias != flow.alias {
            if storage.get_flow_by_alias(realm.id, alias).await?.is_some() {
                return Err(AdminError::conflict("AuthenticationFlow", "alias", alias));
            }
            flow.alias = alias.to_string();
        }
    }
    if let Some(provider_id) = request.provider_id.as_deref() {
        if provider_id.parse::<FlowType>()? != flow.provider_id {
            return Err(AdminError::BadRequest("Flow type cannot be changed".to_string()));
        }
    }
    if request.description.is_some() {
        flow.description.clone_from(&request.description);
    }
    flow.updated_at = Utc::now();
    storage.update_flow(&flow).await?;

    state
        .emit(
            AdminEventBuilder::new(EventType::AuthFlowUpdated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_flow(flow.id))
                .representation(&request)
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /authentication/flows/{id} - Delete a flow and everything below it
async fn delete_flow<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let flow = flow_by_id(storage, realm.id, parse_id("AuthenticationFlow", &id)?).await?;
    if flow.built_in {
        return Err(AdminError::BadRequest("Can't delete built in flow".to_string()));
    }
    if realm.binds_flow(flow.id) {
        return Err(AdminError::InUse {
            entity_type: "AuthenticationFlow",
            reason: format!("'{}' is bound to realm '{}'", flow.alias, realm.name),
        });
    }

    if !flow.top_level {
        detach_nested_flow(storage, realm.id, flow.id).await?;
    }
    delete_flow_tree(storage, realm.id, flow.id).await?;

    tracing::info!(realm = %realm.name, alias = %flow.alias, "deleted authentication flow");
    state
        .emit(
            AdminEventBuilder::new(EventType::AuthFlowDeleted)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_flow(flow.id))
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /authentication/flows/{flowAlias}/copy - Deep-copy a flow
async fn copy_flow<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, flow_alias)): Path<(String, String)>,
    Json(request): Json<CopyFlowRequest>,
) -> AdminResult<impl IntoResponse>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let new_name = non_blank(request.new_name.as_deref());
    if let Some(name) = new_name {
        if storage.get_flow_by_alias(realm.id, name).await?.is_some() {
            return Err(AdminError::conflict("AuthenticationFlow", "alias", name));
        }
    }
    let source = flow_by_alias(storage, realm.id, &flow_alias).await?;
    let Some(new_name) = new_name else {
        return Err(AdminError::BadRequest("newName is required".to_string()));
    };
    let tree = FlowTree::load(storage, realm.id, source.id).await?;

    let mut copy = AuthenticationFlow::new_top_level(realm.id, new_name, source.provider_id);
    copy.description.clone_from(&source.description);
    copy.top_level = source.top_level;
    let copy_id = copy.id;

    let mut plan = CopyPlan::default();
    plan_copy(&tree, copy, new_name, &mut plan);

    // Every alias is checked before anything is written.
    for flow in &plan.flows {
        if storage.get_flow_by_alias(realm.id, &flow.alias).await?.is_some() {
            return Err(AdminError::conflict("AuthenticationFlow", "alias", &flow.alias));
        }
    }
    for flow in &plan.flows {
        storage.create_flow(flow).await?;
    }
    for mut execution in plan.executions {
        if let Some(config_id) = execution.authenticator_config {
            let source_config = config_by_id(storage, realm.id, config_id).await?;
            let config = AuthenticatorConfig::new(realm.id, source_config.alias, source_config.config);
            storage.create_config(&config).await?;
            execution.authenticator_config = Some(config.id);
        }
        storage.create_execution(&execution).await?;
    }

    tracing::info!(
        realm = %realm.name,
        source = %source.alias,
        copy = %new_name,
        flows = plan.flows.len(),
        "copied authentication flow"
    );
    state
        .emit(
            AdminEventBuilder::new(EventType::AuthFlowCopied)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_copy_flow(&flow_alias))
                .representation(&request)
                .success(),
        )
        .await;

    Ok(created(&realm, paths::auth_flow(copy_id)))
}

// ============================================================================
// Execution Handlers
// ============================================================================

/// GET /authentication/flows/{flowAlias}/executions - Flattened execution listing
async fn get_executions<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, flow_alias)): Path<(String, String)>,
) -> AdminResult<Json<Vec<AuthenticationExecutionInfoRepresentation>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let flow = flow_by_alias(storage, realm.id, &flow_alias).await?;
    let tree = FlowTree::load(storage, realm.id, flow.id).await?;
    let config_aliases: HashMap<Uuid, String> = storage
        .list_configs(realm.id)
        .await?
        .into_iter()
        .map(|c| (c.id, c.alias))
        .collect();

    let mut result = Vec::new();
    flatten_executions(&tree, 0, &state.providers, &config_aliases, &mut result);
    Ok(Json(result))
}

/// PUT /authentication/flows/{flowAlias}/executions - Update an execution
async fn update_executions<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, flow_alias)): Path<(String, String)>,
    Json(request): Json<UpdateExecutionRequest>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    flow_by_alias(storage, realm.id, &flow_alias).await?;
    let mut execution = execution_by_id(storage, realm.id, request.id).await?;
    let nested = match execution.flow_id.filter(|_| execution.authenticator_flow) {
        Some(id) => Some(flow_by_id(storage, realm.id, id).await?),
        None => None,
    };

    let mut changed = false;
    if let Some(requirement) = request.requirement.as_deref() {
        let requirement: Requirement = requirement.parse()?;
        if requirement != execution.requirement {
            let allowed = match &nested {
                Some(sub) => flow_requirement_choices(sub.provider_id).contains(&requirement),
                None => execution
                    .authenticator
                    .as_deref()
                    .and_then(|id| state.providers.get(id))
                    .is_some_and(|d| d.allows(requirement)),
            };
            if !allowed {
                return Err(AdminError::BadRequest(format!(
                    "Requirement {requirement} is not allowed for this execution"
                )));
            }
            execution.requirement = requirement;
            changed = true;
        }
    }
    if let Some(priority) = request.priority {
        if priority != execution.priority {
            execution.priority = priority;
            changed = true;
        }
    }
    if changed {
        storage.update_execution(&execution).await?;
    }

    if let Some(mut sub) = nested {
        let mut renamed = false;
        if let Some(alias) = non_blank(request.display_name.as_deref()) {
            if alias != sub.alias {
                ensure_editable(&sub)?;
                if storage.get_flow_by_alias(realm.id, alias).await?.is_some() {
                    return Err(AdminError::conflict("AuthenticationFlow", "alias", alias));
                }
                sub.alias = alias.to_string();
                renamed = true;
            }
        }
        if request.description.is_some() && request.description != sub.description {
            ensure_editable(&sub)?;
            sub.description.clone_from(&request.description);
            renamed = true;
        }
        if renamed {
            sub.updated_at = Utc::now();
            storage.update_flow(&sub).await?;
        }
    }

    state
        .emit(
            AdminEventBuilder::new(EventType::AuthExecutionUpdated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_flow_executions(&flow_alias))
                .representation(&request)
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /authentication/flows/{flowAlias}/executions/execution - Add an authenticator
async fn add_execution<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, flow_alias)): Path<(String, String)>,
    Json(request): Json<AddExecutionRequest>,
) -> AdminResult<impl IntoResponse>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let parent = parent_flow(storage, realm.id, &flow_alias).await?;
    let Some(provider) = non_blank(request.provider.as_deref()) else {
        return Err(AdminError::BadRequest("provider is required".to_string()));
    };
    let kind = ProviderKind::for_flow(parent.provider_id);
    let descriptor = state
        .providers
        .get(provider)
        .filter(|d| d.kind == kind)
        .ok_or_else(|| {
            AdminError::BadRequest(format!("No authentication provider found for id: {provider}"))
        })?;

    let requirement = match descriptor.requirement_choices {
        [only] => *only,
        _ => Requirement::Disabled,
    };
    let siblings = storage.list_executions(realm.id, parent.id).await?;
    let execution = AuthenticationExecution::authenticator(
        realm.id,
        parent.id,
        provider,
        requirement,
        next_priority(&siblings)?,
    );
    storage.create_execution(&execution).await?;

    tracing::info!(realm = %realm.name, flow = %parent.alias, %provider, "added execution");
    state
        .emit(
            AdminEventBuilder::new(EventType::AuthExecutionCreated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_add_execution(&flow_alias))
                .representation(&request)
                .success(),
        )
        .await;

    Ok(created(&realm, paths::auth_execution(execution.id)))
}

/// POST /authentication/flows/{flowAlias}/executions/flow - Add a nested flow
async fn add_execution_flow<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, flow_alias)): Path<(String, String)>,
    Json(request): Json<AddExecutionFlowRequest>,
) -> AdminResult<impl IntoResponse>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let parent = parent_flow(storage, realm.id, &flow_alias).await?;
    let Some(alias) = non_blank(request.alias.as_deref()) else {
        return Err(AdminError::BadRequest("alias is required".to_string()));
    };
    if storage.get_flow_by_alias(realm.id, alias).await?.is_some() {
        return Err(AdminError::conflict("AuthenticationFlow", "alias", alias));
    }
    let flow_type = match request.flow_type.as_deref() {
        Some(flow_type) => flow_type.parse()?,
        None => FlowType::BasicFlow,
    };

    let mut flow = AuthenticationFlow::new_nested(realm.id, alias, flow_type);
    flow.description.clone_from(&request.description);

    let siblings = storage.list_executions(realm.id, parent.id).await?;
    let mut execution = AuthenticationExecution::sub_flow(
        realm.id,
        parent.id,
        flow.id,
        Requirement::Disabled,
        next_priority(&siblings)?,
    );
    if let Some(provider) = non_blank(request.provider.as_deref()) {
        execution = execution.with_authenticator(provider);
    }

    storage.create_flow(&flow).await?;
    storage.create_execution(&execution).await?;

    tracing::info!(realm = %realm.name, parent = %parent.alias, %alias, "added nested flow");
    state
        .emit(
            AdminEventBuilder::new(EventType::AuthExecutionFlowCreated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_add_execution_flow(&flow_alias))
                .representation(&request)
                .success(),
        )
        .await;

    Ok(created(&realm, paths::auth_flow(flow.id)))
}

/// GET /authentication/executions/{id} - Get an execution
async fn get_execution<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<Json<AuthenticationExecutionRepresentation>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    let realm = state.realm(&realm_name).await?;

    let id = parse_id("AuthenticationExecution", &id)?;
    let execution = execution_by_id(state.storage.as_ref(), realm.id, id).await?;
    Ok(Json(execution.into()))
}

/// DELETE /authentication/executions/{id} - Remove an execution
async fn remove_execution<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let id = parse_id("AuthenticationExecution", &id)?;
    let execution = execution_by_id(storage, realm.id, id).await?;
    let parent = flow_by_id(storage, realm.id, execution.parent_flow).await?;
    ensure_editable(&parent)?;

    storage.delete_execution(realm.id, execution.id).await?;
    if let Some(config) = execution.authenticator_config {
        delete_config_if_present(storage, realm.id, config).await?;
    }
    if let Some(nested) = execution.flow_id.filter(|_| execution.authenticator_flow) {
        delete_flow_tree(storage, realm.id, nested).await?;
    }

    state
        .emit(
            AdminEventBuilder::new(EventType::AuthExecutionDeleted)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_execution(execution.id))
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Swaps an execution with its previous (`raise`) or next sibling.
async fn move_execution<S, L>(
    state: &AdminState<S, L>,
    auth: &AdminAuth,
    realm_name: &str,
    id: &str,
    raise: bool,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(realm_name).await?;
    let storage = state.storage.as_ref();

    let id = parse_id("AuthenticationExecution", id)?;
    let execution = execution_by_id(storage, realm.id, id).await?;
    let parent = flow_by_id(storage, realm.id, execution.parent_flow).await?;
    ensure_editable(&parent)?;

    let siblings = storage.list_executions(realm.id, parent.id).await?;
    let position = siblings
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| AdminError::not_found_id("AuthenticationExecution", id))?;
    let neighbor = if raise {
        position.checked_sub(1)
    } else {
        Some(position + 1).filter(|p| *p < siblings.len())
    };

    if let Some(neighbor) = neighbor {
        let mut moved = siblings[position].clone();
        let mut other = siblings[neighbor].clone();
        if moved.priority == other.priority {
            moved.priority = if raise {
                moved.priority.checked_sub(1)
            } else {
                moved.priority.checked_add(1)
            }
            .ok_or_else(priority_out_of_range)?;
            storage.update_execution(&moved).await?;
        } else {
            std::mem::swap(&mut moved.priority, &mut other.priority);
            storage.update_execution(&moved).await?;
            storage.update_execution(&other).await?;
        }
    }

    let path = if raise {
        paths::auth_raise_execution(id)
    } else {
        paths::auth_lower_execution(id)
    };
    state
        .emit(
            AdminEventBuilder::new(EventType::AuthExecutionMoved)
                .with_auth(auth)
                .realm(realm.id)
                .resource_path(path)
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /authentication/executions/{id}/raise-priority
async fn raise_priority<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    move_execution(&state, &auth, &realm_name, &id, true).await
}

/// POST /authentication/executions/{id}/lower-priority
async fn lower_priority<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    move_execution(&state, &auth, &realm_name, &id, false).await
}

// ============================================================================
// Config Handlers
// ============================================================================

/// POST /authentication/executions/{id}/config - Attach a new config
async fn new_execution_config<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
    Json(request): Json<ConfigRequest>,
) -> AdminResult<impl IntoResponse>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let id = parse_id("AuthenticationExecution", &id)?;
    let mut execution = execution_by_id(storage, realm.id, id).await?;
    let Some(alias) = non_blank(request.alias.as_deref()) else {
        return Err(AdminError::BadRequest(
            "Failed to create authentication execution configuration with empty alias name"
                .to_string(),
        ));
    };
    let configurable = !execution.authenticator_flow
        && execution
            .authenticator
            .as_deref()
            .and_then(|provider| state.providers.get(provider))
            .is_some_and(|d| d.configurable);
    if !configurable {
        return Err(AdminError::BadRequest(
            "Execution provider is not configurable".to_string(),
        ));
    }

    let config = AuthenticatorConfig::new(realm.id, alias, request.config.clone());
    storage.create_config(&config).await?;
    let replaced = execution.authenticator_config.replace(config.id);
    storage.update_execution(&execution).await?;
    if let Some(old) = replaced {
        delete_config_if_present(storage, realm.id, old).await?;
    }

    state
        .emit(
            AdminEventBuilder::new(EventType::AuthenticatorConfigCreated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_execution_config(execution.id))
                .representation(&request)
                .success(),
        )
        .await;

    Ok(created(&realm, paths::auth_config(config.id)))
}

/// GET /authentication/config/{id}
async fn get_config<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<Json<AuthenticatorConfigRepresentation>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    let realm = state.realm(&realm_name).await?;

    let id = parse_id("AuthenticatorConfig", &id)?;
    let config = config_by_id(state.storage.as_ref(), realm.id, id).await?;
    Ok(Json(config.into()))
}

/// PUT /authentication/config/{id}
async fn update_config<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
    Json(request): Json<ConfigRequest>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let id = parse_id("AuthenticatorConfig", &id)?;
    let mut config = config_by_id(storage, realm.id, id).await?;
    if let Some(alias) = request.alias.as_deref() {
        if alias.trim().is_empty() {
            return Err(AdminError::BadRequest("Config alias cannot be empty".to_string()));
        }
        config.alias = alias.to_string();
    }
    config.config.clone_from(&request.config);
    storage.update_config(&config).await?;

    state
        .emit(
            AdminEventBuilder::new(EventType::AuthenticatorConfigUpdated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_config(id))
                .representation(&request)
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /authentication/config/{id}
async fn remove_config<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path((realm_name, id)): Path<(String, String)>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    let id = parse_id("AuthenticatorConfig", &id)?;
    config_by_id(storage, realm.id, id).await?;
    storage.delete_config(realm.id, id).await?;

    state
        .emit(
            AdminEventBuilder::new(EventType::AuthenticatorConfigDeleted)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(paths::auth_config(id))
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Provider Listings
// ============================================================================

async fn list_providers<S, L>(
    state: &AdminState<S, L>,
    auth: &AdminAuth,
    realm_name: &str,
    kind: ProviderKind,
) -> AdminResult<Json<Vec<ProviderRepresentation>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    state.realm(realm_name).await?;
    let providers = state
        .providers
        .list(kind)
        .into_iter()
        .map(ProviderRepresentation::from)
        .collect();
    Ok(Json(providers))
}

/// GET /authentication/authenticator-providers
async fn authenticator_providers<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
) -> AdminResult<Json<Vec<ProviderRepresentation>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    list_providers(&state, &auth, &realm_name, ProviderKind::Authenticator).await
}

/// GET /authentication/form-providers
async fn form_providers<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
) -> AdminResult<Json<Vec<ProviderRepresentation>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    list_providers(&state, &auth, &realm_name, ProviderKind::FormAuthenticator).await
}

/// GET /authentication/form-action-providers
async fn form_action_providers<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
) -> AdminResult<Json<Vec<ProviderRepresentation>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    list_providers(&state, &auth, &realm_name, ProviderKind::FormAction).await
}

/// GET /authentication/client-authenticator-providers
async fn client_authenticator_providers<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
) -> AdminResult<Json<Vec<ProviderRepresentation>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    list_providers(&state, &auth, &realm_name, ProviderKind::ClientAuthenticator).await
}

// ============================================================================
// Router Construction
// ============================================================================

/// Creates the authentication management router.
///
/// # Routes
///
/// All paths are below `/admin/realms/{realm}/authentication`.
///
/// - `GET|POST /flows`
/// - `GET|PUT|DELETE /flows/{id}`
/// - `POST /flows/{flowAlias}/copy`
/// - `GET|PUT /flows/{flowAlias}/executions`
/// - `POST /flows/{flowAlias}/executions/execution`
/// - `POST /flows/{flowAlias}/executions/flow`
/// - `GET|DELETE /executions/{id}`
/// - `POST /executions/{id}/raise-priority`, `POST /executions/{id}/lower-priority`
/// - `POST /executions/{id}/config`
/// - `GET|PUT|DELETE /config/{id}`
/// - `GET /authenticator-providers`, `/form-providers`,
///   `/form-action-providers`, `/client-authenticator-providers`
pub fn authentication_router<S, L>() -> Router<AdminState<S, L>>
where
    S: RealmProvider + AuthFlowProvider + 'static,
    L: AdminEventLogger + 'static,
{
    const BASE: &str = "/admin/realms/{realm}/authentication";

    Router::new()
        .route(
            &format!("{BASE}/flows"),
            get(get_flows::<S, L>).post(create_flow::<S, L>),
        )
        .route(
            &format!("{BASE}/flows/{{flow}}"),
            get(get_flow::<S, L>)
                .put(update_flow::<S, L>)
                .delete(delete_flow::<S, L>),
        )
        .route(&format!("{BASE}/flows/{{flow}}/copy"), post(copy_flow::<S, L>))
        .route(
            &format!("{BASE}/flows/{{flow}}/executions"),
            get(get_executions::<S, L>).put(update_executions::<S, L>),
        )
        .route(
            &format!("{BASE}/flows/{{flow}}/executions/execution"),
            post(add_execution::<S, L>),
        )
        .route(
            &format!("{BASE}/flows/{{flow}}/executions/flow"),
            post(add_execution_flow::<S, L>),
        )
        .route(
            &format!("{BASE}/executions/{{id}}"),
            get(get_execution::<S, L>).delete(remove_execution::<S, L>),
        )
        .route(
            &format!("{BASE}/executions/{{id}}/raise-priority"),
            post(raise_priority::<S, L>),
        )
        .route(
            &format!("{BASE}/executions/{{id}}/lower-priority"),
            post(lower_priority::<S, L>),
        )
        .route(
            &format!("{BASE}/executions/{{id}}/config"),
            post(new_execution_config::<S, L>),
        )
        .route(
            &format!("{BASE}/config/{{id}}"),
            get(get_config::<S, L>)
                .put(update_config::<S, L>)
                .delete(remove_config::<S, L>),
        )
        .route(
            &format!("{BASE}/authenticator-providers"),
            get(authenticator_providers::<S, L>),
        )
        .route(&format!("{BASE}/form-providers"), get(form_providers::<S, L>))
        .route(
            &format!("{BASE}/form-action-providers"),
            get(form_action_providers::<S, L>),
        )
        .route(
            &format!("{BASE}/client-authenticator-providers"),
            get(client_authenticator_providers::<S, L>),
        )
}
