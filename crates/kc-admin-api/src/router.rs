//! Admin API router configuration.
//!
//! Provides functions to create Axum routers for the Admin API endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use kc_auth::add_default_flows;
use kc_core::EventType;
use kc_storage::{AuthFlowProvider, RealmProvider};

use crate::auth::{AdminAuth, Permission};
use crate::authentication::authentication_router;
use crate::dto::{CreateRealmRequest, RealmRepresentation, RealmSummary, UpdateRealmRequest};
use crate::error::{AdminError, AdminResult};
use crate::events::{AdminEventBuilder, AdminEventLogger};
use crate::state::AdminState;

// ============================================================================
// Realm Handlers
// ============================================================================

/// GET /admin/realms - List all realms
async fn list_realms<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
) -> AdminResult<Json<Vec<RealmSummary>>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    let realms = RealmProvider::list(state.storage.as_ref()).await?;
    let summaries: Vec<RealmSummary> = realms.into_iter().map(RealmSummary::from).collect();
    Ok(Json(summaries))
}

/// POST /admin/realms - Create a realm with its built-in flows
async fn create_realm<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Json(request): Json<CreateRealmRequest>,
) -> AdminResult<impl IntoResponse>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let storage = state.storage.as_ref();

    if request.realm.trim().is_empty() {
        return Err(AdminError::BadRequest(
            "Realm name cannot be empty".to_string(),
        ));
    }
    if storage.exists_by_name(&request.realm).await? {
        return Err(AdminError::conflict("Realm", "name", &request.realm));
    }

    let realm = add_default_flows(storage, request.into_realm()).await?;
    let realm_name = realm.name.clone();

    // Flows were written first; undo them if the realm itself is refused.
    if let Err(e) = storage.create(&realm).await {
        storage.delete_realm_data(realm.id).await?;
        return Err(if e.is_duplicate() {
            AdminError::conflict("Realm", "name", &realm_name)
        } else {
            AdminError::from(e)
        });
    }

    tracing::info!(realm = %realm_name, id = %realm.id, "created realm");
    state
        .emit(
            AdminEventBuilder::new(EventType::RealmCreated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(realm_name.clone())
                .success(),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        [(
            "Location",
            format!("/admin/realms/{}", urlencoding::encode(&realm_name)),
        )],
    ))
}

/// GET /admin/realms/{realm} - Get realm by name
async fn get_realm<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
) -> AdminResult<Json<RealmRepresentation>>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ViewRealm)?;
    let realm = state.realm(&realm_name).await?;
    let flows = state.storage.list_flows(realm.id).await?;

    Ok(Json(RealmRepresentation::new(&realm, &flows)))
}

/// PUT /admin/realms/{realm} - Update a realm and its flow bindings
async fn update_realm<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
    Json(request): Json<UpdateRealmRequest>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let mut realm = state.realm(&realm_name).await?;
    let storage = state.storage.as_ref();

    for (binding, alias) in request.bindings() {
        let flow = storage
            .get_flow_by_alias(realm.id, alias)
            .await?
            .filter(|f| f.top_level)
            .ok_or_else(|| {
                AdminError::BadRequest(format!(
                    "{binding:?} must name a top-level flow; '{alias}' does not exist"
                ))
            })?;
        realm.set_binding(binding, Some(flow.id));
    }
    request.apply_to(&mut realm);
    realm.updated_at = chrono::Utc::now();
    storage.update(&realm).await?;

    state
        .emit(
            AdminEventBuilder::new(EventType::RealmUpdated)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(realm.name.clone())
                .representation(&request)
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /admin/realms/{realm} - Delete a realm and its flows
async fn delete_realm<S, L>(
    State(state): State<AdminState<S, L>>,
    auth: AdminAuth,
    Path(realm_name): Path<String>,
) -> AdminResult<StatusCode>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    auth.require_permission(Permission::ManageRealm)?;
    let realm = state.realm(&realm_name).await?;

    // Protect master realm from deletion
    if realm.is_master() {
        return Err(AdminError::Forbidden(
            "Cannot delete the master realm".to_string(),
        ));
    }

    let storage = state.storage.as_ref();
    RealmProvider::delete(storage, realm.id).await?;
    storage.delete_realm_data(realm.id).await?;

    tracing::info!(realm = %realm.name, "deleted realm");
    state
        .emit(
            AdminEventBuilder::new(EventType::RealmDeleted)
                .with_auth(&auth)
                .realm(realm.id)
                .resource_path(realm.name.clone())
                .success(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router Construction
// ============================================================================

/// Creates the realm router.
///
/// # Routes
///
/// - `GET /admin/realms` - List all realms
/// - `POST /admin/realms` - Create a realm
/// - `GET /admin/realms/{realm}` - Get realm by name
/// - `PUT /admin/realms/{realm}` - Update a realm
/// - `DELETE /admin/realms/{realm}` - Delete a realm
pub fn realm_router<S, L>() -> Router<AdminState<S, L>>
where
    S: RealmProvider + AuthFlowProvider + 'static,
    L: AdminEventLogger + 'static,
{
    Router::new()
        .route(
            "/admin/realms",
            get(list_realms::<S, L>).post(create_realm::<S, L>),
        )
        .route(
            "/admin/realms/{realm}",
            get(get_realm::<S, L>)
                .put(update_realm::<S, L>)
                .delete(delete_realm::<S, L>),
        )
}

/// Creates the complete Admin API router.
///
/// Handlers read the caller from the [`AdminAuth`] request extension, so
/// the router must be layered with [`crate::auth::auth_middleware`].
///
/// # Example
///
/// ```ignore
/// let app = admin_router()
///     .with_state(state)
///     .layer(axum::middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub fn admin_router<S, L>() -> Router<AdminState<S, L>>
where
    S: RealmProvider + AuthFlowProvider + 'static,
    L: AdminEventLogger + 'static,
{
    realm_router().merge(authentication_router())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, Response, header},
        middleware,
    };
    use http_body_util::BodyExt;
    use kc_auth::ProviderRegistry;
    use kc_auth::defaults::{BROWSER_FLOW, DIRECT_GRANT_FLOW};
    use kc_model::{FlowBinding, Realm};
    use kc_storage_memory::InMemoryStorage;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{AuthState, SimpleTokenValidator, auth_middleware};
    use crate::events::InMemoryEventLogger;

    const TOKEN: &str = "admin-token";

    struct Harness {
        app: Router,
        storage: Arc<InMemoryStorage>,
        events: Arc<InMemoryEventLogger>,
    }

    async fn harness() -> Harness {
        let storage = Arc::new(InMemoryStorage::new());
        let master = add_default_flows(storage.as_ref(), Realm::new("master"))
            .await
            .unwrap();
        storage.create(&master).await.unwrap();

        let events = Arc::new(InMemoryEventLogger::new());
        let state = AdminState::new(
            Arc::clone(&storage),
            Arc::new(ProviderRegistry::with_builtin()),
            Arc::clone(&events),
        );
        let validator = SimpleTokenValidator::new().with_token(TOKEN, AdminAuth::realm_admin("admin"));
        let app = admin_router()
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                AuthState::new(validator),
                auth_middleware::<SimpleTokenValidator>,
            ));

        Harness {
            app,
            storage,
            events,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn requests_without_token_are_rejected() {
        let h = harness().await;
        let response = h
            .app
            .clone()
            .oneshot(Request::get("/admin/realms").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn create_realm_seeds_default_flows() {
        let h = harness().await;
        let response = send(&h.app, "POST", "/admin/realms", Some(json!({"realm": "demo"}))).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/admin/realms/demo");

        let realm = h.storage.get_by_name("demo").await.unwrap().unwrap();
        for binding in FlowBinding::ALL {
            assert!(realm.binding(binding).is_some(), "{binding:?} unbound");
        }
        assert_eq!(h.events.events_of(EventType::RealmCreated).len(), 1);

        let rep = json_body(send(&h.app, "GET", "/admin/realms/demo", None).await).await;
        assert_eq!(rep["browserFlow"], BROWSER_FLOW);
        assert_eq!(rep["directGrantFlow"], DIRECT_GRANT_FLOW);
    }

    #[tokio::test]
    async fn duplicate_realm_is_conflict() {
        let h = harness().await;
        let response = send(&h.app, "POST", "/admin/realms", Some(json!({"realm": "master"}))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&h.app, "POST", "/admin/realms", Some(json!({"realm": " "}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_realm_rebinds_flows() {
        let h = harness().await;
        let response = send(
            &h.app,
            "POST",
            "/admin/realms/master/authentication/flows",
            Some(json!({"alias": "custom browser", "providerId": "basic-flow"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(
            &h.app,
            "PUT",
            "/admin/realms/master",
            Some(json!({"browserFlow": "custom browser", "displayName": "Master"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let rep = json_body(send(&h.app, "GET", "/admin/realms/master", None).await).await;
        assert_eq!(rep["browserFlow"], "custom browser");
        assert_eq!(rep["displayName"], "Master");

        let response = send(
            &h.app,
            "PUT",
            "/admin/realms/master",
            Some(json!({"directGrantFlow": "missing"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_realm_removes_flows() {
        let h = harness().await;
        send(&h.app, "POST", "/admin/realms", Some(json!({"realm": "demo"}))).await;
        let realm = h.storage.get_by_name("demo").await.unwrap().unwrap();

        let response = send(&h.app, "DELETE", "/admin/realms/demo", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(h.storage.list_flows(realm.id).await.unwrap().is_empty());

        let response = send(&h.app, "GET", "/admin/realms/demo", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn master_realm_cannot_be_deleted() {
        let h = harness().await;
        let response = send(&h.app, "DELETE", "/admin/realms/master", None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn bound_flow_cannot_be_deleted() {
        let h = harness().await;
        send(
            &h.app,
            "POST",
            "/admin/realms/master/authentication/flows",
            Some(json!({"alias": "custom"})),
        )
        .await;
        send(
            &h.app,
            "PUT",
            "/admin/realms/master",
            Some(json!({"browserFlow": "custom"})),
        )
        .await;

        let realm = h.storage.get_by_name("master").await.unwrap().unwrap();
        let flow = h
            .storage
            .get_flow_by_alias(realm.id, "custom")
            .await
            .unwrap()
            .unwrap();
        let response = send(
            &h.app,
            "DELETE",
            &format!("/admin/realms/master/authentication/flows/{}", flow.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
