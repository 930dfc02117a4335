//! Realm and server integration tests.

use reqwest::StatusCode;
use serde_json::json;

use crate::common::TestEnv;

/// Tests health endpoints.
#[tokio::test]
async fn test_health_endpoints() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    for path in ["/health", "/health/live", "/health/ready"] {
        let response = env
            .client
            .get(format!("{}{path}", env.base_url))
            .send()
            .await?;
        assert!(response.status().is_success(), "{path} should return success");
    }

    Ok(())
}

/// Tests that the admin API requires a bearer token.
#[tokio::test]
async fn test_admin_requires_token() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(format!("{}/admin/realms", env.base_url))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = env
        .client
        .get(format!("{}/admin/realms", env.base_url))
        .bearer_auth("not-the-token")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

/// Tests the realm lifecycle and flow bindings.
#[tokio::test]
async fn test_realm_lifecycle() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let realms_url = format!("{}/admin/realms", env.base_url);

    let response = env.post(&realms_url, &json!({"realm": "acme"})).await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = env.post(&realms_url, &json!({"realm": "acme"})).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let realms = env.get_json(&realms_url).await?;
    let names: Vec<&str> = realms
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|r| r["realm"].as_str())
        .collect();
    assert!(names.contains(&"master"));
    assert!(names.contains(&"acme"));

    // New realms get the built-in flows
    let realm = env.get_json(&format!("{realms_url}/acme")).await?;
    assert_eq!(realm["browserFlow"], "browser");
    assert_eq!(realm["clientAuthenticationFlow"], "clients");
    assert!(env.find_flow("acme", "registration").await?.is_some());

    // Rebind the browser flow to a copy
    let response = env
        .post(
            &env.auth_url("acme", "flows/browser/copy"),
            &json!({"newName": "my browser"}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = env
        .put(&format!("{realms_url}/acme"), &json!({"browserFlow": "my browser"}))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let realm = env.get_json(&format!("{realms_url}/acme")).await?;
    assert_eq!(realm["browserFlow"], "my browser");

    // A bound flow cannot be deleted
    let copy = env.find_flow("acme", "my browser").await?.expect("copy");
    let copy_url = env.auth_url(
        "acme",
        &format!("flows/{}", copy["id"].as_str().unwrap_or_default()),
    );
    let response = env.delete(&copy_url).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Nested flows cannot be bound
    let response = env
        .put(&format!("{realms_url}/acme"), &json!({"browserFlow": "forms"}))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Realms are isolated
    assert!(env.find_flow("master", "my browser").await?.is_none());

    let response = env.delete(&format!("{realms_url}/acme")).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = env.get(&env.auth_url("acme", "flows")).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = env.delete(&format!("{realms_url}/master")).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    Ok(())
}
