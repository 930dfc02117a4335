//! Authentication flow management integration tests.

use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::common::{TestEnv, encode};

const REALM: &str = "master";

fn new_flow(alias: Option<&str>, description: &str, provider_id: &str) -> Value {
    json!({
        "alias": alias,
        "description": description,
        "providerId": provider_id,
        "topLevel": true,
        "builtIn": false,
    })
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Fields of a flow that a copy keeps, with nested flow aliases mapped
/// through `rename`.
fn comparable(flow: &Value, rename: impl Fn(&str) -> String) -> Value {
    let executions: Vec<Value> = flow["authenticationExecutions"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|e| {
            json!({
                "authenticator": e["authenticator"],
                "authenticatorFlow": e["authenticatorFlow"],
                "requirement": e["requirement"],
                "priority": e["priority"],
                "flowAlias": e["flowAlias"].as_str().map(&rename),
                "userSetupAllowed": e["userSetupAllowed"],
                "authenticatorConfig": e["authenticatorConfig"],
            })
        })
        .collect();
    json!({
        "description": flow["description"],
        "providerId": flow["providerId"],
        "topLevel": flow["topLevel"],
        "executions": executions,
    })
}

/// Tests creating, inspecting and deleting a flow.
#[tokio::test]
async fn test_add_remove_flow() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let flows_url = env.auth_url(REALM, "flows");

    // Built-in flows cannot be deleted
    let flows = env.flows(REALM).await?;
    let builtin = flows
        .iter()
        .find(|f| f["builtIn"] == true)
        .expect("default flows are built in");
    let response = env
        .delete(&env.auth_url(REALM, &format!("flows/{}", builtin["id"].as_str().unwrap_or_default())))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Existing alias
    let response = env
        .post(&flows_url, &new_flow(Some("browser"), "Browser flow", "basic-flow"))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Missing alias
    let response = env
        .post(&flows_url, &new_flow(None, "Browser flow", "basic-flow"))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = env
        .post(&flows_url, &new_flow(Some("browser-2"), "Browser flow", "basic-flow"))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let found = env
        .find_flow(REALM, "browser-2")
        .await?
        .expect("created flow is listed");
    assert_eq!(found["description"], "Browser flow");
    assert_eq!(found["providerId"], "basic-flow");
    assert_eq!(found["topLevel"], true);
    assert_eq!(found["builtIn"], false);
    let id = found["id"].as_str().unwrap_or_default().to_string();
    assert!(location(&response).ends_with(&format!("/authentication/flows/{id}")));

    let response = env
        .get(&env.auth_url(REALM, "flows/id-123-notExistent"))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let direct = env.get_json(&env.auth_url(REALM, &format!("flows/{id}"))).await?;
    assert_eq!(direct["alias"], "browser-2");

    // Nested flow under a missing parent
    let mut data = json!({
        "alias": "SomeFlow",
        "type": "basic-flow",
        "description": "Test flow",
        "provider": "registration-page-form",
    });
    let response = env
        .post(
            &env.auth_url(REALM, "flows/inexistent-parent-flow-alias/executions/flow"),
            &data,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nested flow with the alias of an existing flow
    data["alias"] = json!("browser");
    let response = env
        .post(&env.auth_url(REALM, "flows/browser-2/executions/flow"), &data)
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    data["alias"] = json!("SomeFlow");
    let response = env
        .post(&env.auth_url(REALM, "flows/browser-2/executions/flow"), &data)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let nested_location = location(&response);

    let found = env
        .find_flow(REALM, "browser-2")
        .await?
        .expect("parent still listed");
    let executions = found["authenticationExecutions"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(executions.len(), 1);
    let execution = &executions[0];
    assert_eq!(execution["flowAlias"], "SomeFlow");
    assert_eq!(execution["userSetupAllowed"], false);
    assert_eq!(execution["authenticator"], "registration-page-form");
    assert_eq!(execution["autheticatorFlow"], true);
    assert_eq!(execution["requirement"], "DISABLED");
    assert_eq!(execution["priority"], 0);

    // Nested flows are not listed at the top level
    assert!(env.find_flow(REALM, "SomeFlow").await?.is_none());

    let response = env.delete(&env.auth_url(REALM, &format!("flows/{id}"))).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(env.find_flow(REALM, "browser-2").await?.is_none());

    // The nested flow went with its parent
    let response = env
        .get(&format!("{}{nested_location}", env.base_url))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = env
        .delete(&env.auth_url(REALM, "flows/id-123-notExistent"))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

/// Tests deep-copying a flow.
#[tokio::test]
async fn test_copy_flow() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .post(
            &env.auth_url(REALM, "flows/browser/copy"),
            &json!({"newName": "clients"}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = env
        .post(&env.auth_url(REALM, "flows/non-existent/copy"), &json!({}))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = env
        .post(&env.auth_url(REALM, "flows/browser/copy"), &json!({}))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = env
        .post(
            &env.auth_url(REALM, "flows/browser/copy"),
            &json!({"newName": "Copy of browser"}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let browser = env.find_flow(REALM, "browser").await?.expect("browser");
    let copy = env
        .find_flow(REALM, "Copy of browser")
        .await?
        .expect("copy is listed");
    assert_eq!(copy["builtIn"], false);
    assert_ne!(copy["id"], browser["id"]);
    assert_eq!(
        comparable(&copy, str::to_string),
        comparable(&browser, |alias| format!("Copy of browser {alias}"))
    );

    let direct = env
        .get_json(&env.auth_url(
            REALM,
            &format!("flows/{}", copy["id"].as_str().unwrap_or_default()),
        ))
        .await?;
    assert_eq!(comparable(&direct, str::to_string), comparable(&copy, str::to_string));

    // The whole tree was copied
    let original = env.executions(REALM, "browser").await?;
    let copied = env.executions(REALM, "Copy of browser").await?;
    assert_eq!(original.len(), copied.len());
    assert!(
        copied
            .iter()
            .any(|e| e["displayName"] == "Copy of browser Browser - Conditional OTP" && e["level"] == 1)
    );

    // Editing the copy leaves the original alone
    let response = env
        .delete(&env.auth_url(
            REALM,
            &format!("flows/{}", copy["id"].as_str().unwrap_or_default()),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(env.executions(REALM, "browser").await?.len(), original.len());

    Ok(())
}

/// Tests adding a nested flow to a copied flow.
#[tokio::test]
async fn test_add_execution_flow() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .post(
            &env.auth_url(REALM, "flows/browser/copy"),
            &json!({"newName": "parent"}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = env
        .post(
            &env.auth_url(REALM, "flows/parent/executions/flow"),
            &json!({
                "alias": "child",
                "description": "Description",
                "provider": "registration-page-form",
                "type": "basic-flow",
            }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let executions = env.executions(REALM, "parent").await?;
    let child = executions
        .iter()
        .find(|e| e["displayName"] == "child")
        .expect("child listed");
    assert_eq!(child["level"], 0);
    assert_eq!(child["authenticationFlow"], true);
    assert_eq!(child["requirement"], "DISABLED");

    // Built-in parents cannot be extended
    let response = env
        .post(
            &env.auth_url(REALM, "flows/browser/executions/flow"),
            &json!({"alias": "another", "type": "basic-flow"}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

/// Tests adding, reordering and removing executions.
#[tokio::test]
async fn test_execution_lifecycle() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env
        .post(
            &env.auth_url(REALM, "flows"),
            &new_flow(Some("custom"), "Custom flow", "basic-flow"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let add_url = env.auth_url(REALM, "flows/custom/executions/execution");
    for provider in ["auth-cookie", "auth-username-password-form"] {
        let response = env.post(&add_url, &json!({"provider": provider})).await?;
        assert_eq!(response.status(), StatusCode::CREATED, "{provider}");
    }

    // Unknown provider and provider of the wrong kind
    let response = env.post(&add_url, &json!({"provider": "no-such-provider"})).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = env.post(&add_url, &json!({"provider": "client-secret"})).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let executions = env.executions(REALM, "custom").await?;
    let providers: Vec<&str> = executions
        .iter()
        .filter_map(|e| e["providerId"].as_str())
        .collect();
    assert_eq!(providers, ["auth-cookie", "auth-username-password-form"]);
    assert_eq!(executions[0]["requirement"], "DISABLED");
    assert_eq!(executions[1]["index"], 1);

    assert_eq!(executions[1]["requirement"], "REQUIRED");

    // Requirement must be one of the choices
    let executions_url = env.auth_url(REALM, "flows/custom/executions");
    let mut update = executions[0].clone();
    update["requirement"] = json!("ALTERNATIVE");
    let response = env.put(&executions_url, &update).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(env.executions(REALM, "custom").await?[0]["requirement"], "ALTERNATIVE");

    update["requirement"] = json!("BOGUS");
    let response = env.put(&executions_url, &update).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut update = executions[1].clone();
    update["requirement"] = json!("DISABLED");
    let response = env.put(&executions_url, &update).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Raise the second execution above the first
    let second = executions[1]["id"].as_str().unwrap_or_default().to_string();
    let response = env
        .post_empty(&env.auth_url(REALM, &format!("executions/{second}/raise-priority")))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let reordered = env.executions(REALM, "custom").await?;
    assert_eq!(reordered[0]["id"], second.as_str());
    assert_eq!(reordered[0]["requirement"], "REQUIRED");

    // Raising the first execution is a no-op
    let response = env
        .post_empty(&env.auth_url(REALM, &format!("executions/{second}/raise-priority")))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(env.executions(REALM, "custom").await?[0]["id"], second.as_str());

    let response = env
        .delete(&env.auth_url(REALM, &format!("executions/{second}")))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(env.executions(REALM, "custom").await?.len(), 1);

    let response = env
        .get(&env.auth_url(REALM, &format!("executions/{second}")))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Executions of built-in flows stay put
    let browser = env.executions(REALM, "browser").await?;
    let first = browser[0]["id"].as_str().unwrap_or_default().to_string();
    let response = env
        .post_empty(&env.auth_url(REALM, &format!("executions/{first}/lower-priority")))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

/// Tests attaching and editing authenticator configs.
#[tokio::test]
async fn test_execution_config() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.post(
        &env.auth_url(REALM, "flows"),
        &new_flow(Some("with config"), "Configured", "basic-flow"),
    )
    .await?;
    let flow_alias = encode("with config");
    env.post(
        &env.auth_url(REALM, &format!("flows/{flow_alias}/executions/execution")),
        &json!({"provider": "identity-provider-redirector"}),
    )
    .await?;
    let executions = env.executions(REALM, "with config").await?;
    assert_eq!(executions[0]["configurable"], true);
    let execution_id = executions[0]["id"].as_str().unwrap_or_default().to_string();
    let config_url = env.auth_url(REALM, &format!("executions/{execution_id}/config"));

    let response = env.post(&config_url, &json!({"config": {}})).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = env
        .post(
            &config_url,
            &json!({"alias": "idp", "config": {"defaultProvider": "github"}}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let config_location = format!("{}{}", env.base_url, location(&response));

    let config = env.get_json(&config_location).await?;
    assert_eq!(config["alias"], "idp");
    assert_eq!(config["config"]["defaultProvider"], "github");

    let executions = env.executions(REALM, "with config").await?;
    assert_eq!(executions[0]["alias"], "idp");
    assert_eq!(executions[0]["authenticationConfig"], config["id"]);

    let response = env
        .put(
            &config_location,
            &json!({"alias": "idp", "config": {"defaultProvider": "gitlab"}}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let config = env.get_json(&config_location).await?;
    assert_eq!(config["config"]["defaultProvider"], "gitlab");

    let response = env.delete(&config_location).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = env.get(&config_location).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let executions = env.executions(REALM, "with config").await?;
    assert!(executions[0].get("authenticationConfig").is_none_or(Value::is_null));

    // Cookie authenticators take no config
    env.post(
        &env.auth_url(REALM, &format!("flows/{flow_alias}/executions/execution")),
        &json!({"provider": "auth-cookie"}),
    )
    .await?;
    let executions = env.executions(REALM, "with config").await?;
    let cookie = executions
        .iter()
        .find(|e| e["providerId"] == "auth-cookie")
        .expect("cookie execution");
    let response = env
        .post(
            &env.auth_url(
                REALM,
                &format!("executions/{}/config", cookie["id"].as_str().unwrap_or_default()),
            ),
            &json!({"alias": "cookie", "config": {}}),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

/// Tests the provider listings.
#[tokio::test]
async fn test_provider_listings() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let authenticators = env
        .get_json(&env.auth_url(REALM, "authenticator-providers"))
        .await?;
    let ids: Vec<&str> = authenticators
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert!(ids.contains(&"auth-cookie"));
    assert!(!ids.contains(&"client-secret"));
    assert!(ids.windows(2).all(|w| w[0] <= w[1]));

    let forms = env.get_json(&env.auth_url(REALM, "form-providers")).await?;
    assert!(
        forms
            .as_array()
            .into_iter()
            .flatten()
            .any(|p| p["id"] == "registration-page-form")
    );

    let clients = env
        .get_json(&env.auth_url(REALM, "client-authenticator-providers"))
        .await?;
    assert!(
        clients
            .as_array()
            .into_iter()
            .flatten()
            .all(|p| p["displayName"].is_string())
    );

    let response = env
        .get(&env.auth_url("no-such-realm", "form-action-providers"))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
