//! Authentication flow engine.
//!
//! A [`FlowTree`] is a flow loaded from storage together with every nested
//! flow it reaches. The [`FlowProcessor`] walks the tree for one
//! authentication session, running authenticators in priority order and
//! combining their outcomes according to each execution's requirement:
//!
//! - `REQUIRED` executions must all succeed. When a flow level has any,
//!   its `ALTERNATIVE` executions are ignored.
//! - `ALTERNATIVE` executions are tried in order until one succeeds.
//! - `CONDITIONAL` nested flows run only when every condition evaluator
//!   inside them matches.
//! - `DISABLED` executions never run.
//!
//! Progress is kept in the [`AuthContext`], so a challenged session can be
//! resumed with [`FlowProcessor::action`].

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use kc_model::{AuthenticationExecution, AuthenticationFlow, Requirement};
use kc_storage::AuthFlowProvider;
use uuid::Uuid;

use crate::authenticator::{
    AuthContext, Authenticator, AuthenticatorRegistry, AuthenticatorResult, ExecutionStatus,
};
use crate::error::{AuthError, AuthResult};

/// Maximum depth of nested flows.
const MAX_DEPTH: usize = 32;

/// A flow with its executions and nested flows loaded.
#[derive(Debug, Clone)]
pub struct FlowTree {
    flow: AuthenticationFlow,
    executions: Vec<AuthenticationExecution>,
    sub_flows: HashMap<Uuid, FlowTree>,
}

impl FlowTree {
    /// Loads a flow and everything nested below it.
    ///
    /// ## Errors
    ///
    /// Returns `AuthError::FlowError` if the flow or one of its nested flows
    /// is missing, or if nesting exceeds the supported depth.
    pub fn load<S>(storage: &S, realm_id: Uuid, flow_id: Uuid) -> BoxFuture<'_, AuthResult<Self>>
    where
        S: AuthFlowProvider + ?Sized,
    {
        Self::load_at(storage, realm_id, flow_id, 0)
    }

    fn load_at<S>(
        storage: &S,
        realm_id: Uuid,
        flow_id: Uuid,
        depth: usize,
    ) -> BoxFuture<'_, AuthResult<Self>>
    where
        S: AuthFlowProvider + ?Sized,
    {
        async move {
            if depth > MAX_DEPTH {
                return Err(AuthError::FlowError(format!(
                    "flow nesting deeper than {MAX_DEPTH} levels"
                )));
            }
            let flow = storage
                .get_flow(realm_id, flow_id)
                .await?
                .ok_or_else(|| AuthError::FlowError(format!("flow not found: {flow_id}")))?;
            let executions = storage.list_executions(realm_id, flow_id).await?;

            let mut sub_flows = HashMap::new();
            for execution in executions.iter().filter(|e| e.authenticator_flow) {
                let nested = execution.flow_id.ok_or_else(|| {
                    AuthError::FlowError(format!(
                        "execution {} of flow '{}' has no nested flow",
                        execution.id, flow.alias
                    ))
                })?;
                let tree = Self::load_at(storage, realm_id, nested, depth + 1).await?;
                sub_flows.insert(nested, tree);
            }

            Ok(Self {
                flow,
                executions,
                sub_flows,
            })
        }
        .boxed()
    }

    /// Returns the flow at the root of this tree.
    #[must_use]
    pub const fn flow(&self) -> &AuthenticationFlow {
        &self.flow
    }

    /// Returns the root flow's executions in priority order.
    #[must_use]
    pub fn executions(&self) -> &[AuthenticationExecution] {
        &self.executions
    }

    /// Returns a directly nested flow.
    #[must_use]
    pub fn sub_flow(&self, flow_id: Uuid) -> Option<&Self> {
        self.sub_flows.get(&flow_id)
    }

    /// Finds an execution anywhere in the tree.
    #[must_use]
    pub fn find_execution(&self, id: Uuid) -> Option<&AuthenticationExecution> {
        self.executions
            .iter()
            .find(|e| e.id == id)
            .or_else(|| self.sub_flows.values().find_map(|sub| sub.find_execution(id)))
    }
}

/// Outcome of processing a flow.
#[derive(Debug, Clone)]
pub enum FlowOutcome {
    /// The flow completed successfully.
    Success,
    /// An authenticator needs user input.
    Challenge {
        /// Execution waiting for the answer.
        execution_id: Uuid,
        /// Challenge type.
        challenge_type: String,
        /// Additional data for the challenge.
        data: Option<serde_json::Value>,
    },
    /// The flow failed.
    Failed {
        /// Execution that failed, if one did.
        execution_id: Option<Uuid>,
        /// Error message.
        message: String,
    },
    /// The flow must be restarted from the beginning.
    Reset,
}

impl FlowOutcome {
    /// Checks if this is a success outcome.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    fn failed(execution_id: Option<Uuid>, message: impl Into<String>) -> Self {
        Self::Failed {
            execution_id,
            message: message.into(),
        }
    }
}

/// Result of one flow level.
enum Level {
    Success,
    /// Nothing enabled at this level.
    Empty,
    Stop(FlowOutcome),
}

/// Result of one execution.
enum Step {
    Success,
    Skipped,
    Stop(FlowOutcome),
}

/// Runs flow trees against authentication sessions.
#[derive(Debug, Clone)]
pub struct FlowProcessor {
    authenticators: Arc<AuthenticatorRegistry>,
}

impl FlowProcessor {
    /// Creates a processor resolving providers through the given registry.
    #[must_use]
    pub const fn new(authenticators: Arc<AuthenticatorRegistry>) -> Self {
        Self { authenticators }
    }

    /// Processes a flow until it succeeds, fails or needs user input.
    ///
    /// Executions already completed in the context are not run again.
    ///
    /// ## Errors
    ///
    /// Returns an error if an execution names an unregistered authenticator
    /// or an authenticator itself errors.
    pub async fn process(&self, tree: &FlowTree, ctx: &mut AuthContext) -> AuthResult<FlowOutcome> {
        match self.process_level(tree, ctx).await? {
            Level::Success => Ok(FlowOutcome::Success),
            Level::Empty => Ok(FlowOutcome::failed(None, "flow has no enabled executions")),
            Level::Stop(outcome) => Ok(outcome),
        }
    }

    /// Delivers the user's answer to a challenged execution and resumes
    /// the flow when it succeeds.
    ///
    /// ## Errors
    ///
    /// Returns `AuthError::ExecutionNotFound` if the execution is not part
    /// of the tree, and `AuthError::InvalidState` if it is not waiting on
    /// a challenge.
    pub async fn action(
        &self,
        tree: &FlowTree,
        ctx: &mut AuthContext,
        execution_id: Uuid,
    ) -> AuthResult<FlowOutcome> {
        let execution = tree
            .find_execution(execution_id)
            .ok_or(AuthError::ExecutionNotFound(execution_id))?;
        if ctx.status(execution_id) != Some(ExecutionStatus::Challenged) {
            return Err(AuthError::InvalidState);
        }

        let authenticator = self.authenticator(execution)?;
        ctx.execution_id = Some(execution_id);
        let result = authenticator.action(ctx).await?;

        match Self::record(execution_id, result, ctx) {
            Step::Success | Step::Skipped => self.process(tree, ctx).await,
            Step::Stop(outcome) => Ok(outcome),
        }
    }

    fn process_level<'a>(
        &'a self,
        tree: &'a FlowTree,
        ctx: &'a mut AuthContext,
    ) -> BoxFuture<'a, AuthResult<Level>> {
        async move {
            let mut required = Vec::new();
            let mut alternatives = Vec::new();
            for execution in &tree.executions {
                if self.is_condition(execution) {
                    continue;
                }
                match execution.requirement {
                    Requirement::Required => required.push(execution),
                    Requirement::Conditional if execution.authenticator_flow => {
                        required.push(execution);
                    }
                    Requirement::Alternative => alternatives.push(execution),
                    Requirement::Conditional | Requirement::Disabled => {}
                }
            }

            if required.is_empty() && alternatives.is_empty() {
                return Ok(Level::Empty);
            }

            if !required.is_empty() {
                if !alternatives.is_empty() {
                    tracing::warn!(
                        flow = %tree.flow.alias,
                        "flow mixes REQUIRED and ALTERNATIVE executions, alternatives ignored"
                    );
                }
                for execution in required {
                    if ctx.status(execution.id).is_some_and(ExecutionStatus::is_processed) {
                        continue;
                    }
                    if execution.requirement == Requirement::Conditional
                        && !self.conditions_match(tree, execution, ctx).await?
                    {
                        tracing::debug!(flow = %tree.flow.alias, execution = %execution.id, "conditional flow skipped");
                        ctx.set_status(execution.id, ExecutionStatus::Skipped);
                        continue;
                    }
                    match self.run(tree, execution, ctx).await? {
                        Step::Success => {}
                        Step::Skipped => {
                            return Ok(Level::Stop(FlowOutcome::failed(
                                Some(execution.id),
                                format!("required execution skipped in flow '{}'", tree.flow.alias),
                            )));
                        }
                        Step::Stop(outcome) => return Ok(Level::Stop(outcome)),
                    }
                }
                return Ok(Level::Success);
            }

            let mut last_failure = None;
            for execution in alternatives {
                match ctx.status(execution.id) {
                    Some(ExecutionStatus::Success) => return Ok(Level::Success),
                    Some(status) if status.is_processed() => continue,
                    _ => {}
                }
                match self.run(tree, execution, ctx).await? {
                    Step::Success => return Ok(Level::Success),
                    Step::Skipped => ctx.set_status(execution.id, ExecutionStatus::Attempted),
                    Step::Stop(failed @ FlowOutcome::Failed { .. }) => {
                        ctx.set_status(execution.id, ExecutionStatus::Attempted);
                        last_failure = Some(failed);
                    }
                    Step::Stop(outcome) => return Ok(Level::Stop(outcome)),
                }
            }

            Ok(Level::Stop(last_failure.unwrap_or_else(|| {
                FlowOutcome::failed(
                    None,
                    format!("no alternative succeeded in flow '{}'", tree.flow.alias),
                )
            })))
        }
        .boxed()
    }

    async fn run(
        &self,
        tree: &FlowTree,
        execution: &AuthenticationExecution,
        ctx: &mut AuthContext,
    ) -> AuthResult<Step> {
        if execution.authenticator_flow {
            let sub = Self::sub_tree(tree, execution)?;
            return match self.process_level(sub, ctx).await? {
                Level::Success | Level::Empty => {
                    ctx.set_status(execution.id, ExecutionStatus::Success);
                    Ok(Step::Success)
                }
                Level::Stop(outcome) => {
                    if matches!(outcome, FlowOutcome::Failed { .. }) {
                        ctx.set_status(execution.id, ExecutionStatus::Failed);
                    }
                    Ok(Step::Stop(outcome))
                }
            };
        }

        let authenticator = self.authenticator(execution)?;
        if authenticator.requires_user() && ctx.user_id.is_none() {
            ctx.set_status(execution.id, ExecutionStatus::Failed);
            return Ok(Step::Stop(FlowOutcome::failed(
                Some(execution.id),
                format!("authenticator '{}' requires an identified user", authenticator.id()),
            )));
        }

        ctx.execution_id = Some(execution.id);
        let result = authenticator.authenticate(ctx).await?;
        Ok(Self::record(execution.id, result, ctx))
    }

    fn record(execution_id: Uuid, result: AuthenticatorResult, ctx: &mut AuthContext) -> Step {
        match result {
            AuthenticatorResult::Success => {
                ctx.set_status(execution_id, ExecutionStatus::Success);
                Step::Success
            }
            AuthenticatorResult::Failed { message } => {
                ctx.set_status(execution_id, ExecutionStatus::Failed);
                Step::Stop(FlowOutcome::failed(Some(execution_id), message))
            }
            AuthenticatorResult::Challenge {
                challenge_type,
                data,
            } => {
                ctx.set_status(execution_id, ExecutionStatus::Challenged);
                Step::Stop(FlowOutcome::Challenge {
                    execution_id,
                    challenge_type,
                    data,
                })
            }
            AuthenticatorResult::Skip => {
                ctx.set_status(execution_id, ExecutionStatus::Skipped);
                Step::Skipped
            }
            AuthenticatorResult::FlowReset => {
                ctx.clear_status();
                Step::Stop(FlowOutcome::Reset)
            }
        }
    }

    /// Evaluates the condition executions of a conditional nested flow.
    /// A conditional flow without conditions never runs.
    async fn conditions_match(
        &self,
        tree: &FlowTree,
        execution: &AuthenticationExecution,
        ctx: &mut AuthContext,
    ) -> AuthResult<bool> {
        let sub = Self::sub_tree(tree, execution)?;
        let conditions: Vec<&AuthenticationExecution> = sub
            .executions
            .iter()
            .filter(|e| e.requirement.is_enabled() && self.is_condition(e))
            .collect();
        if conditions.is_empty() {
            return Ok(false);
        }

        for condition in conditions {
            let authenticator = self.authenticator(condition)?;
            ctx.execution_id = Some(condition.id);
            let matched = authenticator.matches_condition(ctx).await?;
            let status = if matched {
                ExecutionStatus::EvaluatedTrue
            } else {
                ExecutionStatus::EvaluatedFalse
            };
            ctx.set_status(condition.id, status);
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_condition(&self, execution: &AuthenticationExecution) -> bool {
        !execution.authenticator_flow
            && execution
                .authenticator
                .as_deref()
                .and_then(|id| self.authenticators.get(id))
                .is_some_and(|a| a.is_conditional())
    }

    fn authenticator(
        &self,
        execution: &AuthenticationExecution,
    ) -> AuthResult<Arc<dyn Authenticator>> {
        let id = execution.authenticator.as_deref().ok_or_else(|| {
            AuthError::FlowError(format!("execution {} has no authenticator", execution.id))
        })?;
        self.authenticators
            .get(id)
            .ok_or_else(|| AuthError::UnknownAuthenticator(id.to_string()))
    }

    fn sub_tree<'t>(tree: &'t FlowTree, execution: &AuthenticationExecution) -> AuthResult<&'t FlowTree> {
        execution
            .flow_id
            .and_then(|id| tree.sub_flows.get(&id))
            .ok_or_else(|| {
                AuthError::FlowError(format!(
                    "nested flow of execution {} is not loaded",
                    execution.id
                ))
            })
    }
}
