//! Config Task State Machine: a four-phase compliance pipeline
//! (validate → check → enforce → post-check) run per policy per resource,
//! with per-policy error isolation and cross-policy post-check propagation.

use crate::context::AgentContext;
use crate::dedup::ProgressDedup;
use crate::error::TaskError;
use crate::reporter::Directive;
use crate::wire;
use taskagent_core::resource::{
    ComplianceState, ConfigStep, ConfigStepKind, OSPolicyMode, Resource, ResourceCompliance,
};
use taskagent_core::task::ConfigPayload;
use taskagent_core::{Clock, TaskId};
use taskagent_proto::{ApplyConfigCompletionState as Completion, ApplyConfigProgressState as Progress};

struct PolicyRun {
    id: String,
    mode: OSPolicyMode,
    has_error: bool,
}

/// One resource under a policy, tracked across both traversals. `resource`
/// is `None` when the factory failed to resolve the id — there is then
/// nothing left to validate, check, enforce, or clean up.
struct ResourceRun {
    policy_index: usize,
    resource: Option<Box<dyn Resource>>,
    compliance: ResourceCompliance,
    needs_post_check: bool,
}

pub struct ConfigTaskSm;

impl ConfigTaskSm {
    pub async fn run<C: Clock>(
        ctx: &AgentContext<C>,
        dedup: &mut ProgressDedup,
        task_id: TaskId,
        payload: ConfigPayload,
    ) -> Result<(), TaskError> {
        let result = Self::drive(ctx, dedup, &task_id, payload).await;
        let report_result = match result {
            Ok((state, policy_results)) => {
                ctx.reporter.report_config_complete(&task_id, state, policy_results, String::new()).await
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                ctx.reporter.report_config_complete(&task_id, Completion::ConfigFailed, vec![], e.to_string()).await
            }
        };
        let _ = report_result;
        dedup.forget(&task_id);
        Ok(())
    }

    async fn report<C: Clock>(
        ctx: &AgentContext<C>,
        dedup: &mut ProgressDedup,
        task_id: &TaskId,
        label: &str,
        state: Progress,
    ) -> Result<Directive, TaskError> {
        if !dedup.should_emit(task_id, label, ctx.clock.now()) {
            return Ok(Directive::Continue);
        }
        ctx.reporter.report_config_progress(task_id, state).await
    }

    /// Runs the pipeline to completion. Only infrastructure-level failures
    /// (a reporting RPC exhausting its retry budget) surface as `Err`;
    /// resource-level failures are folded into the per-policy results this
    /// returns alongside the terminal completion state.
    async fn drive<C: Clock>(
        ctx: &AgentContext<C>,
        dedup: &mut ProgressDedup,
        task_id: &TaskId,
        payload: ConfigPayload,
    ) -> Result<(Completion, Vec<taskagent_proto::OsPolicyResult>), TaskError> {
        if Self::report(ctx, dedup, task_id, "STARTED", Progress::ApplyConfigStarted).await? == Directive::Stop {
            return Ok((Completion::ConfigCancelled, vec![]));
        }
        if Self::report(ctx, dedup, task_id, "APPLYING_CONFIG", Progress::ApplyingConfig).await? == Directive::Stop {
            return Ok((Completion::ConfigCancelled, vec![]));
        }

        let mut policies: Vec<PolicyRun> =
            payload.policies.iter().map(|p| PolicyRun { id: p.id.clone(), mode: p.mode, has_error: false }).collect();
        let mut resources: Vec<ResourceRun> = Vec::new();
        let mut any_enforcement_succeeded = false;

        for (policy_index, policy_payload) in payload.policies.iter().enumerate() {
            for resource_id in &policy_payload.resource_ids {
                if policies[policy_index].has_error {
                    break;
                }
                Self::run_first_pass(ctx, policy_index, resource_id, &mut policies, &mut resources, &mut any_enforcement_succeeded).await;
            }
        }

        for i in 0..resources.len() {
            let policy_index = resources[i].policy_index;
            if policies[policy_index].has_error || !resources[i].needs_post_check {
                continue;
            }
            let Some(resource) = resources[i].resource.as_ref() else { continue };
            match resource.check_state().await {
                Err(e) => {
                    resources[i].compliance.push(ConfigStep::failed(ConfigStepKind::DesiredStateCheckPostEnforcement, e.to_string()));
                    resources[i].compliance.state = ComplianceState::Unknown;
                    policies[policy_index].has_error = true;
                }
                Ok(()) => {
                    resources[i].compliance.push(ConfigStep::ok(ConfigStepKind::DesiredStateCheckPostEnforcement));
                    resources[i].compliance.state =
                        if resource.in_desired_state() { ComplianceState::Compliant } else { ComplianceState::NonCompliant };
                }
            }
        }

        for r in &resources {
            if let Some(resource) = &r.resource {
                resource.cleanup().await;
            }
        }

        let policy_results = policies
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let resource_results =
                    resources.iter().filter(|r| r.policy_index == i).map(|r| wire::encode_resource_compliance(&r.compliance)).collect();
                wire::encode_policy_result(p.id.clone(), p.has_error, resource_results)
            })
            .collect();

        Ok((Completion::ConfigSucceeded, policy_results))
    }

    /// VALIDATION → DESIRED_STATE_CHECK → DESIRED_STATE_ENFORCEMENT for a
    /// single resource, pushing its outcome onto `resources` and marking
    /// `policies[policy_index].has_error` on any failure.
    async fn run_first_pass<C: Clock>(
        ctx: &AgentContext<C>,
        policy_index: usize,
        resource_id: &str,
        policies: &mut [PolicyRun],
        resources: &mut Vec<ResourceRun>,
        any_enforcement_succeeded: &mut bool,
    ) {
        let mut compliance = ResourceCompliance::new(resource_id);

        let resource = match ctx.resource_factory.build(resource_id) {
            Ok(r) => r,
            Err(e) => {
                compliance.push(ConfigStep::failed(ConfigStepKind::Validation, e.to_string()));
                resources.push(ResourceRun { policy_index, resource: None, compliance, needs_post_check: false });
                policies[policy_index].has_error = true;
                return;
            }
        };

        if let Err(e) = resource.validate().await {
            compliance.push(ConfigStep::failed(ConfigStepKind::Validation, e.to_string()));
            resources.push(ResourceRun { policy_index, resource: Some(resource), compliance, needs_post_check: false });
            policies[policy_index].has_error = true;
            return;
        }
        compliance.push(ConfigStep::ok(ConfigStepKind::Validation));

        if let Err(e) = resource.check_state().await {
            compliance.push(ConfigStep::failed(ConfigStepKind::DesiredStateCheck, e.to_string()));
            compliance.state = ComplianceState::Unknown;
            resources.push(ResourceRun { policy_index, resource: Some(resource), compliance, needs_post_check: false });
            policies[policy_index].has_error = true;
            return;
        }
        compliance.push(ConfigStep::ok(ConfigStepKind::DesiredStateCheck));
        compliance.state = if resource.in_desired_state() { ComplianceState::Compliant } else { ComplianceState::NonCompliant };

        let mut needs_post_check = *any_enforcement_succeeded;
        let policy_mode = policies[policy_index].mode;
        if policy_mode == OSPolicyMode::Enforcement && !resource.in_desired_state() {
            match resource.enforce_state().await {
                Err(e) => {
                    compliance.push(ConfigStep::failed(ConfigStepKind::DesiredStateEnforcement, e.to_string()));
                    resources.push(ResourceRun { policy_index, resource: Some(resource), compliance, needs_post_check: false });
                    policies[policy_index].has_error = true;
                    return;
                }
                Ok(()) => {
                    compliance.push(ConfigStep::ok(ConfigStepKind::DesiredStateEnforcement));
                    compliance.state = ComplianceState::Unknown;
                    needs_post_check = true;
                    *any_enforcement_succeeded = true;
                    for prior in resources.iter_mut() {
                        prior.needs_post_check = true;
                    }
                }
            }
        }

        resources.push(ResourceRun { policy_index, resource: Some(resource), compliance, needs_post_check });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use taskagent_adapters::resource_factory::ResourceFactory;
    use taskagent_adapters::test_support::{FakeResource, FakeResourceFactory};

    #[test]
    fn resource_factory_trait_object_builds_registered_ids() {
        let factory = FakeResourceFactory::new();
        factory.register(Arc::new(FakeResource::compliant("r1")));
        let built = (&factory as &dyn ResourceFactory).build("r1");
        assert!(built.is_ok());
    }

    #[test]
    fn unregistered_resource_id_fails_to_build() {
        let factory = FakeResourceFactory::new();
        let err = (&factory as &dyn ResourceFactory).build("missing").unwrap_err();
        assert!(err.0.contains("unregistered"));
    }

    #[test]
    fn non_compliant_resource_starts_out_of_desired_state() {
        let r = FakeResource::non_compliant_then_fixed("r1");
        assert!(!*r.in_desired_state.lock());
    }
}
