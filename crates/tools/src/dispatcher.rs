//! Tool dispatch over a single model response
//!
//! The response is in one of three states: no tool call (content returned
//! verbatim), tool call with content (content shown, side effect executed) or
//! tool call without content (deterministic filler per tool). Side effects
//! that touch the conversation itself are returned as [`ConversationEffect`]s
//! so the caller can fold them into the snapshot it persists.

use std::sync::Arc;

use serde_json::json;

use lead_assistant_config::ToolCallPolicy;
use lead_assistant_core::{FunctionCall, Lead, ToolCall};
use lead_assistant_persistence::{LeadStore, PersistenceReport};

use crate::arguments::{ArgumentValidator, ToolInvocation};
use crate::schemas::{
    lead_tools, ASSESS_PROJECT_REQUIREMENTS, COLLECT_CONTACT_INFO, SCHEDULE_CONSULTATION,
};
use crate::ToolArgumentError;

/// Counter of dispatched tool calls, labelled by tool and outcome
pub const TOOL_CALLS_METRIC: &str = "lead_assistant_tool_calls_total";

pub const CONTACT_FILLER: &str = "Thank you for sharing your contact details! Our team will be in touch shortly. Is there anything else you'd like to know about your project?";
pub const ASSESSMENT_FILLER: &str = "Thanks for the details about your project. Based on what you've shared, I'd recommend a consultation so we can give you an accurate estimate. Would you like to schedule one?";
pub const CONSULTATION_FILLER: &str = "I'd be happy to set up a consultation with our team. Could you share your preferred time and timezone, and we'll confirm the details with you?";
pub const GENERIC_FILLER: &str = "I'm processing your request. How else can I help you today?";

/// Filler shown when the model called a tool but produced no text
pub fn filler_for(tool: &str) -> &'static str {
    match tool {
        COLLECT_CONTACT_INFO => CONTACT_FILLER,
        ASSESS_PROJECT_REQUIREMENTS => ASSESSMENT_FILLER,
        SCHEDULE_CONSULTATION => CONSULTATION_FILLER,
        _ => GENERIC_FILLER,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    NoToolCall,
    ToolCallWithContent,
    ToolCallNoContent,
}

/// Change the caller must apply to the conversation snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationEffect {
    /// Lead status becomes `qualified`
    LeadQualified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallStatus {
    Handled,
    Skipped,
    InvalidArguments,
    Failed,
    UnknownTool,
}

impl CallStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::Skipped => "skipped",
            Self::InvalidArguments => "invalid_arguments",
            Self::Failed => "failed",
            Self::UnknownTool => "unknown_tool",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub state: DispatchState,
    /// Text for the assistant message
    pub content: String,
    /// One record per processed call, in call order
    pub function_calls: Vec<FunctionCall>,
    pub effects: Vec<ConversationEffect>,
    pub persistence: PersistenceReport,
}

impl DispatchOutcome {
    pub fn qualifies_lead(&self) -> bool {
        self.effects.contains(&ConversationEffect::LeadQualified)
    }
}

/// Result of handling one call
struct Handled {
    status: CallStatus,
    result: serde_json::Value,
    effect: Option<ConversationEffect>,
}

impl Handled {
    fn new(status: CallStatus, result: serde_json::Value) -> Self {
        Self {
            status,
            result,
            effect: None,
        }
    }
}

pub struct ToolDispatcher {
    leads: Arc<dyn LeadStore>,
    policy: ToolCallPolicy,
    validator: ArgumentValidator,
}

impl ToolDispatcher {
    pub fn new(leads: Arc<dyn LeadStore>, policy: ToolCallPolicy) -> Result<Self, ToolArgumentError> {
        Ok(Self {
            leads,
            policy,
            validator: ArgumentValidator::new(&lead_tools())?,
        })
    }

    pub fn policy(&self) -> ToolCallPolicy {
        self.policy
    }

    pub async fn dispatch(
        &self,
        content: &str,
        tool_calls: &[ToolCall],
        conversation_id: Option<&str>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome {
            state: DispatchState::NoToolCall,
            content: content.to_string(),
            function_calls: Vec::new(),
            effects: Vec::new(),
            persistence: PersistenceReport::new(),
        };

        let Some(first) = tool_calls.first() else {
            return outcome;
        };

        let selected = match self.policy {
            ToolCallPolicy::FirstOnly => {
                if tool_calls.len() > 1 {
                    let ignored: Vec<&str> = tool_calls[1..].iter().map(|c| c.name.as_str()).collect();
                    tracing::warn!(
                        processed = %first.name,
                        ignored = ?ignored,
                        "Model returned several tool calls, only the first is processed"
                    );
                }
                &tool_calls[..1]
            },
            ToolCallPolicy::All => tool_calls,
        };

        let mut first_status = None;
        for call in selected {
            let handled = self
                .handle(call, conversation_id, &mut outcome.persistence)
                .await;

            metrics::counter!(
                TOOL_CALLS_METRIC,
                "tool" => metric_tool_label(&call.name),
                "outcome" => handled.status.as_str()
            )
            .increment(1);

            first_status.get_or_insert(handled.status);
            if let Some(effect) = handled.effect {
                if !outcome.effects.contains(&effect) {
                    outcome.effects.push(effect);
                }
            }
            outcome.function_calls.push(FunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                result: Some(handled.result),
            });
        }

        if content.trim().is_empty() {
            outcome.state = DispatchState::ToolCallNoContent;
            outcome.content = match first_status {
                Some(CallStatus::InvalidArguments) | Some(CallStatus::UnknownTool) => {
                    GENERIC_FILLER.to_string()
                },
                _ => filler_for(&first.name).to_string(),
            };
        } else {
            outcome.state = DispatchState::ToolCallWithContent;
        }

        outcome
    }

    async fn handle(
        &self,
        call: &ToolCall,
        conversation_id: Option<&str>,
        report: &mut PersistenceReport,
    ) -> Handled {
        let invocation = match self.validator.parse(call) {
            Ok(invocation) => invocation,
            Err(ToolArgumentError::UnknownTool(name)) => {
                tracing::warn!(tool = %name, "Model called an unknown tool");
                return Handled::new(CallStatus::UnknownTool, json!({ "status": "unknown_tool" }));
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Rejected tool arguments");
                return Handled::new(
                    CallStatus::InvalidArguments,
                    json!({ "status": "invalid_arguments", "error": e.to_string() }),
                );
            },
        };

        match invocation {
            ToolInvocation::CollectContactInfo(args) => {
                let (Some(conversation_id), Some(_)) = (conversation_id, args.email()) else {
                    return Handled::new(
                        CallStatus::Skipped,
                        json!({ "status": "skipped", "reason": "no conversation or email" }),
                    );
                };

                let lead = Lead::new(conversation_id, args.to_contact_info());
                match self.leads.insert(&lead).await {
                    Ok(()) => {
                        tracing::info!(lead_id = %lead.id, conversation_id, "Lead captured");
                        Handled::new(
                            CallStatus::Handled,
                            json!({ "status": "handled", "leadId": lead.id }),
                        )
                    },
                    Err(e) => {
                        report.record("save_lead", conversation_id, &e);
                        Handled::new(
                            CallStatus::Failed,
                            json!({ "status": "failed", "error": "lead could not be saved" }),
                        )
                    },
                }
            },
            ToolInvocation::AssessProjectRequirements(assessment) => {
                if conversation_id.is_none() {
                    return Handled::new(
                        CallStatus::Skipped,
                        json!({ "status": "skipped", "reason": "no conversation" }),
                    );
                }
                tracing::info!(
                    project_type = ?assessment.project_type,
                    complexity = ?assessment.complexity_level,
                    "Project assessed, conversation qualified"
                );
                Handled {
                    status: CallStatus::Handled,
                    result: json!({ "status": "handled", "leadStatus": "qualified" }),
                    effect: Some(ConversationEffect::LeadQualified),
                }
            },
            ToolInvocation::ScheduleConsultation(request) => {
                tracing::info!(
                    consultation_type = ?request.consultation_type,
                    "Consultation requested"
                );
                Handled::new(CallStatus::Handled, json!({ "status": "handled" }))
            },
        }
    }
}

/// Bound label cardinality: model-invented tool names collapse to `unknown`
fn metric_tool_label(name: &str) -> &'static str {
    match name {
        COLLECT_CONTACT_INFO => COLLECT_CONTACT_INFO,
        ASSESS_PROJECT_REQUIREMENTS => ASSESS_PROJECT_REQUIREMENTS,
        SCHEDULE_CONSULTATION => SCHEDULE_CONSULTATION,
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_assistant_core::LeadRecordStatus;
    use lead_assistant_persistence::InMemoryLeadStore;

    fn dispatcher(policy: ToolCallPolicy) -> (ToolDispatcher, Arc<InMemoryLeadStore>) {
        let leads = Arc::new(InMemoryLeadStore::new());
        (ToolDispatcher::new(leads.clone(), policy).unwrap(), leads)
    }

    fn contact_call() -> ToolCall {
        ToolCall::new("call_0", COLLECT_CONTACT_INFO, r#"{"name":"Ada","email":"a@b.com"}"#)
    }

    #[tokio::test]
    async fn test_no_tool_call_returns_content_verbatim() {
        let (dispatcher, _) = dispatcher(ToolCallPolicy::FirstOnly);
        let outcome = dispatcher.dispatch("  Hello there ", &[], Some("c1")).await;
        assert_eq!(outcome.state, DispatchState::NoToolCall);
        assert_eq!(outcome.content, "  Hello there ");
        assert!(outcome.function_calls.is_empty());
    }

    #[tokio::test]
    async fn test_contact_capture_inserts_new_lead() {
        let (dispatcher, leads) = dispatcher(ToolCallPolicy::FirstOnly);
        let outcome = dispatcher.dispatch("", &[contact_call()], Some("c1")).await;

        assert_eq!(outcome.state, DispatchState::ToolCallNoContent);
        assert_eq!(outcome.content, CONTACT_FILLER);
        assert_eq!(outcome.function_calls.len(), 1);
        assert_eq!(outcome.function_calls[0].result.as_ref().unwrap()["status"], "handled");

        let stored = leads.list_for_conversation("c1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, LeadRecordStatus::New);
        assert_eq!(stored[0].contact_info.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_contact_capture_without_conversation_is_skipped() {
        let (dispatcher, leads) = dispatcher(ToolCallPolicy::FirstOnly);
        let outcome = dispatcher
            .dispatch("Thanks Ada!", &[contact_call()], None)
            .await;

        assert_eq!(outcome.state, DispatchState::ToolCallWithContent);
        assert_eq!(outcome.content, "Thanks Ada!");
        assert!(leads.is_empty());
    }

    #[tokio::test]
    async fn test_assessment_requests_qualification() {
        let (dispatcher, _) = dispatcher(ToolCallPolicy::FirstOnly);
        let call = ToolCall::new("call_0", ASSESS_PROJECT_REQUIREMENTS, r#"{"project_type":"ecommerce"}"#);

        let outcome = dispatcher.dispatch("", &[call.clone()], Some("c1")).await;
        assert!(outcome.qualifies_lead());
        assert_eq!(outcome.content, ASSESSMENT_FILLER);

        let outcome = dispatcher.dispatch("", &[call], None).await;
        assert!(!outcome.qualifies_lead());
    }

    #[tokio::test]
    async fn test_each_tool_has_its_own_filler() {
        let (dispatcher, _) = dispatcher(ToolCallPolicy::FirstOnly);
        let call = ToolCall::new("call_0", SCHEDULE_CONSULTATION, "{}");
        let outcome = dispatcher.dispatch("", &[call], Some("c1")).await;
        assert_eq!(outcome.content, CONSULTATION_FILLER);
        assert!(outcome.effects.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_use_generic_filler() {
        let (dispatcher, leads) = dispatcher(ToolCallPolicy::FirstOnly);
        let call = ToolCall::new("call_0", COLLECT_CONTACT_INFO, r#"{"name":"Ada"}"#);
        let outcome = dispatcher.dispatch("", &[call], Some("c1")).await;

        assert_eq!(outcome.content, GENERIC_FILLER);
        assert_eq!(
            outcome.function_calls[0].result.as_ref().unwrap()["status"],
            "invalid_arguments"
        );
        assert!(leads.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_uses_generic_filler() {
        let (dispatcher, _) = dispatcher(ToolCallPolicy::FirstOnly);
        let call = ToolCall::new("call_0", "send_invoice", "{}");
        let outcome = dispatcher.dispatch("", &[call], Some("c1")).await;
        assert_eq!(outcome.content, GENERIC_FILLER);
        assert_eq!(outcome.state, DispatchState::ToolCallNoContent);
    }

    #[tokio::test]
    async fn test_first_only_ignores_extra_calls() {
        let (dispatcher, leads) = dispatcher(ToolCallPolicy::FirstOnly);
        let calls = vec![
            ToolCall::new("call_0", ASSESS_PROJECT_REQUIREMENTS, r#"{"project_type":"website"}"#),
            contact_call(),
        ];
        let outcome = dispatcher.dispatch("", &calls, Some("c1")).await;

        assert_eq!(outcome.function_calls.len(), 1);
        assert_eq!(outcome.content, ASSESSMENT_FILLER);
        assert!(leads.is_empty());
    }

    #[tokio::test]
    async fn test_all_policy_processes_every_call() {
        let (dispatcher, leads) = dispatcher(ToolCallPolicy::All);
        let calls = vec![
            contact_call(),
            ToolCall::new("call_1", ASSESS_PROJECT_REQUIREMENTS, r#"{"project_type":"web_app"}"#),
        ];
        let outcome = dispatcher.dispatch("", &calls, Some("c1")).await;

        assert_eq!(outcome.function_calls.len(), 2);
        assert_eq!(outcome.content, CONTACT_FILLER);
        assert!(outcome.qualifies_lead());
        assert_eq!(leads.len(), 1);
    }
}
