//! Typed tool arguments
//!
//! Raw argument strings from the model are parsed as JSON, validated against
//! the tool's declared schema and then decoded into a [`ToolInvocation`].

use std::collections::HashMap;

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lead_assistant_core::{ContactInfo, ToolCall, ToolDefinition};

use crate::schemas::{ASSESS_PROJECT_REQUIREMENTS, COLLECT_CONTACT_INFO, SCHEDULE_CONSULTATION};
use crate::ToolArgumentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactArgs {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ContactArgs {
    /// Email with surrounding whitespace removed, `None` when blank
    pub fn email(&self) -> Option<&str> {
        let email = self.email.trim();
        (!email.is_empty()).then_some(email)
    }

    pub fn to_contact_info(&self) -> ContactInfo {
        ContactInfo {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Website,
    WebApp,
    Ecommerce,
    RealEstate,
    Automotive,
    Consulting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    Enterprise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAssessment {
    pub project_type: ProjectType,
    #[serde(default)]
    pub budget_indication: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub complexity_level: Option<ComplexityLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    ProjectDiscussion,
    TechnicalConsultation,
    PricingDiscussion,
    GeneralInquiry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationRequest {
    #[serde(default)]
    pub preferred_timeframe: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub consultation_type: Option<ConsultationType>,
    #[serde(default)]
    pub preparation_notes: Option<String>,
}

/// A validated tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    CollectContactInfo(ContactArgs),
    AssessProjectRequirements(ProjectAssessment),
    ScheduleConsultation(ConsultationRequest),
}

impl ToolInvocation {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::CollectContactInfo(_) => COLLECT_CONTACT_INFO,
            Self::AssessProjectRequirements(_) => ASSESS_PROJECT_REQUIREMENTS,
            Self::ScheduleConsultation(_) => SCHEDULE_CONSULTATION,
        }
    }
}

/// Compiled argument schemas, one per known tool
pub struct ArgumentValidator {
    schemas: HashMap<String, JSONSchema>,
}

impl ArgumentValidator {
    pub fn new(tools: &[ToolDefinition]) -> Result<Self, ToolArgumentError> {
        let mut schemas = HashMap::with_capacity(tools.len());
        for tool in tools {
            let compiled = JSONSchema::compile(&tool.parameters).map_err(|e| {
                ToolArgumentError::InvalidSchema {
                    tool: tool.name.clone(),
                    message: e.to_string(),
                }
            })?;
            schemas.insert(tool.name.clone(), compiled);
        }
        Ok(Self { schemas })
    }

    pub fn knows(&self, tool: &str) -> bool {
        self.schemas.contains_key(tool)
    }

    /// Parse and validate one tool call
    ///
    /// Blank arguments count as `{}`. Keys set to `null` count as absent.
    pub fn parse(&self, call: &ToolCall) -> Result<ToolInvocation, ToolArgumentError> {
        let schema = self
            .schemas
            .get(&call.name)
            .ok_or_else(|| ToolArgumentError::UnknownTool(call.name.clone()))?;

        let raw = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };
        let mut arguments: Value =
            serde_json::from_str(raw).map_err(|e| ToolArgumentError::Malformed {
                tool: call.name.clone(),
                message: e.to_string(),
            })?;
        if let Value::Object(map) = &mut arguments {
            map.retain(|_, v| !v.is_null());
        }

        if let Err(errors) = schema.validate(&arguments) {
            let errors: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(ToolArgumentError::SchemaViolation {
                tool: call.name.clone(),
                errors,
            });
        }

        let decode_error = |e: serde_json::Error| ToolArgumentError::Malformed {
            tool: call.name.clone(),
            message: e.to_string(),
        };

        match call.name.as_str() {
            COLLECT_CONTACT_INFO => serde_json::from_value(arguments)
                .map(ToolInvocation::CollectContactInfo)
                .map_err(decode_error),
            ASSESS_PROJECT_REQUIREMENTS => serde_json::from_value(arguments)
                .map(ToolInvocation::AssessProjectRequirements)
                .map_err(decode_error),
            SCHEDULE_CONSULTATION => serde_json::from_value(arguments)
                .map(ToolInvocation::ScheduleConsultation)
                .map_err(decode_error),
            other => Err(ToolArgumentError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::lead_tools;

    fn validator() -> ArgumentValidator {
        ArgumentValidator::new(&lead_tools()).unwrap()
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall::new("call_0", name, arguments)
    }

    #[test]
    fn test_contact_info_parses() {
        let invocation = validator()
            .parse(&call(
                COLLECT_CONTACT_INFO,
                r#"{"name":"Ada","email":" a@b.com ","company":"Acme","phone":null}"#,
            ))
            .unwrap();

        match invocation {
            ToolInvocation::CollectContactInfo(args) => {
                assert_eq!(args.email(), Some("a@b.com"));
                assert_eq!(args.company.as_deref(), Some("Acme"));
                assert!(args.phone.is_none());
                assert_eq!(args.to_contact_info().email, "a@b.com");
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_email_is_schema_violation() {
        let err = validator()
            .parse(&call(COLLECT_CONTACT_INFO, r#"{"name":"Ada"}"#))
            .unwrap_err();
        assert!(matches!(err, ToolArgumentError::SchemaViolation { .. }));
    }

    #[test]
    fn test_bad_enum_is_schema_violation() {
        let err = validator()
            .parse(&call(ASSESS_PROJECT_REQUIREMENTS, r#"{"project_type":"spaceship"}"#))
            .unwrap_err();
        assert!(matches!(err, ToolArgumentError::SchemaViolation { ref tool, .. } if tool == ASSESS_PROJECT_REQUIREMENTS));
    }

    #[test]
    fn test_assessment_parses() {
        let invocation = validator()
            .parse(&call(
                ASSESS_PROJECT_REQUIREMENTS,
                r#"{"project_type":"real_estate","key_features":["listings","maps"],"complexity_level":"complex"}"#,
            ))
            .unwrap();
        assert_eq!(
            invocation,
            ToolInvocation::AssessProjectRequirements(ProjectAssessment {
                project_type: ProjectType::RealEstate,
                budget_indication: None,
                timeline: None,
                key_features: vec!["listings".to_string(), "maps".to_string()],
                complexity_level: Some(ComplexityLevel::Complex),
            })
        );
    }

    #[test]
    fn test_blank_arguments_for_optional_only_tool() {
        let invocation = validator().parse(&call(SCHEDULE_CONSULTATION, "  ")).unwrap();
        assert_eq!(
            invocation,
            ToolInvocation::ScheduleConsultation(ConsultationRequest::default())
        );
        assert_eq!(invocation.tool_name(), SCHEDULE_CONSULTATION);
    }

    #[test]
    fn test_malformed_json() {
        let err = validator()
            .parse(&call(COLLECT_CONTACT_INFO, r#"{"name":"Ada","#))
            .unwrap_err();
        assert!(matches!(err, ToolArgumentError::Malformed { .. }));
    }

    #[test]
    fn test_unknown_tool() {
        let v = validator();
        assert!(!v.knows("send_invoice"));
        let err = v.parse(&call("send_invoice", "{}")).unwrap_err();
        assert!(matches!(err, ToolArgumentError::UnknownTool(name) if name == "send_invoice"));
    }
}
