//! Tool schemas offered to the model
//!
//! Argument names and enum values are part of the public contract: stored
//! function calls and lead rows depend on them.

use lead_assistant_core::ToolDefinition;

pub const COLLECT_CONTACT_INFO: &str = "collect_contact_info";
pub const ASSESS_PROJECT_REQUIREMENTS: &str = "assess_project_requirements";
pub const SCHEDULE_CONSULTATION: &str = "schedule_consultation";

pub const PROJECT_TYPES: [&str; 6] = [
    "website",
    "web_app",
    "ecommerce",
    "real_estate",
    "automotive",
    "consulting",
];
pub const COMPLEXITY_LEVELS: [&str; 4] = ["simple", "moderate", "complex", "enterprise"];
pub const CONSULTATION_TYPES: [&str; 4] = [
    "project_discussion",
    "technical_consultation",
    "pricing_discussion",
    "general_inquiry",
];

/// Builder for function-calling tool definitions
///
/// ```ignore
/// let tool = ToolBuilder::new("schedule_consultation", "Book a call with the team")
///     .param("timezone", "string", "Visitor's timezone", false)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ToolBuilder {
    name: String,
    description: String,
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// Add a parameter with type and description
    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": param_type,
                "description": description.into(),
            }),
        );

        if required {
            self.required.push(name);
        }
        self
    }

    /// Add an array parameter whose items share one type
    pub fn array_param(
        mut self,
        name: impl Into<String>,
        item_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": "array",
                "items": { "type": item_type },
                "description": description.into(),
            }),
        );

        if required {
            self.required.push(name);
        }
        self
    }

    /// Add enum constraint to an existing string parameter
    pub fn string_enum(mut self, name: &str, values: &[&str]) -> Self {
        if let Some(obj) = self.properties.get_mut(name).and_then(|p| p.as_object_mut()) {
            obj.insert("enum".to_string(), serde_json::json!(values));
        }
        self
    }

    pub fn build(self) -> ToolDefinition {
        let parameters = serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        });

        ToolDefinition::new(self.name, self.description, parameters)
    }
}

/// The three lead-capture tools, in the order they are offered
pub fn lead_tools() -> Vec<ToolDefinition> {
    vec![
        ToolBuilder::new(
            COLLECT_CONTACT_INFO,
            "Record the visitor's contact details once they have shared their name and email",
        )
        .param("name", "string", "Visitor's full name", true)
        .param("email", "string", "Visitor's email address", true)
        .param("phone", "string", "Phone number, if given", false)
        .param("company", "string", "Company or organization name", false)
        .param("message", "string", "Anything else the visitor asked us to pass on", false)
        .build(),
        ToolBuilder::new(
            ASSESS_PROJECT_REQUIREMENTS,
            "Capture the scope of the visitor's project once they have described it",
        )
        .param("project_type", "string", "Kind of project", true)
        .string_enum("project_type", &PROJECT_TYPES)
        .param("budget_indication", "string", "Budget range the visitor mentioned", false)
        .param("timeline", "string", "Desired delivery timeline", false)
        .array_param("key_features", "string", "Features the visitor asked for", false)
        .param("complexity_level", "string", "Estimated complexity", false)
        .string_enum("complexity_level", &COMPLEXITY_LEVELS)
        .build(),
        ToolBuilder::new(
            SCHEDULE_CONSULTATION,
            "Offer a consultation with the team when the visitor wants to talk to a person",
        )
        .param("preferred_timeframe", "string", "When the visitor would like to meet", false)
        .param("timezone", "string", "Visitor's timezone", false)
        .param("consultation_type", "string", "Topic of the consultation", false)
        .string_enum("consultation_type", &CONSULTATION_TYPES)
        .param("preparation_notes", "string", "Notes for the team ahead of the call", false)
        .build(),
    ]
}
