//! System prompt composition
//!
//! Merges company facts, a personality clause, response-length and
//! lead-capture guidance, the pricing policy and retrieved knowledge into a
//! single system prompt. Composition is pure: no I/O, same input same output.

use lead_assistant_config::CompanyConfig;
use lead_assistant_core::{BotSettings, Personality, ResponseLength};

/// Placeholder in a custom system prompt that receives the built-in template
pub const BASE_PROMPT_PLACEHOLDER: &str = "{{BASE_PROMPT}}";

#[derive(Debug, Clone)]
pub struct PromptComposer {
    company: CompanyConfig,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(CompanyConfig::default())
    }
}

impl PromptComposer {
    pub fn new(company: CompanyConfig) -> Self {
        Self { company }
    }

    /// Final system prompt for one turn
    ///
    /// A custom system prompt replaces the template, with every
    /// `{{BASE_PROMPT}}` substituted by the built-in template.
    pub fn compose(&self, settings: &BotSettings, knowledge_context: &str) -> String {
        let base = self.base_prompt(settings, knowledge_context);

        match settings.custom_prompts.system_prompt.as_deref() {
            Some(custom) if !custom.trim().is_empty() => {
                custom.replace(BASE_PROMPT_PLACEHOLDER, &base)
            },
            _ => base,
        }
    }

    /// Built-in template
    pub fn base_prompt(&self, settings: &BotSettings, knowledge_context: &str) -> String {
        let services = self
            .company
            .services
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n");

        let knowledge = if knowledge_context.trim().is_empty() {
            "No specific knowledge base entries were retrieved for this question. \
             Answer from the company facts above and offer to connect the visitor with the team \
             for anything you are unsure about."
                .to_string()
        } else {
            knowledge_context.to_string()
        };

        format!(
            r#"You are the virtual assistant for {name}, answering visitors on the company website.

## Company
{name} offers:
{services}
Contact: {email}

## Personality
{personality}

## Response Style
{length}
Never invent facts about the company. If you do not know, say so and offer a consultation.

## Pricing Policy
- A basic website costs {basic_range}. You may quote this range.
- Every other service (web applications, e-commerce, real estate and automotive platforms, consulting) requires a consultation for an accurate estimate. Never quote a price for these.

## Lead Capture
{lead_capture}
- When the visitor shares their name and email, call collect_contact_info.
- When the visitor describes a project, call assess_project_requirements.
- When the visitor wants to talk to the team, call schedule_consultation.

## Knowledge Base
{knowledge}"#,
            name = self.company.name,
            services = services,
            email = self.company.contact_email,
            personality = personality_clause(settings.personality),
            length = response_length_clause(settings.response_length),
            basic_range = self.company.basic_website_price_range,
            lead_capture = lead_capture_clause(settings.auto_collect_contact),
            knowledge = knowledge,
        )
    }
}

fn personality_clause(personality: Personality) -> &'static str {
    match personality {
        Personality::Professional => {
            "Be professional, courteous and precise. Use clear business language."
        },
        Personality::Friendly => {
            "Be warm, upbeat and approachable. Make the visitor feel welcome."
        },
        Personality::Technical => {
            "Be technically detailed. Explain architecture, stack and trade-offs when relevant."
        },
        Personality::Casual => "Be relaxed and conversational, like chatting with a colleague.",
    }
}

fn response_length_clause(length: ResponseLength) -> &'static str {
    match length {
        ResponseLength::Short => "Keep answers to one or two sentences.",
        ResponseLength::Medium => "Keep answers to a short paragraph.",
        ResponseLength::Long => "Give thorough answers with examples where helpful.",
    }
}

fn lead_capture_clause(auto_collect: bool) -> &'static str {
    if auto_collect {
        "- Look for natural openings to learn the visitor's name, email and project needs, \
         without asking for them outright."
    } else {
        "- Do not ask for contact details. Only record them if the visitor volunteers them."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_assistant_core::CustomPrompts;

    #[test]
    fn test_default_prompt_carries_pricing_policy() {
        let composer = PromptComposer::default();
        let prompt = composer.compose(&BotSettings::default(), "");

        assert!(prompt.contains(&CompanyConfig::default().basic_website_price_range));
        assert!(prompt.contains("requires a consultation"));
        assert!(prompt.contains("No specific knowledge base entries"));
    }

    #[test]
    fn test_context_is_embedded_verbatim() {
        let composer = PromptComposer::default();
        let context = "Shopify builds take 6-10 weeks.\n\nWe host on AWS.";
        let prompt = composer.compose(&BotSettings::default(), context);
        assert!(prompt.ends_with(context));
    }

    #[test]
    fn test_personality_selects_clause() {
        let composer = PromptComposer::default();
        let settings = BotSettings {
            personality: Personality::Technical,
            ..Default::default()
        };
        let prompt = composer.compose(&settings, "");
        assert!(prompt.contains(personality_clause(Personality::Technical)));
        assert!(!prompt.contains(personality_clause(Personality::Professional)));
    }

    #[test]
    fn test_custom_prompt_replaces_placeholder() {
        let composer = PromptComposer::default();
        let base = composer.compose(&BotSettings::default(), "ctx");

        let settings = BotSettings {
            custom_prompts: CustomPrompts {
                system_prompt: Some("Always answer in French.\n{{BASE_PROMPT}}".to_string()),
            },
            ..Default::default()
        };
        let prompt = composer.compose(&settings, "ctx");

        assert_eq!(prompt, format!("Always answer in French.\n{}", base));
    }

    #[test]
    fn test_custom_prompt_without_placeholder_is_final() {
        let composer = PromptComposer::default();
        let settings = BotSettings {
            custom_prompts: CustomPrompts {
                system_prompt: Some("You only talk about pricing.".to_string()),
            },
            ..Default::default()
        };
        assert_eq!(composer.compose(&settings, "ctx"), "You only talk about pricing.");
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = PromptComposer::default();
        let settings = BotSettings::default();
        assert_eq!(composer.compose(&settings, "x"), composer.compose(&settings, "x"));
    }

    #[test]
    fn test_auto_collect_toggle() {
        let composer = PromptComposer::default();
        let off = BotSettings {
            auto_collect_contact: false,
            ..Default::default()
        };
        assert!(composer.compose(&off, "").contains("Do not ask for contact details"));
        assert!(!composer.compose(&BotSettings::default(), "").contains("Do not ask for contact details"));
    }
}
