//! Assistant behaviour settings
//!
//! Effective settings are layered: built-in defaults, then the persisted
//! settings row, then per-request overrides. The later layer wins field by
//! field.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sampling temperatures accepted by chat-completion providers
pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;

/// Reply token budgets accepted per turn
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 1..=16_384;

/// Tone of the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Professional,
    Friendly,
    Technical,
    Casual,
}

/// Preferred reply length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Operator-supplied prompt overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomPrompts {
    /// Full system prompt; `{{BASE_PROMPT}}` is replaced with the built-in template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotSettings {
    pub personality: Personality,
    pub response_length: ResponseLength,
    pub temperature: f32,
    pub max_tokens: u32,
    pub auto_collect_contact: bool,
    pub knowledge_base_version: String,
    pub custom_prompts: CustomPrompts,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            personality: Personality::Professional,
            response_length: ResponseLength::Medium,
            temperature: 0.7,
            max_tokens: 500,
            auto_collect_contact: true,
            knowledge_base_version: "1.0".to_string(),
            custom_prompts: CustomPrompts::default(),
        }
    }
}

impl BotSettings {
    /// Overlay a partial layer; fields present in `patch` win
    pub fn apply(mut self, patch: &BotSettingsPatch) -> Self {
        if let Some(personality) = patch.personality {
            self.personality = personality;
        }
        if let Some(length) = patch.response_length {
            self.response_length = length;
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = patch.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(auto_collect) = patch.auto_collect_contact {
            self.auto_collect_contact = auto_collect;
        }
        if let Some(version) = &patch.knowledge_base_version {
            self.knowledge_base_version = version.clone();
        }
        if let Some(prompts) = &patch.custom_prompts {
            if prompts.system_prompt.is_some() {
                self.custom_prompts.system_prompt = prompts.system_prompt.clone();
            }
        }
        self
    }

    /// defaults <- stored <- request
    pub fn effective(stored: Option<&BotSettingsPatch>, request: Option<&BotSettingsPatch>) -> Self {
        let mut settings = Self::default();
        if let Some(stored) = stored {
            settings = settings.apply(stored);
        }
        if let Some(request) = request {
            settings = settings.apply(request);
        }
        settings
    }
}

/// Partial settings, as stored or sent with a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BotSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<Personality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_length: Option<ResponseLength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_collect_contact: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompts: Option<CustomPrompts>,
}

impl BotSettingsPatch {
    /// Reject values a provider would refuse
    pub fn validate(&self) -> Result<()> {
        if let Some(temperature) = self.temperature {
            if !TEMPERATURE_RANGE.contains(&temperature) {
                return Err(Error::invalid_input(format!(
                    "settings.temperature must be between {} and {}, got {}",
                    TEMPERATURE_RANGE.start(),
                    TEMPERATURE_RANGE.end(),
                    temperature
                )));
            }
        }
        if let Some(max_tokens) = self.max_tokens {
            if !MAX_TOKENS_RANGE.contains(&max_tokens) {
                return Err(Error::invalid_input(format!(
                    "settings.maxTokens must be between {} and {}, got {}",
                    MAX_TOKENS_RANGE.start(),
                    MAX_TOKENS_RANGE.end(),
                    max_tokens
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = BotSettings::default();
        assert_eq!(settings.personality, Personality::Professional);
        assert_eq!(settings.response_length, ResponseLength::Medium);
        assert_eq!(settings.max_tokens, 500);
        assert!(settings.auto_collect_contact);
        assert!(settings.custom_prompts.system_prompt.is_none());
    }

    #[test]
    fn test_request_overrides_win() {
        let stored = BotSettingsPatch {
            personality: Some(Personality::Casual),
            temperature: Some(0.2),
            max_tokens: Some(800),
            ..Default::default()
        };
        let request: BotSettingsPatch =
            serde_json::from_str(r#"{"personality":"technical","responseLength":"short"}"#)
                .unwrap();

        let settings = BotSettings::effective(Some(&stored), Some(&request));

        assert_eq!(settings.personality, Personality::Technical);
        assert_eq!(settings.response_length, ResponseLength::Short);
        assert_eq!(settings.temperature, 0.2);
        assert_eq!(settings.max_tokens, 800);
        assert!(settings.auto_collect_contact);
    }

    #[test]
    fn test_empty_custom_prompts_do_not_clear_stored_prompt() {
        let stored = BotSettingsPatch {
            custom_prompts: Some(CustomPrompts {
                system_prompt: Some("Be brief. {{BASE_PROMPT}}".to_string()),
            }),
            ..Default::default()
        };
        let request = BotSettingsPatch {
            custom_prompts: Some(CustomPrompts::default()),
            ..Default::default()
        };
        let settings = BotSettings::effective(Some(&stored), Some(&request));
        assert_eq!(
            settings.custom_prompts.system_prompt.as_deref(),
            Some("Be brief. {{BASE_PROMPT}}")
        );
    }

    #[test]
    fn test_unknown_personality_rejected() {
        let parsed: std::result::Result<BotSettingsPatch, _> = serde_json::from_str(r#"{"personality":"grumpy"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_out_of_range_overrides_rejected() {
        let hot = BotSettingsPatch {
            temperature: Some(9.0),
            ..Default::default()
        };
        let empty_budget = BotSettingsPatch {
            max_tokens: Some(0),
            ..Default::default()
        };
        let nan = BotSettingsPatch {
            temperature: Some(f32::NAN),
            ..Default::default()
        };
        assert!(matches!(hot.validate(), Err(Error::InvalidInput(_))));
        assert!(empty_budget.validate().is_err());
        assert!(nan.validate().is_err());

        let edge = BotSettingsPatch {
            temperature: Some(2.0),
            max_tokens: Some(1),
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
        assert!(BotSettingsPatch::default().validate().is_ok());
    }
}
