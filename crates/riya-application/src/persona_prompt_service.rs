//! PersonaPromptService - turns onboarding answers into the system prompt.

use minijinja::{Environment, context};
use riya_core::persona::{LanguageStyle, OnboardingAnswers, Relationship};
use riya_core::{Result, RiyaError};

const DEFAULT_TEMPLATE: &str = r#"You are {{ companion_name }}, {{ user_name }}'s {{ relationship }}.
{%- if personality %}
Your personality: {{ personality | join(", ") }}.
{%- endif %}
{%- if interests %}
{{ user_name }} is into {{ interests | join(", ") }}; bring these up naturally.
{%- endif %}
{{ language_rule }}
Keep replies short and casual, like texting a close friend. Split longer thoughts into several short messages.
Never say you are an AI model unless {{ user_name }} asks directly."#;

/// Renders the persona system prompt with minijinja.
///
/// The template receives `user_name`, `companion_name`, `relationship`,
/// `personality`, `interests`, `language` and `language_rule`.
#[derive(Debug)]
pub struct PersonaPromptService {
    env: Environment<'static>,
    template: String,
}

impl PersonaPromptService {
    /// Uses the built-in template.
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Uses `template` if given (the `[persona] template` setting), the
    /// built-in one otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the template does not parse.
    pub fn with_template(template: Option<String>) -> Result<Self> {
        let service = match template {
            Some(template) => Self {
                env: Environment::new(),
                template,
            },
            None => Self::new(),
        };
        service
            .env
            .template_from_str(&service.template)
            .map_err(|err| RiyaError::config(format!("Invalid persona template: {err}")))?;
        Ok(service)
    }

    /// Renders the system prompt for `answers`.
    pub fn render(&self, answers: &OnboardingAnswers) -> Result<String> {
        let rendered = self
            .env
            .render_str(
                &self.template,
                context! {
                    user_name => &answers.user_name,
                    companion_name => &answers.companion_name,
                    relationship => relationship_label(answers.relationship),
                    personality => &answers.personality,
                    interests => &answers.interests,
                    language => answers.language.to_string(),
                    language_rule => language_rule(answers.language),
                },
            )
            .map_err(|err| RiyaError::internal(format!("Failed to render persona prompt: {err}")))?;
        Ok(rendered.trim().to_string())
    }
}

impl Default for PersonaPromptService {
    fn default() -> Self {
        Self::new()
    }
}

fn relationship_label(relationship: Relationship) -> &'static str {
    match relationship {
        Relationship::BestFriend => "best friend",
        Relationship::Partner => "partner",
        Relationship::Mentor => "mentor",
        Relationship::Sibling => "sibling",
    }
}

fn language_rule(language: LanguageStyle) -> &'static str {
    match language {
        LanguageStyle::Hinglish => {
            "Reply in Hinglish: Hindi written in Roman script, mixed freely with English."
        }
        LanguageStyle::English => "Reply in simple, friendly English.",
        LanguageStyle::Hindi => "Reply in Hindi (Devanagari script).",
    }
}
