//! Onboarding questionnaire and persona model.
//!
//! New users walk through a short multi-step questionnaire. The answers are
//! turned into the companion's system prompt by the application layer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{Result, RiyaError};

/// Companion name used when the user skips naming it.
pub const DEFAULT_COMPANION_NAME: &str = "Riya";

const MAX_NAME_CHARS: usize = 40;
const MAX_TRAITS: usize = 5;
const MAX_INTERESTS: usize = 8;

/// What the companion is to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Relationship {
    BestFriend,
    Partner,
    Mentor,
    Sibling,
}

/// Language register the companion replies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LanguageStyle {
    Hinglish,
    English,
    Hindi,
}

/// Completed questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingAnswers {
    pub user_name: String,
    pub companion_name: String,
    pub relationship: Relationship,
    pub personality: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub language: LanguageStyle,
}

/// Position in the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnboardingStep {
    Name,
    CompanionName,
    Relationship,
    Personality,
    Interests,
    LanguageStyle,
    Complete,
}

impl OnboardingStep {
    fn next(self) -> Self {
        match self {
            Self::Name => Self::CompanionName,
            Self::CompanionName => Self::Relationship,
            Self::Relationship => Self::Personality,
            Self::Personality => Self::Interests,
            Self::Interests => Self::LanguageStyle,
            Self::LanguageStyle | Self::Complete => Self::Complete,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Name | Self::CompanionName => Self::Name,
            Self::Relationship => Self::CompanionName,
            Self::Personality => Self::Relationship,
            Self::Interests => Self::Personality,
            Self::LanguageStyle => Self::Interests,
            Self::Complete => Self::LanguageStyle,
        }
    }

    /// Question shown for this step.
    pub fn question(self) -> &'static str {
        match self {
            Self::Name => "What should I call you?",
            Self::CompanionName => "What do you want to name your companion? (blank for Riya)",
            Self::Relationship => "Who should they be to you?",
            Self::Personality => "Pick up to 5 personality traits, comma separated",
            Self::Interests => "What are you into? (comma separated, optional)",
            Self::LanguageStyle => "Which language should they talk in?",
            Self::Complete => "All done!",
        }
    }

    /// Allowed answers for choice steps, empty for free-text steps.
    pub fn options(self) -> Vec<String> {
        match self {
            Self::Relationship => Relationship::iter().map(|r| r.to_string()).collect(),
            Self::LanguageStyle => LanguageStyle::iter().map(|l| l.to_string()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Multi-step questionnaire state machine.
///
/// Answers are validated as they come in. Going back keeps what was already
/// answered, so a re-answered step simply overwrites its slot.
#[derive(Debug, Clone)]
pub struct OnboardingWizard {
    step: OnboardingStep,
    user_name: Option<String>,
    companion_name: Option<String>,
    relationship: Option<Relationship>,
    personality: Vec<String>,
    interests: Vec<String>,
    language: Option<LanguageStyle>,
}

impl Default for OnboardingWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingWizard {
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::Name,
            user_name: None,
            companion_name: None,
            relationship: None,
            personality: Vec::new(),
            interests: Vec::new(),
            language: None,
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step == OnboardingStep::Complete
    }

    /// Validates `input` for the current step and advances.
    ///
    /// # Returns
    ///
    /// - `Ok(step)`: The step now waiting for an answer
    /// - `Err(RiyaError::InvalidInput)`: The answer was rejected; the step is unchanged
    pub fn answer(&mut self, input: &str) -> Result<OnboardingStep> {
        let input = input.trim();
        match self.step {
            OnboardingStep::Name => {
                self.user_name = Some(validate_name(input, "name")?);
            }
            OnboardingStep::CompanionName => {
                let name = if input.is_empty() {
                    DEFAULT_COMPANION_NAME.to_string()
                } else {
                    validate_name(input, "companion name")?
                };
                self.companion_name = Some(name);
            }
            OnboardingStep::Relationship => {
                let relationship = Relationship::from_str(&input.replace([' ', '-'], "_"))
                    .map_err(|_| RiyaError::invalid_input(format!("unknown relationship '{input}'")))?;
                self.relationship = Some(relationship);
            }
            OnboardingStep::Personality => {
                let traits = split_list(input);
                if traits.is_empty() || traits.len() > MAX_TRAITS {
                    return Err(RiyaError::invalid_input(format!(
                        "pick between 1 and {MAX_TRAITS} traits"
                    )));
                }
                self.personality = traits;
            }
            OnboardingStep::Interests => {
                let interests = split_list(input);
                if interests.len() > MAX_INTERESTS {
                    return Err(RiyaError::invalid_input(format!(
                        "at most {MAX_INTERESTS} interests"
                    )));
                }
                self.interests = interests;
            }
            OnboardingStep::LanguageStyle => {
                let language = LanguageStyle::from_str(input)
                    .map_err(|_| RiyaError::invalid_input(format!("unknown language '{input}'")))?;
                self.language = Some(language);
            }
            OnboardingStep::Complete => {
                return Err(RiyaError::invalid_input("questionnaire already complete"));
            }
        }
        self.step = self.step.next();
        Ok(self.step)
    }

    /// Returns to the previous step.
    pub fn back(&mut self) -> OnboardingStep {
        self.step = self.step.previous();
        self.step
    }

    /// Consumes the wizard and returns the answers.
    pub fn finish(self) -> Result<OnboardingAnswers> {
        let incomplete = || RiyaError::invalid_input("questionnaire is not complete");
        if !self.is_complete() {
            return Err(incomplete());
        }
        Ok(OnboardingAnswers {
            user_name: self.user_name.ok_or_else(incomplete)?,
            companion_name: self.companion_name.ok_or_else(incomplete)?,
            relationship: self.relationship.ok_or_else(incomplete)?,
            personality: self.personality,
            interests: self.interests,
            language: self.language.ok_or_else(incomplete)?,
        })
    }
}

fn validate_name(input: &str, what: &str) -> Result<String> {
    if input.is_empty() {
        return Err(RiyaError::invalid_input(format!("{what} cannot be empty")));
    }
    if input.chars().count() > MAX_NAME_CHARS {
        return Err(RiyaError::invalid_input(format!(
            "{what} must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(input.to_string())
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
