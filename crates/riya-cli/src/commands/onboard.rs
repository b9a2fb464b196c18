use anyhow::Result;
use colored::Colorize;
use riya_application::PersonaPromptService;
use riya_core::persona::{OnboardingStep, OnboardingWizard};
use riya_infrastructure::TomlPersonaStore;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::settings::Settings;

/// Walks through the questionnaire and saves the answers to persona.toml.
pub fn run(settings: &Settings) -> Result<()> {
    let store = TomlPersonaStore::from_paths(&settings.paths)?;
    let prompts = PersonaPromptService::with_template(settings.config.persona.template.clone())?;
    let mut rl = DefaultEditor::new()?;
    let mut wizard = OnboardingWizard::new();

    println!("{}", "=== Riya onboarding ===".bright_magenta().bold());
    println!("{}", "Type 'back' to change the previous answer, Ctrl-D to cancel.".bright_black());
    println!();

    while !wizard.is_complete() {
        let step = wizard.step();
        println!("{}", step.question().bright_yellow());
        let options = step.options();
        if !options.is_empty() {
            println!("  {}", options.join(" / ").bright_black());
        }

        let line = match rl.readline("?> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("{}", "Onboarding cancelled, nothing saved.".yellow());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        if line.trim() == "back" {
            if step != OnboardingStep::Name {
                wizard.back();
            }
            continue;
        }
        if let Err(err) = wizard.answer(&line) {
            println!("{}", err.to_string().red());
        }
    }

    let answers = wizard.finish()?;
    store.save(&answers)?;

    println!();
    println!(
        "{}",
        format!("{} is ready. Run `riya chat` to say hi!", answers.companion_name).bright_green()
    );
    tracing::debug!("[Onboard] System prompt:\n{}", prompts.render(&answers)?);
    Ok(())
}
