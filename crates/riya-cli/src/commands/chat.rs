use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use riya_application::{ChatDependencies, ChatEvent, ChatServiceFactory, GuestChatService, PersonaPromptService};
use riya_core::gate::{GateState, LoginPrompt, PromptReason};
use riya_core::message::{ChatMessage, MessageRole};
use riya_core::persona::DEFAULT_COMPANION_NAME;
use riya_core::scheduler::TokioScheduler;
use riya_core::session::SessionContext;
use riya_infrastructure::{Stores, TomlPersonaStore};
use riya_interaction::HttpCompletionClient;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc;

use crate::settings::Settings;

const COMMANDS: [&str; 6] = ["/login", "/feature", "/dismiss", "/flush", "/status", "/quit"];

pub struct ChatArgs {
    pub session: Option<String>,
    pub new: bool,
    pub user: Option<String>,
}

/// Rustyline helper completing and highlighting slash commands.
#[derive(Clone)]
struct ChatHelper {
    commands: Vec<String>,
}

impl ChatHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for ChatHelper {}

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Message(String),
    QuickReply(usize),
    Login(String),
    Feature(String),
    Dismiss,
    Flush,
    Status,
    Quit,
    Usage(&'static str),
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Input::Quit;
    }
    if let Ok(choice) = line.parse::<usize>() {
        if (1..=9).contains(&choice) {
            return Input::QuickReply(choice);
        }
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "login" if arg.is_empty() => Input::Usage("/login <user-id>"),
        "login" => Input::Login(arg.to_string()),
        "feature" if arg.is_empty() => Input::Usage("/feature <name>"),
        "feature" => Input::Feature(arg.to_string()),
        "dismiss" => Input::Dismiss,
        "flush" => Input::Flush,
        "status" => Input::Status,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

/// Opens the session and runs the REPL until the user quits.
pub async fn run(settings: &Settings, args: ChatArgs) -> Result<()> {
    let config = &settings.config;
    let stores = Stores::from_config(&config.storage)?;
    let client = HttpCompletionClient::from_config(&config.completion, config.chat.completion_timeout())?;

    let persona = TomlPersonaStore::from_paths(&settings.paths)?.load()?;
    let prompts = PersonaPromptService::with_template(config.persona.template.clone())?;
    let system_prompt = persona.as_ref().map(|a| prompts.render(a)).transpose()?;
    let companion = persona
        .map(|a| a.companion_name)
        .unwrap_or_else(|| DEFAULT_COMPANION_NAME.to_string());

    let session_id = match (args.session, args.new) {
        (Some(id), _) => id,
        (None, true) => SessionContext::new_guest().session_id,
        (None, false) => match settings.last_session()? {
            Some(id) => id,
            None => SessionContext::new_guest().session_id,
        },
    };
    let context = match args.user {
        Some(user_id) => SessionContext::user(&session_id, user_id),
        None => SessionContext::guest(&session_id),
    };
    if !config.storage.ephemeral {
        settings.remember_session(&session_id)?;
    }

    let factory = ChatServiceFactory::new(
        config.chat.clone(),
        ChatDependencies {
            completion: Arc::new(client),
            conversations: stores.conversations,
            guest_records: stores.guest_records,
            scheduler: Arc::new(TokioScheduler),
        },
    )
    .with_system_prompt(system_prompt);
    let (service, events) = factory.open(context).await?;
    tracing::info!("[Bootstrap] Chat session {} ready", session_id);

    let printer = tokio::spawn(print_events(events, companion.clone()));

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ChatHelper::new()));

    println!("{}", format!("=== Chat with {} ===", companion).bright_magenta().bold());
    println!(
        "{}",
        "Type a message, a number to pick a quick reply, /status, or 'quit' to exit.".bright_black()
    );
    println!();

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        match parse_input(&line) {
            Input::Quit => break,
            Input::Message(text) => send(&service, &text).await,
            Input::QuickReply(choice) => {
                let replies = service.quick_replies().await;
                match replies.get(choice - 1) {
                    Some(reply) => send(&service, reply).await,
                    None => send(&service, &choice.to_string()).await,
                }
            }
            Input::Login(user_id) => {
                if let Err(err) = service.mark_converted(&user_id).await {
                    eprintln!("{}", format!("Sign-in failed: {}", err).red());
                }
            }
            Input::Feature(feature) => {
                service.raise_locked_feature(&feature).await;
            }
            Input::Dismiss => {
                if !service.dismiss_prompt().await {
                    println!("{}", "Nothing to dismiss.".bright_black());
                }
            }
            Input::Flush => {
                if let Err(err) = service.flush().await {
                    tracing::debug!("[Chat] Manual flush failed: {}", err);
                }
            }
            Input::Status => print_status(&service).await,
            Input::Usage(usage) => println!("{}", format!("Usage: {}", usage).yellow()),
            Input::Unknown(command) => {
                println!("{}", format!("Unknown command /{}", command).bright_black())
            }
        }
    }

    finish_pending(&service, config.chat.completion_timeout() + Duration::from_secs(10)).await;
    if let Err(err) = service.sync_message_count().await {
        tracing::warn!("[Chat] Message count still unsaved at exit: {}", err);
    }
    drop(service);
    let _ = tokio::time::timeout(Duration::from_millis(200), printer).await;
    println!("{}", "Bye! Phir milte hain 👋".bright_green());
    Ok(())
}

async fn send(service: &Arc<GuestChatService>, text: &str) {
    match service.send(text).await {
        Ok(_) => {}
        // The prompt event already explains what happened
        Err(err) if err.is_limit_reached() => {}
        Err(err) => eprintln!("{}", err.to_string().red()),
    }
}

/// Flushes whatever is still queued before the process exits.
async fn finish_pending(service: &Arc<GuestChatService>, limit: Duration) {
    if service.pending_len().await == 0 && !service.is_flush_in_flight().await {
        return;
    }
    println!("{}", "Sending your last messages...".bright_black());
    let wait = async {
        loop {
            if service.pending_len().await > 0 {
                let _ = service.flush().await;
            }
            if service.pending_len().await == 0 && !service.is_flush_in_flight().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    };
    if tokio::time::timeout(limit, wait).await.is_err() {
        tracing::warn!("[Chat] Gave up waiting for the last flush");
    }
}

async fn print_status(service: &GuestChatService) {
    let context = service.context().await;
    println!("{}", format!("session  {}", context.session_id).bright_black());
    if let Some(user_id) = &context.user_id {
        println!("{}", format!("user     {}", user_id).bright_black());
    }
    let gate = match service.gate_state().await {
        GateState::Active { count } => format!("guest, {} sent", count),
        GateState::Blocked { count } => format!("guest, blocked after {}", count),
        GateState::Unlocked { count } => format!("signed in, {} sent", count),
    };
    println!("{}", format!("gate     {}", gate).bright_black());
    if let Some(remaining) = service.remaining().await {
        println!("{}", format!("left     {}", remaining).bright_black());
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<ChatEvent>, companion: String) {
    while let Some(event) = events.recv().await {
        match event {
            ChatEvent::SessionOpened {
                messages,
                quick_replies,
                ..
            } => {
                for message in &messages {
                    print_message(message, &companion);
                }
                print_quick_replies(&quick_replies);
            }
            ChatEvent::UserMessage { .. } | ChatEvent::TypingStopped => {}
            ChatEvent::TypingStarted => {
                println!("{}", format!("{} is typing...", companion).bright_black().italic());
            }
            ChatEvent::BotMessage { message, .. } => print_message(&message, &companion),
            ChatEvent::BatchRolledBack { ids } => {
                println!("{}", format!("({} message(s) not sent)", ids.len()).yellow());
            }
            ChatEvent::TransientFailure { message } => println!("{}", message.red()),
            ChatEvent::GateUpdated {
                remaining: Some(remaining),
                ..
            } if remaining > 0 && remaining <= 5 => {
                println!("{}", format!("{} free message(s) left", remaining).yellow());
            }
            ChatEvent::GateUpdated { .. } => {}
            ChatEvent::PromptRaised(prompt) => print_prompt(&prompt),
            ChatEvent::PromptDismissed => println!("{}", "(prompt closed)".bright_black()),
            ChatEvent::Converted { user_id } => {
                println!("{}", format!("Signed in as {}. No more limits!", user_id).bright_green());
            }
        }
    }
}

fn print_message(message: &ChatMessage, companion: &str) {
    match message.role {
        MessageRole::User => println!("{}", format!("> {}", message.text).green()),
        MessageRole::Assistant => {
            println!("{}", format!("[{}]", companion).bright_magenta());
            for line in message.text.lines() {
                println!("{}", line.bright_blue());
            }
        }
    }
}

fn print_quick_replies(replies: &[String]) {
    for (index, reply) in replies.iter().enumerate() {
        println!("  {}", format!("[{}] {}", index + 1, reply).bright_black());
    }
}

fn print_prompt(prompt: &LoginPrompt) {
    let text = match &prompt.reason {
        PromptReason::LimitReached { limit, .. } => format!(
            "You've used all {} free messages. Sign in to keep chatting: /login <user-id>",
            limit
        ),
        PromptReason::LockedFeature { feature } => format!(
            "'{}' is for signed-in users. /login <user-id> or /dismiss",
            feature
        ),
    };
    println!("{}", "┌─ Sign in ─".bright_yellow().bold());
    println!("{}", format!("│ {}", text).bright_yellow());
    println!("{}", "└───────────".bright_yellow().bold());
}
