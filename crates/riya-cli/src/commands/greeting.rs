use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use colored::Colorize;
use riya_core::greeting::{GreetingContext, ist, select_greeting_at};

use crate::settings::Settings;

pub fn run(settings: &Settings, at: Option<&str>, returning: bool, json: bool) -> Result<()> {
    let now = match at {
        Some(at) => DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("'{}' is not an RFC 3339 timestamp", at))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let offset = FixedOffset::east_opt(settings.config.chat.greeting_utc_offset_secs).unwrap_or_else(ist);
    let greeting = select_greeting_at(now, offset, GreetingContext { returning });

    if json {
        println!("{}", serde_json::to_string_pretty(&greeting)?);
        return Ok(());
    }

    println!("{}", greeting.text.bright_blue());
    for (index, reply) in greeting.quick_replies.iter().enumerate() {
        println!("  {}", format!("[{}] {}", index + 1, reply).bright_black());
    }
    Ok(())
}
