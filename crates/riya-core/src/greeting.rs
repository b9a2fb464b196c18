//! Time-of-day greeting selector.
//!
//! The opener a fresh session shows before the user types anything. The
//! selection is a pure function of an injected clock reading so boundary
//! behaviour (11:59:59 vs 12:00:00) can be asserted exactly.

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Offset of India Standard Time from UTC, in seconds (+05:30).
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Four-way partition of the 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeOfDay {
    /// `[06:00, 12:00)`
    Morning,
    /// `[12:00, 17:00)`
    Afternoon,
    /// `[17:00, 22:00)`
    Evening,
    /// `[22:00, 24:00) ∪ [00:00, 06:00)`
    Night,
}

impl TimeOfDay {
    /// Buckets an hour of the day (0–23). Hours ≥ 24 wrap.
    pub fn from_hour(hour: u32) -> Self {
        match hour % 24 {
            6..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }
}

/// A canned opener plus the quick replies offered under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub time_of_day: TimeOfDay,
    pub text: String,
    pub quick_replies: Vec<String>,
}

/// Conversation context that influences the opener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreetingContext {
    /// The user already has history with the companion.
    pub returning: bool,
}

/// Fixed offset the greeting clock is normalized to.
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Selects the greeting for `now`, normalized to `offset`.
pub fn select_greeting_at(
    now: DateTime<Utc>,
    offset: FixedOffset,
    context: GreetingContext,
) -> Greeting {
    let local = now.with_timezone(&offset);
    let time_of_day = TimeOfDay::from_hour(local.hour());
    let (opener, quick_replies): (&str, [&str; 3]) = match time_of_day {
        TimeOfDay::Morning => (
            "Oye Kumbhkaran, finally jaag gaye? ☀️ Breakfast kiya ya seedha phone uthaya?",
            ["Abhi utha hoon 😴", "Breakfast ho gaya", "Aaj ka plan batao"],
        ),
        TimeOfDay::Afternoon => (
            "Lunch hua ya kaam mein hi doobe ho? 🍛 Thoda break le lo mere saath.",
            ["Lunch ho gaya", "Bahut kaam hai yaar", "Bored hoon"],
        ),
        TimeOfDay::Evening => (
            "Shaam ho gayi! 🌇 Din kaisa raha aaj? Sab kuch batao.",
            ["Accha tha", "Thak gaya hoon", "Kuch interesting hua"],
        ),
        TimeOfDay::Night => (
            "Itni raat ko jaag rahe ho? 🌙 Neend nahi aa rahi ya kuch soch rahe ho?",
            ["Neend nahi aa rahi", "Bas aise hi", "Baat karni thi"],
        ),
    };

    let text = if context.returning {
        format!("Aa gaye wapas! {opener}")
    } else {
        opener.to_string()
    };

    Greeting {
        time_of_day,
        text,
        quick_replies: quick_replies.iter().map(|s| s.to_string()).collect(),
    }
}

/// Selects the fresh-session greeting for `now` in IST.
pub fn select_greeting(now: DateTime<Utc>) -> Greeting {
    select_greeting_at(now, ist(), GreetingContext::default())
}
