pub mod chat;
pub mod greeting;
pub mod onboard;
