//! Clients for the hosted services riya talks to.

pub mod http_completion_client;

pub use http_completion_client::HttpCompletionClient;
