//! reflect: a global mirror channel for Discord guilds.
//!
//! Each guild picks one channel as its mirror channel, and every message
//! posted in one is relayed to all the others. A handful of prefix commands
//! manage mirror channels and moderate who gets relayed.
//!
//! The gateway protocol is handled by serenity behind the [`gateway::Gateway`]
//! seam; outbound calls go through [`http::ChatApi`]. [`run`] is the whole
//! bot: load the config, connect, serve until a termination signal, then save
//! the config back.

pub mod bot;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod filters;
pub mod gateway;
pub mod handlers;
pub mod host;
pub mod http;
pub mod logging;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::run;
