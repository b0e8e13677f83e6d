//! Prefix command routing.
//!
//! The [`Dispatcher`] is filled once at startup and then shared read-only
//! behind an `Arc`. Each inbound message is matched against the prefix, split
//! into a command name and its arguments, and handed to the registered
//! handler as an [`Invocation`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::context::AppContext;
use crate::error::{HandlerResult, RegistrationError};
use crate::types::IncomingMessage;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Section a command is listed under in `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Utility,
    Moderation,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Utility => f.write_str("Utility"),
            Group::Moderation => f.write_str("Moderation"),
        }
    }
}

/// Everything a command handler gets to work with.
#[derive(Clone)]
pub struct Invocation {
    pub ctx: Arc<AppContext>,
    pub message: IncomingMessage,
    /// Text after the command name, leading whitespace removed.
    pub args: String,
    pub dispatcher: Arc<Dispatcher>,
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;
pub type HandlerFn = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;

pub struct CommandEntry {
    pub group: Group,
    pub description: &'static str,
    /// Argument synopsis shown by `help <command>`, e.g. `<user>`.
    pub usage: &'static str,
    handler: HandlerFn,
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("group", &self.group)
            .field("description", &self.description)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// What happened to one message.
#[derive(Debug)]
pub enum Dispatch {
    /// The message doesn't start with the prefix.
    Ignored,
    /// Prefixed, but no command has this name.
    Unknown(String),
    Handled {
        name: String,
        result: HandlerResult,
    },
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Dispatcher {
    prefix: String,
    commands: HashMap<String, CommandEntry>,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands: HashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bind `name` to `handler`. Names are matched case-sensitively.
    pub fn register<F, Fut>(
        &mut self,
        name: &str,
        group: Group,
        description: &'static str,
        usage: &'static str,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(RegistrationError::Whitespace(name.to_string()));
        }
        if self.commands.contains_key(name) {
            return Err(RegistrationError::Duplicate(name.to_string()));
        }

        let handler: HandlerFn =
            Arc::new(move |inv: Invocation| -> HandlerFuture { Box::pin(handler(inv)) });
        self.commands.insert(
            name.to_string(),
            CommandEntry {
                group,
                description,
                usage,
                handler,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    /// All commands, sorted by group then name.
    pub fn commands(&self) -> Vec<(&str, &CommandEntry)> {
        let mut list: Vec<_> = self
            .commands
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
            .collect();
        list.sort_by(|a, b| (a.1.group, a.0).cmp(&(b.1.group, b.0)));
        list
    }

    /// Split `content` into `(name, args)` if it starts with the prefix.
    pub fn parse<'a>(&self, content: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = content.strip_prefix(self.prefix.as_str())?;
        let (name, args) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        Some((name, args.trim_start()))
    }

    /// Route `message` to its command and run it to completion.
    pub async fn dispatch(
        self: &Arc<Self>,
        ctx: Arc<AppContext>,
        message: IncomingMessage,
    ) -> Dispatch {
        let Some((name, args)) = self.parse(&message.content) else {
            return Dispatch::Ignored;
        };
        let name = name.to_string();
        let Some(entry) = self.commands.get(&name) else {
            debug!(command = %name, "unknown command");
            return Dispatch::Unknown(name);
        };

        debug!(command = %name, author = message.author.id, "running command");
        let invocation = Invocation {
            ctx,
            args: args.to_string(),
            message,
            dispatcher: Arc::clone(self),
        };
        let result = (entry.handler)(invocation).await;
        Dispatch::Handled { name, result }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
