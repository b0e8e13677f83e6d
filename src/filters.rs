//! Filters applied to user-supplied text before the bot repeats it.

use std::borrow::Cow;

use regex::Regex;

/// Zero-width space; breaks `@everyone` without changing how it looks.
const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Compiled text filters, built once at startup and shared through the
/// application context.
#[derive(Debug, Clone)]
pub struct TextFilters {
    mentions: Regex,
    pings: Regex,
    markup: Regex,
}

impl TextFilters {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            mentions: Regex::new(r"@(everyone|here)")?,
            pings: Regex::new(r"<@([!&]?\d+)>")?,
            markup: Regex::new(r"[`*_|\\]")?,
        })
    }

    /// Defuse `@everyone` and `@here` so echoed text can't ping a whole guild.
    pub fn suppress_mentions<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let replacement = format!("@{ZERO_WIDTH_SPACE}${{1}}");
        self.mentions.replace_all(text, replacement.as_str())
    }

    /// Break user (`<@id>`, `<@!id>`) and role (`<@&id>`) mentions so relayed
    /// text can't ping anyone in another guild.
    pub fn suppress_pings<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let replacement = format!("<@{ZERO_WIDTH_SPACE}${{1}}>");
        self.pings.replace_all(text, replacement.as_str())
    }

    /// Backslash-escape the markdown metacharacters `` ` * _ | \ ``.
    ///
    /// Not idempotent: a second pass escapes the backslashes the first one added.
    pub fn escape_markup<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.markup.replace_all(text, r"\$0")
    }

    /// Both filters, for text that is shown verbatim to other users.
    pub fn sanitize(&self, text: &str) -> String {
        let escaped = self.escape_markup(text);
        self.suppress_mentions(&escaped).into_owned()
    }
}
