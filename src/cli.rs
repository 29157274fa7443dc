//! Hybrid positional/named argument parsing.
//!
//! Tokens not starting with `-` are positional (the first one is the command);
//! tokens starting with `-` are named options of the form `--name[=value]`.
//! The token index of every named option is kept so a caller can substitute
//! a single token and parse again.

use std::collections::BTreeMap;

use clap::{Arg, ArgAction, Command};
use regex::Regex;

use crate::error::{ScanError, ScanResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct NamedArg {
    value: String,
    position: usize,
}

/// Structured view of a raw token list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArguments {
    command: Option<String>,
    positional: Vec<String>,
    /// Keyed by lower-cased option name.
    named: BTreeMap<String, NamedArg>,
}

/// `-name`, `--name` or `--name=value`; names start with a letter.
const OPTION_PATTERN: &str = r"(?s)^--?([A-Za-z][A-Za-z0-9\-]*)(?:=(.*))?$";

/// Strip one matching pair of surrounding single or double quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

impl ParsedArguments {
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> ScanResult<Self> {
        let re = Regex::new(OPTION_PATTERN)?;
        let mut unnamed = Vec::new();
        let mut named = BTreeMap::new();

        for (position, token) in tokens.iter().enumerate() {
            let token = token.as_ref();
            if !token.starts_with('-') {
                unnamed.push(token.to_string());
                continue;
            }

            let caps = re
                .captures(token)
                .ok_or_else(|| ScanError::InvalidArgument(token.to_string()))?;

            let name = caps[1].to_ascii_lowercase();
            if named.contains_key(&name) {
                return Err(ScanError::DuplicateArgument(caps[1].to_string()));
            }

            let value = caps.get(2).map_or("", |m| unquote(m.as_str())).to_string();
            named.insert(name, NamedArg { value, position });
        }

        let mut unnamed = unnamed.into_iter();
        Ok(Self {
            command: unnamed.next().map(|c| c.to_lowercase()),
            positional: unnamed.collect(),
            named,
        })
    }

    /// The command name, lower-cased.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn named(&self, name: &str) -> Option<&str> {
        self.named
            .get(&name.to_ascii_lowercase())
            .map(|arg| arg.value.as_str())
    }

    pub fn required(&self, name: &str) -> ScanResult<&str> {
        self.named(name)
            .ok_or_else(|| ScanError::MissingArgument(name.to_string()))
    }

    /// Index of the token that carried `name` in the parsed token list.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.named
            .get(&name.to_ascii_lowercase())
            .map(|arg| arg.position)
    }

    /// Rebuild a token list that parses back to `self`.
    ///
    /// Named options go back to their recorded slots; the command and the
    /// positional tokens fill the remaining slots in order.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn to_tokens(&self) -> Vec<String> {
        let unnamed_count = usize::from(self.command.is_some()) + self.positional.len();
        let mut slots: Vec<Option<String>> = vec![None; self.named.len() + unnamed_count];

        for (name, arg) in &self.named {
            if arg.position >= slots.len() {
                slots.resize(arg.position + 1, None);
            }
            slots[arg.position] = Some(format!("--{}=\"{}\"", name, arg.value));
        }

        let mut unnamed = self.command.iter().chain(&self.positional).cloned();
        slots
            .into_iter()
            .filter_map(|slot| slot.or_else(|| unnamed.next()))
            .collect()
    }
}

/// Usage text for the whole tool.
pub fn usage() -> String {
    let option = |name: &'static str, value: &'static str, help: &'static str| {
        Arg::new(name)
            .long(name)
            .value_name(value)
            .help(help)
            .action(ArgAction::Set)
    };

    let mut cmd = Command::new("pgscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scan project dependencies and publish consumer data to ProGet")
        .override_usage("pgscan <command> [options...]")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .subcommand(Command::new("report").about("Display dependency data"))
        .subcommand(Command::new("publish").about("Publish dependency data to ProGet"))
        .arg(option("type", "nuget|npm|pypi", "Source ecosystem; inferred from the input file name when omitted"))
        .arg(option("input", "source file name", "Source file, or a pattern containing * or **"))
        .arg(option("package-feed", "ProGet feed name", "Feed that hosts the dependencies"))
        .arg(option("proget-url", "ProGet base URL", "Base URL of the ProGet server"))
        .arg(option("consumer-package-source", "feed name or URL", "Where the consuming package is published"))
        .arg(option("consumer-package-name", "name", "Consumer name; defaults to the project name"))
        .arg(option("consumer-package-version", "version", "Consumer version"))
        .arg(option("consumer-package-group", "group", "Consumer group"))
        .arg(option("api-key", "ProGet API key", "API key sent with publish requests"))
        .arg(option("application-nuspec", "nuspec file", "Manifest to receive the aggregated dependencies"))
        .arg(option("config", "config file", "Configuration file override"));

    cmd.render_help().to_string()
}
