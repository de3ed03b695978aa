//! Command registry.
//!
//! Commands are keyed by their name tokens (`["deploy", "status"]`) in a
//! sorted map. The same index answers exact lookup, longest-prefix
//! resolution, and prefix enumeration for completion.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::builtins::Builtin;
use crate::handler::Handler;
use crate::lexer;
use crate::params::{ParamKind, ParamSpec};
use crate::resolver::{self, Invocation, ResolveError, BACKGROUND_FLAG, HELP_FLAG};

/// Whether a command shows up in help and completion.
#[derive(Clone, Default)]
pub enum Visibility {
    #[default]
    Shown,
    Hidden,
    /// Asked every time help or completion looks.
    HiddenWhen(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Visibility {
    pub fn is_hidden(&self) -> bool {
        match self {
            Visibility::Shown => false,
            Visibility::Hidden => true,
            Visibility::HiddenWhen(test) => test(),
        }
    }
}

impl fmt::Debug for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Shown => f.write_str("Shown"),
            Visibility::Hidden => f.write_str("Hidden"),
            Visibility::HiddenWhen(_) => f.write_str("HiddenWhen(..)"),
        }
    }
}

/// A registered command.
#[derive(Debug)]
pub struct CommandSpec<C> {
    /// Name tokens, e.g. `["cake", "make"]`.
    pub name: Vec<String>,
    /// Parameters, in declaration order.
    pub params: Vec<ParamSpec>,
    pub handler: Handler<C>,
    /// Help text. The first line is the summary.
    pub docs: String,
    /// Extra name sequences resolving to this command.
    pub aliases: Vec<Vec<String>>,
    /// Heading the command is listed under in help.
    pub group: Option<String>,
    /// Hidden commands stay executable but are left out of help and
    /// completion.
    pub visibility: Visibility,
    /// Always start in the background (async handlers only).
    pub background: bool,
}

fn split_name(name: &str) -> Vec<String> {
    name.split_whitespace().map(str::to_string).collect()
}

impl<C: Send + Sync + 'static> CommandSpec<C> {
    /// Create a command. `name` is split on whitespace into tokens.
    pub fn new(name: &str, handler: Handler<C>) -> Self {
        Self {
            name: split_name(name),
            params: Vec::new(),
            handler,
            docs: String::new(),
            aliases: Vec::new(),
            group: None,
            visibility: Visibility::Shown,
            background: false,
        }
    }

    /// Set the help text.
    pub fn docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = docs.into();
        self
    }

    /// Add a parameter.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Add an alternative name.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(split_name(alias));
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.visibility = if hidden { Visibility::Hidden } else { Visibility::Shown };
        self
    }

    /// Hide the command whenever `test` says so.
    pub fn hidden_when<F>(mut self, test: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.visibility = Visibility::HiddenWhen(Arc::new(test));
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility.is_hidden()
    }

    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// The command name as typed.
    pub fn display_name(&self) -> String {
        self.name.join(" ")
    }

    /// First line of the docs.
    pub fn summary(&self) -> &str {
        self.docs.lines().next().unwrap_or("").trim()
    }

    /// One-line usage, e.g. `cake make [-layers <int>] [-flavor <choice>]`.
    pub fn usage(&self) -> String {
        let mut parts = vec![self.display_name()];
        parts.extend(self.params.iter().map(ParamSpec::usage));
        if self.handler.is_async() && !self.background && self.find_param(BACKGROUND_FLAG).is_none() {
            parts.push(format!("[-{}]", BACKGROUND_FLAG));
        }
        parts.join(" ")
    }

    /// Look up a parameter by name.
    pub fn find_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Resolve the argument tokens that follow the command name.
    ///
    /// A trailing `?` asks for help, the same as `-help`. The `help`
    /// builtin, which `?` also names, takes it literally.
    pub fn resolve_args(&self, raw: &[String]) -> Result<Invocation, ResolveError> {
        let raw: Cow<'_, [String]> = match raw.split_last() {
            Some((last, rest)) if last == "?" && !matches!(self.handler, Handler::Builtin(Builtin::Help)) => {
                let mut words = rest.to_vec();
                words.push(format!("-{}", HELP_FLAG));
                Cow::Owned(words)
            }
            _ => Cow::Borrowed(raw),
        };
        resolver::resolve(&self.params, &raw, self.handler.is_async())
    }
}

/// Registration failures. Raised at startup, never at runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationConflict {
    #[error("command `{0}` is already registered")]
    Duplicate(String),

    #[error("command names cannot be empty")]
    EmptyName,

    #[error("a start command is already defined: {0}")]
    StartCommandDefined(String),

    #[error("an exit command is already defined: {0}")]
    ExitCommandDefined(String),
}

/// Registered commands, indexed by name tokens.
pub struct Registry<C> {
    index: BTreeMap<Vec<String>, Arc<CommandSpec<C>>>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            index: BTreeMap::new(),
        }
    }
}

impl<C: Send + Sync + 'static> Registry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its name and every alias.
    ///
    /// Nothing is registered if any of the names is already taken.
    pub fn register(&mut self, spec: CommandSpec<C>) -> Result<Arc<CommandSpec<C>>, RegistrationConflict> {
        let mut names: Vec<Vec<String>> = Vec::with_capacity(spec.aliases.len() + 1);
        for name in std::iter::once(&spec.name).chain(&spec.aliases) {
            if name.is_empty() {
                return Err(RegistrationConflict::EmptyName);
            }
            if self.index.contains_key(name) || names.contains(name) {
                return Err(RegistrationConflict::Duplicate(name.join(" ")));
            }
            names.push(name.clone());
        }

        let spec = Arc::new(spec);
        for name in names {
            self.index.insert(name, Arc::clone(&spec));
        }
        tracing::debug!(command = %spec.display_name(), aliases = spec.aliases.len(), "registered command");
        Ok(spec)
    }

    /// Exact lookup by name tokens (including aliases).
    pub fn get(&self, name: &[String]) -> Option<&Arc<CommandSpec<C>>> {
        self.index.get(name)
    }

    /// Find the command named by the leading words of `words`.
    ///
    /// The longest registered name that is an exact prefix of `words` wins,
    /// so `deploy 5` runs `deploy` even when `deploy status` exists. Returns
    /// the command and how many words its name consumed.
    ///
    /// When no name matches but the words are the start of several names,
    /// fails with `Ambiguous` listing them.
    pub fn resolve(&self, words: &[String]) -> Result<(Arc<CommandSpec<C>>, usize), ResolveError> {
        for len in (1..=words.len()).rev() {
            if let Some(spec) = self.index.get(&words[..len]) {
                return Ok((Arc::clone(spec), len));
            }
        }

        let first = words.first().cloned().unwrap_or_default();
        let mut candidates = Vec::new();
        for len in (1..=words.len()).rev() {
            candidates = self.enumerate(&words[..len]);
            if !candidates.is_empty() {
                break;
            }
        }

        if candidates.len() > 1 {
            Err(ResolveError::Ambiguous {
                input: words.join(" "),
                candidates: candidates.iter().map(|c| c.join(" ")).collect(),
            })
        } else {
            Err(ResolveError::NotFound { name: first })
        }
    }

    /// Every visible name sequence beginning with `prefix`, in sorted order.
    pub fn enumerate(&self, prefix: &[String]) -> Vec<Vec<String>> {
        self.index
            .range(prefix.to_vec()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .filter(|(_, spec)| !spec.is_hidden())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Completion candidates for the last word of `line`.
    ///
    /// Offers the next name token while the line is still naming a command,
    /// then `-name` options and choice values once it resolves. A line that
    /// ends in whitespace completes a fresh word.
    pub fn complete(&self, line: &str) -> Vec<String> {
        let Ok(mut words) = lexer::split_words(line) else {
            return Vec::new();
        };
        let partial = if line.ends_with(char::is_whitespace) || words.is_empty() {
            String::new()
        } else {
            words.pop().unwrap_or_default()
        };

        let mut out = BTreeSet::new();
        for name in self.enumerate(&words) {
            if let Some(next) = name.get(words.len()) {
                if next.starts_with(&partial) {
                    out.insert(next.clone());
                }
            }
        }

        if let Ok((spec, consumed)) = self.resolve(&words) {
            if !spec.is_hidden() {
                let args = &words[consumed..];
                let pending = args
                    .last()
                    .and_then(|w| w.strip_prefix('-'))
                    .and_then(|name| spec.find_param(name))
                    .filter(|p| matches!(p.kind, ParamKind::Named | ParamKind::List));

                match pending {
                    Some(param) => {
                        out.extend(
                            param
                                .current_choices()
                                .unwrap_or_default()
                                .into_iter()
                                .filter(|c| c.starts_with(&partial)),
                        );
                    }
                    None => {
                        for param in &spec.params {
                            if param.is_option() {
                                let option = format!("-{}", param.name);
                                if option.starts_with(&partial) && !args.contains(&option) {
                                    out.insert(option);
                                }
                            }
                        }
                        if spec.handler.is_async() && !spec.background {
                            let option = format!("-{}", BACKGROUND_FLAG);
                            if option.starts_with(&partial) && !args.contains(&option) {
                                out.insert(option);
                            }
                        }
                    }
                }
            }
        }

        out.into_iter().collect()
    }

    /// Distinct visible commands (aliases folded), sorted by name.
    pub fn commands(&self) -> Vec<Arc<CommandSpec<C>>> {
        self.index
            .iter()
            .filter(|(name, spec)| !spec.is_hidden() && **name == spec.name)
            .map(|(_, spec)| Arc::clone(spec))
            .collect()
    }

    /// Number of registered name sequences, aliases included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
