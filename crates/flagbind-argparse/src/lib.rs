//! Minimal typed flag parsing and help rendering.
//!
//! Flags are registered as [`FlagSpec`]s on a [`FlagSet`]. Parsing reads argv
//! plus an injected environment and produces [`Matches`] holding typed
//! [`Value`]s, so callers never re-parse strings.

pub mod value;

pub use value::{FlagValue, GenericHandle, Shared, Value, ValueKind};

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

const BUILTIN_HELP: (&str, &str) = ("-h", "--help");
const BUILTIN_VERSION: (&str, &str) = ("-V", "--version");

/// One flag registration: names, help text, env fallback and typed default.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub usage: String,
    pub env: Option<String>,
    pub hidden: bool,
    pub kind: ValueKind,
    pub default: Option<Value>,
}

impl FlagSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            usage: String::new(),
            env: None,
            hidden: false,
            kind,
            default: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Every spelling of this flag on the command line, primary first.
    pub fn spellings(&self) -> Vec<String> {
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .map(|n| spelling(n))
            .collect()
    }
}

/// `l` -> `-l`, `listen` -> `--listen`.
fn spelling(name: &str) -> String {
    let name = name.trim().trim_start_matches('-');
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// A registry of flags for one command.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    name: String,
    summary: String,
    version: String,
    flags: Vec<FlagSpec>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Register one flag.
    pub fn flag(&mut self, spec: FlagSpec) -> &mut Self {
        self.flags.push(spec);
        self
    }

    /// Register several flags in order.
    pub fn flags(&mut self, specs: impl IntoIterator<Item = FlagSpec>) -> &mut Self {
        self.flags.extend(specs);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn specs(&self) -> &[FlagSpec] {
        &self.flags
    }
}

/// Parsed flag values keyed by primary flag name.
#[derive(Debug, Clone, Default)]
pub struct Matches {
    kinds: IndexMap<String, ValueKind>,
    values: IndexMap<String, Value>,
    explicit: HashSet<String>,
    rest: Vec<String>,
}

impl Matches {
    /// The kind a flag was registered with, if it was registered at all.
    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.kinds.get(name).copied()
    }

    /// The resolved value (argv, env or default) of a flag.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether a flag was given in argv (not sourced from env/default).
    pub fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    /// Positional arguments, in order.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }

    /// Resolved values in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn typed<T>(
        &self,
        name: &str,
        kind: ValueKind,
        zero: impl FnOnce() -> T,
        pick: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        if self.kind_of(name)? != kind {
            return None;
        }
        match self.values.get(name) {
            Some(v) => pick(v),
            None => Some(zero()),
        }
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.typed(name, ValueKind::String, String::new, |v| match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// A standard boolean: `false` unless set.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.typed(name, ValueKind::Bool, || false, |v| match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        })
    }

    /// An inverted boolean: `true` unless explicitly negated.
    pub fn inverted_bool(&self, name: &str) -> Option<bool> {
        self.typed(name, ValueKind::Bool, || true, |v| match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub fn float64(&self, name: &str) -> Option<f64> {
        self.typed(name, ValueKind::Float64, || 0.0, |v| match v {
            Value::Float64(f) => Some(*f),
            _ => None,
        })
    }

    pub fn int(&self, name: &str) -> Option<isize> {
        self.typed(name, ValueKind::Int, || 0, |v| match v {
            Value::Int(i) => Some(*i),
            _ => None,
        })
    }

    pub fn int64(&self, name: &str) -> Option<i64> {
        self.typed(name, ValueKind::Int64, || 0, |v| match v {
            Value::Int64(i) => Some(*i),
            _ => None,
        })
    }

    pub fn uint(&self, name: &str) -> Option<usize> {
        self.typed(name, ValueKind::Uint, || 0, |v| match v {
            Value::Uint(u) => Some(*u),
            _ => None,
        })
    }

    pub fn uint64(&self, name: &str) -> Option<u64> {
        self.typed(name, ValueKind::Uint64, || 0, |v| match v {
            Value::Uint64(u) => Some(*u),
            _ => None,
        })
    }

    pub fn duration(&self, name: &str) -> Option<Duration> {
        self.typed(name, ValueKind::Duration, Duration::default, |v| match v {
            Value::Duration(d) => Some(*d),
            _ => None,
        })
    }

    pub fn int_seq(&self, name: &str) -> Option<Vec<isize>> {
        self.typed(name, ValueKind::IntSeq, Vec::new, |v| match v {
            Value::IntSeq(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn int64_seq(&self, name: &str) -> Option<Vec<i64>> {
        self.typed(name, ValueKind::Int64Seq, Vec::new, |v| match v {
            Value::Int64Seq(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn string_seq(&self, name: &str) -> Option<Vec<String>> {
        self.typed(name, ValueKind::StringSeq, Vec::new, |v| match v {
            Value::StringSeq(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// The shared generic instance registered for a flag.
    pub fn generic(&self, name: &str) -> Option<GenericHandle> {
        if self.kind_of(name)? != ValueKind::Generic {
            return None;
        }
        match self.values.get(name)? {
            Value::Generic(h) => Some(h.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The user passed something the flag set does not accept.
    #[error("{0}")]
    InvalidArgs(String),
    /// The flag set itself is inconsistent.
    #[error("{0}")]
    Failed(String),
}

impl ParseError {
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgs(msg) | Self::Failed(msg) => msg.as_str(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Matches(Matches),
    Help(String),
    Version(String),
}

fn format_flag_left(spec: &FlagSpec) -> String {
    let mut out = spec.spellings().join(", ");
    if spec.kind.takes_value() {
        out.push_str(&format!(" <{}>", spec.kind.value_name()));
    }
    out
}

fn format_flag_help(spec: &FlagSpec) -> String {
    let mut parts: Vec<String> = Vec::new();
    let usage = spec.usage.trim();
    if !usage.is_empty() {
        parts.push(usage.to_string());
    }
    if let Some(default) = &spec.default {
        let rendered = default.to_string();
        if !rendered.is_empty() {
            parts.push(format!("[default: {rendered}]"));
        }
    }
    if let Some(env) = &spec.env {
        parts.push(format!("[env: {env}]"));
    }
    parts.join(" ")
}

/// Render a help message for `set`. Hidden flags are omitted.
pub fn help(set: &FlagSet) -> String {
    let mut out = String::new();
    if set.summary.trim().is_empty() {
        out.push_str(&set.name);
        out.push('\n');
    } else {
        out.push_str(&format!("{} - {}\n", set.name, set.summary.trim()));
    }
    out.push_str(&format!("\nUsage: {} [OPTIONS]\n", set.name));

    let mut rows: Vec<(String, String)> = set
        .flags
        .iter()
        .filter(|f| !f.hidden)
        .map(|f| (format_flag_left(f), format_flag_help(f)))
        .collect();
    if !has_spelling(set, BUILTIN_HELP) {
        rows.push((
            format!("{}, {}", BUILTIN_HELP.0, BUILTIN_HELP.1),
            "Show help information".to_string(),
        ));
    }
    if !has_spelling(set, BUILTIN_VERSION) {
        rows.push((
            format!("{}, {}", BUILTIN_VERSION.0, BUILTIN_VERSION.1),
            "Show version information".to_string(),
        ));
    }

    out.push_str("\nOptions:\n");
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {}\n", left));
        } else {
            out.push_str(&format!("  {:width$}  {}\n", left, help, width = width));
        }
    }
    out
}

/// Render a version message for `set`.
pub fn version(set: &FlagSet) -> String {
    if set.version.trim().is_empty() {
        format!("{}\n", set.name)
    } else {
        format!("{} {}\n", set.name, set.version.trim())
    }
}

fn has_spelling(set: &FlagSet, (short, long): (&str, &str)) -> bool {
    set.flags
        .iter()
        .flat_map(|f| f.spellings())
        .any(|s| s == short || s == long)
}

fn env_lookup<'e>(env: &'e [(String, String)], key: &str) -> Option<&'e str> {
    env.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn build_lookup(set: &FlagSet) -> ParseResult<HashMap<String, usize>> {
    let mut lookup: HashMap<String, usize> = HashMap::new();
    for (idx, spec) in set.flags.iter().enumerate() {
        if spec.kind == ValueKind::Generic && !matches!(spec.default, Some(Value::Generic(_))) {
            return Err(ParseError::Failed(format!(
                "flag definition error: generic flag '{}' has no value container",
                spec.name
            )));
        }
        if let Some(default) = &spec.default {
            if default.kind() != spec.kind {
                return Err(ParseError::Failed(format!(
                    "flag definition error: '{}' is {} but its default is {}",
                    spec.name,
                    spec.kind,
                    default.kind()
                )));
            }
        }
        for s in spec.spellings() {
            if let Some(prev) = lookup.insert(s.clone(), idx) {
                if prev != idx {
                    return Err(ParseError::Failed(format!(
                        "flag definition conflict: {s} maps to both '{}' and '{}'",
                        set.flags[prev].name, spec.name
                    )));
                }
            }
        }
    }
    Ok(lookup)
}

/// Raw argv occurrences per flag index, in order.
type Occurrences<'a> = HashMap<usize, Vec<&'a str>>;

fn record<'a>(occurrences: &mut Occurrences<'a>, idx: usize, value: &'a str) {
    occurrences.entry(idx).or_default().push(value);
}

fn invalid_value(spec: &FlagSpec, raw: &str, reason: &str) -> ParseError {
    ParseError::InvalidArgs(format!(
        "invalid value '{raw}' for '{}': {reason}",
        spelling(&spec.name)
    ))
}

/// Resolve the value of one flag from its argv occurrences.
fn resolve_explicit(spec: &FlagSpec, raws: &[&str]) -> ParseResult<Value> {
    if let Some(Value::Generic(handle)) = &spec.default {
        for raw in raws {
            handle.set(raw).map_err(|e| invalid_value(spec, raw, &e))?;
        }
        return Ok(Value::Generic(handle.clone()));
    }

    if spec.kind.is_seq() {
        let mut acc: Option<Value> = None;
        for raw in raws {
            let parsed =
                value::parse_value(spec.kind, raw).map_err(|e| invalid_value(spec, raw, &e))?;
            match acc.as_mut() {
                Some(existing) => {
                    if !existing.extend(parsed) {
                        return Err(ParseError::Failed(format!(
                            "cannot accumulate values for {}",
                            spelling(&spec.name)
                        )));
                    }
                }
                None => acc = Some(parsed),
            }
        }
        return acc.ok_or_else(|| {
            ParseError::InvalidArgs(format!("missing value for {}", spelling(&spec.name)))
        });
    }

    let raw = raws.last().copied().unwrap_or_default();
    value::parse_value(spec.kind, raw).map_err(|e| invalid_value(spec, raw, &e))
}

fn resolve_env(spec: &FlagSpec, raw: &str) -> ParseResult<Value> {
    let key = spec.env.as_deref().unwrap_or_default();
    let bad = |e: String| {
        ParseError::InvalidArgs(format!(
            "invalid value '{raw}' in ${key} for '{}': {e}",
            spelling(&spec.name)
        ))
    };
    if let Some(Value::Generic(handle)) = &spec.default {
        handle.set(raw).map_err(bad)?;
        return Ok(Value::Generic(handle.clone()));
    }
    value::parse_value(spec.kind, raw).map_err(bad)
}

/// Parse `argv` against `set` without any environment.
pub fn parse(set: &FlagSet, argv: &[String]) -> ParseResult<ParseOutcome> {
    parse_with_env(set, argv, &[])
}

/// Parse `argv` using `env` as a value source for flags that declare `env`.
///
/// Value precedence is:
/// 1) CLI argv
/// 2) env
/// 3) default
pub fn parse_with_env(
    set: &FlagSet,
    argv: &[String],
    env: &[(String, String)],
) -> ParseResult<ParseOutcome> {
    let lookup = build_lookup(set)?;
    let wants_help = !has_spelling(set, BUILTIN_HELP);
    let wants_version = !has_spelling(set, BUILTIN_VERSION);

    let mut occurrences: Occurrences<'_> = HashMap::new();
    let mut rest: Vec<String> = Vec::new();
    let mut parse_error: Option<ParseError> = None;
    let mut show_help = false;
    let mut show_version = false;

    let mut i = 0usize;
    let mut after_separator = false;
    while i < argv.len() {
        let arg = argv[i].as_str();

        if after_separator || arg == "-" || !arg.starts_with('-') {
            rest.push(arg.to_string());
            i += 1;
            continue;
        }
        if arg == "--" {
            after_separator = true;
            i += 1;
            continue;
        }
        if wants_help && (arg == BUILTIN_HELP.0 || arg == BUILTIN_HELP.1) {
            show_help = true;
            i += 1;
            continue;
        }
        if wants_version && (arg == BUILTIN_VERSION.0 || arg == BUILTIN_VERSION.1) {
            show_version = true;
            i += 1;
            continue;
        }

        if arg.starts_with("--") {
            // --key=value
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (arg, None),
            };
            let Some(&idx) = lookup.get(flag) else {
                parse_error.get_or_insert_with(|| {
                    ParseError::InvalidArgs(format!("unknown flag: {flag}"))
                });
                i += 1;
                continue;
            };
            let spec = &set.flags[idx];
            match (spec.kind.takes_value(), inline) {
                (_, Some(value)) => {
                    record(&mut occurrences, idx, value);
                    i += 1;
                }
                (true, None) => {
                    let Some(value) = argv.get(i + 1) else {
                        parse_error.get_or_insert_with(|| {
                            ParseError::InvalidArgs(format!("missing value for {flag}"))
                        });
                        break;
                    };
                    record(&mut occurrences, idx, value.as_str());
                    i += 2;
                }
                (false, None) => {
                    record(&mut occurrences, idx, "true");
                    i += 1;
                }
            }
            continue;
        }

        // Short flags: -v, -o value, -vq, -ofile
        if !arg.is_ascii() {
            parse_error.get_or_insert_with(|| {
                ParseError::InvalidArgs(format!("invalid short flags: {arg}"))
            });
            i += 1;
            continue;
        }
        let bytes = arg.as_bytes();
        let mut k = 1usize;
        let mut consumed_next = false;
        while k < bytes.len() {
            let flag = format!("-{}", bytes[k] as char);
            let Some(&idx) = lookup.get(&flag) else {
                parse_error.get_or_insert_with(|| {
                    ParseError::InvalidArgs(format!("unknown flag: {flag}"))
                });
                k += 1;
                continue;
            };
            if !set.flags[idx].kind.takes_value() {
                // `-n=false` negates a bool flag.
                if bytes.get(k + 1) == Some(&b'=') {
                    record(&mut occurrences, idx, &arg[k + 2..]);
                    break;
                }
                record(&mut occurrences, idx, "true");
                k += 1;
                continue;
            }
            let attached = &arg[k + 1..];
            if !attached.is_empty() {
                record(&mut occurrences, idx, attached.trim_start_matches('='));
            } else if let Some(value) = argv.get(i + 1) {
                record(&mut occurrences, idx, value.as_str());
                consumed_next = true;
            } else {
                parse_error.get_or_insert_with(|| {
                    ParseError::InvalidArgs(format!("missing value for {flag}"))
                });
            }
            break;
        }
        i += if consumed_next { 2 } else { 1 };
    }

    if show_help {
        return Ok(ParseOutcome::Help(help(set)));
    }
    if show_version {
        return Ok(ParseOutcome::Version(version(set)));
    }
    if let Some(err) = parse_error {
        return Err(err);
    }

    let mut m = Matches {
        rest,
        ..Default::default()
    };
    for (idx, spec) in set.flags.iter().enumerate() {
        m.kinds.insert(spec.name.clone(), spec.kind);

        let resolved = if let Some(raws) = occurrences.get(&idx) {
            m.explicit.insert(spec.name.clone());
            Some(resolve_explicit(spec, raws)?)
        } else if let Some(raw) = spec.env.as_deref().and_then(|key| env_lookup(env, key)) {
            Some(resolve_env(spec, raw)?)
        } else {
            spec.default.clone()
        };

        if let Some(value) = resolved {
            m.values.insert(spec.name.clone(), value);
        }
    }

    Ok(ParseOutcome::Matches(m))
}

/// Validate `argv` against `set`, ignoring the results.
///
/// `--help`/`--version` are treated as valid inputs.
pub fn validate(set: &FlagSet, argv: &[String]) -> ParseResult<()> {
    match parse(set, argv)? {
        ParseOutcome::Matches(_) | ParseOutcome::Help(_) | ParseOutcome::Version(_) => Ok(()),
    }
}
