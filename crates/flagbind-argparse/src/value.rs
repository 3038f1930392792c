//! Typed flag values and the literal grammar shared by argv, env and defaults.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A user-defined flag value container.
///
/// The parser calls [`FlagValue::set`] for every occurrence of the flag and
/// renders the current value through `Display`.
pub trait FlagValue: fmt::Display {
    fn set(&mut self, text: &str) -> Result<(), String>;
}

/// A shared, mutable flag value.
pub type Shared<T> = Rc<RefCell<T>>;

/// Handle to one generic value instance.
///
/// Clones share the same instance; the parser mutates it in place and the
/// host reads it back through [`GenericHandle::downcast`].
#[derive(Clone)]
pub struct GenericHandle {
    value: Rc<RefCell<dyn FlagValue>>,
    any: Rc<dyn Any>,
}

impl GenericHandle {
    pub fn new<T: FlagValue + 'static>(value: Shared<T>) -> Self {
        Self {
            value: value.clone(),
            any: value,
        }
    }

    pub fn set(&self, text: &str) -> Result<(), String> {
        self.value.borrow_mut().set(text)
    }

    /// Recover the concrete shared instance, if it has type `T`.
    pub fn downcast<T: FlagValue + 'static>(&self) -> Option<Shared<T>> {
        self.any.clone().downcast::<RefCell<T>>().ok()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.any, &other.any)
    }
}

impl fmt::Display for GenericHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.borrow())
    }
}

impl fmt::Debug for GenericHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GenericHandle")
            .field(&self.value.borrow().to_string())
            .finish()
    }
}

impl PartialEq for GenericHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// The kind of value a flag holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Bool,
    Float64,
    Int,
    Int64,
    Uint,
    Uint64,
    Duration,
    IntSeq,
    Int64Seq,
    StringSeq,
    Generic,
}

impl ValueKind {
    /// Whether the flag consumes an argument (`--name VALUE`).
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::Bool)
    }

    pub fn is_seq(self) -> bool {
        matches!(self, Self::IntSeq | Self::Int64Seq | Self::StringSeq)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Float64 => "float64",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint64 => "uint64",
            Self::Duration => "duration",
            Self::IntSeq => "[]int",
            Self::Int64Seq => "[]int64",
            Self::StringSeq => "[]string",
            Self::Generic => "generic",
        }
    }

    /// Placeholder shown in help, e.g. `--mtu <INT>`.
    pub fn value_name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Bool => "BOOL",
            Self::Float64 => "FLOAT",
            Self::Int | Self::Int64 => "INT",
            Self::Uint | Self::Uint64 => "UINT",
            Self::Duration => "DURATION",
            Self::IntSeq | Self::Int64Seq => "INT,...",
            Self::StringSeq => "STRING,...",
            Self::Generic => "VALUE",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed flag value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Float64(f64),
    Int(isize),
    Int64(i64),
    Uint(usize),
    Uint64(u64),
    Duration(Duration),
    IntSeq(Vec<isize>),
    Int64Seq(Vec<i64>),
    StringSeq(Vec<String>),
    Generic(GenericHandle),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Bool(_) => ValueKind::Bool,
            Self::Float64(_) => ValueKind::Float64,
            Self::Int(_) => ValueKind::Int,
            Self::Int64(_) => ValueKind::Int64,
            Self::Uint(_) => ValueKind::Uint,
            Self::Uint64(_) => ValueKind::Uint64,
            Self::Duration(_) => ValueKind::Duration,
            Self::IntSeq(_) => ValueKind::IntSeq,
            Self::Int64Seq(_) => ValueKind::Int64Seq,
            Self::StringSeq(_) => ValueKind::StringSeq,
            Self::Generic(_) => ValueKind::Generic,
        }
    }

    /// Append the elements of another sequence of the same kind.
    ///
    /// Returns `false` when either side is not a sequence or the kinds differ.
    pub(crate) fn extend(&mut self, other: Value) -> bool {
        match (self, other) {
            (Self::IntSeq(a), Self::IntSeq(b)) => a.extend(b),
            (Self::Int64Seq(a), Self::Int64Seq(b)) => a.extend(b),
            (Self::StringSeq(a), Self::StringSeq(b)) => a.extend(b),
            _ => return false,
        }
        true
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Duration(v) => write!(f, "{}", humantime::format_duration(*v)),
            Self::IntSeq(v) => f.write_str(&join(v)),
            Self::Int64Seq(v) => f.write_str(&join(v)),
            Self::StringSeq(v) => f.write_str(&v.join(",")),
            Self::Generic(v) => write!(f, "{v}"),
        }
    }
}

/// Parse a boolean literal.
///
/// Accepts `1 t T true TRUE True` and `0 f F false FALSE False`.
pub fn parse_bool(text: &str) -> Result<bool, String> {
    match text.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(format!("invalid boolean literal '{other}'")),
    }
}

fn split_radix(digits: &str) -> (&str, u32) {
    let lower = digits.get(..2).map(|p| p.to_ascii_lowercase());
    match lower.as_deref() {
        Some("0x") => (&digits[2..], 16),
        Some("0o") => (&digits[2..], 8),
        Some("0b") => (&digits[2..], 2),
        _ => (digits, 10),
    }
}

/// Parse a signed integer literal (decimal, or `0x`/`0o`/`0b` prefixed).
pub fn parse_i64(text: &str) -> Result<i64, String> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (digits, radix) = split_radix(digits);
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(format!("invalid integer literal '{trimmed}'"));
    }
    // Parse the magnitude as u64 so i64::MIN round-trips.
    let magnitude = u64::from_str_radix(digits, radix)
        .map_err(|e| format!("invalid integer literal '{trimmed}': {e}"))?;
    if negative {
        0i64.checked_sub_unsigned(magnitude)
            .ok_or_else(|| format!("integer literal '{trimmed}' out of range"))
    } else {
        i64::try_from(magnitude).map_err(|_| format!("integer literal '{trimmed}' out of range"))
    }
}

/// Parse an unsigned integer literal (decimal, or `0x`/`0o`/`0b` prefixed).
pub fn parse_u64(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let (digits, radix) = split_radix(digits);
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(format!("invalid unsigned integer literal '{trimmed}'"));
    }
    u64::from_str_radix(digits, radix)
        .map_err(|e| format!("invalid unsigned integer literal '{trimmed}': {e}"))
}

pub fn parse_isize(text: &str) -> Result<isize, String> {
    let v = parse_i64(text)?;
    isize::try_from(v).map_err(|_| format!("integer literal '{}' out of range", text.trim()))
}

pub fn parse_usize(text: &str) -> Result<usize, String> {
    let v = parse_u64(text)?;
    usize::try_from(v).map_err(|_| format!("integer literal '{}' out of range", text.trim()))
}

pub fn parse_f64(text: &str) -> Result<f64, String> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .map_err(|e| format!("invalid float literal '{trimmed}': {e}"))
}

/// Parse a duration literal such as `1m30s`, `300ms` or `2h 5m`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let trimmed = text.trim();
    humantime::parse_duration(trimmed)
        .map_err(|e| format!("invalid duration literal '{trimmed}': {e}"))
}

/// Split a comma-separated list, trimming every token.
///
/// An empty or all-blank input yields an empty list.
pub fn split_list(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',').map(str::trim).collect()
}

fn parse_seq<T>(text: &str, parse: fn(&str) -> Result<T, String>) -> Result<Vec<T>, String> {
    split_list(text).into_iter().map(parse).collect()
}

/// Convert `text` into a value of `kind`.
///
/// Generic values cannot be built from text alone; they are set through
/// their [`GenericHandle`].
pub fn parse_value(kind: ValueKind, text: &str) -> Result<Value, String> {
    Ok(match kind {
        ValueKind::String => Value::String(text.to_string()),
        ValueKind::Bool => Value::Bool(parse_bool(text)?),
        ValueKind::Float64 => Value::Float64(parse_f64(text)?),
        ValueKind::Int => Value::Int(parse_isize(text)?),
        ValueKind::Int64 => Value::Int64(parse_i64(text)?),
        ValueKind::Uint => Value::Uint(parse_usize(text)?),
        ValueKind::Uint64 => Value::Uint64(parse_u64(text)?),
        ValueKind::Duration => Value::Duration(parse_duration(text)?),
        ValueKind::IntSeq => Value::IntSeq(parse_seq(text, parse_isize)?),
        ValueKind::Int64Seq => Value::Int64Seq(parse_seq(text, parse_i64)?),
        ValueKind::StringSeq => Value::StringSeq(
            split_list(text).into_iter().map(str::to_string).collect(),
        ),
        ValueKind::Generic => {
            return Err("generic values are set through their container".to_string());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Label(String);

    impl fmt::Display for Label {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl FlagValue for Label {
        fn set(&mut self, text: &str) -> Result<(), String> {
            self.0 = text.to_string();
            Ok(())
        }
    }

    #[test]
    fn integer_literals_accept_radix_prefixes() {
        assert_eq!(parse_i64("42"), Ok(42));
        assert_eq!(parse_i64("-0x10"), Ok(-16));
        assert_eq!(parse_i64("0b101"), Ok(5));
        assert_eq!(parse_i64("0o17"), Ok(15));
        assert_eq!(parse_i64("-9223372036854775808"), Ok(i64::MIN));
        assert!(parse_i64("9223372036854775808").is_err());
        assert!(parse_i64("--1").is_err());
        assert!(parse_i64("").is_err());
        assert_eq!(parse_u64("0xff"), Ok(255));
        assert!(parse_u64("-1").is_err());
    }

    #[test]
    fn bool_literals_follow_the_usual_spellings() {
        for t in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(t), Ok(true), "{t}");
        }
        for f in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(f), Ok(false), "{f}");
        }
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn durations_parse_compound_literals() {
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("2m40s"), Ok(Duration::from_secs(160)));
        assert_eq!(parse_duration("300ms"), Ok(Duration::from_millis(300)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn sequences_split_and_trim() {
        assert_eq!(
            parse_value(ValueKind::Int64Seq, "1000, 200 ,3000"),
            Ok(Value::Int64Seq(vec![1000, 200, 3000]))
        );
        assert_eq!(
            parse_value(ValueKind::StringSeq, "a, b"),
            Ok(Value::StringSeq(vec!["a".into(), "b".into()]))
        );
        assert_eq!(parse_value(ValueKind::IntSeq, ""), Ok(Value::IntSeq(vec![])));
        assert!(parse_value(ValueKind::IntSeq, "1,x").is_err());
    }

    #[test]
    fn generic_handle_shares_one_instance() {
        let shared = Rc::new(RefCell::new(Label("a".into())));
        let handle = GenericHandle::new(shared.clone());
        let copy = handle.clone();
        copy.set("b").unwrap();
        assert_eq!(shared.borrow().0, "b");
        assert_eq!(handle.to_string(), "b");

        let back = handle.downcast::<Label>().unwrap();
        assert!(Rc::ptr_eq(&back, &shared));
        assert!(handle.ptr_eq(&copy));
    }

    #[test]
    fn display_renders_lists_and_durations() {
        assert_eq!(Value::IntSeq(vec![1, 2, 3]).to_string(), "1,2,3");
        assert_eq!(Value::Duration(Duration::from_secs(90)).to_string(), "1m 30s");
    }
}
