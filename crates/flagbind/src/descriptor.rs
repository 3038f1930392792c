//! Field descriptors: the normalized view of one bound schema field.

use std::fmt;

use flagbind_argparse::value::parse_bool;
use flagbind_argparse::{GenericHandle, ValueKind};

use crate::error::{BindError, Result};
use crate::schema::{Bindings, FieldBinding, Schema};
use crate::tag::Tag;

/// Element type of a sequence field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Int,
    Int64,
    String,
}

/// What a field holds, independent of how it is spelled in Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    String,
    Bool,
    Float64,
    Int,
    Int64,
    Uint,
    Uint64,
    Duration,
    Sequence(ElementType),
    /// A user type implementing [`FlagValue`](crate::FlagValue).
    Value { type_name: &'static str },
}

impl SemanticType {
    /// The parser-side kind a flag of this type is declared with.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::String => ValueKind::String,
            Self::Bool => ValueKind::Bool,
            Self::Float64 => ValueKind::Float64,
            Self::Int => ValueKind::Int,
            Self::Int64 => ValueKind::Int64,
            Self::Uint => ValueKind::Uint,
            Self::Uint64 => ValueKind::Uint64,
            Self::Duration => ValueKind::Duration,
            Self::Sequence(ElementType::Int) => ValueKind::IntSeq,
            Self::Sequence(ElementType::Int64) => ValueKind::Int64Seq,
            Self::Sequence(ElementType::String) => ValueKind::StringSeq,
            Self::Value { .. } => ValueKind::Generic,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { type_name } => write!(f, "value<{type_name}>"),
            other => f.write_str(other.value_kind().as_str()),
        }
    }
}

/// Default polarity of a boolean flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolPolarity {
    /// `false` unless set.
    #[default]
    Standard,
    /// `true` unless explicitly negated.
    Inverted,
}

/// One schema field plus its metadata.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Label given when the field was bound, used in error messages.
    pub field: &'static str,
    pub name: String,
    pub aliases: Vec<String>,
    pub semantic_type: SemanticType,
    pub usage: String,
    pub env: Option<String>,
    pub hidden: bool,
    pub raw_default: Option<String>,
    pub bool_polarity: BoolPolarity,
    pub(crate) index: usize,
    pub(crate) factory: Option<fn() -> GenericHandle>,
}

impl FieldDescriptor {
    /// Instantiate a fresh generic value for extensible-value fields.
    pub(crate) fn new_value(&self) -> Option<GenericHandle> {
        self.factory.map(|make| make())
    }
}

/// Extract descriptors for `S` in declaration order.
///
/// Fields without a name are skipped.
pub fn extract<S: Schema>() -> Result<Vec<FieldDescriptor>> {
    describe(&Bindings::<S>::collect())
}

pub(crate) fn describe<S>(bindings: &Bindings<S>) -> Result<Vec<FieldDescriptor>> {
    let mut out = Vec::new();
    for (index, binding) in bindings.fields().iter().enumerate() {
        if let Some(desc) = describe_field(index, binding)? {
            out.push(desc);
        }
    }
    Ok(out)
}

fn malformed(field: &str, reason: impl Into<String>) -> BindError {
    BindError::MalformedMetadata {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Split `primary,alias,...`. Returns `None` when the name is absent.
fn split_names(field: &str, raw: &str) -> Result<Option<(String, Vec<String>)>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let mut parts = raw.split(',').map(str::trim);
    let primary = parts.next().unwrap_or_default();
    if primary.is_empty() {
        return Err(malformed(field, format!("name `{raw}` has an empty primary name")));
    }
    let aliases = parts
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some((primary.to_string(), aliases)))
}

fn describe_field<S>(index: usize, binding: &FieldBinding<S>) -> Result<Option<FieldDescriptor>> {
    let field = binding.label;
    let meta = &binding.meta;
    let tag = match meta.tag.as_deref() {
        Some(raw) => Tag::parse(raw).map_err(|reason| malformed(field, reason))?,
        None => Tag::default(),
    };
    let lookup = |explicit: &Option<String>, key: &str| -> Option<String> {
        explicit
            .as_deref()
            .or_else(|| tag.get(key))
            .map(|v| v.trim().to_string())
    };

    let Some((name, aliases)) = split_names(field, &lookup(&meta.name, "name").unwrap_or_default())?
    else {
        return Ok(None);
    };

    let hidden = match lookup(&meta.hidden, "hidden").filter(|h| !h.is_empty()) {
        Some(raw) => parse_bool(&raw).map_err(|reason| malformed(field, reason))?,
        None => false,
    };
    let raw_default = lookup(&meta.value, "value").filter(|v| !v.is_empty());
    let semantic_type = binding.semantic;

    let bool_polarity = match (semantic_type, raw_default.as_deref()) {
        (SemanticType::Bool, Some(raw)) => match parse_bool(raw) {
            Ok(true) => BoolPolarity::Inverted,
            Ok(false) => BoolPolarity::Standard,
            Err(reason) => {
                return Err(BindError::InvalidDefault {
                    flag: name,
                    kind: semantic_type,
                    literal: raw.to_string(),
                    reason,
                });
            }
        },
        _ => BoolPolarity::Standard,
    };

    Ok(Some(FieldDescriptor {
        field,
        name,
        aliases,
        semantic_type,
        usage: lookup(&meta.usage, "usage").unwrap_or_default(),
        env: lookup(&meta.env, "env").filter(|e| !e.is_empty()),
        hidden,
        raw_default,
        bool_polarity,
        index,
        factory: binding.factory,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlagValue, Schema, Shared};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Level(u8);

    impl fmt::Display for Level {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl FlagValue for Level {
        fn set(&mut self, text: &str) -> std::result::Result<(), String> {
            self.0 = text.parse::<u8>().map_err(|e| e.to_string())?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Config {
        listen: String,
        internal: String,
        nocomp: bool,
        timeout: Duration,
        shards: Vec<i64>,
        level: Option<Shared<Level>>,
    }

    impl Schema for Config {
        fn bind(b: &mut Bindings<Self>) {
            b.field("listen", |c| &mut c.listen)
                .tag(r#"name:" listen , l ,," usage:"listen address" env:"LISTEN""#);
            b.field("internal", |c| &mut c.internal);
            b.field("nocomp", |c| &mut c.nocomp)
                .name("nocomp")
                .value("true")
                .hidden(true);
            b.field("timeout", |c| &mut c.timeout)
                .tag(r#"name:"timeout" value:"5s""#)
                .value("1m30s");
            b.field("shards", |c| &mut c.shards).name("shards");
            b.field("level", |c| &mut c.level).name("level,L");
        }
    }

    #[test]
    fn extracts_named_fields_in_order() {
        let descs = extract::<Config>().unwrap();
        let names: Vec<&str> = descs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["listen", "nocomp", "timeout", "shards", "level"]);

        let listen = &descs[0];
        assert_eq!(listen.aliases, ["l"]);
        assert_eq!(listen.usage, "listen address");
        assert_eq!(listen.env.as_deref(), Some("LISTEN"));
        assert_eq!(listen.semantic_type, SemanticType::String);
        assert!(!listen.hidden);
        assert_eq!(listen.index, 0);
    }

    #[test]
    fn builder_values_override_tag_values() {
        let descs = extract::<Config>().unwrap();
        let timeout = descs.iter().find(|d| d.name == "timeout").unwrap();
        assert_eq!(timeout.raw_default.as_deref(), Some("1m30s"));
        assert_eq!(timeout.semantic_type, SemanticType::Duration);
    }

    #[test]
    fn bool_polarity_follows_the_default_literal() {
        let descs = extract::<Config>().unwrap();
        let nocomp = descs.iter().find(|d| d.name == "nocomp").unwrap();
        assert_eq!(nocomp.bool_polarity, BoolPolarity::Inverted);
        assert!(nocomp.hidden);
    }

    #[test]
    fn sequences_and_values_are_classified() {
        let descs = extract::<Config>().unwrap();
        let shards = descs.iter().find(|d| d.name == "shards").unwrap();
        assert_eq!(shards.semantic_type, SemanticType::Sequence(ElementType::Int64));
        let level = descs.iter().find(|d| d.name == "level").unwrap();
        assert!(matches!(level.semantic_type, SemanticType::Value { .. }));
        assert_eq!(level.aliases, ["L"]);
        assert!(level.new_value().is_some());
        assert!(shards.new_value().is_none());
    }

    #[derive(Default)]
    struct EmptyPrimary {
        a: String,
    }

    impl Schema for EmptyPrimary {
        fn bind(b: &mut Bindings<Self>) {
            b.field("a", |c| &mut c.a).name(" ,a");
        }
    }

    #[derive(Default)]
    struct BadTag {
        a: String,
    }

    impl Schema for BadTag {
        fn bind(b: &mut Bindings<Self>) {
            b.field("a", |c| &mut c.a).tag(r#"name:a"#);
        }
    }

    #[derive(Default)]
    struct BadHidden {
        a: String,
    }

    impl Schema for BadHidden {
        fn bind(b: &mut Bindings<Self>) {
            b.field("a", |c| &mut c.a).tag(r#"name:"a" hidden:"sometimes""#);
        }
    }

    #[derive(Default)]
    struct BadBool {
        a: bool,
    }

    impl Schema for BadBool {
        fn bind(b: &mut Bindings<Self>) {
            b.field("a", |c| &mut c.a).name("a").value("maybe");
        }
    }

    #[test]
    fn malformed_metadata_is_reported() {
        for err in [
            extract::<EmptyPrimary>().unwrap_err(),
            extract::<BadTag>().unwrap_err(),
            extract::<BadHidden>().unwrap_err(),
        ] {
            match err {
                BindError::MalformedMetadata { field, .. } => assert_eq!(field, "a"),
                other => panic!("expected MalformedMetadata, got: {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_bool_default_is_reported() {
        match extract::<BadBool>().unwrap_err() {
            BindError::InvalidDefault { flag, literal, .. } => {
                assert_eq!(flag, "a");
                assert_eq!(literal, "maybe");
            }
            other => panic!("expected InvalidDefault, got: {other:?}"),
        }
    }
}
