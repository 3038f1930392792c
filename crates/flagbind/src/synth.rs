//! Flag synthesis: one [`FlagDeclaration`] per field descriptor.

use flagbind_argparse::value::{
    self, parse_duration, parse_f64, parse_i64, parse_isize, parse_u64, parse_usize,
};
use flagbind_argparse::{FlagSpec, Value};

use crate::descriptor::{BoolPolarity, FieldDescriptor, SemanticType};
use crate::error::{BindError, Result};

/// A flag registration request, handed to the parser's flag set.
pub type FlagDeclaration = FlagSpec;

fn invalid(desc: &FieldDescriptor, literal: &str, reason: String) -> BindError {
    BindError::InvalidDefault {
        flag: desc.name.clone(),
        kind: desc.semantic_type,
        literal: literal.to_string(),
        reason,
    }
}

/// Parse the raw default with `parse`, if there is one.
fn parse_default<T>(
    desc: &FieldDescriptor,
    parse: fn(&str) -> std::result::Result<T, String>,
    wrap: fn(T) -> Value,
) -> Result<Option<Value>> {
    match desc.raw_default.as_deref() {
        Some(raw) => parse(raw)
            .map(|v| Some(wrap(v)))
            .map_err(|reason| invalid(desc, raw, reason)),
        None => Ok(None),
    }
}

fn default_for(desc: &FieldDescriptor) -> Result<Option<Value>> {
    // Duration first: it is numeric underneath but has its own literal grammar.
    match desc.semantic_type {
        SemanticType::Duration => parse_default(desc, parse_duration, Value::Duration),
        SemanticType::String => Ok(desc.raw_default.clone().map(Value::String)),
        SemanticType::Bool => Ok(match desc.bool_polarity {
            BoolPolarity::Inverted => Some(Value::Bool(true)),
            BoolPolarity::Standard => None,
        }),
        SemanticType::Float64 => parse_default(desc, parse_f64, Value::Float64),
        SemanticType::Int => parse_default(desc, parse_isize, Value::Int),
        SemanticType::Int64 => parse_default(desc, parse_i64, Value::Int64),
        SemanticType::Uint => parse_default(desc, parse_usize, Value::Uint),
        SemanticType::Uint64 => parse_default(desc, parse_u64, Value::Uint64),
        SemanticType::Sequence(_) => match desc.raw_default.as_deref() {
            Some(raw) => value::parse_value(desc.semantic_type.value_kind(), raw)
                .map(Some)
                .map_err(|reason| invalid(desc, raw, reason)),
            None => Ok(None),
        },
        SemanticType::Value { type_name } => {
            let Some(handle) = desc.new_value() else {
                return Err(invalid(
                    desc,
                    desc.raw_default.as_deref().unwrap_or_default(),
                    format!("no way to instantiate `{type_name}`"),
                ));
            };
            if let Some(raw) = desc.raw_default.as_deref() {
                handle.set(raw).map_err(|reason| invalid(desc, raw, reason))?;
            }
            Ok(Some(Value::Generic(handle)))
        }
    }
}

/// Build the flag declaration for one descriptor.
pub fn synthesize(desc: &FieldDescriptor) -> Result<FlagDeclaration> {
    let decl = FlagSpec {
        name: desc.name.clone(),
        aliases: desc.aliases.clone(),
        usage: desc.usage.clone(),
        env: desc.env.clone(),
        hidden: desc.hidden,
        kind: desc.semantic_type.value_kind(),
        default: default_for(desc)?,
    };
    tracing::debug!(
        flag = %decl.name,
        kind = %decl.kind,
        hidden = decl.hidden,
        env = ?decl.env,
        field = desc.field,
        "synthesized flag declaration"
    );
    Ok(decl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ElementType;
    use flagbind_argparse::ValueKind;
    use std::time::Duration;

    fn desc(semantic_type: SemanticType, raw: Option<&str>) -> FieldDescriptor {
        FieldDescriptor {
            field: "f",
            name: "flag".to_string(),
            aliases: vec!["f".to_string()],
            semantic_type,
            usage: "some flag".to_string(),
            env: Some("FLAG".to_string()),
            hidden: true,
            raw_default: raw.map(str::to_string),
            bool_polarity: BoolPolarity::Standard,
            index: 0,
            factory: None,
        }
    }

    #[test]
    fn copies_names_usage_env_and_hidden() {
        let decl = synthesize(&desc(SemanticType::String, Some(":0003"))).unwrap();
        assert_eq!(decl.name, "flag");
        assert_eq!(decl.aliases, ["f"]);
        assert_eq!(decl.usage, "some flag");
        assert_eq!(decl.env.as_deref(), Some("FLAG"));
        assert!(decl.hidden);
        assert_eq!(decl.kind, ValueKind::String);
        assert_eq!(decl.default, Some(Value::String(":0003".into())));
    }

    #[test]
    fn duration_default_uses_duration_grammar() {
        let decl = synthesize(&desc(SemanticType::Duration, Some("1m30s"))).unwrap();
        assert_eq!(decl.default, Some(Value::Duration(Duration::from_secs(90))));

        let err = synthesize(&desc(SemanticType::Duration, Some("90"))).unwrap_err();
        assert!(matches!(err, BindError::InvalidDefault { .. }), "{err}");
    }

    #[test]
    fn numeric_defaults_parse_or_fail() {
        let decl = synthesize(&desc(SemanticType::Uint64, Some("0x10"))).unwrap();
        assert_eq!(decl.default, Some(Value::Uint64(16)));

        let decl = synthesize(&desc(SemanticType::Float64, Some("0.5"))).unwrap();
        assert_eq!(decl.default, Some(Value::Float64(0.5)));

        let decl = synthesize(&desc(SemanticType::Int, None)).unwrap();
        assert_eq!(decl.default, None);

        let err = synthesize(&desc(SemanticType::Uint, Some("-3"))).unwrap_err();
        match err {
            BindError::InvalidDefault { flag, literal, .. } => {
                assert_eq!(flag, "flag");
                assert_eq!(literal, "-3");
            }
            other => panic!("expected InvalidDefault, got: {other:?}"),
        }
    }

    #[test]
    fn bool_polarity_picks_the_default() {
        let mut inverted = desc(SemanticType::Bool, Some("true"));
        inverted.bool_polarity = BoolPolarity::Inverted;
        let decl = synthesize(&inverted).unwrap();
        assert_eq!(decl.kind, ValueKind::Bool);
        assert_eq!(decl.default, Some(Value::Bool(true)));

        let decl = synthesize(&desc(SemanticType::Bool, Some("false"))).unwrap();
        assert_eq!(decl.default, None);
    }

    #[test]
    fn sequence_defaults_keep_order() {
        let seq = SemanticType::Sequence(ElementType::Int64);
        let decl = synthesize(&desc(seq, Some("1000,200, 3000"))).unwrap();
        assert_eq!(decl.kind, ValueKind::Int64Seq);
        assert_eq!(decl.default, Some(Value::Int64Seq(vec![1000, 200, 3000])));

        let seq = SemanticType::Sequence(ElementType::String);
        let decl = synthesize(&desc(seq, Some("a, b"))).unwrap();
        assert_eq!(
            decl.default,
            Some(Value::StringSeq(vec!["a".into(), "b".into()]))
        );

        let seq = SemanticType::Sequence(ElementType::Int);
        assert!(synthesize(&desc(seq, Some("1,two"))).is_err());
    }
}
