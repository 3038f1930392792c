//! Value hydration: copy parsed values back into schema fields.

use crate::context::ParseContext;
use crate::descriptor::{BoolPolarity, FieldDescriptor};
use crate::error::{BindError, Result};
use crate::schema::Slot;

fn assign<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// Write the value of `desc`'s flag into `slot`.
///
/// Flags the context does not know are skipped and the field keeps its value.
pub(crate) fn hydrate_field(
    desc: &FieldDescriptor,
    slot: Slot<'_>,
    ctx: &dyn ParseContext,
) -> Result<()> {
    let name = desc.name.as_str();
    let Some(found) = ctx.kind_of(name) else {
        tracing::trace!(flag = name, "flag not in parse context, field left untouched");
        return Ok(());
    };
    let expected = desc.semantic_type.value_kind();
    if found != expected {
        return Err(BindError::KindMismatch {
            flag: desc.name.clone(),
            expected,
            found,
        });
    }

    match slot {
        Slot::String(field) => assign(field, ctx.string(name)),
        Slot::Bool(field) => {
            // Must mirror the polarity the flag was declared with.
            let value = match desc.bool_polarity {
                BoolPolarity::Standard => ctx.bool(name),
                BoolPolarity::Inverted => ctx.inverted_bool(name),
            };
            assign(field, value);
        }
        Slot::Float64(field) => assign(field, ctx.float64(name)),
        Slot::Int(field) => assign(field, ctx.int(name)),
        Slot::Int64(field) => assign(field, ctx.int64(name)),
        Slot::Uint(field) => assign(field, ctx.uint(name)),
        Slot::Uint64(field) => assign(field, ctx.uint64(name)),
        Slot::Duration(field) => assign(field, ctx.duration(name)),
        Slot::IntSeq(field) => assign(field, ctx.int_seq(name)),
        Slot::Int64Seq(field) => assign(field, ctx.int64_seq(name)),
        Slot::StringSeq(field) => assign(field, ctx.string_seq(name)),
        Slot::Value(field) => {
            if let Some(handle) = ctx.generic(name) {
                if !field.assign(&handle) {
                    return Err(BindError::ValueTypeMismatch {
                        flag: desc.name.clone(),
                        expected: field.type_name(),
                    });
                }
            }
        }
    }
    tracing::trace!(flag = name, kind = %expected, field = desc.field, "hydrated field");
    Ok(())
}
