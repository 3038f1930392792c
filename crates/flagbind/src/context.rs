//! The typed accessor surface the hydrator reads from.

use std::collections::HashMap;
use std::time::Duration;

use flagbind_argparse::{GenericHandle, Matches, Value, ValueKind};

/// Post-parse state, queried by flag name.
///
/// Accessors return `None` when the flag is unknown or holds another kind.
pub trait ParseContext {
    /// The kind a flag was registered with.
    fn kind_of(&self, name: &str) -> Option<ValueKind>;

    fn string(&self, name: &str) -> Option<String>;
    fn bool(&self, name: &str) -> Option<bool>;
    fn inverted_bool(&self, name: &str) -> Option<bool>;
    fn float64(&self, name: &str) -> Option<f64>;
    fn int(&self, name: &str) -> Option<isize>;
    fn int64(&self, name: &str) -> Option<i64>;
    fn uint(&self, name: &str) -> Option<usize>;
    fn uint64(&self, name: &str) -> Option<u64>;
    fn duration(&self, name: &str) -> Option<Duration>;
    fn int_seq(&self, name: &str) -> Option<Vec<isize>>;
    fn int64_seq(&self, name: &str) -> Option<Vec<i64>>;
    fn string_seq(&self, name: &str) -> Option<Vec<String>>;
    fn generic(&self, name: &str) -> Option<GenericHandle>;
}

impl ParseContext for Matches {
    fn kind_of(&self, name: &str) -> Option<ValueKind> {
        Matches::kind_of(self, name)
    }

    fn string(&self, name: &str) -> Option<String> {
        Matches::string(self, name)
    }

    fn bool(&self, name: &str) -> Option<bool> {
        Matches::bool(self, name)
    }

    fn inverted_bool(&self, name: &str) -> Option<bool> {
        Matches::inverted_bool(self, name)
    }

    fn float64(&self, name: &str) -> Option<f64> {
        Matches::float64(self, name)
    }

    fn int(&self, name: &str) -> Option<isize> {
        Matches::int(self, name)
    }

    fn int64(&self, name: &str) -> Option<i64> {
        Matches::int64(self, name)
    }

    fn uint(&self, name: &str) -> Option<usize> {
        Matches::uint(self, name)
    }

    fn uint64(&self, name: &str) -> Option<u64> {
        Matches::uint64(self, name)
    }

    fn duration(&self, name: &str) -> Option<Duration> {
        Matches::duration(self, name)
    }

    fn int_seq(&self, name: &str) -> Option<Vec<isize>> {
        Matches::int_seq(self, name)
    }

    fn int64_seq(&self, name: &str) -> Option<Vec<i64>> {
        Matches::int64_seq(self, name)
    }

    fn string_seq(&self, name: &str) -> Option<Vec<String>> {
        Matches::string_seq(self, name)
    }

    fn generic(&self, name: &str) -> Option<GenericHandle> {
        Matches::generic(self, name)
    }
}

macro_rules! seeded {
    ($($method:ident: $variant:ident => $ty:ty;)*) => {
        $(
            fn $method(&self, name: &str) -> Option<$ty> {
                match self.get(name)? {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        )*
    };
}

/// A pre-seeded context, e.g. values loaded from somewhere other than argv.
impl ParseContext for HashMap<String, Value> {
    fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.get(name).map(Value::kind)
    }

    seeded! {
        string: String => String;
        bool: Bool => bool;
        inverted_bool: Bool => bool;
        float64: Float64 => f64;
        int: Int => isize;
        int64: Int64 => i64;
        uint: Uint => usize;
        uint64: Uint64 => u64;
        duration: Duration => Duration;
        int_seq: IntSeq => Vec<isize>;
        int64_seq: Int64Seq => Vec<i64>;
        string_seq: StringSeq => Vec<String>;
        generic: Generic => GenericHandle;
    }
}
