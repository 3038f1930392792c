//! Declarative field bindings.
//!
//! A schema lists its fields once in [`Schema::bind`]: a label, a projection
//! to the field and the field's metadata. The projection's target type picks
//! the semantic type, so only [`Bindable`] field types can be bound at all.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

use flagbind_argparse::{FlagValue, GenericHandle, Shared};

use crate::descriptor::{ElementType, SemanticType};

/// A configuration record whose fields bind to flags.
///
/// # Example
///
/// ```
/// use flagbind::{Bindings, Schema};
///
/// #[derive(Default)]
/// struct Config {
///     listen: String,
///     mtu: isize,
/// }
///
/// impl Schema for Config {
///     fn bind(b: &mut Bindings<Self>) {
///         b.field("listen", |c| &mut c.listen)
///             .tag(r#"name:"listen,l" value:":29900" usage:"local listen address""#);
///         b.field("mtu", |c| &mut c.mtu).name("mtu").value("1350");
///     }
/// }
///
/// let flags = flagbind::synthesize_flags::<Config>().unwrap();
/// assert_eq!(flags.len(), 2);
/// ```
pub trait Schema: Sized + 'static {
    fn bind(fields: &mut Bindings<Self>);
}

/// Metadata for one field, set with builder methods or a tag string.
///
/// Builder values take precedence over the same key in the tag.
#[derive(Debug, Clone, Default)]
pub struct FieldMeta {
    pub(crate) tag: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) usage: Option<String>,
    pub(crate) env: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) hidden: Option<String>,
}

impl FieldMeta {
    /// Struct-tag style metadata, e.g. `name:"listen,l" env:"LISTEN"`.
    pub fn tag(&mut self, raw: impl Into<String>) -> &mut Self {
        self.tag = Some(raw.into());
        self
    }

    /// `primary,alias,...`
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn usage(&mut self, usage: impl Into<String>) -> &mut Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn env(&mut self, key: impl Into<String>) -> &mut Self {
        self.env = Some(key.into());
        self
    }

    /// Default literal; its grammar depends on the field type.
    pub fn value(&mut self, literal: impl Into<String>) -> &mut Self {
        self.value = Some(literal.into());
        self
    }

    pub fn hidden(&mut self, hidden: bool) -> &mut Self {
        self.hidden = Some(hidden.to_string());
        self
    }
}

/// Mutable view of one field, tagged by type.
#[doc(hidden)]
pub enum Slot<'a> {
    String(&'a mut String),
    Bool(&'a mut bool),
    Float64(&'a mut f64),
    Int(&'a mut isize),
    Int64(&'a mut i64),
    Uint(&'a mut usize),
    Uint64(&'a mut u64),
    Duration(&'a mut Duration),
    IntSeq(&'a mut Vec<isize>),
    Int64Seq(&'a mut Vec<i64>),
    StringSeq(&'a mut Vec<String>),
    Value(&'a mut dyn ValueSlot),
}

/// Write target for an extensible-value field.
#[doc(hidden)]
pub trait ValueSlot {
    /// Store the shared instance; `false` if it is not this field's type.
    fn assign(&mut self, handle: &GenericHandle) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T: FlagValue + 'static> ValueSlot for Option<Shared<T>> {
    fn assign(&mut self, handle: &GenericHandle) -> bool {
        match handle.downcast::<T>() {
            Some(shared) => {
                *self = Some(shared);
                true
            }
            None => false,
        }
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Field types that can be bound to a flag.
///
/// Implemented for `String`, `bool`, `f64`, `isize`, `i64`, `usize`, `u64`,
/// `Duration`, `Vec<isize>`, `Vec<i64>`, `Vec<String>` and
/// `Option<Shared<T>>` for any `T: FlagValue + Default`.
pub trait Bindable: sealed::Sealed + 'static {
    fn semantic_type() -> SemanticType;

    #[doc(hidden)]
    fn factory() -> Option<fn() -> GenericHandle> {
        None
    }

    #[doc(hidden)]
    fn slot(&mut self) -> Slot<'_>;
}

macro_rules! bindable {
    ($($ty:ty => $slot:ident, $semantic:expr;)*) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Bindable for $ty {
                fn semantic_type() -> SemanticType {
                    $semantic
                }

                fn slot(&mut self) -> Slot<'_> {
                    Slot::$slot(self)
                }
            }
        )*
    };
}

bindable! {
    String => String, SemanticType::String;
    bool => Bool, SemanticType::Bool;
    f64 => Float64, SemanticType::Float64;
    isize => Int, SemanticType::Int;
    i64 => Int64, SemanticType::Int64;
    usize => Uint, SemanticType::Uint;
    u64 => Uint64, SemanticType::Uint64;
    Duration => Duration, SemanticType::Duration;
    Vec<isize> => IntSeq, SemanticType::Sequence(ElementType::Int);
    Vec<i64> => Int64Seq, SemanticType::Sequence(ElementType::Int64);
    Vec<String> => StringSeq, SemanticType::Sequence(ElementType::String);
}

fn new_handle<T: FlagValue + Default + 'static>() -> GenericHandle {
    GenericHandle::new(Rc::new(RefCell::new(T::default())))
}

impl<T: FlagValue + Default + 'static> sealed::Sealed for Option<Shared<T>> {}

impl<T: FlagValue + Default + 'static> Bindable for Option<Shared<T>> {
    fn semantic_type() -> SemanticType {
        SemanticType::Value {
            type_name: std::any::type_name::<T>(),
        }
    }

    fn factory() -> Option<fn() -> GenericHandle> {
        Some(new_handle::<T>)
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Value(self)
    }
}

pub(crate) trait Accessor<S> {
    fn slot<'a>(&self, schema: &'a mut S) -> Slot<'a>;
}

struct Project<F, T> {
    project: F,
    _field: PhantomData<fn() -> T>,
}

impl<S, T, F> Accessor<S> for Project<F, T>
where
    T: Bindable,
    F: Fn(&mut S) -> &mut T,
{
    fn slot<'a>(&self, schema: &'a mut S) -> Slot<'a> {
        (self.project)(schema).slot()
    }
}

pub(crate) struct FieldBinding<S> {
    pub(crate) label: &'static str,
    pub(crate) meta: FieldMeta,
    pub(crate) semantic: SemanticType,
    pub(crate) factory: Option<fn() -> GenericHandle>,
    pub(crate) accessor: Box<dyn Accessor<S>>,
}

/// The binding table of a schema, filled by [`Schema::bind`].
pub struct Bindings<S> {
    fields: Vec<FieldBinding<S>>,
}

impl<S: Schema> Bindings<S> {
    pub(crate) fn collect() -> Self {
        let mut bindings = Self { fields: Vec::new() };
        S::bind(&mut bindings);
        bindings
    }
}

impl<S: 'static> Bindings<S> {
    /// Bind the field reached by `project`; returns its metadata builder.
    pub fn field<T, F>(&mut self, label: &'static str, project: F) -> &mut FieldMeta
    where
        T: Bindable,
        F: Fn(&mut S) -> &mut T + 'static,
    {
        let idx = self.fields.len();
        self.fields.push(FieldBinding {
            label,
            meta: FieldMeta::default(),
            semantic: T::semantic_type(),
            factory: T::factory(),
            accessor: Box::new(Project {
                project,
                _field: PhantomData,
            }),
        });
        &mut self.fields[idx].meta
    }
}

impl<S> Bindings<S> {
    pub(crate) fn fields(&self) -> &[FieldBinding<S>] {
        &self.fields
    }

    pub(crate) fn slot<'a>(&self, index: usize, schema: &'a mut S) -> Option<Slot<'a>> {
        self.fields.get(index).map(|b| b.accessor.slot(schema))
    }
}
