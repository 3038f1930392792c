//! Bind a typed configuration record to command-line flags.
//!
//! A schema declares its fields once ([`Schema::bind`]). From that table the
//! crate synthesizes flag declarations for [`flagbind_argparse`] and, after
//! parsing, hydrates the record from the parsed values.
//!
//! # Example
//!
//! ```
//! use flagbind::argparse::{FlagSet, ParseOutcome, parse_with_env};
//! use flagbind::{Bindings, Schema};
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Config {
//!     listen: String,
//!     keepalive: Duration,
//!     nocomp: bool,
//! }
//!
//! impl Schema for Config {
//!     fn bind(b: &mut Bindings<Self>) {
//!         b.field("listen", |c| &mut c.listen).name("listen,l").value(":29900");
//!         b.field("keepalive", |c| &mut c.keepalive).name("keepalive").value("10s");
//!         b.field("nocomp", |c| &mut c.nocomp).name("nocomp").value("true");
//!     }
//! }
//!
//! let mut set = FlagSet::new("client");
//! set.flags(flagbind::synthesize_flags::<Config>().unwrap());
//!
//! let argv = vec!["-l".to_string(), ":4000".to_string(), "--nocomp=false".to_string()];
//! let ParseOutcome::Matches(m) = parse_with_env(&set, &argv, &[]).unwrap() else {
//!     unreachable!()
//! };
//!
//! let mut config = Config::default();
//! flagbind::hydrate(&mut config, &m).unwrap();
//! assert_eq!(config.listen, ":4000");
//! assert_eq!(config.keepalive, Duration::from_secs(10));
//! assert!(!config.nocomp);
//! ```

pub mod context;
pub mod descriptor;
pub mod error;
mod hydrate;
pub mod schema;
pub mod synth;
pub mod tag;

pub use flagbind_argparse as argparse;
pub use flagbind_argparse::{FlagValue, GenericHandle, Shared, Value, ValueKind};

pub use context::ParseContext;
pub use descriptor::{BoolPolarity, ElementType, FieldDescriptor, SemanticType, extract};
pub use error::{BindError, Result};
pub use schema::{Bindable, Bindings, FieldMeta, Schema};
pub use synth::{FlagDeclaration, synthesize};

/// A schema's descriptors, extracted once and reused for synthesis and
/// hydration.
pub struct Binding<S> {
    bindings: Bindings<S>,
    descriptors: Vec<FieldDescriptor>,
}

impl<S: Schema> Binding<S> {
    pub fn new() -> Result<Self> {
        let bindings = Bindings::<S>::collect();
        let descriptors = descriptor::describe(&bindings)?;
        Ok(Self {
            bindings,
            descriptors,
        })
    }

    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    /// Flag declarations for every named field, in declaration order.
    pub fn flags(&self) -> Result<Vec<FlagDeclaration>> {
        self.descriptors.iter().map(synthesize).collect()
    }

    /// Fill `schema` from `ctx`, field by field in declaration order.
    ///
    /// Stops at the first field that fails.
    pub fn hydrate(&self, schema: &mut S, ctx: &dyn ParseContext) -> Result<()> {
        for desc in &self.descriptors {
            if let Some(slot) = self.bindings.slot(desc.index, schema) {
                hydrate::hydrate_field(desc, slot, ctx)?;
            }
        }
        Ok(())
    }
}

/// Flag declarations for `S`. Call once, before parsing.
pub fn synthesize_flags<S: Schema>() -> Result<Vec<FlagDeclaration>> {
    Binding::<S>::new()?.flags()
}

/// A hook that hydrates `schema` from a populated parse context.
///
/// Metadata errors surface here, before any parsing happens.
pub fn build_hydrator<S: Schema>(
    schema: &mut S,
) -> Result<impl FnMut(&dyn ParseContext) -> Result<()> + '_> {
    let binding = Binding::<S>::new()?;
    Ok(move |ctx: &dyn ParseContext| binding.hydrate(schema, ctx))
}

/// Hydrate `schema` from `ctx` in one shot.
pub fn hydrate<S: Schema>(schema: &mut S, ctx: &dyn ParseContext) -> Result<()> {
    Binding::<S>::new()?.hydrate(schema, ctx)
}
