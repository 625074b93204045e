//! # Thicket
//!
//! A dependency-injection container with nested lifetime scopes, keyed
//! services, resolution-time parameters and implicit relationship types.
//!
//! ## Feature Flags
//!
//! - `di` (default) - the container core, re-exported from `thicket-di`
//!
//! ## Quick Start
//!
//! ```rust
//! use thicket::prelude::*;
//!
//! struct Clock;
//!
//! struct Greeter {
//!     clock: std::sync::Arc<Clock>,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register(|_, _| Ok(Clock)).single_instance();
//! builder
//!     .register(|ctx, _| Ok(Greeter { clock: ctx.resolve()? }))
//!     .instance_per_lifetime_scope();
//! let container = builder.build();
//!
//! let request = container.begin_lifetime_scope().unwrap();
//! let greeter = request.resolve::<Greeter>().unwrap();
//! assert!(std::sync::Arc::ptr_eq(
//!     &greeter.clock,
//!     &container.resolve::<Clock>().unwrap()
//! ));
//! request.dispose().unwrap();
//! ```

#[cfg(feature = "di")]
pub use thicket_di as di;

#[cfg(feature = "di")]
pub use thicket_di::{
	Container, ContainerBuilder, ContainerConfig, DiError, DiResult, Dispose, LifetimeScope,
	Parameter, ResolveContext,
};

pub mod prelude {
	#[cfg(feature = "di")]
	pub use thicket_di::{
		Container, ContainerBuilder, ContainerConfig, DiError, DiResult, Dispose, Factory, Index,
		Lazy, LifetimeScope, Meta, OpenGeneric, Owned, Parameter, Parameters, ResolveContext,
		ResolveInterceptor, ScopeTag, ServiceTag,
	};
}
