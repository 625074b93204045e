//! # Thicket Dependency Injection
//!
//! Inversion-of-control container with explicit lifetime scopes.
//!
//! ## Features
//!
//! - **Registrations**: factories, existing instances, keyed services and
//!   open-generic families
//! - **Sharing**: per dependency, per lifetime scope, per tagged scope, or a
//!   single instance for the whole container
//! - **Disposal**: owned instances are released in reverse activation order
//!   when their scope ends
//! - **Parameters**: named, typed and computed values supplied at resolve time
//! - **Relationships**: `Factory<T>`, `Lazy<T>`, `Owned<T>`, `Index<T>`,
//!   `Meta<T>` and enumeration of every registration of a service
//! - **Interception**: hooks on scope creation and instance lookup, including
//!   a guard against resolving scoped components from the root
//!
//! ## Example
//!
//! ```rust
//! use thicket_di::{ContainerBuilder, Parameter};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct SmsLogger {
//!     phone_number: Arc<String>,
//! }
//!
//! impl Logger for SmsLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("sms to {}: {}", self.phone_number, message)
//!     }
//! }
//!
//! struct Notifier {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register_arc::<dyn Logger, _>(|ctx, _| {
//!         let phone_number = ctx.argument::<String>("phone_number")?;
//!         Ok(Arc::new(SmsLogger { phone_number }) as Arc<dyn Logger>)
//!     })
//!     .with_parameter(Parameter::named("phone_number", "555-0100".to_string()))
//!     .instance_per_lifetime_scope();
//! builder.register(|ctx, _| Ok(Notifier { logger: ctx.resolve()? }));
//! let container = builder.build();
//!
//! let scope = container.begin_lifetime_scope().unwrap();
//! let notifier = scope.resolve::<Notifier>().unwrap();
//! assert_eq!(notifier.logger.log("hi"), "sms to 555-0100: hi");
//! scope.dispose().unwrap();
//! ```

mod activator;
pub mod config;
pub mod container;
pub mod context;
pub mod dispose;
pub mod error;
pub mod guard;
pub mod instance;
pub mod interceptor;
pub mod key;
pub mod parameter;
pub mod registration;
pub mod registry;
pub mod relationships;
mod resolver;
pub mod scope;

pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder, GenericRegistrationBuilder};
pub use context::ResolveContext;
pub use dispose::Dispose;
pub use error::{DiError, DiResult, DisposalFailure};
pub use guard::{ALLOW_ROOT_LIFETIME_SCOPE, RootScopeGuard};
pub use instance::Instance;
pub use interceptor::{InstanceLookup, ResolveInterceptor, ResolveOperationBeginning, ScopeBeginning};
pub use key::{ServiceKey, ServiceTag};
pub use parameter::{Parameter, ParameterInfo, Parameters};
pub use registration::{Metadata, Ownership, Registration, RegistrationBuilder, RegistrationId, Sharing};
pub use registry::{ComponentRegistry, OpenGeneric};
pub use relationships::{Factory, Index, Lazy, Meta, Owned};
pub use scope::{LifetimeScope, ScopeState, ScopeTag};
