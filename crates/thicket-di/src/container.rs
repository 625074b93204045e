//! Container construction

use crate::interceptor::ResolveInterceptor;
use crate::registration::{FactoryFn, PendingRegistration};
use crate::registry::GenericRegistration;
use crate::{ComponentRegistry, ContainerConfig, DiResult, Instance, LifetimeScope, OpenGeneric};
use crate::{Parameter, Parameters, RegistrationBuilder, ResolveContext, ScopeTag, Sharing};
use parking_lot::RwLock;
use std::any::type_name;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// State shared by every scope of one container
pub(crate) struct ContainerCore {
	pub(crate) registry: ComponentRegistry,
	pub(crate) interceptors: RwLock<Vec<Arc<dyn ResolveInterceptor>>>,
	pub(crate) config: ContainerConfig,
	next_scope_id: AtomicU64,
	next_disposal_id: AtomicU64,
}

impl ContainerCore {
	pub(crate) fn next_scope_id(&self) -> u64 {
		self.next_scope_id.fetch_add(1, Ordering::Relaxed)
	}

	pub(crate) fn next_disposal_id(&self) -> u64 {
		self.next_disposal_id.fetch_add(1, Ordering::Relaxed)
	}
}

/// Collects registrations and builds an immutable [`Container`]
///
/// # Examples
///
/// ```
/// use thicket_di::ContainerBuilder;
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn name(&self) -> &'static str;
/// }
///
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn name(&self) -> &'static str {
///         "console"
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register_arc::<dyn Logger, _>(|_, _| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>))
///     .single_instance();
/// let container = builder.build();
///
/// assert_eq!(container.resolve::<dyn Logger>().unwrap().name(), "console");
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
	config: ContainerConfig,
	pending: Vec<PendingRegistration>,
	generics: Vec<GenericRegistration>,
	interceptors: Vec<Arc<dyn ResolveInterceptor>>,
}

impl ContainerBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(config: ContainerConfig) -> Self {
		Self {
			config,
			..Self::default()
		}
	}

	pub fn config(&self) -> &ContainerConfig {
		&self.config
	}

	/// Registers a factory producing `T`
	pub fn register<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_, T>
	where
		T: Send + Sync + 'static,
		F: Fn(&ResolveContext<'_>, &Parameters) -> DiResult<T> + Send + Sync + 'static,
	{
		let factory: FactoryFn = Arc::new(move |ctx: &ResolveContext<'_>, parameters: &Parameters| {
			factory(ctx, parameters).map(|value| Instance::new(Arc::new(value)))
		});
		self.push::<T>(factory)
	}

	/// Registers a factory producing an `Arc<T>`, typically a trait object
	pub fn register_arc<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_, T>
	where
		T: ?Sized + Send + Sync + 'static,
		F: Fn(&ResolveContext<'_>, &Parameters) -> DiResult<Arc<T>> + Send + Sync + 'static,
	{
		let factory: FactoryFn = Arc::new(move |ctx: &ResolveContext<'_>, parameters: &Parameters| {
			factory(ctx, parameters).map(Instance::new)
		});
		self.push::<T>(factory)
	}

	/// Registers an existing instance as a single instance
	pub fn register_instance<T>(&mut self, instance: Arc<T>) -> RegistrationBuilder<'_, T>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		let factory: FactoryFn = Arc::new(move |_: &ResolveContext<'_>, _: &Parameters| {
			Ok(Instance::new(instance.clone()))
		});
		self.push::<T>(factory).single_instance()
	}

	fn push<T: ?Sized + Send + Sync + 'static>(&mut self, factory: FactoryFn) -> RegistrationBuilder<'_, T> {
		let index = self.pending.len();
		self.pending
			.push(PendingRegistration::new::<T>(factory, type_name::<T>()));
		RegistrationBuilder::new(&mut self.pending[index])
	}

	/// Registers an open-generic family; see [`OpenGeneric`]
	pub fn register_generic<F: OpenGeneric>(&mut self) -> GenericRegistrationBuilder<'_> {
		let index = self.generics.len();
		self.generics.push(GenericRegistration::new::<F>());
		GenericRegistrationBuilder {
			generic: &mut self.generics[index],
		}
	}

	pub fn add_interceptor(&mut self, interceptor: impl ResolveInterceptor + 'static) -> &mut Self {
		self.interceptors.push(Arc::new(interceptor));
		self
	}

	pub fn len(&self) -> usize {
		self.pending.len() + self.generics.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn build(self) -> Container {
		let mut registry = ComponentRegistry::new();
		for pending in self.pending {
			registry.register(pending.into_parts());
		}
		for generic in self.generics {
			registry.register_generic(generic);
		}

		tracing::debug!(
			registrations = registry.len(),
			interceptors = self.interceptors.len(),
			root_tag = %self.config.root_tag,
			"container built"
		);

		let core = Arc::new(ContainerCore {
			registry,
			interceptors: RwLock::new(self.interceptors),
			config: self.config,
			next_scope_id: AtomicU64::new(0),
			next_disposal_id: AtomicU64::new(0),
		});
		Container {
			root: LifetimeScope::new_root(core),
		}
	}
}

impl fmt::Debug for ContainerBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContainerBuilder")
			.field("config", &self.config)
			.field("registrations", &self.pending.len())
			.field("generics", &self.generics.len())
			.finish_non_exhaustive()
	}
}

/// Fluent configuration of an open-generic registration
pub struct GenericRegistrationBuilder<'b> {
	generic: &'b mut GenericRegistration,
}

impl GenericRegistrationBuilder<'_> {
	pub fn instance_per_dependency(self) -> Self {
		self.sharing(Sharing::Transient)
	}

	pub fn instance_per_lifetime_scope(self) -> Self {
		self.sharing(Sharing::PerLifetimeScope)
	}

	pub fn instance_per_matching_lifetime_scope(self, tag: impl Into<ScopeTag>) -> Self {
		self.sharing(Sharing::PerMatchingScope(tag.into()))
	}

	pub fn single_instance(self) -> Self {
		self.sharing(Sharing::SingleInstance)
	}

	pub fn sharing(self, sharing: Sharing) -> Self {
		self.generic.sharing = sharing;
		self
	}

	pub fn externally_owned(self) -> Self {
		self.generic.ownership = crate::Ownership::ExternallyOwned;
		self
	}

	pub fn with_metadata(self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.generic.metadata.insert(key.into(), value.into());
		self
	}

	pub fn with_parameter(self, parameter: Parameter) -> Self {
		self.generic.parameters.push(parameter);
		self
	}
}

/// A built container.
///
/// Dereferences to its root [`LifetimeScope`], so everything that can be
/// resolved from a scope can be resolved from the container directly.
pub struct Container {
	root: LifetimeScope,
}

impl Container {
	pub fn builder() -> ContainerBuilder {
		ContainerBuilder::new()
	}

	pub fn root(&self) -> &LifetimeScope {
		&self.root
	}

	pub fn config(&self) -> &ContainerConfig {
		&self.root.core().config
	}

	/// Adds an interceptor after the container was built
	pub fn add_interceptor(&self, interceptor: impl ResolveInterceptor + 'static) {
		self.root
			.core()
			.interceptors
			.write()
			.push(Arc::new(interceptor));
	}
}

impl Deref for Container {
	type Target = LifetimeScope;

	fn deref(&self) -> &LifetimeScope {
		&self.root
	}
}

impl Drop for Container {
	fn drop(&mut self) {
		if !self.root.core().config.dispose_on_drop {
			return;
		}
		if let Err(error) = self.root.dispose() {
			tracing::warn!(error = %error, "failed to dispose container");
		}
	}
}

impl fmt::Debug for Container {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Container")
			.field("root", &self.root)
			.field("registry", self.root.registry())
			.finish()
	}
}
