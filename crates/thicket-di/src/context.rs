//! Context handed to component factories

use crate::activator::resolve_argument;
use crate::resolver::ResolveOperation;
use crate::{DiResult, Factory, Index, Lazy, LifetimeScope, OpenGeneric, Owned, Parameter};
use crate::{Parameters, Registration, ServiceKey, ServiceTag};
use std::fmt;
use std::sync::Arc;

/// View of the container available while a component is being activated.
///
/// Dependencies resolved through the context join the resolve operation of
/// the component that requested them, so circular chains are detected and
/// shared dependencies are looked up from the activation scope.
///
/// # Examples
///
/// ```
/// use thicket_di::ContainerBuilder;
///
/// struct Engine;
/// struct Car {
///     engine: std::sync::Arc<Engine>,
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|_, _| Ok(Engine)).single_instance();
/// builder.register(|ctx, _| Ok(Car { engine: ctx.resolve()? }));
/// let container = builder.build();
///
/// let a = container.resolve::<Car>().unwrap();
/// let b = container.resolve::<Car>().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a.engine, &b.engine));
/// ```
pub struct ResolveContext<'a> {
	scope: &'a LifetimeScope,
	operation: &'a ResolveOperation,
	registration: &'a Registration,
	parameters: &'a Parameters,
}

impl<'a> ResolveContext<'a> {
	pub(crate) fn new(
		scope: &'a LifetimeScope,
		operation: &'a ResolveOperation,
		registration: &'a Registration,
		parameters: &'a Parameters,
	) -> Self {
		Self {
			scope,
			operation,
			registration,
			parameters,
		}
	}

	/// Scope that owns the instance being activated
	pub fn scope(&self) -> &LifetimeScope {
		self.scope
	}

	pub fn registration(&self) -> &Registration {
		self.registration
	}

	/// Call-site parameters followed by registration parameters
	pub fn parameters(&self) -> &Parameters {
		self.parameters
	}

	pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		self.resolve_key(&ServiceKey::of::<T>(), &Parameters::new())
	}

	pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
		&self,
		parameters: impl IntoIterator<Item = Parameter>,
	) -> DiResult<Arc<T>> {
		self.resolve_key(&ServiceKey::of::<T>(), &parameters.into_iter().collect())
	}

	pub fn resolve_keyed<T: ?Sized + Send + Sync + 'static>(
		&self,
		tag: impl Into<ServiceTag>,
	) -> DiResult<Arc<T>> {
		self.resolve_key(&ServiceKey::keyed::<T>(tag), &Parameters::new())
	}

	fn resolve_key<T: ?Sized + Send + Sync + 'static>(
		&self,
		key: &ServiceKey,
		parameters: &Parameters,
	) -> DiResult<Arc<T>> {
		self.operation
			.resolve(self.scope, key, parameters)?
			.downcast::<T>()
	}

	pub fn resolve_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
		if !self.scope.is_registered::<T>() {
			return Ok(None);
		}
		self.resolve::<T>().map(Some)
	}

	pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
		self.operation
			.resolve_all(self.scope, &ServiceKey::of::<T>())?
			.iter()
			.map(|instance| instance.downcast::<T>())
			.collect()
	}

	pub fn resolve_generic<F, A>(&self) -> DiResult<Arc<F::Service<A>>>
	where
		F: OpenGeneric,
		A: Send + Sync + 'static,
	{
		let registration = self.scope.registry().close_generic::<F, A>()?;
		let key = ServiceKey::of::<F::Service<A>>();
		let _guard = self.operation.enter(&key)?;
		self.operation
			.lookup(self.scope, &key, &registration, &Parameters::new())?
			.downcast::<F::Service<A>>()
	}

	/// Constructor argument `name`: a matching parameter if one was supplied,
	/// otherwise the registered service of type `T`.
	pub fn argument<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
		resolve_argument::<T>(self, name)
	}

	/// Named parameter lookup without falling back to the container
	pub fn named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
		self.parameters.named::<T>(name)
	}

	pub fn typed<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		self.parameters.typed::<T>()
	}

	/// Factory creating `T` on demand from the activation scope
	pub fn factory<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Factory<T>> {
		Factory::for_scope(self.scope)
	}

	pub fn lazy<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Lazy<T>> {
		Lazy::for_scope(self.scope)
	}

	/// Resolves `T` inside a fresh child of the activation scope, handing the
	/// caller control over that child's lifetime
	pub fn owned<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Owned<T>> {
		let child = self.scope.begin_lifetime_scope()?;
		let key = ServiceKey::of::<T>();
		let resolved = self
			.operation
			.resolve(&child, &key, &Parameters::new())
			.and_then(|instance| instance.downcast::<T>());
		Owned::from_child(child, resolved)
	}

	pub fn index<T: ?Sized + Send + Sync + 'static>(&self) -> Index<T> {
		Index::for_scope(self.scope)
	}
}

impl fmt::Debug for ResolveContext<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolveContext")
			.field("scope", self.scope)
			.field("component", &self.registration.limit_type())
			.field("depth", &self.operation.depth())
			.finish()
	}
}
