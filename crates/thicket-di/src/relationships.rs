//! Relationship types
//!
//! Wrappers a component can depend on instead of a plain `Arc<T>`:
//!
//! - [`Factory<T>`] creates instances on demand
//! - [`Lazy<T>`] resolves on first access
//! - [`Owned<T>`] hands the consumer control over the instance's lifetime
//! - [`Index<T>`] looks up keyed registrations
//! - [`Meta<T>`] pairs the instance with its registration metadata

use crate::resolver;
use crate::{DiError, DiResult, LifetimeScope, Metadata, Parameter, Parameters, ServiceKey};
use crate::ServiceTag;
use once_cell::sync::OnceCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

fn require_registered(scope: &LifetimeScope, key: &ServiceKey) -> DiResult<()> {
	if scope.registry().is_registered(key) {
		Ok(())
	} else {
		Err(DiError::ServiceNotRegistered {
			service: key.to_string(),
		})
	}
}

/// Creates a new `T` on each call, from the scope the factory was obtained in
///
/// # Examples
///
/// ```
/// use thicket_di::ContainerBuilder;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// let next = AtomicU32::new(0);
/// let mut builder = ContainerBuilder::new();
/// builder.register(move |_, _| Ok(next.fetch_add(1, Ordering::SeqCst)));
/// let container = builder.build();
///
/// let factory = container.resolve_factory::<u32>().unwrap();
/// assert_eq!(*factory.create().unwrap(), 0);
/// assert_eq!(*factory.create().unwrap(), 1);
/// ```
pub struct Factory<T: ?Sized> {
	scope: LifetimeScope,
	key: ServiceKey,
	_service: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Factory<T> {
	pub(crate) fn for_scope(scope: &LifetimeScope) -> DiResult<Self> {
		let key = ServiceKey::of::<T>();
		require_registered(scope, &key)?;
		Ok(Self {
			scope: scope.clone(),
			key,
			_service: PhantomData,
		})
	}

	pub fn create(&self) -> DiResult<Arc<T>> {
		self.scope.resolve_key(&self.key, Parameters::new())
	}

	pub fn create_with(&self, parameters: impl IntoIterator<Item = Parameter>) -> DiResult<Arc<T>> {
		self.scope
			.resolve_key(&self.key, parameters.into_iter().collect())
	}
}

impl<T: ?Sized> Clone for Factory<T> {
	fn clone(&self) -> Self {
		Self {
			scope: self.scope.clone(),
			key: self.key.clone(),
			_service: PhantomData,
		}
	}
}

impl<T: ?Sized> fmt::Debug for Factory<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Factory").field("service", &self.key).finish()
	}
}

/// Resolves `T` the first time [`get`](Self::get) is called and keeps it
pub struct Lazy<T: ?Sized> {
	scope: LifetimeScope,
	key: ServiceKey,
	value: OnceCell<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Lazy<T> {
	pub(crate) fn for_scope(scope: &LifetimeScope) -> DiResult<Self> {
		let key = ServiceKey::of::<T>();
		require_registered(scope, &key)?;
		Ok(Self {
			scope: scope.clone(),
			key,
			value: OnceCell::new(),
		})
	}

	pub fn get(&self) -> DiResult<Arc<T>> {
		self.value
			.get_or_try_init(|| self.scope.resolve_key(&self.key, Parameters::new()))
			.cloned()
	}

	pub fn is_resolved(&self) -> bool {
		self.value.get().is_some()
	}
}

impl<T: ?Sized> fmt::Debug for Lazy<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lazy")
			.field("service", &self.key)
			.field("resolved", &self.value.get().is_some())
			.finish()
	}
}

/// An instance together with the lifetime scope that owns it.
///
/// Dropping the `Owned` (or calling [`dispose`](Self::dispose)) ends that
/// scope and releases everything resolved for the instance, while shared
/// instances from enclosing scopes are left alone.
///
/// # Examples
///
/// ```
/// use thicket_di::{ContainerBuilder, Dispose};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Session(Arc<AtomicBool>);
///
/// impl Dispose for Session {
///     fn dispose(&self) -> anyhow::Result<()> {
///         self.0.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
/// let mut builder = ContainerBuilder::new();
/// builder.register(move |_, _| Ok(Session(flag.clone()))).disposable();
/// let container = builder.build();
///
/// let session = container.resolve_owned::<Session>().unwrap();
/// assert!(!closed.load(Ordering::SeqCst));
/// drop(session);
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub struct Owned<T: ?Sized> {
	value: Arc<T>,
	scope: Option<LifetimeScope>,
}

impl<T: ?Sized> Owned<T> {
	/// Wraps the outcome of a resolve made inside `child`, ending the child
	/// when the resolve failed
	pub(crate) fn from_child(child: LifetimeScope, resolved: DiResult<Arc<T>>) -> DiResult<Self> {
		match resolved {
			Ok(value) => Ok(Self {
				value,
				scope: Some(child),
			}),
			Err(error) => {
				if let Err(dispose_error) = child.dispose() {
					tracing::warn!(error = %dispose_error, "failed to dispose scope of failed owned resolve");
				}
				Err(error)
			}
		}
	}

	pub fn value(&self) -> &Arc<T> {
		&self.value
	}

	/// Scope that owns the instance, `None` once disposed
	pub fn scope(&self) -> Option<&LifetimeScope> {
		self.scope.as_ref()
	}

	/// Ends the owning scope now, reporting disposer failures
	pub fn dispose(mut self) -> DiResult<()> {
		match self.scope.take() {
			Some(scope) => scope.dispose(),
			None => Ok(()),
		}
	}
}

impl<T: ?Sized> Deref for Owned<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.value
	}
}

impl<T: ?Sized> Drop for Owned<T> {
	fn drop(&mut self) {
		if let Some(scope) = self.scope.take() {
			if let Err(error) = scope.dispose() {
				tracing::warn!(scope = %scope.tag(), error = %error, "failed to dispose owned instance");
			}
		}
	}
}

impl<T: ?Sized> fmt::Debug for Owned<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Owned")
			.field("scope", &self.scope)
			.finish_non_exhaustive()
	}
}

/// Keyed lookup over the registrations of `T`
pub struct Index<T: ?Sized> {
	scope: LifetimeScope,
	_service: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Index<T> {
	pub(crate) fn for_scope(scope: &LifetimeScope) -> Self {
		Self {
			scope: scope.clone(),
			_service: PhantomData,
		}
	}

	pub fn get(&self, tag: impl Into<ServiceTag>) -> DiResult<Arc<T>> {
		self.scope.resolve_keyed::<T>(tag)
	}

	/// `Ok(None)` when nothing is registered under `tag`
	pub fn try_get(&self, tag: impl Into<ServiceTag>) -> DiResult<Option<Arc<T>>> {
		let key = ServiceKey::keyed::<T>(tag);
		if !self.scope.registry().is_registered(&key) {
			return Ok(None);
		}
		self.scope.resolve_key(&key, Parameters::new()).map(Some)
	}

	pub fn contains(&self, tag: impl Into<ServiceTag>) -> bool {
		self.scope.is_registered_keyed::<T>(tag)
	}

	/// Tags with at least one registration, in registration order
	pub fn keys(&self) -> Vec<ServiceTag> {
		self.scope.registry().keys_for::<T>()
	}
}

impl<T: ?Sized> fmt::Debug for Index<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Index")
			.field("service", &std::any::type_name::<T>())
			.finish()
	}
}

/// An instance paired with the metadata of the registration that produced it
pub struct Meta<T: ?Sized> {
	value: Arc<T>,
	metadata: Metadata,
}

impl<T: ?Sized> Meta<T> {
	pub fn value(&self) -> &Arc<T> {
		&self.value
	}

	pub fn metadata(&self) -> &Metadata {
		&self.metadata
	}

	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.metadata.get(key)
	}

	pub fn into_inner(self) -> Arc<T> {
		self.value
	}
}

impl<T: ?Sized> Deref for Meta<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.value
	}
}

impl<T: ?Sized> fmt::Debug for Meta<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Meta")
			.field("metadata", &self.metadata)
			.finish_non_exhaustive()
	}
}

impl LifetimeScope {
	pub fn resolve_factory<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Factory<T>> {
		self.ensure_active()?;
		Factory::for_scope(self)
	}

	pub fn resolve_lazy<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Lazy<T>> {
		self.ensure_active()?;
		Lazy::for_scope(self)
	}

	/// Resolves `T` inside a new child scope owned by the returned wrapper
	pub fn resolve_owned<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Owned<T>> {
		let child = self.begin_lifetime_scope()?;
		let resolved = child.resolve::<T>();
		Owned::from_child(child, resolved)
	}

	pub fn resolve_index<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Index<T>> {
		self.ensure_active()?;
		Ok(Index::for_scope(self))
	}

	/// Resolves the default registration of `T` along with its metadata
	pub fn resolve_meta<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Meta<T>> {
		self.resolve_meta_key(&ServiceKey::of::<T>())
	}

	pub fn resolve_keyed_meta<T: ?Sized + Send + Sync + 'static>(
		&self,
		tag: impl Into<ServiceTag>,
	) -> DiResult<Meta<T>> {
		self.resolve_meta_key(&ServiceKey::keyed::<T>(tag))
	}

	fn resolve_meta_key<T: ?Sized + Send + Sync + 'static>(&self, key: &ServiceKey) -> DiResult<Meta<T>> {
		let registration = self.registry().require(key)?;
		let value = resolver::resolve_registration(self, key, &registration, Parameters::new())?
			.downcast::<T>()?;
		Ok(Meta {
			value,
			metadata: registration.metadata().clone(),
		})
	}

	/// Every default registration of `T` with its metadata, in registration order
	pub fn resolve_all_meta<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Meta<T>>> {
		let key = ServiceKey::of::<T>();
		self.registry()
			.all_for(&key)
			.iter()
			.map(|registration| -> DiResult<Meta<T>> {
				let value =
					resolver::resolve_registration(self, &key, registration, Parameters::new())?
						.downcast::<T>()?;
				Ok(Meta {
					value,
					metadata: registration.metadata().clone(),
				})
			})
			.collect()
	}
}
