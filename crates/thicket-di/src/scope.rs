//! Lifetime scopes
//!
//! A [`LifetimeScope`] is a node in the tree rooted at the container. It caches
//! shared instances bound to it, tracks owned disposables and tears everything
//! down (descendants first, then its own instances in reverse activation order)
//! when it is disposed.

use crate::container::ContainerCore;
use crate::dispose::TrackedDisposal;
use crate::interceptor::{self, ScopeBeginning};
use crate::registration::RegistrationId;
use crate::resolver;
use crate::{ComponentRegistry, DiError, DiResult, DisposalFailure, Instance, OpenGeneric};
use crate::{Parameter, Parameters, Registration, ServiceKey, ServiceTag, Sharing};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

/// Tag identifying a lifetime scope
///
/// The root scope is tagged with the configured root tag (`"root"` by
/// default); child scopes are anonymous unless a tag is given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeTag {
	Named(Arc<str>),
	Anonymous(u64),
}

impl ScopeTag {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self::Named(name.into())
	}

	/// Whether this is a named tag equal to `name`
	pub fn is(&self, name: &str) -> bool {
		matches!(self, Self::Named(tag) if &**tag == name)
	}
}

impl From<&str> for ScopeTag {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for ScopeTag {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

impl fmt::Display for ScopeTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Named(name) => f.write_str(name),
			Self::Anonymous(id) => write!(f, "scope#{id}"),
		}
	}
}

/// Lifecycle of a scope; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScopeState {
	Active = 0,
	Disposing = 1,
	Disposed = 2,
}

impl ScopeState {
	fn from_u8(value: u8) -> Self {
		match value {
			0 => Self::Active,
			1 => Self::Disposing,
			_ => Self::Disposed,
		}
	}
}

pub(crate) struct ScopeInner {
	id: u64,
	tag: ScopeTag,
	core: Arc<ContainerCore>,
	parent: Option<Weak<ScopeInner>>,
	root: Weak<ScopeInner>,
	state: AtomicU8,
	shared: Mutex<HashMap<RegistrationId, Arc<OnceCell<Instance>>>>,
	disposables: Mutex<Vec<TrackedDisposal>>,
	children: Mutex<Vec<Arc<ScopeInner>>>,
}

impl ScopeInner {
	fn state(&self) -> ScopeState {
		ScopeState::from_u8(self.state.load(Ordering::Acquire))
	}

	/// Moves `Active -> Disposing`; `false` if someone else got there first
	fn begin_disposal(&self) -> bool {
		self.state
			.compare_exchange(
				ScopeState::Active as u8,
				ScopeState::Disposing as u8,
				Ordering::AcqRel,
				Ordering::Acquire,
			)
			.is_ok()
	}

	fn dispose_into(&self, failures: &mut Vec<DisposalFailure>) -> bool {
		if !self.begin_disposal() {
			return false;
		}
		tracing::debug!(scope = %self.tag, id = self.id, "disposing lifetime scope");

		let children = std::mem::take(&mut *self.children.lock());
		for child in children.iter().rev() {
			child.dispose_into(failures);
		}

		let tracked = std::mem::take(&mut *self.disposables.lock());
		for entry in tracked.into_iter().rev() {
			let service = entry.service;
			if let Err(error) = entry.run() {
				tracing::warn!(scope = %self.tag, service, error = %error, "disposer failed");
				failures.push(DisposalFailure {
					service: service.to_string(),
					error,
				});
			}
		}

		self.shared.lock().clear();
		self.state
			.store(ScopeState::Disposed as u8, Ordering::Release);
		true
	}
}

/// Handle to a lifetime scope
///
/// Cloning the handle does not create a new scope. The scope tree owns child
/// scopes, so dropping a handle does not end the scope; call
/// [`dispose`](Self::dispose) (or drop the [`Owned`](crate::Owned) /
/// [`Container`](crate::Container) that owns it).
#[derive(Clone)]
pub struct LifetimeScope {
	inner: Arc<ScopeInner>,
}

impl LifetimeScope {
	pub(crate) fn new_root(core: Arc<ContainerCore>) -> Self {
		let id = core.next_scope_id();
		let tag = ScopeTag::new(core.config.root_tag.as_str());
		let inner = Arc::new_cyclic(|root| ScopeInner {
			id,
			tag,
			core,
			parent: None,
			root: root.clone(),
			state: AtomicU8::new(ScopeState::Active as u8),
			shared: Mutex::new(HashMap::new()),
			disposables: Mutex::new(Vec::new()),
			children: Mutex::new(Vec::new()),
		});
		Self { inner }
	}

	pub fn id(&self) -> u64 {
		self.inner.id
	}

	pub fn tag(&self) -> &ScopeTag {
		&self.inner.tag
	}

	pub fn state(&self) -> ScopeState {
		self.inner.state()
	}

	pub fn is_disposed(&self) -> bool {
		self.state() != ScopeState::Active
	}

	pub fn is_root(&self) -> bool {
		self.inner.parent.is_none()
	}

	pub fn parent(&self) -> Option<LifetimeScope> {
		self.inner
			.parent
			.as_ref()
			.and_then(Weak::upgrade)
			.map(|inner| Self { inner })
	}

	/// Number of live child scopes
	pub fn child_count(&self) -> usize {
		self.inner.children.lock().len()
	}

	pub fn registry(&self) -> &ComponentRegistry {
		&self.inner.core.registry
	}

	pub(crate) fn core(&self) -> &Arc<ContainerCore> {
		&self.inner.core
	}

	pub(crate) fn ensure_active(&self) -> DiResult<()> {
		match self.state() {
			ScopeState::Active => Ok(()),
			_ => Err(self.disposed_error()),
		}
	}

	fn disposed_error(&self) -> DiError {
		DiError::ScopeDisposed {
			scope: self.tag().to_string(),
		}
	}

	pub(crate) fn root_scope(&self) -> DiResult<LifetimeScope> {
		self.inner
			.root
			.upgrade()
			.map(|inner| Self { inner })
			.ok_or_else(|| self.disposed_error())
	}

	/// The nearest scope, starting with this one, tagged with `tag`
	pub(crate) fn matching_scope(&self, tag: &ScopeTag) -> Option<LifetimeScope> {
		let mut current = Some(self.clone());
		while let Some(scope) = current {
			if scope.tag() == tag {
				return Some(scope);
			}
			current = scope.parent();
		}
		None
	}

	/// Scope that owns instances of `registration` when resolved from here
	pub(crate) fn activation_scope_for(
		&self,
		registration: &Registration,
		key: &ServiceKey,
	) -> DiResult<LifetimeScope> {
		match registration.sharing() {
			Sharing::Transient | Sharing::PerLifetimeScope => Ok(self.clone()),
			Sharing::SingleInstance => self.root_scope(),
			Sharing::PerMatchingScope(tag) => {
				self.matching_scope(tag)
					.ok_or_else(|| DiError::NoMatchingScope {
						tag: tag.to_string(),
						service: key.to_string(),
					})
			}
		}
	}

	pub(crate) fn shared_slot(&self, id: RegistrationId) -> Arc<OnceCell<Instance>> {
		self.inner
			.shared
			.lock()
			.entry(id)
			.or_insert_with(|| Arc::new(OnceCell::new()))
			.clone()
	}

	/// Takes ownership of `instance` for disposal, returning the tracking id.
	///
	/// A scope that is no longer active disposes the instance right away and
	/// rejects it.
	pub(crate) fn track(
		&self,
		registration: &Registration,
		instance: &Instance,
	) -> DiResult<Option<u64>> {
		let Some(disposer) = registration.disposer().filter(|_| registration.is_tracked()) else {
			return Ok(None);
		};
		let entry = TrackedDisposal {
			id: self.inner.core.next_disposal_id(),
			service: registration.limit_type(),
			instance: instance.clone(),
			disposer: disposer.clone(),
		};

		let rejected = {
			let mut disposables = self.inner.disposables.lock();
			if self.state() == ScopeState::Active {
				let id = entry.id;
				disposables.push(entry);
				return Ok(Some(id));
			}
			entry
		};

		if let Err(error) = rejected.run() {
			tracing::warn!(
				scope = %self.tag(),
				service = registration.limit_type(),
				error = %error,
				"disposer failed for instance created during disposal"
			);
		}
		Err(self.disposed_error())
	}

	/// Removes a tracked disposal without running it
	pub(crate) fn untrack(&self, id: u64) -> Option<TrackedDisposal> {
		let mut disposables = self.inner.disposables.lock();
		let position = disposables.iter().position(|entry| entry.id == id)?;
		Some(disposables.remove(position))
	}

	/// Number of instances waiting to be disposed with this scope
	pub fn tracked_count(&self) -> usize {
		self.inner.disposables.lock().len()
	}

	/// Starts an anonymous child scope.
	///
	/// # Examples
	///
	/// ```
	/// use thicket_di::ContainerBuilder;
	///
	/// let container = ContainerBuilder::new().build();
	/// let scope = container.begin_lifetime_scope().unwrap();
	///
	/// assert!(!scope.is_root());
	/// assert_eq!(container.child_count(), 1);
	///
	/// scope.dispose().unwrap();
	/// assert_eq!(container.child_count(), 0);
	/// ```
	pub fn begin_lifetime_scope(&self) -> DiResult<LifetimeScope> {
		let tag = ScopeTag::Anonymous(self.inner.core.next_scope_id());
		self.begin_child(tag)
	}

	pub fn begin_lifetime_scope_tagged(&self, tag: impl Into<ScopeTag>) -> DiResult<LifetimeScope> {
		self.begin_child(tag.into())
	}

	fn begin_child(&self, tag: ScopeTag) -> DiResult<LifetimeScope> {
		self.ensure_active()?;
		interceptor::notify(&self.inner.core, |interceptor| {
			interceptor.scope_beginning(&ScopeBeginning { parent: self, tag: &tag })
		})?;

		let id = match tag {
			ScopeTag::Anonymous(id) => id,
			ScopeTag::Named(_) => self.inner.core.next_scope_id(),
		};
		let inner = Arc::new(ScopeInner {
			id,
			tag,
			core: self.inner.core.clone(),
			parent: Some(Arc::downgrade(&self.inner)),
			root: self.inner.root.clone(),
			state: AtomicU8::new(ScopeState::Active as u8),
			shared: Mutex::new(HashMap::new()),
			disposables: Mutex::new(Vec::new()),
			children: Mutex::new(Vec::new()),
		});

		let mut children = self.inner.children.lock();
		self.ensure_active()?;
		children.push(inner.clone());
		tracing::debug!(parent = %self.tag(), scope = %inner.tag, "lifetime scope started");
		Ok(Self { inner })
	}

	/// Ends the scope: child scopes first, then every owned instance in reverse
	/// activation order. Disposer failures are collected and reported together.
	/// Disposing twice is a no-op.
	pub fn dispose(&self) -> DiResult<()> {
		let mut failures = Vec::new();
		if !self.inner.dispose_into(&mut failures) {
			return Ok(());
		}
		if let Some(parent) = self.inner.parent.as_ref().and_then(Weak::upgrade) {
			parent
				.children
				.lock()
				.retain(|child| !Arc::ptr_eq(child, &self.inner));
		}
		if failures.is_empty() {
			Ok(())
		} else {
			Err(DiError::Disposal {
				scope: self.tag().to_string(),
				failures,
			})
		}
	}

	/// Resolves the default registration of `T`.
	///
	/// # Examples
	///
	/// ```
	/// use thicket_di::ContainerBuilder;
	///
	/// struct Engine {
	///     power: u32,
	/// }
	///
	/// let mut builder = ContainerBuilder::new();
	/// builder.register(|_, _| Ok(Engine { power: 100 }));
	/// let container = builder.build();
	///
	/// assert_eq!(container.resolve::<Engine>().unwrap().power, 100);
	/// ```
	pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		self.resolve_key(&ServiceKey::of::<T>(), Parameters::new())
	}

	/// Resolves `T` with call-site parameters
	pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
		&self,
		parameters: impl IntoIterator<Item = Parameter>,
	) -> DiResult<Arc<T>> {
		self.resolve_key(&ServiceKey::of::<T>(), parameters.into_iter().collect())
	}

	/// Resolves the registration of `T` published under `tag`
	pub fn resolve_keyed<T: ?Sized + Send + Sync + 'static>(
		&self,
		tag: impl Into<ServiceTag>,
	) -> DiResult<Arc<T>> {
		self.resolve_key(&ServiceKey::keyed::<T>(tag), Parameters::new())
	}

	pub fn resolve_keyed_with<T: ?Sized + Send + Sync + 'static>(
		&self,
		tag: impl Into<ServiceTag>,
		parameters: impl IntoIterator<Item = Parameter>,
	) -> DiResult<Arc<T>> {
		self.resolve_key(
			&ServiceKey::keyed::<T>(tag),
			parameters.into_iter().collect(),
		)
	}

	pub fn resolve_key<T: ?Sized + Send + Sync + 'static>(
		&self,
		key: &ServiceKey,
		parameters: Parameters,
	) -> DiResult<Arc<T>> {
		resolver::resolve_service(self, key, parameters)?.downcast::<T>()
	}

	/// `Ok(None)` when `T` is not registered; other failures still surface
	pub fn resolve_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
		if !self.is_registered::<T>() {
			return Ok(None);
		}
		self.resolve::<T>().map(Some)
	}

	/// Every default registration of `T`, in registration order.
	///
	/// An empty list is not an error.
	pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
		resolver::resolve_all(self, &ServiceKey::of::<T>())?
			.iter()
			.map(Instance::downcast::<T>)
			.collect()
	}

	/// Resolves the closed form `F::Service<A>` of an open-generic family
	pub fn resolve_generic<F, A>(&self) -> DiResult<Arc<F::Service<A>>>
	where
		F: OpenGeneric,
		A: Send + Sync + 'static,
	{
		let registration = self.registry().close_generic::<F, A>()?;
		let key = ServiceKey::of::<F::Service<A>>();
		resolver::resolve_registration(self, &key, &registration, Parameters::new())?
			.downcast::<F::Service<A>>()
	}

	pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
		self.registry().is_registered(&ServiceKey::of::<T>())
	}

	pub fn is_registered_keyed<T: ?Sized + 'static>(&self, tag: impl Into<ServiceTag>) -> bool {
		self.registry()
			.is_registered(&ServiceKey::keyed::<T>(tag))
	}
}

impl fmt::Debug for LifetimeScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LifetimeScope")
			.field("id", &self.inner.id)
			.field("tag", &self.inner.tag)
			.field("state", &self.state())
			.finish()
	}
}

impl PartialEq for LifetimeScope {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for LifetimeScope {}
