//! Component registry
//!
//! Populated by [`ContainerBuilder`](crate::ContainerBuilder) and frozen when
//! the container is built. The only state that changes afterwards is the cache
//! of registrations synthesized from open-generic families.

use crate::registration::{FactoryFn, RegistrationId, RegistrationParts};
use crate::{DiError, DiResult, Instance, Metadata, Ownership, Parameter, Parameters};
use crate::{Registration, ResolveContext, ServiceKey, ServiceTag, Sharing};
use parking_lot::RwLock;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A family of services parameterized by one type argument.
///
/// Registering a family once makes every closed form `Service<A>` resolvable
/// through [`LifetimeScope::resolve_generic`](crate::LifetimeScope::resolve_generic),
/// which synthesizes the concrete registration on first request and caches it.
///
/// A plain `resolve::<F::Service<A>>()` only sees the closed form once
/// `resolve_generic::<F, A>()` has run for that `A`; before that it fails with
/// [`DiError::ServiceNotRegistered`], since the type argument is not known
/// from the key alone.
///
/// # Examples
///
/// ```
/// use thicket_di::{ContainerBuilder, DiResult, OpenGeneric, Parameters, ResolveContext};
/// use std::sync::Arc;
///
/// struct ListFamily;
///
/// impl OpenGeneric for ListFamily {
///     type Service<A: Send + Sync + 'static> = Vec<A>;
///
///     fn activate<A: Send + Sync + 'static>(
///         _ctx: &ResolveContext<'_>,
///         _parameters: &Parameters,
///     ) -> DiResult<Arc<Vec<A>>> {
///         Ok(Arc::new(Vec::new()))
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_generic::<ListFamily>();
/// let container = builder.build();
///
/// let list = container.resolve_generic::<ListFamily, i32>().unwrap();
/// assert!(list.is_empty());
/// ```
pub trait OpenGeneric: Send + Sync + 'static {
	type Service<A: Send + Sync + 'static>: ?Sized + Send + Sync + 'static;

	fn activate<A: Send + Sync + 'static>(
		ctx: &ResolveContext<'_>,
		parameters: &Parameters,
	) -> DiResult<Arc<Self::Service<A>>>;
}

/// Open registration of an [`OpenGeneric`] family
pub(crate) struct GenericRegistration {
	pub(crate) family: TypeId,
	pub(crate) family_name: &'static str,
	pub(crate) sharing: Sharing,
	pub(crate) ownership: Ownership,
	pub(crate) metadata: Metadata,
	pub(crate) parameters: Vec<Parameter>,
}

impl GenericRegistration {
	pub(crate) fn new<F: OpenGeneric>() -> Self {
		Self {
			family: TypeId::of::<F>(),
			family_name: type_name::<F>(),
			sharing: Sharing::default(),
			ownership: Ownership::default(),
			metadata: Metadata::new(),
			parameters: Vec::new(),
		}
	}
}

/// Registration storage keyed by [`ServiceKey`]
#[derive(Default)]
pub struct ComponentRegistry {
	/// Per key, in resolution order (the default comes first)
	by_service: HashMap<ServiceKey, Vec<Arc<Registration>>>,
	/// Every registration in registration order
	all: Vec<Arc<Registration>>,
	generics: HashMap<TypeId, GenericRegistration>,
	closed: RwLock<HashMap<ServiceKey, Arc<Registration>>>,
	next_id: AtomicU64,
}

impl ComponentRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn next_id(&self) -> RegistrationId {
		RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed))
	}

	/// Adds a registration under every key it serves.
	///
	/// A new registration becomes the default for its keys unless it preserves
	/// existing defaults, in which case it is appended after them.
	pub(crate) fn register(&mut self, parts: RegistrationParts) -> Arc<Registration> {
		let registration = Arc::new(Registration::from_parts(self.next_id(), parts));
		for key in registration.services() {
			let list = self.by_service.entry(key.clone()).or_default();
			if registration.preserves_existing_defaults() {
				list.push(registration.clone());
			} else {
				list.insert(0, registration.clone());
			}
		}
		self.all.push(registration.clone());
		registration
	}

	pub(crate) fn register_generic(&mut self, generic: GenericRegistration) {
		self.generics.insert(generic.family, generic);
	}

	/// The registration that wins for `key`, if any
	pub fn default_for(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
		self.by_service
			.get(key)
			.and_then(|list| list.first().cloned())
			.or_else(|| self.closed.read().get(key).cloned())
	}

	/// Like [`default_for`](Self::default_for) but fails when nothing is registered
	pub fn require(&self, key: &ServiceKey) -> DiResult<Arc<Registration>> {
		self.default_for(key)
			.ok_or_else(|| DiError::ServiceNotRegistered {
				service: key.to_string(),
			})
	}

	/// Every registration for `key`, default first
	pub fn find(&self, key: &ServiceKey) -> Vec<Arc<Registration>> {
		match self.by_service.get(key) {
			Some(list) => list.clone(),
			None => self.closed.read().get(key).cloned().into_iter().collect(),
		}
	}

	/// Every registration for `key`, in the order they were registered
	pub fn all_for(&self, key: &ServiceKey) -> Vec<Arc<Registration>> {
		let mut list = self.find(key);
		list.sort_by_key(|registration| registration.id());
		list
	}

	pub fn is_registered(&self, key: &ServiceKey) -> bool {
		self.by_service.contains_key(key) || self.closed.read().contains_key(key)
	}

	/// Tags under which `T` has been registered, in registration order
	pub fn keys_for<T: ?Sized + 'static>(&self) -> Vec<ServiceTag> {
		let type_id = TypeId::of::<T>();
		let mut tags: Vec<(RegistrationId, ServiceTag)> = self
			.by_service
			.iter()
			.filter(|(key, _)| key.type_id() == type_id)
			.filter_map(|(key, list)| {
				let tag = key.tag()?.clone();
				let first = list.iter().map(|r| r.id()).min()?;
				Some((first, tag))
			})
			.collect();
		tags.sort();
		tags.into_iter().map(|(_, tag)| tag).collect()
	}

	pub fn len(&self) -> usize {
		self.all.len() + self.closed.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn registrations(&self) -> &[Arc<Registration>] {
		&self.all
	}

	/// Closes the open family `F` over `A`, synthesizing the concrete
	/// registration on first use.
	pub fn close_generic<F, A>(&self) -> DiResult<Arc<Registration>>
	where
		F: OpenGeneric,
		A: Send + Sync + 'static,
	{
		let key = ServiceKey::of::<F::Service<A>>();
		if let Some(registration) = self.default_for(&key) {
			return Ok(registration);
		}

		let generic =
			self.generics
				.get(&TypeId::of::<F>())
				.ok_or_else(|| DiError::ServiceNotRegistered {
					service: type_name::<F>().to_string(),
				})?;

		let mut closed = self.closed.write();
		let registration = closed.entry(key.clone()).or_insert_with(|| {
			tracing::debug!(
				family = generic.family_name,
				service = %key,
				"closing open generic registration"
			);
			let factory: FactoryFn = Arc::new(|ctx: &ResolveContext<'_>, parameters: &Parameters| {
				F::activate::<A>(ctx, parameters).map(Instance::new)
			});
			Arc::new(Registration::from_parts(
				self.next_id(),
				RegistrationParts {
					limit_type: type_name::<F::Service<A>>(),
					services: vec![key.clone()],
					factory,
					sharing: generic.sharing.clone(),
					ownership: generic.ownership,
					metadata: generic.metadata.clone(),
					parameters: generic.parameters.clone(),
					disposer: None,
					preserve_existing_defaults: false,
				},
			))
		});
		Ok(registration.clone())
	}
}

impl std::fmt::Debug for ComponentRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ComponentRegistry")
			.field("registrations", &self.all.len())
			.field("generics", &self.generics.len())
			.field("closed", &self.closed.read().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::registration::PendingRegistration;
	use rstest::rstest;

	fn parts_for(tag: Option<&str>, preserve: bool) -> RegistrationParts {
		let factory: FactoryFn = Arc::new(|_: &ResolveContext<'_>, _: &Parameters| {
			Ok(Instance::new(Arc::new(0u8)))
		});
		let mut pending = PendingRegistration::new::<u8>(factory, "u8");
		if let Some(tag) = tag {
			pending.tags.push(ServiceTag::from(tag));
		}
		pending.parts.preserve_existing_defaults = preserve;
		pending.into_parts()
	}

	#[rstest]
	fn test_most_recent_registration_wins() {
		// Arrange
		let mut registry = ComponentRegistry::new();
		let first = registry.register(parts_for(None, false));
		let second = registry.register(parts_for(None, false));

		// Act
		let winner = registry.default_for(&ServiceKey::of::<u8>()).unwrap();

		// Assert
		assert_eq!(winner.id(), second.id());
		let order: Vec<_> = registry
			.find(&ServiceKey::of::<u8>())
			.iter()
			.map(|r| r.id())
			.collect();
		assert_eq!(order, vec![second.id(), first.id()]);
	}

	#[rstest]
	fn test_preserve_existing_defaults_appends() {
		// Arrange
		let mut registry = ComponentRegistry::new();
		let first = registry.register(parts_for(None, false));
		let pinned = registry.register(parts_for(None, true));

		// Act
		let winner = registry.default_for(&ServiceKey::of::<u8>()).unwrap();
		let all = registry.all_for(&ServiceKey::of::<u8>());

		// Assert
		assert_eq!(winner.id(), first.id());
		assert_eq!(all.len(), 2);
		assert_eq!(all[1].id(), pinned.id());
	}

	#[rstest]
	fn test_missing_registration_is_reported() {
		// Arrange
		let mut registry = ComponentRegistry::new();
		registry.register(parts_for(Some("sms"), false));

		// Act
		let result = registry.require(&ServiceKey::of::<u8>());

		// Assert
		assert!(matches!(result, Err(DiError::ServiceNotRegistered { .. })));
		assert!(registry.is_registered(&ServiceKey::keyed::<u8>("sms")));
	}

	#[rstest]
	fn test_keys_for_lists_tags_in_registration_order() {
		// Arrange
		let mut registry = ComponentRegistry::new();
		registry.register(parts_for(Some("cmd"), false));
		registry.register(parts_for(Some("sms"), false));
		registry.register(parts_for(None, false));

		// Act
		let tags = registry.keys_for::<u8>();

		// Assert
		assert_eq!(tags, vec![ServiceTag::from("cmd"), ServiceTag::from("sms")]);
	}
}
