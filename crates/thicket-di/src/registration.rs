//! Component registrations and the fluent registration DSL

use crate::dispose::{Disposer, disposer_for, disposer_from_fn};
use crate::{DiResult, Dispose, Instance, Parameter, Parameters, ResolveContext, ScopeTag};
use crate::{ServiceKey, ServiceTag};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Metadata attached to a registration
pub type Metadata = HashMap<String, serde_json::Value>;

pub(crate) type FactoryFn =
	Arc<dyn Fn(&ResolveContext<'_>, &Parameters) -> DiResult<Instance> + Send + Sync>;

/// How many instances of a component exist
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Sharing {
	/// A new instance for every request
	#[default]
	Transient,
	/// One instance per lifetime scope that resolves it
	PerLifetimeScope,
	/// One instance per nearest scope carrying the tag
	PerMatchingScope(ScopeTag),
	/// One instance for the whole container, held by the root scope
	SingleInstance,
}

impl Sharing {
	pub fn is_shared(&self) -> bool {
		!matches!(self, Self::Transient)
	}

	/// Instances live exactly as long as the root scope
	pub fn is_root_lifetime(&self) -> bool {
		matches!(self, Self::SingleInstance)
	}
}

/// Whether the container disposes instances it created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ownership {
	#[default]
	Owned,
	ExternallyOwned,
}

/// Stable identity of a registration inside one container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub(crate) u64);

/// An immutable component registration
pub struct Registration {
	id: RegistrationId,
	limit_type: &'static str,
	services: Vec<ServiceKey>,
	factory: FactoryFn,
	sharing: Sharing,
	ownership: Ownership,
	metadata: Metadata,
	parameters: Vec<Parameter>,
	disposer: Option<Disposer>,
	preserve_existing_defaults: bool,
}

impl Registration {
	pub fn id(&self) -> RegistrationId {
		self.id
	}

	/// Name of the type produced by the factory
	pub fn limit_type(&self) -> &'static str {
		self.limit_type
	}

	pub fn services(&self) -> &[ServiceKey] {
		&self.services
	}

	pub fn sharing(&self) -> &Sharing {
		&self.sharing
	}

	pub fn ownership(&self) -> Ownership {
		self.ownership
	}

	pub fn metadata(&self) -> &Metadata {
		&self.metadata
	}

	/// Boolean metadata flag, `false` when absent or not a boolean
	pub fn metadata_flag(&self, key: &str) -> bool {
		self.metadata
			.get(key)
			.and_then(serde_json::Value::as_bool)
			.unwrap_or(false)
	}

	pub fn parameters(&self) -> &[Parameter] {
		&self.parameters
	}

	pub fn preserves_existing_defaults(&self) -> bool {
		self.preserve_existing_defaults
	}

	/// Whether activated instances must be tracked for disposal
	pub fn is_tracked(&self) -> bool {
		self.ownership == Ownership::Owned && self.disposer.is_some()
	}

	pub(crate) fn factory(&self) -> &FactoryFn {
		&self.factory
	}

	pub(crate) fn disposer(&self) -> Option<&Disposer> {
		self.disposer.as_ref()
	}

	pub(crate) fn from_parts(id: RegistrationId, parts: RegistrationParts) -> Self {
		Self {
			id,
			limit_type: parts.limit_type,
			services: parts.services,
			factory: parts.factory,
			sharing: parts.sharing,
			ownership: parts.ownership,
			metadata: parts.metadata,
			parameters: parts.parameters,
			disposer: parts.disposer,
			preserve_existing_defaults: parts.preserve_existing_defaults,
		}
	}
}

impl fmt::Debug for Registration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registration")
			.field("id", &self.id)
			.field("limit_type", &self.limit_type)
			.field("services", &self.services)
			.field("sharing", &self.sharing)
			.field("ownership", &self.ownership)
			.field("metadata", &self.metadata)
			.field("preserve_existing_defaults", &self.preserve_existing_defaults)
			.finish_non_exhaustive()
	}
}

/// Registration data collected by the builder before the container is built
pub(crate) struct RegistrationParts {
	pub(crate) limit_type: &'static str,
	pub(crate) services: Vec<ServiceKey>,
	pub(crate) factory: FactoryFn,
	pub(crate) sharing: Sharing,
	pub(crate) ownership: Ownership,
	pub(crate) metadata: Metadata,
	pub(crate) parameters: Vec<Parameter>,
	pub(crate) disposer: Option<Disposer>,
	pub(crate) preserve_existing_defaults: bool,
}

/// Pending registration plus the tags it was published under
pub(crate) struct PendingRegistration {
	pub(crate) parts: RegistrationParts,
	pub(crate) default_key: ServiceKey,
	pub(crate) tags: Vec<ServiceTag>,
	pub(crate) as_default: bool,
}

impl PendingRegistration {
	pub(crate) fn new<T: ?Sized + 'static>(factory: FactoryFn, limit_type: &'static str) -> Self {
		Self {
			parts: RegistrationParts {
				limit_type,
				services: Vec::new(),
				factory,
				sharing: Sharing::default(),
				ownership: Ownership::default(),
				metadata: Metadata::new(),
				parameters: Vec::new(),
				disposer: None,
				preserve_existing_defaults: false,
			},
			default_key: ServiceKey::of::<T>(),
			tags: Vec::new(),
			as_default: false,
		}
	}

	/// Keyed registrations are only reachable through their tags unless
	/// `as_default` was requested as well.
	pub(crate) fn into_parts(mut self) -> RegistrationParts {
		let mut services: Vec<ServiceKey> = self
			.tags
			.iter()
			.map(|tag| self.default_key.with_tag(tag))
			.collect();
		if self.tags.is_empty() || self.as_default {
			services.insert(0, self.default_key.clone());
		}
		self.parts.services = services;
		self.parts
	}
}

/// Fluent configuration of a single registration
///
/// Returned by [`ContainerBuilder::register`] and friends; every method
/// returns the builder so calls can be chained.
///
/// [`ContainerBuilder::register`]: crate::ContainerBuilder::register
pub struct RegistrationBuilder<'b, T: ?Sized> {
	pending: &'b mut PendingRegistration,
	_service: PhantomData<fn() -> Arc<T>>,
}

impl<'b, T> RegistrationBuilder<'b, T>
where
	T: ?Sized + Send + Sync + 'static,
{
	pub(crate) fn new(pending: &'b mut PendingRegistration) -> Self {
		Self {
			pending,
			_service: PhantomData,
		}
	}

	/// Publishes the component under `tag` instead of the default key
	pub fn keyed(self, tag: impl Into<ServiceTag>) -> Self {
		self.pending.tags.push(tag.into());
		self
	}

	/// Keeps the default key in addition to any tags
	pub fn as_default(self) -> Self {
		self.pending.as_default = true;
		self
	}

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
		self.pending.parts.sharing = sharing;
		self
	}

	/// The container never disposes instances of this registration
	pub fn externally_owned(self) -> Self {
		self.pending.parts.ownership = Ownership::ExternallyOwned;
		self
	}

	pub fn owned_by_lifetime_scope(self) -> Self {
		self.pending.parts.ownership = Ownership::Owned;
		self
	}

	pub fn with_metadata(self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.pending.parts.metadata.insert(key.into(), value.into());
		self
	}

	pub fn with_parameter(self, parameter: Parameter) -> Self {
		self.pending.parts.parameters.push(parameter);
		self
	}

	/// Appends this registration after existing defaults instead of
	/// overriding them
	pub fn preserve_existing_defaults(self) -> Self {
		self.pending.parts.preserve_existing_defaults = true;
		self
	}

	/// Tracks instances for disposal through their [`Dispose`] impl
	pub fn disposable(self) -> Self
	where
		T: Dispose,
	{
		self.pending.parts.disposer = Some(disposer_for::<T>());
		self
	}

	/// Tracks instances for disposal through a release callback
	pub fn on_dispose<F>(self, release: F) -> Self
	where
		F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
	{
		self.pending.parts.disposer = Some(disposer_from_fn::<T, F>(release));
		self
	}
}
