//! Root scope guard
//!
//! Scoped components resolved directly from the root scope live as long as
//! the container, which usually means a per-request object silently became a
//! singleton. [`RootScopeGuard`] rejects those lookups.

use crate::interceptor::{InstanceLookup, ResolveInterceptor};
use crate::{Container, DiError, DiResult, LifetimeScope, Ownership};

/// Metadata flag that exempts a registration from [`RootScopeGuard`]
pub const ALLOW_ROOT_LIFETIME_SCOPE: &str = "AllowRootLifetimeScope";

fn is_root_tagged(scope: &LifetimeScope) -> bool {
	scope.tag().is(&scope.core().config.root_tag)
}

/// Vetoes shared, container-owned instances whose activation scope carries
/// the root tag
///
/// Single instances, externally owned components and registrations flagged
/// with [`ALLOW_ROOT_LIFETIME_SCOPE`] pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootScopeGuard;

impl ResolveInterceptor for RootScopeGuard {
	fn instance_lookup_beginning(&self, event: &InstanceLookup<'_>) -> DiResult<()> {
		let registration = event.registration;
		let sharing = registration.sharing();

		if registration.ownership() == Ownership::ExternallyOwned
			|| !sharing.is_shared()
			|| sharing.is_root_lifetime()
			|| !is_root_tagged(event.activation_scope)
			|| registration.metadata_flag(ALLOW_ROOT_LIFETIME_SCOPE)
		{
			return Ok(());
		}

		tracing::warn!(
			service = %event.service,
			component = registration.limit_type(),
			"lifetime instance requested from the root scope"
		);
		Err(DiError::InvalidScopeResolution(format!(
			"Cannot resolve a lifetime instance of {} at the root scope.",
			registration.limit_type()
		)))
	}
}

impl Container {
	/// Installs a [`RootScopeGuard`]
	///
	/// # Examples
	///
	/// ```
	/// use thicket_di::{ContainerBuilder, DiError};
	///
	/// struct RequestState;
	///
	/// let mut builder = ContainerBuilder::new();
	/// builder.register(|_, _| Ok(RequestState)).instance_per_lifetime_scope();
	/// let container = builder.build();
	/// container.forbid_lifetime_resolution_at_root();
	///
	/// assert!(matches!(
	///     container.resolve::<RequestState>(),
	///     Err(DiError::InvalidScopeResolution(_))
	/// ));
	///
	/// let scope = container.begin_lifetime_scope().unwrap();
	/// assert!(scope.resolve::<RequestState>().is_ok());
	/// ```
	pub fn forbid_lifetime_resolution_at_root(&self) {
		self.add_interceptor(RootScopeGuard);
	}
}
