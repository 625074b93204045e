//! Resolve pipeline interception
//!
//! Interceptors observe (and may veto) three points of the pipeline: a scope
//! being started, a resolve operation beginning, and a single instance lookup
//! after the activation scope has been chosen. Returning an error aborts the
//! step that triggered the event.

use crate::container::ContainerCore;
use crate::{DiResult, LifetimeScope, Parameters, Registration, ScopeTag, ServiceKey};

/// A child scope is about to be created
#[derive(Debug)]
pub struct ScopeBeginning<'a> {
	pub parent: &'a LifetimeScope,
	pub tag: &'a ScopeTag,
}

/// A top-level resolve request is starting
#[derive(Debug)]
pub struct ResolveOperationBeginning<'a> {
	pub scope: &'a LifetimeScope,
	pub service: &'a ServiceKey,
}

/// An instance is about to be looked up or activated
#[derive(Debug)]
pub struct InstanceLookup<'a> {
	pub service: &'a ServiceKey,
	pub registration: &'a Registration,
	/// Scope the request was made from
	pub scope: &'a LifetimeScope,
	/// Scope that will own the instance
	pub activation_scope: &'a LifetimeScope,
	pub parameters: &'a Parameters,
}

/// Hook into the resolve pipeline.
///
/// Every method defaults to allowing the step.
pub trait ResolveInterceptor: Send + Sync {
	fn scope_beginning(&self, _event: &ScopeBeginning<'_>) -> DiResult<()> {
		Ok(())
	}

	fn resolve_operation_beginning(&self, _event: &ResolveOperationBeginning<'_>) -> DiResult<()> {
		Ok(())
	}

	fn instance_lookup_beginning(&self, _event: &InstanceLookup<'_>) -> DiResult<()> {
		Ok(())
	}
}

/// Runs `event` against every installed interceptor, in installation order.
///
/// The list is snapshotted first so interceptors may resolve from the
/// container or install further interceptors.
pub(crate) fn notify<F>(core: &ContainerCore, event: F) -> DiResult<()>
where
	F: Fn(&dyn ResolveInterceptor) -> DiResult<()>,
{
	let interceptors = {
		let installed = core.interceptors.read();
		if installed.is_empty() {
			return Ok(());
		}
		installed.clone()
	};
	for interceptor in &interceptors {
		event(interceptor.as_ref())?;
	}
	Ok(())
}
