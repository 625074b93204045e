//! Component activation

use crate::parameter::info_for;
use crate::resolver::ResolveOperation;
use crate::{DiError, DiResult, Instance, LifetimeScope, Parameters, Registration, ResolveContext};
use crate::ServiceKey;
use std::sync::Arc;

/// Runs the factory of `registration` inside `scope`.
///
/// Registration parameters act as fallbacks for the call-site ones.
pub(crate) fn activate(
	operation: &ResolveOperation,
	scope: &LifetimeScope,
	registration: &Registration,
	parameters: &Parameters,
) -> DiResult<Instance> {
	let parameters = parameters.merged(registration.parameters());
	let ctx = ResolveContext::new(scope, operation, registration, &parameters);

	tracing::debug!(
		component = registration.limit_type(),
		scope = %scope.tag(),
		sharing = ?registration.sharing(),
		"activating component"
	);
	(registration.factory())(&ctx, &parameters)
}

/// Value for the constructor argument `name` of type `T`.
///
/// A matching parameter wins; otherwise the argument is resolved from the
/// container when `T` is registered.
pub(crate) fn resolve_argument<T>(ctx: &ResolveContext<'_>, name: &str) -> DiResult<Arc<T>>
where
	T: ?Sized + Send + Sync + 'static,
{
	let target = ctx.registration().limit_type();
	let info = info_for::<T>(name, target);

	for parameter in ctx.parameters() {
		if let Some(value) = parameter.supply(&info, ctx) {
			return value?.downcast::<T>();
		}
	}

	if ctx.scope().registry().is_registered(&ServiceKey::of::<T>()) {
		return ctx.resolve::<T>();
	}

	Err(DiError::ParameterResolution {
		parameter: name.to_string(),
		parameter_type: info.type_name,
		target: target.to_string(),
	})
}
