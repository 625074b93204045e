//! Resolve operations
//!
//! One [`ResolveOperation`] spans a top-level resolve call and every nested
//! request its factories make. It owns the resolution stack used for cycle and
//! depth detection, and remembers the disposables it created so a failed
//! operation can release them.
//!
//! Cycles are caught per service key and per registration, since one
//! registration may be reachable under several keys.

use crate::activator;
use crate::interceptor::{self, InstanceLookup, ResolveOperationBeginning};
use crate::{
	DiError, DiResult, Instance, LifetimeScope, Parameters, Registration, RegistrationId, ServiceKey,
};
use std::cell::RefCell;
use std::sync::Arc;

pub(crate) struct ResolveOperation {
	stack: RefCell<Vec<ServiceKey>>,
	max_depth: usize,
	/// Registrations being activated, with the stack index of the key they
	/// were requested under
	activating: RefCell<Vec<(RegistrationId, usize)>>,
	created: RefCell<Vec<(LifetimeScope, u64)>>,
}

/// Pops the resolution stack when dropped
pub(crate) struct StackGuard<'a> {
	operation: &'a ResolveOperation,
}

impl Drop for StackGuard<'_> {
	fn drop(&mut self) {
		self.operation.stack.borrow_mut().pop();
	}
}

/// Ends a registration's activation when dropped
pub(crate) struct ActivationGuard<'a> {
	operation: &'a ResolveOperation,
}

impl Drop for ActivationGuard<'_> {
	fn drop(&mut self) {
		self.operation.activating.borrow_mut().pop();
	}
}

impl ResolveOperation {
	pub(crate) fn new(max_depth: usize) -> Self {
		Self {
			stack: RefCell::new(Vec::new()),
			max_depth,
			activating: RefCell::new(Vec::new()),
			created: RefCell::new(Vec::new()),
		}
	}

	/// Pushes `key` onto the resolution stack.
	///
	/// Fails when `key` is already being resolved by this operation, reporting
	/// the cycle as `A -> B -> A`, or when the stack would exceed the depth
	/// limit.
	pub(crate) fn enter(&self, key: &ServiceKey) -> DiResult<StackGuard<'_>> {
		let mut stack = self.stack.borrow_mut();

		if let Some(start) = stack.iter().position(|pending| pending == key) {
			let mut path: Vec<String> = stack[start..].iter().map(ToString::to_string).collect();
			path.push(key.to_string());
			return Err(DiError::CircularDependency { path });
		}
		if stack.len() >= self.max_depth {
			return Err(DiError::MaxDepthExceeded(self.max_depth));
		}

		stack.push(key.clone());
		Ok(StackGuard { operation: self })
	}

	/// Marks `id` as being activated for the key on top of the stack.
	///
	/// Fails when the same registration is already being activated under
	/// another key, reporting the keys from that request to the current one.
	pub(crate) fn begin_activation(&self, id: RegistrationId) -> DiResult<ActivationGuard<'_>> {
		let stack = self.stack.borrow();
		let mut activating = self.activating.borrow_mut();

		if let Some(&(_, start)) = activating.iter().find(|(pending, _)| *pending == id) {
			let path = stack[start..].iter().map(ToString::to_string).collect();
			return Err(DiError::CircularDependency { path });
		}

		activating.push((id, stack.len().saturating_sub(1)));
		Ok(ActivationGuard { operation: self })
	}

	pub(crate) fn depth(&self) -> usize {
		self.stack.borrow().len()
	}

	pub(crate) fn resolve(
		&self,
		scope: &LifetimeScope,
		key: &ServiceKey,
		parameters: &Parameters,
	) -> DiResult<Instance> {
		let _guard = self.enter(key)?;
		let registration = scope.registry().require(key)?;
		self.lookup(scope, key, &registration, parameters)
	}

	pub(crate) fn resolve_all(&self, scope: &LifetimeScope, key: &ServiceKey) -> DiResult<Vec<Instance>> {
		let _guard = self.enter(key)?;
		let parameters = Parameters::new();
		scope
			.registry()
			.all_for(key)
			.iter()
			.map(|registration| self.lookup(scope, key, registration, &parameters))
			.collect()
	}

	/// Finds or creates the instance of `registration` visible from `scope`
	pub(crate) fn lookup(
		&self,
		scope: &LifetimeScope,
		key: &ServiceKey,
		registration: &Arc<Registration>,
		parameters: &Parameters,
	) -> DiResult<Instance> {
		scope.ensure_active()?;
		let _activation = self.begin_activation(registration.id())?;
		let activation_scope = scope.activation_scope_for(registration, key)?;
		interceptor::notify(scope.core(), |interceptor| {
			interceptor.instance_lookup_beginning(&InstanceLookup {
				service: key,
				registration,
				scope,
				activation_scope: &activation_scope,
				parameters,
			})
		})?;

		if !registration.sharing().is_shared() {
			let instance = activator::activate(self, &activation_scope, registration, parameters)?;
			if let Some(id) = activation_scope.track(registration, &instance)? {
				self.created.borrow_mut().push((activation_scope, id));
			}
			return Ok(instance);
		}

		let slot = activation_scope.shared_slot(registration.id());
		if let Some(instance) = slot.get() {
			tracing::trace!(service = %key, scope = %activation_scope.tag(), "shared instance reused");
			return Ok(instance.clone());
		}
		let mark = self.created.borrow().len();
		let instance = slot
			.get_or_try_init(|| {
				let instance = activator::activate(self, &activation_scope, registration, parameters)?;
				activation_scope.track(registration, &instance)?;
				Ok(instance)
			})?
			.clone();
		// transients created for a cached instance live as long as it does
		self.created.borrow_mut().truncate(mark);
		Ok(instance)
	}

	/// Disposes the transient instances this operation created, newest first
	fn rollback(&self) {
		let created = self.created.take();
		for (scope, id) in created.into_iter().rev() {
			let Some(entry) = scope.untrack(id) else {
				continue;
			};
			let service = entry.service;
			if let Err(error) = entry.run() {
				tracing::warn!(service, error = %error, "disposer failed while rolling back resolve");
			}
		}
	}
}

fn run<R>(
	scope: &LifetimeScope,
	key: &ServiceKey,
	resolve: impl FnOnce(&ResolveOperation) -> DiResult<R>,
) -> DiResult<R> {
	scope.ensure_active()?;
	interceptor::notify(scope.core(), |interceptor| {
		interceptor.resolve_operation_beginning(&ResolveOperationBeginning {
			scope,
			service: key,
		})
	})?;

	let operation = ResolveOperation::new(scope.core().config.max_resolution_depth);
	let result = resolve(&operation);
	if let Err(error) = &result {
		tracing::debug!(service = %key, error = %error, "resolve operation failed");
		operation.rollback();
	}
	result
}

pub(crate) fn resolve_service(
	scope: &LifetimeScope,
	key: &ServiceKey,
	parameters: Parameters,
) -> DiResult<Instance> {
	run(scope, key, |operation| operation.resolve(scope, key, &parameters))
}

pub(crate) fn resolve_all(scope: &LifetimeScope, key: &ServiceKey) -> DiResult<Vec<Instance>> {
	run(scope, key, |operation| operation.resolve_all(scope, key))
}

/// Resolves a registration already selected by the caller
pub(crate) fn resolve_registration(
	scope: &LifetimeScope,
	key: &ServiceKey,
	registration: &Arc<Registration>,
	parameters: Parameters,
) -> DiResult<Instance> {
	run(scope, key, |operation| {
		let _guard = operation.enter(key)?;
		operation.lookup(scope, key, registration, &parameters)
	})
}
