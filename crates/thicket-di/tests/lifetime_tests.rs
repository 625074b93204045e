//! Instance sharing across lifetime scopes
//!
//! Covers the four sharing modes:
//! 1. Per dependency - a new instance on every request
//! 2. Per lifetime scope - one instance per resolving scope
//! 3. Per matching scope - one instance per nearest tagged ancestor
//! 4. Single instance - one instance for the container, held by the root

use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use thicket_di::{ContainerBuilder, DiError};

#[derive(Debug)]
struct Counted(usize);

fn counting_builder(configure: impl FnOnce(thicket_di::RegistrationBuilder<'_, Counted>)) -> (ContainerBuilder, Arc<AtomicUsize>) {
	let activations = Arc::new(AtomicUsize::new(0));
	let counter = activations.clone();
	let mut builder = ContainerBuilder::new();
	configure(builder.register(move |_, _| Ok(Counted(counter.fetch_add(1, Ordering::SeqCst)))));
	(builder, activations)
}

#[rstest]
fn test_instance_per_dependency_creates_new_instances() {
	// Arrange
	let (builder, activations) = counting_builder(|r| {
		r.instance_per_dependency();
	});
	let container = builder.build();

	// Act
	let a = container.resolve::<Counted>().unwrap();
	let b = container.resolve::<Counted>().unwrap();

	// Assert
	assert!(!Arc::ptr_eq(&a, &b));
	assert_eq!(activations.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_instance_per_lifetime_scope_is_shared_within_scope_only() {
	// Arrange
	let (builder, activations) = counting_builder(|r| {
		r.instance_per_lifetime_scope();
	});
	let container = builder.build();
	let first = container.begin_lifetime_scope().unwrap();
	let second = container.begin_lifetime_scope().unwrap();

	// Act
	let a1 = first.resolve::<Counted>().unwrap();
	let a2 = first.resolve::<Counted>().unwrap();
	let b = second.resolve::<Counted>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&a1, &a2));
	assert!(!Arc::ptr_eq(&a1, &b));
	assert_eq!(activations.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_nested_scope_gets_its_own_scoped_instance() {
	// Arrange
	let (builder, _) = counting_builder(|r| {
		r.instance_per_lifetime_scope();
	});
	let container = builder.build();
	let outer = container.begin_lifetime_scope().unwrap();
	let inner = outer.begin_lifetime_scope().unwrap();

	// Act
	let from_outer = outer.resolve::<Counted>().unwrap();
	let from_inner = inner.resolve::<Counted>().unwrap();

	// Assert
	assert!(!Arc::ptr_eq(&from_outer, &from_inner));
}

#[rstest]
fn test_single_instance_is_shared_by_every_scope() {
	// Arrange
	let (builder, activations) = counting_builder(|r| {
		r.single_instance();
	});
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	let nested = scope.begin_lifetime_scope().unwrap();

	// Act
	let from_nested = nested.resolve::<Counted>().unwrap();
	nested.dispose().unwrap();
	scope.dispose().unwrap();
	let from_root = container.resolve::<Counted>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&from_nested, &from_root));
	assert_eq!(activations.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_matching_scope_shares_within_tagged_subtree() {
	// Arrange
	let (builder, activations) = counting_builder(|r| {
		r.instance_per_matching_lifetime_scope("request");
	});
	let container = builder.build();
	let request = container.begin_lifetime_scope_tagged("request").unwrap();
	let unit_of_work = request.begin_lifetime_scope().unwrap();
	let other_request = container.begin_lifetime_scope_tagged("request").unwrap();

	// Act
	let a = request.resolve::<Counted>().unwrap();
	let b = unit_of_work.resolve::<Counted>().unwrap();
	let c = other_request.resolve::<Counted>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&a, &b));
	assert!(!Arc::ptr_eq(&a, &c));
	assert_eq!(activations.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_matching_scope_without_tagged_ancestor_fails() {
	// Arrange
	let (builder, _) = counting_builder(|r| {
		r.instance_per_matching_lifetime_scope("request");
	});
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();

	// Act
	let result = scope.resolve::<Counted>();

	// Assert
	match result {
		Err(DiError::NoMatchingScope { tag, .. }) => assert_eq!(tag, "request"),
		other => panic!("expected NoMatchingScope, got {other:?}"),
	}
}

#[rstest]
fn test_shared_dependency_resolves_from_activation_scope() {
	// Arrange
	struct Repository(Arc<Counted>);

	let activations = Arc::new(AtomicUsize::new(0));
	let counter = activations.clone();
	let mut builder = ContainerBuilder::new();
	builder
		.register(move |_, _| Ok(Counted(counter.fetch_add(1, Ordering::SeqCst))))
		.instance_per_lifetime_scope();
	builder
		.register(|ctx, _| Ok(Repository(ctx.resolve()?)))
		.single_instance();
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();

	// Act
	let repository = scope.resolve::<Repository>().unwrap();
	let scoped = scope.resolve::<Counted>().unwrap();
	let root = container.resolve::<Counted>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&repository.0, &root));
	assert!(!Arc::ptr_eq(&repository.0, &scoped));
}

#[rstest]
fn test_single_instance_created_once_under_contention() {
	// Arrange
	let (builder, activations) = counting_builder(|r| {
		r.single_instance();
	});
	let container = Arc::new(builder.build());

	// Act
	let handles: Vec<_> = (0..8)
		.map(|_| {
			let container = container.clone();
			thread::spawn(move || {
				let scope = container.begin_lifetime_scope().unwrap();
				let instance = scope.resolve::<Counted>().unwrap();
				scope.dispose().unwrap();
				instance
			})
		})
		.collect();
	let instances: Vec<Arc<Counted>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	// Assert
	assert_eq!(activations.load(Ordering::SeqCst), 1);
	assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}
