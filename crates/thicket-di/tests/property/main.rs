//! Property-based tests for lifetime scopes
//!
//! Uses proptest to verify invariants of the container:
//! 1. Disposal order - every owned instance is disposed once, newest first
//! 2. Scope sharing - scoped instances are created once per resolving scope
//! 3. Default selection - the last non-preserving registration wins
//! 4. Cycle detection - the reported path starts and ends with the same service

use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thicket_di::{ContainerBuilder, DiError, Dispose};

struct Numbered {
	id: usize,
	log: Arc<Mutex<Vec<usize>>>,
}

impl Dispose for Numbered {
	fn dispose(&self) -> anyhow::Result<()> {
		self.log.lock().push(self.id);
		Ok(())
	}
}

// Property 1: Disposal order
// N transient disposables resolved in one scope are disposed in reverse order
proptest! {
	#[test]
	fn prop_disposal_is_reverse_activation_order(count in 0usize..32) {
		let log = Arc::new(Mutex::new(Vec::new()));
		let next = Arc::new(AtomicUsize::new(0));
		let mut builder = ContainerBuilder::new();
		let factory_log = log.clone();
		builder
			.register(move |_, _| {
				Ok(Numbered {
					id: next.fetch_add(1, Ordering::SeqCst),
					log: factory_log.clone(),
				})
			})
			.disposable();
		let container = builder.build();
		let scope = container.begin_lifetime_scope().unwrap();

		for _ in 0..count {
			scope.resolve::<Numbered>().unwrap();
		}
		scope.dispose().unwrap();

		let expected: Vec<usize> = (0..count).rev().collect();
		prop_assert_eq!(&*log.lock(), &expected);
	}
}

// Property 2: Scope sharing
// Resolving a scoped service any number of times creates one instance per scope
proptest! {
	#[test]
	fn prop_scoped_instance_created_once_per_scope(
		resolves in prop::collection::vec(0usize..4, 1..40),
	) {
		let activations = Arc::new(AtomicUsize::new(0));
		let counter = activations.clone();
		let mut builder = ContainerBuilder::new();
		builder
			.register(move |_, _| Ok(counter.fetch_add(1, Ordering::SeqCst)))
			.instance_per_lifetime_scope();
		let container = builder.build();
		let scopes: Vec<_> = (0..4)
			.map(|_| container.begin_lifetime_scope().unwrap())
			.collect();

		for &index in &resolves {
			scopes[index].resolve::<usize>().unwrap();
		}

		let mut used = resolves.clone();
		used.sort_unstable();
		used.dedup();
		prop_assert_eq!(activations.load(Ordering::SeqCst), used.len());
	}
}

// Property 3: Default selection
// The default is the last registration that does not preserve existing defaults,
// and enumeration always returns every registration in registration order
proptest! {
	#[test]
	fn prop_default_is_last_overriding_registration(
		preserve in prop::collection::vec(any::<bool>(), 1..12),
	) {
		let mut builder = ContainerBuilder::new();
		for (index, &preserving) in preserve.iter().enumerate() {
			let registration = builder.register(move |_, _| Ok(index as u64));
			if preserving {
				registration.preserve_existing_defaults();
			}
		}
		let container = builder.build();

		let expected_default = preserve
			.iter()
			.rposition(|&preserving| !preserving)
			.unwrap_or(0) as u64;
		let all: Vec<u64> = container
			.resolve_all::<u64>()
			.unwrap()
			.iter()
			.map(|value| **value)
			.collect();

		prop_assert_eq!(*container.resolve::<u64>().unwrap(), expected_default);
		prop_assert_eq!(all, (0..preserve.len() as u64).collect::<Vec<_>>());
	}
}

struct Node<const N: usize>;

fn ring_error(length: usize) -> DiError {
	let mut builder = ContainerBuilder::new();
	builder.register(move |ctx, _| {
		if length > 1 {
			ctx.resolve::<Node<1>>()?;
		} else {
			ctx.resolve::<Node<0>>()?;
		}
		Ok(Node::<0>)
	});
	builder.register(move |ctx, _| {
		if length > 2 {
			ctx.resolve::<Node<2>>()?;
		} else {
			ctx.resolve::<Node<0>>()?;
		}
		Ok(Node::<1>)
	});
	builder.register(|ctx, _| {
		ctx.resolve::<Node<0>>()?;
		Ok(Node::<2>)
	});
	let container = builder.build();
	match container.resolve::<Node<0>>() {
		Err(error) => error,
		Ok(_) => DiError::Configuration("cycle was not detected".to_string()),
	}
}

// Property 4: Cycle detection
// A ring of length N is reported with N + 1 entries, first equal to last
proptest! {
	#[test]
	fn prop_cycle_path_closes_on_first_service(length in 1usize..=3) {
		match ring_error(length) {
			DiError::CircularDependency { path } => {
				prop_assert_eq!(path.len(), length + 1);
				prop_assert_eq!(path.first(), path.last());
			}
			other => prop_assert!(false, "unexpected error: {}", other),
		}
	}
}
