//! Disposal of owned instances
//!
//! These tests verify that:
//! 1. Instances are disposed in reverse activation order, child scopes first
//! 2. Externally owned instances are never disposed
//! 3. Disposer failures are aggregated without skipping the rest
//! 4. A failed resolve releases the transient disposables it created, but not
//!    those now held by a cached shared instance
//! 5. `Owned<T>` ends its scope when dropped

use parking_lot::Mutex;
use rstest::{fixture, rstest};
use std::sync::Arc;
use thicket_di::{ContainerBuilder, DiError, Dispose, Owned, ScopeState};

type Log = Arc<Mutex<Vec<String>>>;

#[fixture]
fn log() -> Log {
	Arc::new(Mutex::new(Vec::new()))
}

struct Tracked {
	name: &'static str,
	log: Log,
	fail: bool,
}

impl Dispose for Tracked {
	fn dispose(&self) -> anyhow::Result<()> {
		self.log.lock().push(self.name.to_string());
		if self.fail {
			anyhow::bail!("{} refused to close", self.name);
		}
		Ok(())
	}
}

struct Database(Arc<Tracked>);
struct Cache(Arc<Tracked>);
struct Handler {
	_database: Arc<Database>,
	_cache: Arc<Cache>,
}

fn tracked(name: &'static str, log: &Log) -> Tracked {
	Tracked {
		name,
		log: log.clone(),
		fail: false,
	}
}

#[rstest]
fn test_dispose_runs_in_reverse_activation_order(log: Log) {
	// Arrange
	let mut builder = ContainerBuilder::new();
	let database_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("database", &database_log)))
		.keyed("database")
		.instance_per_lifetime_scope()
		.disposable();
	let cache_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("cache", &cache_log)))
		.keyed("cache")
		.instance_per_lifetime_scope()
		.disposable();
	builder.register(|ctx, _| Ok(Database(ctx.resolve_keyed("database")?)));
	builder.register(|ctx, _| Ok(Cache(ctx.resolve_keyed("cache")?)));
	builder.register(|ctx, _| {
		Ok(Handler {
			_database: ctx.resolve()?,
			_cache: ctx.resolve()?,
		})
	});
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	scope.resolve::<Handler>().unwrap();

	// Act
	scope.dispose().unwrap();

	// Assert
	assert_eq!(*log.lock(), vec!["cache", "database"]);
	assert_eq!(scope.state(), ScopeState::Disposed);
}

#[rstest]
fn test_transient_disposables_are_owned_by_resolving_scope(log: Log) {
	// Arrange
	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("transient", &factory_log)))
		.disposable();
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();

	// Act
	scope.resolve::<Tracked>().unwrap();
	scope.resolve::<Tracked>().unwrap();
	let tracked_before = scope.tracked_count();
	scope.dispose().unwrap();

	// Assert
	assert_eq!(tracked_before, 2);
	assert_eq!(log.lock().len(), 2);
	assert_eq!(container.tracked_count(), 0);
}

#[rstest]
fn test_externally_owned_instances_are_not_disposed(log: Log) {
	// Arrange
	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("external", &factory_log)))
		.instance_per_lifetime_scope()
		.disposable()
		.externally_owned();
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	scope.resolve::<Tracked>().unwrap();

	// Act
	scope.dispose().unwrap();

	// Assert
	assert!(log.lock().is_empty());
}

#[rstest]
fn test_disposer_failures_are_aggregated(log: Log) {
	// Arrange
	let mut builder = ContainerBuilder::new();
	for (tag, fail) in [("a", true), ("b", false), ("c", true)] {
		let factory_log = log.clone();
		builder
			.register(move |_, _| {
				Ok(Tracked {
					name: tag,
					log: factory_log.clone(),
					fail,
				})
			})
			.keyed(tag)
			.instance_per_lifetime_scope()
			.disposable();
	}
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	for tag in ["a", "b", "c"] {
		scope.resolve_keyed::<Tracked>(tag).unwrap();
	}

	// Act
	let result = scope.dispose();

	// Assert
	assert_eq!(*log.lock(), vec!["c", "b", "a"]);
	match result {
		Err(DiError::Disposal { failures, .. }) => {
			let services: Vec<_> = failures.iter().map(|f| f.error.to_string()).collect();
			assert_eq!(services, vec!["c refused to close", "a refused to close"]);
		}
		other => panic!("expected a disposal error, got {other:?}"),
	}
	assert!(scope.is_disposed());
}

#[rstest]
fn test_second_dispose_is_a_no_op(log: Log) {
	// Arrange
	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("once", &factory_log)))
		.instance_per_lifetime_scope()
		.disposable();
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	scope.resolve::<Tracked>().unwrap();

	// Act
	scope.dispose().unwrap();
	scope.dispose().unwrap();

	// Assert
	assert_eq!(log.lock().len(), 1);
}

#[rstest]
fn test_failed_resolve_disposes_transients_it_created(log: Log) {
	// Arrange
	struct Service;

	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("partial", &factory_log)))
		.disposable();
	builder.register(|ctx, _| {
		let _partial = ctx.resolve::<Tracked>()?;
		ctx.resolve::<String>()?;
		Ok(Service)
	});
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();

	// Act
	let result = scope.resolve::<Service>();

	// Assert
	assert!(matches!(result, Err(DiError::ServiceNotRegistered { .. })));
	assert_eq!(*log.lock(), vec!["partial"]);
	assert_eq!(scope.tracked_count(), 0);
}

#[rstest]
fn test_failed_resolve_keeps_dependencies_of_cached_singleton(log: Log) {
	// Arrange
	struct Pool {
		connection: Arc<Tracked>,
	}
	struct Job;

	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("connection", &factory_log)))
		.disposable();
	builder
		.register(|ctx, _| {
			Ok(Pool {
				connection: ctx.resolve()?,
			})
		})
		.single_instance();
	builder.register(|ctx, _| {
		ctx.resolve::<Pool>()?;
		ctx.resolve::<String>()?;
		Ok(Job)
	});
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();

	// Act
	let result = scope.resolve::<Job>();
	let pool = container.resolve::<Pool>().unwrap();

	// Assert
	assert!(matches!(result, Err(DiError::ServiceNotRegistered { .. })));
	assert!(log.lock().is_empty());
	assert_eq!(pool.connection.name, "connection");
	assert_eq!(container.tracked_count(), 1);
	container.dispose().unwrap();
	assert_eq!(*log.lock(), vec!["connection"]);
}

#[rstest]
fn test_owned_releases_its_dependencies_on_drop(log: Log) {
	// Arrange
	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("owned", &factory_log)))
		.instance_per_lifetime_scope()
		.disposable();
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();

	// Act
	let owned: Owned<Tracked> = scope.resolve_owned().unwrap();
	let children_while_alive = scope.child_count();
	drop(owned);

	// Assert
	assert_eq!(children_while_alive, 1);
	assert_eq!(scope.child_count(), 0);
	assert_eq!(*log.lock(), vec!["owned"]);
	assert_eq!(scope.tracked_count(), 0);
}

#[rstest]
fn test_owned_dependency_through_context(log: Log) {
	// Arrange
	struct Worker {
		unit: Mutex<Option<Owned<Tracked>>>,
	}

	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("unit", &factory_log)))
		.instance_per_lifetime_scope()
		.disposable();
	builder.register(|ctx, _| {
		Ok(Worker {
			unit: Mutex::new(Some(ctx.owned::<Tracked>()?)),
		})
	});
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	let worker = scope.resolve::<Worker>().unwrap();

	// Act
	let unit = worker.unit.lock().take().unwrap();
	unit.dispose().unwrap();

	// Assert
	assert_eq!(*log.lock(), vec!["unit"]);
	assert!(!scope.is_disposed());
}

#[rstest]
fn test_release_callback_runs_on_dispose(log: Log) {
	// Arrange
	struct Socket(&'static str);

	let mut builder = ContainerBuilder::new();
	let release_log = log.clone();
	builder
		.register(|_, _| Ok(Socket("tcp")))
		.instance_per_lifetime_scope()
		.on_dispose(move |socket: &Socket| {
			release_log.lock().push(format!("closed {}", socket.0));
			Ok(())
		});
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	scope.resolve::<Socket>().unwrap();

	// Act
	scope.dispose().unwrap();

	// Assert
	assert_eq!(*log.lock(), vec!["closed tcp"]);
}

#[rstest]
fn test_container_drop_disposes_root(log: Log) {
	// Arrange
	let mut builder = ContainerBuilder::new();
	let factory_log = log.clone();
	builder
		.register(move |_, _| Ok(tracked("singleton", &factory_log)))
		.single_instance()
		.disposable();
	let container = builder.build();
	let scope = container.begin_lifetime_scope().unwrap();
	scope.resolve::<Tracked>().unwrap();

	// Act
	drop(container);

	// Assert
	assert_eq!(*log.lock(), vec!["singleton"]);
	assert_eq!(scope.state(), ScopeState::Disposed);
}
