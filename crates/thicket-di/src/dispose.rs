//! Disposal support for owned instances

use crate::Instance;
use std::sync::Arc;

/// Structured teardown for components owned by a lifetime scope.
///
/// Register a component with [`RegistrationBuilder::disposable`] and its
/// `dispose` runs exactly once when the owning scope ends, in reverse order of
/// activation.
///
/// [`RegistrationBuilder::disposable`]: crate::RegistrationBuilder::disposable
///
/// # Examples
///
/// ```
/// use thicket_di::{ContainerBuilder, Dispose};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Connection {
///     closed: Arc<AtomicBool>,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) -> anyhow::Result<()> {
///         self.closed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(move |_, _| Ok(Connection { closed: flag.clone() }))
///     .instance_per_lifetime_scope()
///     .disposable();
/// let container = builder.build();
///
/// let scope = container.begin_lifetime_scope().unwrap();
/// scope.resolve::<Connection>().unwrap();
/// scope.dispose().unwrap();
///
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync {
	fn dispose(&self) -> anyhow::Result<()>;
}

pub(crate) type Disposer = Arc<dyn Fn(&Instance) -> anyhow::Result<()> + Send + Sync>;

pub(crate) fn disposer_for<T>() -> Disposer
where
	T: ?Sized + Dispose + 'static,
{
	Arc::new(|instance: &Instance| {
		let value = instance.downcast::<T>()?;
		Dispose::dispose(&*value)
	})
}

pub(crate) fn disposer_from_fn<T, F>(release: F) -> Disposer
where
	T: ?Sized + Send + Sync + 'static,
	F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
{
	Arc::new(move |instance: &Instance| {
		let value = instance.downcast::<T>()?;
		release(&*value)
	})
}

/// An instance waiting to be disposed by its scope
pub(crate) struct TrackedDisposal {
	pub(crate) id: u64,
	pub(crate) service: &'static str,
	pub(crate) instance: Instance,
	pub(crate) disposer: Disposer,
}

impl TrackedDisposal {
	pub(crate) fn run(self) -> anyhow::Result<()> {
		(self.disposer)(&self.instance)
	}
}
