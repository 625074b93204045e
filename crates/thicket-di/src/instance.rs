//! Type-erased component instances

use crate::{DiError, DiResult};
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased instance
///
/// Stores an `Arc<T>` behind `dyn Any` so unsized capabilities such as
/// `dyn Logger` can be handed around without knowing `T`.
#[derive(Clone)]
pub struct Instance {
	value: Arc<dyn Any + Send + Sync>,
	type_id: TypeId,
	type_name: &'static str,
}

impl Instance {
	/// Erases an `Arc<T>`.
	///
	/// # Examples
	///
	/// ```
	/// use thicket_di::Instance;
	/// use std::sync::Arc;
	///
	/// let instance = Instance::new(Arc::new(42u32));
	/// assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
	/// assert!(instance.downcast::<String>().is_err());
	/// ```
	pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
		Self {
			value: Arc::new(value),
			type_id: TypeId::of::<T>(),
			type_name: type_name::<T>(),
		}
	}

	/// Recovers the `Arc<T>` this instance was built from
	pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		self.value
			.downcast_ref::<Arc<T>>()
			.cloned()
			.ok_or(DiError::TypeMismatch {
				expected: type_name::<T>(),
				found: self.type_name,
			})
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Whether both handles point at the same stored instance
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.value, &other.value)
	}
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instance")
			.field("type", &self.type_name)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	trait Greeter: Send + Sync {
		fn greet(&self) -> String;
	}

	struct English;

	impl Greeter for English {
		fn greet(&self) -> String {
			"hello".into()
		}
	}

	#[rstest]
	fn test_trait_object_round_trip() {
		// Arrange
		let greeter: Arc<dyn Greeter> = Arc::new(English);

		// Act
		let instance = Instance::new(greeter);
		let recovered = instance.downcast::<dyn Greeter>().unwrap();

		// Assert
		assert_eq!(recovered.greet(), "hello");
		assert_eq!(instance.type_id(), TypeId::of::<dyn Greeter>());
	}

	#[rstest]
	fn test_wrong_type_reports_both_names() {
		// Arrange
		let instance = Instance::new(Arc::new(1u8));

		// Act
		let err = instance.downcast::<u16>().unwrap_err();

		// Assert
		assert!(matches!(
			err,
			DiError::TypeMismatch {
				expected: "u16",
				found: "u8"
			}
		));
	}
}
