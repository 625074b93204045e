//! Resolution-time parameters
//!
//! Parameters supply values that are not (or should not be) resolved from the
//! container. They are attached either to a registration
//! ([`RegistrationBuilder::with_parameter`]) or to a single resolve call
//! ([`LifetimeScope::resolve_with`]); call-site parameters take precedence.
//!
//! [`RegistrationBuilder::with_parameter`]: crate::RegistrationBuilder::with_parameter
//! [`LifetimeScope::resolve_with`]: crate::LifetimeScope::resolve_with

use crate::{DiResult, Instance, ResolveContext};
use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// Describes the constructor argument a factory is asking for
#[derive(Debug, Clone, Copy)]
pub struct ParameterInfo<'a> {
	/// Argument name
	pub name: &'a str,
	/// Argument type
	pub type_id: TypeId,
	/// Argument type name
	pub type_name: &'static str,
	/// Component being activated
	pub target: &'static str,
}

impl ParameterInfo<'_> {
	pub fn is_type<T: ?Sized + 'static>(&self) -> bool {
		self.type_id == TypeId::of::<T>()
	}
}

type Predicate = Arc<dyn Fn(&ParameterInfo<'_>, &ResolveContext<'_>) -> bool + Send + Sync>;
type Accessor =
	Arc<dyn Fn(&ParameterInfo<'_>, &ResolveContext<'_>) -> DiResult<Instance> + Send + Sync>;

/// A value supplied out-of-band during activation
///
/// # Examples
///
/// ```
/// use thicket_di::{ContainerBuilder, Parameter};
///
/// struct SmsLogger {
///     phone_number: String,
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|ctx, _| {
///     Ok(SmsLogger {
///         phone_number: (*ctx.argument::<String>("phone_number")?).clone(),
///     })
/// });
/// let container = builder.build();
///
/// let logger = container
///     .resolve_with::<SmsLogger>([Parameter::named("phone_number", "12345".to_string())])
///     .unwrap();
/// assert_eq!(logger.phone_number, "12345");
/// ```
#[derive(Clone)]
pub enum Parameter {
	/// Matches an argument by name and type
	Named {
		name: Arc<str>,
		value: Instance,
	},
	/// Matches the first argument of the value's type
	Typed {
		value: Instance,
	},
	/// Matches arguments accepted by a predicate and computes the value lazily
	Resolved {
		predicate: Predicate,
		accessor: Accessor,
	},
}

impl Parameter {
	pub fn named<T: Send + Sync + 'static>(name: impl Into<Arc<str>>, value: T) -> Self {
		Self::named_arc(name, Arc::new(value))
	}

	pub fn named_arc<T: ?Sized + Send + Sync + 'static>(
		name: impl Into<Arc<str>>,
		value: Arc<T>,
	) -> Self {
		Self::Named {
			name: name.into(),
			value: Instance::new(value),
		}
	}

	pub fn typed<T: Send + Sync + 'static>(value: T) -> Self {
		Self::typed_arc(Arc::new(value))
	}

	pub fn typed_arc<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
		Self::Typed {
			value: Instance::new(value),
		}
	}

	/// Builds a parameter from a predicate and a value accessor.
	///
	/// Both closures must be free of side effects the container would have to
	/// know about; the accessor only runs when the predicate accepted.
	///
	/// # Examples
	///
	/// ```
	/// use thicket_di::Parameter;
	///
	/// let parameter = Parameter::resolved(
	///     |info, _| info.is_type::<String>() && info.name == "phone_number",
	///     |_, _| Ok("1234567".to_string()),
	/// );
	/// # let _ = parameter;
	/// ```
	pub fn resolved<P, A, T>(predicate: P, accessor: A) -> Self
	where
		P: Fn(&ParameterInfo<'_>, &ResolveContext<'_>) -> bool + Send + Sync + 'static,
		A: Fn(&ParameterInfo<'_>, &ResolveContext<'_>) -> DiResult<T> + Send + Sync + 'static,
		T: Send + Sync + 'static,
	{
		Self::Resolved {
			predicate: Arc::new(predicate),
			accessor: Arc::new(
				move |info: &ParameterInfo<'_>, ctx: &ResolveContext<'_>| {
					accessor(info, ctx).map(|value| Instance::new(Arc::new(value)))
				},
			),
		}
	}

	/// Returns the value for `info` if this parameter applies to it
	pub(crate) fn supply(
		&self,
		info: &ParameterInfo<'_>,
		ctx: &ResolveContext<'_>,
	) -> Option<DiResult<Instance>> {
		match self {
			Self::Named { name, value } => (&**name == info.name
				&& value.type_id() == info.type_id)
				.then(|| Ok(value.clone())),
			Self::Typed { value } => (value.type_id() == info.type_id).then(|| Ok(value.clone())),
			Self::Resolved {
				predicate,
				accessor,
			} => predicate(info, ctx).then(|| accessor(info, ctx)),
		}
	}
}

impl fmt::Debug for Parameter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Named { name, value } => f
				.debug_struct("Named")
				.field("name", name)
				.field("type", &value.type_name())
				.finish(),
			Self::Typed { value } => f
				.debug_struct("Typed")
				.field("type", &value.type_name())
				.finish(),
			Self::Resolved { .. } => f.write_str("Resolved"),
		}
	}
}

/// Ordered parameter list handed to factories
#[derive(Debug, Clone, Default)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, parameter: Parameter) {
		self.0.push(parameter);
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
		self.0.iter()
	}

	/// Value of the named parameter `name`, if one of type `T` was supplied
	pub fn named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
		self.0.iter().find_map(|parameter| match parameter {
			Parameter::Named { name: n, value } if &**n == name => value.downcast::<T>().ok(),
			_ => None,
		})
	}

	/// Value of the first typed parameter of type `T`
	pub fn typed<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		self.0.iter().find_map(|parameter| match parameter {
			Parameter::Typed { value } => value.downcast::<T>().ok(),
			_ => None,
		})
	}

	/// Call-site parameters followed by registration parameters
	pub(crate) fn merged(&self, fallback: &[Parameter]) -> Self {
		if fallback.is_empty() {
			return self.clone();
		}
		let mut merged = self.0.clone();
		merged.extend(fallback.iter().cloned());
		Self(merged)
	}
}

impl From<Vec<Parameter>> for Parameters {
	fn from(parameters: Vec<Parameter>) -> Self {
		Self(parameters)
	}
}

impl FromIterator<Parameter> for Parameters {
	fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl<'a> IntoIterator for &'a Parameters {
	type Item = &'a Parameter;
	type IntoIter = std::slice::Iter<'a, Parameter>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

pub(crate) fn info_for<'a, T: ?Sized + 'static>(
	name: &'a str,
	target: &'static str,
) -> ParameterInfo<'a> {
	ParameterInfo {
		name,
		type_id: TypeId::of::<T>(),
		type_name: type_name::<T>(),
		target,
	}
}
