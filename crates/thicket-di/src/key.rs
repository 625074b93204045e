//! Service keys and discriminator tags

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Discriminator used by keyed registrations
///
/// # Examples
///
/// ```
/// use thicket_di::ServiceTag;
///
/// let tag = ServiceTag::from("sms");
/// assert_eq!(tag.as_str(), "sms");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceTag(Arc<str>);

impl ServiceTag {
	pub fn new(tag: impl Into<Arc<str>>) -> Self {
		Self(tag.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ServiceTag {
	fn from(tag: &str) -> Self {
		Self::new(tag)
	}
}

impl From<String> for ServiceTag {
	fn from(tag: String) -> Self {
		Self::new(tag)
	}
}

impl From<&ServiceTag> for ServiceTag {
	fn from(tag: &ServiceTag) -> Self {
		tag.clone()
	}
}

impl fmt::Display for ServiceTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Identifies a requested capability: a type plus an optional tag
///
/// Two keys are equal when they name the same type and the same tag. The type
/// name is carried only for diagnostics.
///
/// # Examples
///
/// ```
/// use thicket_di::ServiceKey;
///
/// trait Logger: Send + Sync {}
///
/// let default = ServiceKey::of::<dyn Logger>();
/// let sms = ServiceKey::keyed::<dyn Logger>("sms");
///
/// assert_ne!(default, sms);
/// assert_eq!(sms.as_default(), default);
/// ```
#[derive(Clone)]
pub struct ServiceKey {
	type_id: TypeId,
	type_name: &'static str,
	tag: Option<ServiceTag>,
}

impl ServiceKey {
	/// Key of the default (untagged) registration of `T`
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			type_name: type_name::<T>(),
			tag: None,
		}
	}

	/// Key of the registration of `T` published under `tag`
	pub fn keyed<T: ?Sized + 'static>(tag: impl Into<ServiceTag>) -> Self {
		Self {
			tag: Some(tag.into()),
			..Self::of::<T>()
		}
	}

	/// Same type, different tag
	pub fn with_tag(&self, tag: impl Into<ServiceTag>) -> Self {
		Self {
			tag: Some(tag.into()),
			..self.clone()
		}
	}

	/// Same type, no tag
	pub fn as_default(&self) -> Self {
		Self {
			tag: None,
			..self.clone()
		}
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	pub fn tag(&self) -> Option<&ServiceTag> {
		self.tag.as_ref()
	}

	pub fn is_keyed(&self) -> bool {
		self.tag.is_some()
	}

	pub fn is_type<T: ?Sized + 'static>(&self) -> bool {
		self.type_id == TypeId::of::<T>()
	}
}

impl PartialEq for ServiceKey {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id && self.tag == other.tag
	}
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.type_id.hash(state);
		self.tag.hash(state);
	}
}

impl fmt::Display for ServiceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.tag {
			Some(tag) => write!(f, "{}[{}]", self.type_name, tag),
			None => f.write_str(self.type_name),
		}
	}
}

impl fmt::Debug for ServiceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ServiceKey({self})")
	}
}
