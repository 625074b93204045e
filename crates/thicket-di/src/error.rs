//! Error types for registration, resolution and disposal

use std::fmt;

/// Result alias used throughout the container
pub type DiResult<T> = Result<T, DiError>;

/// A single failure recorded while tearing down a lifetime scope
#[derive(Debug)]
pub struct DisposalFailure {
	/// Service whose disposer failed
	pub service: String,
	/// Error returned by the disposer
	pub error: anyhow::Error,
}

impl fmt::Display for DisposalFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.service, self.error)
	}
}

/// Errors raised by the container
#[derive(Debug, thiserror::Error)]
pub enum DiError {
	/// No registration satisfies the requested service
	#[error("No registration found for service {service}")]
	ServiceNotRegistered {
		/// Display form of the requested service key
		service: String,
	},

	/// A constructor parameter could neither be supplied nor resolved
	#[error(
		"Cannot resolve parameter '{parameter}' of type {parameter_type} while activating {target}"
	)]
	ParameterResolution {
		/// Parameter name as requested by the factory
		parameter: String,
		/// Type of the parameter
		parameter_type: &'static str,
		/// Component being activated
		target: String,
	},

	/// The requested service depends on itself
	#[error("Circular dependency detected\n  Path: {}\nThis forms a cycle that cannot be resolved.", .path.join(" -> "))]
	CircularDependency {
		/// Services in traversal order, ending with the repeated one
		path: Vec<String>,
	},

	/// The dependency chain is deeper than the configured limit
	#[error(
		"Maximum resolution depth exceeded: {0}\nThis likely indicates an extremely deep or circular dependency chain."
	)]
	MaxDepthExceeded(usize),

	/// The scope has been (or is being) disposed
	#[error("Lifetime scope {scope} has been disposed")]
	ScopeDisposed {
		/// Tag of the disposed scope
		scope: String,
	},

	/// An interceptor vetoed the lookup
	#[error("{0}")]
	InvalidScopeResolution(String),

	/// No ancestor scope carries the tag a registration is bound to
	#[error("No lifetime scope tagged '{tag}' is visible from the scope resolving {service}")]
	NoMatchingScope {
		/// Tag the registration requires
		tag: String,
		/// Service being resolved
		service: String,
	},

	/// A stored value did not have the requested type
	#[error("Type mismatch: expected {expected}, found {found}")]
	TypeMismatch {
		/// Requested type
		expected: &'static str,
		/// Stored type
		found: &'static str,
	},

	/// A factory failed with its own error
	#[error("Activation of {service} failed: {source}")]
	Activation {
		/// Service being activated
		service: String,
		/// Underlying error
		#[source]
		source: anyhow::Error,
	},

	/// One or more disposers failed while a scope was torn down
	#[error("{} disposal error(s) in lifetime scope {scope}: {}", .failures.len(), join_failures(.failures))]
	Disposal {
		/// Tag of the scope being disposed
		scope: String,
		/// Every failure, in disposal order
		failures: Vec<DisposalFailure>,
	},

	/// Invalid container configuration
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl DiError {
	/// Wraps an arbitrary error raised by a factory.
	///
	/// # Examples
	///
	/// ```
	/// use thicket_di::DiError;
	///
	/// let err = DiError::activation("Engine", std::io::Error::other("no fuel"));
	/// assert!(err.to_string().contains("Engine"));
	/// ```
	pub fn activation(
		service: impl Into<String>,
		source: impl Into<anyhow::Error>,
	) -> Self {
		Self::Activation {
			service: service.into(),
			source: source.into(),
		}
	}

	/// Returns `true` for [`DiError::ServiceNotRegistered`]
	pub fn is_not_registered(&self) -> bool {
		matches!(self, Self::ServiceNotRegistered { .. })
	}
}

fn join_failures(failures: &[DisposalFailure]) -> String {
	failures
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_cycle_path_display() {
		// Arrange
		let err = DiError::CircularDependency {
			path: vec!["A".into(), "B".into(), "A".into()],
		};

		// Act
		let message = err.to_string();

		// Assert
		assert!(message.contains("A -> B -> A"));
	}

	#[rstest]
	fn test_disposal_display_lists_every_failure() {
		// Arrange
		let err = DiError::Disposal {
			scope: "root".into(),
			failures: vec![
				DisposalFailure {
					service: "First".into(),
					error: anyhow::anyhow!("boom"),
				},
				DisposalFailure {
					service: "Second".into(),
					error: anyhow::anyhow!("bang"),
				},
			],
		};

		// Act
		let message = err.to_string();

		// Assert
		assert!(message.starts_with("2 disposal error(s)"));
		assert!(message.contains("First: boom"));
		assert!(message.contains("Second: bang"));
	}
}
