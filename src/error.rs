//! Error types for the container.

use std::fmt;

/// Container errors.
///
/// Covers the full taxonomy: configuration errors surface eagerly (aggregated
/// at build time), binding errors surface lazily when a concrete resolution is
/// first compiled, and resolution errors surface when a compiled plan is
/// actually invoked.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{DiError, TargetCollection, TypeGraph};
///
/// let mut graph = TypeGraph::new();
/// let missing = graph.define("Missing", 0);
/// let container = TargetCollection::new(graph).build().unwrap();
/// match container.resolve(&missing.plain(), None) {
///     Err(DiError::NotFound(name)) => assert_eq!(name, "Missing"),
///     Err(other) => panic!("unexpected error: {}", other),
///     Ok(_) => panic!("resolved an unregistered contract"),
/// }
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// No registration for the requested contract
    NotFound(String),
    /// Instance downcast failed
    TypeMismatch(String),
    /// Cyclic dependency detected during compilation (includes path)
    Circular(Vec<String>),
    /// The concrete type declares no viable constructor
    NoConstructor(String),
    /// Generic mapping succeeded structurally but left type parameters unbound
    UnboundTypeParams {
        /// The open generic provider's declared type
        declared: String,
        /// The requested type that failed to close it
        requested: String,
    },
    /// Registration whose declared type cannot satisfy its contract
    IncompatibleRegistration {
        /// The target's declared type
        declared: String,
        /// The contract it was registered against
        contract: String,
    },
    /// Aggregated configuration failures reported together at build time
    Configuration(Vec<String>),
    /// Operation attempted on a disposed scope or container
    Disposed(&'static str),
    /// A type definition has no descriptor in the graph
    UnknownDefinition(String),
    /// A required dependency names an item absent from the set being ordered
    MissingDependency(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(name) => write!(f, "No registration for: {}", name),
            DiError::TypeMismatch(name) => write!(f, "Instance downcast failed for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Cyclic dependency: {}", path.join(" -> "))
            }
            DiError::NoConstructor(name) => {
                write!(f, "No viable constructor for: {}", name)
            }
            DiError::UnboundTypeParams { declared, requested } => write!(
                f,
                "Generic provider {} left type parameters unbound for request {}",
                declared, requested
            ),
            DiError::IncompatibleRegistration { declared, contract } => write!(
                f,
                "Declared type {} cannot satisfy contract {}",
                declared, contract
            ),
            DiError::Configuration(errors) => {
                write!(f, "{} configuration error(s):", errors.len())?;
                for e in errors {
                    write!(f, "\n  - {}", e)?;
                }
                Ok(())
            }
            DiError::Disposed(what) => write!(f, "{} has been disposed", what),
            DiError::UnknownDefinition(name) => {
                write!(f, "No type descriptor registered for: {}", name)
            }
            DiError::MissingDependency(name) => {
                write!(f, "Required dependency not present: {}", name)
            }
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;
