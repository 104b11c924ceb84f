//! # crucible-di
//!
//! A compiled dependency-injection container with open-generic mapping,
//! decorators, and hierarchical scoping.
//!
//! ## Features
//!
//! - **Compiled resolution**: every request compiles once into a cached plan,
//!   so repeated resolutions skip registry lookups and constructor selection
//! - **Open generics**: register one provider for `Handler<T>` and resolve any
//!   closing of the contracts it satisfies, including reordered and nested
//!   type parameters
//! - **Lifetimes**: singleton, scoped (per top-level scope tree), and
//!   transient, with LIFO disposal of tracked instances
//! - **Decorators**: wrap any contract, most recently registered outermost
//! - **Collections**: `Array<T>`, `List<T>` and `Enumerable<T>` requests
//!   materialize every compatible registration, variance included
//! - **Layered containers**: child containers shadow parent registrations
//!   without mutating them
//! - **Circular dependency detection**: caught at compile time with the full
//!   dependency path
//!
//! ## Quick Start
//!
//! ```rust
//! use crucible_di::{
//!     downcast, Instance, ParameterDescriptor, TargetCollection, TypeGraph,
//! };
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! // Describe the types once, at startup.
//! let mut graph = TypeGraph::new();
//! let database = graph.define("Database", 0);
//! let users = graph.define("UserService", 0);
//! graph
//!     .describe(&users)
//!     .constructor(
//!         vec![ParameterDescriptor::required("db", database.plain())],
//!         |inv| {
//!             let db = downcast::<Database>(&inv.args[0])?;
//!             let built: Instance = Arc::new(UserService { db });
//!             Ok(built)
//!         },
//!     )
//!     .finish();
//!
//! // Register targets and build the immutable container.
//! let mut targets = TargetCollection::new(graph);
//! targets.register_object(
//!     database.plain(),
//!     Arc::new(Database { url: "postgres://localhost".to_string() }),
//! );
//! targets.register_type(users.plain());
//! let container = targets.build().unwrap();
//!
//! let service = container
//!     .resolve_as::<UserService>(&users.plain(), None)
//!     .unwrap();
//! assert_eq!(service.db.url, "postgres://localhost");
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: cached once per closed contract for the container's
//!   lifetime, disposed with the container
//! - **Scoped**: cached once per top-level scope tree, disposed with the
//!   tree's root scope
//! - **Transient**: a fresh instance per resolution, tracked by the resolving
//!   scope when the type is disposable
//!
//! Scopes form a tree: [`Container::create_scope`] starts a new top-level
//! tree, [`Scope::create_scope`] nests within one. Disposal runs children
//! first, then the scope's own tracked instances newest-first.

pub mod collection;
pub mod config;
pub mod dispose;
pub mod error;
pub mod ordering;
pub mod provider;
pub mod target;
pub mod types;

mod binder;
mod compiler;
mod composer;
mod internal;
mod registry;

pub use collection::TargetCollection;
pub use composer::ResolvedCollection;
pub use registry::NAME_DELIMITER;
pub use config::{ContainerOptions, DefOptions, MemberBinding};
pub use dispose::Dispose;
pub use error::{DiError, DiResult};
pub use ordering::{sort_by_dependencies, DependencyEdge};
pub use provider::{Container, Factory, LazyInstance, ResolveContext, Scope};
pub use target::{DelegateFn, Target, Tracking};
pub use types::{
    downcast, map_type, Builtins, ConstructFn, ConstructorDescriptor, DescriptorBuilder,
    GenericMapping, InjectFn, Instance, Invocation, MemberDescriptor, ParameterDescriptor,
    TrackFn, TypeDef, TypeDescriptor, TypeGraph, TypeRef, Variance,
};
