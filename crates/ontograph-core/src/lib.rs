//! Ontograph Core - ontology term-graph engine
//!
//! This crate provides the core functionality for working with ontology
//! term graphs:
//! - CURIE (compact identifier) expansion and contraction
//! - An in-memory term graph with typed relations and insertion-time
//!   invariant checking
//! - Transactional multi-source loading with provenance tracking
//! - Cached ancestor/descendant closure queries with version-stamped
//!   invalidation
//!
//! The intended lifecycle is load-then-freeze: build the graph with
//! exclusive access, then share it for concurrent read-only queries.

pub mod closure;
pub mod curie;
pub mod graph;
pub mod loader;
pub mod ontology;

// Re-exports for convenience
pub use closure::{CacheMetrics, ClosureEngine};
pub use curie::{CurieError, CurieResolver};
pub use graph::{
    EdgeData, GraphError, RelationEdge, RelationFilter, RelationType, Term, TermGraph,
    TraversalDirection,
};
pub use loader::{
    GraphLoader, JsonFileSource, LoadReport, LoaderError, MemorySource, Record, RecordStream,
    SourceProvider,
};
pub use ontology::{Ontology, OntologyError};
