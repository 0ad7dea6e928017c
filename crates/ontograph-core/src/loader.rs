//! Graph Loader
//!
//! Streams term/edge records from one or more source providers into a
//! `TermGraph`. Loading is transactional per source: each provider streams
//! into its own staging graph, and a provider that fails mid-stream
//! contributes nothing. Staged graphs are merged into the target through
//! `TermGraph::merge`, so cross-source conflicts are surfaced to the
//! caller rather than resolved here.
//!
//! Providers adapt whatever shape the external source has into the fixed
//! `Record` schema at this boundary; loosely-typed data never reaches the
//! graph store.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::curie::CurieResolver;
use crate::graph::{GraphError, RelationEdge, RelationType, Term, TermGraph};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading sources into a graph.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The provider could not read or decode its underlying source.
    /// Recoverable by retry or skip at the caller's discretion; the loader
    /// itself does not retry.
    #[error("source {source_id:?} read error: {message}")]
    SourceRead { source_id: String, message: String },

    /// A structural invariant violation while staging or merging.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

// ============================================================================
// Records & Providers
// ============================================================================

/// The fixed internal record schema at the loader boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Term(Term),
    Edge(RelationEdge),
}

/// A finite stream of records, surfacing read failures in-band.
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, LoaderError>>>;

/// An opaque provider of term/edge records.
///
/// Implementations may be file-backed, network-backed, or in-memory; the
/// loader only requires that `open` eventually yields a finite stream or a
/// read error, and that mid-stream failures come through as `Err` items
/// rather than silent truncation.
pub trait SourceProvider {
    /// Stable identifier for this source, used as the provenance tag.
    fn id(&self) -> &str;

    /// Open the source and return its record stream.
    fn open(&self) -> Result<RecordStream, LoaderError>;
}

// ============================================================================
// JSON File Source
// ============================================================================

/// Wire shape of an OBO-graphs-style JSON document.
#[derive(Debug, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    graphs: Vec<JsonGraph>,
}

#[derive(Debug, Deserialize)]
struct JsonGraph {
    #[serde(default)]
    nodes: Vec<JsonNode>,
    #[serde(default)]
    edges: Vec<JsonEdge>,
}

#[derive(Debug, Deserialize)]
struct JsonNode {
    id: String,
    #[serde(rename = "lbl")]
    label: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonEdge {
    #[serde(rename = "sub")]
    subject: String,
    #[serde(rename = "pred")]
    predicate: String,
    #[serde(rename = "obj")]
    object: String,
}

/// File-backed source reading an OBO-graphs-style JSON document:
///
/// ```json
/// {"graphs": [{"nodes": [{"id": "...", "lbl": "..."}],
///              "edges": [{"sub": "...", "pred": "is_a", "obj": "..."}]}]}
/// ```
pub struct JsonFileSource {
    id: String,
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source for a JSON graph file. The source id defaults to
    /// the file stem and serves as the provenance tag.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { id, path }
    }

    /// Override the source id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, message: impl std::fmt::Display) -> LoaderError {
        LoaderError::SourceRead {
            source_id: self.id.clone(),
            message: message.to_string(),
        }
    }
}

impl SourceProvider for JsonFileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<RecordStream, LoaderError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.read_error(e))?;
        let document: JsonDocument =
            serde_json::from_str(&contents).map_err(|e| self.read_error(e))?;

        let mut records: Vec<Result<Record, LoaderError>> = Vec::new();
        for graph in document.graphs {
            for node in graph.nodes {
                let mut term = match node.label {
                    Some(label) => Term::new(node.id, label),
                    None => Term::unlabeled(node.id),
                };
                term.synonyms = node.synonyms.into_iter().collect();
                term.namespace = node.namespace;
                records.push(Ok(Record::Term(term)));
            }
            for edge in graph.edges {
                records.push(Ok(Record::Edge(RelationEdge::new(
                    edge.subject,
                    RelationType::parse(&edge.predicate),
                    edge.object,
                ))));
            }
        }
        debug!(source = %self.id, records = records.len(), "opened JSON graph source");
        Ok(Box::new(records.into_iter()))
    }
}

// ============================================================================
// Memory Source
// ============================================================================

/// In-memory source of prepared records (tests and programmatic adapters).
pub struct MemorySource {
    id: String,
    records: Vec<Record>,
}

impl MemorySource {
    /// Create an in-memory source with a provenance id.
    pub fn new(id: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }
}

impl SourceProvider for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<RecordStream, LoaderError> {
        Ok(Box::new(self.records.clone().into_iter().map(Ok)))
    }
}

// ============================================================================
// Load Report
// ============================================================================

/// Per-source outcome of a multi-source load.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Sources fully loaded and merged
    pub loaded: Vec<String>,
    /// Sources that failed and were rolled back, with the failure
    pub failed: Vec<(String, LoaderError)>,
    /// Terms added to the target graph
    pub terms_added: usize,
    /// Edges added to the target graph
    pub edges_added: usize,
}

impl LoadReport {
    /// Whether every source loaded successfully.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// Graph Loader
// ============================================================================

/// Loads one or more sources into a `TermGraph`.
///
/// Term and edge ids are normalized through the shared resolver at the
/// record boundary, so the graph is keyed by full URI regardless of
/// whether a source ships CURIE- or URI-form ids. Ids from unregistered
/// namespaces pass through unchanged.
#[derive(Debug)]
pub struct GraphLoader {
    resolver: Arc<CurieResolver>,
}

impl GraphLoader {
    /// Create a loader with the shared identifier resolver.
    pub fn new(resolver: Arc<CurieResolver>) -> Self {
        Self { resolver }
    }

    /// Load every source into `target`.
    ///
    /// Each source is staged independently and merged on success, so a
    /// source failing mid-stream (`SourceRead`) contributes nothing; its
    /// failure is recorded in the report and the remaining sources still
    /// load. A merge conflict between sources (e.g. `ConflictingLabel`)
    /// is a hard error: the conflict needs manual resolution and the
    /// caller must not treat the partially merged result as complete.
    pub fn load_into(
        &self,
        target: &mut TermGraph,
        sources: &[&dyn SourceProvider],
    ) -> Result<LoadReport, LoaderError> {
        let mut report = LoadReport::default();

        for source in sources {
            match self.stage_source(*source) {
                Ok(staged) => {
                    let terms_before = target.term_count();
                    let edges_before = target.edge_count();
                    target.merge(&staged)?;
                    report.terms_added += target.term_count() - terms_before;
                    report.edges_added += target.edge_count() - edges_before;
                    info!(
                        source = source.id(),
                        terms = staged.term_count(),
                        edges = staged.edge_count(),
                        "merged source into graph"
                    );
                    report.loaded.push(source.id().to_string());
                }
                Err(err) => {
                    warn!(source = source.id(), error = %err, "source failed, rolled back");
                    report.failed.push((source.id().to_string(), err));
                }
            }
        }

        Ok(report)
    }

    /// Stream one source into a fresh staging graph.
    ///
    /// Edge records may precede their endpoint terms in the stream, so
    /// edges are buffered and inserted after all terms. A dangling edge at
    /// that point is a genuine invariant violation and fails the source.
    fn stage_source(&self, source: &dyn SourceProvider) -> Result<TermGraph, LoaderError> {
        let mut staged = TermGraph::new();
        let mut edges: Vec<RelationEdge> = Vec::new();

        for record in source.open()? {
            match record? {
                Record::Term(mut term) => {
                    term.id = self.resolver.expand_or_passthrough(&term.id);
                    staged.insert_term_tagged(term, Some(source.id()))?;
                }
                Record::Edge(mut edge) => {
                    edge.subject = self.resolver.expand_or_passthrough(&edge.subject);
                    edge.object = self.resolver.expand_or_passthrough(&edge.object);
                    edges.push(edge.with_provenance(source.id()));
                }
            }
        }
        for edge in edges {
            staged.insert_edge(edge)?;
        }
        Ok(staged)
    }
}
