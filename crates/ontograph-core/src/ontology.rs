//! Ontology Query Facade
//!
//! Combines the resolver, term graph, and closure engine behind one public
//! surface. Public calls accept CURIEs or full URIs; CURIEs are expanded
//! through the resolver before dispatch and result ids are contracted back
//! where a prefix matches. Component-level failures translate into the
//! unified `OntologyError`.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::closure::{CacheMetrics, ClosureEngine};
use crate::curie::{CurieError, CurieResolver};
use crate::graph::{
    GraphError, RelationFilter, Term, TermGraph, TraversalDirection,
};
use crate::loader::{GraphLoader, LoadReport, LoaderError, SourceProvider};

/// Unified error type for the public query surface.
#[derive(Debug, Error)]
pub enum OntologyError {
    /// Identifier resolution failure
    #[error(transparent)]
    Curie(#[from] CurieError),

    /// Graph mutation failure
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Source loading failure
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// The term id resolved but is absent from the graph
    #[error("term not found: {id:?}")]
    NotFound { id: String },
}

/// An ontology: a term graph, its closure engine, and a shared resolver.
///
/// Follows a load-then-freeze lifecycle: mutation (`load`, `insert_*`
/// passthroughs via `graph_mut`) requires exclusive access, after which the
/// ontology can be shared for concurrent read-only queries (the closure
/// cache uses interior mutability and is safe under concurrent reads).
pub struct Ontology {
    graph: TermGraph,
    closure: ClosureEngine,
    resolver: Arc<CurieResolver>,
}

impl Ontology {
    /// Create an empty ontology with the given resolver.
    pub fn new(resolver: Arc<CurieResolver>) -> Self {
        Self {
            graph: TermGraph::new(),
            closure: ClosureEngine::new(),
            resolver,
        }
    }

    /// Create an empty ontology with a bounded closure cache.
    pub fn with_cache_capacity(resolver: Arc<CurieResolver>, capacity: usize) -> Self {
        Self {
            graph: TermGraph::new(),
            closure: ClosureEngine::with_capacity(capacity),
            resolver,
        }
    }

    /// Build an ontology by loading the given sources.
    ///
    /// Per-source failures are reported, not fatal; merge conflicts are.
    pub fn load(
        resolver: Arc<CurieResolver>,
        sources: &[&dyn SourceProvider],
    ) -> Result<(Self, LoadReport), OntologyError> {
        let mut ontology = Self::new(resolver);
        let report = ontology.load_sources(sources)?;
        Ok((ontology, report))
    }

    /// Load additional sources into this ontology.
    pub fn load_sources(
        &mut self,
        sources: &[&dyn SourceProvider],
    ) -> Result<LoadReport, OntologyError> {
        let report =
            GraphLoader::new(Arc::clone(&self.resolver)).load_into(&mut self.graph, sources)?;
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            terms = self.graph.term_count(),
            edges = self.graph.edge_count(),
            "ontology load complete"
        );
        Ok(report)
    }

    /// The shared identifier resolver.
    pub fn resolver(&self) -> &Arc<CurieResolver> {
        &self.resolver
    }

    /// Read-only access to the underlying term graph.
    pub fn graph(&self) -> &TermGraph {
        &self.graph
    }

    /// Exclusive access to the underlying term graph for direct mutation.
    ///
    /// Callers must not hold this across concurrent reads; the closure
    /// cache self-heals via version stamps once mutation ends.
    pub fn graph_mut(&mut self) -> &mut TermGraph {
        &mut self.graph
    }

    /// Snapshot of closure cache metrics.
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.closure.metrics()
    }

    /// Number of terms.
    pub fn term_count(&self) -> usize {
        self.graph.term_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Look up a term by CURIE or full URI.
    pub fn lookup(&self, id: &str) -> Result<&Term, OntologyError> {
        let uri = self.resolver.normalize(id)?;
        self.graph
            .term(&uri)
            .ok_or(OntologyError::NotFound { id: uri })
    }

    /// Direct neighbors, as compact ids where a prefix matches.
    pub fn neighbors(
        &self,
        id: &str,
        filter: &RelationFilter,
        direction: TraversalDirection,
    ) -> Result<BTreeSet<String>, OntologyError> {
        let uri = self.require(id)?;
        Ok(self.contract_all(self.graph.neighbors(&uri, filter, direction).iter()))
    }

    /// All ancestors of a term under the filter, as compact ids.
    pub fn ancestors(
        &self,
        id: &str,
        filter: &RelationFilter,
    ) -> Result<BTreeSet<String>, OntologyError> {
        let uri = self.require(id)?;
        let closure = self.closure.ancestors(&self.graph, &uri, filter);
        Ok(self.contract_all(closure.iter()))
    }

    /// All descendants of a term under the filter, as compact ids.
    pub fn descendants(
        &self,
        id: &str,
        filter: &RelationFilter,
    ) -> Result<BTreeSet<String>, OntologyError> {
        let uri = self.require(id)?;
        let closure = self.closure.descendants(&self.graph, &uri, filter);
        Ok(self.contract_all(closure.iter()))
    }

    /// Whether `a` is a descendant of `b` under the filter.
    pub fn is_descendant_of(
        &self,
        a: &str,
        b: &str,
        filter: &RelationFilter,
    ) -> Result<bool, OntologyError> {
        let a = self.require(a)?;
        let b = self.require(b)?;
        Ok(self.closure.is_descendant_of(&self.graph, &a, &b, filter))
    }

    /// Ancestors common to every given term, as compact ids.
    pub fn common_ancestors<'a, I>(
        &self,
        ids: I,
        filter: &RelationFilter,
    ) -> Result<BTreeSet<String>, OntologyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut uris: Vec<String> = Vec::new();
        for id in ids {
            uris.push(self.require(id)?);
        }
        let common =
            self.closure
                .common_ancestors(&self.graph, uris.iter().map(String::as_str), filter);
        Ok(self.contract_all(common.iter()))
    }

    /// Extract the subgraph spanned by the given roots and their ancestor
    /// closures under the filter.
    ///
    /// The result is a fully independent `TermGraph`: the union of each
    /// root with its ancestors, plus exactly the source edges with both
    /// endpoints in that set.
    pub fn subgraph(
        &self,
        roots: &[&str],
        filter: &RelationFilter,
    ) -> Result<TermGraph, OntologyError> {
        let mut ids: HashSet<String> = HashSet::new();
        for root in roots {
            let uri = self.require(root)?;
            let closure = self.closure.ancestors(&self.graph, &uri, filter);
            ids.extend(closure.iter().cloned());
            ids.insert(uri);
        }
        Ok(self.graph.induced_subgraph(&ids))
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Normalize an id and require that the term exists.
    fn require(&self, id: &str) -> Result<String, OntologyError> {
        let uri = self.resolver.normalize(id)?;
        if !self.graph.contains_term(&uri) {
            return Err(OntologyError::NotFound { id: uri });
        }
        Ok(uri)
    }

    /// Contract a set of URIs back to compact ids, passing foreign
    /// namespaces through unchanged.
    fn contract_all<'a, I>(&self, uris: I) -> BTreeSet<String>
    where
        I: Iterator<Item = &'a String>,
    {
        uris.map(|uri| self.resolver.contract_or_passthrough(uri))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RelationEdge, RelationType};
    use crate::loader::{MemorySource, Record};

    const BASE: &str = "http://purl.obolibrary.org/obo/GO_";

    fn resolver() -> Arc<CurieResolver> {
        Arc::new(CurieResolver::with_obo_defaults())
    }

    fn uri(local: &str) -> String {
        format!("{BASE}{local}")
    }

    /// GO:1 -is_a-> GO:2 -is_a-> GO:3, GO:1 -part_of-> GO:4
    fn sample_source() -> MemorySource {
        MemorySource::new(
            "go-mini",
            vec![
                Record::Term(Term::new(uri("1"), "one").with_synonyms(["first"])),
                Record::Term(Term::new(uri("2"), "two")),
                Record::Term(Term::new(uri("3"), "three")),
                Record::Term(Term::new(uri("4"), "four")),
                Record::Edge(RelationEdge::is_a(uri("1"), uri("2"))),
                Record::Edge(RelationEdge::is_a(uri("2"), uri("3"))),
                Record::Edge(RelationEdge::new(uri("1"), RelationType::PartOf, uri("4"))),
            ],
        )
    }

    fn sample_ontology() -> Ontology {
        let source = sample_source();
        let (ontology, report) = Ontology::load(resolver(), &[&source]).unwrap();
        assert!(report.is_complete());
        ontology
    }

    #[test]
    fn test_lookup_by_curie() {
        let ontology = sample_ontology();
        let term = ontology.lookup("GO:1").unwrap();
        assert_eq!(term.label.as_deref(), Some("one"));
        assert!(term.synonyms.contains("first"));
    }

    #[test]
    fn test_lookup_by_uri() {
        let ontology = sample_ontology();
        let term = ontology.lookup(&uri("2")).unwrap();
        assert_eq!(term.label.as_deref(), Some("two"));
    }

    #[test]
    fn test_lookup_not_found() {
        let ontology = sample_ontology();
        let err = ontology.lookup("GO:999").unwrap_err();
        assert!(matches!(err, OntologyError::NotFound { .. }));
    }

    #[test]
    fn test_lookup_unknown_prefix() {
        let ontology = sample_ontology();
        let err = ontology.lookup("WAT:1").unwrap_err();
        assert!(matches!(err, OntologyError::Curie(_)));
    }

    #[test]
    fn test_ancestors_returns_curies() {
        let ontology = sample_ontology();
        let up = ontology.ancestors("GO:1", &RelationFilter::is_a()).unwrap();
        let expected: BTreeSet<String> = ["GO:2", "GO:3"].map(String::from).into_iter().collect();
        assert_eq!(up, expected);
    }

    #[test]
    fn test_descendants() {
        let ontology = sample_ontology();
        let down = ontology
            .descendants("GO:3", &RelationFilter::is_a())
            .unwrap();
        let expected: BTreeSet<String> = ["GO:1", "GO:2"].map(String::from).into_iter().collect();
        assert_eq!(down, expected);
    }

    #[test]
    fn test_common_ancestors() {
        let ontology = sample_ontology();
        let common = ontology
            .common_ancestors(["GO:1", "GO:2"], &RelationFilter::is_a())
            .unwrap();
        let expected: BTreeSet<String> = ["GO:3"].map(String::from).into_iter().collect();
        assert_eq!(common, expected);
    }

    #[test]
    fn test_neighbors() {
        let ontology = sample_ontology();
        let up = ontology
            .neighbors("GO:1", &RelationFilter::All, TraversalDirection::Ancestors)
            .unwrap();
        assert!(up.contains("GO:2"));
        assert!(up.contains("GO:4"));
    }

    #[test]
    fn test_subgraph_term_and_edge_sets() {
        let ontology = sample_ontology();
        let sub = ontology.subgraph(&["GO:1"], &RelationFilter::is_a()).unwrap();

        // Term set = {root} ∪ ancestors(root)
        assert_eq!(sub.term_count(), 3);
        assert!(sub.contains_term(&uri("1")));
        assert!(sub.contains_term(&uri("2")));
        assert!(sub.contains_term(&uri("3")));
        assert!(!sub.contains_term(&uri("4")));

        // Induced edges only: the part_of edge to GO:4 is excluded
        assert_eq!(sub.edge_count(), 2);
    }

    #[test]
    fn test_subgraph_is_independent_copy() {
        let mut ontology = sample_ontology();
        let sub = ontology.subgraph(&["GO:1"], &RelationFilter::is_a()).unwrap();
        ontology.graph_mut().remove_term(&uri("2"));
        // The extracted subgraph is unaffected by source mutation
        assert!(sub.contains_term(&uri("2")));
    }

    #[test]
    fn test_cache_serves_repeat_query() {
        let ontology = sample_ontology();
        ontology.ancestors("GO:1", &RelationFilter::is_a()).unwrap();
        ontology.ancestors("GO:1", &RelationFilter::is_a()).unwrap();
        let metrics = ontology.cache_metrics();
        assert_eq!(metrics.computations, 1);
        assert_eq!(metrics.hits, 1);
    }

    #[test]
    fn test_mutation_via_graph_mut_invalidates_cache() {
        let mut ontology = sample_ontology();
        let before = ontology.ancestors("GO:1", &RelationFilter::is_a()).unwrap();
        assert!(!before.contains("GO:5"));

        ontology
            .graph_mut()
            .insert_term(Term::new(uri("5"), "five"))
            .unwrap();
        ontology
            .graph_mut()
            .insert_edge(RelationEdge::is_a(uri("3"), uri("5")))
            .unwrap();

        let after = ontology.ancestors("GO:1", &RelationFilter::is_a()).unwrap();
        assert!(after.contains("GO:5"));
    }

    #[test]
    fn test_is_descendant_of() {
        let ontology = sample_ontology();
        assert!(ontology
            .is_descendant_of("GO:1", "GO:3", &RelationFilter::is_a())
            .unwrap());
        assert!(!ontology
            .is_descendant_of("GO:3", "GO:1", &RelationFilter::is_a())
            .unwrap());
    }

    #[test]
    fn test_load_accepts_curie_form_ids() {
        // Sources may ship compact ids; they are expanded on the way in so
        // CURIE and URI lookups hit the same node.
        let source = MemorySource::new(
            "go-curie",
            vec![
                Record::Term(Term::new("GO:1", "one")),
                Record::Term(Term::new("GO:2", "two")),
                Record::Edge(RelationEdge::is_a("GO:1", "GO:2")),
            ],
        );
        let (ontology, report) = Ontology::load(resolver(), &[&source]).unwrap();
        assert!(report.is_complete());

        let term = ontology.lookup("GO:1").unwrap();
        assert_eq!(term.id, uri("1"));
        let up = ontology.ancestors("GO:1", &RelationFilter::is_a()).unwrap();
        assert!(up.contains("GO:2"));
    }

    #[test]
    fn test_foreign_namespace_passthrough() {
        let source = MemorySource::new(
            "mixed",
            vec![
                Record::Term(Term::new(uri("1"), "one")),
                Record::Term(Term::new("http://example.org/ext/9", "ext")),
                Record::Edge(RelationEdge::is_a(uri("1"), "http://example.org/ext/9")),
            ],
        );
        let (ontology, _) = Ontology::load(resolver(), &[&source]).unwrap();
        let up = ontology.ancestors("GO:1", &RelationFilter::is_a()).unwrap();
        // No prefix registered for example.org, so the raw URI comes back
        assert!(up.contains("http://example.org/ext/9"));
    }
}
