//! Term Graph Store
//!
//! This module defines the ontology term graph: `Term` nodes, typed
//! `RelationEdge`s, and the `TermGraph` container that owns both.
//!
//! The graph is backed by `petgraph::StableGraph` for efficient adjacency
//! access, with a string-id side index for O(1) term lookup. Every
//! structural mutation bumps a monotonic version stamp which the closure
//! cache uses for invalidation.

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by term graph mutations.
///
/// Structural invariant violations are always surfaced to the caller;
/// silently resolving them would corrupt downstream closure results.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A term with this id already exists with a different label.
    #[error("duplicate term {id:?}: existing label {existing:?} conflicts with {conflicting:?}")]
    DuplicateTerm {
        id: String,
        existing: String,
        conflicting: String,
    },

    /// An edge references a term id not present in the graph.
    #[error("dangling reference: edge {subject:?} -[{relation}]-> {object:?} references missing term {missing:?}")]
    DanglingReference {
        subject: String,
        relation: String,
        object: String,
        missing: String,
    },

    /// Two sources assign different canonical labels to the same id.
    #[error("conflicting label for {id:?}: {left:?} vs {right:?}")]
    ConflictingLabel {
        id: String,
        left: String,
        right: String,
    },
}

// ============================================================================
// Relation Types
// ============================================================================

/// Types of relationships between ontology terms.
///
/// The common OBO relations get dedicated variants; anything else a source
/// declares is carried as `Other`. Relation vocabularies (RO) are open-ended
/// in practice, so the set is extensible rather than closed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationType {
    /// Subsumption (rdfs:subClassOf / is_a)
    IsA,
    /// Partonomy (BFO:0000050 / part_of)
    PartOf,
    /// Regulation (RO:0002211 / regulates)
    Regulates,
    /// Source-declared relation outside the core vocabulary
    Other(String),
}

impl RelationType {
    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            RelationType::IsA => "is_a",
            RelationType::PartOf => "part_of",
            RelationType::Regulates => "regulates",
            RelationType::Other(s) => s,
        }
    }

    /// Parse a relation tag, recognizing both label forms and the OBO/RO
    /// identifiers found in real ontology data.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "is_a" | "subClassOf" | "rdfs:subClassOf" => RelationType::IsA,
            "part_of" | "BFO:0000050" => RelationType::PartOf,
            "regulates" | "RO:0002211" => RelationType::Regulates,
            other => RelationType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RelationType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelationType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RelationType::parse(&s))
    }
}

// ============================================================================
// Traversal Parameters
// ============================================================================

/// Direction of a closure or neighbor query.
///
/// Edges point subject → object (child → parent for is_a), so an ancestor
/// query follows outgoing edges and a descendant query follows incoming ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraversalDirection {
    /// Toward more general terms (follow subject → object)
    Ancestors,
    /// Toward more specific terms (follow object → subject)
    Descendants,
}

impl TraversalDirection {
    /// Map onto the underlying petgraph edge direction.
    pub fn petgraph_direction(&self) -> Direction {
        match self {
            TraversalDirection::Ancestors => Direction::Outgoing,
            TraversalDirection::Descendants => Direction::Incoming,
        }
    }
}

/// Which relation types a traversal follows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationFilter {
    /// Follow edges of any relation type
    All,
    /// Follow only edges whose relation is in the set (kept sorted so the
    /// filter can serve as a cache key component)
    Only(BTreeSet<RelationType>),
}

impl RelationFilter {
    /// Build a filter over an explicit set of relation types.
    pub fn only<I: IntoIterator<Item = RelationType>>(relations: I) -> Self {
        RelationFilter::Only(relations.into_iter().collect())
    }

    /// Filter that follows is_a edges only.
    pub fn is_a() -> Self {
        RelationFilter::only([RelationType::IsA])
    }

    /// Check whether an edge with this relation passes the filter.
    pub fn matches(&self, relation: &RelationType) -> bool {
        match self {
            RelationFilter::All => true,
            RelationFilter::Only(set) => set.contains(relation),
        }
    }
}

// ============================================================================
// Term
// ============================================================================

/// A node in the ontology graph representing a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Globally unique identifier within a graph instance (full URI form)
    pub id: String,

    /// Canonical human-readable label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Alternative labels
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub synonyms: BTreeSet<String>,

    /// Source namespace tag (e.g. "biological_process")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Term {
    /// Create a term with an id and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            synonyms: BTreeSet::new(),
            namespace: None,
        }
    }

    /// Create a term with no label (some sources ship unlabeled nodes).
    pub fn unlabeled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            synonyms: BTreeSet::new(),
            namespace: None,
        }
    }

    /// Set the synonyms.
    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    /// Set the namespace tag.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

// ============================================================================
// Edge
// ============================================================================

/// Edge payload stored as the petgraph edge weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Relation type (is_a, part_of, regulates, ...)
    pub relation: RelationType,

    /// Source graph this edge came from (for transactional rollback)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

/// An owned edge record: directed, typed link between two terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Subject term id (the more specific term for is_a)
    pub subject: String,

    /// Relation type
    pub relation: RelationType,

    /// Object term id
    pub object: String,

    /// Source graph this edge came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl RelationEdge {
    /// Create an edge with no provenance tag.
    pub fn new(
        subject: impl Into<String>,
        relation: RelationType,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation,
            object: object.into(),
            provenance: None,
        }
    }

    /// Create an is_a edge.
    pub fn is_a(subject: impl Into<String>, object: impl Into<String>) -> Self {
        Self::new(subject, RelationType::IsA, object)
    }

    /// Set the provenance tag.
    pub fn with_provenance(mut self, source: impl Into<String>) -> Self {
        self.provenance = Some(source.into());
        self
    }
}

// ============================================================================
// Term Graph
// ============================================================================

/// An ontology term graph: exclusive owner of its terms and edges.
///
/// Invariants enforced at insertion time:
/// - every edge's subject and object resolve to a term in the same graph
/// - a term id maps to exactly one canonical label
///
/// The `version` stamp increases on every structural mutation and is read
/// by the closure cache for coarse-grained invalidation.
#[derive(Debug, Clone, Default)]
pub struct TermGraph {
    /// The underlying petgraph instance
    graph: StableGraph<Term, EdgeData, petgraph::Directed>,

    /// Map from term id to petgraph NodeIndex for O(1) lookup
    node_index_map: HashMap<String, NodeIndex>,

    /// Provenance tag per term id (only tagged terms are tracked)
    term_provenance: HashMap<String, String>,

    /// Monotonic version stamp, bumped on every structural mutation
    version: u64,
}

impl TermGraph {
    /// Create a new empty term graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version stamp.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }

    // ------------------------------------------------------------------------
    // Term Operations
    // ------------------------------------------------------------------------

    /// Insert a term.
    ///
    /// Re-inserting an identical term is a no-op. Re-inserting with the same
    /// id unions synonyms and fills a missing label or namespace, but a
    /// conflicting label fails with `DuplicateTerm` (explicit `merge` is the
    /// only sanctioned path for reconciling sources).
    pub fn insert_term(&mut self, term: Term) -> Result<(), GraphError> {
        self.insert_term_tagged(term, None)
    }

    /// Insert a term attributed to a named source.
    pub fn insert_term_tagged(
        &mut self,
        term: Term,
        provenance: Option<&str>,
    ) -> Result<(), GraphError> {
        if let Some(&idx) = self.node_index_map.get(&term.id) {
            // id map and node storage are kept in lockstep
            let existing = self
                .graph
                .node_weight_mut(idx)
                .expect("term id map out of sync with graph");
            match (&existing.label, &term.label) {
                (Some(a), Some(b)) if a != b => {
                    return Err(GraphError::DuplicateTerm {
                        id: term.id,
                        existing: a.clone(),
                        conflicting: b.clone(),
                    });
                }
                _ => {}
            }
            let mut changed = false;
            if existing.label.is_none() && term.label.is_some() {
                existing.label = term.label;
                changed = true;
            }
            if existing.namespace.is_none() && term.namespace.is_some() {
                existing.namespace = term.namespace;
                changed = true;
            }
            for syn in term.synonyms {
                changed |= existing.synonyms.insert(syn);
            }
            if changed {
                self.bump_version();
            }
            return Ok(());
        }

        let id = term.id.clone();
        let idx = self.graph.add_node(term);
        self.node_index_map.insert(id.clone(), idx);
        if let Some(source) = provenance {
            self.term_provenance.insert(id, source.to_string());
        }
        self.bump_version();
        Ok(())
    }

    /// Amend an existing term's label and synonyms in place.
    ///
    /// This is the explicit merge-style amendment path: unlike
    /// `insert_term`, it may replace a conflicting label.
    pub fn amend_term<I, S>(&mut self, id: &str, label: Option<&str>, synonyms: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(&idx) = self.node_index_map.get(id) else {
            return false;
        };
        let Some(term) = self.graph.node_weight_mut(idx) else {
            return false;
        };
        let mut changed = false;
        if let Some(label) = label {
            if term.label.as_deref() != Some(label) {
                term.label = Some(label.to_string());
                changed = true;
            }
        }
        for syn in synonyms {
            changed |= term.synonyms.insert(syn.into());
        }
        if changed {
            self.bump_version();
        }
        changed
    }

    /// Get a term by id.
    pub fn term(&self, id: &str) -> Option<&Term> {
        self.node_index_map
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Check if the graph contains a term with the given id.
    pub fn contains_term(&self, id: &str) -> bool {
        self.node_index_map.contains_key(id)
    }

    /// Remove a term and cascade-remove all edges referencing it.
    pub fn remove_term(&mut self, id: &str) -> Option<Term> {
        let idx = self.node_index_map.remove(id)?;
        self.term_provenance.remove(id);
        let removed = self.graph.remove_node(idx);
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Number of terms.
    pub fn term_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Iterate over all terms.
    pub fn iter_terms(&self) -> impl Iterator<Item = &Term> {
        self.graph.node_weights()
    }

    /// Provenance tag recorded for a term, if any.
    pub fn term_provenance(&self, id: &str) -> Option<&str> {
        self.term_provenance.get(id).map(String::as_str)
    }

    // ------------------------------------------------------------------------
    // Edge Operations
    // ------------------------------------------------------------------------

    /// Insert an edge.
    ///
    /// Fails with `DanglingReference` if either endpoint is absent. An edge
    /// identical in (subject, relation, object) to an existing one is a
    /// no-op (the first provenance tag wins). Returns whether the edge was
    /// actually inserted.
    pub fn insert_edge(&mut self, edge: RelationEdge) -> Result<bool, GraphError> {
        let missing = if !self.contains_term(&edge.subject) {
            Some(edge.subject.clone())
        } else if !self.contains_term(&edge.object) {
            Some(edge.object.clone())
        } else {
            None
        };
        if let Some(missing) = missing {
            return Err(GraphError::DanglingReference {
                subject: edge.subject,
                relation: edge.relation.as_str().to_string(),
                object: edge.object,
                missing,
            });
        }

        let source_idx = self.node_index_map[&edge.subject];
        let target_idx = self.node_index_map[&edge.object];

        let duplicate = self
            .graph
            .edges_connecting(source_idx, target_idx)
            .any(|e| e.weight().relation == edge.relation);
        if duplicate {
            return Ok(false);
        }

        self.graph.add_edge(
            source_idx,
            target_idx,
            EdgeData {
                relation: edge.relation,
                provenance: edge.provenance,
            },
        );
        self.bump_version();
        Ok(true)
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over all edges as owned records.
    pub fn iter_edges(&self) -> impl Iterator<Item = RelationEdge> + '_ {
        self.graph.edge_references().filter_map(move |edge_ref| {
            let subject = self.graph.node_weight(edge_ref.source())?;
            let object = self.graph.node_weight(edge_ref.target())?;
            let data = edge_ref.weight();
            Some(RelationEdge {
                subject: subject.id.clone(),
                relation: data.relation.clone(),
                object: object.id.clone(),
                provenance: data.provenance.clone(),
            })
        })
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    /// Direct neighbors of a term, filtered by relation type and direction.
    ///
    /// O(degree) via the petgraph adjacency lists. Returns an empty set if
    /// the term is absent.
    pub fn neighbors(
        &self,
        id: &str,
        filter: &RelationFilter,
        direction: TraversalDirection,
    ) -> BTreeSet<String> {
        let Some(&idx) = self.node_index_map.get(id) else {
            return BTreeSet::new();
        };
        self.graph
            .edges_directed(idx, direction.petgraph_direction())
            .filter(|e| filter.matches(&e.weight().relation))
            .filter_map(|e| {
                let other = match direction {
                    TraversalDirection::Ancestors => e.target(),
                    TraversalDirection::Descendants => e.source(),
                };
                self.graph.node_weight(other).map(|t| t.id.clone())
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Merge & Subgraph
    // ------------------------------------------------------------------------

    /// Union another graph into this one.
    ///
    /// Term collisions are resolved by matching id and unioning synonym
    /// sets. Two sources assigning different canonical labels to the same
    /// id fail with `ConflictingLabel`; conflicts are detected in a
    /// pre-pass, so on failure neither graph has been modified.
    pub fn merge(&mut self, other: &TermGraph) -> Result<(), GraphError> {
        for term in other.iter_terms() {
            if let Some(existing) = self.term(&term.id) {
                if let (Some(a), Some(b)) = (&existing.label, &term.label) {
                    if a != b {
                        return Err(GraphError::ConflictingLabel {
                            id: term.id.clone(),
                            left: a.clone(),
                            right: b.clone(),
                        });
                    }
                }
            }
        }

        for term in other.iter_terms() {
            let provenance = other.term_provenance(&term.id);
            self.insert_term_tagged(term.clone(), provenance)?;
        }
        for edge in other.iter_edges() {
            self.insert_edge(edge)?;
        }
        Ok(())
    }

    /// Copy the subgraph induced by a set of term ids into a new,
    /// independent graph: the named terms plus every edge from this graph
    /// with both endpoints in the set.
    pub fn induced_subgraph(&self, ids: &HashSet<String>) -> TermGraph {
        let mut sub = TermGraph::new();
        for id in ids {
            if let Some(term) = self.term(id) {
                // Fresh graph, conflicts impossible
                let _ = sub.insert_term_tagged(term.clone(), self.term_provenance(id));
            }
        }
        for edge in self.iter_edges() {
            if ids.contains(&edge.subject) && ids.contains(&edge.object) {
                let _ = sub.insert_edge(edge);
            }
        }
        sub
    }

    /// Remove every term and edge attributed to a provenance tag.
    ///
    /// Returns the number of terms removed. Edges tagged with the source
    /// but between surviving terms are removed as well.
    pub fn remove_source(&mut self, source: &str) -> usize {
        let term_ids: Vec<String> = self
            .term_provenance
            .iter()
            .filter(|(_, s)| s.as_str() == source)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &term_ids {
            self.remove_term(id);
        }

        let stale_edges: Vec<_> = self
            .graph
            .edge_references()
            .filter(|e| e.weight().provenance.as_deref() == Some(source))
            .map(|e| e.id())
            .collect();
        let removed_edges = !stale_edges.is_empty();
        for edge_idx in stale_edges {
            self.graph.remove_edge(edge_idx);
        }
        if removed_edges {
            self.bump_version();
        }
        term_ids.len()
    }
}

/// Serialize as a flat node/edge document (the shape consumed by external
/// tooling and the loader's JSON source format).
impl Serialize for TermGraph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut terms: Vec<&Term> = self.iter_terms().collect();
        terms.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<RelationEdge> = self.iter_edges().collect();
        edges.sort_by(|a, b| (&a.subject, &a.object).cmp(&(&b.subject, &b.object)));

        let mut state = serializer.serialize_struct("TermGraph", 2)?;
        state.serialize_field("nodes", &terms)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(local: &str) -> String {
        format!("http://purl.obolibrary.org/obo/{local}")
    }

    fn three_term_chain() -> TermGraph {
        // A -is_a-> B -is_a-> C
        let mut g = TermGraph::new();
        g.insert_term(Term::new(uri("A"), "a")).unwrap();
        g.insert_term(Term::new(uri("B"), "b")).unwrap();
        g.insert_term(Term::new(uri("C"), "c")).unwrap();
        g.insert_edge(RelationEdge::is_a(uri("A"), uri("B"))).unwrap();
        g.insert_edge(RelationEdge::is_a(uri("B"), uri("C"))).unwrap();
        g
    }

    #[test]
    fn test_relation_type_parse() {
        assert_eq!(RelationType::parse("is_a"), RelationType::IsA);
        assert_eq!(RelationType::parse("subClassOf"), RelationType::IsA);
        assert_eq!(RelationType::parse("BFO:0000050"), RelationType::PartOf);
        assert_eq!(RelationType::parse("RO:0002211"), RelationType::Regulates);
        assert_eq!(
            RelationType::parse("develops_from"),
            RelationType::Other("develops_from".to_string())
        );
    }

    #[test]
    fn test_relation_type_serialization() {
        let json = serde_json::to_string(&RelationType::IsA).unwrap();
        assert_eq!(json, "\"is_a\"");
        let back: RelationType = serde_json::from_str("\"part_of\"").unwrap();
        assert_eq!(back, RelationType::PartOf);
    }

    #[test]
    fn test_insert_term_identical_is_noop() {
        let mut g = TermGraph::new();
        g.insert_term(Term::new("X", "x")).unwrap();
        let v = g.version();
        g.insert_term(Term::new("X", "x")).unwrap();
        assert_eq!(g.version(), v);
        assert_eq!(g.term_count(), 1);
    }

    #[test]
    fn test_insert_term_conflicting_label_fails() {
        let mut g = TermGraph::new();
        g.insert_term(Term::new("X", "x")).unwrap();
        let err = g.insert_term(Term::new("X", "not x")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateTerm { .. }));
    }

    #[test]
    fn test_insert_term_unions_synonyms() {
        let mut g = TermGraph::new();
        g.insert_term(Term::new("X", "x").with_synonyms(["ex"])).unwrap();
        g.insert_term(Term::new("X", "x").with_synonyms(["chi"])).unwrap();
        let term = g.term("X").unwrap();
        assert_eq!(term.synonyms.len(), 2);
    }

    #[test]
    fn test_amend_term_replaces_label_and_unions_synonyms() {
        let mut g = TermGraph::new();
        g.insert_term(Term::new("X", "x").with_synonyms(["ex"])).unwrap();
        let v = g.version();

        let changed = g.amend_term("X", Some("chi"), ["letter"]);
        assert!(changed);
        assert!(g.version() > v);

        let term = g.term("X").unwrap();
        assert_eq!(term.label.as_deref(), Some("chi"));
        assert!(term.synonyms.contains("ex"));
        assert!(term.synonyms.contains("letter"));
    }

    #[test]
    fn test_amend_term_noop_and_missing() {
        let mut g = TermGraph::new();
        g.insert_term(Term::new("X", "x")).unwrap();
        let v = g.version();

        // Same label and no new synonyms: no change, no version bump
        assert!(!g.amend_term("X", Some("x"), Vec::<String>::new()));
        assert_eq!(g.version(), v);

        assert!(!g.amend_term("missing", Some("y"), Vec::<String>::new()));
    }

    #[test]
    fn test_insert_edge_dangling_fails() {
        let mut g = TermGraph::new();
        g.insert_term(Term::new("A", "a")).unwrap();
        let err = g
            .insert_edge(RelationEdge::is_a("A", "missing"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::DanglingReference { ref missing, .. } if missing == "missing"
        ));
    }

    #[test]
    fn test_insert_edge_duplicate_is_noop() {
        let mut g = three_term_chain();
        let v = g.version();
        let inserted = g.insert_edge(RelationEdge::is_a(uri("A"), uri("B"))).unwrap();
        assert!(!inserted);
        assert_eq!(g.version(), v);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_neighbors_symmetry() {
        let g = three_term_chain();
        let up = g.neighbors(&uri("A"), &RelationFilter::All, TraversalDirection::Ancestors);
        assert!(up.contains(&uri("B")));
        let down = g.neighbors(&uri("B"), &RelationFilter::All, TraversalDirection::Descendants);
        assert!(down.contains(&uri("A")));
    }

    #[test]
    fn test_neighbors_relation_filter() {
        let mut g = three_term_chain();
        g.insert_term(Term::new(uri("P"), "p")).unwrap();
        g.insert_edge(RelationEdge::new(uri("A"), RelationType::PartOf, uri("P")))
            .unwrap();

        let is_a_only =
            g.neighbors(&uri("A"), &RelationFilter::is_a(), TraversalDirection::Ancestors);
        assert!(is_a_only.contains(&uri("B")));
        assert!(!is_a_only.contains(&uri("P")));

        let all = g.neighbors(&uri("A"), &RelationFilter::All, TraversalDirection::Ancestors);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_remove_term_cascades_edges() {
        let mut g = three_term_chain();
        assert_eq!(g.edge_count(), 2);
        let removed = g.remove_term(&uri("B"));
        assert!(removed.is_some());
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.term_count(), 2);
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let mut g = TermGraph::new();
        let v0 = g.version();
        g.insert_term(Term::new("A", "a")).unwrap();
        let v1 = g.version();
        assert!(v1 > v0);
        g.insert_term(Term::new("B", "b")).unwrap();
        g.insert_edge(RelationEdge::is_a("A", "B")).unwrap();
        let v2 = g.version();
        assert!(v2 > v1);
        g.remove_term("A");
        assert!(g.version() > v2);
    }

    #[test]
    fn test_merge_unions_synonyms_and_edges() {
        let mut left = TermGraph::new();
        left.insert_term(Term::new("X", "x").with_synonyms(["ex"])).unwrap();
        left.insert_term(Term::new("Y", "y")).unwrap();

        let mut right = TermGraph::new();
        right.insert_term(Term::new("X", "x").with_synonyms(["chi"])).unwrap();
        right.insert_term(Term::new("Z", "z")).unwrap();
        right.insert_edge(RelationEdge::is_a("X", "Z")).unwrap();

        left.merge(&right).unwrap();
        assert_eq!(left.term_count(), 3);
        assert_eq!(left.edge_count(), 1);
        assert_eq!(left.term("X").unwrap().synonyms.len(), 2);
    }

    #[test]
    fn test_merge_conflicting_label_leaves_target_unmodified() {
        let mut left = TermGraph::new();
        left.insert_term(Term::new("X", "x")).unwrap();
        let v = left.version();

        let mut right = TermGraph::new();
        right.insert_term(Term::new("W", "w")).unwrap();
        right.insert_term(Term::new("X", "not x")).unwrap();

        let err = left.merge(&right).unwrap_err();
        assert!(matches!(err, GraphError::ConflictingLabel { .. }));
        // Pre-pass detection: nothing from `right` leaked in
        assert_eq!(left.version(), v);
        assert_eq!(left.term_count(), 1);
        assert!(!left.contains_term("W"));
    }

    #[test]
    fn test_induced_subgraph_copies_only_induced_edges() {
        let g = three_term_chain();
        let ids: HashSet<String> = [uri("A"), uri("B")].into_iter().collect();
        let sub = g.induced_subgraph(&ids);
        assert_eq!(sub.term_count(), 2);
        assert_eq!(sub.edge_count(), 1); // A->B survives, B->C does not
    }

    #[test]
    fn test_remove_source() {
        let mut g = TermGraph::new();
        g.insert_term_tagged(Term::new("A", "a"), Some("go")).unwrap();
        g.insert_term_tagged(Term::new("B", "b"), Some("cl")).unwrap();
        g.insert_edge(RelationEdge::is_a("A", "B").with_provenance("go"))
            .unwrap();

        let removed = g.remove_source("go");
        assert_eq!(removed, 1);
        assert!(!g.contains_term("A"));
        assert!(g.contains_term("B"));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_graph_serialization_shape() {
        let g = three_term_chain();
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["edges"].as_array().unwrap().len(), 2);
    }
}
