//! Compact Identifier (CURIE) Resolution
//!
//! Maps between `prefix:local` compact identifiers and full resource URIs.
//! The mapping table is loaded once at construction (from explicit pairs or
//! a TOML `[prefixes]` table) and is immutable afterwards apart from
//! explicit `register` calls; resolvers are shared by reference
//! (`Arc<CurieResolver>`) rather than held as ambient global state.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised by CURIE expansion and contraction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurieError {
    /// The prefix segment has no registered mapping.
    #[error("unknown prefix {prefix:?} in {curie:?}")]
    UnknownPrefix { prefix: String, curie: String },

    /// No registered base URI is a prefix of the given URI.
    #[error("no registered prefix matches URI {uri:?}")]
    NoMatchingPrefix { uri: String },

    /// The prefix is already bound to a different base URI.
    #[error("prefix {prefix:?} already bound to {existing:?}, cannot rebind to {requested:?}")]
    DuplicatePrefix {
        prefix: String,
        existing: String,
        requested: String,
    },

    /// The compact identifier has no `prefix:local` structure.
    #[error("malformed compact identifier {curie:?} (expected prefix:local)")]
    MalformedCurie { curie: String },

    /// The prefix configuration file could not be read or parsed.
    #[error("failed to load prefix configuration: {0}")]
    Config(String),
}

/// TOML shape for prefix configuration files.
///
/// ```toml
/// [prefixes]
/// GO = "http://purl.obolibrary.org/obo/GO_"
/// CL = "http://purl.obolibrary.org/obo/CL_"
/// ```
#[derive(Debug, Deserialize)]
struct PrefixConfig {
    #[serde(default)]
    prefixes: HashMap<String, String>,
}

/// The OBO PURL prefixes most graph sources assume.
const OBO_DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("GO", "http://purl.obolibrary.org/obo/GO_"),
    ("CL", "http://purl.obolibrary.org/obo/CL_"),
    ("UBERON", "http://purl.obolibrary.org/obo/UBERON_"),
    ("CHEBI", "http://purl.obolibrary.org/obo/CHEBI_"),
    ("RO", "http://purl.obolibrary.org/obo/RO_"),
    ("BFO", "http://purl.obolibrary.org/obo/BFO_"),
    ("OBAN", "http://purl.org/oban/"),
];

/// Bidirectional prefix ↔ base-URI resolver.
///
/// `contract` picks the longest matching base URI, so overlapping bases
/// (e.g. a generic OBO base and a term-specific one) resolve to the most
/// specific registered prefix.
#[derive(Debug, Clone, Default)]
pub struct CurieResolver {
    /// prefix → base URI
    expansions: HashMap<String, String>,

    /// (base URI, prefix) sorted longest-base-first for contraction
    contractions: Vec<(String, String)>,
}

impl CurieResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver from an ordered list of (prefix, base URI) pairs.
    pub fn from_pairs<I, P, B>(pairs: I) -> Result<Self, CurieError>
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<String>,
        B: Into<String>,
    {
        let mut resolver = Self::new();
        for (prefix, base) in pairs {
            resolver.register(prefix.into(), base.into())?;
        }
        Ok(resolver)
    }

    /// Create a resolver seeded with the common OBO PURL prefixes.
    pub fn with_obo_defaults() -> Self {
        // Defaults are distinct, registration cannot fail
        Self::from_pairs(OBO_DEFAULT_PREFIXES.iter().copied())
            .expect("default prefix table is conflict-free")
    }

    /// Load a resolver from a TOML string with a `[prefixes]` table.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CurieError> {
        let config: PrefixConfig =
            toml::from_str(toml_str).map_err(|e| CurieError::Config(e.to_string()))?;
        let mut pairs: Vec<(String, String)> = config.prefixes.into_iter().collect();
        // HashMap ordering is arbitrary; keep registration deterministic
        pairs.sort();
        Self::from_pairs(pairs)
    }

    /// Load a resolver from a TOML file with a `[prefixes]` table.
    pub fn from_toml_file(path: &Path) -> Result<Self, CurieError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| CurieError::Config(e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// Register a (prefix, base URI) mapping.
    ///
    /// Re-registering an identical pair is a no-op; binding an existing
    /// prefix to a different base fails with `DuplicatePrefix`.
    pub fn register(
        &mut self,
        prefix: impl Into<String>,
        base: impl Into<String>,
    ) -> Result<(), CurieError> {
        let prefix = prefix.into();
        let base = base.into();
        if let Some(existing) = self.expansions.get(&prefix) {
            if *existing == base {
                return Ok(());
            }
            return Err(CurieError::DuplicatePrefix {
                prefix,
                existing: existing.clone(),
                requested: base,
            });
        }
        self.expansions.insert(prefix.clone(), base.clone());
        self.contractions.push((base, prefix));
        self.contractions
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Ok(())
    }

    /// Number of registered prefixes.
    pub fn len(&self) -> usize {
        self.expansions.len()
    }

    /// Whether no prefixes are registered.
    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }

    /// Expand a compact identifier to its full URI.
    pub fn expand(&self, curie: &str) -> Result<String, CurieError> {
        let (prefix, local) = curie
            .split_once(':')
            .ok_or_else(|| CurieError::MalformedCurie {
                curie: curie.to_string(),
            })?;
        let base = self
            .expansions
            .get(prefix)
            .ok_or_else(|| CurieError::UnknownPrefix {
                prefix: prefix.to_string(),
                curie: curie.to_string(),
            })?;
        Ok(format!("{base}{local}"))
    }

    /// Contract a full URI to a compact identifier.
    ///
    /// The longest registered base URI that prefixes the input wins.
    pub fn contract(&self, uri: &str) -> Result<String, CurieError> {
        for (base, prefix) in &self.contractions {
            if let Some(local) = uri.strip_prefix(base.as_str()) {
                return Ok(format!("{prefix}:{local}"));
            }
        }
        Err(CurieError::NoMatchingPrefix {
            uri: uri.to_string(),
        })
    }

    /// Normalize an identifier to full-URI form.
    ///
    /// A string containing `://` is taken as already expanded; anything
    /// else is treated as a CURIE and expanded.
    pub fn normalize(&self, id: &str) -> Result<String, CurieError> {
        if id.contains("://") {
            Ok(id.to_string())
        } else {
            self.expand(id)
        }
    }

    /// Contract if a prefix matches, otherwise pass the URI through.
    ///
    /// Query results must not fail on foreign namespaces.
    pub fn contract_or_passthrough(&self, uri: &str) -> String {
        self.contract(uri).unwrap_or_else(|_| uri.to_string())
    }

    /// Expand if the id is a CURIE with a registered prefix, otherwise pass
    /// it through unchanged (full URIs and foreign ids).
    ///
    /// This is the lenient form used at the loader's record boundary:
    /// sources may ship either id form, and ids from unregistered
    /// namespaces must still load.
    pub fn expand_or_passthrough(&self, id: &str) -> String {
        if id.contains("://") {
            return id.to_string();
        }
        self.expand(id).unwrap_or_else(|_| id.to_string())
    }
}
