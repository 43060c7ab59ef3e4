//! Concept taxonomy: a single-rooted tree of data types.
//!
//! The hierarchy is immutable after load. Ancestor and descendant closures
//! are precomputed once, by walking each node to the root; all per-run
//! planning annotations live elsewhere, keyed by [`ConceptId`].

use crate::error::CatalogError;
use crate::types::ConceptId;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Raw concept declaration, as handed over by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptDef {
    pub name: String,
    /// Absent iff this is the root concept.
    pub parent: Option<String>,
}

/// Immutable concept hierarchy with interned ids and precomputed closures.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    names: Vec<String>,
    ids: BTreeMap<String, ConceptId>,
    parents: Vec<Option<ConceptId>>,
    /// Parent -> child edges.
    hierarchy: DiGraphMap<ConceptId, ()>,
    /// Self plus all ancestors, per concept.
    ancestors: Vec<BTreeSet<ConceptId>>,
    /// Self plus all descendants, per concept.
    descendants: Vec<BTreeSet<ConceptId>>,
    root: Option<ConceptId>,
}

impl Taxonomy {
    pub fn resolve(&self, name: &str) -> Result<ConceptId, CatalogError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| CatalogError::UnknownConcept(name.to_string()))
    }

    pub fn name(&self, id: ConceptId) -> &str {
        &self.names[id.index()]
    }

    pub fn parent(&self, id: ConceptId) -> Option<ConceptId> {
        self.parents[id.index()]
    }

    pub fn root(&self) -> Option<ConceptId> {
        self.root
    }

    /// Self plus all ancestors of `id`.
    pub fn ancestors_of(&self, id: ConceptId) -> &BTreeSet<ConceptId> {
        &self.ancestors[id.index()]
    }

    /// Self plus all descendants of `id`.
    pub fn descendants_of(&self, id: ConceptId) -> &BTreeSet<ConceptId> {
        &self.descendants[id.index()]
    }

    /// Ancestor closure of a whole concept set.
    pub fn close_upward(&self, concepts: &BTreeSet<ConceptId>) -> BTreeSet<ConceptId> {
        concepts
            .iter()
            .flat_map(|c| self.ancestors_of(*c).iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn concept_ids(&self) -> impl Iterator<Item = ConceptId> + '_ {
        (0..self.names.len() as u32).map(ConceptId)
    }
}

/// Builder that collects declarations and validates the tree on `build`.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyBuilder {
    defs: Vec<ConceptDef>,
}

impl TaxonomyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn concept(mut self, name: &str, parent: Option<&str>) -> Self {
        self.defs.push(ConceptDef {
            name: name.to_string(),
            parent: parent.map(str::to_string),
        });
        self
    }

    pub fn build(self) -> Result<Taxonomy, CatalogError> {
        if self.defs.is_empty() {
            return Err(CatalogError::EmptyTaxonomy);
        }

        let mut names = Vec::with_capacity(self.defs.len());
        let mut ids = BTreeMap::new();
        for def in &self.defs {
            let id = ConceptId(names.len() as u32);
            if ids.insert(def.name.clone(), id).is_some() {
                return Err(CatalogError::DuplicateConcept(def.name.clone()));
            }
            names.push(def.name.clone());
        }

        let mut parents = vec![None; names.len()];
        let mut hierarchy = DiGraphMap::new();
        let mut roots = Vec::new();
        for def in &self.defs {
            let id = ids[&def.name];
            hierarchy.add_node(id);
            match &def.parent {
                Some(parent_name) => {
                    let parent = ids
                        .get(parent_name)
                        .copied()
                        .ok_or_else(|| CatalogError::UnknownConcept(parent_name.clone()))?;
                    parents[id.index()] = Some(parent);
                    hierarchy.add_edge(parent, id, ());
                }
                None => roots.push(def.name.clone()),
            }
        }

        if roots.len() != 1 {
            return Err(CatalogError::MultipleRoots(roots));
        }
        if petgraph::algo::is_cyclic_directed(&hierarchy) {
            return Err(CatalogError::CyclicTaxonomy(names[0].clone()));
        }
        let root = ids[&roots[0]];

        // Ancestor closure: walk each node up to the root. A node whose
        // parent chain never reaches the root sits in a detached cycle.
        let mut ancestors = Vec::with_capacity(names.len());
        for idx in 0..names.len() {
            let mut closure = BTreeSet::new();
            let mut cursor = Some(ConceptId(idx as u32));
            while let Some(c) = cursor {
                if !closure.insert(c) {
                    return Err(CatalogError::CyclicTaxonomy(names[idx].clone()));
                }
                cursor = parents[c.index()];
            }
            if !closure.contains(&root) {
                return Err(CatalogError::CyclicTaxonomy(names[idx].clone()));
            }
            ancestors.push(closure);
        }

        let mut descendants = Vec::with_capacity(names.len());
        for idx in 0..names.len() {
            let start = ConceptId(idx as u32);
            let mut closure = BTreeSet::new();
            let mut bfs = Bfs::new(&hierarchy, start);
            while let Some(node) = bfs.next(&hierarchy) {
                closure.insert(node);
            }
            descendants.push(closure);
        }

        Ok(Taxonomy {
            names,
            ids,
            parents,
            hierarchy,
            ancestors,
            descendants,
            root: Some(root),
        })
    }
}

impl Taxonomy {
    /// Direct children of a concept, in id order.
    pub fn children_of(&self, id: ConceptId) -> Vec<ConceptId> {
        let mut out: Vec<ConceptId> = self
            .hierarchy
            .neighbors_directed(id, Direction::Outgoing)
            .collect();
        out.sort_unstable();
        out
    }
}
