//! Task catalog: parsed task definitions, the live availability map, and
//! the concept -> invocable-task inverted index.
//!
//! Tasks are parsed once; availability toggles across planning and repair
//! attempts. The index must be rebuilt after every availability change and
//! before the next attempt.

use crate::error::CatalogError;
use crate::taxonomy::Taxonomy;
use crate::types::{ConceptId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A task definition over the taxonomy.
///
/// Inputs are the most general types the task accepts. Outputs are stored
/// ancestor-closed: producing a specific type also certifies every
/// supertype of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDef {
    pub id: TaskId,
    pub inputs: BTreeSet<ConceptId>,
    pub outputs: BTreeSet<ConceptId>,
}

/// The catalog value owned by a planner instance.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    taxonomy: Taxonomy,
    tasks: BTreeMap<TaskId, TaskDef>,
    available: BTreeSet<TaskId>,
    /// concept -> available tasks invocable once that concept is known,
    /// including tasks whose declared input is an ancestor of it.
    index: BTreeMap<ConceptId, BTreeSet<TaskId>>,
}

impl Catalog {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy,
            tasks: BTreeMap::new(),
            available: BTreeSet::new(),
            index: BTreeMap::new(),
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Parse a task into the catalog. Outputs are ancestor-closed here.
    pub fn add_task(
        &mut self,
        id: impl Into<TaskId>,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<(), CatalogError> {
        let id = id.into();
        if self.tasks.contains_key(&id) {
            return Err(CatalogError::DuplicateTask(id));
        }
        let mut input_ids = BTreeSet::new();
        for name in inputs {
            input_ids.insert(self.taxonomy.resolve(name)?);
        }
        let mut output_ids = BTreeSet::new();
        for name in outputs {
            let concept = self.taxonomy.resolve(name)?;
            output_ids.extend(self.taxonomy.ancestors_of(concept).iter().copied());
        }
        self.available.insert(id.clone());
        self.tasks.insert(
            id.clone(),
            TaskDef {
                id,
                inputs: input_ids,
                outputs: output_ids,
            },
        );
        Ok(())
    }

    pub fn task(&self, id: &TaskId) -> Option<&TaskDef> {
        self.tasks.get(id)
    }

    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn is_available(&self, id: &TaskId) -> bool {
        self.available.contains(id)
    }

    pub fn available_tasks(&self) -> impl Iterator<Item = &TaskDef> {
        self.available.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Remove a task from the live availability map. Returns whether it was
    /// available. The index is stale until [`Catalog::rebuild_index`].
    pub fn remove_task(&mut self, id: &TaskId) -> bool {
        self.available.remove(id)
    }

    /// Reinsert a previously removed task into the availability map.
    pub fn restore_task(&mut self, id: &TaskId) -> Result<(), CatalogError> {
        if !self.tasks.contains_key(id) {
            return Err(CatalogError::UnknownTask(id.clone()));
        }
        self.available.insert(id.clone());
        Ok(())
    }

    /// Rebuild the inverted index over the current availability map.
    ///
    /// A task with declared input `i` is invocable by every descendant of
    /// `i`: a more specific known type satisfies the precondition.
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for id in &self.available {
            let Some(def) = self.tasks.get(id) else {
                continue;
            };
            for input in &def.inputs {
                for concept in self.taxonomy.descendants_of(*input) {
                    self.index
                        .entry(*concept)
                        .or_default()
                        .insert(id.clone());
                }
            }
        }
    }

    /// Available tasks invocable once `concept` is known.
    pub fn tasks_invocable_by(&self, concept: ConceptId) -> impl Iterator<Item = &TaskId> {
        self.index.get(&concept).into_iter().flatten()
    }
}

impl crate::api::TypeIndex for Catalog {
    fn resolve_type(&self, raw_type_id: &str) -> Result<ConceptId, CatalogError> {
        self.taxonomy.resolve(raw_type_id)
    }

    fn ancestors_of(&self, concept: ConceptId) -> BTreeSet<ConceptId> {
        self.taxonomy.ancestors_of(concept).clone()
    }

    fn descendants_of(&self, concept: ConceptId) -> BTreeSet<ConceptId> {
        self.taxonomy.descendants_of(concept).clone()
    }

    fn tasks_invocable_by_type(&self, concept: ConceptId) -> BTreeSet<TaskId> {
        self.tasks_invocable_by(concept).cloned().collect()
    }

    fn rebuild_index(&mut self) {
        Catalog::rebuild_index(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::TaxonomyBuilder;

    fn catalog() -> Catalog {
        let taxonomy = TaxonomyBuilder::new()
            .concept("Thing", None)
            .concept("Vehicle", Some("Thing"))
            .concept("Car", Some("Vehicle"))
            .concept("Quote", Some("Thing"))
            .build()
            .unwrap();
        let mut catalog = Catalog::new(taxonomy);
        catalog
            .add_task("price-vehicle", &["Vehicle"], &["Quote"])
            .unwrap();
        catalog.rebuild_index();
        catalog
    }

    #[test]
    fn outputs_are_ancestor_closed() {
        let catalog = catalog();
        let quote = catalog.taxonomy().resolve("Quote").unwrap();
        let thing = catalog.taxonomy().resolve("Thing").unwrap();
        let def = catalog.task(&TaskId::from("price-vehicle")).unwrap();
        assert!(def.outputs.contains(&quote));
        assert!(def.outputs.contains(&thing));
    }

    #[test]
    fn index_covers_subtypes_of_declared_input() {
        let catalog = catalog();
        let car = catalog.taxonomy().resolve("Car").unwrap();
        let ids: Vec<&TaskId> = catalog.tasks_invocable_by(car).collect();
        assert_eq!(ids, vec![&TaskId::from("price-vehicle")]);
    }

    #[test]
    fn index_excludes_supertypes_of_declared_input() {
        let catalog = catalog();
        let thing = catalog.taxonomy().resolve("Thing").unwrap();
        assert_eq!(catalog.tasks_invocable_by(thing).count(), 0);
    }

    #[test]
    fn removal_takes_effect_after_rebuild() {
        let mut catalog = catalog();
        let car = catalog.taxonomy().resolve("Car").unwrap();
        let id = TaskId::from("price-vehicle");

        assert!(catalog.remove_task(&id));
        // Index is stale until rebuilt.
        assert_eq!(catalog.tasks_invocable_by(car).count(), 1);
        catalog.rebuild_index();
        assert_eq!(catalog.tasks_invocable_by(car).count(), 0);

        catalog.restore_task(&id).unwrap();
        catalog.rebuild_index();
        assert_eq!(catalog.tasks_invocable_by(car).count(), 1);
    }

    #[test]
    fn duplicate_task_rejected() {
        let mut catalog = catalog();
        let result = catalog.add_task("price-vehicle", &["Vehicle"], &["Quote"]);
        assert!(matches!(result, Err(CatalogError::DuplicateTask(_))));
    }
}
