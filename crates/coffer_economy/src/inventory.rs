//! # Inventory System
//!
//! Individually identified item instances, each pointing at a catalog
//! item definition.
//!
//! Instances are kept in insertion order. Every enumeration
//! (`find_items_by_definition`, `items`) follows that order, which makes
//! automatic cost selection deterministic: the oldest matching instances
//! are always consumed first.

use parking_lot::RwLock;
use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::error::{EconomyError, EconomyResult};
use crate::notify::Listeners;

/// A single item instance owned by the player.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InventoryItem {
    /// Unique instance id.
    pub id: String,
    /// Catalog item definition key.
    pub definition: String,
}

/// Change notification raised by the inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryEvent {
    /// An instance was created.
    ItemAdded(InventoryItem),
    /// An instance was removed.
    ItemRemoved(InventoryItem),
}

/// Inventory operations consumed by the transaction engine.
pub trait InventoryService: Send + Sync {
    /// Creates an instance of `definition`.
    ///
    /// Uses `instance_id` when given, otherwise generates one.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownItem` or `EconomyError::DuplicateInstance`.
    fn create_item_internal(
        &self,
        definition: &str,
        instance_id: Option<&str>,
    ) -> EconomyResult<InventoryItem>;

    /// Removes the instance with id `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ItemInstanceNotFound` if no such instance exists.
    fn remove_item_internal(&self, instance_id: &str) -> EconomyResult<InventoryItem>;

    /// All instances of `definition`, in insertion order.
    fn find_items_by_definition(&self, definition: &str) -> Vec<InventoryItem>;

    /// The instance with id `instance_id`, if present.
    fn find_item(&self, instance_id: &str) -> Option<InventoryItem>;

    /// Number of instances of `definition`.
    fn count_by_definition(&self, definition: &str) -> u64 {
        self.find_items_by_definition(definition).len() as u64
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct InventoryState {
    items: Vec<InventoryItem>,
    next_sequence: u64,
}

/// Frozen copy of the inventory, for rollback and comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventorySnapshot {
    state: InventoryState,
}

impl InventorySnapshot {
    /// Instances at snapshot time, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[InventoryItem] {
        &self.state.items
    }
}

/// In-memory inventory.
#[derive(Debug, Default)]
pub struct Inventory {
    definitions: HashSet<String>,
    state: RwLock<InventoryState>,
    listeners: Listeners<InventoryEvent>,
}

impl Inventory {
    /// Creates an empty inventory accepting every catalog item definition.
    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            definitions: catalog.items().map(|i| i.key.clone()).collect(),
            state: RwLock::new(InventoryState::default()),
            listeners: Listeners::new(),
        }
    }

    /// Subscribes to inventory changes.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<InventoryEvent> {
        self.listeners.subscribe()
    }

    /// All instances, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<InventoryItem> {
        self.state.read().items.clone()
    }

    /// Total number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    /// Returns true if the inventory holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().items.is_empty()
    }

    /// Creates a snapshot of the inventory for rollback.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            state: self.state.read().clone(),
        }
    }

    /// Restores inventory from a snapshot (rollback).
    pub fn restore(&self, snapshot: &InventorySnapshot) {
        *self.state.write() = snapshot.state.clone();
    }
}

impl InventoryService for Inventory {
    fn create_item_internal(
        &self,
        definition: &str,
        instance_id: Option<&str>,
    ) -> EconomyResult<InventoryItem> {
        if !self.definitions.contains(definition) {
            return Err(EconomyError::UnknownItem(definition.to_string()));
        }

        let item = {
            let mut state = self.state.write();
            let id = match instance_id {
                Some(id) => {
                    if state.items.iter().any(|i| i.id == id) {
                        return Err(EconomyError::DuplicateInstance(id.to_string()));
                    }
                    id.to_string()
                }
                None => loop {
                    state.next_sequence += 1;
                    let candidate = format!("{definition}-{}", state.next_sequence);
                    if !state.items.iter().any(|i| i.id == candidate) {
                        break candidate;
                    }
                },
            };
            let item = InventoryItem {
                id,
                definition: definition.to_string(),
            };
            state.items.push(item.clone());
            item
        };

        self.listeners.publish(&InventoryEvent::ItemAdded(item.clone()));
        Ok(item)
    }

    fn remove_item_internal(&self, instance_id: &str) -> EconomyResult<InventoryItem> {
        let item = {
            let mut state = self.state.write();
            let index = state
                .items
                .iter()
                .position(|i| i.id == instance_id)
                .ok_or_else(|| EconomyError::ItemInstanceNotFound(instance_id.to_string()))?;
            state.items.remove(index)
        };

        self.listeners
            .publish(&InventoryEvent::ItemRemoved(item.clone()));
        Ok(item)
    }

    fn find_items_by_definition(&self, definition: &str) -> Vec<InventoryItem> {
        self.state
            .read()
            .items
            .iter()
            .filter(|i| i.definition == definition)
            .cloned()
            .collect()
    }

    fn find_item(&self, instance_id: &str) -> Option<InventoryItem> {
        self.state
            .read()
            .items
            .iter()
            .find(|i| i.id == instance_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InventoryItemDefinition;

    fn inventory() -> Inventory {
        let catalog = Catalog::builder()
            .add_item(InventoryItemDefinition::new("sword", "Sword"))
            .add_item(InventoryItemDefinition::new("key", "Key"))
            .build()
            .unwrap();
        Inventory::from_catalog(&catalog)
    }

    #[test]
    fn test_create_generates_ids() {
        let inv = inventory();
        let a = inv.create_item_internal("sword", None).unwrap();
        let b = inv.create_item_internal("sword", None).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(inv.count_by_definition("sword"), 2);
    }

    #[test]
    fn test_create_with_explicit_id() {
        let inv = inventory();
        let item = inv.create_item_internal("key", Some("key-from-server")).unwrap();
        assert_eq!(item.id, "key-from-server");

        let dup = inv.create_item_internal("key", Some("key-from-server"));
        assert!(matches!(dup, Err(EconomyError::DuplicateInstance(_))));
    }

    #[test]
    fn test_unknown_definition() {
        let inv = inventory();
        let result = inv.create_item_internal("shield", None);
        assert!(matches!(result, Err(EconomyError::UnknownItem(_))));
    }

    #[test]
    fn test_generated_id_skips_taken_ids() {
        let inv = inventory();
        inv.create_item_internal("sword", Some("sword-1")).unwrap();
        let generated = inv.create_item_internal("sword", None).unwrap();
        assert_eq!(generated.id, "sword-2");
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let inv = inventory();
        inv.create_item_internal("key", Some("k3")).unwrap();
        inv.create_item_internal("sword", Some("s1")).unwrap();
        inv.create_item_internal("key", Some("k1")).unwrap();
        inv.create_item_internal("key", Some("k2")).unwrap();

        let keys: Vec<_> = inv
            .find_items_by_definition("key")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(keys, vec!["k3", "k1", "k2"]);
    }

    #[test]
    fn test_remove_items() {
        let inv = inventory();
        let item = inv.create_item_internal("sword", None).unwrap();
        inv.remove_item_internal(&item.id).unwrap();
        assert!(inv.is_empty());

        let again = inv.remove_item_internal(&item.id);
        assert!(matches!(again, Err(EconomyError::ItemInstanceNotFound(_))));
    }

    #[test]
    fn test_events() {
        let inv = inventory();
        let events = inv.subscribe();
        let item = inv.create_item_internal("sword", Some("s")).unwrap();
        inv.remove_item_internal("s").unwrap();

        assert_eq!(events.try_recv().unwrap(), InventoryEvent::ItemAdded(item.clone()));
        assert_eq!(events.try_recv().unwrap(), InventoryEvent::ItemRemoved(item));
    }

    #[test]
    fn test_snapshot_restore() {
        let inv = inventory();
        inv.create_item_internal("sword", Some("s1")).unwrap();

        let snapshot = inv.snapshot();

        inv.create_item_internal("key", Some("k1")).unwrap();
        assert_eq!(inv.count_by_definition("key"), 1);

        inv.restore(&snapshot);
        assert_eq!(inv.count_by_definition("key"), 0);
        assert_eq!(inv.snapshot(), snapshot);
        assert_eq!(snapshot.items().len(), 1);
    }
}
