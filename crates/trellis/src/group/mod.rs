//! Column/row grouping.
//!
//! A [`GroupModel`] holds named groups of underlying *indexes* (indexes, not
//! positions, so a group survives reordering and hiding beneath it), each
//! with a collapsed flag, a collapseable flag and a set of static members
//! that stay visible while the group is collapsed.
//!
//! One model instance may feed several layer stacks (the same grouping shown
//! in two views), so listener registration on [`changed`](GroupModel::changed)
//! is additive and the model never assumes a single subscriber.

mod expand_collapse;
mod header;

pub use expand_collapse::GroupExpandCollapseLayer;
pub use header::GroupHeaderLayer;

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use trellis_core::logging::targets;
use trellis_core::Signal;

use crate::coords::Range;
use crate::error::{Error, Result};

/// A named collection of indexes with collapse state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: Vec<usize>,
    collapsed: bool,
    collapseable: bool,
    static_members: BTreeSet<usize>,
}

impl Group {
    fn new(name: impl Into<String>, members: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            members,
            collapsed: false,
            collapseable: true,
            static_members: BTreeSet::new(),
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The member indexes in group order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Whether the group is currently collapsed.
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Whether the group may be collapsed at all.
    pub fn is_collapseable(&self) -> bool {
        self.collapseable
    }

    /// The members that stay visible while the group is collapsed.
    pub fn static_members(&self) -> Vec<usize> {
        self.static_members.iter().copied().collect()
    }

    /// Whether `index` belongs to this group.
    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    /// The members hidden by collapsing: `members − static`.
    pub fn collapsible_members(&self) -> Vec<usize> {
        self.members
            .iter()
            .copied()
            .filter(|index| !self.static_members.contains(index))
            .collect()
    }
}

/// The shared model behind group header and expand/collapse layers.
pub struct GroupModel {
    groups: RwLock<Vec<Group>>,
    /// Emitted after any model mutation.
    pub changed: Signal<()>,
}

impl Default for GroupModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(Vec::new()),
            changed: Signal::new(),
        }
    }

    /// Snapshot of all groups in creation order.
    pub fn groups(&self) -> Vec<Group> {
        self.groups.read().clone()
    }

    /// Snapshot of the group with the given name.
    pub fn group_by_name(&self, name: &str) -> Option<Group> {
        self.groups.read().iter().find(|g| g.name == name).cloned()
    }

    /// Snapshot of the group containing `index`.
    pub fn group_of_index(&self, index: usize) -> Option<Group> {
        self.groups
            .read()
            .iter()
            .find(|g| g.contains(index))
            .cloned()
    }

    /// Whether `index` belongs to any group.
    pub fn is_grouped(&self, index: usize) -> bool {
        self.groups.read().iter().any(|g| g.contains(index))
    }

    /// Registers `indexes` under `name`, merging into an existing group of
    /// that name.
    ///
    /// An index may belong to at most one group; if any of the indexes is
    /// already a member of a *different* group, nothing changes and `false`
    /// is returned.
    pub fn add_group(&self, name: &str, indexes: &[usize]) -> bool {
        let mut groups = self.groups.write();
        let conflict = indexes.iter().any(|&index| {
            groups
                .iter()
                .any(|g| g.name != name && g.contains(index))
        });
        if conflict || indexes.is_empty() {
            return false;
        }
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => {
                for &index in indexes {
                    if !group.members.contains(&index) {
                        group.members.push(index);
                    }
                }
            }
            None => groups.push(Group::new(name, indexes.to_vec())),
        }
        drop(groups);
        tracing::debug!(target: targets::GROUP, name, ?indexes, "grouped indexes");
        self.changed.emit(());
        true
    }

    /// Removes `indexes` from whatever groups they belong to.
    ///
    /// A group left with a single member is dissolved entirely rather than
    /// kept as a trivial size-1 group.
    pub fn remove_indexes(&self, indexes: &[usize]) {
        {
            let mut groups = self.groups.write();
            for group in groups.iter_mut() {
                group.members.retain(|index| !indexes.contains(index));
                for index in indexes {
                    group.static_members.remove(index);
                }
            }
            groups.retain(|g| g.members.len() > 1);
        }
        self.changed.emit(());
    }

    /// Removes a whole group, leaving its members ungrouped.
    pub fn remove_group(&self, name: &str) -> bool {
        let removed = {
            let mut groups = self.groups.write();
            let before = groups.len();
            groups.retain(|g| g.name != name);
            groups.len() != before
        };
        if removed {
            self.changed.emit(());
        }
        removed
    }

    /// Sets a group's collapsed flag. Returns `false` for unknown groups and
    /// for collapse requests on non-collapseable groups.
    pub fn set_collapsed(&self, name: &str, collapsed: bool) -> bool {
        let changed = {
            let mut groups = self.groups.write();
            match groups.iter_mut().find(|g| g.name == name) {
                Some(group) => {
                    if collapsed && !group.collapseable {
                        false
                    } else {
                        let changed = group.collapsed != collapsed;
                        group.collapsed = collapsed;
                        changed
                    }
                }
                None => false,
            }
        };
        if changed {
            self.changed.emit(());
        }
        changed
    }

    /// Sets whether a group may be collapsed.
    pub fn set_collapseable(&self, name: &str, collapseable: bool) {
        let mut changed = false;
        {
            let mut groups = self.groups.write();
            if let Some(group) = groups.iter_mut().find(|g| g.name == name) {
                changed = group.collapseable != collapseable;
                group.collapseable = collapseable;
            }
        }
        if changed {
            self.changed.emit(());
        }
    }

    /// Marks a member as static (visible while collapsed) or not.
    pub fn set_static(&self, name: &str, index: usize, is_static: bool) {
        let mut changed = false;
        {
            let mut groups = self.groups.write();
            if let Some(group) = groups.iter_mut().find(|g| g.name == name) {
                if group.contains(index) {
                    changed = if is_static {
                        group.static_members.insert(index)
                    } else {
                        group.static_members.remove(&index)
                    };
                }
            }
        }
        if changed {
            self.changed.emit(());
        }
    }

    /// The indexes hidden by the current collapse state: the union of
    /// `members − static` over all collapsed groups.
    pub fn collapsed_hidden_indexes(&self) -> Vec<usize> {
        let mut hidden: Vec<usize> = self
            .groups
            .read()
            .iter()
            .filter(|g| g.collapsed)
            .flat_map(|g| g.collapsible_members())
            .collect();
        hidden.sort_unstable();
        hidden.dedup();
        hidden
    }

    /// Shifts member indexes for an insertion of `count` indexes at `at`.
    ///
    /// The owner of the data calls this once per mutation; the model is
    /// often shared between stacks and must not be shifted per-view.
    pub fn adjust_for_inserted(&self, at: usize, count: usize) {
        {
            let mut groups = self.groups.write();
            for group in groups.iter_mut() {
                for member in group.members.iter_mut() {
                    if *member >= at {
                        *member += count;
                    }
                }
                group.static_members = group
                    .static_members
                    .iter()
                    .map(|&i| if i >= at { i + count } else { i })
                    .collect();
            }
        }
        self.changed.emit(());
    }

    /// Drops members in the deleted index range and shifts the rest down.
    pub fn adjust_for_deleted(&self, range: Range) {
        {
            let mut groups = self.groups.write();
            for group in groups.iter_mut() {
                group.members.retain(|member| !range.contains(*member));
                for member in group.members.iter_mut() {
                    if *member >= range.end {
                        *member -= range.len();
                    }
                }
                group.static_members = group
                    .static_members
                    .iter()
                    .filter(|&&i| !range.contains(i))
                    .map(|&i| if i >= range.end { i - range.len() } else { i })
                    .collect();
            }
            groups.retain(|g| g.members.len() > 1);
        }
        self.changed.emit(());
    }

    // -------------------------------------------------------------------------
    // State snapshot surface
    // -------------------------------------------------------------------------

    /// Writes the model into a string-property map under `prefix`.
    ///
    /// Member lists use the literal comma-separated ordered form persistence
    /// collaborators expect, e.g. `"5,3,7,"`. Group names must not contain
    /// commas.
    pub fn save_state(&self, prefix: &str, properties: &mut BTreeMap<String, String>) {
        let groups = self.groups.read();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        properties.insert(format!("{prefix}.groups"), names.join(","));
        for group in groups.iter() {
            let key = |suffix: &str| format!("{prefix}.group.{}.{suffix}", group.name);
            properties.insert(key("members"), format_index_list(&group.members));
            properties.insert(
                key("statics"),
                format_index_list(&group.static_members.iter().copied().collect::<Vec<_>>()),
            );
            properties.insert(key("collapsed"), group.collapsed.to_string());
            properties.insert(key("collapseable"), group.collapseable.to_string());
        }
    }

    /// Restores the model from a string-property map written by
    /// [`save_state`](Self::save_state), replacing the current groups.
    pub fn load_state(
        &self,
        prefix: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        let names_key = format!("{prefix}.groups");
        let names = properties
            .get(&names_key)
            .ok_or_else(|| Error::missing_property(&names_key))?;

        let mut groups = Vec::new();
        for name in names.split(',').filter(|n| !n.is_empty()) {
            let key = |suffix: &str| format!("{prefix}.group.{name}.{suffix}");
            let members_key = key("members");
            let members = properties
                .get(&members_key)
                .ok_or_else(|| Error::missing_property(&members_key))?;
            let mut group = Group::new(name, parse_index_list(&members_key, members)?);
            if let Some(statics) = properties.get(&key("statics")) {
                group.static_members = parse_index_list(&key("statics"), statics)?
                    .into_iter()
                    .collect();
            }
            if let Some(collapsed) = properties.get(&key("collapsed")) {
                group.collapsed = parse_bool(&key("collapsed"), collapsed)?;
            }
            if let Some(collapseable) = properties.get(&key("collapseable")) {
                group.collapseable = parse_bool(&key("collapseable"), collapseable)?;
            }
            groups.push(group);
        }
        *self.groups.write() = groups;
        self.changed.emit(());
        Ok(())
    }
}

/// Formats indexes as the persistence collaborators' literal form `"5,3,7,"`.
fn format_index_list(indexes: &[usize]) -> String {
    let mut out = String::new();
    for index in indexes {
        out.push_str(&index.to_string());
        out.push(',');
    }
    out
}

fn parse_index_list(key: &str, value: &str) -> Result<Vec<usize>> {
    value
        .split(',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| Error::invalid_property(key, e.to_string()))
        })
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .map_err(|e| Error::invalid_property(key, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_add_and_query_groups() {
        let model = GroupModel::new();
        assert!(model.add_group("A", &[2, 3, 4]));
        assert!(model.is_grouped(3));
        assert!(!model.is_grouped(0));

        let group = model.group_by_name("A").unwrap();
        assert_eq!(group.members(), &[2, 3, 4]);
        assert!(!group.is_collapsed());
        assert!(group.is_collapseable());

        assert_eq!(model.group_of_index(4).unwrap().name(), "A");
    }

    #[test]
    fn test_index_unique_across_groups() {
        let model = GroupModel::new();
        assert!(model.add_group("A", &[0, 1]));
        // Index 1 already belongs to A.
        assert!(!model.add_group("B", &[1, 2]));
        assert!(model.group_by_name("B").is_none());
    }

    #[test]
    fn test_merge_into_existing_group() {
        let model = GroupModel::new();
        assert!(model.add_group("A", &[0, 1]));
        assert!(model.add_group("A", &[1, 2]));
        assert_eq!(model.group_by_name("A").unwrap().members(), &[0, 1, 2]);
    }

    #[test]
    fn test_ungroup_dissolves_trivial_group() {
        let model = GroupModel::new();
        model.add_group("A", &[0, 1, 2]);
        model.remove_indexes(&[0, 1]);
        // One member left: the group dissolves entirely.
        assert!(model.group_by_name("A").is_none());
        assert!(!model.is_grouped(2));
    }

    #[test]
    fn test_collapse_respects_collapseable() {
        let model = GroupModel::new();
        model.add_group("A", &[0, 1]);
        model.set_collapseable("A", false);
        assert!(!model.set_collapsed("A", true));
        assert!(!model.group_by_name("A").unwrap().is_collapsed());

        model.set_collapseable("A", true);
        assert!(model.set_collapsed("A", true));
        assert!(model.group_by_name("A").unwrap().is_collapsed());
        // Expanding is always allowed.
        assert!(model.set_collapsed("A", false));
    }

    #[test]
    fn test_collapsed_hidden_indexes_exclude_statics() {
        let model = GroupModel::new();
        model.add_group("A", &[2, 3, 4]);
        model.set_static("A", 2, true);
        model.set_collapsed("A", true);
        assert_eq!(model.collapsed_hidden_indexes(), vec![3, 4]);
    }

    #[test]
    fn test_changed_signal_is_additive() {
        let model = GroupModel::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let c = count.clone();
            model.changed.connect(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        model.add_group("A", &[0, 1]);
        // Both subscribers notified.
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_adjust_for_insert_and_delete() {
        let model = GroupModel::new();
        model.add_group("A", &[2, 3, 5]);

        model.adjust_for_inserted(3, 2);
        assert_eq!(model.group_by_name("A").unwrap().members(), &[2, 5, 7]);

        model.adjust_for_deleted(Range::new(4, 6));
        assert_eq!(model.group_by_name("A").unwrap().members(), &[2, 5]);
    }

    #[test]
    fn test_state_round_trip() {
        let model = GroupModel::new();
        model.add_group("A", &[5, 3, 7]);
        model.set_static("A", 3, true);
        model.set_collapsed("A", true);
        model.add_group("B", &[0, 1]);

        let mut properties = BTreeMap::new();
        model.save_state("grid", &mut properties);
        assert_eq!(
            properties.get("grid.group.A.members").map(String::as_str),
            Some("5,3,7,")
        );

        let restored = GroupModel::new();
        restored.load_state("grid", &properties).unwrap();
        let group = restored.group_by_name("A").unwrap();
        assert_eq!(group.members(), &[5, 3, 7]);
        assert_eq!(group.static_members(), vec![3]);
        assert!(group.is_collapsed());
        assert!(restored.group_by_name("B").is_some());
    }

    #[test]
    fn test_load_state_rejects_malformed_members() {
        let mut properties = BTreeMap::new();
        properties.insert("grid.groups".to_string(), "A".to_string());
        properties.insert("grid.group.A.members".to_string(), "5,x,".to_string());

        let model = GroupModel::new();
        let error = model.load_state("grid", &properties).unwrap_err();
        assert!(matches!(error, Error::InvalidProperty { .. }));
    }
}
