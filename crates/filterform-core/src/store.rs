//! The filter form store: id-addressed mutations over a flat node arena.
//!
//! Every node lives in a `HashMap` keyed by id, with groups holding ordered
//! child-id lists and each entry recording its parent. Lookups are O(1) and
//! a move is a re-parenting of one id. After every effective mutation the
//! store republishes the nested [`FilterFormSet`] snapshot, the sanitized
//! query JSON, and the condition count, and bumps its version counter; a
//! mutation that finds no target changes nothing, version included.

use std::collections::HashMap;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::columns::{self, ProjectColumn};
use crate::error::{FilterFormError, Result};
use crate::model::{
    Conjunction, FieldValue, FilterField, FilterFormSet, FilterGroup, FilterNode, FormKind,
    Operator, ROOT_ID,
};
use crate::validate;

/// Where to place a child inside its destination group.
#[derive(Debug, Clone)]
pub struct InsertAt {
    /// Insertion index, clamped to the current child count.
    pub index: usize,
    /// Pre-built node to insert (move/reorder); its ids are preserved.
    /// `None` inserts a fresh default node at the index.
    pub item: Option<FilterNode>,
}

#[derive(Debug)]
enum Entry {
    Group(GroupEntry),
    Field(FieldEntry),
}

#[derive(Debug)]
struct GroupEntry {
    /// `None` only for the root group.
    parent: Option<String>,
    conjunction: Conjunction,
    children: Vec<String>,
}

#[derive(Debug)]
struct FieldEntry {
    parent: String,
    field: FilterField,
}

/// The store. Starts unloaded: every accessor reports empty state and every
/// mutation is ignored until [`init`](Self::init) or
/// [`init_with`](Self::init_with) loads it.
#[derive(Debug, Default)]
pub struct FilterFormStore {
    inner: Option<StoreInner>,
    version: u64,
}

#[derive(Debug)]
struct StoreInner {
    nodes: HashMap<String, Entry>,
    root_id: String,
    show_archived: bool,
    snapshot: FilterFormSet,
    serialized: String,
    field_count: usize,
}

impl FilterFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Observed state ──────────────────────────────────────────────────────

    /// The published tree, or `None` while the store is unloaded.
    pub fn formset(&self) -> Option<&FilterFormSet> {
        self.inner.as_ref().map(|inner| &inner.snapshot)
    }

    /// Sanitized query JSON: ids stripped, incomplete conditions and the
    /// groups they empty pruned. Empty string while unloaded.
    pub fn as_json_string(&self) -> &str {
        self.inner.as_ref().map_or("", |inner| inner.serialized.as_str())
    }

    /// Number of conditions in the tree, complete or not.
    pub fn field_count(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.field_count)
    }

    /// Number of conditions naming one column, at any depth.
    pub fn field_count_for(&self, column_name: &str) -> usize {
        self.inner.as_ref().map_or(0, |inner| {
            inner
                .nodes
                .values()
                .filter(|entry| matches!(entry, Entry::Field(f) if f.field.column_name == column_name))
                .count()
        })
    }

    /// Bumped on every effective mutation. Observers compare versions
    /// instead of subscribing.
    pub fn version(&self) -> u64 {
        self.version
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Reset to the canonical empty tree and default auxiliary settings.
    pub fn init(&mut self) {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_ID.to_string(), Entry::root_group());
        self.inner = Some(StoreInner::new(nodes, ROOT_ID.to_string(), false));
        self.publish();
        info!("filter form store reset to empty");
    }

    /// Load a filter document. The data is copied into the arena, so later
    /// mutations never touch the caller's tree. A document with duplicate
    /// ids cannot be keyed by id and is rejected, leaving the store as it
    /// was.
    pub fn init_with(&mut self, data: &FilterFormSet) -> Result<()> {
        if let Some(dup) = data.duplicate_id() {
            return Err(FilterFormError::DuplicateId(dup));
        }
        let mut nodes = HashMap::new();
        insert_group(&mut nodes, &data.filter_group, None);
        self.inner = Some(StoreInner::new(
            nodes,
            data.filter_group.id.clone(),
            data.show_archived,
        ));
        self.publish();
        info!(fields = self.field_count(), "filter form store loaded");
        Ok(())
    }

    // ─── Mutations ───────────────────────────────────────────────────────────

    /// Insert a child into the group `parent_id`. Without `insert`, a fresh
    /// default node of `kind` is appended; with it, the index is clamped to
    /// the child count and a supplied item is adopted with its ids kept.
    /// Ignored when the parent is missing or a condition, or when an item
    /// id is already present in the tree (a drop delivered twice).
    pub fn add_child(&mut self, parent_id: &str, kind: FormKind, insert: Option<InsertAt>) {
        let Some(inner) = self.inner.as_mut() else {
            debug!(parent = parent_id, "add_child before init ignored");
            return;
        };
        let child_count = match inner.nodes.get(parent_id) {
            Some(Entry::Group(group)) => group.children.len(),
            Some(Entry::Field(_)) => {
                debug!(parent = parent_id, "add_child into a condition ignored");
                return;
            }
            None => {
                debug!(parent = parent_id, "add_child parent not found");
                return;
            }
        };
        let (index, item) = match insert {
            Some(InsertAt { index, item }) => (index.min(child_count), item),
            None => (child_count, None),
        };
        let node = item.unwrap_or_else(|| match kind {
            FormKind::Field => FilterNode::Field(new_field()),
            FormKind::Group => FilterNode::Group(FilterGroup {
                children: Vec::new(),
                conjunction: Conjunction::And,
                id: Uuid::new_v4().to_string(),
                kind: FormKind::Group,
            }),
        });
        if let Some(existing) = inner.first_known_id(&node) {
            debug!(id = %existing, "add_child item id already in tree, ignored");
            return;
        }
        let child_id = node.id().to_string();
        insert_node(&mut inner.nodes, &node, parent_id);
        if let Some(Entry::Group(group)) = inner.nodes.get_mut(parent_id) {
            group.children.insert(index, child_id);
        }
        self.publish();
    }

    /// Detach a node and drop its subtree. Removing the root id instead
    /// resets the whole tree while keeping the show-archived flag.
    pub fn remove_child(&mut self, id: &str) {
        let Some(inner) = self.inner.as_mut() else {
            debug!(id, "remove_child before init ignored");
            return;
        };
        if id == inner.root_id {
            inner.nodes.clear();
            inner.nodes.insert(ROOT_ID.to_string(), Entry::root_group());
            inner.root_id = ROOT_ID.to_string();
            self.publish();
            return;
        }
        if !inner.nodes.contains_key(id) {
            debug!(id, "remove_child target not found");
            return;
        }
        inner.detach_from_parent(id);
        drop_subtree(&mut inner.nodes, id);
        self.publish();
    }

    /// Remove every condition naming `column_name`, at any depth.
    pub fn remove_by_field(&mut self, column_name: &str) {
        let Some(inner) = self.inner.as_mut() else {
            debug!(column = column_name, "remove_by_field before init ignored");
            return;
        };
        let targets: Vec<String> = inner
            .nodes
            .iter()
            .filter_map(|(id, entry)| match entry {
                Entry::Field(f) if f.field.column_name == column_name => Some(id.clone()),
                _ => None,
            })
            .collect();
        if targets.is_empty() {
            debug!(column = column_name, "remove_by_field matched nothing");
            return;
        }
        for id in &targets {
            inner.detach_from_parent(id);
            inner.nodes.remove(id);
        }
        self.publish();
    }

    /// Set a condition's value. Ignored unless `id` names a condition.
    pub fn set_field_value(&mut self, id: &str, value: Option<FieldValue>) {
        let Some(inner) = self.inner.as_mut() else {
            debug!(id, "set_field_value before init ignored");
            return;
        };
        match inner.nodes.get_mut(id) {
            Some(Entry::Field(entry)) => {
                entry.field.value = value;
                self.publish();
            }
            _ => debug!(id, "set_field_value target is not a condition"),
        }
    }

    /// Set a condition's operator. Ignored unless `id` names a condition.
    pub fn set_field_operator(&mut self, id: &str, operator: Operator) {
        let Some(inner) = self.inner.as_mut() else {
            debug!(id, "set_field_operator before init ignored");
            return;
        };
        match inner.nodes.get_mut(id) {
            Some(Entry::Field(entry)) => {
                entry.field.operator = operator;
                self.publish();
            }
            _ => debug!(id, "set_field_operator target is not a condition"),
        }
    }

    /// Retarget a condition to another column. When the column type changes
    /// the operator falls back to the new type's default and the value is
    /// cleared, so a stale pairing never reaches the wire.
    pub fn set_field_column(&mut self, id: &str, column: &ProjectColumn) {
        let Some(inner) = self.inner.as_mut() else {
            debug!(id, "set_field_column before init ignored");
            return;
        };
        match inner.nodes.get_mut(id) {
            Some(Entry::Field(entry)) => {
                let type_changed = entry.field.column_type != column.column_type;
                entry.field.column_name = column.column.clone();
                entry.field.location = column.location;
                entry.field.column_type = column.column_type;
                if type_changed {
                    entry.field.operator = columns::default_operator(column.column_type);
                    entry.field.value = None;
                }
                self.publish();
            }
            _ => debug!(id, "set_field_column target is not a condition"),
        }
    }

    /// Set a group's conjunction. Ignored unless `id` names a group.
    pub fn set_group_conjunction(&mut self, id: &str, conjunction: Conjunction) {
        let Some(inner) = self.inner.as_mut() else {
            debug!(id, "set_group_conjunction before init ignored");
            return;
        };
        match inner.nodes.get_mut(id) {
            Some(Entry::Group(entry)) => {
                entry.conjunction = conjunction;
                self.publish();
            }
            _ => debug!(id, "set_group_conjunction target is not a group"),
        }
    }

    /// Set the show-archived flag. Survives a root reset; `init` clears it.
    pub fn set_archived(&mut self, show_archived: bool) {
        let Some(inner) = self.inner.as_mut() else {
            debug!("set_archived before init ignored");
            return;
        };
        inner.show_archived = show_archived;
        self.publish();
    }

    /// Drop incomplete conditions, then groups left without children,
    /// bottom-up with the root kept. Run after bulk drag-and-drop to clear
    /// the debris the sanitized view was already hiding.
    pub fn sweep(&mut self) {
        let Some(inner) = self.inner.as_mut() else {
            debug!("sweep before init ignored");
            return;
        };
        let before = inner.nodes.len();
        let root_id = inner.root_id.clone();
        sweep_group(&mut inner.nodes, &root_id);
        if inner.nodes.len() == before {
            return;
        }
        self.publish();
    }

    // ─── Drop-target validation ──────────────────────────────────────────────

    /// Whether `dragged_id` may be moved into the group `dest_group_id`.
    /// The move itself is remove-then-add; callers check this first because
    /// the pair is not rolled back once the removal has happened.
    pub fn can_move(&self, dragged_id: &str, dest_group_id: &str) -> bool {
        let Some(inner) = self.inner.as_ref() else {
            return false;
        };
        if dragged_id == inner.root_id {
            return false;
        }
        if !matches!(inner.nodes.get(dest_group_id), Some(Entry::Group(_))) {
            return false;
        }
        // The destination may not sit inside the dragged subtree.
        let mut cursor = Some(dest_group_id.to_string());
        while let Some(id) = cursor {
            if id == dragged_id {
                return false;
            }
            cursor = inner.parent_of(&id);
        }
        let Some(node) = inner.rebuild_node(dragged_id) else {
            return false;
        };
        validate::fits_depth(&node, inner.level_of(dest_group_id))
    }

    // ─── Publication ─────────────────────────────────────────────────────────

    fn publish(&mut self) {
        self.version += 1;
        let Some(inner) = self.inner.as_mut() else {
            return;
        };
        let root_id = inner.root_id.clone();
        let filter_group = inner.rebuild_group(&root_id);
        inner.snapshot = FilterFormSet {
            filter_group,
            show_archived: inner.show_archived,
        };
        inner.field_count = inner.snapshot.field_count();
        match validate::sanitized_json(&inner.snapshot) {
            Ok(json) => inner.serialized = json,
            Err(err) => {
                error!(error = %err, "failed to serialize filter formset");
                inner.serialized.clear();
            }
        }
    }
}

/// Mint a default condition: canonical first column, its default operator,
/// no value yet. Not inserted anywhere.
pub fn new_field() -> FilterField {
    let ProjectColumn {
        column,
        location,
        column_type,
        ..
    } = columns::default_column();
    FilterField {
        column_name: column,
        id: Uuid::new_v4().to_string(),
        kind: FormKind::Field,
        location,
        operator: columns::default_operator(column_type),
        column_type,
        value: None,
    }
}

// ─── Arena internals ─────────────────────────────────────────────────────────

impl Entry {
    fn root_group() -> Entry {
        Entry::Group(GroupEntry {
            parent: None,
            conjunction: Conjunction::And,
            children: Vec::new(),
        })
    }
}

impl StoreInner {
    fn new(nodes: HashMap<String, Entry>, root_id: String, show_archived: bool) -> Self {
        Self {
            nodes,
            root_id,
            show_archived,
            snapshot: FilterFormSet::default(),
            serialized: String::new(),
            field_count: 0,
        }
    }

    fn parent_of(&self, id: &str) -> Option<String> {
        match self.nodes.get(id) {
            Some(Entry::Group(group)) => group.parent.clone(),
            Some(Entry::Field(entry)) => Some(entry.parent.clone()),
            None => None,
        }
    }

    /// Parent hops between a node and the root.
    fn level_of(&self, id: &str) -> usize {
        let mut level = 0;
        let mut cursor = self.parent_of(id);
        while let Some(parent_id) = cursor {
            level += 1;
            cursor = self.parent_of(&parent_id);
        }
        level
    }

    fn detach_from_parent(&mut self, id: &str) {
        if let Some(parent_id) = self.parent_of(id) {
            if let Some(Entry::Group(parent)) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|child| child != id);
            }
        }
    }

    /// First id of `node`'s subtree already present in the arena.
    fn first_known_id(&self, node: &FilterNode) -> Option<String> {
        if self.nodes.contains_key(node.id()) {
            return Some(node.id().to_string());
        }
        if let FilterNode::Group(group) = node {
            for child in &group.children {
                if let Some(id) = self.first_known_id(child) {
                    return Some(id);
                }
            }
        }
        None
    }

    fn rebuild_group(&self, id: &str) -> FilterGroup {
        let Some(Entry::Group(group)) = self.nodes.get(id) else {
            // Unreachable for a consistent arena.
            return FilterGroup::new_root();
        };
        let children = group
            .children
            .iter()
            .filter_map(|child_id| self.rebuild_node(child_id))
            .collect();
        FilterGroup {
            children,
            conjunction: group.conjunction,
            id: id.to_string(),
            kind: FormKind::Group,
        }
    }

    fn rebuild_node(&self, id: &str) -> Option<FilterNode> {
        match self.nodes.get(id)? {
            Entry::Group(_) => Some(FilterNode::Group(self.rebuild_group(id))),
            Entry::Field(entry) => Some(FilterNode::Field(entry.field.clone())),
        }
    }
}

fn insert_group(nodes: &mut HashMap<String, Entry>, group: &FilterGroup, parent: Option<&str>) {
    let children = group
        .children
        .iter()
        .map(|child| child.id().to_string())
        .collect();
    nodes.insert(
        group.id.clone(),
        Entry::Group(GroupEntry {
            parent: parent.map(str::to_string),
            conjunction: group.conjunction,
            children,
        }),
    );
    for child in &group.children {
        match child {
            FilterNode::Group(inner) => insert_group(nodes, inner, Some(&group.id)),
            FilterNode::Field(field) => {
                nodes.insert(
                    field.id.clone(),
                    Entry::Field(FieldEntry {
                        parent: group.id.clone(),
                        field: field.clone(),
                    }),
                );
            }
        }
    }
}

fn insert_node(nodes: &mut HashMap<String, Entry>, node: &FilterNode, parent: &str) {
    match node {
        FilterNode::Group(group) => insert_group(nodes, group, Some(parent)),
        FilterNode::Field(field) => {
            nodes.insert(
                field.id.clone(),
                Entry::Field(FieldEntry {
                    parent: parent.to_string(),
                    field: field.clone(),
                }),
            );
        }
    }
}

fn drop_subtree(nodes: &mut HashMap<String, Entry>, id: &str) {
    match nodes.remove(id) {
        Some(Entry::Group(group)) => {
            for child in &group.children {
                drop_subtree(nodes, child);
            }
        }
        Some(Entry::Field(_)) | None => {}
    }
}

fn sweep_group(nodes: &mut HashMap<String, Entry>, group_id: &str) {
    let child_ids = match nodes.get(group_id) {
        Some(Entry::Group(group)) => group.children.clone(),
        _ => return,
    };
    let mut kept = Vec::with_capacity(child_ids.len());
    for child_id in child_ids {
        let keep = match nodes.get(&child_id) {
            Some(Entry::Field(entry)) => validate::is_complete(&entry.field),
            Some(Entry::Group(_)) => {
                sweep_group(nodes, &child_id);
                match nodes.get(&child_id) {
                    Some(Entry::Group(group)) => !group.children.is_empty(),
                    _ => false,
                }
            }
            None => false,
        };
        if keep {
            kept.push(child_id);
        } else {
            drop_subtree(nodes, &child_id);
        }
    }
    if let Some(Entry::Group(group)) = nodes.get_mut(group_id) {
        group.children = kept;
    }
}
