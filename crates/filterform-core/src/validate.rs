//! Completeness, pruning, and nesting rules for filter trees.

use serde_json::Value;

use crate::model::{FilterField, FilterFormSet, FilterGroup, FilterNode};

/// Deepest group level a tree may reach, with the root group at level 0.
pub const MAX_GROUP_NESTING: usize = 2;

/// A condition is complete when its operator needs no value or a value is
/// set. Incomplete conditions stay editable but are withheld from queries.
pub fn is_complete(field: &FilterField) -> bool {
    !field.operator.requires_value() || field.value.is_some()
}

/// Whether a node may become a child of a group sitting at `dest_level`.
///
/// Conditions fit anywhere; a group fits as long as the deepest group it
/// carries stays within [`MAX_GROUP_NESTING`].
pub fn fits_depth(node: &FilterNode, dest_level: usize) -> bool {
    dest_level + node.group_height() <= MAX_GROUP_NESTING
}

/// Deepest group level present in the tree, root at level 0.
pub fn max_group_level(group: &FilterGroup) -> usize {
    fn walk(group: &FilterGroup, level: usize) -> usize {
        group
            .children
            .iter()
            .map(|child| match child {
                FilterNode::Group(inner) => walk(inner, level + 1),
                FilterNode::Field(_) => level,
            })
            .max()
            .unwrap_or(level)
    }
    walk(group, 0)
}

/// Submission view of a group: incomplete conditions dropped, subgroups
/// left empty by the pruning dropped with them.
pub fn prune(group: &FilterGroup) -> FilterGroup {
    let children = group
        .children
        .iter()
        .filter_map(|child| match child {
            FilterNode::Field(field) => {
                is_complete(field).then(|| FilterNode::Field(field.clone()))
            }
            FilterNode::Group(inner) => {
                let kept = prune(inner);
                (!kept.children.is_empty()).then(|| FilterNode::Group(kept))
            }
        })
        .collect();
    FilterGroup {
        children,
        conjunction: group.conjunction,
        id: group.id.clone(),
        kind: group.kind,
    }
}

/// The JSON string submitted to the search API: pruned view, ids stripped.
pub fn sanitized_json(formset: &FilterFormSet) -> serde_json::Result<String> {
    let pruned = FilterFormSet {
        filter_group: prune(&formset.filter_group),
        show_archived: formset.show_archived,
    };
    let mut value = serde_json::to_value(&pruned)?;
    strip_ids(&mut value);
    serde_json::to_string(&value)
}

fn strip_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("id");
            for entry in map.values_mut() {
                strip_ids(entry);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_ids(item);
            }
        }
        _ => {}
    }
}
