//! Wire-format data model for filter forms.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{FilterFormError, Result};

/// Fixed id of the root group. Removing it resets the tree instead.
pub const ROOT_ID: &str = "ROOT";

/// Cap on the number of conditions the picker UI offers to create.
pub const ITEM_LIMIT: usize = 50;

/// A filter document: the root group plus auxiliary settings that ride
/// along with it (e.g. whether archived experiments are included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFormSet {
    pub filter_group: FilterGroup,
    pub show_archived: bool,
}

impl FilterFormSet {
    /// Parse a persisted filter document, rejecting duplicate node ids.
    pub fn from_json(json: &str) -> Result<Self> {
        let formset: Self = serde_json::from_str(json)?;
        match formset.duplicate_id() {
            Some(dup) => Err(FilterFormError::DuplicateId(dup)),
            None => Ok(formset),
        }
    }

    /// Persistence serialization, node ids included.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Number of conditions in the whole tree.
    pub fn field_count(&self) -> usize {
        self.filter_group.field_count()
    }

    /// First id appearing more than once, if any.
    pub fn duplicate_id(&self) -> Option<String> {
        let mut seen = HashSet::new();
        duplicate_in_group(&self.filter_group, &mut seen)
    }
}

impl Default for FilterFormSet {
    fn default() -> Self {
        Self {
            filter_group: FilterGroup::new_root(),
            show_archived: false,
        }
    }
}

fn duplicate_in_group<'a>(group: &'a FilterGroup, seen: &mut HashSet<&'a str>) -> Option<String> {
    if !seen.insert(group.id.as_str()) {
        return Some(group.id.clone());
    }
    for child in &group.children {
        let dup = match child {
            FilterNode::Group(inner) => duplicate_in_group(inner, seen),
            FilterNode::Field(field) => {
                (!seen.insert(field.id.as_str())).then(|| field.id.clone())
            }
        };
        if dup.is_some() {
            return dup;
        }
    }
    None
}

/// A node of the filter tree. Every node carries a `kind` marker on the
/// wire; parsing tells the variants apart by shape, so the marker rides
/// along inside each struct instead of acting as a serde tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group(FilterGroup),
    Field(FilterField),
}

impl FilterNode {
    pub fn id(&self) -> &str {
        match self {
            FilterNode::Group(group) => &group.id,
            FilterNode::Field(field) => &field.id,
        }
    }

    pub fn kind(&self) -> FormKind {
        match self {
            FilterNode::Group(_) => FormKind::Group,
            FilterNode::Field(_) => FormKind::Field,
        }
    }

    /// Group levels this node adds beneath its parent: 0 for a condition,
    /// 1 for a flat group, 2 for a group holding another group.
    pub fn group_height(&self) -> usize {
        match self {
            FilterNode::Field(_) => 0,
            FilterNode::Group(group) => {
                1 + group
                    .children
                    .iter()
                    .map(|child| child.group_height())
                    .max()
                    .unwrap_or(0)
            }
        }
    }
}

/// A conjunction node: all children combine under one boolean connective.
/// Child order is the evaluation and display order. Field declaration
/// order matches the alphabetical key order of persisted documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub children: Vec<FilterNode>,
    pub conjunction: Conjunction,
    pub id: String,
    pub kind: FormKind,
}

impl FilterGroup {
    /// The canonical empty root: well-known id, `and`, no children.
    pub fn new_root() -> Self {
        Self {
            children: Vec::new(),
            conjunction: Conjunction::And,
            id: ROOT_ID.to_string(),
            kind: FormKind::Group,
        }
    }

    pub fn field_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                FilterNode::Group(inner) => inner.field_count(),
                FilterNode::Field(_) => 1,
            })
            .sum()
    }
}

/// A leaf condition comparing one column against a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterField {
    pub column_name: String,
    pub id: String,
    pub kind: FormKind,
    pub location: LocationType,
    pub operator: Operator,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// `None` serializes as JSON `null`; `isEmpty`/`notEmpty` conditions
    /// are the only ones meaningful without a value.
    #[serde(default)]
    pub value: Option<FieldValue>,
}

/// A condition value. `Int` precedes `Float` so integer JSON numbers
/// survive round-trips as integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}
impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}
impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}
impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}
impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Node variant marker: carried on the wire by every node, and the kind
/// an `add_child` call creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Group,
    Field,
}

/// Boolean connective of a group, applied to all its direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    And,
    Or,
}

impl std::fmt::Display for Conjunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conjunction::And => write!(f, "and"),
            Conjunction::Or => write!(f, "or"),
        }
    }
}

/// Comparison predicate of a condition. The wire tokens are the ones the
/// search API parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "notContains")]
    NotContains,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEq,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEq,
    #[serde(rename = "isEmpty")]
    IsEmpty,
    #[serde(rename = "notEmpty")]
    NotEmpty,
}

impl Operator {
    /// Whether a condition with this operator needs a value to be complete.
    pub fn requires_value(&self) -> bool {
        !matches!(self, Operator::IsEmpty | Operator::NotEmpty)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::IsEmpty => "isEmpty",
            Operator::NotEmpty => "notEmpty",
        };
        write!(f, "{}", token)
    }
}

/// Underlying type of a column, deciding which operators apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "COLUMN_TYPE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "COLUMN_TYPE_TEXT")]
    Text,
    #[serde(rename = "COLUMN_TYPE_NUMBER")]
    Number,
    #[serde(rename = "COLUMN_TYPE_DATE")]
    Date,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            ColumnType::Unspecified => "COLUMN_TYPE_UNSPECIFIED",
            ColumnType::Text => "COLUMN_TYPE_TEXT",
            ColumnType::Number => "COLUMN_TYPE_NUMBER",
            ColumnType::Date => "COLUMN_TYPE_DATE",
        };
        write!(f, "{}", token)
    }
}

/// Where a column's data lives on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    #[serde(rename = "LOCATION_TYPE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "LOCATION_TYPE_EXPERIMENT")]
    Experiment,
    #[serde(rename = "LOCATION_TYPE_VALIDATIONS")]
    Validations,
    #[serde(rename = "LOCATION_TYPE_TRAINING")]
    Training,
    #[serde(rename = "LOCATION_TYPE_CUSTOM_METRIC")]
    CustomMetric,
    #[serde(rename = "LOCATION_TYPE_HYPERPARAMETERS")]
    Hyperparameters,
    #[serde(rename = "LOCATION_TYPE_RUN")]
    Run,
    #[serde(rename = "LOCATION_TYPE_RUN_HYPERPARAMETERS")]
    RunHyperparameters,
    #[serde(rename = "LOCATION_TYPE_RUN_METADATA")]
    RunMetadata,
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            LocationType::Unspecified => "LOCATION_TYPE_UNSPECIFIED",
            LocationType::Experiment => "LOCATION_TYPE_EXPERIMENT",
            LocationType::Validations => "LOCATION_TYPE_VALIDATIONS",
            LocationType::Training => "LOCATION_TYPE_TRAINING",
            LocationType::CustomMetric => "LOCATION_TYPE_CUSTOM_METRIC",
            LocationType::Hyperparameters => "LOCATION_TYPE_HYPERPARAMETERS",
            LocationType::Run => "LOCATION_TYPE_RUN",
            LocationType::RunHyperparameters => "LOCATION_TYPE_RUN_HYPERPARAMETERS",
            LocationType::RunMetadata => "LOCATION_TYPE_RUN_METADATA",
        };
        write!(f, "{}", token)
    }
}
