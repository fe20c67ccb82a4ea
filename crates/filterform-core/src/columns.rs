//! Column descriptors and the operator catalog.

use serde::{Deserialize, Serialize};

use crate::model::{ColumnType, LocationType, Operator};

/// A filterable column as the project table layer describes it. Retargeting
/// a condition hands one of these to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectColumn {
    pub column: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub location: LocationType,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ProjectColumn {
    pub fn new(
        column: impl Into<String>,
        column_type: ColumnType,
        location: LocationType,
    ) -> Self {
        Self {
            column: column.into(),
            display_name: None,
            location,
            column_type,
        }
    }
}

/// The column every fresh condition starts on.
pub fn default_column() -> ProjectColumn {
    ProjectColumn::new("name", ColumnType::Text, LocationType::Experiment)
}

const TEXT_OPERATORS: &[Operator] = &[
    Operator::Contains,
    Operator::NotContains,
    Operator::Eq,
    Operator::NotEq,
    Operator::IsEmpty,
    Operator::NotEmpty,
];

const NUMBER_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::NotEq,
    Operator::Greater,
    Operator::GreaterEq,
    Operator::Less,
    Operator::LessEq,
    Operator::IsEmpty,
    Operator::NotEmpty,
];

const ALL_OPERATORS: &[Operator] = &[
    Operator::Contains,
    Operator::NotContains,
    Operator::Eq,
    Operator::NotEq,
    Operator::Greater,
    Operator::GreaterEq,
    Operator::Less,
    Operator::LessEq,
    Operator::IsEmpty,
    Operator::NotEmpty,
];

/// Operators a condition on a column of this type may use, default first.
pub fn available_operators(column_type: ColumnType) -> &'static [Operator] {
    match column_type {
        ColumnType::Text => TEXT_OPERATORS,
        ColumnType::Number | ColumnType::Date => NUMBER_OPERATORS,
        ColumnType::Unspecified => ALL_OPERATORS,
    }
}

/// The operator a condition falls back to when it lands on this column type.
pub fn default_operator(column_type: ColumnType) -> Operator {
    available_operators(column_type)[0]
}

/// Label the condition picker shows for an operator on this column type.
/// Text columns read as prose, numeric and date columns keep the symbols.
pub fn operator_label(operator: Operator, column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Text | ColumnType::Unspecified => match operator {
            Operator::Contains => "contains",
            Operator::NotContains => "does not contain",
            Operator::Eq => "is",
            Operator::NotEq => "is not",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::IsEmpty => "is empty",
            Operator::NotEmpty => "is not empty",
        },
        ColumnType::Number | ColumnType::Date => match operator {
            Operator::Contains => "contains",
            Operator::NotContains => "does not contain",
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::IsEmpty => "is empty",
            Operator::NotEmpty => "is not empty",
        },
    }
}
