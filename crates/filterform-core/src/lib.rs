//! filterform-core: data model and mutation engine for nested filter forms.
//!
//! The central design principle: every node lives in a flat id-keyed arena
//! inside [`store::FilterFormStore`], so mutations are O(1) id lookups and
//! caller data can never alias store internals. The nested wire shape is
//! rebuilt from the arena each time the store publishes.

pub mod columns;
pub mod error;
pub mod model;
pub mod store;
pub mod validate;

pub use columns::ProjectColumn;
pub use error::FilterFormError;
pub use model::{
    ColumnType, Conjunction, FieldValue, FilterField, FilterFormSet, FilterGroup, FilterNode,
    FormKind, LocationType, Operator, ITEM_LIMIT, ROOT_ID,
};
pub use store::{new_field, FilterFormStore, InsertAt};
