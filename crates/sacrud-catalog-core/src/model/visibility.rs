//! Visibility flag shared by products and groups.

use crate::catalog::{FieldDef, ScalarType};

/// Column name of the visibility flag.
pub const VISIBLE_FIELD: &str = "visible";

/// The nullable boolean column included by every entity that can be hidden.
pub fn visibility_field() -> FieldDef {
    FieldDef::optional_scalar(VISIBLE_FIELD, ScalarType::Bool)
}

/// Records carrying the visibility flag.
pub trait Visible {
    /// The stored flag; `None` when never set.
    fn visible(&self) -> Option<bool>;

    /// Whether the record is explicitly marked visible.
    fn is_visible(&self) -> bool {
        self.visible() == Some(true)
    }
}
