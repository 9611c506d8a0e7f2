//! Query selectors
//!
//! [`By`] is the sealed descriptor of a `find` query. Tables declare which
//! leaf selectors they accept through a `check_type` callback; `All` and
//! `Or` are generic and always pass, with `Or`'s children validated
//! individually.

/// Selector passed to `find`.
///
/// The variant set is closed on purpose: `check_type` callbacks stay total
/// and the engine can resolve every variant to an index scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// Full table scan in id order.
    All,
    /// Exact match on the `name` index, case-insensitive.
    Name(String),
    /// Prefix match on the `id` index.
    IdPrefix(String),
    /// Prefix match on the `name` index, case-insensitive.
    NamePrefix(String),
    /// Exact match on the `container_id` foreign-key index.
    ContainerId(String),
    /// Union of sub-selectors, deduplicated by id.
    Or(Vec<By>),
}

impl By {
    /// Build a union selector.
    pub fn or(bys: impl IntoIterator<Item = By>) -> By {
        By::Or(bys.into_iter().collect())
    }

    /// Whether this selector is generic (valid for every table) rather than
    /// a leaf that `check_type` must validate.
    pub fn is_generic(&self) -> bool {
        matches!(self, By::All | By::Or(_))
    }
}
