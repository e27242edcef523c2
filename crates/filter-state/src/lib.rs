//! Filter state for multi-view dashboards.
//!
//! This crate sits on top of `filter-expr-rs` and keeps one filter per view
//! in sync with a query string. It merges the per-view filters into a single
//! ordered filter bar, tracks pinned and temporary entries, and persists a
//! session to disk.
//!
//! - [`Catalog`] describes the dimensions and measures of each view.
//! - [`ViewFilterState`] owns one view's parse, edit and serialize cycle.
//! - [`merge_filters`] builds the [`MergedDisplay`] from all views.
//! - [`FilterManager`] ties it together behind the filter bar actions.
//! - [`UrlState`] reads and writes `f.<view>` query parameters.
//! - [`SessionStore`] saves the query string and key sets between runs.

pub mod catalog;
pub mod keys;
pub mod lookups;
pub mod manager;
pub mod merge;
pub mod store;
pub mod url;
pub mod view_state;

pub use catalog::{
    Catalog, CatalogError, CatalogResult, FieldKind, FieldLocation, FieldLookup, FieldSpec,
    ViewSpec,
};
pub use keys::{key_field, key_views, merge_key, PinnedKeys, TemporaryKeys, JUST_ADDED_MILLIS};
pub use lookups::{find_similar_name, format_not_found_error};
pub use manager::FilterManager;
pub use merge::{
    merge_filters, FieldCategory, MergeInput, MergedDisplay, MergedFilter, ResolvedFilter,
};
pub use store::{Session, SessionStore, SessionStoreError};
pub use url::{filter_param, FilterUpdate, UrlError, UrlState};
pub use view_state::{
    DimensionFilterItem, DimensionMode, MeasureFilterItem, UnresolvedField, ViewFilterState,
};
