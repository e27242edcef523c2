//! The filter manager: owns every view's filter state together with the
//! pinned and temporary key sets, and exposes the actions a filter bar
//! performs.
//!
//! Actions edit the affected views directly and return a [`FilterUpdate`]
//! with each view's new canonical text. The caller persists it (for example
//! through [`UrlState::apply_filter_update`]); feeding the persisted state
//! back through [`FilterManager::on_url_change`] is then a no-op.

use chrono::{DateTime, Utc};
use filter_expr_rs::{ParseError, ThresholdEntry, ToggleOptions, Value};
use tracing::{debug, warn};

use crate::catalog::{Catalog, FieldLookup};
use crate::keys::{merge_key, PinnedKeys, TemporaryKeys};
use crate::lookups::find_similar_name;
use crate::merge::{merge_filters, MergeInput, MergedDisplay};
use crate::url::{FilterUpdate, UrlState};
use crate::view_state::{UnresolvedField, ViewFilterState};

/// Inputs a cached display was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChangeToken {
    generation: u64,
    pinned: u64,
    temporary: u64,
    views: Vec<u64>,
}

/// Owns all per-view filter states and the key sets.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use filter_expr_rs::{ToggleOptions, Value};
/// use filter_state_rs::{Catalog, FieldSpec, FilterManager, UrlState, ViewSpec};
///
/// let catalog = Catalog::new([
///     ViewSpec::new("orders").with_dimensions([FieldSpec::dimension("country")]),
/// ]);
/// let mut manager = FilterManager::new(catalog, &[]);
///
/// let update = manager.toggle_value(
///     "country",
///     &[Value::from("US")],
///     &[],
///     ToggleOptions::default(),
///     false,
///     Utc::now(),
/// );
/// assert_eq!(update.views["orders"].as_deref(), Some("country IN ('US')"));
///
/// let mut url = UrlState::default();
/// url.apply_filter_update(&update);
/// assert_eq!(url.filter_text("orders"), "country IN ('US')");
/// ```
#[derive(Debug, Clone)]
pub struct FilterManager {
    catalog: Catalog,
    lookup: FieldLookup,
    states: Vec<ViewFilterState>,
    pinned: PinnedKeys,
    temporary: TemporaryKeys,
    generation: u64,
    cache: Option<(ChangeToken, MergedDisplay)>,
}

impl FilterManager {
    /// Creates a manager for `catalog`, pinning the named fields.
    pub fn new(catalog: Catalog, pinned_fields: &[String]) -> Self {
        let mut manager = Self {
            catalog: Catalog::default(),
            lookup: FieldLookup::default(),
            states: Vec::new(),
            pinned: PinnedKeys::default(),
            temporary: TemporaryKeys::default(),
            generation: 0,
            cache: None,
        };
        manager.update_catalog(catalog, pinned_fields);
        manager
    }

    /// Installs a new catalog.
    ///
    /// States of surviving views keep their filters, new views start empty
    /// and vanished views are dropped. Pinned field names are resolved to
    /// keys over the views exposing them; unknown names are skipped.
    pub fn update_catalog(&mut self, catalog: Catalog, pinned_fields: &[String]) {
        let mut previous = std::mem::take(&mut self.states);
        self.states = catalog
            .views
            .iter()
            .map(|spec| match previous.iter().position(|s| s.name() == spec.name) {
                Some(index) => {
                    let mut state = previous.swap_remove(index);
                    state.update_spec(spec.clone());
                    state
                }
                None => ViewFilterState::new(spec.clone()),
            })
            .collect();
        for dropped in &previous {
            debug!(view = %dropped.name(), "view removed from catalog");
        }

        self.lookup = catalog.lookup();
        self.catalog = catalog;

        let mut pinned = PinnedKeys::default();
        for field in pinned_fields {
            match self.lookup.field(field) {
                Some(location) => {
                    pinned.insert(location.key());
                }
                None => warn!(
                    field = %field,
                    suggestion = ?find_similar_name(field, self.lookup.names()),
                    "pinned field not found in catalog"
                ),
            }
        }
        self.pinned = pinned;
        self.generation += 1;
    }

    /// Replaces the key sets, typically from a saved session.
    pub fn restore_keys(&mut self, pinned: Vec<String>, temporary: Vec<String>) {
        self.pinned = PinnedKeys::from_keys(pinned);
        self.temporary = TemporaryKeys::restore(temporary);
        self.generation += 1;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lookup(&self) -> &FieldLookup {
        &self.lookup
    }

    /// Per-view states in catalog order.
    pub fn states(&self) -> &[ViewFilterState] {
        &self.states
    }

    pub fn state(&self, view: &str) -> Option<&ViewFilterState> {
        self.states.iter().find(|s| s.name() == view)
    }

    pub fn pinned(&self) -> &PinnedKeys {
        &self.pinned
    }

    pub fn temporary(&self) -> &TemporaryKeys {
        &self.temporary
    }

    /// Unresolved identifiers across all views, with the view reporting them.
    pub fn unresolved_fields(&self) -> Vec<(String, UnresolvedField)> {
        self.states
            .iter()
            .flat_map(|state| {
                state
                    .unresolved_fields()
                    .iter()
                    .map(|field| (state.name().to_string(), field.clone()))
            })
            .collect()
    }

    /// Re-reads every view's filter from the query string.
    ///
    /// Each view takes `f.<view>`, falling back to the legacy `f`, then to
    /// no filter. Invalid text resets that view to empty; the errors are
    /// returned so the caller can show them.
    pub fn on_url_change(&mut self, url: &UrlState) -> Vec<(String, ParseError)> {
        let mut errors = Vec::new();
        for state in &mut self.states {
            let text = url.filter_text(state.name());
            if let Err(error) = state.set_text(text) {
                errors.push((state.name().to_string(), error));
            }
        }
        errors
    }

    /// Views an action on `field` applies to: `views` as given, or every
    /// view exposing the field when empty.
    pub fn resolve_views(&self, field: &str, views: &[String]) -> Vec<String> {
        if views.is_empty() {
            self.lookup
                .field(field)
                .map(|location| location.view_names())
                .unwrap_or_default()
        } else {
            views.to_vec()
        }
    }

    /// Merge key of `field` over the views an action applies to.
    pub fn key_for(&self, field: &str, views: &[String]) -> String {
        merge_key(self.resolve_views(field, views), field)
    }

    /// Turns user input into values for `dimension`, matching the literals
    /// already selected in the target views.
    ///
    /// Input spelled like a selected value becomes that value. Otherwise
    /// input stays a string unless every selected value is numeric and the
    /// input reads as a number.
    pub fn input_values(&self, dimension: &str, views: &[String], inputs: &[String]) -> Vec<Value> {
        let views = self.resolve_views(dimension, views);
        let selected: Vec<&Value> = self
            .states
            .iter()
            .filter(|s| views.iter().any(|v| v == s.name()))
            .filter_map(|s| s.dimension_item(dimension))
            .flat_map(|item| item.values.iter())
            .collect();
        let numeric = !selected.is_empty() && selected.iter().all(|v| v.as_str().is_none());

        inputs
            .iter()
            .map(|input| {
                if let Some(value) = selected.iter().find(|v| v.display_text() == *input) {
                    return (*value).clone();
                }
                match Value::from_input(input) {
                    parsed @ (Value::Integer(_) | Value::Float(_)) if numeric => parsed,
                    _ => Value::string(input.as_str()),
                }
            })
            .collect()
    }

    // ==================== Actions ====================

    /// Toggles values of a dimension.
    ///
    /// With `keep_visible`, a field left without any filter stays on screen
    /// as a temporary entry.
    pub fn toggle_value(
        &mut self,
        dimension: &str,
        values: &[Value],
        views: &[String],
        options: ToggleOptions,
        keep_visible: bool,
        now: DateTime<Utc>,
    ) -> FilterUpdate {
        let (key, views, update) = self.edit(dimension, views, |state| {
            Some(state.toggle_values(dimension, values, options))
        });

        let emptied = !self
            .states
            .iter()
            .filter(|s| views.iter().any(|v| v == s.name()))
            .any(|s| s.dimension_item(dimension).is_some());
        if keep_visible && emptied && !self.pinned.contains(&key) {
            self.temporary.add(key, now);
        }
        update
    }

    /// Switches a dimension to contains mode.
    pub fn apply_contains_mode(
        &mut self,
        dimension: &str,
        search_text: &str,
        exclude: Option<bool>,
        views: &[String],
    ) -> FilterUpdate {
        self.edit(dimension, views, |state| {
            Some(state.apply_contains_mode(dimension, search_text, exclude))
        })
        .2
    }

    /// Replaces a dimension's selection with a pasted list.
    pub fn apply_in_list_mode(
        &mut self,
        dimension: &str,
        values: &[Value],
        views: &[String],
    ) -> FilterUpdate {
        self.edit(dimension, views, |state| {
            Some(state.apply_in_list_mode(dimension, values))
        })
        .2
    }

    /// Flips include/exclude. Views without a filter on the dimension are
    /// left out of the update.
    pub fn toggle_exclude_mode(&mut self, dimension: &str, views: &[String]) -> FilterUpdate {
        self.edit(dimension, views, |state| {
            state
                .dimension_item(dimension)
                .is_some()
                .then(|| state.toggle_exclude_mode(dimension))
        })
        .2
    }

    /// Removes a dimension filter and unpins it.
    pub fn remove_filter(&mut self, dimension: &str, views: &[String]) -> FilterUpdate {
        let (key, _, mut update) = self.edit(dimension, views, |state| {
            Some(state.remove_filter(dimension))
        });
        self.pinned.remove(&key);
        update.allow_clear = true;
        update
    }

    /// Sets a measure threshold under `grouping`, moving it from any other
    /// grouping.
    pub fn set_threshold(
        &mut self,
        grouping: Option<&str>,
        entry: ThresholdEntry,
        views: &[String],
    ) -> FilterUpdate {
        let measure = entry.measure.clone();
        self.edit(&measure, views, |state| {
            Some(state.set_threshold(grouping, entry.clone()))
        })
        .2
    }

    /// Removes a measure threshold wherever it is grouped, and unpins it.
    pub fn remove_threshold(&mut self, measure: &str, views: &[String]) -> FilterUpdate {
        let (key, _, mut update) = self.edit(measure, views, |state| {
            let grouping = state
                .threshold_grouping(measure)?
                .map(str::to_string);
            Some(state.remove_threshold(grouping.as_deref(), measure))
        });
        self.pinned.remove(&key);
        update.allow_clear = true;
        update
    }

    /// Pins or unpins a field. An unpinned field stays visible as a
    /// temporary entry. Returns true if the field is now pinned.
    pub fn toggle_pin(&mut self, field: &str, views: &[String]) -> bool {
        let key = self.key_for(field, views);
        if self.pinned.remove(&key) {
            self.temporary.add_settled(key);
            false
        } else {
            self.temporary.remove(&key);
            self.pinned.insert(key);
            true
        }
    }

    /// Shows an empty entry for a field so it can be edited. Returns its key.
    pub fn add_temporary_filter(
        &mut self,
        field: &str,
        views: &[String],
        now: DateTime<Utc>,
    ) -> String {
        let key = self.key_for(field, views);
        if !self.pinned.contains(&key) {
            self.temporary.add(key.clone(), now);
        }
        key
    }

    /// Drops every filter and temporary entry. Pinned entries remain.
    pub fn clear_all(&mut self) -> FilterUpdate {
        self.temporary.clear();
        let mut update = FilterUpdate {
            allow_clear: true,
            ..FilterUpdate::default()
        };
        for state in &mut self.states {
            update.set(state.name().to_string(), state.clear());
        }
        update
    }

    /// Applies `edit` to each view the action targets. Clears the temporary
    /// marker of the field's key. Returns the key, the target views and the
    /// update.
    fn edit(
        &mut self,
        field: &str,
        views: &[String],
        mut edit: impl FnMut(&mut ViewFilterState) -> Option<String>,
    ) -> (String, Vec<String>, FilterUpdate) {
        let views = self.resolve_views(field, views);
        let key = merge_key(&views, field);
        self.temporary.remove(&key);

        let mut update = FilterUpdate::default();
        for state in self
            .states
            .iter_mut()
            .filter(|s| views.iter().any(|v| v == s.name()))
        {
            if let Some(text) = edit(state) {
                update.set(state.name().to_string(), text);
            }
        }
        debug!(field, %key, views = update.views.len(), "applied filter edit");
        (key, views, update)
    }

    // ==================== Display ====================

    /// The merged filter bar as of `now`. Recomputed only when a view, the
    /// catalog or a key set changed since the last call.
    pub fn display(&mut self, now: DateTime<Utc>) -> MergedDisplay {
        let token = self.change_token();
        let fresh = matches!(&self.cache, Some((cached, _)) if *cached == token);
        if !fresh {
            debug!("recomputing merged filters");
            let merged = merge_filters(&MergeInput {
                states: &self.states,
                lookup: &self.lookup,
                pinned: &self.pinned,
                temporary: &self.temporary,
            });
            self.cache = Some((token, merged));
        }

        let mut display = self
            .cache
            .as_ref()
            .map(|(_, merged)| merged.clone())
            .unwrap_or_default();
        display.mark_just_added(&self.temporary, now);
        display
    }

    /// The filter bar as it would look with every view on its default
    /// filter. Pinned entries are kept; temporary ones are not.
    pub fn default_display(&self) -> MergedDisplay {
        let states: Vec<ViewFilterState> = self
            .states
            .iter()
            .map(|current| {
                let mut state = ViewFilterState::new(current.spec().clone());
                if let Some(text) = current.default_text() {
                    if let Err(error) = state.set_text(text) {
                        warn!(view = %current.name(), %error, "invalid default filter");
                    }
                }
                state
            })
            .collect();
        merge_filters(&MergeInput {
            states: &states,
            lookup: &self.lookup,
            pinned: &self.pinned,
            temporary: &TemporaryKeys::default(),
        })
    }

    fn change_token(&self) -> ChangeToken {
        ChangeToken {
            generation: self.generation,
            pinned: self.pinned.version(),
            temporary: self.temporary.version(),
            views: self.states.iter().map(ViewFilterState::version).collect(),
        }
    }
}

#[cfg(test)]
mod tests;
