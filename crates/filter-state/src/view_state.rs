//! Filter state for a single view.
//!
//! A [`ViewFilterState`] owns the parse, edit and serialize cycle for one
//! view's filter text. It keeps the dimension tree and the measure
//! thresholds apart, recombines them on every write, and derives the display
//! items the merge step consumes.

use std::collections::BTreeSet;
use std::sync::Arc;

use filter_expr_rs::{
    apply_contains_mode, apply_in_list_mode, find_threshold, merge_where, move_threshold, parse,
    remove_filter, remove_threshold, root_children, search_text, serialize, set_threshold,
    split_where, toggle_exclude_mode, toggle_values, Expr, ParseError, ParseMeta, Parsed,
    SerializeOptions, ThresholdEntry, ThresholdGroup, ToggleOptions, Value,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::ViewSpec;
use crate::lookups::find_similar_name;

/// How a dimension filter is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionMode {
    /// Values picked one by one.
    Select,
    /// Values pasted as a list.
    InList,
    /// Substring match.
    Contains,
}

/// A dimension filter as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionFilterItem {
    /// Dimension name.
    pub name: String,
    /// Display label.
    pub label: String,
    pub mode: DimensionMode,
    /// False for `NIN` / `NLIKE`.
    pub include: bool,
    /// Selected values. Empty in contains mode.
    pub values: Vec<Value>,
    /// Search text without wildcards, in contains mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
}

/// A measure threshold as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureFilterItem {
    /// Measure name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Grouping dimension.
    pub dimension: Option<String>,
    pub filter: ThresholdEntry,
}

/// An identifier the view does not define.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedField {
    pub name: String,
    /// Closest known field name, if any is close enough.
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Derived {
    dimensions: Vec<DimensionFilterItem>,
    measures: Vec<MeasureFilterItem>,
    complex: Vec<Arc<Expr>>,
    unresolved: Vec<UnresolvedField>,
}

/// Filter state for one view.
///
/// Every edit swaps in a new tree and bumps [`version`](Self::version), which
/// callers use as a change token.
///
/// # Example
///
/// ```
/// use filter_expr_rs::{ToggleOptions, Value};
/// use filter_state_rs::{FieldSpec, ViewFilterState, ViewSpec};
///
/// let spec = ViewSpec::new("orders").with_dimensions([FieldSpec::dimension("country")]);
/// let mut state = ViewFilterState::new(spec);
///
/// state.toggle_value("country", &Value::from("US"), ToggleOptions::default());
/// let text = state.toggle_value("country", &Value::from("CA"), ToggleOptions::default());
/// assert_eq!(text, "country IN ('US','CA')");
/// ```
#[derive(Debug, Clone)]
pub struct ViewFilterState {
    spec: ViewSpec,
    dimension_expr: Expr,
    thresholds: Vec<ThresholdGroup>,
    list_columns: BTreeSet<String>,
    text: String,
    raw_text: Option<String>,
    error: Option<ParseError>,
    default_text: Option<String>,
    version: u64,
    derived: Derived,
}

impl ViewFilterState {
    /// Creates an empty state for `spec`. The default text comes from the
    /// view's default filter.
    pub fn new(spec: ViewSpec) -> Self {
        let default_text = spec.default_filter.clone();
        Self {
            spec,
            dimension_expr: Expr::empty(),
            thresholds: Vec::new(),
            list_columns: BTreeSet::new(),
            text: String::new(),
            raw_text: None,
            error: None,
            default_text,
            version: 0,
            derived: Derived::default(),
        }
    }

    /// View name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ViewSpec {
        &self.spec
    }

    /// Canonical text of the current filter.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Change counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Error from the last rejected text, cleared by the next successful
    /// update.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// The dimension part of the filter. Always an `And`.
    pub fn dimension_expr(&self) -> &Expr {
        &self.dimension_expr
    }

    pub fn thresholds(&self) -> &[ThresholdGroup] {
        &self.thresholds
    }

    /// Columns rendered as `IN LIST`.
    pub fn list_columns(&self) -> &BTreeSet<String> {
        &self.list_columns
    }

    /// The full filter: dimension conditions followed by thresholds.
    pub fn expr(&self) -> Expr {
        merge_where(&self.dimension_expr, &self.thresholds)
    }

    pub fn dimension_items(&self) -> &[DimensionFilterItem] {
        &self.derived.dimensions
    }

    pub fn measure_items(&self) -> &[MeasureFilterItem] {
        &self.derived.measures
    }

    /// Root conditions on known fields that are not plain dimension
    /// filters, such as `OR` groups or comparisons on dimensions.
    pub fn complex_filters(&self) -> &[Arc<Expr>] {
        &self.derived.complex
    }

    /// Identifiers the view does not define. Their conditions are kept in
    /// the text but never displayed.
    pub fn unresolved_fields(&self) -> &[UnresolvedField] {
        &self.derived.unresolved
    }

    /// Returns the display item for `dimension`, if filtered.
    pub fn dimension_item(&self, dimension: &str) -> Option<&DimensionFilterItem> {
        self.derived.dimensions.iter().find(|d| d.name == dimension)
    }

    /// Returns the display item for `measure`, if it has a threshold.
    pub fn measure_item(&self, measure: &str) -> Option<&MeasureFilterItem> {
        self.derived.measures.iter().find(|m| m.name == measure)
    }

    /// True if any dimension or measure filter is displayed.
    pub fn has_filters(&self) -> bool {
        !self.derived.dimensions.is_empty() || !self.derived.measures.is_empty()
    }

    pub fn default_text(&self) -> Option<&str> {
        self.default_text.as_deref()
    }

    pub fn set_default_text(&mut self, text: Option<String>) {
        self.default_text = text;
    }

    // ==================== External Text ====================

    /// Replaces the filter with `text`, typically read from the URL.
    ///
    /// Returns `Ok(false)` without re-parsing when `text` is the current
    /// canonical text or the last text handed in. On a parse error the
    /// filter is reset to empty, the error is kept and returned.
    pub fn set_text(&mut self, text: &str) -> Result<bool, ParseError> {
        if self.raw_text.as_deref() == Some(text) {
            if let Some(error) = &self.error {
                return Err(error.clone());
            }
            debug!(view = %self.spec.name, "filter text unchanged, skipping parse");
            return Ok(false);
        }
        if self.error.is_none() && text == self.text {
            debug!(view = %self.spec.name, "filter text is canonical, skipping parse");
            self.raw_text = Some(text.to_string());
            return Ok(false);
        }

        let result = match parse(text) {
            Ok(parsed) => {
                debug!(view = %self.spec.name, text, "parsed filter text");
                self.load(parsed);
                Ok(true)
            }
            Err(error) => {
                warn!(view = %self.spec.name, %error, "invalid filter text, resetting filter");
                self.load(Parsed::default());
                self.error = Some(error.clone());
                Err(error)
            }
        };
        self.raw_text = Some(text.to_string());
        result
    }

    /// Replaces the view definition and re-derives from the current text.
    pub fn update_spec(&mut self, spec: ViewSpec) {
        if spec == self.spec {
            return;
        }
        self.default_text = spec.default_filter.clone();
        self.spec = spec;
        // Measures are recognized through the catalog, so split again.
        let full = self.expr();
        let list_columns = std::mem::take(&mut self.list_columns);
        self.load(Parsed {
            expr: full,
            meta: ParseMeta { list_columns },
        });
    }

    fn load(&mut self, parsed: Parsed) {
        let spec = &self.spec;
        let (dimension_expr, thresholds) =
            split_where(&parsed.expr, |name| spec.measure(name).is_some());
        self.list_columns = parsed.meta.list_columns;
        self.commit(dimension_expr, thresholds);
    }

    // ==================== Edits ====================

    /// Toggles one value of `dimension`. Leaves list mode.
    pub fn toggle_value(&mut self, dimension: &str, value: &Value, options: ToggleOptions) -> String {
        self.toggle_values(dimension, std::slice::from_ref(value), options)
    }

    /// Toggles several values of `dimension` in order. Leaves list mode.
    pub fn toggle_values(
        &mut self,
        dimension: &str,
        values: &[Value],
        options: ToggleOptions,
    ) -> String {
        let expr = toggle_values(&self.dimension_expr, dimension, values, options);
        self.list_columns.remove(dimension);
        self.replace_dimensions(expr)
    }

    /// Switches `dimension` to contains mode. Leaves list mode.
    pub fn apply_contains_mode(
        &mut self,
        dimension: &str,
        search_text: &str,
        exclude: Option<bool>,
    ) -> String {
        let expr = apply_contains_mode(&self.dimension_expr, dimension, search_text, exclude);
        self.list_columns.remove(dimension);
        self.replace_dimensions(expr)
    }

    /// Replaces the selection of `dimension` with a pasted list.
    pub fn apply_in_list_mode(&mut self, dimension: &str, values: &[Value]) -> String {
        let expr = apply_in_list_mode(&self.dimension_expr, dimension, values);
        if values.is_empty() {
            self.list_columns.remove(dimension);
        } else {
            self.list_columns.insert(dimension.to_string());
        }
        self.replace_dimensions(expr)
    }

    /// Flips include/exclude for `dimension`.
    pub fn toggle_exclude_mode(&mut self, dimension: &str) -> String {
        let expr = toggle_exclude_mode(&self.dimension_expr, dimension);
        self.replace_dimensions(expr)
    }

    /// Removes the filter on `dimension`.
    pub fn remove_filter(&mut self, dimension: &str) -> String {
        let expr = remove_filter(&self.dimension_expr, dimension);
        self.list_columns.remove(dimension);
        self.replace_dimensions(expr)
    }

    /// Sets the threshold for `entry.measure` under `grouping`.
    ///
    /// A measure has one threshold per view: if it already sits under a
    /// different grouping it is moved.
    pub fn set_threshold(&mut self, grouping: Option<&str>, entry: ThresholdEntry) -> String {
        let current = find_threshold(&self.thresholds, &entry.measure)
            .map(|(group, _)| group.dimension.clone());
        let thresholds = match current {
            Some(from) if from.as_deref() != grouping => {
                move_threshold(&self.thresholds, from.as_deref(), grouping, entry)
            }
            _ => set_threshold(&self.thresholds, grouping, entry),
        };
        self.replace_thresholds(thresholds)
    }

    /// Removes the threshold on `measure` under `grouping`.
    pub fn remove_threshold(&mut self, grouping: Option<&str>, measure: &str) -> String {
        let thresholds = remove_threshold(&self.thresholds, grouping, measure);
        self.replace_thresholds(thresholds)
    }

    /// Grouping of the threshold on `measure`, if one exists.
    pub fn threshold_grouping(&self, measure: &str) -> Option<Option<&str>> {
        find_threshold(&self.thresholds, measure).map(|(group, _)| group.dimension.as_deref())
    }

    /// Drops every condition, known or not.
    pub fn clear(&mut self) -> String {
        self.list_columns.clear();
        self.thresholds.clear();
        self.commit(Expr::empty(), Vec::new());
        self.text.clone()
    }

    fn replace_dimensions(&mut self, dimension_expr: Expr) -> String {
        let thresholds = std::mem::take(&mut self.thresholds);
        self.commit(dimension_expr, thresholds);
        self.text.clone()
    }

    fn replace_thresholds(&mut self, thresholds: Vec<ThresholdGroup>) -> String {
        let dimension_expr = std::mem::take(&mut self.dimension_expr);
        self.commit(dimension_expr, thresholds);
        self.text.clone()
    }

    /// Installs a new tree, re-renders the canonical text and re-derives.
    fn commit(&mut self, dimension_expr: Expr, thresholds: Vec<ThresholdGroup>) {
        self.raw_text = None;
        self.error = None;
        self.dimension_expr = dimension_expr.into_root();
        self.thresholds = thresholds;
        let options = SerializeOptions {
            list_columns: self.list_columns.clone(),
        };
        self.text = serialize(&self.expr(), &options);
        self.derived = self.derive();
        self.version += 1;
    }

    // ==================== Derivation ====================

    fn derive(&self) -> Derived {
        let mut derived = Derived::default();

        for child in root_children(&self.dimension_expr) {
            match self.dimension_item_for(&child) {
                Some(item) => derived.dimensions.push(item),
                None if self.references_only_known(&child) => derived.complex.push(child),
                None => {}
            }
        }

        for group in &self.thresholds {
            for entry in &group.filters {
                let Some(spec) = self.spec.measure(&entry.measure) else {
                    continue;
                };
                derived.measures.push(MeasureFilterItem {
                    name: entry.measure.clone(),
                    label: spec.label().to_string(),
                    dimension: group.dimension.clone(),
                    filter: entry.clone(),
                });
            }
        }

        for name in self.expr().identifiers() {
            if self.spec.knows(&name) {
                continue;
            }
            let suggestion = find_similar_name(&name, self.spec.field_names());
            debug!(view = %self.spec.name, field = %name, ?suggestion, "unresolved field");
            derived.unresolved.push(UnresolvedField { name, suggestion });
        }

        derived
    }

    fn dimension_item_for(&self, node: &Expr) -> Option<DimensionFilterItem> {
        let column = node.column()?;
        let spec = self.spec.dimension(column)?;
        let (mode, include, values, search) = match node {
            Expr::In {
                values, exclude, ..
            } => {
                let mode = if self.list_columns.contains(column) {
                    DimensionMode::InList
                } else {
                    DimensionMode::Select
                };
                (mode, !exclude, values.clone(), None)
            }
            Expr::Like {
                pattern, exclude, ..
            } => (
                DimensionMode::Contains,
                !exclude,
                Vec::new(),
                Some(search_text(pattern).to_string()),
            ),
            _ => return None,
        };
        Some(DimensionFilterItem {
            name: column.to_string(),
            label: spec.label().to_string(),
            mode,
            include,
            values,
            search_text: search,
        })
    }

    fn references_only_known(&self, node: &Expr) -> bool {
        node.identifiers().iter().all(|name| self.spec.knows(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldSpec;
    use filter_expr_rs::CompareOp;

    fn orders() -> ViewSpec {
        ViewSpec::new("orders")
            .with_dimensions([
                FieldSpec::dimension("country").with_label("Country"),
                FieldSpec::dimension("city"),
                FieldSpec::time("created_at"),
            ])
            .with_measures([FieldSpec::measure("revenue"), FieldSpec::measure("orders")])
    }

    fn us() -> Value {
        Value::from("US")
    }

    // ==================== Text Tests ====================

    #[test]
    fn test_set_text_derives_items() {
        let mut state = ViewFilterState::new(orders());
        assert!(state
            .set_text("country IN LIST ('US','CA') AND city LIKE '%san%' AND revenue GT 100")
            .unwrap());

        let country = state.dimension_item("country").unwrap();
        assert_eq!(country.mode, DimensionMode::InList);
        assert_eq!(country.label, "Country");
        assert!(country.include);

        let city = state.dimension_item("city").unwrap();
        assert_eq!(city.mode, DimensionMode::Contains);
        assert_eq!(city.search_text.as_deref(), Some("san"));

        let revenue = state.measure_item("revenue").unwrap();
        assert_eq!(revenue.dimension, None);
        assert_eq!(revenue.filter.operator, CompareOp::Gt);
    }

    #[test]
    fn test_set_text_short_circuits_on_same_text() {
        let mut state = ViewFilterState::new(orders());
        state.set_text("'country' IN ('US')").unwrap();
        let version = state.version();

        assert!(!state.set_text("'country' IN ('US')").unwrap());
        assert!(!state.set_text("country IN ('US')").unwrap());
        assert_eq!(state.version(), version);
    }

    #[test]
    fn test_default_text_is_separate_from_current_filter() {
        let mut state = ViewFilterState::new(orders().with_default_filter("city IN ('Oslo')"));
        assert_eq!(state.default_text(), Some("city IN ('Oslo')"));
        assert_eq!(state.text(), "");

        state.set_text("country IN ('US')").unwrap();
        let version = state.version();
        state.set_default_text(None);
        assert_eq!(state.default_text(), None);
        assert_eq!(state.text(), "country IN ('US')");
        assert_eq!(state.version(), version);
    }

    #[test]
    fn test_set_text_error_resets_to_empty() {
        let mut state = ViewFilterState::new(orders());
        state.set_text("country IN ('US')").unwrap();

        let err = state.set_text("country IN ('US'").unwrap_err();
        assert_eq!(state.text(), "");
        assert!(!state.has_filters());
        assert_eq!(state.error(), Some(&err));

        // Same bad text again reports the same error without re-parsing.
        let version = state.version();
        assert_eq!(state.set_text("country IN ('US'").unwrap_err(), err);
        assert_eq!(state.version(), version);

        state.set_text("").unwrap();
        assert!(state.error().is_none());
    }

    #[test]
    fn test_unresolved_fields_are_kept_but_not_displayed() {
        let mut state = ViewFilterState::new(orders());
        state.set_text("contry IN ('US') AND city LIKE '%a%'").unwrap();

        assert!(state.dimension_item("contry").is_none());
        assert_eq!(
            state.unresolved_fields(),
            &[UnresolvedField {
                name: "contry".to_string(),
                suggestion: Some("country".to_string()),
            }]
        );

        let text = state.toggle_value("city", &us(), ToggleOptions::default());
        assert_eq!(text, "contry IN ('US') AND city IN ('US')");
    }

    #[test]
    fn test_time_and_or_conditions_are_complex() {
        let mut state = ViewFilterState::new(orders());
        state
            .set_text("(country IN ('US') OR city IN ('Paris')) AND created_at GT '2024-01-01'")
            .unwrap();
        assert!(state.dimension_items().is_empty());
        assert_eq!(state.complex_filters().len(), 2);
        assert!(state.unresolved_fields().is_empty());
    }

    #[test]
    fn test_update_spec_resolves_thresholds() {
        let mut state = ViewFilterState::new(ViewSpec::new("orders"));
        state.set_text("revenue GT 100").unwrap();
        assert!(state.measure_items().is_empty());
        assert_eq!(state.unresolved_fields().len(), 1);

        state.update_spec(orders());
        assert!(state.measure_item("revenue").is_some());
        assert!(state.unresolved_fields().is_empty());
        assert_eq!(state.text(), "revenue GT 100");
    }

    #[test]
    fn test_range_threshold_keeps_both_bounds() {
        let mut state = ViewFilterState::new(orders());
        state.set_text("revenue GT 10 AND revenue LT 100").unwrap();
        assert_eq!(state.text(), "revenue GT 10 AND revenue LT 100");
        assert!(state.measure_item("revenue").is_none());
        assert_eq!(state.complex_filters().len(), 2);

        let text = state.toggle_value("country", &us(), ToggleOptions::default());
        assert_eq!(text, "revenue GT 10 AND revenue LT 100 AND country IN ('US')");

        state
            .set_text("country HAVING (revenue GT 1) AND country HAVING (revenue LT 5)")
            .unwrap();
        assert_eq!(
            state.text(),
            "country HAVING (revenue GT 1) AND country HAVING (revenue LT 5)"
        );
        assert!(state.thresholds().is_empty());
    }

    // ==================== Edit Tests ====================

    #[test]
    fn test_each_edit_bumps_version() {
        let mut state = ViewFilterState::new(orders());
        let v0 = state.version();
        state.toggle_value("country", &us(), ToggleOptions::default());
        state.toggle_exclude_mode("country");
        assert_eq!(state.version(), v0 + 2);
    }

    #[test]
    fn test_toggle_leaves_list_mode() {
        let mut state = ViewFilterState::new(orders());
        state.apply_in_list_mode("country", &[us(), Value::from("CA")]);
        assert_eq!(state.text(), "country IN LIST ('US','CA')");

        let text = state.toggle_value("country", &Value::from("CA"), ToggleOptions::default());
        assert_eq!(text, "country IN ('US')");
        assert_eq!(state.dimension_item("country").unwrap().mode, DimensionMode::Select);
    }

    #[test]
    fn test_contains_then_exclude() {
        let mut state = ViewFilterState::new(orders());
        state.apply_contains_mode("city", "san", None);
        let text = state.toggle_exclude_mode("city");
        assert_eq!(text, "city NLIKE '%san%'");
        assert!(!state.dimension_item("city").unwrap().include);
    }

    #[test]
    fn test_thresholds_follow_dimension_filters() {
        let mut state = ViewFilterState::new(orders());
        state.set_threshold(Some("country"), ThresholdEntry::new("revenue", CompareOp::Gt, 100i64));
        let text = state.toggle_value("city", &Value::from("Paris"), ToggleOptions::default());
        assert_eq!(text, "city IN ('Paris') AND country HAVING (revenue GT 100)");
    }

    #[test]
    fn test_set_threshold_moves_between_groupings() {
        let mut state = ViewFilterState::new(orders());
        state.set_threshold(None, ThresholdEntry::new("revenue", CompareOp::Gt, 100i64));
        let text =
            state.set_threshold(Some("country"), ThresholdEntry::new("revenue", CompareOp::Gt, 5i64));
        assert_eq!(text, "country HAVING (revenue GT 5)");
        assert_eq!(state.threshold_grouping("revenue"), Some(Some("country")));
    }

    #[test]
    fn test_remove_last_threshold_clears_text() {
        let mut state = ViewFilterState::new(orders());
        state.set_threshold(None, ThresholdEntry::new("orders", CompareOp::Lte, 3i64));
        assert_eq!(state.remove_threshold(None, "orders"), "");
        assert!(state.thresholds().is_empty());
    }

    #[test]
    fn test_clear_drops_unresolved_conditions() {
        let mut state = ViewFilterState::new(orders());
        state.set_text("ghost IN ('x') AND country IN ('US')").unwrap();
        assert_eq!(state.clear(), "");
        assert!(state.unresolved_fields().is_empty());
    }
}
