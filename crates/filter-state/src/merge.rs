//! Cross-view merge of per-view filters into one ordered display.
//!
//! Fields are matched across views by name. Each distinct field yields at
//! most one merged entry, keyed by [`merge_key`](crate::merge_key) over every
//! view exposing it. Entries are ordered pinned first (pin order), then by
//! where the field first appears in the combined filter text, then
//! temporary entries (insertion order).

use chrono::{DateTime, Utc};
use filter_expr_rs::{ThresholdEntry, Value};
use serde::Serialize;
use tracing::warn;

use crate::catalog::{FieldLocation, FieldLookup};
use crate::keys::{PinnedKeys, TemporaryKeys};
use crate::view_state::{DimensionFilterItem, DimensionMode, ViewFilterState};

/// Separator used to build the combined filter text.
const FULL_TEXT_SEPARATOR: &str = " AND ";

/// Which side of the filter bar an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Dimension,
    Measure,
}

/// The filter shown for a merged entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedFilter {
    Dimension {
        mode: DimensionMode,
        include: bool,
        values: Vec<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        search_text: Option<String>,
    },
    Measure {
        /// Grouping dimension.
        dimension: Option<String>,
        /// `None` for a placeholder.
        filter: Option<ThresholdEntry>,
    },
}

impl ResolvedFilter {
    fn dimension_placeholder() -> Self {
        ResolvedFilter::Dimension {
            mode: DimensionMode::Select,
            include: true,
            values: Vec::new(),
            search_text: None,
        }
    }

    fn measure_placeholder() -> Self {
        ResolvedFilter::Measure {
            dimension: None,
            filter: None,
        }
    }

    fn from_dimension(item: &DimensionFilterItem) -> Self {
        ResolvedFilter::Dimension {
            mode: item.mode,
            include: item.include,
            values: item.values.clone(),
            search_text: item.search_text.clone(),
        }
    }

    /// Returns true for an entry that carries no condition.
    pub fn is_placeholder(&self) -> bool {
        match self {
            ResolvedFilter::Dimension {
                values,
                search_text,
                ..
            } => values.is_empty() && search_text.is_none(),
            ResolvedFilter::Measure { filter, .. } => filter.is_none(),
        }
    }

    /// Differences that the merge cannot reconcile: polarity or mode for
    /// dimensions, grouping or operator for measures.
    fn conflicts_with(&self, other: &ResolvedFilter) -> bool {
        match (self, other) {
            (
                ResolvedFilter::Dimension {
                    mode: a_mode,
                    include: a_include,
                    ..
                },
                ResolvedFilter::Dimension {
                    mode: b_mode,
                    include: b_include,
                    ..
                },
            ) => a_mode != b_mode || a_include != b_include,
            (
                ResolvedFilter::Measure {
                    dimension: a_dim,
                    filter: a,
                },
                ResolvedFilter::Measure {
                    dimension: b_dim,
                    filter: b,
                },
            ) => a_dim != b_dim || a.as_ref().map(|f| f.operator) != b.as_ref().map(|f| f.operator),
            _ => true,
        }
    }
}

/// One filter chip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedFilter {
    /// Merge key.
    pub key: String,
    /// Field name.
    pub name: String,
    /// Display label.
    pub label: String,
    pub category: FieldCategory,
    pub pinned: bool,
    pub temporary: bool,
    /// True shortly after the entry was added as temporary, so the UI can
    /// open it.
    pub just_added: bool,
    /// Every view exposing the field, sorted.
    pub views: Vec<String>,
    pub filter: ResolvedFilter,
}

/// The merged, ordered filter bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedDisplay {
    pub dimensions: Vec<MergedFilter>,
    pub measures: Vec<MergedFilter>,
    /// Per-view canonical texts joined with `AND`.
    pub full_text: String,
    /// Any view shows a dimension or measure filter.
    pub has_clearable_filters: bool,
    /// Clearable filters exist, or any key is pinned or temporary.
    pub has_filters: bool,
}

impl MergedDisplay {
    /// Iterates dimension entries, then measure entries.
    pub fn iter(&self) -> impl Iterator<Item = &MergedFilter> {
        self.dimensions.iter().chain(self.measures.iter())
    }

    /// Finds an entry by merge key.
    pub fn get(&self, key: &str) -> Option<&MergedFilter> {
        self.iter().find(|f| f.key == key)
    }

    /// Sets the just-added flag of every temporary entry as of `now`.
    pub fn mark_just_added(&mut self, temporary: &TemporaryKeys, now: DateTime<Utc>) {
        for entry in self.dimensions.iter_mut().chain(self.measures.iter_mut()) {
            entry.just_added = entry.temporary && temporary.just_added(&entry.key, now);
        }
    }
}

/// Everything a merge reads.
#[derive(Debug, Clone, Copy)]
pub struct MergeInput<'a> {
    /// Per-view states, in registration order.
    pub states: &'a [ViewFilterState],
    pub lookup: &'a FieldLookup,
    pub pinned: &'a PinnedKeys,
    pub temporary: &'a TemporaryKeys,
}

/// Merges per-view filters into one display. Pure: never touches the
/// states. Just-added flags are left unset; see
/// [`MergedDisplay::mark_just_added`].
pub fn merge_filters(input: &MergeInput<'_>) -> MergedDisplay {
    let full_text = input
        .states
        .iter()
        .map(ViewFilterState::text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(FULL_TEXT_SEPARATOR);

    let mut dimensions: Vec<MergedFilter> = input
        .lookup
        .dimensions
        .iter()
        .filter_map(|location| {
            merge_field(input, location, FieldCategory::Dimension, |state| {
                state
                    .dimension_item(&location.name)
                    .map(ResolvedFilter::from_dimension)
            })
        })
        .collect();

    let mut measures: Vec<MergedFilter> = input
        .lookup
        .measures
        .iter()
        .filter_map(|location| {
            merge_field(input, location, FieldCategory::Measure, |state| {
                state
                    .measure_item(&location.name)
                    .map(|item| ResolvedFilter::Measure {
                        dimension: item.dimension.clone(),
                        filter: Some(item.filter.clone()),
                    })
            })
        })
        .collect();

    sort_entries(&mut dimensions, input, &full_text);
    sort_entries(&mut measures, input, &full_text);

    let has_clearable_filters = input.states.iter().any(ViewFilterState::has_filters);
    let has_filters =
        has_clearable_filters || !input.pinned.is_empty() || !input.temporary.is_empty();

    MergedDisplay {
        dimensions,
        measures,
        full_text,
        has_clearable_filters,
        has_filters,
    }
}

fn merge_field(
    input: &MergeInput<'_>,
    location: &FieldLocation,
    category: FieldCategory,
    resolve: impl Fn(&ViewFilterState) -> Option<ResolvedFilter>,
) -> Option<MergedFilter> {
    let key = location.key();
    let pinned = input.pinned.contains(&key);
    let temporary = input.temporary.contains(&key);

    let mut found: Option<(&str, ResolvedFilter)> = None;
    for state in input
        .states
        .iter()
        .filter(|s| location.views.contains_key(s.name()))
    {
        let Some(filter) = resolve(state) else {
            continue;
        };
        if let Some((first_view, first)) = &found {
            if first.conflicts_with(&filter) {
                warn!(
                    field = %location.name,
                    kept = %first_view,
                    ignored = %state.name(),
                    "conflicting filters across views, keeping the first"
                );
            }
        } else {
            found = Some((state.name(), filter));
        }
    }

    let filter = match found {
        Some((_, filter)) => filter,
        None if pinned || temporary => match category {
            FieldCategory::Dimension => ResolvedFilter::dimension_placeholder(),
            FieldCategory::Measure => ResolvedFilter::measure_placeholder(),
        },
        None => return None,
    };

    Some(MergedFilter {
        key,
        name: location.name.clone(),
        label: location.label().to_string(),
        category,
        pinned,
        temporary,
        just_added: false,
        views: location.view_names(),
        filter,
    })
}

/// Stable sort: pinned by pin order, then by first offset of the field name
/// in `full_text` (absent last), then temporary by insertion order.
fn sort_entries(entries: &mut [MergedFilter], input: &MergeInput<'_>, full_text: &str) {
    entries.sort_by_cached_key(|entry| {
        if let Some(index) = input.pinned.index_of(&entry.key) {
            (0u8, index)
        } else if let Some(index) = input.temporary.index_of(&entry.key) {
            (2, index)
        } else {
            (1, full_text.find(entry.name.as_str()).unwrap_or(usize::MAX))
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, FieldSpec, ViewSpec};
    use crate::keys::merge_key;
    use filter_expr_rs::CompareOp;

    fn catalog() -> Catalog {
        Catalog::new([
            ViewSpec::new("orders")
                .with_dimensions([
                    FieldSpec::dimension("region"),
                    FieldSpec::dimension("country"),
                    FieldSpec::dimension("city"),
                ])
                .with_measures([FieldSpec::measure("revenue")]),
            ViewSpec::new("shipments")
                .with_dimensions([FieldSpec::dimension("region"), FieldSpec::dimension("carrier")])
                .with_measures([FieldSpec::measure("revenue")]),
        ])
    }

    fn states(catalog: &Catalog, texts: &[(&str, &str)]) -> Vec<ViewFilterState> {
        catalog
            .views
            .iter()
            .map(|spec| {
                let mut state = ViewFilterState::new(spec.clone());
                if let Some((_, text)) = texts.iter().find(|(v, _)| *v == spec.name) {
                    state.set_text(text).unwrap();
                }
                state
            })
            .collect()
    }

    fn merge(
        catalog: &Catalog,
        states: &[ViewFilterState],
        pinned: &PinnedKeys,
        temporary: &TemporaryKeys,
    ) -> MergedDisplay {
        let lookup = catalog.lookup();
        merge_filters(&MergeInput {
            states,
            lookup: &lookup,
            pinned,
            temporary,
        })
    }

    fn keys(entries: &[MergedFilter]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_same_field_merges_into_one_entry() {
        let catalog = catalog();
        let states = states(
            &catalog,
            &[
                ("orders", "region IN ('EU')"),
                ("shipments", "region IN ('EU')"),
            ],
        );
        let display = merge(&catalog, &states, &PinnedKeys::default(), &TemporaryKeys::default());

        assert_eq!(keys(&display.dimensions), vec!["orders//shipments::region"]);
        assert_eq!(display.dimensions[0].views, vec!["orders", "shipments"]);
        assert!(display.has_clearable_filters);
        assert_eq!(display.full_text, "region IN ('EU') AND region IN ('EU')");
    }

    #[test]
    fn test_conflict_keeps_first_view() {
        let catalog = catalog();
        let states = states(
            &catalog,
            &[
                ("orders", "region IN ('EU')"),
                ("shipments", "region NIN ('US')"),
            ],
        );
        let display = merge(&catalog, &states, &PinnedKeys::default(), &TemporaryKeys::default());

        assert_eq!(display.dimensions.len(), 1);
        match &display.dimensions[0].filter {
            ResolvedFilter::Dimension {
                include, values, ..
            } => {
                assert!(*include);
                assert_eq!(values, &vec![Value::from("EU")]);
            }
            other => panic!("expected a dimension filter, got {other:?}"),
        }
    }

    #[test]
    fn test_placeholders_only_for_pinned_or_temporary() {
        let catalog = catalog();
        let states = states(&catalog, &[]);
        let pinned = PinnedKeys::from_keys([merge_key(["orders"], "country")]);
        let mut temporary = TemporaryKeys::default();
        temporary.add(merge_key(["orders", "shipments"], "revenue"), Utc::now());

        let display = merge(&catalog, &states, &pinned, &temporary);

        assert_eq!(keys(&display.dimensions), vec!["orders::country"]);
        assert!(display.dimensions[0].filter.is_placeholder());
        assert!(display.dimensions[0].pinned);

        assert_eq!(keys(&display.measures), vec!["orders//shipments::revenue"]);
        assert_eq!(
            display.measures[0].filter,
            ResolvedFilter::Measure {
                dimension: None,
                filter: None
            }
        );
        assert!(!display.has_clearable_filters);
        assert!(display.has_filters);
    }

    #[test]
    fn test_ordering_pinned_positional_temporary() {
        let catalog = catalog();
        let states = states(
            &catalog,
            &[("orders", "city IN ('Paris') AND country IN ('FR')")],
        );
        let pinned = PinnedKeys::from_keys([
            merge_key(["shipments"], "carrier"),
            merge_key(["orders", "shipments"], "region"),
        ]);
        let mut temporary = TemporaryKeys::default();
        temporary.add(merge_key(["orders"], "country"), Utc::now());

        let display = merge(&catalog, &states, &pinned, &temporary);

        assert_eq!(
            keys(&display.dimensions),
            vec![
                "shipments::carrier",
                "orders//shipments::region",
                "orders::city",
                "orders::country",
            ]
        );
        assert!(display.dimensions[3].temporary);
    }

    #[test]
    fn test_positional_order_follows_text() {
        let catalog = catalog();
        let states = states(
            &catalog,
            &[("orders", "country IN ('FR') AND city IN ('Paris')")],
        );
        let display = merge(&catalog, &states, &PinnedKeys::default(), &TemporaryKeys::default());
        assert_eq!(keys(&display.dimensions), vec!["orders::country", "orders::city"]);
    }

    #[test]
    fn test_threshold_on_one_view_keys_over_both() {
        let catalog = catalog();
        let mut states = states(&catalog, &[]);
        states[0].set_threshold(None, ThresholdEntry::new("revenue", CompareOp::Gt, 100i64));

        let display = merge(&catalog, &states, &PinnedKeys::default(), &TemporaryKeys::default());

        assert_eq!(keys(&display.measures), vec!["orders//shipments::revenue"]);
        assert_eq!(
            display.measures[0].filter,
            ResolvedFilter::Measure {
                dimension: None,
                filter: Some(ThresholdEntry::new("revenue", CompareOp::Gt, 100i64)),
            }
        );
    }

    #[test]
    fn test_mark_just_added() {
        let catalog = catalog();
        let states = states(&catalog, &[]);
        let now = Utc::now();
        let mut temporary = TemporaryKeys::default();
        temporary.add(merge_key(["orders"], "city"), now);

        let mut display = merge(&catalog, &states, &PinnedKeys::default(), &temporary);
        display.mark_just_added(&temporary, now);
        assert!(display.dimensions[0].just_added);

        display.mark_just_added(&temporary, now + chrono::Duration::seconds(1));
        assert!(!display.dimensions[0].just_added);
    }
}
