//! Tests for the filter manager.

use super::*;
use crate::catalog::{FieldSpec, ViewSpec};
use crate::merge::ResolvedFilter;
use chrono::Duration;
use filter_expr_rs::CompareOp;

fn catalog() -> Catalog {
    Catalog::new([
        ViewSpec::new("orders")
            .with_dimensions([
                FieldSpec::dimension("region"),
                FieldSpec::dimension("country").with_label("Country"),
            ])
            .with_measures([FieldSpec::measure("revenue")]),
        ViewSpec::new("shipments")
            .with_dimensions([FieldSpec::dimension("region"), FieldSpec::dimension("carrier")])
            .with_measures([FieldSpec::measure("revenue")])
            .with_default_filter("carrier IN ('DHL')"),
    ])
}

fn manager() -> FilterManager {
    FilterManager::new(catalog(), &[])
}

fn us() -> Value {
    Value::from("US")
}

fn text(update: &FilterUpdate, view: &str) -> Option<String> {
    update.views.get(view).cloned().flatten()
}

// ==================== Action Tests ====================

#[test]
fn test_toggle_applies_to_every_view_exposing_field() {
    let mut manager = manager();
    let update = manager.toggle_value(
        "region",
        &[Value::from("EU")],
        &[],
        ToggleOptions::default(),
        false,
        Utc::now(),
    );

    assert_eq!(text(&update, "orders").as_deref(), Some("region IN ('EU')"));
    assert_eq!(text(&update, "shipments").as_deref(), Some("region IN ('EU')"));
    assert!(!update.allow_clear);

    let display = manager.display(Utc::now());
    assert_eq!(display.dimensions.len(), 1);
    assert_eq!(display.dimensions[0].key, "orders//shipments::region");
}

#[test]
fn test_explicit_views_limit_the_edit() {
    let mut manager = manager();
    let update = manager.toggle_value(
        "region",
        &[Value::from("EU")],
        &["shipments".to_string()],
        ToggleOptions::default(),
        false,
        Utc::now(),
    );
    assert_eq!(update.views.len(), 1);
    assert_eq!(manager.state("orders").unwrap().text(), "");
}

#[test]
fn test_removing_last_value_of_pinned_filter_keeps_placeholder() {
    let mut manager = FilterManager::new(catalog(), &["country".to_string()]);
    let now = Utc::now();

    manager.toggle_value("country", &[us()], &[], ToggleOptions::default(), false, now);
    let update = manager.toggle_value("country", &[us()], &[], ToggleOptions::default(), false, now);
    assert_eq!(text(&update, "orders"), None);

    let display = manager.display(now);
    let entry = display.get("orders::country").expect("pinned entry stays");
    assert!(entry.pinned);
    assert_eq!(entry.label, "Country");
    assert_eq!(
        entry.filter,
        ResolvedFilter::Dimension {
            mode: crate::DimensionMode::Select,
            include: true,
            values: Vec::new(),
            search_text: None,
        }
    );
}

#[test]
fn test_threshold_on_one_view_merges_over_both() {
    let mut manager = manager();
    let update = manager.set_threshold(
        None,
        ThresholdEntry::new("revenue", CompareOp::Gt, 100i64),
        &["orders".to_string()],
    );
    assert_eq!(text(&update, "orders").as_deref(), Some("revenue GT 100"));
    assert!(!update.views.contains_key("shipments"));

    let display = manager.display(Utc::now());
    assert_eq!(display.measures.len(), 1);
    assert_eq!(display.measures[0].key, "orders//shipments::revenue");
    assert_eq!(display.measures[0].views, vec!["orders", "shipments"]);
}

#[test]
fn test_keep_visible_adds_temporary_when_emptied() {
    let mut manager = manager();
    let now = Utc::now();
    manager.toggle_value("carrier", &[us()], &[], ToggleOptions::default(), false, now);
    manager.toggle_value("carrier", &[us()], &[], ToggleOptions::default(), true, now);

    assert!(manager.temporary().contains("shipments::carrier"));
    let display = manager.display(now);
    let entry = display.get("shipments::carrier").unwrap();
    assert!(entry.temporary);
    assert!(entry.just_added);
    assert!(entry.filter.is_placeholder());

    let later = manager.display(now + Duration::milliseconds(250));
    assert!(!later.get("shipments::carrier").unwrap().just_added);
}

#[test]
fn test_edit_clears_temporary_marker() {
    let mut manager = manager();
    let now = Utc::now();
    let key = manager.add_temporary_filter("country", &[], now);
    assert_eq!(key, "orders::country");
    assert!(manager.temporary().contains(&key));

    manager.apply_contains_mode("country", "u", None, &[]);
    assert!(!manager.temporary().contains(&key));
    assert_eq!(manager.state("orders").unwrap().text(), "country LIKE '%u%'");
}

#[test]
fn test_remove_filter_unpins_and_allows_clear() {
    let mut manager = FilterManager::new(catalog(), &["country".to_string()]);
    manager.apply_in_list_mode("country", &[us(), Value::from("CA")], &[]);
    assert_eq!(
        manager.state("orders").unwrap().text(),
        "country IN LIST ('US','CA')"
    );

    let update = manager.remove_filter("country", &[]);
    assert!(update.allow_clear);
    assert_eq!(text(&update, "orders"), None);
    assert!(manager.pinned().is_empty());
    assert!(manager.display(Utc::now()).get("orders::country").is_none());
}

#[test]
fn test_remove_threshold_finds_grouping() {
    let mut manager = manager();
    manager.set_threshold(
        Some("region"),
        ThresholdEntry::new("revenue", CompareOp::Gte, 10i64),
        &[],
    );
    assert_eq!(
        manager.state("shipments").unwrap().text(),
        "region HAVING (revenue GTE 10)"
    );

    let update = manager.remove_threshold("revenue", &[]);
    assert!(update.allow_clear);
    assert_eq!(text(&update, "orders"), None);
    assert_eq!(text(&update, "shipments"), None);
}

#[test]
fn test_toggle_exclude_skips_views_without_filter() {
    let mut manager = manager();
    manager.toggle_value(
        "region",
        &[us()],
        &["orders".to_string()],
        ToggleOptions::default(),
        false,
        Utc::now(),
    );
    let update = manager.toggle_exclude_mode("region", &[]);
    assert_eq!(update.views.len(), 1);
    assert_eq!(text(&update, "orders").as_deref(), Some("region NIN ('US')"));
}

#[test]
fn test_toggle_pin_moves_between_pinned_and_temporary() {
    let mut manager = manager();
    let now = Utc::now();
    manager.add_temporary_filter("region", &[], now);

    assert!(manager.toggle_pin("region", &[]));
    assert!(manager.pinned().contains("orders//shipments::region"));
    assert!(!manager.temporary().contains("orders//shipments::region"));

    assert!(!manager.toggle_pin("region", &[]));
    assert!(!manager.pinned().contains("orders//shipments::region"));
    assert!(manager.temporary().contains("orders//shipments::region"));
    assert!(!manager.temporary().just_added("orders//shipments::region", now));
}

#[test]
fn test_clear_all_keeps_pinned() {
    let mut manager = FilterManager::new(catalog(), &["carrier".to_string()]);
    let now = Utc::now();
    manager.toggle_value("region", &[us()], &[], ToggleOptions::default(), false, now);
    manager.add_temporary_filter("country", &[], now);

    let update = manager.clear_all();
    assert!(update.allow_clear);
    assert!(update.views.values().all(Option::is_none));

    let display = manager.display(now);
    assert!(!display.has_clearable_filters);
    assert!(display.has_filters);
    let keys: Vec<&str> = display.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["shipments::carrier"]);
}

#[test]
fn test_input_values_match_selected_literals() {
    let mut manager = manager();
    let url = UrlState::parse("f.orders=country+IN+%28%272024%27%29").unwrap();
    assert!(manager.on_url_change(&url).is_empty());

    let values = manager.input_values("country", &[], &["2024".to_string()]);
    assert_eq!(values, vec![Value::from("2024")]);

    let update = manager.toggle_value(
        "country",
        &values,
        &[],
        ToggleOptions::default(),
        false,
        Utc::now(),
    );
    assert_eq!(update.views["orders"], None);
}

#[test]
fn test_input_values_default_to_strings() {
    let manager = manager();
    let inputs = ["2024".to_string(), "EU".to_string()];
    assert_eq!(
        manager.input_values("region", &[], &inputs),
        vec![Value::from("2024"), Value::from("EU")]
    );
}

#[test]
fn test_input_values_stay_numeric_for_numeric_selection() {
    let mut manager = manager();
    let url = UrlState::parse("f.orders=country+IN+%282023%29").unwrap();
    assert!(manager.on_url_change(&url).is_empty());

    let values = manager.input_values("country", &[], &["2023".to_string(), "2024".to_string()]);
    assert_eq!(values, vec![Value::Integer(2023), Value::Integer(2024)]);
}

// ==================== URL Tests ====================

#[test]
fn test_on_url_change_reads_view_then_legacy_param() {
    let mut manager = manager();
    let url = UrlState::parse("f=region+IN+%28%27EU%27%29&f.shipments=carrier+IN+%28%27UPS%27%29")
        .unwrap();
    assert!(manager.on_url_change(&url).is_empty());

    assert_eq!(manager.state("orders").unwrap().text(), "region IN ('EU')");
    assert_eq!(manager.state("shipments").unwrap().text(), "carrier IN ('UPS')");
}

#[test]
fn test_on_url_change_reports_parse_errors() {
    let mut manager = manager();
    let url = UrlState::parse("f.orders=region+IN+%28").unwrap();
    let errors = manager.on_url_change(&url);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "orders");
    assert_eq!(manager.state("orders").unwrap().text(), "");
}

#[test]
fn test_update_round_trip_through_url_is_noop() {
    let mut manager = manager();
    let mut url = UrlState::default();
    let update = manager.toggle_value(
        "country",
        &[us()],
        &[],
        ToggleOptions::default(),
        false,
        Utc::now(),
    );
    url.apply_filter_update(&update);

    let version = manager.state("orders").unwrap().version();
    assert!(manager.on_url_change(&url).is_empty());
    assert_eq!(manager.state("orders").unwrap().version(), version);
}

// ==================== Catalog Tests ====================

#[test]
fn test_update_catalog_keeps_surviving_views() {
    let mut manager = manager();
    manager.toggle_value("country", &[us()], &[], ToggleOptions::default(), false, Utc::now());

    let smaller = Catalog::new([catalog().views[0].clone()]);
    manager.update_catalog(smaller, &["nonexistent".to_string()]);

    assert_eq!(manager.states().len(), 1);
    assert_eq!(manager.state("orders").unwrap().text(), "country IN ('US')");
    assert!(manager.pinned().is_empty());
    assert_eq!(manager.key_for("region", &[]), "orders::region");
}

#[test]
fn test_unresolved_fields_are_reported_per_view() {
    let mut manager = manager();
    let url = UrlState::parse("f.orders=regoin+IN+%28%27EU%27%29").unwrap();
    manager.on_url_change(&url);

    let unresolved = manager.unresolved_fields();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].0, "orders");
    assert_eq!(unresolved[0].1.suggestion.as_deref(), Some("region"));
    assert!(manager.display(Utc::now()).dimensions.is_empty());
}

// ==================== Display Tests ====================

#[test]
fn test_display_recomputes_after_changes() {
    let mut manager = manager();
    let now = Utc::now();
    let first = manager.display(now);
    assert_eq!(first, manager.display(now));
    assert!(!first.has_filters);

    manager.toggle_value("carrier", &[us()], &[], ToggleOptions::default(), false, now);
    assert_eq!(manager.display(now).dimensions.len(), 1);

    manager.restore_keys(vec!["orders::country".to_string()], Vec::new());
    assert_eq!(manager.display(now).dimensions[0].key, "orders::country");
}

#[test]
fn test_default_display_uses_default_filters() {
    let mut manager = FilterManager::new(catalog(), &["country".to_string()]);
    manager.add_temporary_filter("region", &[], Utc::now());

    let defaults = manager.default_display();
    let keys: Vec<&str> = defaults.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["orders::country", "shipments::carrier"]);
}
