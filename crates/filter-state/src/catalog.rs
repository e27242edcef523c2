//! View catalog: which dimensions and measures each view exposes.
//!
//! The catalog is the only schema knowledge the filter layer needs. It decides
//! whether an identifier in a filter is a dimension, a measure, or unknown, and
//! provides display labels. Catalogs load from JSON or TOML.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::merge_key;

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O error while reading the catalog file.
    #[error("failed to read catalog file '{path}': {source}")]
    ReadError {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file extension is neither `.json` nor `.toml`.
    #[error("unsupported catalog format for '{path}': expected a .json or .toml file")]
    UnknownFormat {
        /// The offending path.
        path: PathBuf,
    },

    /// Malformed JSON catalog.
    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML catalog.
    #[error("invalid TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// What a field is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A categorical dimension.
    #[default]
    Dimension,
    /// A time dimension. Not filterable through the filter bar.
    Time,
    /// An aggregate measure.
    Measure,
}

/// One dimension or measure definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name as it appears in filter text.
    pub name: String,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Field kind. Entries under `measures` are always treated as measures.
    #[serde(default)]
    pub kind: FieldKind,
    /// Defining expression, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl FieldSpec {
    /// Creates a dimension field.
    pub fn dimension(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            kind: FieldKind::Dimension,
            expression: None,
        }
    }

    /// Creates a time dimension field.
    pub fn time(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Time,
            ..Self::dimension(name)
        }
    }

    /// Creates a measure field.
    pub fn measure(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Measure,
            ..Self::dimension(name)
        }
    }

    /// Sets the display name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.display_name = Some(label.into());
        self
    }

    /// Returns the display name, falling back to the column name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Returns true for time dimensions.
    pub fn is_time(&self) -> bool {
        self.kind == FieldKind::Time
    }
}

/// A single view definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpec {
    /// Unique view name.
    pub name: String,
    /// Dimensions, including time dimensions.
    #[serde(default)]
    pub dimensions: Vec<FieldSpec>,
    /// Measures.
    #[serde(default)]
    pub measures: Vec<FieldSpec>,
    /// Filter text applied when the view has no explicit filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_filter: Option<String>,
}

impl ViewSpec {
    /// Creates an empty view.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions: Vec::new(),
            measures: Vec::new(),
            default_filter: None,
        }
    }

    /// Adds dimensions.
    pub fn with_dimensions(mut self, dimensions: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.dimensions.extend(dimensions);
        self
    }

    /// Adds measures.
    pub fn with_measures(mut self, measures: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.measures
            .extend(measures.into_iter().map(|m| FieldSpec {
                kind: FieldKind::Measure,
                ..m
            }));
        self
    }

    /// Sets the default filter text.
    pub fn with_default_filter(mut self, text: impl Into<String>) -> Self {
        self.default_filter = Some(text.into());
        self
    }

    /// Looks up a filterable (non-time) dimension.
    pub fn dimension(&self, name: &str) -> Option<&FieldSpec> {
        self.dimensions
            .iter()
            .find(|d| d.name == name && !d.is_time())
    }

    /// Looks up a measure.
    pub fn measure(&self, name: &str) -> Option<&FieldSpec> {
        self.measures.iter().find(|m| m.name == name)
    }

    /// Returns true if the view defines `name` in any category, time
    /// dimensions included.
    pub fn knows(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d.name == name) || self.measure(name).is_some()
    }

    /// Iterates every field name the view defines.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions
            .iter()
            .chain(self.measures.iter())
            .map(|f| f.name.as_str())
    }
}

/// All views known to the filter layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Views in registration order.
    #[serde(default)]
    pub views: Vec<ViewSpec>,
}

impl Catalog {
    /// Creates a catalog from views.
    pub fn new(views: impl IntoIterator<Item = ViewSpec>) -> Self {
        Self {
            views: views.into_iter().collect(),
        }
    }

    /// Parses a JSON catalog.
    pub fn from_json_str(contents: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str::<Self>(contents)?.normalized())
    }

    /// Parses a TOML catalog (`[[views]]` tables).
    pub fn from_toml_str(contents: &str) -> CatalogResult<Self> {
        Ok(toml::from_str::<Self>(contents)?.normalized())
    }

    /// Loads a catalog file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownFormat` for extensions other than
    /// `.json` and `.toml`, `CatalogError::ReadError` if the file cannot be
    /// read, and a format error if it does not parse.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> CatalogResult<Self> = match extension.as_deref() {
            Some("json") => Self::from_json_str,
            Some("toml") => Self::from_toml_str,
            _ => {
                return Err(CatalogError::UnknownFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        parse(&contents)
    }

    fn normalized(mut self) -> Self {
        for view in &mut self.views {
            for measure in &mut view.measures {
                measure.kind = FieldKind::Measure;
            }
        }
        self
    }

    /// Returns the view with the given name.
    pub fn view(&self, name: &str) -> Option<&ViewSpec> {
        self.views.iter().find(|v| v.name == name)
    }

    /// Returns view names in registration order.
    pub fn view_names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.name.clone()).collect()
    }

    /// Builds the cross-view field lookup.
    pub fn lookup(&self) -> FieldLookup {
        FieldLookup::build(self)
    }
}

/// Where a field lives: the views exposing a field of that name, with each
/// view's own definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLocation {
    /// Field name.
    pub name: String,
    /// View name to that view's definition, sorted by view name.
    pub views: BTreeMap<String, FieldSpec>,
}

impl FieldLocation {
    /// Returns the merge key for this field over all views exposing it.
    pub fn key(&self) -> String {
        merge_key(self.views.keys(), &self.name)
    }

    /// Returns the label from the first view defining the field.
    pub fn label(&self) -> &str {
        self.views
            .values()
            .next()
            .map_or(self.name.as_str(), FieldSpec::label)
    }

    /// Returns the view names, sorted.
    pub fn view_names(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }
}

/// `fieldName -> { viewName -> FieldSpec }`, per category, in first-seen
/// order across the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldLookup {
    /// Filterable dimensions. Time dimensions are excluded.
    pub dimensions: Vec<FieldLocation>,
    /// Measures.
    pub measures: Vec<FieldLocation>,
}

impl FieldLookup {
    fn build(catalog: &Catalog) -> Self {
        let mut lookup = Self::default();
        for view in &catalog.views {
            for dimension in view.dimensions.iter().filter(|d| !d.is_time()) {
                insert(&mut lookup.dimensions, &view.name, dimension);
            }
            for measure in &view.measures {
                insert(&mut lookup.measures, &view.name, measure);
            }
        }
        lookup
    }

    /// Looks up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&FieldLocation> {
        self.dimensions.iter().find(|l| l.name == name)
    }

    /// Looks up a measure by name.
    pub fn measure(&self, name: &str) -> Option<&FieldLocation> {
        self.measures.iter().find(|l| l.name == name)
    }

    /// Looks up a field in either category, dimensions first.
    pub fn field(&self, name: &str) -> Option<&FieldLocation> {
        self.dimension(name).or_else(|| self.measure(name))
    }

    /// Iterates every known field name.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dimensions
            .iter()
            .chain(self.measures.iter())
            .map(|l| l.name.as_str())
    }

    /// Dimensions a measure threshold over `views` may be grouped by: the
    /// union of the dimensions of those views, in first-seen order.
    pub fn grouping_dimensions(&self, views: &[String]) -> Vec<&FieldLocation> {
        self.dimensions
            .iter()
            .filter(|l| views.iter().any(|v| l.views.contains_key(v)))
            .collect()
    }
}

fn insert(locations: &mut Vec<FieldLocation>, view: &str, spec: &FieldSpec) {
    match locations.iter_mut().find(|l| l.name == spec.name) {
        Some(location) => {
            location.views.insert(view.to_string(), spec.clone());
        }
        None => locations.push(FieldLocation {
            name: spec.name.clone(),
            views: BTreeMap::from([(view.to_string(), spec.clone())]),
        }),
    }
}
