//! Query string state holding the persisted filters.
//!
//! Each view's filter lives in an `f.<view>` parameter. A bare `f` parameter
//! is the legacy single-filter form, read as a fallback for every view and
//! dropped on the next write.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Legacy filter parameter, also the prefix of per-view parameters.
pub const FILTER_PARAM: &str = "f";

/// Set when the user explicitly cleared every filter.
pub const CLEAR_PARAM: &str = "clear";

/// Set when the view should fall back to its default filters.
pub const DEFAULT_PARAM: &str = "default";

/// Errors from query string encoding.
#[derive(Debug, Error)]
pub enum UrlError {
    /// The query string is not valid form encoding.
    #[error("invalid query string: {0}")]
    Decode(#[from] serde_urlencoded::de::Error),

    /// Parameters could not be encoded.
    #[error("failed to encode query string: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
}

/// Per-view filter text to write back: `Some(text)` sets the view's
/// parameter, `None` deletes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterUpdate {
    /// View name to new canonical text.
    pub views: BTreeMap<String, Option<String>>,
    /// Whether an empty result means "cleared" rather than "use defaults".
    pub allow_clear: bool,
}

impl FilterUpdate {
    /// Records the new text for `view`. Empty text deletes the parameter.
    pub fn set(&mut self, view: impl Into<String>, text: String) {
        let text = (!text.is_empty()).then_some(text);
        self.views.insert(view.into(), text);
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// Returns the parameter name holding `view`'s filter.
pub fn filter_param(view: &str) -> String {
    format!("{FILTER_PARAM}.{view}")
}

/// Ordered query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlState {
    params: Vec<(String, String)>,
}

impl UrlState {
    /// Parses a query string, with or without a leading `?`.
    ///
    /// # Example
    ///
    /// ```
    /// use filter_state_rs::UrlState;
    ///
    /// let url = UrlState::parse("?f.orders=country+IN+%28%27US%27%29").unwrap();
    /// assert_eq!(url.filter_text("orders"), "country IN ('US')");
    /// assert_eq!(url.filter_text("shipments"), "");
    /// ```
    pub fn parse(query: &str) -> Result<Self, UrlError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
        Ok(Self { params })
    }

    /// Encodes the parameters, without a leading `?`.
    pub fn to_query_string(&self) -> Result<String, UrlError> {
        Ok(serde_urlencoded::to_string(&self.params)?)
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `name`, replacing the first occurrence in place and dropping any
    /// others.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter().position(|(k, _)| k == name) {
            Some(index) => {
                self.params[index].1 = value;
                let mut seen = false;
                self.params.retain(|(k, _)| {
                    if k != name {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.params.push((name.to_string(), value)),
        }
    }

    /// Deletes every occurrence of `name`.
    pub fn delete(&mut self, name: &str) {
        self.params.retain(|(k, _)| k != name);
    }

    /// Parameter names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Filter text for `view`: its own parameter, else the legacy one, else
    /// empty.
    pub fn filter_text(&self, view: &str) -> &str {
        self.get(&filter_param(view))
            .or_else(|| self.get(FILTER_PARAM))
            .unwrap_or("")
    }

    /// Writes an update.
    ///
    /// `default`, `clear` and the legacy `f` parameter are always removed.
    /// If nothing is left, `clear=true` is written when the update allows
    /// clearing and `default=true` otherwise.
    pub fn apply_filter_update(&mut self, update: &FilterUpdate) {
        self.delete(DEFAULT_PARAM);
        self.delete(CLEAR_PARAM);
        self.delete(FILTER_PARAM);

        for (view, text) in &update.views {
            let name = filter_param(view);
            match text {
                Some(text) => self.set(&name, text.clone()),
                None => self.delete(&name),
            }
        }

        if self.params.is_empty() {
            let marker = if update.allow_clear {
                CLEAR_PARAM
            } else {
                DEFAULT_PARAM
            };
            self.set(marker, "true");
        }
    }

    /// Deletes every filter parameter. Writes `clear=true` if nothing is left.
    pub fn clear_filters(&mut self) {
        let prefix = format!("{FILTER_PARAM}.");
        self.params
            .retain(|(k, _)| k != FILTER_PARAM && !k.starts_with(&prefix));
        if self.params.is_empty() {
            self.set(CLEAR_PARAM, "true");
        }
    }

    /// True if the user explicitly cleared the filters.
    pub fn is_cleared(&self) -> bool {
        self.get(CLEAR_PARAM) == Some("true")
    }

    /// True if the view should show its default filters.
    pub fn wants_defaults(&self) -> bool {
        self.get(DEFAULT_PARAM) == Some("true")
    }
}
