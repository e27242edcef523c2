//! The persisted filter session shared by every editing command.
//!
//! A session is the query string holding each view's filter plus the pinned
//! and temporary key sets. Commands open it, run one action through the
//! [`FilterManager`], write the resulting update into the query string and
//! save it back.

use chrono::Utc;
use filter_state_rs::{
    find_similar_name, format_not_found_error, Catalog, FilterManager, FilterUpdate, Session,
    SessionStore, UrlState,
};
use tracing::{debug, warn};

use super::config::load_config;
use super::{CommandContext, CommandError, Result};
use crate::output::{format_action_json, format_action_table, ActionResult};

/// Which side of the catalog a field must come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Dimension,
    Measure,
    Any,
}

/// An open session: catalog, manager and query string.
pub struct FilterSession {
    pub manager: FilterManager,
    pub url: UrlState,
    store: SessionStore,
    session: Session,
}

impl FilterSession {
    /// Loads the catalog and the saved session, then replays the saved
    /// query string into the manager.
    ///
    /// A first run, or a query string asking for defaults, starts from the
    /// catalog's default filters.
    pub async fn open(ctx: &CommandContext) -> Result<Self> {
        let config = load_config()?;
        let catalog_path = ctx.catalog.clone().or(config.catalog).ok_or_else(|| {
            CommandError::Config(
                "No catalog configured. Pass --catalog, set FX_CATALOG, or run 'fx config set catalog <path>'"
                    .to_string(),
            )
        })?;
        let catalog = Catalog::load(&catalog_path)?;
        debug!(path = %catalog_path.display(), views = catalog.views.len(), "catalog loaded");

        let store = match &ctx.session {
            Some(path) => SessionStore::with_path(path.clone()),
            None => SessionStore::new()?,
        };
        let session = store.load().await?;

        let mut url = UrlState::parse(&session.query)?;
        if (session.is_new() && url.is_empty()) || url.wants_defaults() {
            url.apply_filter_update(&default_update(&catalog));
        }

        let mut manager = FilterManager::new(catalog, &config.pinned);
        if !session.is_new() {
            manager.restore_keys(session.pinned.clone(), session.temporary.clone());
        }

        let mut opened = Self {
            manager,
            url,
            store,
            session,
        };
        opened.replay(ctx);
        Ok(opened)
    }

    /// Feeds the query string to the manager, reporting views whose text
    /// does not parse.
    fn replay(&mut self, ctx: &CommandContext) {
        for (view, error) in self.manager.on_url_change(&self.url) {
            warn!(view = %view, error = %error, "dropping invalid filter");
            if !ctx.quiet && !ctx.json_output {
                eprintln!("Warning: filter for view '{view}' ignored: {error}");
            }
        }
    }

    /// Replaces the query string and replays it.
    pub fn load_query(&mut self, ctx: &CommandContext, query: &str) -> Result<()> {
        let mut url = UrlState::parse(query)?;
        if url.wants_defaults() {
            url.apply_filter_update(&default_update(self.manager.catalog()));
        }
        self.url = url;
        self.replay(ctx);
        Ok(())
    }

    /// Writes an action's update into the query string.
    pub fn apply(&mut self, update: &FilterUpdate) {
        self.url.apply_filter_update(update);
    }

    /// Saves the query string and key sets.
    pub async fn save(&mut self) -> Result<()> {
        self.session.query = self.url.to_query_string()?;
        self.session.pinned = self.manager.pinned().iter().map(str::to_string).collect();
        self.session.temporary = self.manager.temporary().iter().map(str::to_string).collect();
        self.session.updated_at = Some(Utc::now());
        self.store.save(&self.session).await?;
        debug!(path = %self.store.path().display(), "session saved");
        Ok(())
    }

    /// Applies an action's update, saves the session and prints what
    /// changed.
    pub async fn commit(
        &mut self,
        ctx: &CommandContext,
        action: &str,
        key: Option<String>,
        update: FilterUpdate,
    ) -> Result<()> {
        self.apply(&update);
        self.save().await?;

        let query = self.url.to_query_string()?;
        let result = ActionResult {
            action,
            key,
            update: &update,
            query: &query,
        };
        if ctx.json_output {
            println!("{}", format_action_json(&result)?);
        } else if !ctx.quiet {
            print!("{}", format_action_table(&result, ctx.use_colors));
        }
        Ok(())
    }

    /// Checks that `field` exists with the given role and that every
    /// explicit view exposes it.
    pub fn check_field(&self, field: &str, role: FieldRole, views: &[String]) -> Result<()> {
        let lookup = self.manager.lookup();
        let (location, resource) = match role {
            FieldRole::Dimension => (lookup.dimension(field), "Dimension"),
            FieldRole::Measure => (lookup.measure(field), "Measure"),
            FieldRole::Any => (lookup.field(field), "Field"),
        };
        let Some(location) = location else {
            let candidates: Vec<&str> = match role {
                FieldRole::Dimension => lookup.dimensions.iter().map(|l| l.name.as_str()).collect(),
                FieldRole::Measure => lookup.measures.iter().map(|l| l.name.as_str()).collect(),
                FieldRole::Any => lookup.names().collect(),
            };
            let suggestion = find_similar_name(field, candidates.into_iter());
            return Err(CommandError::NotFound(format_not_found_error(
                resource,
                field,
                suggestion.as_deref(),
            )));
        };

        for view in views {
            if !location.views.contains_key(view) {
                let suggestion = find_similar_name(view, location.views.keys().map(String::as_str));
                return Err(CommandError::NotFound(format!(
                    "{} (field '{}' is defined in: {})",
                    format_not_found_error("View", view, suggestion.as_deref()),
                    field,
                    location.view_names().join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// The catalog's default filters as an update.
fn default_update(catalog: &Catalog) -> FilterUpdate {
    let mut update = FilterUpdate::default();
    for view in &catalog.views {
        if let Some(text) = &view.default_filter {
            update.set(view.name.clone(), text.clone());
        }
    }
    update
}
