//! Dimension editing commands: toggle, contains, in-list, exclude, remove.

use chrono::Utc;
use filter_expr_rs::ToggleOptions;

use super::session::{FieldRole, FilterSession};
use super::{CommandContext, Result};

/// Options for the toggle command.
#[derive(Debug)]
pub struct ToggleCommandOptions {
    pub dimension: String,
    pub values: Vec<String>,
    pub exclude: bool,
    pub exclusive: bool,
    pub keep_visible: bool,
    pub views: Vec<String>,
}

/// Options for the contains command.
#[derive(Debug)]
pub struct ContainsOptions {
    pub dimension: String,
    pub text: String,
    /// `Some(true)` for `--exclude`, `Some(false)` for `--include`.
    pub exclude: Option<bool>,
    pub views: Vec<String>,
}

/// Options for the in-list command.
#[derive(Debug)]
pub struct InListOptions {
    pub dimension: String,
    pub values: Vec<String>,
    pub views: Vec<String>,
}

/// Executes the toggle command.
pub async fn execute_toggle(ctx: &CommandContext, opts: &ToggleCommandOptions) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(&opts.dimension, FieldRole::Dimension, &opts.views)?;

    let options = ToggleOptions {
        exclude: opts.exclude,
        exclusive: opts.exclusive,
    };
    let values = session
        .manager
        .input_values(&opts.dimension, &opts.views, &opts.values);
    let update = session.manager.toggle_value(
        &opts.dimension,
        &values,
        &opts.views,
        options,
        opts.keep_visible,
        Utc::now(),
    );
    let key = session.manager.key_for(&opts.dimension, &opts.views);
    session.commit(ctx, "toggle", Some(key), update).await
}

/// Executes the contains command.
pub async fn execute_contains(ctx: &CommandContext, opts: &ContainsOptions) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(&opts.dimension, FieldRole::Dimension, &opts.views)?;

    let update =
        session
            .manager
            .apply_contains_mode(&opts.dimension, &opts.text, opts.exclude, &opts.views);
    let key = session.manager.key_for(&opts.dimension, &opts.views);
    session.commit(ctx, "contains", Some(key), update).await
}

/// Executes the in-list command.
pub async fn execute_in_list(ctx: &CommandContext, opts: &InListOptions) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(&opts.dimension, FieldRole::Dimension, &opts.views)?;

    let values = session
        .manager
        .input_values(&opts.dimension, &opts.views, &opts.values);
    let update = session
        .manager
        .apply_in_list_mode(&opts.dimension, &values, &opts.views);
    let key = session.manager.key_for(&opts.dimension, &opts.views);
    session.commit(ctx, "in-list", Some(key), update).await
}

/// Executes the exclude command.
pub async fn execute_exclude(ctx: &CommandContext, dimension: &str, views: &[String]) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(dimension, FieldRole::Dimension, views)?;

    let update = session.manager.toggle_exclude_mode(dimension, views);
    let key = session.manager.key_for(dimension, views);
    session.commit(ctx, "exclude", Some(key), update).await
}

/// Executes the remove command. Measures lose their threshold, dimensions
/// their filter; either way the field is unpinned.
pub async fn execute_remove(ctx: &CommandContext, field: &str, views: &[String]) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(field, FieldRole::Any, views)?;

    let key = session.manager.key_for(field, views);
    let is_measure = session.manager.lookup().dimension(field).is_none();
    let update = if is_measure {
        session.manager.remove_threshold(field, views)
    } else {
        session.manager.remove_filter(field, views)
    };
    session.commit(ctx, "remove", Some(key), update).await
}
