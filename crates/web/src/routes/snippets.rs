//! Snippet pages: home listing, show, create.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use snippetbox_core::SnippetId;

use super::{Page, PageContext, render};
use crate::db::LATEST_SNIPPETS_LIMIT;
use crate::error::{AppError, Result};
use crate::forms::{Failures, NewSnippetField, NewSnippetForm};
use crate::models::{NewSnippet, Snippet};
use crate::state::AppState;

/// Flash shown after a snippet is created.
pub const SNIPPET_SAVED: &str = "Your snippet was saved successfully!";

/// Lifetime preselected on an empty form, in seconds.
const DEFAULT_EXPIRES: &str = "31536000";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub snippets: Vec<Snippet>,
}

#[derive(Template)]
#[template(path = "show.html")]
pub struct ShowTemplate {
    pub page: PageContext,
    pub snippet: Snippet,
}

#[derive(Template)]
#[template(path = "new.html")]
pub struct NewSnippetTemplate {
    pub page: PageContext,
    pub form: NewSnippetForm,
    pub failures: Failures<NewSnippetField>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the latest unexpired snippets.
pub async fn home(State(state): State<AppState>, page: Page) -> Result<Response> {
    let snippets = state.storage().latest_snippets(LATEST_SNIPPETS_LIMIT).await?;

    render(&HomeTemplate {
        page: page.context().await?,
        snippets,
    })
}

/// Display one snippet.
///
/// Anything but a positive integer ID is a 404 without a storage lookup.
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    Path(raw_id): Path<String>,
) -> Result<Response> {
    let id: SnippetId = raw_id
        .parse()
        .map_err(|_| AppError::NotFound(format!("snippet {raw_id}")))?;

    let snippet = state
        .storage()
        .get_snippet(id)
        .await?
        .filter(|snippet| !snippet.is_expired_at(Utc::now()))
        .ok_or_else(|| AppError::NotFound(format!("snippet {id}")))?;

    render(&ShowTemplate {
        page: page.context().await?,
        snippet,
    })
}

/// Display the new snippet form.
pub async fn new_page(page: Page) -> Result<Response> {
    render(&NewSnippetTemplate {
        page: page.context().await?,
        form: NewSnippetForm {
            expires: DEFAULT_EXPIRES.to_owned(),
            ..NewSnippetForm::default()
        },
        failures: Failures::default(),
    })
}

/// Handle new snippet submission.
pub async fn create(
    State(state): State<AppState>,
    page: Page,
    form: std::result::Result<Form<NewSnippetForm>, FormRejection>,
) -> Result<Response> {
    let Form(form) = form?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(failures) => {
            return render(&NewSnippetTemplate {
                page: page.context().await?,
                form,
                failures,
            });
        }
    };

    let snippet = NewSnippet::new(
        valid.title,
        valid.content,
        Utc::now(),
        valid.lifetime.seconds(),
    );
    let id = state.storage().insert_snippet(&snippet).await?;
    tracing::info!(snippet_id = %id, "snippet created");

    page.user().flash(SNIPPET_SAVED).await?;

    Ok(Redirect::to(&format!("/snippet/{id}")).into_response())
}
