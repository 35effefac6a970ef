//! Administrator pages: delete snippet, admin signup.

use askama::Template;
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Redirect, Response},
};

use super::users::EMAIL_IN_USE;
use super::{Page, PageContext, render};
use crate::db::LATEST_SNIPPETS_LIMIT;
use crate::error::Result;
use crate::forms::{DeleteField, DeleteForm, Failures, SignupField, SignupForm};
use crate::models::Snippet;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Flash shown after a snippet is deleted.
pub const SNIPPET_DELETED: &str = "Your snippet was deleted successfully!";

/// Flash shown after an administrator account is created.
pub const ADMIN_SIGNUP_SUCCESS: &str =
    "Your Admin signup was successful. Please log in using your credentials.";

/// Failure shown when the ID matches no snippet.
pub const SNIPPET_NOT_FOUND: &str = "Snippet not found";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "delete.html")]
pub struct DeleteTemplate {
    pub page: PageContext,
    pub form: DeleteForm,
    pub failures: Failures<DeleteField>,
    pub snippets: Vec<Snippet>,
}

#[derive(Template)]
#[template(path = "admin_signup.html")]
pub struct AdminSignupTemplate {
    pub page: PageContext,
    pub form: SignupForm,
    pub failures: Failures<SignupField>,
}

// =============================================================================
// Delete snippet
// =============================================================================

async fn render_delete(
    state: &AppState,
    page: &Page,
    form: DeleteForm,
    failures: Failures<DeleteField>,
) -> Result<Response> {
    let snippets = state.storage().latest_snippets(LATEST_SNIPPETS_LIMIT).await?;
    render(&DeleteTemplate {
        page: page.context().await?,
        form,
        failures,
        snippets,
    })
}

/// Display the delete form alongside the latest snippets.
pub async fn delete_page(State(state): State<AppState>, page: Page) -> Result<Response> {
    render_delete(&state, &page, DeleteForm::default(), Failures::default()).await
}

/// Handle snippet deletion.
pub async fn delete(
    State(state): State<AppState>,
    page: Page,
    form: std::result::Result<Form<DeleteForm>, FormRejection>,
) -> Result<Response> {
    let Form(form) = form?;

    let id = match form.validate() {
        Ok(id) => id,
        Err(failures) => return render_delete(&state, &page, form, failures).await,
    };

    if !state.storage().delete_snippet(id).await? {
        let mut failures = Failures::default();
        failures.add(DeleteField::Id, SNIPPET_NOT_FOUND);
        return render_delete(&state, &page, form, failures).await;
    }
    tracing::info!(snippet_id = %id, "snippet deleted");

    page.admin().flash(SNIPPET_DELETED).await?;

    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Admin signup
// =============================================================================

/// Display the admin signup page.
pub async fn signup_page(page: Page) -> Result<Response> {
    render(&AdminSignupTemplate {
        page: page.context().await?,
        form: SignupForm::default(),
        failures: Failures::default(),
    })
}

/// Handle admin signup form submission.
pub async fn signup(
    State(state): State<AppState>,
    page: Page,
    form: std::result::Result<Form<SignupForm>, FormRejection>,
) -> Result<Response> {
    let Form(mut form) = form?;

    let failures = match form.validate() {
        Ok(valid) => match state
            .auth()
            .register(&valid.name, &valid.email, &valid.password, true)
            .await
        {
            Ok(id) => {
                tracing::info!(user_id = %id, "administrator account created");
                page.admin().flash(ADMIN_SIGNUP_SUCCESS).await?;
                return Ok(Redirect::to("/").into_response());
            }
            Err(AuthError::UserAlreadyExists) => {
                let mut failures = Failures::default();
                failures.add(SignupField::Email, EMAIL_IN_USE);
                failures
            }
            Err(e) => return Err(e.into()),
        },
        Err(failures) => failures,
    };

    form.password.clear();
    render(&AdminSignupTemplate {
        page: page.context().await?,
        form,
        failures,
    })
}
