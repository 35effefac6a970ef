//! User account pages: signup, login, logout.

use askama::Template;
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Redirect, Response},
};

use super::{Page, PageContext, render};
use crate::error::Result;
use crate::forms::{Failures, LoginField, LoginForm, SignupField, SignupForm};
use crate::services::auth::{AuthError, IdentityResolution};
use crate::state::AppState;

/// Flash shown on the login page after a successful signup.
pub const SIGNUP_SUCCESS: &str =
    "Your signup was successful. Please log in using your credentials.";

/// Failure shown when no account matches the submitted credentials.
pub const INVALID_CREDENTIALS: &str = "Email or Password is incorrect";

/// Failure shown when the email is already registered.
pub const EMAIL_IN_USE: &str = "Address is already in use";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
    pub form: SignupForm,
    pub failures: Failures<SignupField>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub form: LoginForm,
    pub failures: Failures<LoginField>,
}

// =============================================================================
// Signup
// =============================================================================

/// Display the signup page.
pub async fn signup_page(page: Page) -> Result<Response> {
    render(&SignupTemplate {
        page: page.context().await?,
        form: SignupForm::default(),
        failures: Failures::default(),
    })
}

/// Handle signup form submission.
pub async fn signup(
    State(state): State<AppState>,
    page: Page,
    form: std::result::Result<Form<SignupForm>, FormRejection>,
) -> Result<Response> {
    let Form(form) = form?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(failures) => return rerender_signup(&page, form, failures).await,
    };

    match state
        .auth()
        .register(&valid.name, &valid.email, &valid.password, false)
        .await
    {
        Ok(id) => tracing::info!(user_id = %id, "user signed up"),
        Err(AuthError::UserAlreadyExists) => {
            let mut failures = Failures::default();
            failures.add(SignupField::Email, EMAIL_IN_USE);
            return rerender_signup(&page, form, failures).await;
        }
        Err(e) => return Err(e.into()),
    }

    page.user().flash(SIGNUP_SUCCESS).await?;

    Ok(Redirect::to("/user/login").into_response())
}

async fn rerender_signup(
    page: &Page,
    mut form: SignupForm,
    failures: Failures<SignupField>,
) -> Result<Response> {
    form.password.clear();
    render(&SignupTemplate {
        page: page.context().await?,
        form,
        failures,
    })
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
pub async fn login_page(page: Page) -> Result<Response> {
    render(&LoginTemplate {
        page: page.context().await?,
        form: LoginForm::default(),
        failures: Failures::default(),
    })
}

/// Handle login form submission.
///
/// A user match sets the user scope marker, an admin match sets the admin
/// scope marker. Exactly one scope is written per login.
pub async fn login(
    State(state): State<AppState>,
    page: Page,
    form: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<Response> {
    let Form(mut form) = form?;

    if let Err(failures) = form.validate() {
        form.password.clear();
        return render(&LoginTemplate {
            page: page.context().await?,
            form,
            failures,
        });
    }

    match state.auth().resolve(&form.email, &form.password).await? {
        IdentityResolution::User(id) => {
            page.user().log_in(id).await?;
            tracing::info!(user_id = %id, "user logged in");
            Ok(Redirect::to("/snippet/new").into_response())
        }
        IdentityResolution::Admin(id) => {
            page.admin().log_in(id).await?;
            tracing::info!(user_id = %id, "administrator logged in");
            Ok(Redirect::to("/").into_response())
        }
        IdentityResolution::NoMatch => {
            tracing::info!("login rejected: invalid credentials");
            let mut failures = Failures::default();
            failures.add(LoginField::Generic, INVALID_CREDENTIALS);
            form.password.clear();
            render(&LoginTemplate {
                page: page.context().await?,
                form,
                failures,
            })
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout. Only the user scope marker is removed.
pub async fn logout(page: Page) -> Result<Response> {
    page.user().log_out().await?;
    Ok(Redirect::to("/").into_response())
}
