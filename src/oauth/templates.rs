//! HTML pages served by the loopback redirect listener

use askama::Template;

#[derive(Template)]
#[template(path = "callback_success.html")]
pub struct SuccessPage;

/// Shown when the provider redirected back with an error
#[derive(Template)]
#[template(path = "callback_error.html")]
pub struct ErrorPage<'a> {
    pub error: &'a str,
    pub description: Option<&'a str>,
}

/// Shown when a redirect arrives after the login was settled
#[derive(Template)]
#[template(path = "callback_completed.html")]
pub struct CompletedPage;

#[derive(Template)]
#[template(path = "callback_not_found.html")]
pub struct NotFoundPage;
