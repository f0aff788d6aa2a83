//! Demo application: the home controller and its web routes.

use octane_core::{
    AppContext, Content, Handler, LoggingMiddleware, Middleware, Request, Response, Result,
    RouteTable, RuleSpec, Rules,
};
use std::sync::Arc;

const HOME_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{name}</title></head>
<body>
    <h1>{name}</h1>
    <p><a href="/test-validation">Try the validation form</a></p>
</body>
</html>
"#;

const VALIDATION_FORM: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Validation</title></head>
<body>
<form action="/test-validation" method="post">
    <label for="name">Name</label>
    <input type="text" id="name" name="name" placeholder="Your name">
    <label for="email">Email</label>
    <input type="email" id="email" name="email" placeholder="Your email">
    <label for="password">Password</label>
    <input type="password" id="password" name="password" placeholder="Your password">
    <label for="password_confirmation">Password Confirm</label>
    <input type="password" id="password_confirmation" name="password_confirmation" placeholder="Your password">
    <button type="submit">Submit</button>
</form>
</body>
</html>
"#;

/// Pages of the demo site
#[derive(Debug, Default)]
pub struct HomeController;

#[allow(clippy::unused_self, clippy::unnecessary_wraps)]
impl HomeController {
    /// Landing page
    pub fn index(&self, _req: &mut Request, ctx: &AppContext) -> Result<Content> {
        Ok(Content::html(HOME_PAGE.replace("{name}", &ctx.config().name)))
    }

    /// Registration form
    pub fn test_validation(&self, _req: &mut Request, _ctx: &AppContext) -> Result<Content> {
        Ok(Content::html(VALIDATION_FORM))
    }

    /// Validate the submitted form
    ///
    /// Responds 422 with the per-field messages when any rule fails.
    pub fn store_validation(&self, req: &mut Request, ctx: &AppContext) -> Result<Response> {
        let confirmation = req
            .input_str("password_confirmation")
            .unwrap_or_default()
            .to_string();

        let rules = Rules::new()
            .field("name", ["required", "min:5", "max:10"])
            .field("email", ["required", "email"])
            .field(
                "password",
                [
                    RuleSpec::parse("required"),
                    RuleSpec::parse("have_numbers"),
                    RuleSpec::parse("uppercase"),
                    RuleSpec::parse("min:8"),
                    RuleSpec::parse("have_numbers"),
                    RuleSpec::parse("special"),
                    RuleSpec::new("confirm", [confirmation]),
                ],
            );

        let errors = req.validate(ctx.validator(), &rules)?;
        if !errors.is_empty() {
            return Ok(Response::from(serde_json::to_value(&errors)?).with_status(422));
        }

        Ok(Response::from(serde_json::json!({
            "message": "Validation passed",
            "name": req.input_str("name"),
        })))
    }
}

/// Routes of the demo site
pub fn web_routes() -> RouteTable {
    let mut routes = RouteTable::new();

    routes
        .get(
            "/",
            Handler::action::<HomeController, _, _>("index", HomeController::index),
        )
        .middleware([Arc::new(LoggingMiddleware::new()) as Arc<dyn Middleware>])
        .name("home");

    routes
        .get(
            "/test-validation",
            Handler::action::<HomeController, _, _>(
                "testValidation",
                HomeController::test_validation,
            ),
        )
        .name("test-validation");

    routes
        .post(
            "/test-validation",
            Handler::action::<HomeController, _, _>(
                "storeValidation",
                HomeController::store_validation,
            ),
        )
        .name("test.store");

    routes
}
