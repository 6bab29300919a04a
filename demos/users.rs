//! Users Worker - user registration behind a dispatch context.
//!
//! This example demonstrates:
//! - Registering controllers with a `DispatchContext`
//! - Preparing parameters with `ParameterSet` and a schema
//! - Symbolic failures turning into `{"error": {...}}` responses
//!
//! Reads one JSON request per line from stdin and writes one JSON
//! response per line to stdout:
//!
//! ```text
//! $ cargo run --example users
//! {"route": "user.create", "params": {"firstName": "bob", "lastName": "smith", "email": "a@b.com", "password": "ab"}}
//! {"error":{"code":"api.paramInvalid","message":"\"password\" with value \"ab\" fails to match the required pattern: /\\w{6,128}/"}}
//! ```

use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use dispatchkit::params::{clean_proper_name, ObjectSchema, ParameterSet, Schema, StringRule};
use dispatchkit::writer::spawn_json_writer_default;
use dispatchkit::{Controller, DispatchContext, Request, Response, SymbolicError};

fn create_schema() -> Result<Arc<dyn Schema>, Box<dyn std::error::Error>> {
    let schema = ObjectSchema::new()
        .field("firstName", StringRule::new().alphanum().max(30).required())
        .field("lastName", StringRule::new().alphanum().max(30).required())
        .field("email", StringRule::new().email().required())
        .field("password", StringRule::new().pattern(Regex::new(r"\w{6,128}")?).required())
        .build()?;
    Ok(Arc::new(schema))
}

fn user_controller(schema: Arc<dyn Schema>) -> Controller {
    Controller::new("user").action("create", move |req, res| {
        let schema = schema.clone();
        async move {
            let mut params = ParameterSet::new(&req, Some(schema));
            params
                .delete("id")
                .try_apply(&["firstName", "lastName"], clean_proper_name)?
                .validate()?;

            // Persistence lives elsewhere; echo what would be stored.
            res.json(&params.get_all()).await
        }
    })
}

fn auth_controller() -> Controller {
    Controller::new("auth")
        .with_value("_config", json!({"actions": false, "shortcuts": false, "rest": false}))
        .action("login", |_req, res| async move {
            res.json(&json!({"todo": "login() is not implemented yet!"})).await
        })
}

/// Split `"controller.action"` and find the controller.
fn route<'a>(controllers: &'a [Controller], target: &str) -> Option<(&'a Controller, String)> {
    let (name, action) = target.split_once('.')?;
    let controller = controllers.iter().find(|c| c.name() == name)?;
    Some((controller, action.to_string()))
}

/// Parse one request line into a route and its parameters.
///
/// The line must be a JSON object with a `params` object; anything else is
/// answered with `request.malformed`.
fn parse_line(line: &str) -> Result<(String, Request), SymbolicError> {
    let envelope: Value = serde_json::from_str(line)
        .map_err(|e| SymbolicError::chained("request.malformed", e.to_string(), e))?;
    let Value::Object(mut envelope) = envelope else {
        return Err(SymbolicError::new("request.malformed", "expected a JSON object"));
    };

    let target = envelope
        .get("route")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let Some(Value::Object(params)) = envelope.remove("params") else {
        return Err(SymbolicError::new("request.malformed", "missing \"params\" object"));
    };

    Ok((target, Request::from_params(params)))
}

async fn handle_line(controllers: &[Controller], res: Response, line: &str) -> dispatchkit::Result<()> {
    let (target, req) = parse_line(line)?;

    let Some((controller, action)) = route(controllers, &target) else {
        return Err(SymbolicError::new("route.notFound", format!("no route for '{}'", target)).into());
    };

    controller.invoke(&action, req, res).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries responses; logs go to stderr.
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let dispatch = DispatchContext::builder().log_reported_errors(true).build();
    let controllers = vec![
        dispatch.register(user_controller(create_schema()?)),
        dispatch.register(auth_controller()),
    ];

    let (writer, writer_task) = spawn_json_writer_default(tokio::io::stdout());
    let res = Response::with_sink(Arc::new(writer));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        // Failures outside a handler (bad envelope, unknown route) go
        // through the same reporting path.
        if let Err(err) = handle_line(&controllers, res.clone(), &line).await {
            dispatch.report_error(&res, err).await?;
        }
    }

    drop(res);
    writer_task.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let (target, req) = parse_line(r#"{"route": "auth.login", "params": {"a": 1}}"#).unwrap();
        assert_eq!(target, "auth.login");
        assert_eq!(req.param("a"), Some(&json!(1)));
    }

    #[test]
    fn test_parse_line_rejects_non_objects() {
        for line in ["[1,2]", "42", "\"x\"", "{not json", r#"{"route": "a.b"}"#, r#"{"params": [1]}"#] {
            let err = parse_line(line).unwrap_err();
            assert_eq!(err.code(), "request.malformed", "{}", line);
        }
    }
}
