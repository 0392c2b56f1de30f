// crates/server/src/tools.rs
//! Name-addressed tools and URI-addressed resources.
//!
//! A small synchronous registry: tools take JSON arguments and return a JSON
//! value, resources are `scheme://{param}` templates rendered to text. It
//! shares the process with the job system but nothing in the job path
//! depends on it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },
}

type ToolFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;
type ResourceFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Metadata advertised for a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Metadata advertised for a resource template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub uri_template: String,
    pub description: String,
}

struct Tool {
    spec: ToolSpec,
    call: ToolFn,
}

struct Resource {
    spec: ResourceSpec,
    scheme: String,
    render: ResourceFn,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Tool>,
    resources: BTreeMap<String, Resource>,
}

#[derive(Debug, Deserialize)]
struct BinaryArgs {
    a: i64,
    b: i64,
}

fn binary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "a": { "type": "integer" },
            "b": { "type": "integer" }
        },
        "required": ["a", "b"]
    })
}

fn binary_op(args: &Value, op: fn(i64, i64) -> Option<i64>) -> Result<Value, String> {
    let args: BinaryArgs = serde_json::from_value(args.clone()).map_err(|e| e.to_string())?;
    op(args.a, args.b)
        .map(Value::from)
        .ok_or_else(|| "integer overflow".to_string())
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `add`, `subtract`, `greeting://` and `farewell://`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_tool("add", "Add two numbers", binary_schema(), |args| {
            binary_op(args, i64::checked_add)
        });
        registry.register_tool("subtract", "Subtract two numbers", binary_schema(), |args| {
            binary_op(args, i64::checked_sub)
        });
        registry.register_resource("greeting://{name}", "Get a personalized greeting", |name| {
            format!("Hello, {name}!")
        });
        registry.register_resource("farewell://{name}", "Get a personalized farewell", |name| {
            format!("Goodbye, {name}! See you later!")
        });
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register_tool<F>(&mut self, name: &str, description: &str, input_schema: Value, call: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let spec = ToolSpec {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        };
        self.tools.insert(
            name.to_string(),
            Tool {
                spec,
                call: Arc::new(call),
            },
        );
    }

    /// Register a `scheme://{param}` resource template, keyed by scheme.
    pub fn register_resource<F>(&mut self, uri_template: &str, description: &str, render: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let scheme = uri_template
            .split_once("://")
            .map_or(uri_template, |(scheme, _)| scheme)
            .to_string();
        let spec = ResourceSpec {
            uri_template: uri_template.to_string(),
            description: description.to_string(),
        };
        self.resources.insert(
            scheme.clone(),
            Resource {
                spec,
                scheme,
                render: Arc::new(render),
            },
        );
    }

    pub fn tools(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec.clone()).collect()
    }

    pub fn resources(&self) -> Vec<ResourceSpec> {
        self.resources.values().map(|r| r.spec.clone()).collect()
    }

    pub fn invoke(&self, name: &str, args: &Value) -> Result<Value, InvokeError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| InvokeError::UnknownTool(name.to_string()))?;
        tracing::debug!(tool = name, "Invoking tool");
        (tool.call)(args).map_err(|message| InvokeError::InvalidArguments {
            tool: name.to_string(),
            message,
        })
    }

    pub fn read(&self, uri: &str) -> Result<String, InvokeError> {
        let unknown = || InvokeError::UnknownResource(uri.to_string());
        let (scheme, param) = uri.split_once("://").ok_or_else(unknown)?;
        let resource = self.resources.get(scheme).ok_or_else(unknown)?;
        if param.is_empty() {
            return Err(InvokeError::InvalidArguments {
                tool: resource.scheme.clone(),
                message: "missing resource parameter".to_string(),
            });
        }
        Ok((resource.render)(param))
    }
}
