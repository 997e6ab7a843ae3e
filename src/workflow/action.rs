//! Path actions and parameter contracts
//!
//! Each action declares the parameters it consumes. The pipeline validates
//! presence before invocation; value types are checked at read time through
//! the typed accessors on [`ActionArgs`], not eagerly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::engine::{StateTransition, Stateful};
use super::error::WorkflowError;
use crate::persistence::Transaction;
use crate::session::Session;

/// Declared value kind for an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Decimal,
    Bool,
    Object,
}

/// One named parameter an action consumes.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub key: &'static str,
    pub required: bool,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn required(key: &'static str, kind: ParamKind) -> Self {
        Self {
            key,
            required: true,
            kind,
        }
    }

    pub fn optional(key: &'static str, kind: ParamKind) -> Self {
        Self {
            key,
            required: false,
            kind,
        }
    }
}

/// Arguments map for one traversal.
#[derive(Debug, Clone, Default)]
pub struct ActionArgs {
    values: HashMap<String, Value>,
}

impl ActionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Presence check against an action's declared specs.
    pub fn check(&self, specs: &[ParamSpec]) -> Result<(), WorkflowError> {
        for spec in specs {
            if spec.required && !self.values.contains_key(spec.key) {
                return Err(WorkflowError::MissingParameter {
                    key: spec.key.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn require(&self, key: &str) -> Result<&Value, WorkflowError> {
        self.values
            .get(key)
            .ok_or_else(|| WorkflowError::MissingParameter {
                key: key.to_string(),
            })
    }

    pub fn str(&self, key: &str) -> Result<&str, WorkflowError> {
        self.require(key)?
            .as_str()
            .ok_or(WorkflowError::ParameterType {
                key: key.to_string(),
                expected: "string",
            })
    }

    pub fn i64(&self, key: &str) -> Result<i64, WorkflowError> {
        self.require(key)?
            .as_i64()
            .ok_or(WorkflowError::ParameterType {
                key: key.to_string(),
                expected: "integer",
            })
    }

    pub fn bool(&self, key: &str) -> Result<bool, WorkflowError> {
        self.require(key)?
            .as_bool()
            .ok_or(WorkflowError::ParameterType {
                key: key.to_string(),
                expected: "bool",
            })
    }

    /// Decimals travel as strings to keep exact precision on the wire.
    pub fn decimal(&self, key: &str) -> Result<Decimal, WorkflowError> {
        self.str(key)?
            .parse::<Decimal>()
            .map_err(|_| WorkflowError::ParameterType {
                key: key.to_string(),
                expected: "decimal string",
            })
    }

    /// Decode a structured parameter into `T`.
    pub fn object<T: DeserializeOwned>(&self, key: &str) -> Result<T, WorkflowError> {
        serde_json::from_value(self.require(key)?.clone()).map_err(|_| {
            WorkflowError::ParameterType {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            }
        })
    }
}

/// Scratch values shared by the actions of one traversal.
///
/// Lets an early action compute something a later action consumes. Scoped to
/// a single traversal and discarded afterward.
#[derive(Debug, Default)]
pub struct SharedContext {
    values: HashMap<String, Value>,
}

impl SharedContext {
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Everything an action sees during one traversal.
pub struct ActionContext<'a> {
    pub session: &'a Session,
    pub tx: &'a mut Transaction,
    pub stateful: &'a mut dyn Stateful,
    pub transition: &'a mut StateTransition,
    pub args: &'a ActionArgs,
    pub shared: &'a mut SharedContext,
}

/// A configured side effect on a state path.
#[async_trait]
pub trait PathAction: Send + Sync {
    /// Registry name; what paths reference in `pre_actions`/`post_actions`.
    fn name(&self) -> &'static str;

    fn parameter_specs(&self) -> Vec<ParamSpec>;

    async fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<(), WorkflowError>;
}

/// Name -> action lookup for the traversal pipeline.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<&'static str, Arc<dyn PathAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: Arc<dyn PathAction>) {
        self.actions.insert(action.name(), action);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn PathAction>, WorkflowError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownAction(name.to_string()))
    }
}
