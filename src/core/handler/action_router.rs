// src/core/handler/action_router.rs

//! Maps action names to their pipelines and binds raw JSON arguments into a
//! `PendingInvocation`.

use super::executor::Pipeline;
use crate::core::errors::ActionGateError;
use crate::core::invocation::{Argument, PendingInvocation};
use crate::core::response::ActionResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

type Binder = fn(&Value) -> Result<Argument, serde_json::Error>;

/// Declares one named, typed action parameter.
#[derive(Clone)]
pub struct ParamSpec {
    name: String,
    type_name: &'static str,
    binder: Binder,
}

fn bind_typed<T>(value: &Value) -> Result<Argument, serde_json::Error>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    T::deserialize(value).map(Argument::new)
}

impl ParamSpec {
    pub fn typed<T>(name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            type_name: std::any::type_name::<T>(),
            binder: bind_typed::<T>,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A registered action: its parameters and the pipeline that serves it.
pub struct ActionRoute {
    name: String,
    params: Vec<ParamSpec>,
    pipeline: Pipeline,
}

impl ActionRoute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Binds each declared parameter from a JSON object body.
    ///
    /// Missing or `null` members become absent arguments. A `null` body binds
    /// every parameter as absent.
    pub fn bind(&self, request_id: u64, body: &Value) -> Result<PendingInvocation, ActionGateError> {
        let members = match body {
            Value::Object(members) => Some(members),
            Value::Null => None,
            _ => {
                return Err(ActionGateError::ArgumentBinding {
                    name: "<body>".to_string(),
                    reason: "expected a JSON object".to_string(),
                });
            }
        };

        let mut invocation = PendingInvocation::new(request_id, self.name.clone());
        for param in &self.params {
            let raw = members
                .and_then(|m| m.get(&param.name))
                .filter(|v| !v.is_null());
            let argument = raw
                .map(|v| (param.binder)(v))
                .transpose()
                .map_err(|e| ActionGateError::ArgumentBinding {
                    name: param.name.clone(),
                    reason: e.to_string(),
                })?;
            invocation.bind(param.name.clone(), argument);
        }
        Ok(invocation)
    }
}

/// The table of actions, built once at startup.
#[derive(Default)]
pub struct ActionRouter {
    routes: HashMap<String, Arc<ActionRoute>>,
}

impl ActionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action, replacing any previous action of the same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParamSpec>,
        pipeline: Pipeline,
    ) -> &mut Self {
        let name = name.into();
        info!(
            "Registered action '{}' with stages {:?}.",
            name,
            pipeline.stage_names()
        );
        self.routes.insert(
            name.clone(),
            Arc::new(ActionRoute {
                name,
                params,
                pipeline,
            }),
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<ActionRoute>> {
        self.routes.get(name).cloned()
    }

    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Binds `body` to the named action and runs its pipeline.
    pub async fn dispatch(
        &self,
        request_id: u64,
        name: &str,
        body: &Value,
    ) -> Result<ActionResponse, ActionGateError> {
        let route = self
            .get(name)
            .ok_or_else(|| ActionGateError::UnknownAction(name.to_string()))?;
        let invocation = route.bind(request_id, body)?;
        route.pipeline.execute(invocation).await
    }
}
