// src/core/invocation.rs

//! Defines `PendingInvocation`, the in-flight representation of one action request.

use crate::core::response::ActionResponse;
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type-erased, immutable argument value bound to an action parameter.
///
/// The exact runtime type is recorded at construction so validators can be
/// resolved through a plain `TypeId` lookup.
#[derive(Clone)]
pub struct Argument {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Argument {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the value this argument was created from.
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the value if it is exactly of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Holds the state of a single action request while it travels through the pipeline.
#[derive(Debug)]
pub struct PendingInvocation {
    request_id: u64,
    action: String,
    /// Parameter name to bound value, in declaration order. `None` marks an absent argument.
    arguments: IndexMap<String, Option<Argument>>,
    /// Set by a stage that terminates the pipeline early.
    result: Option<ActionResponse>,
    /// True while a transaction stage holds an open unit of work for this request.
    transaction_open: bool,
}

impl PendingInvocation {
    pub fn new(request_id: u64, action: impl Into<String>) -> Self {
        Self {
            request_id,
            action: action.into(),
            arguments: IndexMap::new(),
            result: None,
            transaction_open: false,
        }
    }

    /// Builder-style variant of [`PendingInvocation::bind`].
    pub fn with_argument(mut self, name: impl Into<String>, argument: Option<Argument>) -> Self {
        self.bind(name, argument);
        self
    }

    /// Binds (or rebinds) a parameter. Rebinding keeps the original position.
    pub fn bind(&mut self, name: impl Into<String>, argument: Option<Argument>) {
        self.arguments.insert(name.into(), argument);
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// All bound parameters, including absent ones, in binding order.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, Option<&Argument>)> {
        self.arguments
            .iter()
            .map(|(name, arg)| (name.as_str(), arg.as_ref()))
    }

    /// Only the parameters that carry a value.
    pub fn present_arguments(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.arguments
            .iter()
            .filter_map(|(name, arg)| arg.as_ref().map(|a| (name.as_str(), a)))
    }

    /// Returns the named argument if it is present and of type `T`.
    pub fn argument<T: Any>(&self, name: &str) -> Option<&T> {
        self.arguments
            .get(name)
            .and_then(Option::as_ref)
            .and_then(Argument::downcast_ref::<T>)
    }

    pub fn result(&self) -> Option<&ActionResponse> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, response: ActionResponse) {
        self.result = Some(response);
    }

    pub fn take_result(&mut self) -> Option<ActionResponse> {
        self.result.take()
    }

    pub fn is_transaction_open(&self) -> bool {
        self.transaction_open
    }

    pub(crate) fn set_transaction_open(&mut self, open: bool) {
        self.transaction_open = open;
    }
}
