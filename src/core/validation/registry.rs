// src/core/validation/registry.rs

use super::verdict::ValidationVerdict;
use crate::core::errors::ActionGateError;
use crate::core::invocation::Argument;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Validates instances of one concrete type.
///
/// Returning `None` means the validator has no opinion, which counts as valid.
pub trait Validator<T>: Send + Sync {
    fn validate(&self, instance: &T) -> Option<ValidationVerdict>;
}

/// A validator with its target type erased, as stored in a resolver.
pub trait ErasedValidator: Send + Sync {
    fn validate_argument(&self, argument: &Argument) -> Option<ValidationVerdict>;

    fn target_type(&self) -> &'static str;
}

/// Looks up the validator for an argument's exact runtime type.
pub trait ValidatorResolver: Send + Sync {
    fn resolve(
        &self,
        argument: &Argument,
    ) -> Result<Option<Arc<dyn ErasedValidator>>, ActionGateError>;
}

struct TypedValidator<T, V> {
    validator: V,
    _target: PhantomData<fn(&T)>,
}

impl<T, V> ErasedValidator for TypedValidator<T, V>
where
    T: Any + Send + Sync,
    V: Validator<T>,
{
    fn validate_argument(&self, argument: &Argument) -> Option<ValidationVerdict> {
        argument
            .downcast_ref::<T>()
            .and_then(|instance| self.validator.validate(instance))
    }

    fn target_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

struct FnValidator<F>(F);

impl<T, F> Validator<T> for FnValidator<F>
where
    F: Fn(&T) -> Option<ValidationVerdict> + Send + Sync,
{
    fn validate(&self, instance: &T) -> Option<ValidationVerdict> {
        (self.0)(instance)
    }
}

/// A `TypeId`-keyed set of validators, populated at startup.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, Arc<dyn ErasedValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `validator` for arguments of type `T`, replacing any previous one.
    pub fn register<T, V>(&mut self, validator: V) -> &mut Self
    where
        T: Any + Send + Sync,
        V: Validator<T> + 'static,
    {
        let erased: Arc<dyn ErasedValidator> = Arc::new(TypedValidator {
            validator,
            _target: PhantomData,
        });
        if self
            .validators
            .insert(TypeId::of::<T>(), erased)
            .is_some()
        {
            debug!(
                "Replaced validator for type {}.",
                std::any::type_name::<T>()
            );
        }
        self
    }

    /// Registers a closure as the validator for type `T`.
    pub fn register_fn<T, F>(&mut self, validate: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Option<ValidationVerdict> + Send + Sync + 'static,
    {
        self.register::<T, _>(FnValidator(validate))
    }

    /// Builder-style variant of [`ValidatorRegistry::register`].
    pub fn with<T, V>(mut self, validator: V) -> Self
    where
        T: Any + Send + Sync,
        V: Validator<T> + 'static,
    {
        self.register::<T, V>(validator);
        self
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.validators.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl ValidatorResolver for ValidatorRegistry {
    fn resolve(
        &self,
        argument: &Argument,
    ) -> Result<Option<Arc<dyn ErasedValidator>>, ActionGateError> {
        Ok(self.validators.get(&argument.value_type_id()).cloned())
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.validators.values().map(|v| v.target_type()))
            .finish()
    }
}
