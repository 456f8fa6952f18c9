// src/app/mod.rs

//! The actions served by the binary and the validators they rely on.

pub mod accounts;

use crate::config::PipelineConfig;
use crate::core::handler::{ActionHandler, ActionRouter, ParamSpec, Pipeline};
use crate::core::storage::MemoryStore;
use crate::core::unit_of_work::UnitOfWorkFactory;
use crate::core::validation::{ValidatorRegistry, ValidatorResolver};
use accounts::{
    Deposit, DepositHandler, DepositValidator, GetAccountHandler, OpenAccount,
    OpenAccountHandler, OpenAccountValidator,
};
use std::sync::Arc;

/// Builds the validator registry for every argument type the actions accept.
pub fn build_validators() -> ValidatorRegistry {
    ValidatorRegistry::new()
        .with::<OpenAccount, _>(OpenAccountValidator)
        .with::<Deposit, _>(DepositValidator)
}

/// Builds the action table, giving every action the standard pipeline over `store`.
pub fn build_router(store: MemoryStore, config: &PipelineConfig) -> ActionRouter {
    let resolver: Arc<dyn ValidatorResolver> = Arc::new(build_validators());
    let factory: Arc<dyn UnitOfWorkFactory> = Arc::new(store.clone());
    let pipeline = |handler: Arc<dyn ActionHandler>| {
        Pipeline::standard(handler, resolver.clone(), factory.clone(), config)
    };

    let mut router = ActionRouter::new();
    router
        .register(
            "open_account",
            vec![ParamSpec::typed::<OpenAccount>("account")],
            pipeline(Arc::new(OpenAccountHandler::new(store.clone())) as Arc<dyn ActionHandler>),
        )
        .register(
            "deposit",
            vec![ParamSpec::typed::<Deposit>("deposit")],
            pipeline(Arc::new(DepositHandler::new(store.clone())) as Arc<dyn ActionHandler>),
        )
        .register(
            "get_account",
            vec![ParamSpec::typed::<String>("email")],
            pipeline(Arc::new(GetAccountHandler::new(store)) as Arc<dyn ActionHandler>),
        );
    router
}
