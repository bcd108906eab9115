// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    models::question::{QUESTION_BATTERY, QuestionDefinition},
    payments::PaymentGateway,
    services::entitlement::{EntitlementManager, ReportPricing},
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub entitlements: Arc<EntitlementManager>,
    pub battery: &'static [QuestionDefinition],
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, payments: Arc<dyn PaymentGateway>, config: Config) -> Self {
        let pricing = ReportPricing {
            amount_cents: config.report_price_cents,
            currency: config.report_currency.clone(),
        };
        let entitlements = Arc::new(EntitlementManager::new(store.clone(), payments, pricing));

        Self {
            store,
            entitlements,
            battery: &QUESTION_BATTERY,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<EntitlementManager> {
    fn from_ref(state: &AppState) -> Self {
        state.entitlements.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
