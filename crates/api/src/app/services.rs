//! Service wiring: pick a store, build the token service, bootstrap the admin.

use std::sync::Arc;

use bazaar_auth::Hs256TokenService;
use bazaar_infra::{InMemoryStore, Marketplace, PostgresStore, ServiceError, Store};

use crate::config::{AppConfig, Persistence};

/// Connect the configured store and wrap it in a [`Marketplace`].
pub async fn build_services(config: &AppConfig) -> Result<Marketplace, ServiceError> {
    let store: Arc<dyn Store> = match &config.persistence {
        Persistence::InMemory => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
        Persistence::Postgres { url } => {
            tracing::info!("using postgres store");
            Arc::new(PostgresStore::connect(url).await?)
        }
    };

    let market = with_store(store, config);

    if let Some(admin) = &config.bootstrap_admin {
        market
            .ensure_admin(&admin.name, &admin.email, &admin.password)
            .await?;
    }

    Ok(market)
}

pub fn with_store(store: Arc<dyn Store>, config: &AppConfig) -> Marketplace {
    let tokens = Arc::new(Hs256TokenService::new(
        config.jwt_secret.as_bytes(),
        config.jwt_ttl,
    ));
    Marketplace::new(store, tokens)
}
