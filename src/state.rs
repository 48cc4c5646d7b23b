use crate::{
    cache::{store_from_config, CacheService, CacheStore},
    config::Config,
    graphql::{build_schema, GatewaySchema},
    services::{ChartService, LunarCrushClient, McpService, RateLimiter},
    Result,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{sync::Arc, time::Instant};

/// Long-lived services shared by REST handlers and GraphQL resolvers
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub client: Arc<LunarCrushClient>,
    pub cache: CacheService,
    pub charts: ChartService,
    pub mcp: McpService,
    pub started_at: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub rate_limiter: RateLimiter,
    pub schema: GatewaySchema,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn from_config(config: &Config, metrics: PrometheusHandle) -> Result<Self> {
        Self::with_store(config, store_from_config(config), metrics)
    }

    /// Builds the state on top of an explicit cache store
    pub fn with_store(
        config: &Config,
        store: Arc<dyn CacheStore>,
        metrics: PrometheusHandle,
    ) -> Result<Self> {
        let client = Arc::new(LunarCrushClient::from_config(config)?);
        let cache = CacheService::new(store.clone());
        let services = Services {
            config: Arc::new(config.clone()),
            client: client.clone(),
            cache: cache.clone(),
            charts: ChartService::new(client.clone(), cache.clone()),
            mcp: McpService::new(client, cache),
            started_at: Instant::now(),
        };

        Ok(Self {
            schema: build_schema(services.clone()),
            rate_limiter: RateLimiter::new(store),
            services,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.services.config
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::{cache::MemoryCache, metrics::detached_handle};
    use axum::{Router, Server};
    use std::net::SocketAddr;

    /// Serves `app` on an ephemeral local port and returns its base URL
    pub async fn spawn_upstream(app: Router) -> String {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let server = Server::bind(&addr).serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        format!("http://{addr}")
    }

    /// State over an in-memory cache, pointed at `base_url`
    pub fn state_for(base_url: &str) -> AppState {
        let config = Config {
            lunarcrush_api_key: "upstreamkey123".to_string(),
            lunarcrush_base_url: base_url.to_string(),
            jwt_secret: "test-secret".to_string(),
            ..Default::default()
        };
        AppState::with_store(&config, Arc::new(MemoryCache::new()), detached_handle()).unwrap()
    }
}
