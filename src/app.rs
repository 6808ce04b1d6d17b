//! Shared application state, built once at startup and cloned into every
//! spawned task — the same shape the teacher's `Context` follows, adapted to
//! this gateway's dependencies instead of Discord's.
#![allow(dead_code)]

use std::sync::Arc;

use crate::catalog::{Catalog, CatalogHandle};
use crate::config::ConfigManager;
use crate::model::AppConfig;
use crate::outbound::OutboundPool;
use crate::router::Router;
use crate::store::{AuditSink, InMemoryAuditSink, InMemoryUserStore, UserStore};
use crate::utils::prelude::*;

/// Everything the running gateway needs, wired once and shared by `Arc`/
/// `Clone` into every inbound client task and every outbound connection
/// task.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<ConfigManager>,
    pub catalog: Arc<CatalogHandle>,
    pub outbound: Arc<OutboundPool>,
    pub users: Arc<dyn UserStore>,
    pub audit: Arc<dyn AuditSink>,
    pub router: Arc<Router>,
}

impl Context {
    /// Load configuration, build the initial catalog snapshot, and connect
    /// every configured outbound link.
    pub async fn bootstrap(config_path: impl Into<std::path::PathBuf>) -> AnyResult<Self> {
        let config_manager = Arc::new(ConfigManager::new(config_path));
        let config = config_manager
            .load()
            .context("failed to load configuration")?;

        let catalog = Catalog::rebuild(&config).context("failed to build catalog")?;
        let catalog_handle = Arc::new(CatalogHandle::new(catalog));

        let outbound = Arc::new(OutboundPool::new());
        for conn_cfg in &config.connections {
            outbound.add(conn_cfg.clone()).await;
        }

        let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let audit: Arc<dyn AuditSink> = Arc::new(InMemoryAuditSink::default());

        let router = Arc::new(Router::new(
            Arc::clone(&catalog_handle),
            Arc::clone(&outbound),
            Arc::clone(&users),
            Arc::clone(&config_manager),
        ));

        Ok(Self {
            config: config_manager,
            catalog: catalog_handle,
            outbound,
            users,
            audit,
            router,
        })
    }

    pub fn server_addr(&self, config: &AppConfig) -> String {
        format!("{}:{}", config.server.host, config.server.port)
    }
}
