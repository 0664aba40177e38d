//! Builds engines from configuration.

use anyhow::Context;
use fieldsync_config_and_utils::{BackendConfig, Config, Paths, PoolConfig};
use fieldsync_core::{ConnectionFactory, LiveEntities, SerializerRegistry, SyncEngine};
use fieldsync_network_sql::{NetworkConnectionFactory, PoolOptions};
use fieldsync_player::{register_serializers, standard_fields, PlayerDirectory, PlayerState};
use fieldsync_sqlite::SqliteConnectionFactory;
use std::sync::Arc;
use std::time::Duration;

/// One simulated process: its online players and its engine.
pub struct Node {
    pub players: Arc<PlayerDirectory>,
    pub engine: Arc<SyncEngine<PlayerState>>,
}

impl Node {
    pub fn new(config: &Config, factory: Arc<dyn ConnectionFactory>) -> anyhow::Result<Self> {
        let registry = Arc::new(match config.structured_fallback {
            Some(codec) => SerializerRegistry::with_fallback(codec),
            None => SerializerRegistry::new(),
        });
        register_serializers(&registry);

        let players = Arc::new(PlayerDirectory::new());
        let entities: Arc<dyn LiveEntities<PlayerState>> = players.clone();
        let engine = SyncEngine::new(Arc::new(standard_fields()?), registry, factory, entities)
            .with_excluded(&config.excluded_fields);

        Ok(Self {
            players,
            engine: Arc::new(engine),
        })
    }
}

/// Connection factory for the configured backend.
pub fn connection_factory(
    config: &Config,
    paths: &Paths,
) -> anyhow::Result<Arc<dyn ConnectionFactory>> {
    match &config.backend {
        BackendConfig::Sqlite { .. } => {
            let path = config
                .sqlite_path(paths)
                .context("sqlite backend without a database path")?;
            let factory = SqliteConnectionFactory::new(&path)
                .with_context(|| format!("opening {}", path.display()))?
                .with_upsert_mode(config.upsert_mode);
            Ok(Arc::new(factory))
        }
        BackendConfig::Network { url } => {
            let factory = NetworkConnectionFactory::new(url, pool_options(&config.pool))?
                .with_upsert_mode(config.upsert_mode);
            Ok(Arc::new(factory))
        }
    }
}

fn pool_options(pool: &PoolConfig) -> PoolOptions {
    PoolOptions {
        max_connections: pool.max_connections,
        min_connections: pool.min_connections,
        connect_timeout: pool.connect_timeout_ms.map(Duration::from_millis),
        acquire_timeout: pool.acquire_timeout_ms.map(Duration::from_millis),
        idle_timeout: pool.idle_timeout_ms.map(Duration::from_millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_core::EntityId;
    use tempfile::tempdir;

    #[test]
    fn pool_milliseconds_become_durations() {
        let options = pool_options(&PoolConfig {
            max_connections: Some(4),
            connect_timeout_ms: Some(1500),
            ..PoolConfig::default()
        });
        assert_eq!(options.max_connections, Some(4));
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(options.idle_timeout, None);
    }

    #[test]
    fn default_config_uses_sqlite_under_base_dir() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let factory = connection_factory(&Config::default(), &paths).unwrap();
        assert!(factory.describe().contains("fields.sqlite"));
    }

    #[test]
    fn excluded_fields_come_from_config() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config {
            excluded_fields: vec!["Inventory".to_string()],
            ..Config::default()
        };
        let node = Node::new(&config, connection_factory(&config, &paths).unwrap()).unwrap();

        assert_eq!(node.engine.excluded(), vec!["inventory"]);
        assert!(!node
            .engine
            .field_identifiers()
            .unwrap()
            .contains(&"inventory".to_string()));

        let id = EntityId::new();
        node.players.join(id, PlayerState::new("Alex"));
        node.engine.write(id).unwrap();
        assert_eq!(node.engine.read(id).unwrap().len(), 5);
    }
}
