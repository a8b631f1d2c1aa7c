//! Storage, connectivity and messaging adapters
pub mod connection;
pub mod events;
pub mod health;
pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use connection::{ConnectionError, ConnectionManager, Connector, PgConnector, PoolPolicy};
pub use events::{EventPublisher, LogEventPublisher, NatsEventPublisher, RecordingEventPublisher};
pub use health::{HealthMonitor, HealthOutcome};
pub use in_memory::InMemoryCatalogRepository;
pub use postgres::PostgresCatalogRepository;
pub use repository::CatalogRepository;
