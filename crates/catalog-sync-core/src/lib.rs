pub mod engine;
pub mod factory;
pub mod lock;
pub mod provider;
pub mod sweeper;
pub mod titles;

pub use engine::{CatalogEvent, EventKind, ReconcileEngine};
pub use factory::VirtualItemFactory;
pub use lock::{LockGuard, LockTable};
pub use provider::{
    CatalogStore, DeleteOptions, IdLookup, MetadataSource, OrderingOracle, ProviderError,
};
pub use sweeper::DuplicateSweeper;
pub use titles::TitleResolver;
