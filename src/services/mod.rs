pub mod broadcaster;
pub mod composer;
pub mod resolver;
pub mod scheduler;
pub mod snapshot;

pub use broadcaster::{Broadcaster, DeliveryReport, MessageSink};
pub use composer::compose;
pub use resolver::{CatalogSource, CoinResolver};
pub use scheduler::{DigestPipeline, DigestScheduler};
pub use snapshot::MarketSnapshotProvider;
