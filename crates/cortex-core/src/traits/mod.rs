mod cdc_outbox;
mod compactor;
mod embedding_index;
mod fact_store;
mod federation;
mod fts_index;
mod graph_store;
mod hybrid_search;
mod ledger;
mod snapshot;

pub use cdc_outbox::ICdcOutbox;
pub use compactor::ICompactor;
pub use embedding_index::{Embedder, IEmbeddingIndex};
pub use fact_store::IFactStore;
pub use federation::IFederationRouter;
pub use fts_index::IFtsIndex;
pub use graph_store::{IGraphStore, RemoteGraphBackend};
pub use hybrid_search::IHybridSearch;
pub use ledger::ILedger;
pub use snapshot::ISnapshotManager;
