//! Entity/relation extraction, graph store, and CDC outbox.

pub mod cdc_outbox;
pub mod extractor;
pub mod graph_store;
pub mod remote;

pub use cdc_outbox::CdcOutboxImpl;
pub use extractor::extract;
pub use graph_store::GraphStoreImpl;
pub use remote::NullRemoteGraphBackend;
