//! Multi-tenant sharding over [`cortex_engine::CortexEngine`]: one
//! database file per tenant, routed through a single
//! [`FederationRouterImpl`].

pub mod router;

pub use router::FederationRouterImpl;
