//! Feature store implementations.

mod inmemory;

pub use inmemory::InMemoryFeatureStore;
