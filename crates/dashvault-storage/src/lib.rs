//! Artifact stores for dashvault snapshots.

pub mod object_store;
pub mod stores;

pub use object_store::{
    LocalObjectStore, MockFailure, MockObjectStore, ObjectMetadata, ObjectStore,
    PrefixMetadata, S3Config, S3ObjectStore,
};
pub use stores::{ArtifactStores, StoreKind, WriteOutcome};
