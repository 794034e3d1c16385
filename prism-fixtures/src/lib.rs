//! prism-fixtures library interface
//!
//! Provisions the test sandbox under `<assets>/testdata`: purge the working
//! directories, make sure the fixture archive is cached and trusted, then
//! unpack it. Exposed as a library so integration tests and the server's test
//! harness can drive the pipeline with their own [`fetch::Fetcher`].

pub mod descriptor;
pub mod extract;
pub mod fetch;
pub mod fingerprint;
pub mod provisioner;
pub mod purge;
pub mod report;

pub use descriptor::{ArchiveDescriptor, DigestAlgorithm};
pub use fetch::{Fetcher, HttpFetcher, DEFAULT_FETCH_TIMEOUT};
pub use provisioner::{ProvisionOptions, Provisioner};
pub use report::{ProvisionReport, ProvisionState};
