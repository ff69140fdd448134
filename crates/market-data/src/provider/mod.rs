//! Provider integrations.
//!
//! This module contains:
//! - [`ProviderDescriptor`] - immutable description of one upstream service
//!   (endpoints, wire shapes, mapping tables)
//! - [`ProviderCatalog`] - the built-in descriptors and their default orders
//! - [`Transport`] - the network seam, with the reqwest [`HttpTransport`]
//!
//! Providers carry no code of their own. Adding a vendor means adding a
//! descriptor and its mapping tables.

pub mod catalog;
mod descriptor;
mod transport;

pub use catalog::ProviderCatalog;
pub use descriptor::{BarSource, ProviderDescriptor, QuoteSource};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
