//! Entitlement resolution
//!
//! Decides which products a principal may see on a resource and builds the
//! scope every compiled search runs in. The seat rule: a product is
//! entitled when the user is an administrator, when it is directly
//! assigned to the user, or when the company holds it with an unlimited
//! seat count. Directory data comes through the [`EntitlementProvider`]
//! seam; [`InMemoryDirectory`] backs embedded deployments and tests.

mod provider;
mod resolver;

pub use provider::{EntitlementProvider, InMemoryDirectory, SectionPolicy};
pub use resolver::{entitled_products, EntitlementResolver};
