//! Search request compilation and execution
//!
//! Requests come in as loosely-typed parameters, pass through entitlement
//! resolution and are compiled into a document store query:
//!
//! ```text
//! SearchArgs ──► SearchParams ──► SearchQuery ──► SearchBody ──► store
//!                      │               ▲
//!                      │               │ compile()
//!                EntitlementResolver   │
//!                      └──► QueryCompiler
//! ```
//!
//! [`QueryCompiler`] owns every query-shaping rule: section policies,
//! company-type rules, archive and embargo gates, product scoping, free
//! text, advanced fields, structured facet filters, date windows and the
//! agenda item-type partitions. [`SearchService`] drives the compiled
//! query against the store and hands agenda pages to [`ResultCorrelator`]
//! for child-match annotation.

pub mod aggregations;
pub mod clauses;
pub mod compiler;
pub mod correlate;
pub mod dates;
pub mod facets;
pub mod request;
pub mod service;

pub use aggregations::facet_aggregations;
pub use clauses::BoolQuery;
pub use compiler::{EmbargoPass, QueryCompiler};
pub use correlate::{DeliveryFormatter, ResultCorrelator, WireItemLookup};
pub use dates::{DateBound, DateRange};
pub use facets::{FacetKind, FacetRegistry};
pub use request::{ItemTypeFilter, SearchArgs, SearchParams, SearchQuery};
pub use service::{SearchResults, SearchService};
