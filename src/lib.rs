//! Entitlement-aware search core for newsroom content portals
//!
//! The crate compiles user searches and saved topics into document store
//! queries, scoped to what each account's company subscription allows:
//!
//! - **Query compilation**: free text, advanced fields, structured facet
//!   filters and date windows folded into one boolean tree in fixed stages
//! - **Entitlements**: product scoping with per-seat assignments, archive
//!   depth and embargo gates, operator impersonation
//! - **Facets**: config-driven registry mapping facet names to direct,
//!   nested and coverage clauses with paired aggregations
//! - **Correlation**: inner-hit intersection flagging which child rows of
//!   an agenda item satisfied every applied nested filter
//! - **Topic matching**: N saved topics folded into one
//!   filters-aggregation query, a single store round-trip per item
//!
//! # Architecture
//!
//! ```text
//!  SearchArgs ──► EntitlementResolver ──► QueryCompiler ──► SearchBody
//!                        │                     │                │
//!                 EntitlementProvider    FacetRegistry    DocumentStore
//!                                                              │
//!  SearchResults ◄── ResultCorrelator ◄── StoreResponse ◄──────┘
//! ```
//!
//! The crate is a library with no request surface of its own; an HTTP
//! layer and a notification dispatcher sit on top of it.
//!
//! # Example
//!
//! ```no_run
//! use newsdesk_core::config::Config;
//! use newsdesk_core::entitlements::InMemoryDirectory;
//! use newsdesk_core::models::Section;
//! use newsdesk_core::observability::init_tracing;
//! use newsdesk_core::search::{SearchParams, SearchService};
//! use newsdesk_core::store::HttpDocumentStore;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     init_tracing(&config.observability);
//!     let store = Arc::new(HttpDocumentStore::new(&config.store)?);
//!     let directory = Arc::new(InMemoryDirectory::new());
//!     let service = SearchService::new(&config, store, directory);
//!
//!     let user_id = Uuid::new_v4();
//!     let params = SearchParams {
//!         q: Some("flood levy".to_string()),
//!         ..SearchParams::default()
//!     };
//!     let results = service
//!         .search_with_params(Section::Wire, &user_id, params)
//!         .await?;
//!     println!("{} items", results.total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entitlements;
pub mod error;
pub mod models;
pub mod observability;
pub mod search;
pub mod store;
pub mod topics;

pub use config::Config;
pub use error::{CoreError, Result};
