//! GraphQL schema served on `/graphql`.
//!
//! Resolvers read the shared [`Services`] from schema data and the per-request
//! [`RequestContext`] from request data.

pub mod context;
pub mod mutation;
pub mod query;

pub use context::RequestContext;
pub use mutation::MutationRoot;
pub use query::QueryRoot;

use crate::state::Services;
use async_graphql::{EmptySubscription, Schema};

pub type GatewaySchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(services: Services) -> GatewaySchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(services)
        .finish()
}
