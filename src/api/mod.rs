//! API module containing route handlers and initialization logic
//!
//! This module is responsible for:
//! - Defining REST and GraphQL routes
//! - Caller identification and tiered rate limiting
//! - Providing API documentation through the index endpoint

/// Route handlers for the REST and GraphQL endpoints
pub mod handlers;

/// API documentation and index endpoint
pub mod index;

/// Router initialization and configuration
pub mod init;

/// Caller identification and rate limiting for `/graphql`
pub mod middleware;

// Re-export the router initialization function for easier access
pub use init::initialize_router;
