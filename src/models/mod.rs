//! Typed shapes of the LunarCrush payloads and of the gateway's own GraphQL
//! objects. Upstream objects are declared through [`upstream_object!`] so every
//! field is optional and decoded leniently.

/// Declares an upstream object: all fields optional, decoded through
/// [`lenient::field`], exposed to GraphQL with their snake_case names.
macro_rules! upstream_object {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Default,
            PartialEq,
            serde::Serialize,
            serde::Deserialize,
            async_graphql::SimpleObject,
        )]
        #[serde(default)]
        #[graphql(rename_fields = "snake_case")]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(deserialize_with = "crate::models::lenient::field")]
                pub $field: Option<$ty>,
            )*
        }

        impl crate::models::lenient::Lenient for $name {
            fn from_value(value: serde_json::Value) -> Option<Self> {
                serde_json::from_value(value).ok()
            }
        }
    };
}

pub mod categories;
pub mod coins;
pub mod creators;
pub mod lenient;
pub mod nfts;
pub mod posts;
pub mod responses;
pub mod stocks;
pub mod system;
pub mod topics;

/// Free-form JSON exposed as the `JSON` scalar
pub type JsonValue = async_graphql::Json<serde_json::Value>;

pub use categories::*;
pub use coins::*;
pub use creators::*;
pub use nfts::*;
pub use posts::*;
pub use responses::*;
pub use stocks::*;
pub use system::*;
pub use topics::*;
