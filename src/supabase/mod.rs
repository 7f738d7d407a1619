//! Clients for the hosted backend: GoTrue for identity, PostgREST for the
//! `blueprints` table. Both are owned elsewhere; these are thin wrappers.

mod auth;
mod store;

pub use auth::{Session, SupabaseAuth, User};
pub use store::BlueprintStore;

use reqwest::RequestBuilder;

/// Headers every Supabase request needs. `bearer` is the user's access token
/// when there is one, otherwise the anon key.
fn with_keys(builder: RequestBuilder, anon_key: &str, bearer: Option<&str>) -> RequestBuilder {
    builder
        .header("apikey", anon_key)
        .bearer_auth(bearer.unwrap_or(anon_key))
}
