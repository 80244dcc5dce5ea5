//! Access to the hosted backend.
//!
//! Every read the site makes goes through [`Store`]: the active ad set,
//! listing windows, per-path SEO records and the leads table. [`PgStore`]
//! talks to Postgres; [`MemoryStore`] keeps everything in process for tests
//! and local development.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use dekho_common::{Ad, DekhoError, Lead, NewLead, PageSeo, PageSource};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: PageSource {
    /// All ads with `is_active = true`.
    async fn active_ads(&self) -> Result<Vec<Ad>, DekhoError>;

    /// Active SEO record for a normalized base path.
    async fn page_seo(&self, base_path: &str) -> Result<Option<PageSeo>, DekhoError>;

    /// Insert one lead row and return its id.
    async fn insert_lead(&self, lead: &NewLead) -> Result<Uuid, DekhoError>;

    /// Newest leads first.
    async fn recent_leads(&self, limit: u32) -> Result<Vec<Lead>, DekhoError>;
}
