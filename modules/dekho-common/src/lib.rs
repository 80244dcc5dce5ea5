pub mod ads;
pub mod cache;
pub mod calculators;
pub mod config;
pub mod error;
pub mod leads;
pub mod listing;
pub mod seo;

pub use ads::{Ad, AdContext, AdTarget, AdVariant};
pub use cache::{Snapshot, SnapshotCache, TtlCache};
pub use config::Config;
pub use error::DekhoError;
pub use leads::{Lead, LeadSubmission, NewLead};
pub use listing::{Collection, Filter, ListingLoader, ListingQuery, Ordering, PageSource, Row};
pub use seo::{DocumentHead, PageSeo, ResolvedSeo, SeoOverrides};
