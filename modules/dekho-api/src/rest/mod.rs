pub mod ads;
pub mod calculators;
pub mod chat;
pub mod leads;
pub mod listings;
pub mod seo;
