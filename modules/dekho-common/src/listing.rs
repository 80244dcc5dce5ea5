//! Listing collections and the infinite-scroll page loader.
//!
//! Listings are read in fixed-size windows by numeric offset. The loader
//! tracks what has been fetched so far for one filter/search combination and
//! decides when the next window may be requested.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::DekhoError;

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Distance in logical pixels between the trailing sentinel and the viewport
/// at which the next page is requested.
pub const SENTINEL_LEAD_PX: f64 = 300.0;

/// A listing row as returned by the backend.
pub type Row = serde_json::Value;

// --- Collections ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Colleges,
    Courses,
    Exams,
    Articles,
    Faqs,
    PopularPlaces,
    FeaturedColleges,
    HeroBanners,
    TrustedPartners,
    StudentReviews,
    PromotedPrograms,
    CollegeUpdates,
}

/// Static description of a collection: where it lives and which columns a
/// caller may touch.
#[derive(Debug)]
pub struct CollectionSpec {
    pub table: &'static str,
    pub order_by: &'static str,
    pub descending: bool,
    pub sortable: &'static [&'static str],
    pub filterable: &'static [&'static str],
    pub searchable: &'static [&'static str],
}

impl Collection {
    pub const ALL: [Collection; 12] = [
        Collection::Colleges,
        Collection::Courses,
        Collection::Exams,
        Collection::Articles,
        Collection::Faqs,
        Collection::PopularPlaces,
        Collection::FeaturedColleges,
        Collection::HeroBanners,
        Collection::TrustedPartners,
        Collection::StudentReviews,
        Collection::PromotedPrograms,
        Collection::CollegeUpdates,
    ];

    pub fn spec(self) -> &'static CollectionSpec {
        match self {
            Collection::Colleges => &CollectionSpec {
                table: "colleges",
                order_by: "rating",
                descending: true,
                sortable: &["rating", "name", "established_year", "created_at"],
                filterable: &["slug", "city", "state", "college_type", "stream", "ownership"],
                searchable: &["name", "city", "state"],
            },
            Collection::Courses => &CollectionSpec {
                table: "courses",
                order_by: "name",
                descending: false,
                sortable: &["name", "created_at"],
                filterable: &["slug", "category", "level", "duration"],
                searchable: &["name", "category"],
            },
            Collection::Exams => &CollectionSpec {
                table: "exams",
                order_by: "exam_date",
                descending: false,
                sortable: &["exam_date", "name", "created_at"],
                filterable: &["slug", "category", "level", "mode"],
                searchable: &["name", "full_name", "category"],
            },
            Collection::Articles => &CollectionSpec {
                table: "articles",
                order_by: "published_at",
                descending: true,
                sortable: &["published_at", "title", "created_at"],
                filterable: &["slug", "category", "author"],
                searchable: &["title", "excerpt"],
            },
            Collection::Faqs => &CollectionSpec {
                table: "faqs",
                order_by: "display_order",
                descending: false,
                sortable: &["display_order"],
                filterable: &["page", "category"],
                searchable: &["question", "answer"],
            },
            Collection::PopularPlaces => &CollectionSpec {
                table: "popular_places",
                order_by: "display_order",
                descending: false,
                sortable: &["display_order", "name"],
                filterable: &["state"],
                searchable: &["name"],
            },
            Collection::FeaturedColleges => &CollectionSpec {
                table: "featured_colleges",
                order_by: "display_order",
                descending: false,
                sortable: &["display_order"],
                filterable: &["college_slug", "page"],
                searchable: &[],
            },
            Collection::HeroBanners => &CollectionSpec {
                table: "hero_banners",
                order_by: "display_order",
                descending: false,
                sortable: &["display_order"],
                filterable: &["page"],
                searchable: &[],
            },
            Collection::TrustedPartners => &CollectionSpec {
                table: "trusted_partners",
                order_by: "display_order",
                descending: false,
                sortable: &["display_order", "name"],
                filterable: &[],
                searchable: &["name"],
            },
            Collection::StudentReviews => &CollectionSpec {
                table: "student_reviews",
                order_by: "created_at",
                descending: true,
                sortable: &["created_at", "rating"],
                filterable: &["college_slug", "course_slug", "rating"],
                searchable: &["student_name", "review_text"],
            },
            Collection::PromotedPrograms => &CollectionSpec {
                table: "promoted_programs",
                order_by: "display_order",
                descending: false,
                sortable: &["display_order"],
                filterable: &["college_slug", "category"],
                searchable: &["title"],
            },
            Collection::CollegeUpdates => &CollectionSpec {
                table: "college_updates",
                order_by: "created_at",
                descending: true,
                sortable: &["created_at"],
                filterable: &["college_slug", "update_type"],
                searchable: &["title"],
            },
        }
    }

    pub fn table(self) -> &'static str {
        self.spec().table
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for Collection {
    type Err = DekhoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Collection::ALL
            .into_iter()
            .find(|c| c.table() == wanted)
            .ok_or_else(|| DekhoError::NotFound(format!("collection {s}")))
    }
}

// --- Query ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    Eq { column: String, value: String },
    In { column: String, values: Vec<String> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Build a filter from a query-string value. Comma-separated values become
    /// an inclusion filter; blank entries are dropped.
    pub fn from_param(column: &str, raw: &str) -> Self {
        let mut values: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();

        if values.len() == 1 {
            Filter::eq(column, values.remove(0))
        } else {
            Filter::In {
                column: column.to_string(),
                values,
            }
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::In { column, .. } => column,
        }
    }

    /// Empty filters are not applied.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Eq { value, .. } => value.trim().is_empty(),
            Filter::In { values, .. } => values.iter().all(|v| v.trim().is_empty()),
        }
    }

    /// Whether a row's column value satisfies this filter.
    pub fn accepts(&self, cell: &str) -> bool {
        match self {
            Filter::Eq { value, .. } => cell == value.trim(),
            Filter::In { values, .. } => values.iter().any(|v| v.trim() == cell),
        }
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ListingQuery {
    pub collection: Collection,
    #[builder(default = DEFAULT_PAGE_SIZE, setter(transform = |n: u32| n.clamp(1, MAX_PAGE_SIZE)))]
    pub page_size: u32,
    #[builder(default)]
    pub order: Option<Ordering>,
    #[builder(default)]
    pub filters: Vec<Filter>,
    #[builder(default, setter(into))]
    pub search: Option<String>,
}

impl ListingQuery {
    pub fn effective_order(&self) -> Ordering {
        self.order.clone().unwrap_or_else(|| {
            let spec = self.collection.spec();
            Ordering {
                field: spec.order_by.to_string(),
                descending: spec.descending,
            }
        })
    }

    pub fn active_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| !f.is_empty())
    }

    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Reject columns the collection does not expose. Identifiers end up in
    /// SQL, so only whitelisted names pass.
    pub fn validate(&self) -> Result<(), DekhoError> {
        let spec = self.collection.spec();

        for filter in self.active_filters() {
            if !spec.filterable.contains(&filter.column()) {
                return Err(DekhoError::validation(format!(
                    "cannot filter {} by {}",
                    self.collection,
                    filter.column()
                )));
            }
        }

        if let Some(order) = &self.order {
            if !spec.sortable.contains(&order.field.as_str()) {
                return Err(DekhoError::validation(format!(
                    "cannot order {} by {}",
                    self.collection, order.field
                )));
            }
        }

        Ok(())
    }
}

/// Anything that can serve a window of a listing.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// At most `query.page_size` rows starting at `offset`, in the query's
    /// effective order.
    async fn fetch_page(&self, query: &ListingQuery, offset: u64) -> Result<Vec<Row>, DekhoError>;
}

// --- Loader ---

/// Handle for one outstanding page request. Completions carrying a ticket
/// from before the last reset are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug)]
pub struct ListingLoader<T> {
    query: ListingQuery,
    items: Vec<T>,
    offset: u64,
    has_more: bool,
    in_flight: Option<FetchTicket>,
    failed: bool,
    generation: u64,
}

impl<T> ListingLoader<T> {
    pub fn new(query: ListingQuery) -> Self {
        Self {
            query,
            items: Vec::new(),
            offset: 0,
            has_more: true,
            in_flight: None,
            failed: false,
            generation: 0,
        }
    }

    pub fn query(&self) -> &ListingQuery {
        &self.query
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Request the next page unless one is already pending or the listing is
    /// exhausted. Also serves as the manual retry after a failure.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() || !self.has_more {
            return None;
        }

        let ticket = FetchTicket {
            generation: self.generation,
            offset: self.offset,
            limit: self.query.page_size,
        };
        self.in_flight = Some(ticket);
        self.failed = false;
        Some(ticket)
    }

    /// Sentinel visibility callback. `distance_px` is how far the sentinel
    /// sits below the viewport edge.
    pub fn on_sentinel(&mut self, distance_px: f64) -> Option<FetchTicket> {
        if distance_px > SENTINEL_LEAD_PX {
            return None;
        }
        self.begin_fetch()
    }

    /// Apply a fetched page. Returns false if the ticket was stale.
    pub fn complete(&mut self, ticket: FetchTicket, rows: Vec<T>) -> bool {
        if self.in_flight != Some(ticket) {
            debug!(offset = ticket.offset, "Dropping stale listing page");
            return false;
        }

        self.in_flight = None;
        self.has_more = rows.len() as u64 == u64::from(ticket.limit);
        self.offset += u64::from(ticket.limit);
        self.items.extend(rows);
        true
    }

    /// Record a failed fetch. Accumulated rows and the cursor stay put so the
    /// same window can be retried.
    pub fn fail(&mut self, ticket: FetchTicket) -> bool {
        if self.in_flight != Some(ticket) {
            return false;
        }
        self.in_flight = None;
        self.failed = true;
        true
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        if self.query.filters != filters {
            self.query.filters = filters;
            self.reset();
        }
    }

    pub fn set_search(&mut self, search: Option<String>) {
        if self.query.search != search {
            self.query.search = search;
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.offset = 0;
        self.has_more = true;
        self.in_flight = None;
        self.failed = false;
    }
}

impl ListingLoader<Row> {
    /// Fetch and apply the next page from `source`. Returns the number of rows
    /// appended; zero when nothing was requested.
    pub async fn load_next<S>(&mut self, source: &S) -> Result<usize, DekhoError>
    where
        S: PageSource + ?Sized,
    {
        let Some(ticket) = self.begin_fetch() else {
            return Ok(0);
        };

        match source.fetch_page(&self.query, ticket.offset).await {
            Ok(rows) => {
                let count = rows.len();
                self.complete(ticket, rows);
                Ok(count)
            }
            Err(e) => {
                self.fail(ticket);
                Err(e)
            }
        }
    }
}
