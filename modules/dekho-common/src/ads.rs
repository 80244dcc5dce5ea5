//! Ad selection.
//!
//! Every ad slot on the site asks for at most one ad. Candidates are narrowed
//! by visual variant and slot position, ordered by priority, then walked
//! through a fixed specificity cascade: item, page+city, page, city,
//! universal. The first tier with a match wins, so a more specific ad beats a
//! generic one regardless of priority; priority only orders ads within a tier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DekhoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdVariant {
    Horizontal,
    Vertical,
    Square,
    Leaderboard,
}

impl fmt::Display for AdVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdVariant::Horizontal => write!(f, "horizontal"),
            AdVariant::Vertical => write!(f, "vertical"),
            AdVariant::Square => write!(f, "square"),
            AdVariant::Leaderboard => write!(f, "leaderboard"),
        }
    }
}

impl FromStr for AdVariant {
    type Err = DekhoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Ok(AdVariant::Horizontal),
            "vertical" => Ok(AdVariant::Vertical),
            "square" => Ok(AdVariant::Square),
            "leaderboard" => Ok(AdVariant::Leaderboard),
            other => Err(DekhoError::validation(format!("unknown ad variant: {other}"))),
        }
    }
}

/// Which requests an ad is eligible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdTarget {
    Universal,
    Page,
    Item,
    City,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
    pub link_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub variant: AdVariant,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "target_type")]
    pub target: AdTarget,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub item_slug: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// The slot asking for an ad.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AdContext {
    pub page: Option<String>,
    pub item_slug: Option<String>,
    pub city: Option<String>,
    pub variant: Option<AdVariant>,
    pub position: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn same(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

fn same_city(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a.eq_ignore_ascii_case(b))
}

/// Cascade tier an ad occupies for `ctx`, lowest number wins.
fn tier(ad: &Ad, ctx: &AdContext) -> Option<u8> {
    let page = present(&ctx.page);
    let city = present(&ctx.city);

    match ad.target {
        AdTarget::Item if same(present(&ad.item_slug), present(&ctx.item_slug)) => Some(1),
        AdTarget::Page if same(present(&ad.page_name), page) => match present(&ad.city) {
            Some(ad_city) if same_city(Some(ad_city), city) => Some(2),
            Some(_) => None,
            None => Some(3),
        },
        AdTarget::City if same_city(present(&ad.city), city) => Some(4),
        AdTarget::Universal => Some(5),
        _ => None,
    }
}

/// Pick the single ad to show for `ctx`, or `None` when nothing qualifies.
pub fn resolve<'a>(ads: &'a [Ad], ctx: &AdContext) -> Option<&'a Ad> {
    let position = present(&ctx.position);

    let mut candidates: Vec<&Ad> = ads
        .iter()
        .filter(|ad| ad.is_active)
        .filter(|ad| ctx.variant.map_or(true, |v| ad.variant == v))
        .filter(|ad| position.map_or(true, |p| present(&ad.position) == Some(p)))
        .collect();

    // Stable: equal priorities keep their input order.
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

    (1..=5).find_map(|wanted| {
        candidates
            .iter()
            .copied()
            .find(|ad| tier(ad, ctx) == Some(wanted))
    })
}
