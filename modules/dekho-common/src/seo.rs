//! Per-route page metadata.
//!
//! Metadata comes from two places: values the page passes explicitly and an
//! admin-edited `page_seo` record keyed by the route's base path. Explicit
//! values win, the record fills gaps, and anything still missing leaves the
//! existing head tag alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Admin-edited overrides for one base path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSeo {
    pub page_path: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub robots: Option<String>,
    #[serde(default)]
    pub og_title: Option<String>,
    #[serde(default)]
    pub og_description: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub twitter_title: Option<String>,
    #[serde(default)]
    pub twitter_description: Option<String>,
    #[serde(default)]
    pub twitter_image: Option<String>,
}

/// Values supplied directly by the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct SeoOverrides {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSeo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub robots: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub twitter_title: Option<String>,
    pub twitter_description: Option<String>,
    pub twitter_image: Option<String>,
}

/// First path segment of a route, e.g. `/colleges/iit-delhi?tab=fees` →
/// `/colleges`. The root route maps to `/`.
pub fn base_path(route: &str) -> String {
    let path = route
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    match path.split('/').find(|segment| !segment.is_empty()) {
        Some(segment) => format!("/{segment}"),
        None => "/".to_string(),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn from_record(record: Option<&PageSeo>, pick: fn(&PageSeo) -> &Option<String>) -> Option<String> {
    record.and_then(|r| non_blank(pick(r)))
}

pub fn resolve(overrides: &SeoOverrides, record: Option<&PageSeo>) -> ResolvedSeo {
    let title = non_blank(&overrides.title).or_else(|| from_record(record, |r| &r.meta_title));
    let description = non_blank(&overrides.description)
        .or_else(|| from_record(record, |r| &r.meta_description));
    let keywords =
        non_blank(&overrides.keywords).or_else(|| from_record(record, |r| &r.meta_keywords));

    // Social tags: explicit value, then the record's social field, then the
    // effective value.
    let explicit_title = non_blank(&overrides.title);
    let explicit_description = non_blank(&overrides.description);
    let og_title = explicit_title
        .clone()
        .or_else(|| from_record(record, |r| &r.og_title))
        .or_else(|| title.clone());
    let og_description = explicit_description
        .clone()
        .or_else(|| from_record(record, |r| &r.og_description))
        .or_else(|| description.clone());
    let twitter_title = explicit_title
        .or_else(|| from_record(record, |r| &r.twitter_title))
        .or_else(|| og_title.clone());
    let twitter_description = explicit_description
        .or_else(|| from_record(record, |r| &r.twitter_description))
        .or_else(|| og_description.clone());
    let og_image = from_record(record, |r| &r.og_image);
    let twitter_image = from_record(record, |r| &r.twitter_image).or_else(|| og_image.clone());

    ResolvedSeo {
        title,
        description,
        keywords,
        canonical_url: from_record(record, |r| &r.canonical_url),
        robots: from_record(record, |r| &r.robots),
        og_title,
        og_description,
        og_image,
        twitter_title,
        twitter_description,
        twitter_image,
    }
}

// --- Document head ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetaAttr {
    Name,
    Property,
}

/// The mutable part of an HTML `<head>`: title, meta tags and the canonical
/// link. Tags are keyed by their `name`/`property` so writes are upserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentHead {
    pub title: String,
    pub metas: BTreeMap<(MetaAttr, String), String>,
    pub canonical: Option<String>,
}

impl DocumentHead {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn meta(&self, attr: MetaAttr, key: &str) -> Option<&str> {
        self.metas
            .get(&(attr, key.to_string()))
            .map(String::as_str)
    }

    fn upsert(&mut self, attr: MetaAttr, key: &str, value: &Option<String>) {
        if let Some(value) = value {
            self.metas.insert((attr, key.to_string()), value.clone());
        }
    }

    pub fn apply(&mut self, seo: &ResolvedSeo, brand: &str) {
        if let Some(title) = &seo.title {
            self.title = format!("{title} | {brand}");
        }

        self.upsert(MetaAttr::Name, "description", &seo.description);
        self.upsert(MetaAttr::Name, "keywords", &seo.keywords);
        self.upsert(MetaAttr::Name, "robots", &seo.robots);

        self.upsert(MetaAttr::Property, "og:title", &seo.og_title);
        self.upsert(MetaAttr::Property, "og:description", &seo.og_description);
        self.upsert(MetaAttr::Property, "og:image", &seo.og_image);
        self.upsert(MetaAttr::Property, "og:url", &seo.canonical_url);
        self.upsert(MetaAttr::Property, "og:type", &Some("website".to_string()));

        let card = if seo.twitter_image.is_some() {
            "summary_large_image"
        } else {
            "summary"
        };
        self.upsert(MetaAttr::Name, "twitter:card", &Some(card.to_string()));
        self.upsert(MetaAttr::Name, "twitter:title", &seo.twitter_title);
        self.upsert(MetaAttr::Name, "twitter:description", &seo.twitter_description);
        self.upsert(MetaAttr::Name, "twitter:image", &seo.twitter_image);

        if let Some(canonical) = &seo.canonical_url {
            self.canonical = Some(canonical.clone());
        }
    }

    /// Route teardown: only the title reverts, tags stay until overwritten.
    pub fn teardown(&mut self, default_title: &str) {
        self.title = default_title.to_string();
    }

    pub fn render(&self) -> String {
        let mut html = format!("<title>{}</title>\n", escape(&self.title));

        for ((attr, key), content) in &self.metas {
            let attr = match attr {
                MetaAttr::Name => "name",
                MetaAttr::Property => "property",
            };
            html.push_str(&format!(
                "<meta {attr}=\"{}\" content=\"{}\">\n",
                escape(key),
                escape(content)
            ));
        }

        if let Some(canonical) = &self.canonical {
            html.push_str(&format!("<link rel=\"canonical\" href=\"{}\">\n", escape(canonical)));
        }

        html
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
