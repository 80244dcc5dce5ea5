use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use ai_client::ChatGateway;
use tokio::sync::Mutex;

use dekho_common::{Ad, Config, PageSeo, SnapshotCache, TtlCache};
use dekho_store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub gateway: ChatGateway,
    /// Active ad set, reloaded once its staleness window passes.
    pub ads: SnapshotCache<Vec<Ad>>,
    /// SEO record (or its absence) per base path.
    pub seo: TtlCache<String, Option<PageSeo>>,
    pub lead_limiter: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let gateway = ChatGateway::new(config.ai_gateway_key.clone(), config.ai_model.clone())
            .with_base_url(config.ai_gateway_url.clone())
            .with_app_name(config.site_brand.clone());

        Self {
            ads: SnapshotCache::new(config.ad_cache_ttl),
            seo: TtlCache::new(config.seo_cache_ttl),
            lead_limiter: Mutex::new(HashMap::new()),
            gateway,
            store,
            config,
        }
    }
}
