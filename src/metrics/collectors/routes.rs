use crate::error::Result;
use crate::metrics::collectors::{proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use async_trait::async_trait;
use std::sync::Arc;

const NAME: &str = "routes";
const PROPS: [&str; 4] = ["dst-address", "gateway", "distance", "pref-src"];

/// One info sample per entry of `/ip/route/print`.
pub struct RouteCollector {
    route: Arc<Descriptor>,
}

impl RouteCollector {
    pub fn new() -> Self {
        Self {
            route: Descriptor::gauge(
                "route",
                "metrics",
                "ip route metrics",
                &["device", "dst_address", "gateway", "distance", "pref_src"],
            ),
        }
    }
}

impl Default for RouteCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for RouteCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        vec![self.route.clone()]
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let records = query(ctx, NAME, &["/ip/route/print".to_string(), proplist(&PROPS)]).await?;
        for re in &records {
            let labels = PROPS.map(|prop| re.get(prop).unwrap_or_default());
            ctx.emit(&self.route, 1.0, &labels)?;
        }
        Ok(())
    }
}
