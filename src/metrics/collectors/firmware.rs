use crate::error::Result;
use crate::metrics::collectors::{proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use async_trait::async_trait;
use std::sync::Arc;

const NAME: &str = "firmware";
const PROPS: [&str; 5] = [
    "board-name",
    "model",
    "serial-number",
    "current-firmware",
    "upgrade-firmware",
];

/// Board identity and firmware versions from `/system/routerboard/print`.
pub struct FirmwareCollector {
    info: Arc<Descriptor>,
    upgrade: Arc<Descriptor>,
}

impl FirmwareCollector {
    pub fn new() -> Self {
        Self {
            info: Descriptor::gauge(
                NAME,
                "info",
                "board identity and firmware versions",
                &[
                    "device",
                    "board_name",
                    "model",
                    "serial_number",
                    "current_firmware",
                    "upgrade_firmware",
                ],
            ),
            upgrade: Descriptor::gauge(
                NAME,
                "upgrade_available",
                "firmware upgrade is pending (1 = yes)",
                &["device"],
            ),
        }
    }
}

impl Default for FirmwareCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for FirmwareCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        vec![self.info.clone(), self.upgrade.clone()]
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let records = query(
            ctx,
            NAME,
            &["/system/routerboard/print".to_string(), proplist(&PROPS)],
        )
        .await?;

        for re in &records {
            let current = re.get("current-firmware").unwrap_or_default();
            let upgrade = re.get("upgrade-firmware").unwrap_or_default();
            ctx.emit(
                &self.info,
                1.0,
                &[
                    re.get("board-name").unwrap_or_default(),
                    re.get("model").unwrap_or_default(),
                    re.get("serial-number").unwrap_or_default(),
                    current,
                    upgrade,
                ],
            )?;

            // virtual machines report no firmware at all
            let pending = !current.is_empty() && !upgrade.is_empty() && current != upgrade;
            ctx.emit(&self.upgrade, if pending { 1.0 } else { 0.0 }, &[])?;
        }
        Ok(())
    }
}
