mod runtime;
mod scene;

use tessera_engine::device::GpuInit;
use tessera_engine::logging::{init_logging, LoggingConfig};

use crate::runtime::{Runtime, RuntimeConfig};
use crate::scene::DemoScene;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "tessera demo".to_string(),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), DemoScene::new())
}
