use anyhow::Result;
use kishar_runtime::{init_logging, LoggingConfig, Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "kishar viewer".to_string(),
        clear_color: wgpu::Color {
            r: 0.035,
            g: 0.042,
            b: 0.078,
            a: 1.0,
        },
        ..Default::default()
    };

    log::info!("starting {} ({}x{})", config.title, config.initial_size.width, config.initial_size.height);

    // A load failure propagates out of the loop as the process exit reason;
    // everything recoverable is absorbed inside the runtime.
    Runtime::run(config)
}
