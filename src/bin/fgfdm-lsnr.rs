//! Listener process: receives native-FDM datagrams and publishes them into the
//! shared ring channel.
//!
//! Usage: `fgfdm-lsnr <port> [config.yaml]`
//!
//! Logging honours `RUST_LOG` (default `info`). Exits 0 on SIGINT or SIGTERM and non-zero on
//! setup failure or a fatal socket error.

use std::process::ExitCode;

#[cfg(unix)]
fn main() -> ExitCode {
    listener::init_logging();
    match listener::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    eprintln!("fgfdm-lsnr: POSIX shared memory is not available on this platform");
    ExitCode::FAILURE
}

#[cfg(unix)]
mod listener {
    use anyhow::{Context, bail};
    use fgfdm::{
        BridgeConfig, IngressLoop, ListenerPins, OutputRegistry, SharedRegion, ShutdownSignal,
        UdpSource,
    };
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, info};
    use tracing_subscriber::EnvFilter;

    pub fn init_logging() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    pub fn run() -> anyhow::Result<()> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let (port, config_path) = match args.as_slice() {
            [port] => (port, None),
            [port, path] => (port, Some(path)),
            _ => bail!("invalid arguments\nusage: fgfdm-lsnr <port> [config.yaml]"),
        };

        let mut config = match config_path {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };
        config.port = port.parse().with_context(|| format!("invalid port `{port}`"))?;

        info!("fgfdm-lsnr v{}", env!("CARGO_PKG_VERSION"));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("unable to start async runtime")?;
        runtime.block_on(listen(config))
    }

    async fn listen(config: BridgeConfig) -> anyhow::Result<()> {
        let context = ListenerContext::open(&config).await?;

        let mut shutdown = ShutdownSignal::install()?;

        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            let reason = shutdown.recv().await;
            info!(%reason, "Shutting down");
            stop.cancel();
        });

        context.run(&config, cancel).await
    }

    /// Everything the listener holds for its lifetime; released by drop on every
    /// exit path.
    struct ListenerContext {
        registry: OutputRegistry,
        pins: ListenerPins,
        region: SharedRegion,
        source: UdpSource,
    }

    impl ListenerContext {
        async fn open(config: &BridgeConfig) -> anyhow::Result<Self> {
            let mut registry = OutputRegistry::new();
            let pins = ListenerPins::register(&mut registry, &config.pin_prefix)
                .context("unable to register listener outputs")?;
            // The sampler owns the region; a restarted listener must find it again.
            let region = SharedRegion::attach_peer(&config.shm_name)
                .context("unable to attach shared memory")?;
            let source = UdpSource::bind(config.listen_addr())
                .await
                .context("unable to open listener socket")?;

            Ok(Self { registry, pins, region, source })
        }

        async fn run(self, config: &BridgeConfig, cancel: CancellationToken) -> anyhow::Result<()> {
            let Self { registry, pins, mut region, source } = self;
            region.reset();

            // SAFETY: This process is the only listener attached to the region.
            let producer = unsafe { region.producer() };
            let stats = IngressLoop::new(source, producer, pins, config.timeout())
                .run(cancel)
                .await?;

            info!(received = stats.received, published = stats.published, "Listener stopped");
            for (name, value) in registry.iter() {
                debug!("{name} = {value}");
            }
            Ok(())
        }
    }
}
