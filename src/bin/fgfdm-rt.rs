//! Host-side sampler: attaches the shared ring channel and runs the sampling task
//! once per control period, standing in for a real-time scheduler.
//!
//! Usage: `fgfdm-rt [config.yaml]`
//!
//! Logs every data-valid transition. Exits 0 on SIGINT or SIGTERM, non-zero on setup failure.

use std::process::ExitCode;

#[cfg(unix)]
fn main() -> ExitCode {
    sampler::init_logging();
    match sampler::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    eprintln!("fgfdm-rt: POSIX shared memory is not available on this platform");
    ExitCode::FAILURE
}

#[cfg(unix)]
mod sampler {
    use anyhow::{Context, bail};
    use fgfdm::{
        BridgeConfig, FrameOutputs, OutputRegistry, SampleOutcome, SamplingTask, SharedRegion,
        ShutdownSignal,
    };
    use tokio::time::{MissedTickBehavior, interval};
    use tracing::{debug, info, warn};
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
        let config = match args.as_slice() {
            [] => BridgeConfig::default(),
            [path] => BridgeConfig::load(path)?,
            _ => bail!("invalid arguments\nusage: fgfdm-rt [config.yaml]"),
        };

        info!("fgfdm-rt v{}", env!("CARGO_PKG_VERSION"));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("unable to start async runtime")?;
        runtime.block_on(SamplerContext::open(&config)?.run(&config))
    }

    /// Everything the sampler holds for its lifetime; released by drop on every
    /// exit path.
    struct SamplerContext {
        registry: OutputRegistry,
        outputs: FrameOutputs,
        region: SharedRegion,
    }

    impl SamplerContext {
        fn open(config: &BridgeConfig) -> anyhow::Result<Self> {
            let mut registry = OutputRegistry::new();
            let outputs = FrameOutputs::register(&mut registry, &config.pin_prefix)
                .context("unable to register outputs")?;
            let region = SharedRegion::attach(&config.shm_name)
                .context("unable to attach shared memory")?;
            Ok(Self { registry, outputs, region })
        }

        async fn run(self, config: &BridgeConfig) -> anyhow::Result<()> {
            let Self { registry, outputs, region } = self;
            let period = config.period();

            // SAFETY: This process is the only sampler attached to the region.
            let consumer = unsafe { region.consumer() };
            let mut task = SamplingTask::new(consumer, outputs, config.timeout());

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut valid = false;
            let mut periods = 0u64;

            let mut shutdown = ShutdownSignal::install()?;

            info!(period_us = config.period_us, timeout_ms = config.timeout_ms, "Sampler started");
            loop {
                tokio::select! {
                    reason = shutdown.recv() => {
                        info!(%reason, "Shutting down");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                periods += 1;
                let outcome = task.sample(period);
                let now_valid = task.outputs().data_valid();
                if now_valid != valid {
                    match outcome {
                        SampleOutcome::Fresh { sequence } => info!(sequence, "Telemetry valid"),
                        SampleOutcome::Stale => warn!("Telemetry stale"),
                        SampleOutcome::Rejected { sequence } => warn!(sequence, "Telemetry invalid"),
                        SampleOutcome::Holding => {}
                    }
                    valid = now_valid;
                }
            }

            info!(periods, "Sampler stopped");
            for (name, value) in registry.iter() {
                debug!("{name} = {value}");
            }
            Ok(())
        }
    }
}
