use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

#[derive(Debug, Default, Clone)]
pub struct TracerOptions {
    /// Emit ANSI colour codes in log lines.
    pub ansi: bool,
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_directive: Option<String>,
}

/// This object initialises the global tracing subscriber.
/// Log lines go to stderr so that stdout stays free for command output.
pub struct TracerEngine {
    service_name: String,
}

impl TracerEngine {
    /// Initialises the stderr tracer for the crate
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the component, recorded in the first log line.
    /// #Returns
    /// An instance of TracerEngine
    pub fn new(options: TracerOptions, service_name: &str) -> Self {
        let stderr_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(options.ansi);

        // This filter is applied to the stderr tracer
        let log_filter = match options.default_directive {
            Some(directive) => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive)),
            None => EnvFilter::from_default_env(),
        };

        let subscriber =
            tracing_subscriber::Registry::default().with(stderr_tracer.with_filter(log_filter));

        //  This is only called once, so will never panic
        tracing::subscriber::set_global_default(subscriber)
            .expect("tracing::subscriber::set_global_default should only be called once");

        tracing::info!("{service_name} tracer initialised");
        Self {
            service_name: service_name.to_owned(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
