mod tracer_engine;

pub use tracer_engine::{TracerEngine, TracerOptions};

/// Should be called at the start of each binary.
/// The log level is taken from the `RUST_LOG` environment variable, and
/// the component name from the binary being built.
#[macro_export]
macro_rules! init_tracer {
    ($options:expr) => {{
        let tracer = TracerEngine::new($options, env!("CARGO_BIN_NAME"));
        tracing::debug!("Tracer initialised for {}", module_path!());
        tracer
    }};
}
