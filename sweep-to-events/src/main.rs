use anyhow::{Context, bail};
use clap::Parser;
use ephys_common::{
    SampleSeries, init_tracer,
    metrics::{component_info_metric, describe_detection_metrics},
    tracer::{TracerEngine, TracerOptions},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use sweep_to_events::{
    event_detection::{detectors::SlidingTemplateDetector, template::TemplateSource},
    parameters::{Mode, TemplateParameters},
    processing::{Detection, process_sweeps},
    sweeps::{EventFile, SweepFile},
};
use tracing::info;

// cargo run --bin sweep-to-events -- --input sweeps.json action-potential --derivative-threshold 20 --smoothing-window 5
// cargo run --bin sweep-to-events -- --input sweeps.json --output events.json template --shape biexponential:0.5,3 --duration 15

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON document holding the sweeps to process.
    #[clap(long)]
    input: PathBuf,

    /// Where to write the detected events. Defaults to stdout.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Print the Prometheus exposition of this run's metrics to stderr on exit.
    #[clap(long)]
    print_metrics: bool,

    /// Colour log lines.
    #[clap(long)]
    ansi: bool,

    #[command(subcommand)]
    mode: Mode,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Cannot parse {}", path.display()))
}

fn template_detection(parameters: &TemplateParameters) -> anyhow::Result<Detection> {
    let source = match (parameters.shape, &parameters.template_file) {
        (Some(shape), _) => TemplateSource::Shape {
            shape,
            duration: parameters.duration,
        },
        (None, Some(path)) => TemplateSource::Waveform(read_json::<SampleSeries>(path)?),
        (None, None) => bail!("Either a template shape or a template file is required"),
    };
    Ok(Detection::Template {
        detector: SlidingTemplateDetector::new(
            source,
            parameters.detection_threshold,
            parameters.pad_tail,
        ),
        extract_from_raw: parameters.extract_from_raw,
    })
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let tracer = init_tracer!(TracerOptions {
        ansi: args.ansi,
        default_directive: Some("info".to_owned()),
    });

    let metrics_handle = args
        .print_metrics
        .then(|| PrometheusBuilder::new().install_recorder())
        .transpose()
        .context("Cannot install metrics recorder")?;
    describe_detection_metrics();
    component_info_metric("sweep-to-events");

    let detection = match &args.mode {
        Mode::ActionPotential(settings) => {
            settings.validate()?;
            Detection::ActionPotential(settings.clone())
        }
        Mode::Template(parameters) => template_detection(parameters)?,
    };

    let input: SweepFile = read_json(&args.input)?;
    info!(
        "{}: read {} sweeps from {}",
        tracer.service_name(),
        input.sweeps.len(),
        args.input.display()
    );

    let sweeps = process_sweeps(&input.sweeps, &detection);
    let num_failed = sweeps.iter().filter(|s| s.error.is_some()).count();
    info!("Processed {} sweeps, {num_failed} failed", sweeps.len());

    let output = EventFile { sweeps };
    match &args.output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &output)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &output)?;
            writeln!(stdout)?;
        }
    }

    if let Some(handle) = metrics_handle {
        eprint!("{}", handle.render());
    }
    Ok(())
}
