use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Spinal imaging validation pipeline
#[derive(Parser, Debug)]
#[command(
    name = "spinepipe",
    about = "Spinal imaging validation pipeline: detect vertebrae, grade discs, write a report",
    version,
    author,
    long_about = "spinepipe loads a sagittal scan from a directory of slice images, runs \
                  vertebra detection, derives the intervertebral disc regions between \
                  consecutive vertebrae, grades every disc and writes the grades to a CSV \
                  report. Detection and grading run on a remote inference service."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the pipeline on a scan directory",
        long_about = "Loads the scan, detects vertebrae, extracts and grades every disc and \
                      writes the report.\n\n\
                      Examples:\n  \
                      spinepipe run scans/patient-07\n  \
                      spinepipe run scans/patient-07 -o out/patient-07.csv\n  \
                      spinepipe run scans/patient-07 --override SliceThickness=2\n  \
                      spinepipe run scans/patient-07 --overrides geometry.json --require-complete-metadata"
    )]
    Run(RunArgs),

    #[command(
        about = "Check the inference service",
        long_about = "Checks that the inference service is reachable and lists the devices \
                      it can run on.\n\n\
                      Examples:\n  \
                      spinepipe health\n  \
                      spinepipe health --endpoint http://gpu-box:8731 --format json"
    )]
    Health(HealthArgs),

    #[command(about = "Show effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "SCAN_DIR", help = "Directory holding the slice images of one series")]
    pub scan_dir: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Report path (defaults to <output dir>/<scan name>.csv)"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long = "override",
        value_name = "KEY=VALUES",
        help = "Override a geometry field, e.g. PixelSpacing=0.5,0.5 (repeatable)"
    )]
    pub overrides: Vec<String>,

    #[arg(
        long = "overrides",
        value_name = "FILE",
        help = "JSON file mapping geometry fields to values"
    )]
    pub overrides_file: Option<PathBuf>,

    #[arg(
        long,
        help = "Fail unless every geometry field is defined after overrides"
    )]
    pub require_complete_metadata: bool,

    #[arg(long, value_name = "DEVICE", help = "Compute device: auto, cpu, cuda, cuda:N")]
    pub device: Option<String>,

    #[arg(long, value_name = "URL", help = "Inference service base URL")]
    pub endpoint: Option<String>,

    #[arg(long, value_name = "SECONDS", help = "Inference request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(long, value_name = "URL", help = "Inference service base URL")]
    pub endpoint: Option<String>,

    #[arg(long, value_name = "DEVICE", help = "Device to check availability for")]
    pub device: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_run_args() {
        let args = CliArgs::parse_from(["spinepipe", "run", "/data/scan"]);
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.scan_dir, PathBuf::from("/data/scan"));
                assert_eq!(run.format, OutputFormatArg::Human);
                assert!(run.output.is_none());
                assert!(run.overrides.is_empty());
                assert!(!run.require_complete_metadata);
                assert!(run.device.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let args = CliArgs::parse_from([
            "spinepipe",
            "run",
            "/data/scan",
            "-o",
            "out/report.csv",
            "--override",
            "PixelSpacing=0.5,0.5",
            "--override",
            "slice_thickness=2",
            "--overrides",
            "geometry.json",
            "--require-complete-metadata",
            "--device",
            "cuda:1",
            "--endpoint",
            "http://gpu:8731",
            "--timeout",
            "30",
            "--format",
            "json",
        ]);

        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.output, Some(PathBuf::from("out/report.csv")));
                assert_eq!(
                    run.overrides,
                    vec!["PixelSpacing=0.5,0.5".to_string(), "slice_thickness=2".to_string()]
                );
                assert_eq!(run.overrides_file, Some(PathBuf::from("geometry.json")));
                assert!(run.require_complete_metadata);
                assert_eq!(run.device.as_deref(), Some("cuda:1"));
                assert_eq!(run.endpoint.as_deref(), Some("http://gpu:8731"));
                assert_eq!(run.timeout, Some(30));
                assert_eq!(run.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_requires_scan_dir() {
        assert!(CliArgs::try_parse_from(["spinepipe", "run"]).is_err());
    }

    #[test]
    fn test_health_and_config_commands() {
        let args = CliArgs::parse_from(["spinepipe", "health", "--format", "yaml"]);
        assert!(matches!(
            args.command,
            Commands::Health(HealthArgs {
                format: OutputFormatArg::Yaml,
                ..
            })
        ));

        let args = CliArgs::parse_from(["spinepipe", "config"]);
        assert!(matches!(args.command, Commands::Config(_)));
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["spinepipe", "--log-level", "debug", "config"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));

        let args = CliArgs::parse_from(["spinepipe", "config", "-q"]);
        assert!(args.quiet);

        assert!(CliArgs::try_parse_from(["spinepipe", "-v", "-q", "config"]).is_err());
    }
}
