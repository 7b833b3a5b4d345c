mod server;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use minor_shield_core::pipeline::infrastructure::http_pipeline_factory::build_http_pipeline;
use minor_shield_core::pipeline::pipeline_config::{FailurePolicy, PipelineConfig, RegionStrategy};
use minor_shield_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use minor_shield_core::shared::constants::{
    DEFAULT_ANONYMIZATION_ENDPOINT, DEFAULT_CLASSIFICATION_ENDPOINT, DEFAULT_COLLABORATOR_TIMEOUT,
    DEFAULT_DETECTION_ENDPOINT, DEFAULT_FALLBACK_BLUR_KERNEL, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_REQUEST_TIMEOUT, IMAGE_EXTENSIONS,
};

use crate::server::AppState;

/// Anonymizes the faces of minors in photographs.
#[derive(Parser)]
#[command(name = "minor-shield", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP engine (POST /process, GET /health).
    Serve(ServeArgs),
    /// Anonymize a single image file.
    Process(ProcessArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "MINOR_SHIELD_BIND", default_value = "0.0.0.0:5000")]
    bind: String,

    /// Whole-request time limit in seconds.
    #[arg(long, env = "MINOR_SHIELD_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    request_timeout_secs: u64,

    /// Largest accepted upload, in bytes.
    #[arg(long, env = "MINOR_SHIELD_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args)]
struct ProcessArgs {
    /// Input image file.
    input: PathBuf,

    /// Output file (always JPEG).
    output: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args)]
struct PipelineArgs {
    /// Face detection service endpoint.
    #[arg(long, env = "MINOR_SHIELD_DETECTION_URL", default_value = DEFAULT_DETECTION_ENDPOINT)]
    detection_url: String,

    /// Age classification service endpoint.
    #[arg(long, env = "MINOR_SHIELD_CLASSIFICATION_URL", default_value = DEFAULT_CLASSIFICATION_ENDPOINT)]
    classification_url: String,

    /// Face anonymization service endpoint.
    #[arg(long, env = "MINOR_SHIELD_ANONYMIZATION_URL", default_value = DEFAULT_ANONYMIZATION_ENDPOINT)]
    anonymization_url: String,

    /// Per-call collaborator timeout in seconds.
    #[arg(long, env = "MINOR_SHIELD_TIMEOUT_SECS", default_value_t = DEFAULT_COLLABORATOR_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// What to do with a face when classification or anonymization fails:
    /// fail-open or fail-closed.
    #[arg(long, env = "MINOR_SHIELD_FAILURE_POLICY", default_value_t = FailurePolicy::FailOpen)]
    failure_policy: FailurePolicy,

    /// Faces processed in parallel per request (1 = sequential).
    #[arg(long, env = "MINOR_SHIELD_WORKERS", default_value = "1")]
    workers: usize,

    /// Gaussian kernel for local redaction under fail-closed (must be odd).
    #[arg(long, env = "MINOR_SHIELD_FALLBACK_BLUR", default_value_t = DEFAULT_FALLBACK_BLUR_KERNEL)]
    fallback_blur: usize,

    /// JPEG quality for crops and output (1-100).
    #[arg(long, env = "MINOR_SHIELD_JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY)]
    jpeg_quality: u8,
}

impl PipelineArgs {
    fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            detection_endpoint: self.detection_url.clone(),
            classification_endpoint: self.classification_url.clone(),
            anonymization_endpoint: self.anonymization_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            failure_policy: self.failure_policy,
            region_strategy: RegionStrategy::from_workers(self.workers),
            fallback_blur_kernel: self.fallback_blur,
            jpeg_quality: self.jpeg_quality,
        }
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.timeout_secs == 0 {
            return Err("Timeout must be at least 1 second".into());
        }
        if self.fallback_blur == 0 || self.fallback_blur % 2 == 0 {
            return Err(format!(
                "Fallback blur must be a positive odd integer, got {}",
                self.fallback_blur
            )
            .into());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )
            .into());
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Serve(args) => run_server(args),
        Command::Process(args) => run_process(args),
    }
}

fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    args.pipeline.validate()?;
    if args.request_timeout_secs == 0 {
        return Err("Request timeout must be at least 1 second".into());
    }

    // The HTTP clients are blocking; build them here and keep a handle so
    // the last reference is dropped after the runtime has shut down.
    let config = args.pipeline.to_config();
    let use_case = Arc::new(build_http_pipeline(&config)?);
    log::info!(
        "Pipeline ready ({}, {:?})",
        config.failure_policy,
        config.region_strategy
    );

    let state = AppState::new(
        use_case.clone(),
        Duration::from_secs(args.request_timeout_secs),
    );
    let runtime = tokio::runtime::Runtime::new()?;
    let served = runtime.block_on(server::serve(&args.bind, state, args.max_upload_bytes));
    drop(runtime);
    drop(use_case);
    served?;
    Ok(())
}

fn run_process(args: ProcessArgs) -> Result<(), Box<dyn std::error::Error>> {
    args.pipeline.validate()?;
    validate_input(&args.input)?;
    if !has_extension(&args.output, &["jpg", "jpeg"]) {
        log::warn!(
            "Output is JPEG-encoded regardless of extension: {}",
            args.output.display()
        );
    }

    let image_bytes = std::fs::read(&args.input)?;
    let use_case = build_http_pipeline(&args.pipeline.to_config())?;

    let mut logger = LogPipelineLogger::new();
    let output = use_case.execute(&image_bytes, &mut logger)?;
    logger.summary();

    std::fs::write(&args.output, &output.image)?;
    log::info!(
        "Output written to {} ({}/{} faces modified)",
        args.output.display(),
        output.modified_regions(),
        output.regions.len()
    );
    if output.failed_regions() > 0 {
        log::warn!(
            "{} face(s) could not be processed; see warnings above",
            output.failed_regions()
        );
    }
    Ok(())
}

fn validate_input(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    if !has_extension(input, IMAGE_EXTENSIONS) {
        return Err(format!(
            "Unsupported input type: {} (expected one of {})",
            input.display(),
            IMAGE_EXTENSIONS.join(", ")
        )
        .into());
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}/detect")
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_process_args_and_overrides() {
        let cli = parse(&[
            "minor-shield",
            "process",
            "in.jpg",
            "out.jpg",
            "--failure-policy",
            "fail-closed",
            "--workers",
            "4",
            "--timeout-secs",
            "3",
        ]);
        let Command::Process(args) = cli.command else {
            panic!("expected process subcommand");
        };
        let config = args.pipeline.to_config();

        assert_eq!(args.input, PathBuf::from("in.jpg"));
        assert_eq!(config.failure_policy, FailurePolicy::FailClosed);
        assert_eq!(config.region_strategy, RegionStrategy::Concurrent { workers: 4 });
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_serve_flags() {
        let cli = parse(&[
            "minor-shield",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--request-timeout-secs",
            "12",
            "--detection-url",
            "http://localhost:1/detect",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };

        assert_eq!(args.bind, "127.0.0.1:9000");
        assert_eq!(args.request_timeout_secs, 12);
        assert_eq!(args.pipeline.detection_url, "http://localhost:1/detect");
    }

    #[test]
    fn test_unknown_failure_policy_is_rejected() {
        let result = Cli::try_parse_from([
            "minor-shield",
            "process",
            "in.jpg",
            "out.jpg",
            "--failure-policy",
            "sometimes",
        ]);
        assert!(result.is_err());
    }

    #[rstest]
    #[case::even_blur(&["--fallback-blur", "50"])]
    #[case::zero_timeout(&["--timeout-secs", "0"])]
    #[case::zero_quality(&["--jpeg-quality", "0"])]
    fn test_invalid_pipeline_args(#[case] extra: &[&str]) {
        let mut args = vec!["minor-shield", "process", "in.jpg", "out.jpg"];
        args.extend_from_slice(extra);
        let Command::Process(args) = parse(&args).command else {
            panic!("expected process subcommand");
        };
        assert!(args.pipeline.validate().is_err());
    }

    #[rstest]
    #[case("photo.jpg", true)]
    #[case("photo.JPEG", true)]
    #[case("scan.png", true)]
    #[case("anim.gif", true)]
    #[case("clip.mp4", false)]
    #[case("noext", false)]
    fn test_image_extensions(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(has_extension(Path::new(name), IMAGE_EXTENSIONS), expected);
    }

    #[test]
    fn test_missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_input(&dir.path().join("absent.jpg")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_process_fails_when_detection_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.jpg");
        image::RgbImage::from_pixel(32, 32, image::Rgb([120, 80, 40]))
            .save(&input)
            .unwrap();

        let detection_url = closed_port_url();
        let cli = parse(&[
            "minor-shield",
            "process",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--detection-url",
            &detection_url,
            "--timeout-secs",
            "2",
        ]);

        let err = run(cli).unwrap_err();

        assert!(err.to_string().contains("face detection failed"));
        assert!(!output.exists());
    }
}
