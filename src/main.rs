use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ichabod::{ClientConfig, RenderClient, RenderResult, RequestParameters};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Talk to an Ichabod rendering server
#[derive(Parser)]
#[command(name = "ichabod", version, about)]
struct Cli {
    /// Server host (default: $ICHABOD_HOST or 127.0.0.1)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port (default: $ICHABOD_PORT or 9090)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Request timeout in seconds (default: $ICHABOD_TIMEOUT or 10)
    #[arg(long, global = true, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Do not probe /health before rendering
    #[arg(long, global = true)]
    skip_health_check: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the server answers /health with 200
    Health,
    /// Render a page to an image
    Rasterize {
        #[command(flatten)]
        source: Source,
        /// Viewport width in pixels
        #[arg(long)]
        width: u32,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Run a script in a page, then render it
    Evaluate {
        #[command(flatten)]
        script: Script,
        #[command(flatten)]
        source: Source,
        /// Viewport width in pixels (server default 1)
        #[arg(long)]
        width: Option<u32>,
        #[command(flatten)]
        opts: RenderOpts,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Source {
    /// Inline HTML document
    #[arg(long)]
    html: Option<String>,
    /// Read the HTML document from a file
    #[arg(long)]
    html_file: Option<PathBuf>,
    /// Load this URL instead of inline HTML
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Script {
    /// Script to evaluate
    #[arg(long)]
    js: Option<String>,
    /// Read the script from a file
    #[arg(long)]
    js_file: Option<PathBuf>,
}

#[derive(Args)]
struct RenderOpts {
    /// Viewport height in pixels
    #[arg(long)]
    height: Option<u32>,
    /// Where the server should write the image (default: a fresh temp file)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output image format
    #[arg(long)]
    format: Option<String>,
    /// Extra parameter forwarded to the server, as key=value
    #[arg(long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    ichabod::parse_timeout_secs(raw).map_err(|e| e.to_string())
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

impl Source {
    fn apply(self, params: RequestParameters) -> anyhow::Result<RequestParameters> {
        Ok(match (self.html, self.html_file, self.url) {
            (Some(html), _, _) => params.html(html),
            (_, Some(path), _) => {
                let html = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                params.html(html)
            }
            (_, _, Some(url)) => params.url(url),
            (None, None, None) => anyhow::bail!("one of --html, --html-file or --url is required"),
        })
    }
}

impl Script {
    fn load(self) -> anyhow::Result<String> {
        match (self.js, self.js_file) {
            (Some(js), _) => Ok(js),
            (_, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display())),
            (None, None) => anyhow::bail!("one of --js or --js-file is required"),
        }
    }
}

impl RenderOpts {
    fn apply(self, mut params: RequestParameters) -> RequestParameters {
        if let Some(height) = self.height {
            params = params.height(height);
        }
        if let Some(output) = self.output {
            params = params.output(output);
        }
        if let Some(format) = self.format {
            params = params.format(format);
        }
        params.extend(self.params);
        params
    }
}

fn print_result(result: &RenderResult) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(match result.conversion() {
        Some(false) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = ClientConfig::from_env().context("reading ICHABOD_* environment")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    }
    let check_health = !cli.skip_health_check;

    match cli.command {
        Command::Health => {
            let client = RenderClient::new(config, false)?;
            if client.is_healthy()? {
                println!("healthy");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("unhealthy");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Rasterize {
            source,
            width,
            opts,
        } => {
            let client = RenderClient::new(config, check_health)?;
            let params = opts.apply(source.apply(RequestParameters::new())?.width(width));
            let result = client.rasterize(params).context("rasterize request failed")?;
            print_result(&result)
        }
        Command::Evaluate {
            script,
            source,
            width,
            opts,
        } => {
            let client = RenderClient::new(config, check_health)?;
            let mut params = source.apply(RequestParameters::new().js(script.load()?))?;
            if let Some(width) = width {
                params = params.width(width);
            }
            let result = client
                .evaluate(opts.apply(params))
                .context("evaluate request failed")?;
            print_result(&result)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ichabod: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
