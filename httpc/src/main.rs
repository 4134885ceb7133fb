use std::io::Write as _;

use clap::{
    Parser,
    builder::{Styles, styling::AnsiColor},
};
use color_eyre::eyre::WrapErr as _;
use httpc::{ClientBuilder, Context, Form, Method, RequestOption};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

fn clap_v3_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Green.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Sends a single HTTP request and prints the response.
#[derive(Debug, Parser)]
#[command(author, version, about, styles = clap_v3_styles())]
struct Args {
    /// Base URL the path is appended to, e.g. `https://example.org/api`.
    base_url: String,
    /// HTTP method.
    #[arg(value_parser = parse_method)]
    method: Method,
    /// Request path, appended verbatim to the base URL.
    path: String,
    /// Adds a request header. Can be repeated.
    #[arg(long = "header", num_args = 2, value_names = ["NAME", "VALUE"])]
    headers: Vec<String>,
    /// Adds a query parameter. Can be repeated.
    #[arg(long = "query", num_args = 2, value_names = ["KEY", "VALUE"])]
    query: Vec<String>,
    /// Sends this JSON document as the body.
    #[arg(long, conflicts_with = "form")]
    json: Option<String>,
    /// Adds a URL-encoded form field. Can be repeated.
    #[arg(long, value_parser = parse_key_value)]
    form: Vec<(String, String)>,
    /// Request timeout in milliseconds. Zero disables it.
    #[arg(long, default_value_t = httpc::DEFAULT_TIMEOUT_MS)]
    timeout: i64,
    /// Logging namespace of the client.
    #[arg(long, default_value = "httpc")]
    namespace: String,
    /// Logs raw request and response frames.
    #[arg(long)]
    dump: bool,
    /// Speaks HTTP/1.1 only.
    #[arg(long)]
    http1: bool,
    /// Sends header names exactly as given.
    #[arg(long)]
    verbatim_headers: bool,
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

fn init_tracing(dump: bool) -> color_eyre::Result<()> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    if dump {
        filter = filter.add_directive("httpc=debug".parse()?);
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}

impl Args {
    fn request_options(&self) -> color_eyre::Result<Vec<RequestOption>> {
        let mut options = vec![RequestOption::timeout(self.timeout)];
        if !self.headers.is_empty() {
            let args: Vec<&str> = self.headers.iter().map(String::as_str).collect();
            options.push(RequestOption::add_header(&args)?);
        }
        if !self.query.is_empty() {
            let args: Vec<&str> = self.query.iter().map(String::as_str).collect();
            options.push(RequestOption::add_query(&args)?);
        }
        if let Some(json) = &self.json {
            let value: serde_json::Value =
                serde_json::from_str(json).wrap_err("--json is not valid JSON")?;
            options.push(RequestOption::set_json_body(value));
        }
        if !self.form.is_empty() {
            let form: Form = self.form.iter().cloned().collect();
            options.push(RequestOption::set_url_encoded_form_body(form));
        }
        if self.verbatim_headers {
            options.push(RequestOption::disable_canonical_header());
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.dump)?;
    httpc::instrumentation::load_env();

    let client = ClientBuilder::new(args.base_url.as_str())
        .with_namespace(args.namespace.as_str())
        .with_log_dump(args.dump)
        .with_http2_disabled(args.http1)
        .build()
        .wrap_err("failed to build client")?;

    let options = args.request_options()?;
    let ctx = Context::background();
    let (response, body) = client
        .do_request(&ctx, args.method.clone(), &args.path, &options)
        .await
        .wrap_err("request failed")?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{:?} {}", response.version(), response.status())?;
    stdout.write_all(&body)?;
    if !body.ends_with(b"\n") {
        writeln!(stdout)?;
    }
    Ok(())
}
