use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use zoyla_report::config::{
    CustomHeader, FormField, HttpMethod, TestConfig, DEFAULT_CONCURRENCY, DEFAULT_NUM_REQUESTS,
    DEFAULT_TIMEOUT_SECS,
};
use zoyla_runner::settings::{Panel, ThemeMode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct ZoylaArgs {
    /// TOML configuration file, `zoyla.toml` in the working directory is used when present
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ZoylaCommand,
}

#[derive(Subcommand, Debug)]
pub enum ZoylaCommand {
    #[command(about = "Run a load test against a URL", visible_alias = "r")]
    Run(RunArgs),

    #[command(
        about = "Suggest a concurrency level",
        long_about = "Suggest a concurrency level from CPU cores, protocol, keep-alive, target locality and past runs against the same URL",
        visible_alias = "rec"
    )]
    Recommend(TestArgs),

    #[command(subcommand, about = "Browse, export and delete past runs")]
    History(HistoryCommand),

    #[command(subcommand, about = "Show or change layout and theme preferences")]
    Settings(SettingsCommand),
}

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Target URL, http or https
    pub url: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value_t = HttpMethod::Get)]
    pub method: HttpMethod,

    /// Total number of requests
    #[arg(long, short = 'n', default_value_t = DEFAULT_NUM_REQUESTS)]
    pub requests: u32,

    /// Number of requests in flight at once
    #[arg(long, short = 'p', default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: u32,

    /// Use HTTP/2
    #[arg(long)]
    pub http2: bool,

    /// Request header in `Name: value` form, repeatable
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<CustomHeader>,

    /// Do not follow redirects
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Per-request timeout in seconds, 0 disables it
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: f64,

    /// Maximum requests per second, 0 means unlimited
    #[arg(long, default_value_t = 0.0)]
    pub rate_limit: f64,

    /// Send a random User-Agent with every request
    #[arg(long)]
    pub randomize_user_agent: bool,

    /// Send random browser-like headers with every request
    #[arg(long)]
    pub randomize_headers: bool,

    /// Append a unique query parameter to every request
    #[arg(long)]
    pub cache_buster: bool,

    /// Open a new connection for every request
    #[arg(long)]
    pub no_keep_alive: bool,

    /// Engine worker threads, 0 uses all cores
    #[arg(long, default_value_t = 0)]
    pub workers: u32,

    /// HTTP or SOCKS proxy URL
    #[arg(long)]
    pub proxy: Option<String>,

    /// Raw request body
    #[arg(long, short = 'd', conflicts_with = "form")]
    pub body: Option<String>,

    /// Content-Type of the raw body
    #[arg(long)]
    pub content_type: Option<String>,

    /// Multipart field in `name=value` or `name=@path` form, repeatable
    #[arg(long, short = 'F')]
    pub form: Vec<FormField>,
}

impl TestArgs {
    pub fn to_config(&self) -> TestConfig {
        TestConfig {
            url: self.url.trim().to_owned(),
            method: self.method,
            num_requests: self.requests,
            concurrency: self.concurrency,
            use_http2: self.http2,
            headers: self.headers.clone(),
            follow_redirects: !self.no_follow_redirects,
            timeout_secs: self.timeout,
            rate_limit: self.rate_limit,
            randomize_user_agent: self.randomize_user_agent,
            randomize_headers: self.randomize_headers,
            add_cache_buster: self.cache_buster,
            disable_keep_alive: self.no_keep_alive,
            worker_threads: self.workers,
            proxy_url: self.proxy.clone().unwrap_or_default(),
            body: self.body.clone(),
            payload_content_type: self.content_type.clone(),
            form_fields: (!self.form.is_empty()).then(|| self.form.clone()),
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub test: TestArgs,

    /// Write the full result as JSON to this file
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write per-request results as CSV to this file
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Render HTML charts into this directory
    #[arg(long)]
    pub charts_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    #[command(about = "List past runs, newest first", visible_alias = "ls")]
    List,

    #[command(about = "Show the summary of a past run")]
    Show {
        /// Entry id or a unique prefix of it
        id: String,
    },

    #[command(about = "Delete a past run", visible_alias = "rm")]
    Delete {
        /// Entry id or a unique prefix of it
        id: String,
    },

    #[command(about = "Delete all past runs")]
    Clear,

    #[command(about = "Export a past run as JSON or CSV")]
    Export {
        /// Entry id or a unique prefix of it
        id: String,

        #[arg(long, short = 'f', value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Destination file
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    #[command(about = "Render HTML charts of a past run")]
    Charts {
        /// Entry id or a unique prefix of it
        id: String,

        /// Destination directory
        #[arg(long, short = 'o', default_value = "charts")]
        output_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    #[command(about = "Show layout and theme preferences")]
    Show,

    #[command(about = "Set the color theme")]
    Theme {
        #[arg(value_enum)]
        theme: ThemeMode,
    },

    #[command(about = "Show or hide a result panel")]
    Panel {
        #[arg(value_enum)]
        panel: Panel,

        #[arg(action = ArgAction::Set)]
        visible: bool,
    },
}
