//! Command-line front end: resolves Uptobox links and downloads them in turn.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::download::build_download_client;
use crate::{
    AppConfig, Client, DownloadOutcome, DownloadProgress, Downloader, Error, FileCode, FileInfo,
    Result, RetryPolicy, SessionStats, SessionStatsBuilder, TokioSleeper, WaitingTokenOrchestrator,
    config::TOKEN_ENV,
};

pub use progress::{CliProgress, make_progress_bar, print_file_list, print_summary};

/// Number of codes sent per file-info request.
const INFO_BATCH: usize = 100;

/// Parsed command-line arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Links given as positional arguments.
    pub links: Vec<String>,
    /// API token, overriding config file and environment.
    pub token: Option<String>,
    /// Download directory.
    pub output_dir: Option<PathBuf>,
    /// Password for protected files.
    pub password: Option<String>,
    /// API host name.
    pub hostname: Option<String>,
    /// Use plain HTTP for API calls.
    pub http: bool,
    /// Overwrite existing files.
    pub force: bool,
    /// Explicit config file.
    pub config: Option<PathBuf>,
    /// Show informational output.
    pub verbose: bool,
    /// Show debug output, including raw API responses.
    pub debug: bool,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download the given links.
    Run(CliArgs),
    /// Print usage and exit.
    Help,
}

fn option_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| Error::Config(format!("missing value for {flag}")))
}

/// Parses arguments, program name excluded.
///
/// # Errors
///
/// Returns [`Error::Config`] for unknown options or missing option values.
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-t" | "--token" => parsed.token = Some(option_value(&mut args, &arg)?),
            "-o" | "--output-directory" => {
                parsed.output_dir = Some(option_value(&mut args, &arg)?.into());
            }
            "-p" | "--password" => parsed.password = Some(option_value(&mut args, &arg)?),
            "--hostname" => parsed.hostname = Some(option_value(&mut args, &arg)?),
            "--http" => parsed.http = true,
            "-f" | "--force" => parsed.force = true,
            "-c" | "--config" => parsed.config = Some(option_value(&mut args, &arg)?.into()),
            "-v" | "--verbose" => parsed.verbose = true,
            "-d" | "--debug" => parsed.debug = true,
            "-h" | "--help" => return Ok(Command::Help),
            link if !link.starts_with('-') => parsed.links.push(arg),
            _ => return Err(Error::Config(format!("unknown option: {arg}"))),
        }
    }

    Ok(Command::Run(parsed))
}

/// Prints usage to stderr.
pub fn print_usage() {
    eprintln!("Usage: uptobox-dl [OPTIONS] <link>...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <link>                      Uptobox file link or public folder link");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --token <TOKEN>         Uptobox API token");
    eprintln!("  -o, --output-directory <D>  Download directory (default: current directory)");
    eprintln!("  -p, --password <PASSWORD>   Password for protected files");
    eprintln!("      --hostname <HOST>       API host (default: uptobox.com)");
    eprintln!("      --http                  Use plain HTTP for API calls");
    eprintln!("  -f, --force                 Overwrite existing files");
    eprintln!("  -c, --config <FILE>         Config file to load");
    eprintln!("  -v, --verbose               Show file details and progress messages");
    eprintln!("  -d, --debug                 Show raw API traffic");
    eprintln!("  -h, --help                  Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {TOKEN_ENV}               API token, when not given with --token");
    eprintln!("  RUST_LOG                    Log filter, overrides -v and -d");
}

/// Default log filter for the given verbosity flags.
const fn log_level(args: &CliArgs) -> &'static str {
    if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    }
}

fn init_logging(args: &CliArgs) {
    let env = env_logger::Env::default().default_filter_or(log_level(args));
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

/// Loads the config file and layers command-line flags on top.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded.
pub fn resolve_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(token) = &args.token {
        config.api = config.api.with_token(token.clone());
    }
    if let Some(hostname) = &args.hostname {
        config.api = config.api.with_hostname(hostname.clone());
    }
    if args.http {
        config.api = config.api.with_https(false);
    }
    if let Some(dir) = &args.output_dir {
        config.download = config.download.with_output_dir(dir.clone());
    }
    if args.force {
        config.download = config.download.with_force_overwrite(true);
    }
    Ok(config)
}

/// Cancellation token fired by Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let guard = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping");
            guard.cancel();
        }
    });
    token
}

/// Everything needed to turn a file code into a file on disk.
struct Session<'a> {
    client: &'a Client,
    downloader: &'a Downloader,
    config: &'a AppConfig,
    password: Option<&'a str>,
    progress: Arc<dyn DownloadProgress>,
    cancel: CancellationToken,
}

impl Session<'_> {
    fn api_policy(&self) -> RetryPolicy {
        self.config.retry.api_policy()
    }

    /// Waiting token, then download link, each under the API retry policy.
    async fn resolve(&self, code: &FileCode) -> Result<reqwest::Url> {
        let orchestrator = WaitingTokenOrchestrator::new(self.client)
            .with_max_attempts(self.config.retry.waiting_token_max_attempts)
            .with_cancellation(self.cancel.clone())
            .with_progress(Arc::clone(&self.progress));

        let what = format!("waiting token for {code}");
        let waiting = self
            .api_policy()
            .run_cancellable(&TokioSleeper, Some(&self.cancel), &what, || {
                orchestrator.acquire(code, self.password)
            })
            .await?;

        let what = format!("download link for {code}");
        self.api_policy()
            .run_cancellable(&TokioSleeper, Some(&self.cancel), &what, || {
                self.client.get_download_link(code, &waiting)
            })
            .await
    }

    async fn fetch(&self, link: &reqwest::Url) -> Result<DownloadOutcome> {
        let what = format!("download of {link}");
        self.config
            .retry
            .download_policy()
            .run_cancellable(&TokioSleeper, Some(&self.cancel), &what, || {
                self.downloader
                    .download(link, &self.progress, Some(self.cancel.clone()))
            })
            .await
    }

    /// Downloads every code in order, counting outcomes.
    async fn download_all(&self, codes: &[FileCode]) -> SessionStats {
        let mut stats = SessionStatsBuilder::new();

        for (index, code) in codes.iter().enumerate() {
            log::info!("[{}/{}] {code}", index + 1, codes.len());

            let link = match self.resolve(code).await {
                Ok(link) => link,
                Err(Error::Cancelled) => break,
                Err(e) => {
                    self.progress.on_error(code.as_str(), &e.to_string());
                    stats.add_failed();
                    continue;
                }
            };

            match self.fetch(&link).await {
                Ok(DownloadOutcome::Downloaded { stats: file, .. }) => stats.add_download(&file),
                Ok(DownloadOutcome::Skipped { path }) => {
                    println!("  {} already exists, skipping", path.display());
                    stats.add_skipped();
                }
                Err(Error::Cancelled) => break,
                // The downloader reports its own failures.
                Err(_) => stats.add_failed(),
            }
        }

        stats.build()
    }
}

/// Fetches file details in batches; failures only lose the listing.
async fn file_details(client: &Client, codes: &[FileCode]) -> Vec<FileInfo> {
    let mut infos = Vec::with_capacity(codes.len());
    for batch in codes.chunks(INFO_BATCH) {
        match client.get_file_info(batch).await {
            Ok(batch) => infos.extend(batch),
            Err(e) => {
                progress::warn(&format!("Could not fetch file details: {e}"));
                break;
            }
        }
    }
    infos
}

/// Runs the downloader for already-parsed arguments.
///
/// # Errors
///
/// Returns an error if configuration is invalid, a link cannot be resolved
/// into file codes, or the run is interrupted before downloads start.
pub async fn run_with(args: CliArgs) -> Result<SessionStats> {
    init_logging(&args);

    if args.links.is_empty() {
        print_usage();
        return Err(Error::Config("no links given".to_string()));
    }

    let config = resolve_config(&args)?;
    let client = Client::new(&config.api)?;
    let http = build_download_client(config.api.timeout())?;
    let downloader = Downloader::new(http, config.download.clone());
    let cancel = ctrl_c_token();

    println!("Resolving {} link(s)...", args.links.len());
    let api_policy = config.retry.api_policy();
    let collected = tokio::select! {
        collected = api_policy.run_cancellable(&TokioSleeper, Some(&cancel), "link collection", || {
            crate::collect_file_codes(&client, &args.links)
        }) => collected?,
        () = cancel.cancelled() => return Err(Error::Cancelled),
    };
    println!(
        "{} file(s) to download (from {} direct link(s) and {} folder(s))",
        collected.file_codes.len(),
        collected.direct_links,
        collected.folders
    );

    if args.verbose {
        print_file_list(&file_details(&client, &collected.file_codes).await);
    }

    let session = Session {
        client: &client,
        downloader: &downloader,
        config: &config,
        password: args.password.as_deref(),
        progress: Arc::new(CliProgress::new()),
        cancel: cancel.clone(),
    };
    let stats = session.download_all(&collected.file_codes).await;
    print_summary(&stats);

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(stats)
}

/// Parses process arguments and runs.
///
/// Help requests print usage and return empty statistics.
///
/// # Errors
///
/// See [`run_with`]; also fails on invalid arguments.
pub async fn run() -> Result<SessionStats> {
    match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(args)) => run_with(args).await,
        Ok(Command::Help) => {
            print_usage();
            Ok(SessionStats::new())
        }
        Err(e) => {
            print_usage();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiConfig, DownloadConfig, NoProgress, RetryConfig};
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args(args.iter().map(ToString::to_string))
    }

    fn parse_run(args: &[&str]) -> CliArgs {
        match parse(args).unwrap() {
            Command::Run(args) => args,
            Command::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn parses_links_and_flags() {
        let args = parse_run(&[
            "-t",
            "tok",
            "https://uptobox.com/abc",
            "--output-directory",
            "out",
            "--password",
            "secret",
            "--hostname",
            "uptostream.com",
            "--http",
            "-f",
            "-v",
            "https://uptobox.com/user_public?hash=h&folder=1",
        ]);
        assert_eq!(
            args.links,
            vec![
                "https://uptobox.com/abc".to_string(),
                "https://uptobox.com/user_public?hash=h&folder=1".to_string()
            ]
        );
        assert_eq!(args.token.as_deref(), Some("tok"));
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.password.as_deref(), Some("secret"));
        assert_eq!(args.hostname.as_deref(), Some("uptostream.com"));
        assert!(args.http);
        assert!(args.force);
        assert!(args.verbose);
        assert!(!args.debug);
    }

    #[test]
    fn help_wins() {
        assert_eq!(parse(&["link", "--help"]).unwrap(), Command::Help);
        assert_eq!(parse(&["-h"]).unwrap(), Command::Help);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = parse(&["--bogus"]).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: unknown option: --bogus");
    }

    #[test]
    fn missing_value_is_rejected() {
        assert!(matches!(parse(&["link", "--token"]), Err(Error::Config(_))));
    }

    #[test]
    fn verbosity_picks_log_level() {
        assert_eq!(log_level(&CliArgs::default()), "warn");
        let verbose = CliArgs {
            verbose: true,
            ..CliArgs::default()
        };
        assert_eq!(log_level(&verbose), "info");
        let debug = CliArgs {
            verbose: true,
            debug: true,
            ..CliArgs::default()
        };
        assert_eq!(log_level(&debug), "debug");
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\ntoken = \"from-file\"\nhostname = \"file.example\"\n\n[download]\noutput_dir = \"file-out\"\n",
        )
        .unwrap();

        let args = CliArgs {
            token: Some("from-flag".to_string()),
            output_dir: Some(PathBuf::from("flag-out")),
            http: true,
            force: true,
            config: Some(path),
            ..CliArgs::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.api.token.as_deref(), Some("from-flag"));
        assert_eq!(config.api.hostname, "file.example");
        assert_eq!(config.api.base_url(), "http://file.example");
        assert_eq!(config.download.output_dir, PathBuf::from("flag-out"));
        assert!(config.download.force_overwrite);
    }

    fn envelope(status_code: i64, data: &serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": status_code,
            "message": "",
            "data": data,
        }))
    }

    /// Serves a ready waiting token and a download link for `code`.
    async fn mount_file(server: &MockServer, code: &str, file: &str) {
        Mock::given(method("GET"))
            .and(path("/api/link"))
            .and(query_param("file_code", code))
            .and(query_param_is_missing("waitingToken"))
            .respond_with(envelope(0, &json!({"waiting": 0, "waitingToken": "wt"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/link"))
            .and(query_param("file_code", code))
            .and(query_param("waitingToken", "wt"))
            .respond_with(envelope(
                0,
                &json!({"dlLink": format!("{}/dl/{file}", server.uri())}),
            ))
            .mount(server)
            .await;
    }

    fn test_config(server: &MockServer, dir: &TempDir) -> AppConfig {
        AppConfig {
            api: ApiConfig::default()
                .with_https(false)
                .with_hostname(server.address().to_string())
                .with_token("userToken"),
            download: DownloadConfig::new().with_output_dir(dir.path()),
            retry: RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            },
        }
    }

    fn codes(raw: &[&str]) -> Vec<FileCode> {
        raw.iter().copied().map(FileCode::from).collect()
    }

    #[tokio::test]
    async fn download_all_counts_each_outcome_and_keeps_going() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/link"))
            .and(query_param("file_code", "bad"))
            .respond_with(envelope(7, &json!("bad file code")))
            .mount(&server)
            .await;
        mount_file(&server, "good", "good.bin").await;
        mount_file(&server, "gone", "gone.bin").await;
        mount_file(&server, "have", "have.bin").await;
        Mock::given(method("GET"))
            .and(path("/dl/good.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dl/gone.bin"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("have.bin"), "old").unwrap();
        let config = test_config(&server, &dir);
        let client = Client::new(&config.api).unwrap();
        let downloader = Downloader::new(reqwest::Client::new(), config.download.clone());
        let session = Session {
            client: &client,
            downloader: &downloader,
            config: &config,
            password: None,
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        };

        let stats = session
            .download_all(&codes(&["bad", "good", "gone", "have"]))
            .await;

        assert_eq!(stats.files_failed, 2);
        assert_eq!(stats.files_downloaded, 1);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.total_bytes, 7);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("good.bin")).unwrap(),
            "payload"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("have.bin")).unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn download_all_stops_when_cancelled() {
        let server = MockServer::start().await;
        mount_file(&server, "good", "good.bin").await;

        let dir = TempDir::new().unwrap();
        let config = test_config(&server, &dir);
        let client = Client::new(&config.api).unwrap();
        let downloader = Downloader::new(reqwest::Client::new(), config.download.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let session = Session {
            client: &client,
            downloader: &downloader,
            config: &config,
            password: None,
            progress: Arc::new(NoProgress),
            cancel,
        };

        let stats = session.download_all(&codes(&["good", "good"])).await;

        assert_eq!(stats.files_downloaded, 0);
        assert_eq!(stats.files_failed, 0);
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(!dir.path().join("good.bin").exists());
    }
}
