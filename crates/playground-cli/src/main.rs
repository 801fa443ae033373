//! Gleam playground command line front-end
//!
//! Drives the playground core against a running service: every subcommand
//! maps onto one dispatcher, `check` and `watch` run the local analyzer.

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use playground_client::config::{ENV_API_KEY, ENV_API_RUN, ENV_API_SHARE, ENV_SERVER_URL};
use playground_client::{ClientConfig, RemoteServiceClient};
use playground_core::{
    Action, ActionDispatchOrchestrator, AnalyzerSlot, CursorStyle, Diagnostic, DirectoryFileSink,
    DispatchOutcome, EditorPreferencesPatch, EditorSession, EvalEvent, EvalEventKind,
    FileSettingsStore, InMemorySettingsStore, LintAnalyzerFactory, LocalAnalyzer, MarkerSink,
    ModelId, Notifier, PlaygroundApi, RuntimeKind, Severity, SettingsStore, State, Store,
    SuggestionQuery, ANALYZE_DEBOUNCE_TIME,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let file_arg = || {
        Arg::new("file")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Gleam source file")
    };

    Command::new("playground")
        .version(playground_core::VERSION)
        .about("Gleam playground: run, format, share and check Gleam code")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("server")
                .long("server")
                .env(ENV_SERVER_URL)
                .global(true)
                .help("Playground service origin"),
        )
        .arg(
            Arg::new("api-share")
                .long("api-share")
                .env(ENV_API_SHARE)
                .global(true)
                .help("Path prefix of the snippet service"),
        )
        .arg(
            Arg::new("api-run")
                .long("api-run")
                .env(ENV_API_RUN)
                .global(true)
                .help("Path prefix of the build service"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .env(ENV_API_KEY)
                .hide_env_values(true)
                .global(true)
                .help("Key sent as x-api-key"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(u64))
                .global(true)
                .help("Request timeout in seconds"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Settings file (defaults to the user config directory)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Raise log level (-v info, -vv debug, -vvv trace)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("run")
                .about("Build and run a file")
                .arg(file_arg())
                .arg(
                    Arg::new("no-format")
                        .long("no-format")
                        .action(ArgAction::SetTrue)
                        .help("Skip formatting for this run"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write formatted code back to the file"),
                )
                .arg(
                    Arg::new("replay")
                        .long("replay")
                        .action(ArgAction::SetTrue)
                        .help("Honor event delays when printing output"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the raw run result as JSON"),
                ),
        )
        .subcommand(
            Command::new("format")
                .about("Format a file")
                .arg(file_arg())
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write formatted code back to the file"),
                ),
        )
        .subcommand(
            Command::new("share")
                .about("Share a file as a snippet")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("fetch")
                .about("Fetch a shared snippet")
                .arg(
                    Arg::new("id")
                        .help("Snippet id or /snippet/<id> path; omit for the demo program"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Save the snippet into this directory instead of printing it"),
                ),
        )
        .subcommand(Command::new("version").about("Print the service version"))
        .subcommand(
            Command::new("suggest")
                .about("Ask the service for completions")
                .arg(Arg::new("package").long("package").help("Package name"))
                .arg(Arg::new("value").long("value").help("Text to complete")),
        )
        .subcommand(
            Command::new("check")
                .about("Run the local analyzer once")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("watch")
                .about("Re-analyze a file whenever it changes")
                .arg(file_arg())
                .arg(
                    Arg::new("debounce")
                        .long("debounce")
                        .value_parser(value_parser!(u64))
                        .help("Debounce window in milliseconds"),
                )
                .arg(
                    Arg::new("poll")
                        .long("poll")
                        .default_value("200")
                        .value_parser(value_parser!(u64))
                        .help("File polling interval in milliseconds"),
                ),
        )
        .subcommand(
            Command::new("settings")
                .about("Show or change persisted settings")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print current settings"))
                .subcommand(Command::new("toggle-theme").about("Flip dark mode"))
                .subcommand(
                    Command::new("build")
                        .about("Change runtime and auto-format")
                        .arg(Arg::new("runtime").long("runtime").help("Runtime kind"))
                        .arg(
                            Arg::new("auto-format")
                                .long("auto-format")
                                .value_parser(value_parser!(bool))
                                .help("Format on every run"),
                        ),
                )
                .subcommand(
                    Command::new("editor")
                        .about("Change editor preferences")
                        .arg(
                            Arg::new("minimap")
                                .long("minimap")
                                .value_parser(value_parser!(bool)),
                        )
                        .arg(
                            Arg::new("font-ligatures")
                                .long("font-ligatures")
                                .value_parser(value_parser!(bool)),
                        )
                        .arg(Arg::new("font-family").long("font-family"))
                        .arg(
                            Arg::new("reset-font")
                                .long("reset-font")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("font-family"),
                        )
                        .arg(
                            Arg::new("cursor-style")
                                .long("cursor-style")
                                .value_parser([
                                    "line",
                                    "block",
                                    "underline",
                                    "line-thin",
                                    "block-outline",
                                    "underline-thin",
                                ]),
                        ),
                ),
        )
}

fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn client_config(matches: &ArgMatches) -> ClientConfig {
    let mut config = ClientConfig::new();
    if let Some(server) = matches.get_one::<String>("server") {
        config.server_url.clone_from(server);
    }
    if let Some(share) = matches.get_one::<String>("api-share") {
        config.api_share.clone_from(share);
    }
    if let Some(run) = matches.get_one::<String>("api-run") {
        config.api_run.clone_from(run);
    }
    if let Some(key) = matches.get_one::<String>("api-key") {
        config.api_key.clone_from(key);
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config.timeout = Duration::from_secs(*secs);
    }
    config
}

fn settings_store(matches: &ArgMatches) -> anyhow::Result<Arc<dyn SettingsStore>> {
    let store = match matches.get_one::<PathBuf>("settings") {
        Some(path) => FileSettingsStore::new(path),
        None => match FileSettingsStore::at_default_location() {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("{}, settings will not be persisted", e);
                return Ok(Arc::new(InMemorySettingsStore::default()));
            }
        },
    };
    store
        .load()
        .with_context(|| format!("failed to load settings from {}", store.path().display()))?;
    Ok(Arc::new(store))
}

/// Prints alerts on stderr
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn alert(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Prints markers on stderr, prefixed with the watched file
struct StderrMarkers {
    file: String,
}

impl MarkerSink for StderrMarkers {
    fn set_markers(&self, _model: &ModelId, markers: Vec<Diagnostic>) {
        if markers.is_empty() {
            eprintln!("{}: no problems", self.file);
        }
        for marker in markers {
            eprintln!("{}:{}", self.file, marker);
        }
    }
}

struct App {
    config: ClientConfig,
    api: Arc<dyn PlaygroundApi>,
    settings: Arc<dyn SettingsStore>,
}

impl App {
    fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let config = client_config(matches);
        let client =
            RemoteServiceClient::new(config.clone()).context("invalid service configuration")?;
        Ok(Self {
            config,
            api: Arc::new(client),
            settings: settings_store(matches)?,
        })
    }

    /// Orchestrator whose exports land in `export_dir`
    fn orchestrator(&self, export_dir: &Path) -> ActionDispatchOrchestrator {
        let store = Store::new(State::from_settings(&self.settings.get()));
        ActionDispatchOrchestrator::new(store, Arc::clone(&self.api), Arc::clone(&self.settings))
            .with_notifier(Arc::new(StderrNotifier))
            .with_file_sink(Arc::new(DirectoryFileSink::new(export_dir)))
    }
}

fn parent_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn ensure_completed(
    outcome: DispatchOutcome,
    orchestrator: &ActionDispatchOrchestrator,
) -> anyhow::Result<()> {
    match outcome {
        DispatchOutcome::Completed => Ok(()),
        DispatchOutcome::Busy => bail!("another operation is in progress"),
        DispatchOutcome::Failed => match orchestrator.store().state().status.error {
            Some(message) => bail!(message),
            None => bail!("operation failed"),
        },
    }
}

async fn print_events(events: &[EvalEvent], replay: bool) {
    for event in events {
        if replay && event.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(event.delay_ms)).await;
        }
        match event.kind {
            EvalEventKind::Stdout => println!("{}", event.message),
            EvalEventKind::Stderr => eprintln!("{}", event.message),
        }
    }
}

async fn run(app: &App, args: &ArgMatches) -> anyhow::Result<()> {
    let file = args.get_one::<PathBuf>("file").context("missing file")?;
    let orchestrator = app.orchestrator(&parent_dir(file));
    ensure_completed(orchestrator.import_file(file).await, &orchestrator)?;

    if args.get_flag("no-format") {
        let mut build = orchestrator.store().state().settings.build;
        build.auto_format = false;
        orchestrator
            .store()
            .dispatch(Action::BuildParamsChange(build));
    }
    let before = orchestrator.store().code();
    ensure_completed(orchestrator.run_code().await, &orchestrator)?;

    let result = orchestrator.store().state().result;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_events(&result.events, args.get_flag("replay")).await;
    }
    if args.get_flag("write") && orchestrator.store().code() != before {
        ensure_completed(orchestrator.save_file(), &orchestrator)?;
    }
    Ok(())
}

async fn format(app: &App, args: &ArgMatches) -> anyhow::Result<()> {
    let file = args.get_one::<PathBuf>("file").context("missing file")?;
    let orchestrator = app.orchestrator(&parent_dir(file));
    ensure_completed(orchestrator.import_file(file).await, &orchestrator)?;

    ensure_completed(orchestrator.format_code().await, &orchestrator)?;

    let state = orchestrator.store().state();
    if state.result.formatted.is_none() {
        bail!("formatter returned no code, check the source for syntax errors");
    }
    if args.get_flag("write") {
        ensure_completed(orchestrator.save_file(), &orchestrator)?;
        tracing::info!(file = %file.display(), "formatted in place");
    } else {
        print!("{}", state.document.code);
    }
    Ok(())
}

async fn share(app: &App, args: &ArgMatches) -> anyhow::Result<()> {
    let file = args.get_one::<PathBuf>("file").context("missing file")?;
    let orchestrator = app.orchestrator(&parent_dir(file));
    ensure_completed(orchestrator.import_file(file).await, &orchestrator)?;
    ensure_completed(orchestrator.share_snippet().await, &orchestrator)?;

    let location = orchestrator.store().state().location;
    println!("{}{}", app.config.server_url.trim_end_matches('/'), location);
    Ok(())
}

async fn fetch(app: &App, args: &ArgMatches) -> anyhow::Result<()> {
    let raw = args.get_one::<String>("id").map(String::as_str);
    let id = raw.map(|raw| playground_core::snippet_id_from_path(raw).unwrap_or(raw));
    let out = args.get_one::<PathBuf>("out");

    let orchestrator = app.orchestrator(out.map_or(Path::new("."), PathBuf::as_path));
    ensure_completed(orchestrator.load_snippet(id).await, &orchestrator)?;

    if out.is_some() {
        ensure_completed(orchestrator.save_file(), &orchestrator)?;
        println!("{}", orchestrator.store().state().document.file_name);
    } else {
        println!("{}", orchestrator.store().code());
    }
    Ok(())
}

async fn suggest(app: &App, args: &ArgMatches) -> anyhow::Result<()> {
    let query = SuggestionQuery {
        package_name: args.get_one::<String>("package").cloned(),
        value: args.get_one::<String>("value").cloned(),
    };
    let list = app.api.get_suggestions(query).await?;
    for item in list.suggestions {
        match item.detail {
            Some(detail) => println!("{}\t{}", item.label, detail),
            None => println!("{}", item.label),
        }
    }
    Ok(())
}

async fn check(args: &ArgMatches) -> anyhow::Result<()> {
    let file = args.get_one::<PathBuf>("file").context("missing file")?;
    let code = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let Some(analyzer) = AnalyzerSlot::probe(&LintAnalyzerFactory).analyzer().cloned() else {
        bail!("local analyzer is not available");
    };
    let result = analyzer.analyze_code(&code).await?;
    analyzer.dispose();

    for marker in &result.markers {
        println!("{}:{}", file.display(), marker);
    }
    let errors = result
        .markers
        .iter()
        .filter(|m| m.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("{} error(s) found", errors);
    }
    Ok(())
}

async fn watch(app: &App, args: &ArgMatches) -> anyhow::Result<()> {
    let file = args.get_one::<PathBuf>("file").context("missing file")?;
    let delay = args
        .get_one::<u64>("debounce")
        .map_or(ANALYZE_DEBOUNCE_TIME, |ms| Duration::from_millis(*ms));
    let poll = Duration::from_millis(*args.get_one::<u64>("poll").unwrap_or(&200));

    let orchestrator = Arc::new(app.orchestrator(&parent_dir(file)));
    ensure_completed(orchestrator.import_file(file).await, &orchestrator)?;

    let sink = Arc::new(StderrMarkers {
        file: file.display().to_string(),
    });
    let session = EditorSession::open(
        orchestrator,
        AnalyzerSlot::probe(&LintAnalyzerFactory),
        sink,
        delay,
    );
    let last = session.store().code();
    session.on_change(last.clone());
    eprintln!("watching {} (ctrl-c to stop)", file.display());

    follow(&session, file, poll, last, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for ctrl-c: {}", e);
        }
    })
    .await;

    session.teardown();
    Ok(())
}

/// Feed changes of `file` into the session every `poll` until `shutdown` resolves
async fn follow(
    session: &EditorSession,
    file: &Path,
    poll: Duration,
    mut last: String,
    shutdown: impl Future<Output = ()>,
) {
    let mut ticker = tokio::time::interval(poll);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                match tokio::fs::read_to_string(file).await {
                    Ok(text) if text != last => {
                        tracing::debug!(bytes = text.len(), "file changed");
                        session.on_change(text.clone());
                        last = text;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("failed to read {}: {}", file.display(), e),
                }
            }
        }
    }
}

fn settings_command(app: &App, args: &ArgMatches) -> anyhow::Result<()> {
    let orchestrator = app.orchestrator(Path::new("."));
    match args.subcommand() {
        Some(("show", _)) => {}
        Some(("toggle-theme", _)) => orchestrator.toggle_theme(),
        Some(("build", build)) => {
            let current = orchestrator.store().state().settings.build;
            let runtime = build
                .get_one::<String>("runtime")
                .map_or(current.runtime, |raw| RuntimeKind::from(raw.clone()));
            if let RuntimeKind::Unknown(raw) = &runtime {
                tracing::warn!("runtime {} is not supported, runs will fail", raw);
            }
            let auto_format = build
                .get_one::<bool>("auto-format")
                .copied()
                .unwrap_or(current.auto_format);
            orchestrator.change_build_settings(runtime, auto_format);
        }
        Some(("editor", editor)) => {
            let cursor_style = editor
                .get_one::<String>("cursor-style")
                .map(|raw| serde_json::from_value::<CursorStyle>(raw.as_str().into()))
                .transpose()
                .context("invalid cursor style")?;
            let font_family = if editor.get_flag("reset-font") {
                Some(None)
            } else {
                editor.get_one::<String>("font-family").cloned().map(Some)
            };
            let patch = EditorPreferencesPatch {
                minimap: editor.get_one::<bool>("minimap").copied(),
                font_ligatures: editor.get_one::<bool>("font-ligatures").copied(),
                font_family,
                cursor_style,
                ..Default::default()
            };
            if patch.is_empty() {
                bail!("no editor preference given");
            }
            orchestrator.change_editor_preferences(patch);
        }
        _ => unreachable!("subcommand is required"),
    }

    println!("{}", serde_json::to_string_pretty(&app.settings.get())?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"), matches.get_flag("log-json"));

    let Some((name, args)) = matches.subcommand() else {
        unreachable!("subcommand is required");
    };
    if name == "check" {
        return check(args).await;
    }

    let app = App::from_matches(&matches)?;
    match name {
        "run" => run(&app, args).await,
        "format" => format(&app, args).await,
        "share" => share(&app, args).await,
        "fetch" => fetch(&app, args).await,
        "version" => {
            println!("{}", app.api.get_version().await?);
            Ok(())
        }
        "suggest" => suggest(&app, args).await,
        "watch" => watch(&app, args).await,
        "settings" => settings_command(&app, args),
        other => unreachable!("unknown subcommand {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_reach_client_config() {
        let matches = cli()
            .try_get_matches_from([
                "playground",
                "version",
                "--server",
                "https://play.example.org",
                "--api-key",
                "k",
                "--timeout",
                "5",
            ])
            .unwrap();
        let config = client_config(&matches);
        assert_eq!(config.server_url, "https://play.example.org");
        assert_eq!(config.api_key, "k");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn service_flags_read_client_env_vars() {
        let cli = cli();
        let env_of = |id: &str| {
            cli.get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(Arg::get_env)
                .map(|name| name.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("server").as_deref(), Some(ENV_SERVER_URL));
        assert_eq!(env_of("api-share").as_deref(), Some(ENV_API_SHARE));
        assert_eq!(env_of("api-run").as_deref(), Some(ENV_API_RUN));
        assert_eq!(env_of("api-key").as_deref(), Some(ENV_API_KEY));
    }

    #[tokio::test]
    async fn follow_feeds_changes_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.gleam");
        std::fs::write(&file, "a").unwrap();

        let orchestrator = ActionDispatchOrchestrator::new(
            Store::new(State::default()),
            Arc::new(RemoteServiceClient::new(ClientConfig::new()).unwrap()),
            Arc::new(InMemorySettingsStore::default()),
        );
        let session = EditorSession::open(
            Arc::new(orchestrator),
            AnalyzerSlot::Unavailable,
            Arc::new(StderrMarkers {
                file: file.display().to_string(),
            }),
            Duration::from_millis(10),
        );

        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let driver = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            std::fs::write(&file, "b").unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            stop.send(()).unwrap();
        };
        let follower = follow(
            &session,
            &file,
            Duration::from_millis(5),
            "a".to_string(),
            async {
                let _ = stopped.await;
            },
        );
        tokio::join!(follower, driver);

        assert_eq!(session.store().code(), "b");
        session.teardown();
    }

    #[test]
    fn parent_dir_of_bare_file_is_cwd() {
        assert_eq!(parent_dir(Path::new("main.gleam")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("src/main.gleam")), PathBuf::from("src"));
    }
}
