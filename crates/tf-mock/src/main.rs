use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tf_client::{
    ClientConfig, FileStorage, KeyValueStorage, MemoryStorage, RequestOptions, Taskflow,
};
use tf_core::{CreateTaskPayload, TaskPriority, TaskStatus};
use tf_mock::{server, MockBackend, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD};

fn cli() -> Command {
    Command::new("taskflow-mock")
        .version(tf_mock::VERSION)
        .about("Taskflow mock backend")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Serve the mock API over HTTP under /api")
                .arg(
                    Arg::new("addr")
                        .long("addr")
                        .default_value("127.0.0.1:4000")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Address to listen on"),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory to persist the dataset in (in-memory when omitted)"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .default_value("220")
                        .value_parser(value_parser!(u64))
                        .help("Simulated latency per request"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Drive the client against an in-process backend")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Client configuration TOML (retries, retry_delay_ms)"),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory to persist the dataset and session in"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Simulated latency per request"),
                ),
        )
}

fn storage(args: &ArgMatches) -> anyhow::Result<Arc<dyn KeyValueStorage>> {
    match args.get_one::<PathBuf>("data-dir") {
        Some(dir) => {
            let storage = FileStorage::open(dir)
                .with_context(|| format!("opening data dir {}", dir.display()))?;
            Ok(Arc::new(storage))
        }
        None => Ok(Arc::new(MemoryStorage::new())),
    }
}

fn latency(args: &ArgMatches) -> Duration {
    Duration::from_millis(args.get_one::<u64>("latency-ms").copied().unwrap_or_default())
}

async fn serve(args: &ArgMatches) -> anyhow::Result<()> {
    let addr = args
        .get_one::<SocketAddr>("addr")
        .copied()
        .context("missing --addr")?;
    let backend = Arc::new(MockBackend::new(storage(args)?).with_latency(latency(args)));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };
    let (bound, serving) = server::bind(backend, addr, shutdown)?;
    tracing::info!(%bound, "mock API listening under /{}", tf_mock::API_PREFIX);

    serving.await;
    tracing::info!("shut down");
    Ok(())
}

async fn demo(args: &ArgMatches) -> anyhow::Result<()> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            ClientConfig::from_toml_str(&raw)?
        }
        None => ClientConfig::default(),
    };

    let storage = storage(args)?;
    let backend = Arc::new(MockBackend::new(Arc::clone(&storage)).with_latency(latency(args)));
    let app = Taskflow::with_transport(backend, RequestOptions::from_config(&config), storage);

    if !app.session.is_authenticated()
        && !app.session.login(SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD).await
    {
        anyhow::bail!("login failed: {:?}", app.session.error());
    }
    let user = app.session.user().context("no user after login")?;
    println!("Signed in as {} ({})", user.name, user.role.as_str());

    let project = app
        .projects
        .create("Launch Plan", "Demo project")
        .await
        .with_context(|| format!("creating project: {:?}", app.projects.error()))?;
    println!("Created project {} [{}]", project.name, project.id);

    let task = app
        .tasks
        .create(&project.id, CreateTaskPayload::new("Draft brief", TaskPriority::Medium))
        .await
        .with_context(|| format!("creating task: {:?}", app.tasks.error()))?;
    println!("Created task {} ({})", task.title, task.status.label());

    if app.tasks.move_task(&project.id, &task.id, TaskStatus::Done).await {
        println!("Moved task to {}", TaskStatus::Done.label());
    }

    app.activity.fetch_for_project(&project.id).await;
    for event in app.activity.for_project(&project.id) {
        println!("  {}", event.description);
    }

    app.projects.fetch_all().await;
    println!("{} project(s) visible", app.projects.items().len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("taskflow-mock v{} starting", tf_mock::VERSION);

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("serve", args)) => serve(args).await,
        Some(("demo", args)) => demo(args).await,
        Some((other, _)) => anyhow::bail!("unknown subcommand {other}"),
        None => anyhow::bail!("no subcommand given"),
    }
}
