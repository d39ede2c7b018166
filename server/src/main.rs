use tokio::net::TcpListener;
use tracing::info;
use tweet_timeline::{
    routes,
    server::run_server,
    setup::{load_env_file, setup_sentry, setup_tracing},
    state::{AppConfig, AppState},
};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Read .env / .env.dev before anything looks at the environment
    let env_file = load_env_file()?;

    let _sentry_guard = setup_sentry();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { run_application(env_file).await })
}

async fn run_application(env_file: Option<std::path::PathBuf>) -> color_eyre::Result<()> {
    setup_tracing("tweet_timeline")?;

    match env_file {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => info!("No env file found, using the process environment"),
    }

    let config = AppConfig::from_env()?;
    let port = config.port;
    let app_state = AppState::new(config)?;

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    println!("Go here to login: http://127.0.0.1:{port}/login");

    run_server(listener, routes::routes(app_state)).await
}
