use std::{process, sync::Arc};

use tokio::sync::watch;
use tokio::{signal, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use velada::{
    application::{
        admin::{
            chrome::AdminChromeService, events::AdminEventService, settings::AdminSettingsService,
            terms::AdminTermService,
        },
        agenda::AgendaService,
        chrome::ChromeService,
        error::AppError,
        repos::{EventsRepo, EventsWriteRepo, SettingsRepo, TermsRepo, TermsWriteRepo},
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, ApiState, HttpState, RouterState},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories);

    serve_http(&settings, app.http_state, app.admin_state, app.api_state).await
}

struct ApplicationContext {
    http_state: HttpState,
    admin_state: AdminState,
    api_state: ApiState,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(repositories: Arc<PostgresRepositories>) -> ApplicationContext {
    let events_repo: Arc<dyn EventsRepo> = repositories.clone();
    let events_write_repo: Arc<dyn EventsWriteRepo> = repositories.clone();
    let terms_repo: Arc<dyn TermsRepo> = repositories.clone();
    let terms_write_repo: Arc<dyn TermsWriteRepo> = repositories.clone();
    let settings_repo: Arc<dyn SettingsRepo> = repositories.clone();

    let agenda = Arc::new(AgendaService::new(
        events_repo.clone(),
        terms_repo.clone(),
        settings_repo.clone(),
    ));
    let chrome = Arc::new(ChromeService::new(settings_repo.clone()));

    let http_state = HttpState {
        agenda,
        chrome,
        db: repositories.clone(),
    };

    let admin_state = AdminState {
        db: repositories.clone(),
        chrome: Arc::new(AdminChromeService::new(settings_repo.clone())),
        events: Arc::new(AdminEventService::new(
            events_repo.clone(),
            events_write_repo,
            terms_repo.clone(),
        )),
        terms: Arc::new(AdminTermService::new(terms_repo.clone(), terms_write_repo)),
        settings: Arc::new(AdminSettingsService::new(settings_repo.clone())),
    };

    let api_state = ApiState {
        events: events_repo,
        terms: terms_repo,
        settings: settings_repo,
    };

    ApplicationContext {
        http_state,
        admin_state,
        api_state,
    }
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
    api_state: ApiState,
) -> Result<(), AppError> {
    let router_state = RouterState {
        http: http_state,
        api: api_state,
    };
    let public_router = http::build_router(router_state.clone());
    let api_router = http::build_api_v1_router(router_state.clone());
    let admin_router = http::build_admin_router(admin_state);

    let public_router = public_router
        .merge(api_router)
        .with_state(router_state.clone());

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "velada::server",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "Listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        info!(
            target = "velada::server",
            "Shutdown signal received; draining connections"
        );
        let _ = shutdown_tx.send(());
    });

    let mut public_rx = shutdown_rx.clone();
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = public_rx.changed().await;
        });
    let mut admin_rx = shutdown_rx.clone();
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = admin_rx.changed().await;
        });

    let servers = async { try_join!(public_server, admin_server).map(|_| ()) };

    // Cap the drain at the configured grace period; connections still open
    // after that are dropped with the server futures.
    let mut grace_rx = shutdown_rx;
    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = servers => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = async {
            let _ = grace_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            info!(
                target = "velada::server",
                "Grace period elapsed; closing remaining connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!(error = %error, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
