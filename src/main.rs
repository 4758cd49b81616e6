use std::{process, sync::Arc};

use larder::{
    application::{
        accounts::AccountService,
        cart::CartService,
        catalog::CatalogService,
        error::AppError,
        notifications::Notifier,
        orders::OrderService,
        repos::{
            CartRepo, CategoriesRepo, HealthRepo, OrdersRepo, RecipesRepo, RecipesWriteRepo,
            SubscriptionsRepo, UsersRepo,
        },
        subscriptions::SubscriptionService,
    },
    cache::ResultCacheGate,
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        notifications,
        payments::HttpPaymentGateway,
        telemetry,
    },
};
use sqlx::PgPool;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "larder::migrate", "Migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let (queue, worker) = notifications::channel(settings.notifications.queue_capacity);
    let worker_handle = worker.spawn();

    let api_state = build_api_state(repositories, Arc::new(queue), &settings)?;
    let result = serve_http(&settings, api_state).await;

    // Every queue handle lives in the router state, so the worker stops once
    // the server has been dropped.
    match tokio::time::timeout(settings.server.graceful_shutdown, worker_handle).await {
        Ok(Ok(delivered)) => info!(
            target = "larder::notifications",
            delivered, "Notification queue drained"
        ),
        Ok(Err(err)) => warn!(
            target = "larder::notifications",
            error = %err,
            "Notification worker panicked"
        ),
        Err(_) => warn!(
            target = "larder::notifications",
            "Notification queue not drained before shutdown timeout"
        ),
    }

    result
}

async fn connect_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_api_state(
    repositories: Arc<PostgresRepositories>,
    notifier: Arc<dyn Notifier>,
    settings: &config::Settings,
) -> Result<ApiState, AppError> {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let recipes_repo: Arc<dyn RecipesRepo> = repositories.clone();
    let recipes_write_repo: Arc<dyn RecipesWriteRepo> = repositories.clone();
    let cart_repo: Arc<dyn CartRepo> = repositories.clone();
    let orders_repo: Arc<dyn OrdersRepo> = repositories.clone();
    let subscriptions_repo: Arc<dyn SubscriptionsRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let gate = ResultCacheGate::from_config(&settings.cache)?;
    info!(
        target = "larder::cache",
        enabled = gate.is_enabled(),
        backend = ?settings.cache.backend,
        ttl_seconds = gate.ttl().as_secs(),
        "Listing cache configured"
    );

    let gateway = Arc::new(HttpPaymentGateway::new(&settings.payments).map_err(AppError::from)?);
    if !gateway.is_configured() {
        warn!(
            target = "larder::payments",
            "Payment credentials missing; payment orders will be refused"
        );
    }

    let accounts = AccountService::new(users_repo, settings.auth.token_ttl);
    let catalog = CatalogService::new(
        recipes_repo.clone(),
        recipes_write_repo,
        categories_repo,
        gate,
        notifier.clone(),
    );
    let cart = CartService::new(cart_repo, recipes_repo.clone());
    let orders = OrderService::new(
        orders_repo,
        recipes_repo,
        gateway,
        notifier.clone(),
        settings.payments.currency.clone(),
    );
    let subscriptions = SubscriptionService::new(subscriptions_repo, notifier);

    Ok(ApiState {
        accounts: Arc::new(accounts),
        catalog: Arc::new(catalog),
        cart: Arc::new(cart),
        orders: Arc::new(orders),
        subscriptions: Arc::new(subscriptions),
        health: health_repo,
    })
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "larder::http",
        addr = %settings.server.addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "larder::http",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "larder::http", "Shutdown signal received");
}
