use crate::handlers::{self, GameInfoQuery};
use crate::registry::Registry;
use crate::settings::{ServerSettings, SettingsError};
use introspect_engine::{Catalog, QuestionError, QuestionSource, QuestionStore};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::reply::Reply;
use warp::Filter;

/// Everything the routes share: the resolved settings and the room registry.
#[derive(Debug, Clone)]
pub struct AppContext {
    settings: ServerSettings,
    registry: Registry,
}

impl AppContext {
    /// Loads the question catalog named in `settings`. A missing or broken
    /// catalog is a startup error.
    pub fn new(settings: ServerSettings) -> Result<Self, ServerError> {
        settings.validate()?;
        let catalog = Catalog::load(&settings.questions)?;
        for problem in catalog.problems() {
            tracing::warn!(path = %settings.questions.display(), problem = %problem, "question catalog problem");
        }
        let store = QuestionStore::new(catalog.questions, settings.seed);
        tracing::info!(
            path = %settings.questions.display(),
            questions = store.len(),
            seeded = settings.seed.is_some(),
            "loaded question catalog"
        );
        Ok(Self::with_questions(settings, Arc::new(store)))
    }

    pub fn with_questions(settings: ServerSettings, questions: Arc<dyn QuestionSource>) -> Self {
        let registry = Registry::new(questions, settings.registry_settings());
        Self { settings, registry }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Question catalog error: {0}")]
    Questions(#[from] QuestionError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(settings: ServerSettings) -> Result<Self, ServerError> {
        let context = AppContext::new(settings)?;
        Ok(Self { context })
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.settings())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(%addr, "web server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, context))
    }

    fn bind_addr(settings: &ServerSettings) -> Result<SocketAddr, ServerError> {
        let host = settings.host.as_str();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, settings.port));
        }

        let candidate = format!("{}:{}", host, settings.port);
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(io_err) = err
            .source()
            .and_then(|source| source.downcast_ref::<std::io::Error>())
        {
            return ServerError::BindError(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }

        ServerError::ConfigError(err.to_string())
    }

    /// Every route the server answers, as one filter.
    pub fn routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        Self::health_routes()
            .or(Self::validate_route(context))
            .unify()
            .or(Self::ws_route(context))
            .unify()
            .boxed()
    }

    fn health_routes() -> BoxedFilter<(warp::reply::Response,)> {
        let health = warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health().into_response());

        let ping = warp::path("ping")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::ping().into_response());

        health.or(ping).unify().boxed()
    }

    fn validate_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("validateGameInfo")
            .and(warp::get())
            .and(warp::path::end())
            .and(warp::query::<GameInfoQuery>())
            .and(Self::with_registry(context.registry()))
            .map(|query: GameInfoQuery, registry: Registry| {
                handlers::validate_game_info(query, &registry)
            })
            .boxed()
    }

    fn ws_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("ws")
            .and(warp::path::end())
            .and(warp::ws())
            .and(warp::query::<GameInfoQuery>())
            .and(Self::with_registry(context.registry()))
            .map(|ws: warp::ws::Ws, query: GameInfoQuery, registry: Registry| {
                handlers::upgrade(ws, query, registry)
            })
            .boxed()
    }

    fn with_registry(
        registry: Registry,
    ) -> impl Filter<Extract = (Registry,), Error = Infallible> + Clone {
        warp::any().map(move || registry.clone())
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        tracing::info!(addr = %self.addr, "web server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
