use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use dreampoll_core::config::{AppConfig, ConfigError, LoadOptions};
use dreampoll_core::registry::PollRegistry;
use dreampoll_scheduler::{BroadcastScheduler, JobQueue};
use dreampoll_telegram::api::BotApi;
use dreampoll_telegram::events::{CommandEventHandler, EventDispatcher, PollAnswerHandler};
use dreampoll_telegram::transport::{ChatTransport, Destination};
use dreampoll_telegram::updates::{PollingRunner, RetryPolicy, UpdateSource};

use crate::service::BotService;

pub struct Application {
    pub config: AppConfig,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

/// Builds the application from an already-validated config: one Bot API
/// client serves as both the outbound transport and the update source.
pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        channel = %config.telegram.channel_id,
        "starting application bootstrap"
    );

    let api = Arc::new(BotApi::new(config.telegram.bot_token.clone()));
    build_application(config, api.clone(), api)
}

fn build_application(
    config: AppConfig,
    transport: Arc<dyn ChatTransport>,
    source: Arc<dyn UpdateSource>,
) -> Application {
    let registry = Arc::new(PollRegistry::new());
    let queue = Arc::new(JobQueue::new());
    let channel = Destination::parse(&config.telegram.channel_id);
    let offset = config.broadcast.fixed_offset();

    let scheduler = Arc::new(BroadcastScheduler::new(
        queue,
        transport.clone(),
        channel.clone(),
        offset,
        config.broadcast.hour,
    ));
    let service = BotService::new(transport.clone(), registry, scheduler, channel, offset);

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandEventHandler::new(service.clone()));
    dispatcher.register(PollAnswerHandler::new(service));

    let runner = PollingRunner::new(source, transport, dispatcher, RetryPolicy::default());

    info!(
        event_name = "system.bootstrap.wired",
        "registry, scheduler, and update runner assembled"
    );

    Application { config, runner }
}
