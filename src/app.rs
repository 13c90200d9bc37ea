use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::api;
use crate::config;
use crate::controller::{Controller, Services};
use crate::data;
use crate::logging;
use crate::mpv;
use crate::ui;

const LIST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = load_config(&opts)?;
    logging::init(&cfg.log).context("initialise logging")?;
    info!(base_url = %cfg.api.base_url, "starting viewer");

    let controller = Controller::new(api_services(&cfg)?);
    let options = ui::Options {
        controller,
        surfaces: Box::new(mpv::Launcher::new(cfg.player.command.clone())),
        scroll_debounce: cfg.feed.scroll_debounce,
        api_base: cfg.api.base_url.clone(),
    };

    let mut model = ui::Model::new(options);
    model.run()
}

pub fn list(opts: RunOptions) -> Result<()> {
    let cfg = load_config(&opts)?;
    let mut controller = Controller::new(api_services(&cfg)?);
    controller.load_feed();
    if !controller.wait_idle(cfg.api.timeout + LIST_TIMEOUT_SLACK) {
        bail!("timed out waiting for {}", cfg.api.base_url);
    }
    if let Some(err) = controller.last_error() {
        bail!("{err}");
    }
    for item in controller.feed().items() {
        println!("{}\t{}\t{}", item.id, item.like_num, item.title);
    }
    Ok(())
}

fn load_config(opts: &RunOptions) -> Result<config::Config> {
    config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")
}

fn api_services(cfg: &config::Config) -> Result<Services> {
    let client = api::Client::new(api::ClientConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        timeout: Some(cfg.api.timeout),
        http_client: None,
    })
    .context("create API client")?;
    let client = Arc::new(client);

    Ok(Services {
        feed: Arc::new(data::ApiFeedService::new(client.clone())),
        comments: Arc::new(data::ApiCommentService::new(client.clone())),
        moderation: Arc::new(data::ApiModerationService::new(client)),
    })
}
