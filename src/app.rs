use std::sync::Arc;

use anyhow::{Context, Result};

use crate::bsky;
use crate::config;
use crate::data::{self, SearchService};
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let user_agent = if !cfg.bsky.user_agent.trim().is_empty() {
        cfg.bsky.user_agent.clone()
    } else {
        format!("skysearch/{}", crate::VERSION)
    };
    let app_view_url = if cfg.bsky.app_view_url.trim().is_empty() {
        None
    } else {
        Some(cfg.bsky.app_view_url.clone())
    };

    let status: String;
    let mut search_service: Option<Arc<dyn SearchService>> = None;

    match bsky::Client::new(bsky::ClientConfig {
        user_agent,
        app_view_url,
        timeout: Some(cfg.bsky.timeout),
        http_client: None,
    }) {
        Ok(client) => {
            let service: Arc<dyn SearchService> =
                Arc::new(data::BskySearchService::new(Arc::new(client)));
            search_service = Some(service);
            status =
                "Type a query and press Enter to search Bluesky. Tab switches fields, Esc quits."
                    .to_string();
        }
        Err(err) => {
            status = format!("Failed to initialize Bluesky client: {err}");
        }
    }

    let options = ui::Options {
        status_message: status,
        search_service,
        default_limit: cfg.search.default_limit,
        config_path: display_path,
    };

    let mut model = ui::Model::new(options);
    model.run()
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/skysearch/config.yaml".to_string()
    }
}
