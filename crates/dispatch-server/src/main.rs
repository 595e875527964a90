//! Campaign dispatch HTTP server

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Arg, Command};
use dispatch_core::{
    paths, CampaignControl, CredentialPool, DispatchServices, DispatchSettings, FileStore, HickoryMxResolver,
    HttpContinuation, OpenAiClient, Personalizer, RecipientValidator, SettingsStore,
};
use dispatch_server::{init_app, AppState};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("dispatch-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bulk campaign dispatch engine")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/app/config/dispatch.json"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Data directory for campaign documents (overrides storage.data_dir)"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .help("HTTP port (overrides server.port)")
                .value_parser(clap::value_parser!(u16)),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/app/config/dispatch.json");
    let mut config = DispatchSettings::from_file(config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;
    log::info!("Loaded configuration from {}", config_path);

    if let Some(data_dir) = matches.get_one::<String>("data-dir") {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    if let Err(e) = paths::init_data_root(config.storage.data_dir.clone()) {
        log::warn!("Data root initialization warning: {}", e);
    }
    log::info!("Using data directory: {}", paths::data_root().display());

    let store = Arc::new(FileStore::new(paths::data_root()).context("opening campaign store")?);
    if store.load_settings().await?.is_none() {
        store.save_settings(&config.defaults).await?;
        log::info!("Seeded {} from configured defaults", paths::settings_path().display());
    }

    let api_pool = CredentialPool::from_api_keys(&config.delivery)?;
    let resolver = HickoryMxResolver::new(config.validator.mx_timeout()).context("building MX resolver")?;
    let validator = RecipientValidator::from_config(&config.validator, Arc::new(resolver));
    log::info!("Recipient validator checks: {}", validator.check_names().join(", "));

    let personalizer = match &config.openai {
        Some(openai) => {
            let timeout = openai.timeout();
            let client = OpenAiClient::new(openai.clone())?;
            log::info!("Personalization enabled with model {}", openai.model);
            Some(Arc::new(Personalizer::new(Arc::new(client), timeout)))
        }
        None => {
            log::info!("No OpenAI configuration, personalization disabled");
            None
        }
    };

    let services = Arc::new(DispatchServices::new(
        &config,
        store.clone(),
        store.clone(),
        Arc::new(validator),
        api_pool,
        personalizer,
    ));
    let control = CampaignControl::new(
        store.clone(),
        store.clone(),
        config.defaults.clone(),
        config.dispatch.claim_retries,
    );

    let self_url = config.server.self_url();
    let continuation = Arc::new(HttpContinuation::new(&self_url)?);
    log::info!("Worker hops continue via {}", continuation.endpoint());

    let state = web::Data::new(AppState::new(services, control, continuation));

    let bind = (config.server.host.clone(), config.server.port);
    log::info!("Starting HTTP server on {}:{}", bind.0, bind.1);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(init_app))
        .bind(bind)?
        .run()
        .await?;

    Ok(())
}
