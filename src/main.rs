//! Plant-care authentication service entry point

use std::sync::Arc;

use chrono::Duration;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plantcare_auth::{
    auth::{AuthGate, TokenService},
    bootstrap,
    config::Args,
    db::MongoClient,
    keys::{KeyCustodian, KeyStore, MongoKeyStore, ServiceSecret, DEFAULT_KEY_ID},
    server::{self, AppState},
    users::UserStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("plantcare_auth={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Plant-care authentication service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Token TTL: {}h", args.token_ttl_hours);
    info!("======================================");

    if args.using_dev_secret() {
        warn!("SECRET_KEY not set, using the built-in development secret");
    }

    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let users = Arc::new(UserStore::new(&mongo));
    if let Err(e) = users.ensure_indexes().await {
        warn!("User index creation failed: {}", e);
    }
    let key_store: Arc<dyn KeyStore> = Arc::new(MongoKeyStore::new(&mongo));
    let custodian = Arc::new(KeyCustodian::new(
        key_store,
        ServiceSecret::from_passphrase(&args.secret_key),
    ));

    // A confirmed-absent key that cannot be generated is fatal; a failed
    // existence check alone is not.
    if let Err(e) = bootstrap::ensure_signing_key(&custodian, DEFAULT_KEY_ID).await {
        error!("Signing key provisioning failed: {}", e);
        std::process::exit(1);
    }

    if args.seed_default_users {
        if let Err(e) = users.seed_default_users().await {
            warn!("Default user seeding failed: {}", e);
        }
    }

    // Keys are loaded through the custodian per issue/verify call, so a
    // store that was unreachable during bootstrap serves token traffic as
    // soon as it recovers.
    let tokens = Arc::new(TokenService::new(
        Arc::clone(&custodian),
        Duration::hours(args.token_ttl_hours),
    ));
    let gate = AuthGate::new(Arc::clone(&tokens));

    let db_name = mongo.db_name().to_string();
    let state = Arc::new(AppState {
        args,
        db_name,
        users,
        custodian,
        tokens,
        gate,
    });

    server::run(state).await?;
    Ok(())
}
