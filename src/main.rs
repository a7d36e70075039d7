use anyhow::Context;

use billmock::{
    api::{api_list_resource, Resources},
    config::Config,
    store::Store,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billmock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let resources = billmock::register_filterable_fields(Resources::with_defaults(), &config)?;
    let store = Store::new();
    if let Some(path) = config.fixtures() {
        billmock::load_fixtures(&store, &resources, path)?;
    }

    let mut args = std::env::args().skip(1);
    let resource_name = args
        .next()
        .context("Usage: billmock <object> [key=value ...]")?;
    let params = billmock::parse_request_params(args)?;

    match api_list_resource(&store, &resources, &resource_name, &params) {
        Ok(list) => println!("{}", serde_json::to_string_pretty(&list)?),
        Err(err) => {
            tracing::warn!("List request failed with status {}", err.status_code());
            println!("{}", serde_json::to_string_pretty(&err.error_body())?);
            std::process::exit(1);
        }
    }

    Ok(())
}
