mod bot;
mod config;
mod database;
mod i18n;
mod import;
mod lottery;
mod types;
mod wizard;

use std::sync::{Arc, OnceLock};

use bot::{NecessaryArg, back_run, bot, front_run};
use clap::{ArgMatches, arg};
use config::Config;
use database::DatabaseHandle;
use log::{error, info};
use lottery::monitor::Monitor;
use teloxide::{prelude::Requester as _, types::ChatId};

static CHECK_PERIOD: OnceLock<u64> = OnceLock::new();

async fn async_main(config_file: &str) -> anyhow::Result<()> {
    let config = Config::read(config_file).await?;
    let timezone = config.timezone()?;
    let (database_thread, database_helper) = DatabaseHandle::connect(config.database()).await?;

    let front = bot(config.front())?;
    let back = bot(config.back())?;

    let front_me = front.get_me().await?;
    let back_me = back.get_me().await?;
    info!(
        "Front bot @{}, back bot @{}",
        front_me.username(),
        back_me.username()
    );

    let (monitor, monitor_helper) = Monitor::create(database_helper.clone(), front.clone());

    let arg = Arc::new(NecessaryArg::new(
        database_helper.clone(),
        config.admin().iter().map(|id| ChatId(*id)).collect(),
        timezone,
        front.clone(),
        front_me.user.id,
        front_me.username().to_string(),
        back_me.username().to_string(),
        monitor_helper.clone(),
    ));

    let (front_ret, back_ret) = tokio::join!(front_run(front, arg.clone()), back_run(back, arg));
    front_ret
        .inspect_err(|e| error!("Front bot error: {e:?}"))
        .ok();
    back_ret
        .inspect_err(|e| error!("Back bot error: {e:?}"))
        .ok();

    monitor_helper.exit().await;
    database_helper.terminate().await;

    monitor.join().await?;
    database_thread.wait().await?;

    Ok(())
}

async fn import_main(config_file: &str, file: &str) -> anyhow::Result<()> {
    let config = Config::read(config_file).await?;
    let (database_thread, database_helper) = DatabaseHandle::connect(config.database()).await?;

    let ret = import::import_file(file, &database_helper).await;

    database_helper.terminate().await;
    database_thread.wait().await?;

    ret.map(|_| ())
}

fn enable_log(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose < 3 {
        builder
            .filter_module("hyper", log::LevelFilter::Warn)
            .filter_module("reqwest", log::LevelFilter::Warn);
    }

    if verbose < 2 {
        builder.filter_module("teloxide", log::LevelFilter::Debug);
    }
    if verbose < 1 {
        builder.filter_module("sqlx", log::LevelFilter::Warn);
    }
    builder.init();
}

async fn async_router(matches: ArgMatches) -> anyhow::Result<()> {
    let config_file = matches
        .get_one::<String>("CONFIG")
        .map(String::as_str)
        .unwrap_or("config.toml");
    match matches.subcommand() {
        Some(("import", matches)) => {
            let Some(file) = matches.get_one::<String>("FILE") else {
                anyhow::bail!("Missing import file");
            };
            import_main(config_file, file).await
        }
        _ => async_main(config_file).await,
    }
}

fn main() -> anyhow::Result<()> {
    let matches = clap::command!()
        .args(&[
            arg!([CONFIG] "Configure file to read").default_value("config.toml"),
            arg!(--"check-period" <second> "Override lottery check period")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
            arg!(-v --verbose ... "More verbose log output"),
        ])
        .subcommand(
            clap::Command::new("import")
                .about("Import legacy JSON group configs")
                .args(&[arg!(<FILE> "Legacy group_configs.json")]),
        )
        .get_matches();

    enable_log(matches.get_count("verbose"));

    let check_period = matches.get_one::<u64>("check-period").copied().unwrap_or(30);
    CHECK_PERIOD.get_or_init(|| check_period);

    info!(
        "Version: {}, check period: {check_period}",
        env!("CARGO_PKG_VERSION"),
    );
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_router(matches))
}
