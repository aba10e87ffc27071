use std::process;

use log::error;

use mirrorpane::app;
use mirrorpane::config::Config;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    if let Err(err) = app::run_to_completion(app::run(config)) {
        error!("{}", err);
        process::exit(1);
    }
}
