use std::process::ExitCode;

use screenscout_lib::{settings::Settings, utils::logging::init_logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging (reads RUST_LOG env var)
    init_logging();

    let settings = match Settings::from_args() {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("invalid configuration: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match screenscout_lib::run(settings).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                log::error!("failed to serialize run report: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            log::error!("screenscout failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
