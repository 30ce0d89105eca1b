use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use duo_chat::config::{self, AppConfig};
use duo_chat::ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "duo_chat",
    version,
    about = "Two-person chat with per-message translation"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Pre-fill the login form with this username
    #[arg(long)]
    user: Option<String>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Write the effective config to the config path and exit
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    dotenv().ok();
    // Khởi tạo Logger để debug
    env_logger::init();

    let cli = Cli::parse();
    let app_config =
        config::load_config(&cli.config).with_api_key_fallback(std::env::var("CHAT_API_KEY").ok());

    if cli.mode == Some(Mode::InitConfig) {
        match config::save_config(&cli.config, &app_config) {
            Ok(()) => log::info!("Wrote config to {}", cli.config),
            Err(err) => log::error!("Failed to write config {}: {err}", cli.config),
        }
        return Ok(());
    }

    run_ui(app_config, cli.user)
}

fn run_ui(app_config: AppConfig, preset_user: Option<String>) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    // Chat sessions run on the tokio runtime, the UI on the main thread
    let runtime = tokio::runtime::Handle::current();

    eframe::run_native(
        "Duo Chat",
        options,
        Box::new(move |cc| {
            log::info!(
                "Client started with {} configured users",
                app_config.users.len()
            );

            Ok(Box::new(ChatApp::new(cc, app_config, runtime, preset_user)))
        }),
    )
}
