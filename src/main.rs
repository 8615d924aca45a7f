// Entrypoint for the CLI application.
// - Logging goes to stderr; `RUST_LOG` overrides the default `warn` level.
// - Keeps `main` small: build the API client and hand it to the menu loop.

use deciphon_cli::{api::ApiClient, ui::main_menu};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Reads DECIPHON_API_URL / DECIPHON_API_KEY, see `Settings::from_env`.
    let api = ApiClient::from_env()?;

    // Blocks until the user picks "Exit".
    main_menu(&api)?;
    Ok(())
}
