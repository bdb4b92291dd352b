use molt::{cli, config, telemetry};

fn main() {
    let cli = cli::parse_from(std::env::args_os());

    let config = config::load_or_default();
    telemetry::init(cli.verbose, cli.quiet, &config.logging);

    if let Err(e) = cli::run(cli) {
        tracing::error!("error: {e}");
        if e.transience().is_retryable() {
            tracing::info!("this failure may clear on retry");
        }
        std::process::exit(1);
    }
}
