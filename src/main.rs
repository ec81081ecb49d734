use clap::Parser;

use netmeter::cli::Args;

fn main() {
    // Diagnostics go to stderr; stdout carries the data records.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netmeter=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in netmeter: {info}");
        default_hook(info);
    }));

    let args = Args::parse();
    if let Err(e) = netmeter::run(args) {
        tracing::error!("{e}");
        std::process::exit(e.exit_code());
    }
}
