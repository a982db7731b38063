use clap::Parser;
use sqlhost_provision::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Steps run strictly one after another; a single-threaded runtime is all the child
    // processes need.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(sqlhost_provision::EXIT_STARTUP);
        }
    };

    let code = runtime.block_on(sqlhost_provision::run(cli));
    std::process::exit(code);
}
