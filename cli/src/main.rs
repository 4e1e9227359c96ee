mod commands;
mod terminal;

use std::sync::Arc;

use commands::{CommandLine, Commands, discover, drives, exec, export, interfaces};
use dashlink_core::limiter::ConnectionLimiter;
use dashlink_core::session::SessionRegistry;
use dashlink_core::ssh::OpenSshTransport;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    let cfg = commands.to_config();

    logging::init_logging(cfg.quiet);
    print::banner(cfg.quiet);

    let limiter = ConnectionLimiter::new(cfg.max_connections);
    let transport = Arc::new(OpenSshTransport::new(cfg.probe_timeout, limiter.clone()));
    let registry = SessionRegistry::new(transport, limiter, cfg.clone());

    let result = match commands.command {
        Commands::Interfaces => {
            print::header("local interfaces", cfg.quiet);
            interfaces::interfaces(&cfg)
        }
        Commands::Discover => {
            print::header("getting ready for discovery", cfg.quiet);
            discover::discover(&registry).await
        }
        Commands::Drives { address } => drives::drives(&registry, address).await,
        Commands::Export {
            address,
            drive,
            dest,
            files,
        } => export::export(&registry, address, &drive, &dest, &files).await,
        Commands::Exec { address, command } => {
            exec::exec(&registry, address, &command.join(" ")).await
        }
    };

    print::end_of_program(cfg.quiet);
    result
}
