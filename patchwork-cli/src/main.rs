//! `patchwork`: run the exchange server or join one as a participant.

mod ascii;
mod client_console;
mod commands;
mod server_console;

use clap::{Parser, Subcommand};

use patchwork_collab::{ClientConfig, PatchworkClient, PatchworkServer, ServerConfig, MAX_BODY_LEN};
use patchwork_core::SharedImage;

/// Shared drawing board: participants build images, a server collects them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the central server with an operator console.
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
        /// Largest frame body sent or accepted, in bytes
        #[arg(long, default_value_t = MAX_BODY_LEN)]
        max_body_len: usize,
    },
    /// Connect to a server and edit an image.
    Join {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:8080")]
        server: String,
        /// Largest frame body sent or accepted, in bytes
        #[arg(long, default_value_t = MAX_BODY_LEN)]
        max_body_len: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, max_body_len } => {
            let config = ServerConfig {
                bind_addr: bind,
                max_body_len,
            };
            let server = PatchworkServer::bind(config).await?;
            println!("listening on {}", server.local_addr()?);

            let room = server.room();
            let accept_loop = tokio::spawn(server.run());
            server_console::run(room).await?;
            log::info!("operator console closed, shutting down");
            accept_loop.abort();
        }
        Commands::Join {
            server,
            max_body_len,
        } => {
            let config = ClientConfig {
                server_addr: server,
                max_body_len,
            };
            let client = PatchworkClient::connect(&config, SharedImage::default()).await?;
            client_console::run(client).await?;
            log::info!("disconnected");
        }
    }

    Ok(())
}
