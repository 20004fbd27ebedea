use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use mailhub::app::{MailHub, SENDER_MESSAGES_MAX};
use mailhub::config::load_config;
use mailhub::terminal::run_tui;

#[derive(Parser)]
#[command(name = "mailhub")]
#[command(about = "Organize your Gmail inbox by sender", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the terminal UI (default)
    Tui,

    /// Sign in with Google in the browser
    Login,

    /// Forget the current credential
    Logout,

    /// Remove the stored token without logging out of the running session
    ClearToken,

    /// Sample the inbox and list senders by message count
    Senders {
        /// Messages to list; at most 20 are inspected
        #[arg(long)]
        sample: Option<u32>,

        #[arg(long)]
        json: bool,
    },

    /// List inbox messages from one sender
    From {
        address: String,

        /// Messages to show; at most 500
        #[arg(long, default_value_t = SENDER_MESSAGES_MAX)]
        max: u32,
    },

    /// Star or unstar a sender
    Favorite { address: String },

    /// Show favorite senders
    Favorites,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e:#}"))?;

    let Some(cmd) = cli.cmd else {
        return run_tui(cfg);
    };

    match cmd {
        Command::Tui => run_tui(cfg),

        Command::Login => {
            let mut hub = MailHub::open(cfg);
            hub.login_with_browser()?;
            println!("Logged in.");
            Ok(())
        }

        Command::Logout => {
            let mut hub = MailHub::open(cfg);
            hub.logout();
            println!("Logged out.");
            Ok(())
        }

        Command::ClearToken => {
            let hub = MailHub::open(cfg);
            hub.clear_stored_token();
            println!("Stored token removed.");
            Ok(())
        }

        Command::Senders { sample, json } => {
            let sample = sample.unwrap_or_else(|| cfg.sample_size());
            let hub = MailHub::open(cfg);
            let senders = hub.senders(sample)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&senders)?);
                return Ok(());
            }
            let favs = hub.favorites();
            for s in &senders {
                let star = if favs.contains(&s.address) { '*' } else { ' ' };
                println!("{star} {:>4}  {} <{}>", s.count, s.name, s.address);
            }
            Ok(())
        }

        Command::From { address, max } => {
            let hub = MailHub::open(cfg);
            for m in hub.messages_from(&address, max)? {
                println!(
                    "{}  {}  {}",
                    m.id,
                    m.date().unwrap_or("-"),
                    m.subject().unwrap_or("(no subject)")
                );
            }
            Ok(())
        }

        Command::Favorite { address } => {
            let hub = MailHub::open(cfg);
            if hub.toggle_favorite(&address) {
                println!("{address} added to favorites");
            } else {
                println!("{address} removed from favorites");
            }
            Ok(())
        }

        Command::Favorites => {
            let hub = MailHub::open(cfg);
            for a in hub.favorites().iter() {
                println!("{a}");
            }
            Ok(())
        }
    }
}
