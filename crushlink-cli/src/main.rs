use anyhow::{Context, Result};
use clap::Parser;
use crushlink_core::clock::SystemClock;
use crushlink_core::config::Config;
use crushlink_core::core_access::{LocalSigner, SessionSigner};
use crushlink_core::core_client::{ClientSession, ContextWatch, RequestContext};
use crushlink_core::core_fhe::MockFheEngine;
use crushlink_core::logging::init_logging_with_config;
use crushlink_core::{Address, Matchmaker};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crushlink")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the full submit / check / message flow against the mock engine
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    config.logging.level = args.log_level.clone();
    config.logging.json_format = args.json_logs;
    init_logging_with_config(&config.logging)?;

    match args.command {
        Some(Command::Demo) => run_demo(config).await?,
        None => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

/// Scripted three-actor walkthrough of the protocol
async fn run_demo(config: Config) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let engine = Arc::new(MockFheEngine::new(clock.clone()));
    let coordinator = Address([0xc0; 20]);
    let config = Arc::new(config);
    let matchmaker = Arc::new(Matchmaker::new(
        engine.clone(),
        clock.clone(),
        config.clone(),
        coordinator,
    ));

    let session = |seed: u8| {
        let signer = LocalSigner::from_seed([seed; 32]);
        let principal = signer.principal();
        let session = ClientSession::new(
            matchmaker.clone(),
            engine.clone(),
            Arc::new(signer),
            clock.clone(),
            &config,
            ContextWatch::new(RequestContext {
                chain_id: 31_337,
                principal,
            }),
        );
        (principal, session)
    };

    let (alice_addr, alice) = session(1);
    let (bob_addr, bob) = session(2);
    let (charlie_addr, charlie) = session(3);

    info!(alice = %alice_addr, bob = %bob_addr, charlie = %charlie_addr, "Demo actors ready");

    // Alice and Bob name each other; Charlie names Alice
    let receipt = alice
        .submit_crush(bob_addr)
        .await?
        .completed()
        .context("demo runs with no concurrent operations")?;
    info!(
        remaining = receipt.remaining_attempts,
        "Alice submitted her crush"
    );
    bob.submit_crush(alice_addr).await?;
    charlie.submit_crush(alice_addr).await?;

    // Mutual interest is revealed to the pair...
    let outcome = alice
        .check_match(bob_addr)
        .await?
        .completed()
        .context("demo runs with no concurrent operations")?;
    info!(is_match = outcome.is_match, "Alice checked Bob");

    // ...one-sided interest is not
    let outcome = charlie
        .check_match(alice_addr)
        .await?
        .completed()
        .context("demo runs with no concurrent operations")?;
    info!(is_match = outcome.is_match, "Charlie checked Alice");

    // The matched pair exchanges messages
    alice.send_message(bob_addr, "we matched!").await?;
    bob.send_message(alice_addr, "coffee on friday?").await?;

    let conversation = bob
        .load_conversation(alice_addr)
        .await?
        .completed()
        .context("demo runs with no concurrent operations")?;
    for entry in &conversation {
        info!(from = %entry.from, text = %entry.text, "Message");
    }

    info!("Demo finished");
    Ok(())
}
