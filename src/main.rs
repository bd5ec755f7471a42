//! CL8Y Bridge Orchestrator CLI
//!
//! Runs a bridge transfer for the configured signer and follows it on the
//! indexer until it reaches a final status:
//!
//! ```text
//! bridge-orchestrator bridge --from 1 --to 369 --amount 1.0
//! bridge-orchestrator bridge --from 1 --to 369 --token 0x6B17...1d0F --symbol DAI --amount 250
//! bridge-orchestrator status <message-id>
//! bridge-orchestrator history --limit 10
//! ```
//!
//! Configuration comes from the environment; see `config.rs`.

use alloy::primitives::Address;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use eyre::{eyre, WrapErr};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use bridge_orchestrator::{
    types::format_amount, Account, BridgeIntent, BridgeOrchestrator, BridgeToken, ChainGateway,
    Config, EvmGateway, HttpIndexer, IndexerApi, TrackerState, Tracking, WalletSession,
    NATIVE_ASSET,
};

#[derive(Parser)]
#[command(name = "bridge-orchestrator")]
#[command(about = "Submit and track CL8Y bridge transfers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Approve if needed, relay, and follow the transfer to completion
    Bridge(TransferArgs),

    /// Check whether the bridge may already move the amount
    CheckApproval(TransferArgs),

    /// Show the signer's balance of a token
    Balance {
        /// Chain id
        #[arg(long)]
        chain: u64,

        #[command(flatten)]
        token: TokenArgs,
    },

    /// Follow a registered transfer by message id
    Status { message_id: String },

    /// List the signer's transfers
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
}

#[derive(Args)]
struct TokenArgs {
    /// Token address, or "native" for the chain's gas token
    #[arg(long, default_value = "native")]
    token: String,

    #[arg(long, default_value = "ETH")]
    symbol: String,

    #[arg(long, default_value_t = 18)]
    decimals: u8,
}

#[derive(Args)]
struct TransferArgs {
    /// Source chain id
    #[arg(long)]
    from: u64,

    /// Destination chain id
    #[arg(long)]
    to: u64,

    #[command(flatten)]
    token: TokenArgs,

    /// Human-readable amount, e.g. "1.5"
    #[arg(long)]
    amount: String,

    /// Receiver on the destination chain; defaults to the signer
    #[arg(long)]
    receiver: Option<String>,
}

impl TokenArgs {
    fn to_token(&self, chain_id: u64) -> eyre::Result<BridgeToken> {
        let address = if self.token.eq_ignore_ascii_case("native") {
            NATIVE_ASSET
        } else {
            Address::from_str(&self.token)
                .wrap_err_with(|| format!("Invalid token address: {}", self.token))?
        };
        Ok(BridgeToken {
            name: self.symbol.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            address,
            chain_id,
            tags: vec![],
        })
    }
}

impl TransferArgs {
    fn to_intent(&self, signer: Address) -> eyre::Result<BridgeIntent> {
        let receiver = match &self.receiver {
            Some(r) => {
                Address::from_str(r).wrap_err_with(|| format!("Invalid receiver: {}", r))?
            }
            None => signer,
        };
        Ok(BridgeIntent {
            from_chain_id: self.from,
            to_chain_id: self.to,
            token: self.token.to_token(self.from)?,
            amount: self.amount.clone(),
            receiver,
        })
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::load()?;
    info!(
        chains = ?config.chains.chain_ids(),
        indexer = %config.indexer_url,
        "Configuration loaded"
    );

    let gateway = Arc::new(EvmGateway::with_signer(&config.chains, &config.private_key)?);
    let signer = gateway
        .signer_address()
        .ok_or_else(|| eyre!("Gateway has no signer"))?;
    let indexer = Arc::new(HttpIndexer::new(
        &config.indexer_url,
        config.indexer_timeout,
    )?);

    let initial_chain = match &cli.command {
        Commands::Bridge(args) | Commands::CheckApproval(args) => args.from,
        Commands::Balance { chain, .. } => *chain,
        _ => config.chains.all()[0].chain_id,
    };
    let session = WalletSession::connect(Account::new(signer), initial_chain);

    let mut orchestrator = BridgeOrchestrator::new(
        gateway,
        indexer,
        config.chains.clone(),
        session,
        config.orchestrator.clone(),
    );

    let result = run(&mut orchestrator, cli.command, signer).await;
    orchestrator.shutdown().await;
    result
}

async fn run<G, I>(
    orchestrator: &mut BridgeOrchestrator<G, I>,
    command: Commands,
    signer: Address,
) -> eyre::Result<()>
where
    G: ChainGateway + ?Sized + 'static,
    I: IndexerApi + ?Sized + 'static,
{
    match command {
        Commands::Bridge(args) => {
            let intent = args.to_intent(signer)?;
            let cancel = orchestrator.cancel_token();

            let outcome = tokio::select! {
                result = orchestrator.submit_bridge(&intent) => result?,
                _ = wait_for_shutdown_signal() => {
                    cancel.cancel();
                    return Ok(());
                }
            };
            info!(
                tx_hash = %outcome.source_tx_hash,
                block = ?outcome.receipt.block_number,
                "Bridge transfer confirmed on source chain"
            );

            match outcome.tracking {
                Tracking::Tracked(_) => follow_status(orchestrator).await,
                Tracking::Degraded { warning } => {
                    warn!(%warning, "Status tracking unavailable");
                    Ok(())
                }
            }
        }
        Commands::CheckApproval(args) => {
            let intent = args.to_intent(signer)?;
            let state = orchestrator.check_approval(&intent).await?;
            info!(
                token = %intent.token.symbol,
                amount = %intent.amount,
                required = state.required,
                "Approval check"
            );
            Ok(())
        }
        Commands::Balance { chain, token } => {
            let token = token.to_token(chain)?;
            let balance = orchestrator.balance(&token).await?;
            info!(
                chain_id = chain,
                token = %token.symbol,
                balance = %format_amount(balance, token.decimals),
                "Balance"
            );
            Ok(())
        }
        Commands::Status { message_id } => {
            orchestrator.resume(&message_id).await;
            follow_status(orchestrator).await
        }
        Commands::History { limit, offset } => {
            let transactions = orchestrator.history(limit, offset).await?;
            info!(count = transactions.len(), "Transfer history");
            for tx in transactions {
                info!(
                    message_id = %tx.message_id,
                    from = tx.source_chain_id,
                    to = tx.target_chain_id,
                    amount = %tx.amount,
                    status = %tx.status,
                    created_at = %tx.created_at,
                    "Transfer"
                );
            }
            Ok(())
        }
    }
}

/// Log status and progress changes until polling ends or a signal arrives
async fn follow_status<G, I>(orchestrator: &BridgeOrchestrator<G, I>) -> eyre::Result<()>
where
    G: ChainGateway + ?Sized + 'static,
    I: IndexerApi + ?Sized + 'static,
{
    let mut status: watch::Receiver<TrackerState> = orchestrator.status();
    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let state = status.borrow_and_update().clone();
        if let Some(err) = &state.error {
            warn!(error = %err, "Status poll failed, retrying");
        }
        if let Some(tx) = &state.transaction {
            info!(
                message_id = %tx.message_id,
                status = %tx.status,
                step = ?orchestrator.progress(Utc::now()),
                target_tx = ?tx.target_tx_hash,
                "Transfer status"
            );
        }
        if !state.polling {
            break;
        }

        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    error!("Status tracker stopped unexpectedly");
                    break;
                }
            }
            _ = &mut shutdown => break,
        }
    }
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_orchestrator=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
