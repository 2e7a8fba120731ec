//! Private transfer CLI
//!
//! - `setup`: generate proving artifacts and write them to disk
//! - `prove`: prove a JSON transfer request and print the settlement payload
//! - `verify`: check a settlement payload printed by `prove`
//! - `demo`:  a transfer, a replay attempt and a claim against an
//!   in-memory settlement ledger
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use private_transfer::{
    backend::{ArtifactError, BackendError},
    field,
    prover::{HexPayload, SettlementPayload},
    settlement::SettlementError,
    Address, Config, Halo2Backend, MockBackend, ProofBackend, ProofOrchestrator, ProofVerifier,
    ProverPool, ProvingArtifacts, RecipientOpening, SettlementLedger, TransferRequest,
};

#[derive(Parser)]
#[command(name = "private-transfer", version, about = "Private balance transfers with Halo2 proofs")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate proving artifacts
    Setup {
        /// Output directory (defaults to the configured artifact directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Circuit size parameter
        #[arg(long)]
        k: Option<u32>,
    },
    /// Prove a transfer request read from a JSON file
    Prove {
        request: PathBuf,
        /// Use the transparent transcript backend instead of Halo2
        #[arg(long)]
        mock: bool,
    },
    /// Verify a settlement payload read from a JSON file
    Verify {
        payload: PathBuf,
        /// Use the transparent transcript backend instead of Halo2
        #[arg(long)]
        mock: bool,
    },
    /// Run a transfer end to end against an in-memory ledger
    Demo {
        /// Use the transparent transcript backend instead of Halo2
        #[arg(long)]
        mock: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Setup { out, k } => {
            let dir = out.unwrap_or_else(|| config.prover.artifact_dir.clone());
            let k = k.unwrap_or(config.prover.k);
            let artifacts = ProvingArtifacts::setup(k)?;
            artifacts.write_to(&dir)?;
            println!("Proving artifacts (k = {}) written to {}", k, dir.display());
            Ok(())
        }
        Command::Prove { request, mock } => {
            let bytes = std::fs::read(&request)
                .with_context(|| format!("reading request {}", request.display()))?;
            let request: TransferRequest =
                serde_json::from_slice(&bytes).context("parsing transfer request")?;
            if mock {
                prove(Arc::new(MockBackend::default()), &config, request).await
            } else {
                prove(Arc::new(load_halo2(&config)?), &config, request).await
            }
        }
        Command::Verify { payload, mock } => {
            let bytes = std::fs::read(&payload)
                .with_context(|| format!("reading payload {}", payload.display()))?;
            let file: PayloadFile =
                serde_json::from_slice(&bytes).context("parsing settlement payload")?;
            let payload = SettlementPayload::from_hex(file.hex())?;
            if mock {
                verify(Arc::new(MockBackend::default()), &config, &payload)
            } else {
                verify(Arc::new(load_halo2(&config)?), &config, &payload)
            }
        }
        Command::Demo { mock } => {
            if mock {
                demo(Arc::new(MockBackend::default()), &config).await
            } else {
                demo(Arc::new(load_halo2(&config)?), &config).await
            }
        }
    }
}

/// Either a bare payload or the full output of `prove`
#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadFile {
    Bare(HexPayload),
    Wrapped { payload: HexPayload },
}

impl PayloadFile {
    fn hex(&self) -> &HexPayload {
        match self {
            PayloadFile::Bare(hex) | PayloadFile::Wrapped { payload: hex } => hex,
        }
    }
}

fn load_halo2(config: &Config) -> Result<Halo2Backend> {
    let dir = &config.prover.artifact_dir;
    match Halo2Backend::load(dir) {
        Ok(backend) => Ok(backend),
        Err(BackendError::Artifacts(ArtifactError::Missing(path))) => bail!(
            "proving artifact {} not found; run `private-transfer setup` first",
            path.display()
        ),
        Err(e) => Err(e).with_context(|| format!("loading artifacts from {}", dir.display())),
    }
}

fn pool<B: ProofBackend + 'static>(backend: Arc<B>, config: &Config) -> ProverPool<B> {
    let orchestrator = ProofOrchestrator::new(backend, config.prover.recipient_binding);
    ProverPool::new(
        Arc::new(orchestrator),
        Some(config.prover.workers()),
        config.prover.max_generation_time(),
    )
}

async fn prove<B: ProofBackend + 'static>(
    backend: Arc<B>,
    config: &Config,
    request: TransferRequest,
) -> Result<()> {
    let pool = pool(backend, config);
    let proof = pool.generate(request).await?;
    let payload = pool
        .orchestrator()
        .format_for_settlement(&proof.proof, &proof.public_signals)?;

    let output = json!({
        "payload": payload.to_hex(),
        "valid": proof.public_signals.valid,
        "salt": proof.salt.to_hex(),
        "recipientBlinding": proof.recipient_blinding.map(|b| field::to_hex(&b)),
        "generationTimeMs": proof.generation_time.as_millis() as u64,
        "stats": proof.stats,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn verify<B: ProofBackend + 'static>(
    backend: Arc<B>,
    config: &Config,
    payload: &SettlementPayload,
) -> Result<()> {
    let orchestrator = ProofOrchestrator::new(backend, config.prover.recipient_binding);
    let verified = orchestrator.verify_payload(payload)?;
    let signals = payload.signals()?;

    let output = json!({
        "verified": verified,
        "valid": signals.valid,
        "assetId": signals.asset_id,
        "nullifier": field::to_hex(&signals.nullifier.to_field()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    if !verified {
        bail!("payload does not verify");
    }
    Ok(())
}

async fn demo<B: ProofBackend + 'static>(backend: Arc<B>, config: &Config) -> Result<()> {
    const ASSET: u64 = 1998;
    let owner = config.settlement.owner;
    let sender: Address = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC".parse()?;
    let recipient: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse()?;

    println!("==============================================");
    println!("  Private Transfer Demonstration");
    println!("==============================================\n");

    // ===== Ledger =====
    println!("1. Opening settlement ledger (owner {})...", owner);
    let verifier: Arc<dyn ProofVerifier> = backend.clone();
    let ledger = SettlementLedger::from_config(&config.settlement, verifier)?;
    ledger.set_asset_whitelist(&owner, ASSET, true)?;
    println!("   Asset {} whitelisted", ASSET);

    // ===== Prove =====
    println!("\n2. Sender proves a transfer of 95 out of a hidden balance of 6000...");
    let pool = pool(backend, config);
    let proof = pool
        .generate(TransferRequest {
            sender_balance: 6000,
            transfer_amount: 95,
            recipient: recipient.to_string(),
            asset_id: ASSET,
            max_amount: 12000,
            salt: None,
            balance_commitment: None,
        })
        .await?;
    let signals = &proof.public_signals;
    println!("   valid:           {}", signals.valid);
    println!("   new balance:     {}", signals.new_balance);
    println!("   nullifier:       {:?}", signals.nullifier);
    println!("   proof size:      {} bytes", proof.proof.len());
    println!("   generated in:    {:?}", proof.generation_time);

    // ===== Settle =====
    println!("\n3. Submitting to settlement...");
    let payload = pool
        .orchestrator()
        .format_for_settlement(&proof.proof, &proof.public_signals)?;
    let pending = ledger.submit_transfer(sender, &payload.proof, &payload.public_signals)?;
    println!("   Pending transfer recorded: amount {}, asset {}", pending.amount, pending.asset_id);

    // ===== Replay =====
    println!("\n4. Replaying the same proof...");
    match ledger.submit_transfer(sender, &payload.proof, &payload.public_signals) {
        Err(SettlementError::NullifierAlreadyUsed) => {
            println!("   Rejected: nullifier already used")
        }
        other => bail!("replay was not rejected: {:?}", other),
    }

    // ===== Claim =====
    println!("\n5. Recipient claims...");
    let opening: RecipientOpening = proof.recipient_opening();
    let amount = ledger.claim_transfer(&signals.recipient_tag, &opening)?;
    println!(
        "   Released {} of asset {} to {}",
        amount,
        ASSET,
        recipient
    );
    println!(
        "   Released balance now {}",
        ledger.released_balance(&recipient, ASSET)
    );

    let stats = ledger.stats();
    info!(
        total_transfers = stats.total_transfers,
        events = ledger.events().len(),
        "demo complete"
    );
    println!("\nDone: 1 transfer settled, 1 replay rejected, 1 claim released.");
    Ok(())
}
