//! Crash Fair Demo
//!
//! Runs one round end-to-end, audits the published record, shows a tampered
//! seed being caught, then samples the multiplier distribution.

use anyhow::{anyhow, Context};
use rand::rngs::OsRng;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crash_fair::{
    run_simulation, EngineConfig, ParticipantId, RoundManager, SimulationReport,
    VerificationOutcome, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env().context("invalid engine configuration")?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Crash Fair v{}", VERSION);
    info!(
        "House edge: {:.2}%, bounds: [{:.2}, {:.2}]",
        config.params.house_edge * 100.0,
        config.params.min_multiplier,
        config.params.max_multiplier
    );

    demo_round(&config).await?;
    demo_simulation(&config)?;
    Ok(())
}

/// Run a single round with two participants and audit it.
async fn demo_round(config: &EngineConfig) -> anyhow::Result<()> {
    info!("=== Starting Demo Round ===");

    let manager = RoundManager::new(config.params.clone())?;
    let start = manager.start_round().await?;
    info!("Round ID: {}", start.round_id);
    info!("Commitment: {}", start.commitment_hash);

    manager
        .submit_contribution(start.round_id, ParticipantId::from("alice"), "alice-seed")
        .await?;
    manager
        .submit_contribution(start.round_id, ParticipantId::from("bob"), "bob-seed")
        .await?;

    let resolution = manager.lock_and_resolve(start.round_id).await?;
    info!("Crashed at {}x", resolution.final_multiplier);

    let reveal = manager.reveal_seed(start.round_id).await?;
    info!("Operator seed: {}", reveal.operator_seed.as_str());

    let record = manager.record(start.round_id).await?;
    println!("{}", record.to_json()?);

    // Audit the published record
    info!("=== Verifying Round ===");
    match record.verify() {
        Some(VerificationOutcome::Valid) => info!("VERIFIED: record recomputes exactly"),
        Some(outcome) => warn!("VERIFICATION FAILURE: {:?}", outcome),
        None => return Err(anyhow!("record is missing reveal data")),
    }

    // Flip one hex digit of the revealed seed
    let seed = record
        .operator_seed
        .as_ref()
        .context("record has no operator seed")?
        .as_str();
    let mut tampered: Vec<char> = seed.chars().collect();
    if let Some(first) = tampered.first_mut() {
        *first = if *first == '0' { '1' } else { '0' };
    }
    let tampered: String = tampered.into_iter().collect();

    let commitment = record
        .commitment_hash
        .as_ref()
        .context("record has no commitment")?;
    let outcome = manager.verify_round(
        &tampered,
        &record.contributions,
        commitment.as_str(),
        resolution.final_multiplier.as_f64(),
    );
    info!("Tampered seed audit: {:?}", outcome);
    if outcome != VerificationOutcome::CommitmentMismatch {
        warn!("tampered seed was not caught");
    }

    let archived = manager.archive_round(start.round_id).await?;
    info!("Archived round in state {:?}", archived.state);
    Ok(())
}

/// Sample the multiplier distribution and log the histogram.
fn demo_simulation(config: &EngineConfig) -> anyhow::Result<()> {
    info!("=== Simulating {} Rounds ===", config.simulation_rounds);

    let report = run_simulation(config.simulation_rounds, &config.params, &mut OsRng)?;
    log_report(&report);
    Ok(())
}

fn log_report(report: &SimulationReport) {
    for bucket in &report.distribution {
        info!(
            "{:>9}x: {:>8} rounds ({:>6.2}%)",
            bucket.label, bucket.count, bucket.percentage
        );
    }

    info!("Min hit: {}x", report.min_hit);
    info!("Max hit: {}x", report.max_hit);
    info!("Average: {:.4}x (theoretical {:.4}x)", report.average, report.theoretical_mean);
    info!("Median: {:.2}x", report.median);
}
