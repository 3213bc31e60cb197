//! Ticket sale demo binary
//!
//! Opens a sale from environment configuration, runs a short session of
//! purchases, a swap, a return and an owner withdrawal, and prints a JSON
//! summary.

use anyhow::Context;
use std::sync::Arc;
use ticket_sale::{Address, RegistryEnvironment, SaleConfig, TicketOffice, TracingEventBus};
use ticket_sale_core::environment::SystemClock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_sale=debug,ticket_sale_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SaleConfig::from_env();
    config.validate().context("invalid sale configuration")?;

    tracing::info!(
        total_tickets = config.total_tickets,
        ticket_price = %config.ticket_price,
        owner = %config.owner,
        topic = %config.event_topic,
        "Opening ticket sale"
    );

    let env = RegistryEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(TracingEventBus),
        config.event_topic.clone(),
    );
    let office = TicketOffice::new(&config, env);
    let price = config.ticket_price;

    let alice = Address::from_low_u64(1);
    let bob = Address::from_low_u64(2);
    let carol = Address::from_low_u64(3);

    let first = config.total_tickets.min(1);
    let second = config.total_tickets.min(2);

    office.buy_ticket(first, price, alice).await?;
    println!("{alice} bought ticket {}", office.ticket_of(&alice).await);

    match office.buy_ticket(first, price, carol).await {
        Ok(_) => println!("{carol} bought ticket {first}"),
        Err(error) => println!("{carol} could not buy ticket {first}: {error}"),
    }

    if second != first {
        office.buy_ticket(second, price, bob).await?;
        println!("{bob} bought ticket {}", office.ticket_of(&bob).await);

        office.offer_swap(bob, alice).await?;
        office.accept_swap(alice, bob).await?;
        println!(
            "After swap: {alice} holds {}, {bob} holds {}",
            office.ticket_of(&alice).await,
            office.ticket_of(&bob).await
        );
    }

    let released = office.return_ticket(alice).await?;
    println!("{alice} returned their ticket, releasing {released} to the owner");

    if alice != config.owner {
        if let Err(error) = office.withdraw_funds(alice).await {
            println!("{alice} could not withdraw: {error}");
        }
    }

    let withdrawn = office.withdraw_funds(config.owner).await?;
    println!("Owner {} withdrew {withdrawn}", config.owner);

    let summary = office.summary().await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    office
        .shutdown()
        .await
        .context("event publication did not finish before shutdown")?;

    Ok(())
}
