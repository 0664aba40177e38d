//! Subcommand implementations.

use crate::store::{connection_factory, Node};
use anyhow::Context;
use fieldsync_config_and_utils::{Config, Paths};
use fieldsync_core::EntityId;
use fieldsync_listener::{ArrivalOutcome, SyncListener};
use fieldsync_player::{ItemStack, Location, PlayerState};
use std::sync::Arc;
use tracing::info;

pub async fn check(config: &Config, paths: &Paths) -> anyhow::Result<()> {
    let factory = connection_factory(config, paths)?;
    let target = factory.describe();
    let node = Node::new(config, factory)?;

    let engine = Arc::clone(&node.engine);
    let fields = tokio::task::spawn_blocking(move || {
        engine.provision()?;
        let fields = engine.field_identifiers()?;
        engine.close()?;
        anyhow::Ok(fields)
    })
    .await??;

    println!("store:    {target}");
    println!("fields:   {}", fields.join(", "));
    let excluded = node.engine.excluded();
    if !excluded.is_empty() {
        println!("excluded: {}", excluded.join(", "));
    }
    Ok(())
}

/// Writes a player from one node and reads it back into a fresh player on a
/// second node, the way two servers hand a player over.
pub async fn handoff(config: &Config, paths: &Paths, id: EntityId) -> anyhow::Result<()> {
    let source = Node::new(config, connection_factory(config, paths)?)?;
    let target = Node::new(config, connection_factory(config, paths)?)?;

    let departing = SyncListener::new(Arc::clone(&source.engine), source.players.clone());
    let arriving = SyncListener::new(Arc::clone(&target.engine), target.players.clone())
        .with_arrival_delay(config.arrival_delay());

    source.players.join(id, sample_player());
    departing.on_departure(id).await?;
    source.players.leave(&id);
    info!(entity = %id, "Player departed");

    target.players.join(id, PlayerState::new("Alex"));
    let outcome = arriving.on_arrival(id).await?;

    let arrived = target
        .players
        .get(&id)
        .context("player left before arrival finished")?;
    match outcome {
        ArrivalOutcome::Applied(count) => println!("applied {count} fields to {id}"),
        ArrivalOutcome::Cancelled => println!("arrival apply cancelled for {id}"),
        ArrivalOutcome::EntityGone => println!("{id} left before arrival"),
    }
    println!("health:     {}", arrived.health);
    println!("food:       {}", arrived.food);
    println!("level:      {}", arrived.level);
    println!("experience: {}", arrived.experience);
    println!(
        "location:   {} {} {} {}",
        arrived.location.world, arrived.location.x, arrived.location.y, arrived.location.z
    );
    println!(
        "inventory:  {} occupied slots",
        arrived.inventory.slots().iter().flatten().count()
    );

    for node in [source, target] {
        let engine = node.engine;
        tokio::task::spawn_blocking(move || engine.close()).await??;
    }
    Ok(())
}

pub async fn inspect(config: &Config, paths: &Paths, id: EntityId) -> anyhow::Result<()> {
    let node = Node::new(config, connection_factory(config, paths)?)?;

    let engine = Arc::clone(&node.engine);
    let rows = tokio::task::spawn_blocking(move || {
        let rows: Vec<(String, String)> = engine
            .read(id)?
            .iter()
            .map(|v| (v.identifier().to_string(), v.stored_text().to_string()))
            .collect();
        engine.close()?;
        anyhow::Ok(rows)
    })
    .await??;

    if rows.is_empty() {
        println!("no stored fields for {id}");
    }
    for (identifier, stored) in rows {
        println!("{identifier}\t{stored}");
    }
    Ok(())
}

pub fn show_config(config: &Config, paths: &Paths, save: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        config.save(paths)?;
        println!("saved to {}", paths.config_file().display());
    }
    Ok(())
}

fn sample_player() -> PlayerState {
    let mut player = PlayerState::new("Alex");
    player.health = 14.0;
    player.food = 7;
    player.level = 31;
    player.experience = 0.5;
    player.location = Location::new("world_nether", 12.5, 70.0, -340.0);
    player.inventory.set(0, Some(ItemStack::new("diamond_sword", 1)));
    player.inventory.set(8, Some(ItemStack::new("cooked_beef", 32)));
    player
}
