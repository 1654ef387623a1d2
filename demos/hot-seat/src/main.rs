//! Hot-seat demo: two scripted players on one in-memory store.
//!
//! Creates a room through the lobby, joins a second player, starts the
//! game, and lets two simple bots play through their engines until one
//! of them empties their hand. Run with `RUST_LOG=debug` to watch the
//! sync layer underneath.

use std::sync::Arc;

use wildstack::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let ana = SessionContext::new(PlayerId::new("ana"), "Ana", Arc::clone(&store));
    let ben = SessionContext::new(PlayerId::new("ben"), "Ben", Arc::clone(&store));

    let lobby = ana.lobby();
    let room = lobby.create_room(ana.player_id.clone(), "Ana", 2).await?;
    tracing::info!(code = %room.code, "room open");
    ben.lobby()
        .join_room(room.code, ben.player_id.clone(), "Ben")
        .await?;
    let (_, start) = lobby.start_game(room.code, &ana.player_id).await?;
    tracing::info!(game = %start.game_id, "game started");

    let ana_engine = GameEngine::spawn(ana, start.clone()).await?;
    let ben_engine = GameEngine::spawn(ben, start).await?;

    let (a, b) = tokio::join!(drive("Ana", ana_engine), drive("Ben", ben_engine));
    a?;
    b?;
    Ok(())
}

/// Watches snapshots and acts whenever the bot's seat is up.
async fn drive(name: &str, engine: EngineHandle) -> Result<(), WildstackError> {
    let mut watch = engine.watch();
    loop {
        let snap = watch.borrow_and_update().clone();
        if snap.finished {
            match snap.winner {
                Some(seat) if seat == snap.local_seat => {
                    tracing::info!(player = name, "I win!");
                }
                Some(seat) => {
                    tracing::info!(player = name, winner = %snap.seats[seat], "game over");
                }
                None => tracing::info!(player = name, "game over"),
            }
            return Ok(());
        }

        if snap.phase == PlayPhase::AwaitingColorChoice {
            let color = favorite_color(&snap.hand);
            tracing::info!(player = name, %color, "choosing color");
            if let Err(error) = engine.resolve_color_choice(color).await {
                tracing::warn!(player = name, %error, "color choice bounced");
            }
        } else if snap.is_local_turn() && snap.phase == PlayPhase::Idle {
            take_turn(name, &engine, &snap).await;
        }

        if watch.changed().await.is_err() {
            return Ok(());
        }
    }
}

/// Plays the first legal card (tap, tap, commit), or draws.
async fn take_turn(name: &str, engine: &EngineHandle, snap: &GameSnapshot) {
    let playable = snap
        .hand
        .iter()
        .position(|card| card.is_playable(&snap.discard_top, &snap.chain));

    let result = match playable {
        Some(index) => {
            let card = snap.hand[index];
            tracing::info!(player = name, %card, "playing");
            preview_and_commit(engine, index).await
        }
        None => {
            tracing::info!(player = name, "nothing playable, drawing");
            engine.draw_for_turn().await.map(|outcome| {
                if let DrawOutcome::MayPlay { drawn } = outcome {
                    tracing::info!(player = name, drawn, "drew a playable card");
                }
            })
        }
    };
    match result {
        // Snapshots carry the board forward; a bounced action just waits
        // for the next one.
        Err(error) => tracing::warn!(player = name, %error, "action bounced"),
        Ok(()) => {
            let _ = engine.call_uno().await;
        }
    }
}

async fn preview_and_commit(
    engine: &EngineHandle,
    index: usize,
) -> Result<(), WildstackError> {
    engine.select_card(index).await?;
    engine.select_card(index).await?;
    engine.commit_play(index).await?;
    Ok(())
}

/// The color the bot holds the most of, for wild resolution.
fn favorite_color(hand: &[Card]) -> Color {
    Color::CHOOSABLE
        .into_iter()
        .max_by_key(|c| hand.iter().filter(|card| card.color == *c).count())
        .unwrap_or(Color::Red)
}
