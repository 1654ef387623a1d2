//! Room lifecycle for Wildstack.
//!
//! A room is a single shared document at `lobby/{code}`: who is seated
//! where, the host's rule tweaks, and whether the game has started. Every
//! mutation goes through a conditional transaction on that document, so
//! two phones tapping "join" at the same instant can never be assigned
//! the same seat.
//!
//! # Key types
//!
//! - [`LobbyClient`] — create/join/configure/start rooms over a store
//! - [`Room`] — the persisted room document
//! - [`GameConfig`] — the host's rule sliders
//! - [`RoomCode`] — the 4-digit code players type to join

mod client;
mod config;
mod error;
mod room;

pub use client::{GameStart, LobbyClient, RoomWatch};
pub use config::GameConfig;
pub use error::LobbyError;
pub use room::{Player, PlayerId, Room, RoomCode, Seat};
