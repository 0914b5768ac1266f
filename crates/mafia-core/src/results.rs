//! End-of-round results table.

use rand::RngExt;

use crate::role::{Role, assign_seat_role};
use crate::roster::Roster;
use crate::settings::GameSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerResult {
    pub name: String,
    pub avatar_ref: String,
    pub role: Role,
}

/// Build the results table for the lobby's players.
///
/// Only the local player's role is known here. Every other seat gets an
/// independent Mafia-or-Civilian draw weighted by the session's mafia share.
pub fn round_results<R: RngExt + ?Sized>(
    rng: &mut R,
    roster: &Roster,
    local_id: &str,
    local_role: Role,
    settings: &GameSettings,
) -> Vec<PlayerResult> {
    roster
        .players()
        .iter()
        .map(|p| {
            let role = if p.id == local_id {
                local_role
            } else {
                assign_seat_role(rng, settings.total_players(), settings.mafia_count())
            };
            PlayerResult {
                name: p.display_name.clone(),
                avatar_ref: p.avatar_ref.clone(),
                role,
            }
        })
        .collect()
}
