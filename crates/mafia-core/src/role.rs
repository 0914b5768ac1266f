//! Secret roles and how the local player draws one.
//!
//! Each player draws independently: with `m` mafia among `n` players the
//! local player is Mafia with probability `m/n`, Detective with probability
//! `1/n`, and Civilian otherwise. Nothing coordinates draws across players, so
//! a table can end up with more or fewer than `m` mafia.

use std::fmt;

use rand::RngExt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Mafia,
    Detective,
    Civilian,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Mafia => "Mafia",
            Role::Detective => "Detective",
            Role::Civilian => "Civilian",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Role::Mafia => "🔪",
            Role::Detective => "🔍",
            Role::Civilian => "👤",
        }
    }

    /// Briefing shown on the reveal card.
    pub fn briefing(self) -> &'static str {
        match self {
            Role::Mafia => {
                "Eliminate the innocent without getting caught. Work with other Mafia members to deceive the town."
            }
            Role::Detective => {
                "Find the Mafia before it's too late. You can investigate one player each night."
            }
            Role::Civilian => {
                "Work with others to identify the Mafia. Use your vote wisely in town meetings."
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a uniform draw in `[0, 1)` to a role.
pub fn role_for_draw(draw: f64, total_players: u32, mafia_count: u32) -> Role {
    if total_players == 0 {
        return Role::Civilian;
    }
    let total = f64::from(total_players);
    let p_mafia = f64::from(mafia_count) / total;
    let p_detective = 1.0 / total;

    if draw < p_mafia {
        Role::Mafia
    } else if draw < p_mafia + p_detective {
        Role::Detective
    } else {
        Role::Civilian
    }
}

/// Draw a role for the local player.
pub fn assign_role<R: RngExt + ?Sized>(rng: &mut R, total_players: u32, mafia_count: u32) -> Role {
    role_for_draw(rng.random::<f64>(), total_players, mafia_count)
}

/// Draw a Mafia-or-Civilian role for a seat whose real role is unknown
/// locally. Used to fill the results table.
pub fn assign_seat_role<R: RngExt + ?Sized>(
    rng: &mut R,
    total_players: u32,
    mafia_count: u32,
) -> Role {
    if total_players == 0 {
        return Role::Civilian;
    }
    let p_mafia = f64::from(mafia_count) / f64::from(total_players);
    if rng.random::<f64>() < p_mafia {
        Role::Mafia
    } else {
        Role::Civilian
    }
}
