pub mod join_code;
pub mod lobby;
pub mod results;
pub mod role;
pub mod roster;
pub mod screen;
pub mod session;
pub mod settings;
