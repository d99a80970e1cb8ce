//! Domain types: references, settlement states, backend records and the ports
//! the application layer depends on.

pub mod delivery;
pub mod ports;
pub mod record;
pub mod reference;
pub mod settlement;
