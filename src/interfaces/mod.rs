pub mod arrival;
pub mod csv;
