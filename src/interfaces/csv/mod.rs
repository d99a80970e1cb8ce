pub mod record_reader;
pub mod tick_writer;
