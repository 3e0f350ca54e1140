pub mod export;
pub mod ser;
pub mod ser_writer;
