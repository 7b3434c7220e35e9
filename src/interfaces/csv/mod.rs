pub mod catalog_reader;
pub mod receipt_writer;
