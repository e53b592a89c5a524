//! CSV adapters used by the command line front door.

pub mod report_writer;
pub mod seed_reader;
