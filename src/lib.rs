pub mod accumulate;
pub mod aggregate;
pub mod census;
pub mod compare;
pub mod config;
pub mod csv_reader;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod statistics;
pub mod tables;
pub mod truth;
pub mod types;
pub mod vcf_parser;
