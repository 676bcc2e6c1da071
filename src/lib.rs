pub mod adapters;
pub mod adl;
pub mod arg_parser;
pub mod commands;
pub mod config;
pub mod errors;
pub mod logger;
pub mod performance;
pub mod selection;
pub mod session;
