pub mod analyzers;
pub mod columns;
pub mod config;
pub mod encoding;
pub mod error;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod partition;
pub mod response;
pub mod table;
