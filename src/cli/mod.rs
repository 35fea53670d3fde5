//! Terminal and file output

pub mod plot;
pub mod table;
