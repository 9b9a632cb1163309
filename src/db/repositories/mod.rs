pub mod contacts;
pub mod runs;
