mod csv;

pub use csv::{export_contacts, render_csv, CSV_HEADER};
