pub mod email;
pub mod pdf;
pub mod spreadsheet;
