//! Payslip Mailer Library
//!
//! This library loads employee compensation rows from a spreadsheet,
//! renders a one-page PDF payslip per employee, and emails it over SMTP.

pub mod config;
pub mod helpers;
pub mod models;
pub mod service;

pub use config::{AppConfig, MailConfig};
pub use service::{PayslipService, RowOutcome, RunSummary};

// Re-export key types for convenience
pub use helpers::email::{Mailer, SmtpMailer};
pub use models::employee::EmployeeRecord;
