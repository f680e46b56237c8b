use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::{
    helpers::{
        email::{self, Mailer},
        pdf::{self, ORGANIZATION},
    },
    models::employee::EmployeeRecord,
};

pub const SUBJECT: &str = "Your Monthly Payslip";
pub const COMPLETION_MESSAGE: &str = "All Payslips Successfully Created and Sent!";

/// Where a single row ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Sent,
    SendSkipped,
    SendFailed(String),
    RenderFailed(String),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub outcomes: Vec<RowOutcome>,
}

impl RunSummary {
    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Sent))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::SendSkipped))
    }

    pub fn send_failed(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::SendFailed(_)))
    }

    pub fn render_failed(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::RenderFailed(_)))
    }

    fn count(&self, predicate: impl Fn(&RowOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

pub fn email_body(name: &str) -> String {
    format!(
        "Dear {},\n\nPlease find attached your payslip for this month.\n\nBest regards,\n{}",
        name, ORGANIZATION
    )
}

/// Renders a payslip per employee and mails it, one row at a time.
pub struct PayslipService<M: Mailer> {
    pub mailer: M,
    pub output_dir: PathBuf,
}

impl<M: Mailer> PayslipService<M> {
    pub fn new(mailer: M, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        info!(
            "Creating PayslipService writing to {}",
            output_dir.display()
        );
        Self { mailer, output_dir }
    }

    /// Processes every record in order. Per-row failures are logged and
    /// recorded; they never stop the run.
    pub async fn run(&self, records: &[EmployeeRecord]) -> RunSummary {
        info!("Processing {} employee record(s)", records.len());

        let mut summary = RunSummary::default();
        let mut written: HashMap<PathBuf, usize> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let outcome = self.process_record(record).await;

            if !matches!(outcome, RowOutcome::RenderFailed(_)) {
                let path = self.output_dir.join(pdf::payslip_file_name(&record.name));
                if let Some(previous) = written.insert(path.clone(), index) {
                    warn!(
                        "Row {} overwrote {} written for row {}",
                        index + 1,
                        path.display(),
                        previous + 1
                    );
                }
            }

            summary.outcomes.push(outcome);
        }

        info!("{}", COMPLETION_MESSAGE);
        info!(
            "Summary: {} sent, {} skipped (no email), {} failed to send, {} failed to render",
            summary.sent(),
            summary.skipped(),
            summary.send_failed(),
            summary.render_failed()
        );

        summary
    }

    /// Renders one payslip, then mails it if the row has an address.
    pub async fn process_record(&self, record: &EmployeeRecord) -> RowOutcome {
        let net_salary = record.net_salary();

        let path = match pdf::write_payslip(&self.output_dir, record, net_salary) {
            Ok(path) => path,
            Err(e) => {
                error!("Failed to create payslip for '{}': {}", record.name, e);
                return RowOutcome::RenderFailed(e.to_string());
            }
        };

        if !record.has_email() {
            info!("No email for '{}', payslip saved only", record.name);
            return RowOutcome::SendSkipped;
        }

        self.deliver(record, &path).await
    }

    async fn deliver(&self, record: &EmployeeRecord, path: &Path) -> RowOutcome {
        let body = email_body(&record.name);
        match email::notify(&self.mailer, record.email.trim(), SUBJECT, &body, path).await {
            Ok(()) => RowOutcome::Sent,
            Err(reason) => RowOutcome::SendFailed(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::email::MailError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String, String, PathBuf)>>,
    }

    #[async_trait]
    impl Mailer for Recorder {
        async fn send(
            &self,
            to: &str,
            subject: &str,
            body: &str,
            attachment_path: &Path,
        ) -> Result<(), MailError> {
            self.sent.lock().unwrap().push((
                to.to_string(),
                subject.to_string(),
                body.to_string(),
                attachment_path.to_path_buf(),
            ));
            Ok(())
        }
    }

    fn record(name: &str, email: &str) -> EmployeeRecord {
        EmployeeRecord {
            id: "1".into(),
            name: name.into(),
            email: email.into(),
            basic_salary: 3000.0,
            allowance: 500.0,
            deductions: 200.0,
        }
    }

    #[test]
    fn body_greets_by_name() {
        assert_eq!(
            email_body("Jane Doe"),
            "Dear Jane Doe,\n\nPlease find attached your payslip for this month.\n\n\
             Best regards,\nGWAVAVA ENTERPRISE"
        );
    }

    #[tokio::test]
    async fn sends_rendered_payslip_with_fixed_subject() {
        let dir = tempfile::tempdir().unwrap();
        let service = PayslipService::new(Recorder::default(), dir.path());

        let outcome = service.process_record(&record("Jane Doe", " jane@example.com ")).await;

        assert_eq!(outcome, RowOutcome::Sent);
        let sent = service.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, subject, body, path) = &sent[0];
        assert_eq!(to, "jane@example.com");
        assert_eq!(subject, SUBJECT);
        assert!(body.starts_with("Dear Jane Doe,"));
        assert_eq!(path, &dir.path().join("Jane_Doe_Payslip.pdf"));

        let pdf = std::fs::read(path).unwrap();
        assert!(pdf::page_text(&pdf).contains(&"Net Salary    : $ 3300.00".to_string()));
    }

    #[tokio::test]
    async fn empty_email_renders_without_sending() {
        let dir = tempfile::tempdir().unwrap();
        let service = PayslipService::new(Recorder::default(), dir.path());

        let outcome = service.process_record(&record("No Mail", "")).await;

        assert_eq!(outcome, RowOutcome::SendSkipped);
        assert!(service.mailer.sent.lock().unwrap().is_empty());
        assert!(dir.path().join("No_Mail_Payslip.pdf").exists());
    }

    #[tokio::test]
    async fn render_failure_skips_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let service = PayslipService::new(Recorder::default(), dir.path().join("missing"));

        let outcome = service.process_record(&record("Jane Doe", "jane@example.com")).await;

        assert!(matches!(outcome, RowOutcome::RenderFailed(_)));
        assert!(service.mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn summary_counts_each_outcome() {
        let summary = RunSummary {
            outcomes: vec![
                RowOutcome::Sent,
                RowOutcome::Sent,
                RowOutcome::SendSkipped,
                RowOutcome::SendFailed("x".into()),
                RowOutcome::RenderFailed("y".into()),
            ],
        };
        assert_eq!(summary.sent(), 2);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.send_failed(), 1);
        assert_eq!(summary.render_failed(), 1);
    }
}
