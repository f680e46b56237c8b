/// One employee's compensation row, as loaded from the input sheet.
///
/// Every field is always present: missing text columns load as empty strings
/// and missing or unparseable numeric columns load as `0.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub basic_salary: f64,
    pub allowance: f64,
    pub deductions: f64,
}

impl EmployeeRecord {
    pub fn net_salary(&self) -> f64 {
        net_salary(self.basic_salary, self.allowance, self.deductions)
    }

    /// Whether this row has somewhere to deliver its payslip.
    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}

/// Net pay for a row. Not floored at zero.
pub fn net_salary(basic_salary: f64, allowance: f64, deductions: f64) -> f64 {
    basic_salary + allowance - deductions
}

/// Formats an amount the way it appears on the payslip: `$ 1234.50`.
pub fn format_amount(amount: f64) -> String {
    format!("$ {:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_adds_allowance_and_subtracts_deductions() {
        assert_eq!(net_salary(3000.0, 500.0, 200.0), 3300.0);
        assert_eq!(format_amount(net_salary(3000.0, 500.0, 200.0)), "$ 3300.00");
    }

    #[test]
    fn net_can_go_negative() {
        let record = EmployeeRecord {
            basic_salary: 100.0,
            deductions: 250.5,
            ..Default::default()
        };
        assert_eq!(record.net_salary(), -150.5);
        assert_eq!(format_amount(record.net_salary()), "$ -150.50");
    }

    #[test]
    fn amounts_always_have_two_decimals() {
        assert_eq!(format_amount(0.0), "$ 0.00");
        assert_eq!(format_amount(1234.5), "$ 1234.50");
    }

    #[test]
    fn blank_email_counts_as_missing() {
        let mut record = EmployeeRecord::default();
        assert!(!record.has_email());
        record.email = "   ".to_string();
        assert!(!record.has_email());
        record.email = "jane@example.com".to_string();
        assert!(record.has_email());
    }
}
