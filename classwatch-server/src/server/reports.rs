//! Report export. Encoders are pluggable behind [`ReportGenerator`];
//! the default implementation returns descriptive placeholder bytes
//! rather than real PDF/XLSX documents.

use std::str::FromStr;

/// Export formats offered by the console's report dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pdf,
    Excel,
}

impl FromStr for ReportFormat {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(ReportFormat::Pdf),
            "excel" => Ok(ReportFormat::Excel),
            _ => Err(()),
        }
    }
}

impl ReportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "xlsx",
        }
    }
}

/// Produces the downloadable document for a report export request.
pub trait ReportGenerator: Send + Sync {
    fn generate(
        &self,
        format: ReportFormat,
        report_type: &str,
        start_date: &str,
        end_date: &str,
        student_id: Option<&str>,
    ) -> Vec<u8>;
}

/// Placeholder generator: emits a one-line text payload naming the
/// requested report instead of an encoded document.
#[derive(Debug, Default, Clone)]
pub struct StubReportGenerator;

impl ReportGenerator for StubReportGenerator {
    fn generate(
        &self,
        format: ReportFormat,
        report_type: &str,
        start_date: &str,
        end_date: &str,
        student_id: Option<&str>,
    ) -> Vec<u8> {
        let label = match format {
            ReportFormat::Pdf => "PDF",
            ReportFormat::Excel => "Excel",
        };
        let student_suffix = student_id
            .map(|s| format!(", Student: {}", s))
            .unwrap_or_default();
        format!(
            "{} Report - Type: {}, Period: {} to {}{}",
            label, report_type, start_date, end_date, student_suffix
        )
        .into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_payload_names_the_report() {
        let body = StubReportGenerator.generate(
            ReportFormat::Pdf,
            "activity",
            "2026-08-01",
            "2026-08-15",
            None,
        );
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text,
            "PDF Report - Type: activity, Period: 2026-08-01 to 2026-08-15"
        );
    }

    #[test]
    fn stub_payload_includes_student_when_given() {
        let body = StubReportGenerator.generate(
            ReportFormat::Excel,
            "usage",
            "a",
            "b",
            Some("stu-1"),
        );
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("Excel Report"));
        assert!(text.ends_with("Student: stu-1"));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!("csv".parse::<ReportFormat>().is_err());
        assert_eq!("pdf".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
    }
}
