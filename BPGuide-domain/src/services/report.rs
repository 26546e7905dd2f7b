use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use validator::Validate;

use crate::entities::blood_pressure::{BloodPressureInsights, BloodPressureReading};
use crate::services::blood_pressure::{BloodPressureServiceTrait, ServiceError};
use crate::services::describe_validation_errors;
use crate::services::insights::{calculate_insights, categorize_blood_pressure};
use crate::services::notifier::{EmailAttachment, EmailMessage, Notifier, NotifierError};

pub const CHART_FILENAME: &str = "bp-chart.png";

/// Errors from building or sending a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The chart was not valid base64
    #[error("Invalid chart image: {0}")]
    InvalidChart(String),

    #[error(transparent)]
    Notifier(#[from] NotifierError),
}

impl From<ServiceError> for ReportError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UserNotFound(id) => ReportError::UserNotFound(id),
            ServiceError::Validation(msg) => ReportError::Validation(msg),
            other => ReportError::Storage(other.to_string()),
        }
    }
}

/// What the user asked to have emailed
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(range(min = 1000, max = 9999, message = "User ID must be a 4-digit number"))]
    pub user_id: i64,

    #[validate(length(max = 1000, message = "Problem description cannot exceed 1000 characters"))]
    pub problem: String,

    pub systolic: u16,
    pub diastolic: u16,

    /// Advice text as shown to the user
    pub advice: String,

    /// Base64 PNG, optionally as a `data:` URL
    pub chart_image: Option<String>,
}

/// Decode a chart image, accepting a `data:image/png;base64,` prefix
pub fn decode_chart_image(encoded: &str) -> Result<Vec<u8>, ReportError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ReportError::InvalidChart(e.to_string()))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn display_problem(problem: &str) -> &str {
    match problem.trim() {
        "" => "None reported",
        problem => problem,
    }
}

fn history_lines(insights: &BloodPressureInsights) -> Vec<String> {
    vec![
        format!("Readings on record: {}", insights.reading_count),
        format!(
            "Average: {:.0}/{:.0} mmHg ({})",
            insights.avg_systolic,
            insights.avg_diastolic,
            insights.average_category.label()
        ),
        format!(
            "Range: {}-{} / {}-{} mmHg",
            insights.min_systolic, insights.max_systolic, insights.min_diastolic, insights.max_diastolic
        ),
        format!("Trend: {:?}", insights.trend),
    ]
}

/// Format the report email for a request and the user's history
pub fn build_report(
    request: &ReportRequest,
    history: &[BloodPressureReading],
) -> Result<EmailMessage, ReportError> {
    let category = categorize_blood_pressure(request.systolic, request.diastolic);
    let summary = calculate_insights(history).map(|insights| history_lines(&insights));
    let problem = display_problem(&request.problem);

    let mut text = format!(
        "Blood Pressure Report for User {}\n\nReading: {}/{} mmHg\nCategory: {}\nHealth problems: {}\n\nAdvice:\n{}\n",
        request.user_id,
        request.systolic,
        request.diastolic,
        category.label(),
        problem,
        request.advice.trim()
    );
    if let Some(lines) = &summary {
        text.push_str("\nHistory:\n");
        for line in lines {
            text.push_str(&format!("  {}\n", line));
        }
    }

    let mut html = format!(
        "<h2>Blood Pressure Report for User {}</h2>\
         <p><strong>Reading:</strong> {}/{} mmHg<br><strong>Category:</strong> {}<br><strong>Health problems:</strong> {}</p>\
         <h3>Advice</h3><pre>{}</pre>",
        request.user_id,
        request.systolic,
        request.diastolic,
        category.label(),
        escape_html(problem),
        escape_html(request.advice.trim())
    );
    if let Some(lines) = &summary {
        html.push_str("<h3>History</h3><ul>");
        for line in lines {
            html.push_str(&format!("<li>{}</li>", escape_html(line)));
        }
        html.push_str("</ul>");
    }

    let attachment = match request.chart_image.as_deref().map(str::trim) {
        Some(encoded) if !encoded.is_empty() => {
            html.push_str(&format!("<p>Your chart is attached as {}.</p>", CHART_FILENAME));
            Some(EmailAttachment {
                filename: CHART_FILENAME.to_string(),
                content_type: "image/png".to_string(),
                data: decode_chart_image(encoded)?,
            })
        }
        _ => None,
    };

    Ok(EmailMessage {
        to: request.email.trim().to_string(),
        subject: format!("Blood Pressure Report for User {}", request.user_id),
        text,
        html,
        attachment,
    })
}

/// Builds reports from stored history and hands them to the notifier
pub struct ReportService {
    readings: Arc<dyn BloodPressureServiceTrait>,
    notifier: Arc<dyn Notifier>,
}

impl ReportService {
    pub fn new(readings: Arc<dyn BloodPressureServiceTrait>, notifier: Arc<dyn Notifier>) -> Self {
        Self { readings, notifier }
    }

    pub fn notifier_kind(&self) -> &'static str {
        self.notifier.kind()
    }

    pub async fn send_report(&self, request: ReportRequest) -> Result<(), ReportError> {
        request
            .validate()
            .map_err(|errors| ReportError::Validation(describe_validation_errors(&errors)))?;

        let history = self.readings.get_history(request.user_id).await?;
        let message = build_report(&request, &history)?;
        self.notifier.send(&message).await?;

        info!("Report for user {} handed to {} notifier", request.user_id, self.notifier.kind());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifier::MockNotifier;
    use crate::testing::{registered_store, sample_history};
    use crate::services::blood_pressure::BloodPressureService;

    fn request(chart_image: Option<&str>) -> ReportRequest {
        ReportRequest {
            email: "patient@example.com".to_string(),
            user_id: 1234,
            problem: "Diabetes".to_string(),
            systolic: 150,
            diastolic: 95,
            advice: "Cut down on salt & see a doctor <soon>".to_string(),
            chart_image: chart_image.map(str::to_string),
        }
    }

    #[test]
    fn test_decode_chart_accepts_data_url() {
        assert_eq!(decode_chart_image("data:image/png;base64,iVBORw==").unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert_eq!(decode_chart_image("iVBORw==").unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert!(matches!(decode_chart_image("not base64!"), Err(ReportError::InvalidChart(_))));
    }

    #[test]
    fn test_build_report_contents() {
        let message = build_report(&request(Some("data:image/png;base64,iVBORw==")), &sample_history(1234)).unwrap();

        assert_eq!(message.subject, "Blood Pressure Report for User 1234");
        assert_eq!(message.to, "patient@example.com");
        assert!(message.text.contains("Reading: 150/95 mmHg"));
        assert!(message.text.contains("Category: Hypertension Stage 2"));
        assert!(message.text.contains("Health problems: Diabetes"));
        assert!(message.text.contains("Readings on record: 3"));
        assert!(message.html.contains("&amp; see a doctor &lt;soon&gt;"));

        let attachment = message.attachment.unwrap();
        assert_eq!(attachment.filename, "bp-chart.png");
        assert_eq!(attachment.content_type, "image/png");
    }

    #[test]
    fn test_build_report_without_chart_or_history() {
        let message = build_report(&request(None), &[]).unwrap();
        assert!(message.attachment.is_none());
        assert!(!message.text.contains("History:"));
        assert_eq!(
            message.text,
            "Blood Pressure Report for User 1234\n\n\
             Reading: 150/95 mmHg\n\
             Category: Hypertension Stage 2\n\
             Health problems: Diabetes\n\n\
             Advice:\n\
             Cut down on salt & see a doctor <soon>\n"
        );
        assert!(message
            .html
            .starts_with("<h2>Blood Pressure Report for User 1234</h2><p><strong>Reading:</strong> 150/95 mmHg<br>"));
        assert!(message.html.ends_with("<pre>Cut down on salt &amp; see a doctor &lt;soon&gt;</pre>"));
    }

    #[tokio::test]
    async fn test_send_report_uses_notifier() {
        let store = registered_store(1234).await;
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|message| message.to == "patient@example.com" && message.attachment.is_none())
            .times(1)
            .returning(|_| Ok(()));
        notifier.expect_kind().return_const("mock");

        let service = ReportService::new(Arc::new(BloodPressureService::new(store)), Arc::new(notifier));
        service.send_report(request(None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_report_notifier_failure() {
        let store = registered_store(1234).await;
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .returning(|_| Err(NotifierError::Rejected { status: 503 }));

        let service = ReportService::new(Arc::new(BloodPressureService::new(store)), Arc::new(notifier));
        let err = service.send_report(request(None)).await.unwrap_err();
        assert!(matches!(err, ReportError::Notifier(NotifierError::Rejected { status: 503 })));
    }

    #[tokio::test]
    async fn test_send_report_validation() {
        let store = registered_store(1234).await;
        let notifier = MockNotifier::new();
        let service = ReportService::new(Arc::new(BloodPressureService::new(store)), Arc::new(notifier));

        let mut bad = request(None);
        bad.email = "not-an-email".to_string();
        assert!(matches!(service.send_report(bad).await, Err(ReportError::Validation(_))));

        let mut unknown = request(None);
        unknown.user_id = 4321;
        assert!(matches!(service.send_report(unknown).await, Err(ReportError::UserNotFound(4321))));
    }
}
