use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::dto::report_dto::{GenerateReportRequest, ReportListQuery, ReportListResponse};
use crate::model::incident::{Incident, IncidentStatus, IncidentType, Severity};
use crate::model::report::{
    format_report_id, DeliveryStatus, FileInfo, Report, ReportAnalytics, ReportFormat, ReportIncident,
    ReportPeriod, ReportType,
};
use crate::repository::incident_repo::{IncidentFilter, IncidentRepository};
use crate::repository::report_repo::{ReportFilter, ReportRepository};
use crate::repository::mongo::CounterRepository;
use crate::util::email::{Mailer, ReportMail};
use crate::util::error::ServiceError;
use crate::util::response::{normalize_paging, page_skip, Pagination};
use crate::util::time;

/// A report file ready to be sent to the client
#[derive(Debug)]
pub struct ReportDownload {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Start and end of the reporting window
pub fn report_period(
    request: &GenerateReportRequest,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let custom = || -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
        let start = request.start_date.as_deref().and_then(time::parse);
        let end = request.end_date.as_deref().and_then(time::parse);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => Ok((start, end)),
            (Some(_), Some(_)) => Err(ServiceError::InvalidInput(
                "startDate must not be after endDate".to_string(),
            )),
            _ => Err(ServiceError::InvalidInput(
                "Valid startDate and endDate are required for custom reports".to_string(),
            )),
        }
    };

    match request.report_type {
        ReportType::Daily => {
            let midnight = now.date_naive().and_hms_opt(0, 0, 0).map(|d| d.and_utc()).unwrap_or(now);
            Ok((midnight, now))
        }
        ReportType::Weekly => Ok((now - Duration::days(7), now)),
        ReportType::Monthly => Ok((now - Duration::days(30), now)),
        ReportType::Custom => custom(),
        ReportType::IncidentSummary => {
            if request.start_date.is_some() || request.end_date.is_some() {
                custom()
            } else {
                Ok((now - Duration::days(30), now))
            }
        }
    }
}

fn recommendations(analytics: &ReportAnalytics) -> Vec<String> {
    let mut out = Vec::new();
    if analytics.total_incidents == 0 {
        out.push("No incidents recorded in this period. Continue routine monitoring.".to_string());
        return out;
    }

    let count = |map: &std::collections::BTreeMap<String, i64>, key: &str| map.get(key).copied().unwrap_or(0);

    let dumping = count(&analytics.by_type, IncidentType::IllegalDumping.as_str());
    if dumping * 2 >= analytics.total_incidents {
        out.push("Illegal dumping dominates this period. Increase patrols and signage near hotspots.".to_string());
    }
    if count(&analytics.by_type, IncidentType::Overflow.as_str()) > 0 {
        out.push("Review waste collection frequency for containers reported as overflowing.".to_string());
    }
    if count(&analytics.by_type, IncidentType::DrainClogging.as_str()) > 0 {
        out.push("Schedule drain clearing for locations with clogging reports.".to_string());
    }
    if count(&analytics.by_severity, Severity::Critical.as_str()) > 0 {
        out.push("Critical incidents were detected. Ensure on-call staff respond immediately.".to_string());
    }
    let open = analytics.total_incidents - analytics.resolved - analytics.false_positives;
    if open > 0 {
        out.push(format!("{} incident(s) remain open and need follow-up.", open));
    }
    if analytics.false_positives * 5 > analytics.total_incidents {
        out.push("False positive rate exceeds 20%. Consider raising the camera confidence thresholds.".to_string());
    }
    if let Some(minutes) = analytics.average_response_minutes {
        if minutes > 60.0 {
            out.push("Average response time exceeds one hour. Review assignment workflow.".to_string());
        }
    }
    out
}

/// Incident lines and analytics for a report
pub fn analyze(incidents: &[Incident]) -> (Vec<ReportIncident>, ReportAnalytics) {
    let mut analytics = ReportAnalytics {
        total_incidents: incidents.len() as i64,
        ..Default::default()
    };
    let mut response_minutes = Vec::new();

    let lines: Vec<ReportIncident> = incidents
        .iter()
        .map(|incident| {
            *analytics
                .by_type
                .entry(incident.incident_type.as_str().to_string())
                .or_insert(0) += 1;
            *analytics
                .by_severity
                .entry(incident.severity.as_str().to_string())
                .or_insert(0) += 1;
            *analytics
                .by_status
                .entry(incident.status.as_str().to_string())
                .or_insert(0) += 1;
            match incident.status {
                IncidentStatus::Resolved => analytics.resolved += 1,
                IncidentStatus::FalsePositive => analytics.false_positives += 1,
                _ => {}
            }
            if let (Some(created), Some(resolved)) = (&incident.created_at, &incident.response.resolved_at) {
                if let Some(minutes) = time::minutes_between(created, resolved) {
                    response_minutes.push(minutes);
                }
            }

            ReportIncident {
                incident_id: incident.incident_id.clone(),
                timestamp: incident.created_at.clone().unwrap_or_default(),
                camera_id: incident.camera_id.clone(),
                event_type: incident.incident_type,
                location_details: incident.location.specific.clone(),
                severity: incident.severity,
                status: incident.status,
            }
        })
        .collect();

    if !response_minutes.is_empty() {
        let average = response_minutes.iter().sum::<f64>() / response_minutes.len() as f64;
        analytics.average_response_minutes = Some((average * 10.0).round() / 10.0);
    }
    analytics.recommendations = recommendations(&analytics);
    (lines, analytics)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One row per incident under a fixed header
pub fn render_csv(incidents: &[ReportIncident]) -> String {
    let mut out = String::from("incidentId,timestamp,cameraId,eventType,locationDetails,severity,status\n");
    for line in incidents {
        let row = [
            csv_field(&line.incident_id),
            csv_field(&line.timestamp),
            csv_field(&line.camera_id),
            line.event_type.as_str().to_string(),
            csv_field(line.location_details.as_deref().unwrap_or("")),
            line.severity.as_str().to_string(),
            line.status.as_str().to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn content_type(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Json => "application/json",
        ReportFormat::Csv => "text/csv",
        ReportFormat::Pdf => "application/pdf",
        ReportFormat::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    }
}

#[async_trait]
pub trait ReportService: Send + Sync {
    async fn generate_report(
        &self,
        request: GenerateReportRequest,
        actor: Option<ObjectId>,
    ) -> Result<Report, ServiceError>;
    async fn list_reports(&self, query: ReportListQuery) -> Result<ReportListResponse, ServiceError>;
    async fn download_report(&self, report_id: &str) -> Result<ReportDownload, ServiceError>;
}

pub struct ReportServiceImpl {
    pub report_repo: Arc<dyn ReportRepository>,
    pub incident_repo: Arc<dyn IncidentRepository>,
    pub counters: Arc<dyn CounterRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub reports_dir: PathBuf,
    /// Base URL used to build download links in report mails
    pub public_base_url: String,
}

impl ReportServiceImpl {
    pub fn new(
        report_repo: Arc<dyn ReportRepository>,
        incident_repo: Arc<dyn IncidentRepository>,
        counters: Arc<dyn CounterRepository>,
        mailer: Arc<dyn Mailer>,
        reports_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            report_repo,
            incident_repo,
            counters,
            mailer,
            reports_dir: reports_dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    async fn write_file(&self, report: &Report, format: ReportFormat) -> Result<FileInfo, ServiceError> {
        let body = match format {
            ReportFormat::Json => serde_json::to_vec_pretty(report)
                .map_err(|e| ServiceError::InternalError(format!("Failed to serialize report: {}", e)))?,
            ReportFormat::Csv => render_csv(&report.incidents).into_bytes(),
            ReportFormat::Pdf | ReportFormat::Excel => {
                return Err(ServiceError::InvalidInput(format!(
                    "Report format '{}' is not supported",
                    format.extension()
                )))
            }
        };

        tokio::fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| ServiceError::InternalError(format!("Failed to create reports directory: {}", e)))?;
        let filename = format!("{}.{}", report.report_id, format.extension());
        let path = self.reports_dir.join(&filename);
        tokio::fs::write(&path, &body).await.map_err(|e| {
            error!(path = %path.display(), "Failed to write report file: {}", e);
            ServiceError::InternalError(format!("Failed to write report file: {}", e))
        })?;

        Ok(FileInfo {
            filename,
            path: path.to_string_lossy().into_owned(),
            format,
            size: body.len() as i64,
            generated_at: time::now(),
        })
    }

    async fn deliver(&self, report: &Report, recipients: &[String]) -> DeliveryStatus {
        let mail = ReportMail {
            report_id: report.report_id.clone(),
            report_type: report.report_type.to_string(),
            start_date: report.period.start_date.clone(),
            end_date: report.period.end_date.clone(),
            total_incidents: report.analytics.total_incidents,
            download_url: format!(
                "{}/api/reports/{}/download",
                self.public_base_url.trim_end_matches('/'),
                report.report_id
            ),
        };

        let mut errors = Vec::new();
        for to in recipients {
            if let Err(e) = self.mailer.send_report(to, &mail).await {
                warn!(recipient = %to, "Report mail failed: {}", e);
                errors.push(format!("{}: {}", to, e));
            }
        }

        let email_sent = errors.len() < recipients.len();
        DeliveryStatus {
            email_sent,
            sent_at: email_sent.then(time::now),
            recipients: recipients.to_vec(),
            delivery_errors: errors,
        }
    }
}

#[async_trait]
impl ReportService for ReportServiceImpl {
    #[instrument(skip(self, request), fields(report_type = %request.report_type, format = ?request.format))]
    async fn generate_report(
        &self,
        request: GenerateReportRequest,
        actor: Option<ObjectId>,
    ) -> Result<Report, ServiceError> {
        if matches!(request.format, ReportFormat::Pdf | ReportFormat::Excel) {
            return Err(ServiceError::InvalidInput(format!(
                "Report format '{}' is not supported",
                request.format.extension()
            )));
        }

        let now = Utc::now();
        let (start, end) = report_period(&request, now)?;
        let filter = IncidentFilter {
            created_from: Some(time::format(&start)),
            created_to: Some(time::format(&end)),
            ..Default::default()
        };
        let incidents = self.incident_repo.find_all(&filter).await?;
        let (lines, analytics) = analyze(&incidents);

        let sequence = self.counters.next_sequence("report").await?;
        let mut report = Report {
            id: None,
            report_id: format_report_id(&now, sequence),
            report_type: request.report_type,
            period: ReportPeriod {
                start_date: time::format(&start),
                end_date: time::format(&end),
            },
            incidents: lines,
            analytics,
            file_info: None,
            delivery_status: DeliveryStatus::default(),
            generated_by: actor,
            created_at: None,
            updated_at: None,
        };

        report.file_info = Some(self.write_file(&report, request.format).await?);
        let mut report = self.report_repo.insert(report).await?;
        info!(report_id = %report.report_id, incidents = report.analytics.total_incidents, "Report generated");

        let recipients = request.email_recipients.unwrap_or_default();
        if !recipients.is_empty() {
            report.delivery_status = self.deliver(&report, &recipients).await;
            report = self.report_repo.update(report).await?;
        }
        Ok(report)
    }

    async fn list_reports(&self, query: ReportListQuery) -> Result<ReportListResponse, ServiceError> {
        let (page, limit) = normalize_paging(query.page, query.limit, 20, 100);
        let filter = ReportFilter {
            report_type: query.report_type,
            start_from: query.start_date.as_deref().and_then(time::normalize),
            end_to: query.end_date.as_deref().and_then(time::normalize),
        };
        let reports = self.report_repo.list(&filter, page_skip(page, limit), limit as i64).await?;
        let total = self.report_repo.count(&filter).await?;
        Ok(ReportListResponse {
            reports,
            pagination: Pagination::new(page, limit, total),
        })
    }

    #[instrument(skip(self))]
    async fn download_report(&self, report_id: &str) -> Result<ReportDownload, ServiceError> {
        let not_found = || ServiceError::NotFound("Report file not found".to_string());
        let report = self.report_repo.find_by_report_id(report_id).await?.ok_or_else(not_found)?;
        let file = report.file_info.ok_or_else(not_found)?;

        let bytes = match tokio::fs::read(Path::new(&file.path)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(ServiceError::InternalError(format!("Failed to read report file: {}", e))),
        };
        Ok(ReportDownload {
            filename: file.filename,
            content_type: content_type(file.format),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::camera::Zone;
    use crate::model::incident::{Evidence, IncidentLocation, IncidentResponse};
    use chrono::TimeZone;

    fn incident(kind: IncidentType, severity: Severity, status: IncidentStatus) -> Incident {
        Incident {
            id: None,
            incident_id: "INC-1-0001".to_string(),
            incident_type: kind,
            severity,
            status,
            camera: ObjectId::new(),
            camera_id: "CAM-01".to_string(),
            location: IncidentLocation {
                zone: Zone::A,
                specific: Some("Gate 2, north side".to_string()),
                coordinates: None,
            },
            description: "Waste near the gate".to_string(),
            ai_detection: None,
            evidence: Evidence::default(),
            response: IncidentResponse::default(),
            idempotency_key: None,
            version: 0,
            created_at: Some("2025-09-07T10:00:00.000Z".to_string()),
            updated_at: None,
        }
    }

    fn request(report_type: ReportType, start: Option<&str>, end: Option<&str>) -> GenerateReportRequest {
        GenerateReportRequest {
            report_type,
            format: ReportFormat::Json,
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            email_recipients: None,
        }
    }

    #[test]
    fn test_report_period() {
        let now = Utc.with_ymd_and_hms(2025, 9, 7, 18, 30, 0).unwrap();

        let (start, end) = report_period(&request(ReportType::Daily, None, None), now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 9, 7, 0, 0, 0).unwrap());
        assert_eq!(end, now);

        let (start, _) = report_period(&request(ReportType::Weekly, None, None), now).unwrap();
        assert_eq!(start, now - Duration::days(7));

        let (start, _) = report_period(&request(ReportType::Monthly, None, None), now).unwrap();
        assert_eq!(start, now - Duration::days(30));

        assert!(report_period(&request(ReportType::Custom, Some("2025-09-01"), None), now).is_err());
        assert!(report_period(&request(ReportType::Custom, Some("2025-09-05"), Some("2025-09-01")), now).is_err());
        let (start, end) =
            report_period(&request(ReportType::Custom, Some("2025-09-01"), Some("2025-09-05")), now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 9, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_analyze_counts_and_recommendations() {
        let mut resolved = incident(IncidentType::IllegalDumping, Severity::Critical, IncidentStatus::Resolved);
        resolved.response.resolved_at = Some("2025-09-07T11:30:00.000Z".to_string());
        let incidents = vec![
            resolved,
            incident(IncidentType::IllegalDumping, Severity::High, IncidentStatus::Detected),
            incident(IncidentType::Overflow, Severity::Low, IncidentStatus::FalsePositive),
        ];

        let (lines, analytics) = analyze(&incidents);
        assert_eq!(lines.len(), 3);
        assert_eq!(analytics.total_incidents, 3);
        assert_eq!(analytics.by_type["illegal_dumping"], 2);
        assert_eq!(analytics.resolved, 1);
        assert_eq!(analytics.false_positives, 1);
        assert_eq!(analytics.average_response_minutes, Some(90.0));
        assert!(analytics.recommendations.iter().any(|r| r.contains("Illegal dumping")));
        assert!(analytics.recommendations.iter().any(|r| r.contains("1 incident(s) remain open")));
        assert!(analytics.recommendations.iter().any(|r| r.contains("Average response time")));
    }

    #[test]
    fn test_analyze_empty_period() {
        let (lines, analytics) = analyze(&[]);
        assert!(lines.is_empty());
        assert_eq!(analytics.average_response_minutes, None);
        assert_eq!(analytics.recommendations.len(), 1);
    }

    #[test]
    fn test_render_csv_quotes_fields() {
        let (lines, _) = analyze(&[incident(IncidentType::Overflow, Severity::Medium, IncidentStatus::Pending)]);
        let csv = render_csv(&lines);
        let mut rows = csv.lines();
        assert_eq!(
            rows.next(),
            Some("incidentId,timestamp,cameraId,eventType,locationDetails,severity,status")
        );
        assert_eq!(
            rows.next(),
            Some("INC-1-0001,2025-09-07T10:00:00.000Z,CAM-01,overflow,\"Gate 2, north side\",medium,pending")
        );
    }
}
