#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bson::oid::ObjectId;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use swachhta_prahari_backend::app::{build_router, AppServices};
use swachhta_prahari_backend::config::{AppConfig, JwtConfig, OtpConfig, RateLimitConfig};
use swachhta_prahari_backend::dto::camera_dto::AiConfigPatch;
use swachhta_prahari_backend::model::camera::{normalize_camera_id, Camera, CameraLocation, CameraStatus, UploadedVideo, Zone};
use swachhta_prahari_backend::model::incident::Incident;
use swachhta_prahari_backend::model::otp::{Otp, OtpPurpose};
use swachhta_prahari_backend::model::payout::Payout;
use swachhta_prahari_backend::model::report::Report;
use swachhta_prahari_backend::model::user::{Role, User};
use swachhta_prahari_backend::realtime::RealtimeHub;
use swachhta_prahari_backend::repository::camera_repo::{CameraFilter, CameraRepository};
use swachhta_prahari_backend::repository::incident_repo::{IncidentFilter, IncidentPage, IncidentRepository, IncidentSortField};
use swachhta_prahari_backend::repository::mongo::CounterRepository;
use swachhta_prahari_backend::repository::otp_repo::OtpRepository;
use swachhta_prahari_backend::repository::payout_repo::PayoutRepository;
use swachhta_prahari_backend::repository::report_repo::{ReportFilter, ReportRepository};
use swachhta_prahari_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use swachhta_prahari_backend::repository::user_repo::UserRepository;
use swachhta_prahari_backend::service::auth_service::AuthServiceImpl;
use swachhta_prahari_backend::service::camera_service::CameraServiceImpl;
use swachhta_prahari_backend::service::dashboard_service::DashboardServiceImpl;
use swachhta_prahari_backend::service::detection_service::DetectionServiceImpl;
use swachhta_prahari_backend::service::incident_service::IncidentServiceImpl;
use swachhta_prahari_backend::service::manager_service::ManagerServiceImpl;
use swachhta_prahari_backend::service::payout_service::PayoutServiceImpl;
use swachhta_prahari_backend::service::report_service::ReportServiceImpl;
use swachhta_prahari_backend::util::email::{EmailError, Mailer, ReportMail};
use swachhta_prahari_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};
use swachhta_prahari_backend::util::minio::{MinioError, ObjectStore};
use swachhta_prahari_backend::util::password::{PasswordUtils, PasswordUtilsImpl};
use swachhta_prahari_backend::util::redis::{RedisError, RedisServiceTrait};
use swachhta_prahari_backend::util::time;

pub const TEST_PASSWORD: &str = "secret123";

#[derive(Default)]
pub struct InMemoryUsers {
    pub users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email || u.username == user.username) {
            return Err(RepositoryError::already_exists("User already exists"));
        }
        user.id = Some(ObjectId::new());
        user.created_at = Some(time::now());
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> RepositoryResult<User> {
        let mut users = self.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<bool> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id.as_ref() != Some(id));
        Ok(users.len() < before)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id.as_ref() == Some(id)).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_login(&self, identifier: &str) -> RepositoryResult<Option<User>> {
        let identifier = identifier.trim();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == identifier || u.email == identifier.to_lowercase())
            .cloned())
    }

    async fn list_by_roles(&self, roles: &[Role]) -> RepositoryResult<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| roles.contains(&u.role))
            .cloned()
            .collect())
    }

    async fn set_session(&self, id: &ObjectId, refresh_token: Option<String>, last_login: Option<String>) -> RepositoryResult<()> {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.id.as_ref() == Some(id)) {
            user.refresh_token = refresh_token;
            if last_login.is_some() {
                user.last_login = last_login;
            }
        }
        Ok(())
    }

    async fn set_password_hash(&self, email: &str, password_hash: &str) -> RepositoryResult<bool> {
        let email = email.trim().to_lowercase();
        match self.users.lock().unwrap().iter_mut().find(|u| u.email == email) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryOtps {
    pub otps: Mutex<Vec<Otp>>,
}

#[async_trait]
impl OtpRepository for InMemoryOtps {
    async fn replace(&self, mut otp: Otp) -> RepositoryResult<Otp> {
        let mut otps = self.otps.lock().unwrap();
        otps.retain(|o| !(o.email == otp.email && o.purpose == otp.purpose));
        otp.id = Some(ObjectId::new());
        otps.push(otp.clone());
        Ok(otp)
    }

    async fn find(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<Option<Otp>> {
        Ok(self
            .otps
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.email == email && o.purpose == purpose)
            .cloned())
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        self.otps.lock().unwrap().retain(|o| o.id.as_ref() != Some(id));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCameras {
    pub cameras: Mutex<Vec<Camera>>,
}

impl InMemoryCameras {
    fn matches(camera: &Camera, filter: &CameraFilter) -> bool {
        filter.zone.map_or(true, |z| camera.location.zone == z) && filter.status.map_or(true, |s| camera.status == s)
    }
}

#[async_trait]
impl CameraRepository for InMemoryCameras {
    async fn insert(&self, mut camera: Camera) -> RepositoryResult<Camera> {
        let mut cameras = self.cameras.lock().unwrap();
        if cameras.iter().any(|c| c.camera_id == camera.camera_id) {
            return Err(RepositoryError::already_exists("Camera already exists"));
        }
        camera.id = Some(ObjectId::new());
        camera.created_at = Some(time::now());
        cameras.push(camera.clone());
        Ok(camera)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Camera>> {
        Ok(self.cameras.lock().unwrap().iter().find(|c| c.id.as_ref() == Some(id)).cloned())
    }

    async fn find_by_camera_id(&self, camera_id: &str) -> RepositoryResult<Option<Camera>> {
        let camera_id = normalize_camera_id(camera_id);
        Ok(self.cameras.lock().unwrap().iter().find(|c| c.camera_id == camera_id).cloned())
    }

    async fn list(&self, filter: &CameraFilter, skip: u64, limit: i64) -> RepositoryResult<Vec<Camera>> {
        Ok(self
            .cameras
            .lock()
            .unwrap()
            .iter()
            .filter(|c| Self::matches(c, filter))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &CameraFilter) -> RepositoryResult<u64> {
        Ok(self.cameras.lock().unwrap().iter().filter(|c| Self::matches(c, filter)).count() as u64)
    }

    async fn count_by_status(&self) -> RepositoryResult<BTreeMap<String, i64>> {
        let mut counts = BTreeMap::new();
        for camera in self.cameras.lock().unwrap().iter() {
            *counts.entry(camera.status.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn update(&self, camera: Camera) -> RepositoryResult<Camera> {
        let mut cameras = self.cameras.lock().unwrap();
        let slot = cameras
            .iter_mut()
            .find(|c| c.id == camera.id)
            .ok_or_else(|| RepositoryError::not_found("Camera not found"))?;
        let statistics = slot.statistics.clone();
        let videos = std::mem::take(&mut slot.uploaded_videos);
        *slot = camera;
        slot.statistics = statistics;
        slot.uploaded_videos = videos;
        Ok(slot.clone())
    }

    async fn record_detection(&self, id: &ObjectId, detected_at: &str) -> RepositoryResult<()> {
        if let Some(camera) = self.cameras.lock().unwrap().iter_mut().find(|c| c.id.as_ref() == Some(id)) {
            camera.statistics.total_detections += 1;
            camera.statistics.last_detection = Some(detected_at.to_string());
        }
        Ok(())
    }

    async fn push_video(&self, id: &ObjectId, video: UploadedVideo) -> RepositoryResult<()> {
        let mut cameras = self.cameras.lock().unwrap();
        let camera = cameras
            .iter_mut()
            .find(|c| c.id.as_ref() == Some(id))
            .ok_or_else(|| RepositoryError::not_found("Camera not found"))?;
        camera.uploaded_videos.push(video);
        Ok(())
    }

    async fn set_ai_config(&self, camera_id: Option<&str>, patch: &AiConfigPatch) -> RepositoryResult<u64> {
        let target = camera_id.map(normalize_camera_id);
        let mut matched = 0;
        for camera in self.cameras.lock().unwrap().iter_mut() {
            if target.as_ref().map_or(true, |t| &camera.camera_id == t) {
                patch.apply(&mut camera.ai_config);
                matched += 1;
            }
        }
        Ok(matched)
    }
}

#[derive(Default)]
pub struct InMemoryIncidents {
    pub incidents: Mutex<Vec<Incident>>,
}

impl InMemoryIncidents {
    fn matches(incident: &Incident, filter: &IncidentFilter) -> bool {
        let created = incident.created_at.as_deref().unwrap_or_default();
        (filter.types.is_empty() || filter.types.contains(&incident.incident_type))
            && (filter.severities.is_empty() || filter.severities.contains(&incident.severity))
            && (filter.statuses.is_empty() || filter.statuses.contains(&incident.status))
            && filter.camera.map_or(true, |c| incident.camera == c)
            && filter
                .camera_id
                .as_ref()
                .map_or(true, |c| incident.camera_id == c.to_uppercase())
            && filter.zone.map_or(true, |z| incident.location.zone == z)
            && filter.created_from.as_deref().map_or(true, |from| created >= from)
            && filter.created_to.as_deref().map_or(true, |to| created <= to)
    }

    pub fn all(&self) -> Vec<Incident> {
        self.incidents.lock().unwrap().clone()
    }
}

#[async_trait]
impl IncidentRepository for InMemoryIncidents {
    async fn insert(&self, mut incident: Incident) -> RepositoryResult<Incident> {
        let mut incidents = self.incidents.lock().unwrap();
        if let Some(key) = &incident.idempotency_key {
            if incidents.iter().any(|i| i.idempotency_key.as_ref() == Some(key)) {
                return Err(RepositoryError::already_exists("Duplicate idempotency key"));
            }
        }
        incident.id = Some(ObjectId::new());
        if incident.created_at.is_none() {
            incident.created_at = Some(time::now());
        }
        incidents.push(incident.clone());
        Ok(incident)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Incident>> {
        Ok(self.incidents.lock().unwrap().iter().find(|i| i.id.as_ref() == Some(id)).cloned())
    }

    async fn find_by_incident_id(&self, incident_id: &str) -> RepositoryResult<Option<Incident>> {
        Ok(self
            .incidents
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.incident_id == incident_id)
            .cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> RepositoryResult<Option<Incident>> {
        Ok(self
            .incidents
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list(&self, filter: &IncidentFilter, page: IncidentPage) -> RepositoryResult<Vec<Incident>> {
        let mut found: Vec<Incident> = self
            .incidents
            .lock()
            .unwrap()
            .iter()
            .filter(|i| Self::matches(i, filter))
            .cloned()
            .collect();
        if page.sort_by == IncidentSortField::Severity {
            // ties newest first
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            if page.descending {
                found.sort_by_key(|i| std::cmp::Reverse(i.severity.rank()));
            } else {
                found.sort_by_key(|i| i.severity.rank());
            }
        } else {
            found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            if page.descending {
                found.reverse();
            }
        }
        Ok(found
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn find_all(&self, filter: &IncidentFilter) -> RepositoryResult<Vec<Incident>> {
        Ok(self
            .incidents
            .lock()
            .unwrap()
            .iter()
            .filter(|i| Self::matches(i, filter))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &IncidentFilter) -> RepositoryResult<u64> {
        Ok(self.incidents.lock().unwrap().iter().filter(|i| Self::matches(i, filter)).count() as u64)
    }

    async fn update_versioned(&self, mut incident: Incident) -> RepositoryResult<Incident> {
        let mut incidents = self.incidents.lock().unwrap();
        let slot = incidents
            .iter_mut()
            .find(|i| i.id == incident.id)
            .ok_or_else(|| RepositoryError::not_found("Incident not found"))?;
        if slot.version != incident.version {
            return Err(RepositoryError::conflict("Incident was modified concurrently"));
        }
        incident.version += 1;
        incident.updated_at = Some(time::now());
        *slot = incident.clone();
        Ok(incident)
    }
}

#[derive(Default)]
pub struct InMemoryReports {
    pub reports: Mutex<Vec<Report>>,
}

#[async_trait]
impl ReportRepository for InMemoryReports {
    async fn insert(&self, mut report: Report) -> RepositoryResult<Report> {
        report.id = Some(ObjectId::new());
        self.reports.lock().unwrap().push(report.clone());
        Ok(report)
    }

    async fn find_by_report_id(&self, report_id: &str) -> RepositoryResult<Option<Report>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.report_id == report_id)
            .cloned())
    }

    async fn list(&self, filter: &ReportFilter, skip: u64, limit: i64) -> RepositoryResult<Vec<Report>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| filter.report_type.map_or(true, |t| r.report_type == t))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &ReportFilter) -> RepositoryResult<u64> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.report_type.map_or(true, |t| r.report_type == t))
            .count() as u64)
    }

    async fn update(&self, report: Report) -> RepositoryResult<Report> {
        let mut reports = self.reports.lock().unwrap();
        let slot = reports
            .iter_mut()
            .find(|r| r.id == report.id)
            .ok_or_else(|| RepositoryError::not_found("Report not found"))?;
        *slot = report.clone();
        Ok(report)
    }
}

#[derive(Default)]
pub struct InMemoryPayouts {
    pub payouts: Mutex<Vec<Payout>>,
}

#[async_trait]
impl PayoutRepository for InMemoryPayouts {
    async fn list(&self) -> RepositoryResult<Vec<Payout>> {
        Ok(self.payouts.lock().unwrap().clone())
    }

    async fn upsert(&self, mut payout: Payout) -> RepositoryResult<Payout> {
        let mut payouts = self.payouts.lock().unwrap();
        let now = time::now();
        match payouts.iter_mut().find(|p| p.external_id == payout.external_id) {
            Some(existing) => {
                payout.id = existing.id;
                payout.created_at = existing.created_at.clone();
                payout.updated_at = Some(now);
                *existing = payout.clone();
            }
            None => {
                payout.id = Some(ObjectId::new());
                payout.created_at = Some(now.clone());
                payout.updated_at = Some(now);
                payouts.push(payout.clone());
            }
        }
        Ok(payout)
    }

    async fn delete_by_external_id(&self, external_id: &str) -> RepositoryResult<bool> {
        let mut payouts = self.payouts.lock().unwrap();
        let before = payouts.len();
        payouts.retain(|p| p.external_id != external_id);
        Ok(payouts.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryCounters {
    pub counters: Mutex<HashMap<String, i64>>,
}

#[async_trait]
impl CounterRepository for InMemoryCounters {
    async fn next_sequence(&self, name: &str) -> RepositoryResult<i64> {
        let mut counters = self.counters.lock().unwrap();
        let seq = counters.entry(name.to_string()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }
}

/// Key/value store with fixed windows that never expire during a test
#[derive(Default)]
pub struct InMemoryRedis {
    pub values: Mutex<HashMap<String, String>>,
    pub windows: Mutex<HashMap<String, i64>>,
}

impl InMemoryRedis {
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl RedisServiceTrait for InMemoryRedis {
    async fn set_string_with_expiry(&self, key: &str, value: &str, _expiry_secs: u64) -> Result<(), RedisError> {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, RedisError> {
        Ok(self.values.lock().unwrap().remove(key).is_some())
    }

    async fn increment_in_window(&self, key: &str, window_secs: u64) -> Result<(i64, i64), RedisError> {
        let mut windows = self.windows.lock().unwrap();
        let count = windows.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok((*count, window_secs as i64))
    }

    async fn ping(&self) -> Result<String, RedisError> {
        Ok("PONG".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SentMail {
    Credentials { to: String, username: String },
    Otp { to: String, code: String, purpose: OtpPurpose },
    Report { to: String, report_id: String },
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn last_otp(&self, email: &str) -> Option<String> {
        self.sent.lock().unwrap().iter().rev().find_map(|m| match m {
            SentMail::Otp { to, code, .. } if to == email => Some(code.clone()),
            _ => None,
        })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_credentials(
        &self,
        to: &str,
        _name: &str,
        username: &str,
        _password: &str,
        _role: Role,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentMail::Credentials {
            to: to.to_string(),
            username: username.to_string(),
        });
        Ok(())
    }

    async fn send_otp(&self, to: &str, code: &str, purpose: OtpPurpose) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentMail::Otp {
            to: to.to_string(),
            code: code.to_string(),
            purpose,
        });
        Ok(())
    }

    async fn send_report(&self, to: &str, report: &ReportMail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentMail::Report {
            to: to.to_string(),
            report_id: report.report_id.clone(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(&self, object_name: &str, data: Vec<u8>, _content_type: Option<&str>) -> Result<String, MinioError> {
        self.objects.lock().unwrap().insert(object_name.to_string(), data);
        Ok(format!("http://minio.test/videos/{}", object_name))
    }
}

/// The full router wired to in-memory stores
pub struct TestApp {
    pub router: Router,
    pub services: AppServices,
    pub users: Arc<InMemoryUsers>,
    pub cameras: Arc<InMemoryCameras>,
    pub incidents: Arc<InMemoryIncidents>,
    pub reports: Arc<InMemoryReports>,
    pub payouts: Arc<InMemoryPayouts>,
    pub redis: Arc<InMemoryRedis>,
    pub mailer: Arc<RecordingMailer>,
    pub objects: Arc<InMemoryObjectStore>,
    jwt: Arc<JwtTokenUtilsImpl>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(RateLimitConfig::default())
    }

    pub fn with_limits(limits: RateLimitConfig) -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let otps = Arc::new(InMemoryOtps::default());
        let cameras = Arc::new(InMemoryCameras::default());
        let incidents = Arc::new(InMemoryIncidents::default());
        let reports = Arc::new(InMemoryReports::default());
        let payouts = Arc::new(InMemoryPayouts::default());
        let counters = Arc::new(InMemoryCounters::default());
        let redis = Arc::new(InMemoryRedis::default());
        let mailer = Arc::new(RecordingMailer::default());
        let objects = Arc::new(InMemoryObjectStore::default());
        let jwt = Arc::new(JwtTokenUtilsImpl::new(JwtConfig::for_tests()));
        let hub = Arc::new(RealtimeHub::new());

        let scratch = std::env::temp_dir().join(format!("swachhta-test-{}", ObjectId::new().to_hex()));
        let config = AppConfig {
            upload_dir: scratch.join("uploads").to_string_lossy().into_owned(),
            reports_dir: scratch.join("reports").to_string_lossy().into_owned(),
            ..AppConfig::default()
        };

        let auth = Arc::new(AuthServiceImpl::new(
            users.clone(),
            otps,
            jwt.clone(),
            redis.clone(),
            mailer.clone(),
            OtpConfig::default(),
            3600,
        ));
        let services = AppServices {
            cameras: Arc::new(CameraServiceImpl::new(
                cameras.clone(),
                incidents.clone(),
                objects.clone(),
                hub.clone(),
                config.upload_dir.clone(),
            )),
            incidents: Arc::new(IncidentServiceImpl::new(
                incidents.clone(),
                cameras.clone(),
                users.clone(),
                counters.clone(),
                hub.clone(),
            )),
            detections: Arc::new(DetectionServiceImpl::new(
                cameras.clone(),
                incidents.clone(),
                counters.clone(),
                hub.clone(),
            )),
            reports: Arc::new(ReportServiceImpl::new(
                reports.clone(),
                incidents.clone(),
                counters,
                mailer.clone(),
                config.reports_dir.clone(),
                config.public_base_url(),
            )),
            payouts: Arc::new(PayoutServiceImpl::new(payouts.clone())),
            managers: Arc::new(ManagerServiceImpl::new(users.clone(), redis.clone())),
            dashboard: Arc::new(DashboardServiceImpl::new(cameras.clone(), incidents.clone(), hub.clone())),
            auth,
            hub,
            redis: redis.clone(),
        };
        let router = build_router(&services, &config, &limits);

        TestApp {
            router,
            services,
            users,
            cameras,
            incidents,
            reports,
            payouts,
            redis,
            mailer,
            objects,
            jwt,
        }
    }

    pub async fn create_user(&self, username: &str, role: Role) -> User {
        let mut user = User::new(username, &format!("{}@upsida.test", username), username, role);
        user.password_hash = PasswordUtilsImpl::hash_password(TEST_PASSWORD).expect("hash");
        self.users.insert(user).await.expect("insert user")
    }

    /// A fresh user with `role` and an access token for it
    pub async fn login_as(&self, role: Role) -> (User, String) {
        let user = self.create_user(&format!("{}_{}", role, &ObjectId::new().to_hex()[18..]), role).await;
        let tokens = self
            .jwt
            .generate_token_pair(&user.id_hex(), &user.email, role.as_str())
            .expect("token pair");
        (user, tokens.access_token)
    }

    pub async fn seed_camera(&self, camera_id: &str, zone: Zone) -> Camera {
        let location = CameraLocation {
            zone,
            position: Some("North gate".to_string()),
            coordinates: None,
        };
        let mut camera = Camera::new(camera_id, &format!("Camera {}", camera_id), location, "rtsp://10.0.0.5/stream");
        camera.status = CameraStatus::Online;
        self.cameras.insert(camera).await.expect("insert camera")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.10");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
