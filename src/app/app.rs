use axum::Router;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::routes::{build_router, AppServices};
use crate::config::{
    AdminUserConfig, AppConfig, AppEnv, EmailConfig, JwtConfig, MinioConfig, MongoConfig, OtpConfig,
    RateLimitConfig, RedisConfig,
};
use crate::jobs::keep_alive;
use crate::realtime::RealtimeHub;
use crate::repository::camera_repo::MongoCameraRepository;
use crate::repository::incident_repo::MongoIncidentRepository;
use crate::repository::mongo::{self, MongoCounterRepository};
use crate::repository::otp_repo::MongoOtpRepository;
use crate::repository::payout_repo::MongoPayoutRepository;
use crate::repository::report_repo::MongoReportRepository;
use crate::repository::user_repo::MongoUserRepository;
use crate::service::auth_service::AuthServiceImpl;
use crate::service::camera_service::CameraServiceImpl;
use crate::service::dashboard_service::DashboardServiceImpl;
use crate::service::detection_service::DetectionServiceImpl;
use crate::service::incident_service::IncidentServiceImpl;
use crate::service::manager_service::ManagerServiceImpl;
use crate::service::payout_service::PayoutServiceImpl;
use crate::service::report_service::ReportServiceImpl;
use crate::util::email::SmtpEmailService;
use crate::util::jwt::JwtTokenUtilsImpl;
use crate::util::minio::MinioService;
use crate::util::redis::{RedisService, RedisServiceTrait};

pub type StartupError = Box<dyn Error + Send + Sync>;

pub struct App {
    config: AppConfig,
    router: Router,
    pub services: AppServices,
}

impl App {
    pub async fn new() -> Result<Self, StartupError> {
        let config = AppConfig::from_env()?;
        let mongo_config = MongoConfig::from_env()?;
        let jwt_config = JwtConfig::from_env()?;
        let redis_config = RedisConfig::from_env()?;
        let minio_config = MinioConfig::from_env()?;
        let email_config = EmailConfig::from_env()?;
        let otp_config = OtpConfig::from_env()?;
        let rate_limit_config = RateLimitConfig::from_env()?;

        let db = mongo::connect(&mongo_config).await?;
        let user_repo = Arc::new(MongoUserRepository::new(&db));
        let otp_repo = Arc::new(MongoOtpRepository::new(&db));
        let camera_repo = Arc::new(MongoCameraRepository::new(&db));
        let incident_repo = Arc::new(MongoIncidentRepository::new(&db));
        let report_repo = Arc::new(MongoReportRepository::new(&db));
        let payout_repo = Arc::new(MongoPayoutRepository::new(&db));
        let counters = Arc::new(MongoCounterRepository::new(&db));

        user_repo.ensure_indexes().await?;
        otp_repo.ensure_indexes(otp_config.ttl_secs).await?;
        camera_repo.ensure_indexes().await?;
        incident_repo.ensure_indexes().await?;
        report_repo.ensure_indexes().await?;
        payout_repo.ensure_indexes().await?;
        info!("Database indexes ensured");

        let session_ttl_secs = redis_config.session_ttl_secs;
        let redis: Arc<dyn RedisServiceTrait> = Arc::new(RedisService::new(redis_config).await?);
        let object_store = Arc::new(MinioService::new(minio_config).await?);
        let mailer = Arc::new(SmtpEmailService::new(email_config)?);
        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        let hub = Arc::new(RealtimeHub::new());

        let auth = Arc::new(AuthServiceImpl::new(
            user_repo.clone(),
            otp_repo,
            jwt_utils,
            redis.clone(),
            mailer.clone(),
            otp_config,
            session_ttl_secs,
        ));
        let services = AppServices {
            cameras: Arc::new(CameraServiceImpl::new(
                camera_repo.clone(),
                incident_repo.clone(),
                object_store,
                hub.clone(),
                config.upload_dir.clone(),
            )),
            incidents: Arc::new(IncidentServiceImpl::new(
                incident_repo.clone(),
                camera_repo.clone(),
                user_repo.clone(),
                counters.clone(),
                hub.clone(),
            )),
            detections: Arc::new(DetectionServiceImpl::new(
                camera_repo.clone(),
                incident_repo.clone(),
                counters.clone(),
                hub.clone(),
            )),
            reports: Arc::new(ReportServiceImpl::new(
                report_repo,
                incident_repo.clone(),
                counters,
                mailer,
                config.reports_dir.clone(),
                config.public_base_url(),
            )),
            payouts: Arc::new(PayoutServiceImpl::new(payout_repo)),
            managers: Arc::new(ManagerServiceImpl::new(user_repo, redis.clone())),
            dashboard: Arc::new(DashboardServiceImpl::new(camera_repo, incident_repo, hub.clone())),
            auth,
            hub,
            redis,
        };

        let router = build_router(&services, &config, &rate_limit_config);
        let app = App {
            config,
            router,
            services,
        };
        app.create_first_admin_user().await;
        Ok(app)
    }

    pub async fn start(self) -> Result<(), StartupError> {
        if self.config.env == AppEnv::Beta {
            match &self.config.server_url {
                Some(url) => {
                    keep_alive::spawn(url.clone());
                }
                None => warn!("APP_ENV is beta but SERVER_URL is not set, keep-alive disabled"),
            }
        }

        let addr = SocketAddr::new(self.config.host.parse()?, self.config.port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("🚀 Server running at http://{} ({})", addr, self.config.env);
        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }

    async fn create_first_admin_user(&self) {
        let admin_conf = match AdminUserConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                warn!("Admin user config not loaded: {e}");
                return;
            }
        };
        match self.services.auth.seed_admin(&admin_conf).await {
            Ok(true) => info!("First admin user created."),
            Ok(false) => info!("Admin user already exists, skipping creation."),
            Err(e) => error!("Failed to create admin user: {e}"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
