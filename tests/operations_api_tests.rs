mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::json;
use swachhta_prahari_backend::model::camera::{CameraStatus, Zone};
use swachhta_prahari_backend::model::user::Role;
use tower::ServiceExt;

use common::{json_request, SentMail, TestApp};

const BOUNDARY: &str = "swachhta-test-boundary";

fn multipart_request(uri: &str, token: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"video\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.20")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_add_and_list_cameras() {
    let app = TestApp::new();
    let (_, admin) = app.login_as(Role::Admin).await;
    let camera = json!({
        "cameraId": "cam-20",
        "name": "Ward 4 market",
        "location": { "zone": "C", "position": "Fish market entrance" },
        "rtspUrl": "rtsp://10.0.4.20/stream",
        "aiConfig": { "confidenceThreshold": 0.75 }
    });

    let (status, res) = app
        .send(json_request("POST", "/api/cameras", Some(&admin), Some(camera.clone())))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(res["data"]["cameraId"], "CAM-20");
    assert_eq!(res["data"]["aiConfig"]["confidenceThreshold"], 0.75);

    let (status, res) = app
        .send(json_request("POST", "/api/cameras", Some(&admin), Some(camera)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["message"], "Camera with this ID already exists");

    let (_, operator) = app.login_as(Role::Camera).await;
    let (status, res) = app
        .send(json_request("GET", "/api/cameras?zone=C", Some(&operator), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["cameras"].as_array().map(Vec::len), Some(1));
    assert_eq!(res["data"]["pagination"]["total"], 1);

    let (_, analyst) = app.login_as(Role::Analyst).await;
    let (status, _) = app.send(json_request("GET", "/api/cameras", Some(&analyst), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/cameras?page={}&limit=100", u64::MAX);
    let (status, res) = app.send(json_request("GET", &uri, Some(&operator), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["cameras"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_camera_detail_health_and_restart() {
    let app = TestApp::new();
    let camera = app.seed_camera("CAM-21", Zone::A).await;
    let (_, admin) = app.login_as(Role::Admin).await;

    let (status, res) = app
        .send(json_request("GET", &format!("/api/cameras/{}", camera.id.unwrap().to_hex()), Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["camera"]["cameraId"], "CAM-21");
    assert_eq!(res["data"]["recentIncidents"].as_array().map(Vec::len), Some(0));

    let (status, res) = app
        .send(json_request("PUT", "/api/cameras/CAM-21", Some(&admin), Some(json!({ "status": "maintenance" }))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["status"], "maintenance");

    let (status, res) = app
        .send(json_request("GET", "/api/cameras/CAM-21/health", Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["status"], "maintenance");

    let (status, _) = app
        .send(json_request("POST", "/api/cameras/CAM-21/restart", Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let stored = app.cameras.cameras.lock().unwrap()[0].clone();
    assert_eq!(stored.status, CameraStatus::Online);
    assert!(stored.maintenance.last_maintenance.is_some());

    let (status, _) = app
        .send(json_request("GET", "/api/cameras/CAM-404/health", Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_video_upload() {
    let app = TestApp::new();
    app.seed_camera("CAM-22", Zone::B).await;
    let (_, operator) = app.login_as(Role::Camera).await;

    let request = multipart_request("/api/cameras/CAM-22/videos", &operator, "gate.mp4", "video/mp4", b"fake-mp4-bytes");
    let (status, res) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(res["data"]["cameraId"], "CAM-22");
    assert_eq!(res["data"]["video"]["format"], "mp4");
    assert_eq!(res["data"]["video"]["bytes"], 14);

    assert_eq!(app.objects.objects.lock().unwrap().len(), 1);
    let stored = app.cameras.cameras.lock().unwrap()[0].clone();
    assert_eq!(stored.uploaded_videos.len(), 1);
    assert_eq!(stored.uploaded_videos[0].original_name, "gate.mp4");
}

#[tokio::test]
async fn test_video_upload_rejects_other_files() {
    let app = TestApp::new();
    app.seed_camera("CAM-23", Zone::B).await;
    let (_, operator) = app.login_as(Role::Camera).await;

    let request = multipart_request("/api/cameras/CAM-23/videos", &operator, "notes.txt", "text/plain", b"hello");
    let (status, res) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["message"], "Only video files are allowed");
    assert!(app.objects.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_and_download_report() {
    let app = TestApp::new();
    app.seed_camera("CAM-24", Zone::A).await;
    app.send(json_request(
        "POST",
        "/api/ai/detection",
        None,
        Some(json!({
            "cameraId": "CAM-24",
            "detection": { "type": "illegal_dumping", "confidence": 0.95 },
            "timestamp": "2026-03-02T09:00:00Z"
        })),
    ))
    .await;
    let (_, reporter) = app.login_as(Role::Reporting).await;

    let (status, res) = app
        .send(json_request(
            "POST",
            "/api/reports/generate",
            Some(&reporter),
            Some(json!({ "type": "weekly", "format": "csv", "emailRecipients": ["commissioner@upsida.in"] })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let report_id = res["data"]["reportId"].as_str().expect("report id").to_string();
    assert!(report_id.starts_with("RPT-"));
    assert_eq!(res["data"]["analytics"]["totalIncidents"], 1);
    assert_eq!(res["data"]["deliveryStatus"]["emailSent"], true);
    assert!(app.mailer.sent.lock().unwrap().iter().any(|m| matches!(
        m,
        SentMail::Report { to, report_id: id } if to == "commissioner@upsida.in" && id == &report_id
    )));

    let (_, analyst) = app.login_as(Role::Analyst).await;
    let request = json_request("GET", &format!("/api/reports/{}/download", report_id), Some(&analyst), None);
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("incidentId,timestamp,cameraId,eventType,locationDetails,severity,status"));
    assert_eq!(csv.lines().count(), 2);

    let (status, res) = app.send(json_request("GET", "/api/reports", Some(&analyst), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_report_permissions_and_formats() {
    let app = TestApp::new();
    let (_, analyst) = app.login_as(Role::Analyst).await;
    let (_, admin) = app.login_as(Role::Admin).await;

    let (status, _) = app
        .send(json_request("POST", "/api/reports/generate", Some(&analyst), Some(json!({ "type": "daily" }))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/reports/generate",
            Some(&admin),
            Some(json!({ "type": "daily", "format": "pdf" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request("POST", "/api/reports/generate", Some(&admin), Some(json!({ "type": "custom" }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request("GET", "/api/reports/RPT-20260101-0001/download", Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_overview() {
    let app = TestApp::new();
    app.seed_camera("CAM-25", Zone::A).await;
    app.seed_camera("CAM-26", Zone::B).await;
    app.send(json_request(
        "POST",
        "/api/ai/detection",
        None,
        Some(json!({
            "cameraId": "CAM-25",
            "detection": { "type": "illegal_dumping", "confidence": 0.97 },
            "timestamp": "2026-03-02T09:00:00Z"
        })),
    ))
    .await;
    let (_, analyst) = app.login_as(Role::Analyst).await;

    let (status, res) = app
        .send(json_request("GET", "/api/analytics/dashboard", Some(&analyst), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["incidentSummary"]["detected"], 1);
    assert_eq!(res["data"]["cameraStatus"]["online"], 2);
    assert_eq!(res["data"]["criticalIncidents"].as_array().map(Vec::len), Some(1));
    assert_eq!(res["data"]["systemHealth"]["cameraNetwork"], "2/2");
    assert_eq!(res["data"]["systemHealth"]["connectedClients"], 0);
}

#[tokio::test]
async fn test_camera_performance() {
    let app = TestApp::new();
    app.seed_camera("CAM-41", Zone::B).await;
    app.seed_camera("CAM-40", Zone::A).await;
    let detect = |confidence: f64| {
        json_request(
            "POST",
            "/api/ai/detection",
            None,
            Some(json!({
                "cameraId": "CAM-40",
                "detection": { "type": "overflow", "confidence": confidence },
                "timestamp": "2026-03-02T09:00:00Z"
            })),
        )
    };
    app.send(detect(0.9)).await;
    let (_, res) = app.send(detect(0.95)).await;
    let incident_id = res["data"]["incidentId"].as_str().expect("incident id").to_string();

    let (_, admin) = app.login_as(Role::Admin).await;
    app.send(json_request(
        "PUT",
        &format!("/api/incidents/{}/status", incident_id),
        Some(&admin),
        Some(json!({ "status": "false_positive" })),
    ))
    .await;

    let (_, payroll) = app.login_as(Role::Payroll).await;
    let (status, res) = app
        .send(json_request("GET", "/api/analytics/camera-performance?timeRange=24h", Some(&payroll), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["timeRange"], "24h");
    let cameras = res["data"]["cameras"].as_array().cloned().unwrap_or_default();
    assert_eq!(cameras.len(), 2);
    assert_eq!(cameras[0]["cameraId"], "CAM-40");
    assert_eq!(cameras[0]["detectionCount"], 2);
    assert_eq!(cameras[0]["accuracy"], 50.0);
    assert_eq!(cameras[1]["detectionCount"], 0);
    assert_eq!(res["data"]["summary"]["totalDetections"], 2);
    assert_eq!(res["data"]["summary"]["averageAccuracy"], 75.0);

    let (status, res) = app
        .send(json_request("GET", "/api/analytics/camera-performance?timeRange=1y", Some(&payroll), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["timeRange"], "7d");

    let (status, _) = app
        .send(json_request("GET", "/api/analytics/camera-performance", None, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
