pub mod email;
pub mod error;
pub mod jwt;
pub mod logger;
pub mod minio;
pub mod password;
pub mod redis;
pub mod response;
pub mod time;
pub mod validated_json;
