#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // External CQC rating registry
    pub cqc_api_base_url: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");

        // The mail gateway reads RESEND_API_KEY and MAIL_FROM_ADDRESS at
        // send time, so a missing key degrades to logged failures only.
        let cqc_api_base_url = std::env::var("CQC_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.service.cqc.org.uk/public/v1".to_string());

        Config {
            database_url,
            app_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port: 8000,
            cqc_api_base_url,
        }
    }
}
