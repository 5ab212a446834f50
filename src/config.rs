use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
}

/// Credentials and redirect URLs for the hosted payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_key: String,
    pub merchant_salt: String,
    pub success_url: String,
    pub failure_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let gateway = GatewayConfig::from_env()?;
        Ok(Self {
            port,
            database_url,
            host,
            gateway,
        })
    }
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let merchant_key = env::var("PAYU_MERCHANT_KEY")?;
        let merchant_salt = env::var("PAYU_MERCHANT_SALT")?;
        let success_url = env::var("PAYU_SUCCESS_URL")
            .unwrap_or_else(|_| "http://localhost:3000/payment/success".to_string());
        let failure_url = env::var("PAYU_FAILURE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/payment/failure".to_string());
        Ok(Self {
            merchant_key,
            merchant_salt,
            success_url,
            failure_url,
        })
    }
}
