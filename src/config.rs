use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub site_url: String,
    pub currency: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_webhook_tolerance_secs: i64,
    pub resend_api_key: String,
    pub email_from: String,
    pub admin_emails: Vec<String>,
    pub outbox_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "roombook.db".to_string()),
            site_url: env::var("SITE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "eur".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_webhook_tolerance_secs: env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Room bookings <bookings@localhost>".to_string()),
            admin_emails: parse_list(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            outbox_interval_secs: env::var("OUTBOX_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    pub fn success_url(&self) -> String {
        format!(
            "{}/reservation/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.site_url
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/reservation/cancel", self.site_url)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_list() {
        assert_eq!(
            parse_list(" Admin@Example.com, ,ops@example.com "),
            vec!["admin@example.com".to_string(), "ops@example.com".to_string()]
        );
        assert!(parse_list("").is_empty());
    }
}
