//! Process configuration loaded from the environment (and `.env` when present).

use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct SendGridConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub chromium_path: String,
    pub load_timeout: Duration,
    pub settle: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chromium_path: "chromium".to_string(),
            load_timeout: Duration::from_secs(30),
            settle: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase: SupabaseConfig,
    pub sendgrid: SendGridConfig,
    pub render: RenderConfig,
    pub bind_address: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase: SupabaseConfig::default(),
            sendgrid: SendGridConfig {
                from_name: "Facturation".to_string(),
                ..Default::default()
            },
            render: RenderConfig::default(),
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load `.env`, then read the process environment. Missing credentials are not an
    /// error here; they are reported per request by [`AppConfig::missing_credentials`].
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let parse_u64 = |key: &str, default: u64| -> u64 {
            match get(key) {
                Some(raw) => raw.parse().unwrap_or_else(|_| {
                    log::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
                    default
                }),
                None => default,
            }
        };

        let supabase = SupabaseConfig {
            supabase_url: get("SUPABASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            supabase_key: get("SUPABASE_SERVICE_ROLE_KEY")
                .or_else(|| get("SUPABASE_ANON_KEY"))
                .unwrap_or_default(),
        };

        let sendgrid = SendGridConfig {
            api_key: get("SENDGRID_API_KEY").unwrap_or_default(),
            from_email: get("SENDGRID_FROM_EMAIL").unwrap_or_default(),
            from_name: get("SENDGRID_FROM_NAME").unwrap_or(defaults.sendgrid.from_name),
        };

        let render = RenderConfig {
            chromium_path: get("CHROMIUM_PATH").unwrap_or(defaults.render.chromium_path),
            load_timeout: Duration::from_secs(parse_u64("RENDER_TIMEOUT_SECS", 30)),
            settle: Duration::from_millis(parse_u64("RENDER_SETTLE_MS", 1000)),
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid PORT={:?}, using {}", raw, defaults.port);
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            supabase,
            sendgrid,
            render,
            bind_address: get("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port,
        }
    }

    /// Names of required variables that are unset, in a stable order.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.supabase.supabase_url.is_empty() {
            missing.push("SUPABASE_URL");
        }
        if self.supabase.supabase_key.is_empty() {
            missing.push("SUPABASE_SERVICE_ROLE_KEY");
        }
        if self.sendgrid.api_key.is_empty() {
            missing.push("SENDGRID_API_KEY");
        }
        if self.sendgrid.from_email.is_empty() {
            missing.push("SENDGRID_FROM_EMAIL");
        }
        missing
    }
}
