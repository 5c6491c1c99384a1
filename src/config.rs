use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, str::FromStr, time::Duration};

/// Wallet that owns the contract in the demo deployment
pub const DEFAULT_ADMIN_WALLET: &str = "0xAD1e0c6495aC38D3b88f2aD32F963E491926EC33";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub casino: CasinoConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CasinoConfig {
    /// Only this address may call the admin routes
    pub admin_wallet: String,
    /// Receives the daily rake split
    pub owner_wallet: String,
    pub starting_balance: f64,
    pub chat_history_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub tick_secs: u64,
    /// Run the daily tasks on every tick instead of once per day
    pub demo_mode: bool,
    pub rake_split_percent: f64,
    pub jackpot_contribution_percent: f64,
    pub jackpot_eligible_top: usize,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: 10,
            demo_mode: false,
            rake_split_percent: 5.0,
            jackpot_contribution_percent: 1.0,
            jackpot_eligible_top: 10,
        }
    }
}

/// Read an optional variable, falling back to `default` when unset
fn var_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: var_or("PORT", 3000)?,
            frontend_dir: env::var("FRONTEND_DIR")
                .unwrap_or_else(|_| "../client/dist".to_string()),
        };

        let security = SecurityConfig {
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            session_ttl_hours: var_or("SESSION_TTL_HOURS", 24)?,
        };

        let admin_wallet =
            env::var("ADMIN_WALLET").unwrap_or_else(|_| DEFAULT_ADMIN_WALLET.to_string());
        let casino = CasinoConfig {
            owner_wallet: env::var("OWNER_WALLET").unwrap_or_else(|_| admin_wallet.clone()),
            admin_wallet,
            starting_balance: var_or("STARTING_BALANCE", 1000.0)?,
            chat_history_limit: var_or("CHAT_HISTORY_LIMIT", 50)?,
        };

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            tick_secs: var_or("SCHEDULER_TICK_SECS", defaults.tick_secs)?,
            demo_mode: var_or("SCHEDULER_DEMO_MODE", defaults.demo_mode)?,
            rake_split_percent: var_or("RAKE_SPLIT_PERCENT", defaults.rake_split_percent)?,
            jackpot_contribution_percent: var_or(
                "JACKPOT_CONTRIBUTION_PERCENT",
                defaults.jackpot_contribution_percent,
            )?,
            jackpot_eligible_top: var_or("JACKPOT_ELIGIBLE_TOP", defaults.jackpot_eligible_top)?,
        };

        if !(0.0..=100.0).contains(&scheduler.rake_split_percent)
            || !(0.0..=100.0).contains(&scheduler.jackpot_contribution_percent)
        {
            anyhow::bail!("Scheduler percentages must be between 0 and 100");
        }

        Ok(Config {
            server,
            security,
            casino,
            scheduler,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Configuration used by unit tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                frontend_dir: ".".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: "test-secret".to_string(),
                session_ttl_hours: 1,
            },
            casino: CasinoConfig {
                admin_wallet: DEFAULT_ADMIN_WALLET.to_string(),
                owner_wallet: DEFAULT_ADMIN_WALLET.to_string(),
                starting_balance: 1000.0,
                chat_history_limit: 50,
            },
            scheduler: SchedulerConfig::default(),
        }
    }
}
