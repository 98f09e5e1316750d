use std::{env, io::Write, net::IpAddr};

use log::*;
use rand::{thread_rng, RngCore};
use tempfile::NamedTempFile;
use umkm_common::{parse_boolean_flag, Rupiah, Secret};
use umkm_payment_engine::DEFAULT_MINIMUM_WITHDRAWAL;

use crate::errors::ServerError;

const DEFAULT_UMS_HOST: &str = "127.0.0.1";
const DEFAULT_UMS_PORT: u16 = 8360;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub midtrans: MidtransConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The smallest withdrawal a merchant may request.
    pub min_withdrawal: Rupiah,
    /// The capacity of each event handler's queue.
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_UMS_HOST.to_string(),
            port: DEFAULT_UMS_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            midtrans: MidtransConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            min_withdrawal: Rupiah::from_sen(DEFAULT_MINIMUM_WITHDRAWAL),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("UMS_HOST").ok().unwrap_or_else(|| DEFAULT_UMS_HOST.into());
        let port = env::var("UMS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for UMS_PORT. {e} Using the default, {DEFAULT_UMS_PORT}, instead."
                    );
                    DEFAULT_UMS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_UMS_PORT);
        let database_url = env::var("UMS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ UMS_DATABASE_URL is not set. Please set it to the URL for the UMKM database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let midtrans = MidtransConfig::from_env_or_defaults();
        let use_x_forwarded_for = parse_boolean_flag(env::var("UMS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("UMS_USE_FORWARDED").ok(), false);
        let min_withdrawal = configure_min_withdrawal();
        let event_buffer_size = env::var("UMS_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for UMS_EVENT_BUFFER_SIZE. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        Self {
            host,
            port,
            database_url,
            auth,
            midtrans,
            use_x_forwarded_for,
            use_forwarded,
            min_withdrawal,
            event_buffer_size,
        }
    }
}

fn configure_min_withdrawal() -> Rupiah {
    let default = Rupiah::from_sen(DEFAULT_MINIMUM_WITHDRAWAL);
    env::var("UMS_MIN_WITHDRAWAL")
        .map_err(|_| info!("🪛️ UMS_MIN_WITHDRAWAL is not set. Using the default value of Rp {default}."))
        .and_then(|s| {
            s.parse::<Rupiah>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for UMS_MIN_WITHDRAWAL. {e}"))
                .and_then(|v| {
                    if v.is_positive() {
                        Ok(v)
                    } else {
                        warn!("🪛️ UMS_MIN_WITHDRAWAL must be positive. Using the default value of Rp {default}.");
                        Err(())
                    }
                })
        })
        .unwrap_or(default)
}

//-------------------------------------------------  MidtransConfig  ---------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct MidtransConfig {
    /// The server key that Midtrans uses to sign its payment notifications.
    pub server_key: Secret<String>,
    /// If supplied, requests against /midtrans endpoints will be checked against a whitelist of IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl MidtransConfig {
    pub fn from_env_or_defaults() -> Self {
        let server_key = env::var("UMS_MIDTRANS_SERVER_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ UMS_MIDTRANS_SERVER_KEY is not set. Every payment notification will fail signature verification \
                 until it is."
            );
            String::default()
        });
        let whitelist = env::var("UMS_MIDTRANS_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The Midtrans IP whitelist was configured, but is empty. The server will run, but won't \
                     accept any payment notifications."
                );
            },
            None => {
                info!("🪛️ No Midtrans IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Midtrans IP whitelist: {addrs}");
            },
        }
        Self { server_key: Secret::new(server_key), whitelist }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Midtrans IP whitelist is disabled. If this is not what you want, set UMS_MIDTRANS_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in UMS_MIDTRANS_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to verify (and, in tests, sign) access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since no externally issued token will be accepted. 🚨️🚨️🚨️"
        );
        let mut bytes = [0u8; 32];
        thread_rng().fill_bytes(&mut bytes);
        let secret = hex::encode(bytes);
        match &mut tmpfile {
            Some((f, p)) => match writeln!(f, "UMS_JWT_SECRET={secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the UMS_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new(secret: &str) -> Self {
        Self { jwt_secret: Secret::new(secret.to_string()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("UMS_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [UMS_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "UMS_JWT_SECRET must be at least 32 characters long".to_string(),
            ));
        }
        Ok(Self::new(&secret))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub midtrans_whitelist: Option<Vec<IpAddr>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            midtrans_whitelist: config.midtrans.whitelist.clone(),
        }
    }
}
