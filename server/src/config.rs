use anyhow::anyhow;
use common::{
    constants::{DEFAULT_ACCT_TIMER, DEFAULT_KA_TIMER, DEFAULT_READ_TIMEOUT_MS, PCMM_PORT},
    messages::pcmm::Direction,
};
use once_cell::sync::OnceCell;
use std::{
    convert::Infallible,
    env::{self, VarError},
    net::IpAddr,
    path::PathBuf,
    process::abort,
    time::Duration,
};
use time::{OffsetDateTime, UtcOffset};

const COPS_PORT_ENV_VAR: &str = "COPS_PORT";
const WORKER_POOL_SIZE_ENV_VAR: &str = "WORKER_POOL_SIZE";
const KA_TIMER_ENV_VAR: &str = "KA_TIMER";
const ACCT_TIMER_ENV_VAR: &str = "ACCT_TIMER";
const READ_TIMEOUT_MS_ENV_VAR: &str = "READ_TIMEOUT_MS";
const CMTS_CONFIG_ENV_VAR: &str = "CMTS_CONFIG";
const CMTS_ADDRESS_ENV_VAR: &str = "CMTS_ADDRESS";
const PDP_SUBSCRIBER_ENV_VAR: &str = "PDP_SUBSCRIBER";
const PDP_SERVICE_CLASS_ENV_VAR: &str = "PDP_SERVICE_CLASS";
const PDP_DIRECTION_ENV_VAR: &str = "PDP_DIRECTION";
const LOG_DIR_ENV_VAR: &str = "LOG_DIR";
const UTC_OFFSET_ENV_VAR: &str = "UTC_OFFSET";

const DEFAULT_WORKER_POOL_SIZE: usize = 8;
const DEFAULT_CMTS_CONFIG: &str = "cmts.yaml";
const DEFAULT_SERVICE_CLASS: &str = "extrm_up";
const DEFAULT_LOG_DIR: &str = "logs";

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

pub struct Config {
    pub cops_port: u16,
    pub worker_pool_size: usize,
    pub ka_timer: u16,
    pub acct_timer: u16,
    pub read_timeout: Duration,
    pub cmts_config: PathBuf,
    /// Where the policy server connects to. Defaults to the local CMTS port.
    pub cmts_address: String,
    pub pdp_subscriber: Option<IpAddr>,
    pub pdp_service_class: String,
    pub pdp_direction: Direction,
    pub log_dir: PathBuf,
    pub utc_offset: Option<UtcOffset>,
}

impl Config {
    #[inline]
    pub fn get() -> &'static Config {
        match GLOBAL_CONFIG.get() {
            Some(config) => config,
            None => Self::handle_config_not_present(),
        }
    }

    #[inline(never)]
    fn handle_config_not_present() -> &'static Config {
        eprintln!("Config unexpectedly not present. Falling back to lazy initialization");

        match Self::get_or_try_init() {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Failed to lazily initialize config: {error}");
                abort()
            }
        }
    }

    #[inline]
    pub fn get_or_try_init() -> anyhow::Result<&'static Config> {
        GLOBAL_CONFIG.get_or_try_init(Self::from_env)
    }

    fn from_env() -> anyhow::Result<Self> {
        let cops_port = Self::parse_or_default(COPS_PORT_ENV_VAR, |var| var.parse(), PCMM_PORT)?;

        let worker_pool_size = Self::parse_or_default(
            WORKER_POOL_SIZE_ENV_VAR,
            |var| var.parse(),
            DEFAULT_WORKER_POOL_SIZE,
        )?;
        if worker_pool_size == 0 {
            return Err(anyhow!("{WORKER_POOL_SIZE_ENV_VAR} must be at least 1"));
        }

        let ka_timer = Self::parse_or_default(KA_TIMER_ENV_VAR, |var| var.parse(), DEFAULT_KA_TIMER)?;
        let acct_timer =
            Self::parse_or_default(ACCT_TIMER_ENV_VAR, |var| var.parse(), DEFAULT_ACCT_TIMER)?;

        let read_timeout = Self::parse_or_default(
            READ_TIMEOUT_MS_ENV_VAR,
            |var| -> Result<_, anyhow::Error> {
                match var.parse()? {
                    0 => Err(anyhow!("{READ_TIMEOUT_MS_ENV_VAR} must not be zero")),
                    millis => Ok(Duration::from_millis(millis)),
                }
            },
            Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
        )?;

        let cmts_config = Self::parse_or_default_with(
            CMTS_CONFIG_ENV_VAR,
            |var| Ok::<_, Infallible>(PathBuf::from(var)),
            || PathBuf::from(DEFAULT_CMTS_CONFIG),
        )?;

        let cmts_address = Self::parse_or_default_with(
            CMTS_ADDRESS_ENV_VAR,
            Ok::<_, Infallible>,
            || format!("127.0.0.1:{cops_port}"),
        )?;

        let pdp_subscriber = Self::parse_or_default(
            PDP_SUBSCRIBER_ENV_VAR,
            |var| var.parse().map(Some),
            None,
        )?;

        let pdp_service_class = Self::parse_or_default_with(
            PDP_SERVICE_CLASS_ENV_VAR,
            Ok::<_, Infallible>,
            || DEFAULT_SERVICE_CLASS.to_owned(),
        )?;

        let pdp_direction =
            Self::parse_or_default(PDP_DIRECTION_ENV_VAR, parse_direction, Direction::Upstream)?;

        let log_dir = Self::parse_or_default_with(
            LOG_DIR_ENV_VAR,
            |var| Ok::<_, Infallible>(PathBuf::from(var)),
            || PathBuf::from(DEFAULT_LOG_DIR.to_owned()),
        )?;

        let utc_offset = Self::parse_or_default_with(
            UTC_OFFSET_ENV_VAR,
            |var| -> Result<_, anyhow::Error> {
                let hours = var.parse()?;
                UtcOffset::from_hms(hours, 0, 0)
                    .map(Some)
                    .map_err(Into::into)
            },
            || UtcOffset::local_offset_at(OffsetDateTime::now_utc()).ok(),
        )?;

        Ok(Self {
            cops_port,
            worker_pool_size,
            ka_timer,
            acct_timer,
            read_timeout,
            cmts_config,
            cmts_address,
            pdp_subscriber,
            pdp_service_class,
            pdp_direction,
            log_dir,
            utc_offset,
        })
    }

    fn parse_or_default<T, F, E>(env_var: &str, parse: F, default: T) -> anyhow::Result<T>
    where
        F: FnOnce(String) -> Result<T, E>,
        E: Into<anyhow::Error>,
    {
        Self::parse_or_default_with(env_var, parse, || default)
    }

    fn parse_or_default_with<T, F, E, D>(env_var: &str, parse: F, default: D) -> anyhow::Result<T>
    where
        F: FnOnce(String) -> Result<T, E>,
        E: Into<anyhow::Error>,
        D: FnOnce() -> T,
    {
        match env::var(env_var) {
            Ok(var) => parse(var).map_err(Into::into),
            Err(VarError::NotPresent) => Ok(default()),
            Err(error @ VarError::NotUnicode(_)) => Err(Self::not_unicode(env_var, error)),
        }
    }

    fn not_unicode(env_var: &str, error: VarError) -> anyhow::Error {
        anyhow!("Failed to parse env var {env_var}: {error}")
    }
}

/// Accepts the direction names used in the CMTS gate tables.
pub fn parse_direction(name: String) -> anyhow::Result<Direction> {
    match name.to_ascii_uppercase().as_str() {
        "UPSTREAM" => Ok(Direction::Upstream),
        "DOWNSTREAM" => Ok(Direction::Downstream),
        _ => Err(anyhow!("Unknown gate direction {name}")),
    }
}
