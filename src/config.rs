// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, their defaults, and [`VaultConfig`], the
//! configuration struct built once at startup and handed to every
//! component's constructor.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `20000` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS when both are set | unset |
//! | `DATA_DIR` | Directory of the record database | `./data` |
//! | `THETA_CHAIN_ID` | Chain id mixed into every signature | `test_chain_id` |
//! | `THETA_RPC_ENDPOINT` | Node JSON-RPC URL | `http://localhost:16888/rpc` |
//! | `THETA_RPC_TIMEOUT_SECS` | Per-call node timeout | `10` |
//! | `THETA_DEFAULT_RESERVE_DURATION` | Reservation length when unspecified | `900` |
//! | `THETA_DEFAULT_SPLIT_DURATION` | Split contract length when unspecified | `315360000` |
//! | `THETA_MIN_FEE` | Protocol minimum fee, TFuel wei | `1000000000000` |
//! | `THETA_MIN_GAS` | Protocol minimum gas | `1` |
//! | `THETA_REQUIRE_INTERNAL_SCOPE` | Gate split contracts behind `X-Scope` | `false` |
//! | `FAUCET_ENABLED` | Run the faucet task | `true` |
//! | `FAUCET_GRANTS_PER_BATCH` | Grants per batch window | `100` |
//! | `FAUCET_BATCH_PERIOD_SECS` | Batch reset period | `3600` |
//! | `FAUCET_WAKEUP_PERIOD_SECS` | Queue polling period | `10` |
//! | `FAUCET_THETA_AMOUNT` / `FAUCET_TFUEL_AMOUNT` | Grant per user, wei | `0` |
//! | `FAUCET_COMMAND` | Funding command | `add_fund.sh` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const CHAIN_ID_ENV: &str = "THETA_CHAIN_ID";
pub const RPC_ENDPOINT_ENV: &str = "THETA_RPC_ENDPOINT";
pub const RPC_TIMEOUT_ENV: &str = "THETA_RPC_TIMEOUT_SECS";
pub const DEFAULT_RESERVE_DURATION_ENV: &str = "THETA_DEFAULT_RESERVE_DURATION";
pub const DEFAULT_SPLIT_DURATION_ENV: &str = "THETA_DEFAULT_SPLIT_DURATION";
pub const MIN_FEE_ENV: &str = "THETA_MIN_FEE";
pub const MIN_GAS_ENV: &str = "THETA_MIN_GAS";
pub const REQUIRE_INTERNAL_SCOPE_ENV: &str = "THETA_REQUIRE_INTERNAL_SCOPE";

pub const FAUCET_ENABLED_ENV: &str = "FAUCET_ENABLED";
pub const FAUCET_GRANTS_PER_BATCH_ENV: &str = "FAUCET_GRANTS_PER_BATCH";
pub const FAUCET_BATCH_PERIOD_ENV: &str = "FAUCET_BATCH_PERIOD_SECS";
pub const FAUCET_WAKEUP_PERIOD_ENV: &str = "FAUCET_WAKEUP_PERIOD_SECS";
pub const FAUCET_THETA_AMOUNT_ENV: &str = "FAUCET_THETA_AMOUNT";
pub const FAUCET_TFUEL_AMOUNT_ENV: &str = "FAUCET_TFUEL_AMOUNT";
pub const FAUCET_COMMAND_ENV: &str = "FAUCET_COMMAND";

/// Environment variable name for log output format.
///
/// - `json`: structured JSON logs for aggregation
/// - `pretty`: human-readable logs for development (default)
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 20000;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_CHAIN_ID: &str = "test_chain_id";
pub const DEFAULT_RPC_ENDPOINT: &str = "http://localhost:16888/rpc";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
/// Reservation window, in blocks.
pub const DEFAULT_RESERVE_DURATION: u64 = 900;
/// Ten years of seconds.
pub const DEFAULT_SPLIT_DURATION: u64 = 86_400 * 365 * 10;
/// Minimum transaction fee accepted by the chain, TFuel wei.
pub const DEFAULT_MIN_FEE: u128 = 1_000_000_000_000;
pub const DEFAULT_MIN_GAS: u64 = 1;
pub const DEFAULT_GRANTS_PER_BATCH: usize = 100;
pub const DEFAULT_BATCH_PERIOD_SECS: u64 = 3600;
pub const DEFAULT_WAKEUP_PERIOD_SECS: u64 = 10;
pub const DEFAULT_FAUCET_COMMAND: &str = "add_fund.sh";

/// Scope value that unlocks internal-only methods.
pub const INTERNAL_SCOPE: &str = "sliver_internal";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: cannot parse {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{set} is set but {missing} is not")]
    Incomplete {
        set: &'static str,
        missing: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `(cert, key)` PEM paths when TLS is enabled.
    pub tls: Option<(PathBuf, PathBuf)>,
}

/// Everything the signing pipeline needs to know about the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: String,
    pub rpc_endpoint: String,
    pub rpc_timeout: Duration,
    pub default_reserve_duration: u64,
    pub default_split_duration: u64,
    pub min_fee: u128,
    pub min_gas: u64,
    pub require_internal_scope: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            default_reserve_duration: DEFAULT_RESERVE_DURATION,
            default_split_duration: DEFAULT_SPLIT_DURATION,
            min_fee: DEFAULT_MIN_FEE,
            min_gas: DEFAULT_MIN_GAS,
            require_internal_scope: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetConfig {
    pub enabled: bool,
    pub grants_per_batch: usize,
    pub batch_period: Duration,
    pub wakeup_period: Duration,
    pub theta_amount: u128,
    pub tfuel_amount: u128,
    pub command: String,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grants_per_batch: DEFAULT_GRANTS_PER_BATCH,
            batch_period: Duration::from_secs(DEFAULT_BATCH_PERIOD_SECS),
            wakeup_period: Duration::from_secs(DEFAULT_WAKEUP_PERIOD_SECS),
            theta_amount: 0,
            tfuel_amount: 0,
            command: DEFAULT_FAUCET_COMMAND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub server: ServerConfig,
    pub data_dir: PathBuf,
    pub chain: ChainConfig,
    pub faucet: FaucetConfig,
    pub log_format: LogFormat,
}

impl VaultConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    set: TLS_CERT_PATH_ENV,
                    missing: TLS_KEY_PATH_ENV,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    set: TLS_KEY_PATH_ENV,
                    missing: TLS_CERT_PATH_ENV,
                })
            }
        };

        let server = ServerConfig {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse(&get, PORT_ENV, DEFAULT_PORT)?,
            tls,
        };

        let chain = ChainConfig {
            chain_id: get(CHAIN_ID_ENV).unwrap_or_else(|| DEFAULT_CHAIN_ID.to_string()),
            rpc_endpoint: get(RPC_ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_RPC_ENDPOINT.to_string()),
            rpc_timeout: Duration::from_secs(positive(&get, RPC_TIMEOUT_ENV, DEFAULT_RPC_TIMEOUT_SECS)?),
            default_reserve_duration: positive(
                &get,
                DEFAULT_RESERVE_DURATION_ENV,
                DEFAULT_RESERVE_DURATION,
            )?,
            default_split_duration: positive(&get, DEFAULT_SPLIT_DURATION_ENV, DEFAULT_SPLIT_DURATION)?,
            min_fee: positive(&get, MIN_FEE_ENV, DEFAULT_MIN_FEE)?,
            min_gas: positive(&get, MIN_GAS_ENV, DEFAULT_MIN_GAS)?,
            require_internal_scope: parse(&get, REQUIRE_INTERNAL_SCOPE_ENV, false)?,
        };

        let faucet = FaucetConfig {
            enabled: parse(&get, FAUCET_ENABLED_ENV, true)?,
            grants_per_batch: parse(&get, FAUCET_GRANTS_PER_BATCH_ENV, DEFAULT_GRANTS_PER_BATCH)?,
            batch_period: Duration::from_secs(positive(
                &get,
                FAUCET_BATCH_PERIOD_ENV,
                DEFAULT_BATCH_PERIOD_SECS,
            )?),
            wakeup_period: Duration::from_secs(positive(
                &get,
                FAUCET_WAKEUP_PERIOD_ENV,
                DEFAULT_WAKEUP_PERIOD_SECS,
            )?),
            theta_amount: parse(&get, FAUCET_THETA_AMOUNT_ENV, 0)?,
            tfuel_amount: parse(&get, FAUCET_TFUEL_AMOUNT_ENV, 0)?,
            command: get(FAUCET_COMMAND_ENV).unwrap_or_else(|| DEFAULT_FAUCET_COMMAND.to_string()),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            server,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            chain,
            faucet,
            log_format,
        })
    }

    /// Settings that are valid but leave the gateway open; logged at startup.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if !self.chain.require_internal_scope {
            warnings.push(
                "THETA_REQUIRE_INTERNAL_SCOPE is off: any caller can sign split contracts \
                 for any initiator",
            );
        }
        warnings
    }

    /// Path of the record database file.
    pub fn record_db_path(&self) -> PathBuf {
        self.data_dir.join("records.redb")
    }
}

fn parse<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let value = parse(get, name, default)?;
    if value == T::default() {
        return Err(ConfigError::Zero(name));
    }
    Ok(value)
}
