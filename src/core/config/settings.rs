use super::parsing::{
    env_optional, env_or_default, normalize_prefix, parse_bool, parse_environment, parse_u16,
    parse_u32, parse_u64, parse_usize,
};
use super::types::{
    ApiSettings, ConfigError, DatabaseSettings, JudgeSettings, MockJudgeSettings,
    ReconcilerSettings, RedisSettings, RuntimeSettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

const DEFAULT_JUDGE_URL: &str = "http://localhost:2358";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("JUDGE_INTEGRATOR_HOST", "0.0.0.0");
        let port = env_or_default("JUDGE_INTEGRATOR_PORT", "8080");

        let environment = parse_environment(
            env_optional("JUDGE_INTEGRATOR_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("JUDGE_INTEGRATOR_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let service_name = env_or_default("SERVICE_NAME", "Judge Integrator");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let prefix = normalize_prefix(&env_or_default("API_PREFIX", "/api"));

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "judge_integrator");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "judge_integrator");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "10"),
        )?;
        let acquire_timeout_seconds = parse_u64(
            "DATABASE_ACQUIRE_TIMEOUT_SECONDS",
            env_or_default("DATABASE_ACQUIRE_TIMEOUT_SECONDS", "30"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");
        let results_stream = env_or_default("RESULTS_STREAM", "code-judge-results");
        let results_stream_maxlen =
            parse_u64("RESULTS_STREAM_MAXLEN", env_or_default("RESULTS_STREAM_MAXLEN", "100000"))?;

        let judge_url = env_optional("JUDGE0_URL");
        let explicit_url = judge_url.is_some();
        let judge_base_url = judge_url
            .unwrap_or_else(|| DEFAULT_JUDGE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let judge_auth_token = env_optional("JUDGE0_AUTH_TOKEN");
        let judge_timeout_seconds =
            parse_u64("JUDGE0_TIMEOUT_SECONDS", env_or_default("JUDGE0_TIMEOUT_SECONDS", "30"))?;

        let reconciler_enabled =
            env_optional("RECONCILER_ENABLED").map(|value| parse_bool(&value)).unwrap_or(true);
        let interval_seconds = parse_u64(
            "RECONCILER_INTERVAL_SECONDS",
            env_or_default("RECONCILER_INTERVAL_SECONDS", "10"),
        )?;
        let batch_size =
            parse_u32("RECONCILER_BATCH_SIZE", env_or_default("RECONCILER_BATCH_SIZE", "100"))?;
        let concurrency =
            parse_usize("RECONCILER_CONCURRENCY", env_or_default("RECONCILER_CONCURRENCY", "8"))?;
        let max_submit_attempts =
            parse_u32("SUBMIT_MAX_ATTEMPTS", env_or_default("SUBMIT_MAX_ATTEMPTS", "5"))?;
        let backoff_base_seconds = parse_u64(
            "SUBMIT_BACKOFF_BASE_SECONDS",
            env_or_default("SUBMIT_BACKOFF_BASE_SECONDS", "10"),
        )?;
        let backoff_max_seconds = parse_u64(
            "SUBMIT_BACKOFF_MAX_SECONDS",
            env_or_default("SUBMIT_BACKOFF_MAX_SECONDS", "600"),
        )?;

        let mock_judge_port =
            parse_u16("MOCK_JUDGE_PORT", env_or_default("MOCK_JUDGE_PORT", "2358"))?;

        let log_level = env_or_default("JUDGE_INTEGRATOR_LOG_LEVEL", "info");
        let json =
            env_optional("JUDGE_INTEGRATOR_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { service_name, version, prefix },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
                acquire_timeout_seconds,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
                results_stream,
                results_stream_maxlen,
            },
            judge: JudgeSettings {
                base_url: judge_base_url,
                auth_token: judge_auth_token,
                timeout_seconds: judge_timeout_seconds,
                explicit_url,
            },
            reconciler: ReconcilerSettings {
                enabled: reconciler_enabled,
                interval_seconds,
                batch_size,
                concurrency,
                max_submit_attempts,
                backoff_base_seconds,
                backoff_max_seconds,
            },
            mock_judge: MockJudgeSettings { port: mock_judge_port },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn judge(&self) -> &JudgeSettings {
        &self.judge
    }

    pub(crate) fn reconciler(&self) -> &ReconcilerSettings {
        &self.reconciler
    }

    pub(crate) fn mock_judge(&self) -> &MockJudgeSettings {
        &self.mock_judge
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.judge.base_url.starts_with("http://") && !self.judge.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "JUDGE0_URL",
                value: self.judge.base_url.clone(),
            });
        }

        if self.judge.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "JUDGE0_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.reconciler.interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECONCILER_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.reconciler.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECONCILER_BATCH_SIZE",
                value: "0".to_string(),
            });
        }

        if self.reconciler.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECONCILER_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        if self.reconciler.max_submit_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUBMIT_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        if self.reconciler.backoff_max_seconds < self.reconciler.backoff_base_seconds {
            return Err(ConfigError::InvalidValue {
                field: "SUBMIT_BACKOFF_MAX_SECONDS",
                value: self.reconciler.backoff_max_seconds.to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::Missing("POSTGRES_PASSWORD"));
        }
        if !self.judge.explicit_url {
            return Err(ConfigError::Missing("JUDGE0_URL"));
        }

        Ok(())
    }
}
