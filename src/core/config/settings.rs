use super::parsing::{
    env_optional, env_or_default, normalize_prefix, parse_bool, parse_cors_origins,
    parse_environment, parse_positive_u64, parse_u16, parse_u32,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, NotificationSettings, RedisSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

const DEV_SECRET_KEY: &str = "dev-secret";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("UNIPORTAL_HOST", "0.0.0.0");
        let port = env_or_default("UNIPORTAL_PORT", "4000");

        let environment = parse_environment(
            env_optional("UNIPORTAL_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("UNIPORTAL_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "University Portal Assignments");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = normalize_prefix(env_or_default("API_PREFIX", "/api"));

        let explicit_secret = env_optional("SECRET_KEY");
        let algorithm = env_or_default("ALGORITHM", "HS256").to_ascii_uppercase();

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "uniportal");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "uniportal");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DB_MAX_CONNECTIONS", env_or_default("DB_MAX_CONNECTIONS", "10"))?;
        let acquire_timeout_seconds = parse_positive_u64(
            "DB_ACQUIRE_TIMEOUT_SECONDS",
            env_or_default("DB_ACQUIRE_TIMEOUT_SECONDS", "5"),
        )?;
        let statement_timeout_seconds = parse_positive_u64(
            "DB_STATEMENT_TIMEOUT_SECONDS",
            env_or_default("DB_STATEMENT_TIMEOUT_SECONDS", "10"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let notifications_enabled = env_optional("NOTIFICATIONS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(true);
        let channel_prefix = env_or_default("NOTIFICATIONS_CHANNEL_PREFIX", "uniportal");

        let log_level = env_or_default("UNIPORTAL_LOG_LEVEL", "info");
        let json =
            env_optional("UNIPORTAL_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        if strict_config && explicit_secret.is_none() {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }
        let secret_key = explicit_secret.unwrap_or_else(|| DEV_SECRET_KEY.to_string());

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            security: SecuritySettings { secret_key, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
                acquire_timeout_seconds,
                statement_timeout_seconds,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            notifications: NotificationSettings { enabled: notifications_enabled, channel_prefix },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn notifications(&self) -> &NotificationSettings {
        &self.notifications
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.notifications.channel_prefix.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "NOTIFICATIONS_CHANNEL_PREFIX",
                value: self.notifications.channel_prefix.clone(),
            });
        }

        if self.security.algorithm != "HS256" {
            return Err(ConfigError::InvalidValue {
                field: "ALGORITHM",
                value: self.security.algorithm.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.security.secret_key == DEV_SECRET_KEY {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }

        Ok(())
    }
}
