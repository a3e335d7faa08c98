use crate::schemas::ConsentPolicy;

/// Lead traffic is a handful of inserts a minute.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Credentials for the Supabase REST datastore.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Direct Postgres connection; takes precedence over Supabase REST.
    pub database_url: Option<String>,
    /// Postgres pool size.
    pub db_max_connections: u32,
    pub supabase: Option<SupabaseConfig>,
    pub full_form_consent: ConsentPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            supabase: None,
            full_form_consent: ConsentPolicy::Optional,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let supabase_url = optional_var("SUPABASE_URL")
            .or_else(|| optional_var("NEXT_PUBLIC_SUPABASE_URL"))
            .map(|url| validate_http_url("SUPABASE_URL", url))
            .transpose()?;
        let service_role_key = optional_var("SUPABASE_SERVICE_ROLE_KEY");

        let supabase = match (supabase_url, service_role_key) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig {
                url,
                service_role_key,
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Only one of SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY is set; Supabase persistence disabled"
                );
                None
            }
            (None, None) => None,
        };

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            database_url: optional_var("DATABASE_URL")
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            db_max_connections: match optional_var("DATABASE_MAX_CONNECTIONS") {
                None => DEFAULT_DB_MAX_CONNECTIONS,
                Some(raw) => parse_max_connections(&raw)?,
            },
            supabase,
            full_form_consent: match optional_var("REQUIRE_TERMS_ON_FULL_FORM").as_deref() {
                None => ConsentPolicy::Optional,
                Some(flag) => parse_consent_flag(flag)?,
            },
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        if config.database_url.is_some() {
            tracing::info!(
                "Lead persistence: Postgres (pool of {})",
                config.db_max_connections
            );
        } else if let Some(ref supabase) = config.supabase {
            tracing::info!("Lead persistence: Supabase REST at {}", supabase.url);
        } else {
            tracing::warn!("No datastore configured; leads will be logged only");
        }
        tracing::debug!("Full form consent policy: {:?}", config.full_form_consent);

        Ok(config)
    }
}

/// Reads a variable, treating blank values as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_http_url(name: &str, raw: String) -> anyhow::Result<String> {
    let parsed = url::Url::parse(&raw)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_max_connections(raw: &str) -> anyhow::Result<u32> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => anyhow::bail!("DATABASE_MAX_CONNECTIONS must be a positive integer, got '{}'", raw),
    }
}

fn parse_consent_flag(flag: &str) -> anyhow::Result<ConsentPolicy> {
    match flag.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(ConsentPolicy::Required),
        "0" | "false" | "no" => Ok(ConsentPolicy::Optional),
        other => anyhow::bail!("REQUIRE_TERMS_ON_FULL_FORM must be true or false, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_url_strips_trailing_slash() {
        let url = validate_http_url("X", "https://abc.supabase.co/".to_string()).unwrap();
        assert_eq!(url, "https://abc.supabase.co");
    }

    #[test]
    fn test_validate_http_url_rejects_other_schemes() {
        assert!(validate_http_url("X", "ftp://example.com".to_string()).is_err());
        assert!(validate_http_url("X", "not a url".to_string()).is_err());
    }

    #[test]
    fn test_max_connections() {
        assert_eq!(parse_max_connections("12").unwrap(), 12);
        assert!(parse_max_connections("0").is_err());
        assert!(parse_max_connections("-3").is_err());
        assert_eq!(Config::default().db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    }

    #[test]
    fn test_consent_flag() {
        assert_eq!(parse_consent_flag("TRUE").unwrap(), ConsentPolicy::Required);
        assert_eq!(parse_consent_flag("0").unwrap(), ConsentPolicy::Optional);
        assert!(parse_consent_flag("maybe").is_err());
    }
}
