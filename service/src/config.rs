use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default MailerSend API base URL used when `MAILERSEND_BASE_URL` is not set.
pub const DEFAULT_MAILERSEND_BASE_URL: &str = "https://api.mailersend.com/v1";

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:8080,https://localhost:8080"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Number of outbound frames buffered per live connection before the
    /// connection is treated as failed.
    #[arg(long, env, default_value_t = DEFAULT_OUTBOUND_QUEUE_CAPACITY)]
    pub outbound_queue_capacity: usize,

    /// Broadcast `chat.user.online` presence changes when users connect and disconnect.
    #[arg(long, env, default_value_t = true, action = clap::ArgAction::Set)]
    pub broadcast_presence: bool,

    /// The base URL of the MailerSend API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_MAILERSEND_BASE_URL)]
    mailersend_base_url: String,
    /// The API key to use when calling the MailerSend API.
    #[arg(long, env)]
    mailersend_api_key: Option<String>,
    /// The MailerSend template ID for offline notification emails.
    #[arg(long, env)]
    notification_email_template_id: Option<String>,
    /// The sender address used for notification emails.
    #[arg(long, env, default_value = "notifications@chirp.social")]
    notifications_from_email: String,
    /// The base URL of the frontend application (e.g. https://chirp.social).
    /// Used to construct links in email notifications.
    #[arg(long, env)]
    frontend_base_url: Option<String>,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    /// Builds a config from the environment only, ignoring command line arguments.
    fn default() -> Self {
        dotenv().ok();
        Config::parse_from([env!("CARGO_PKG_NAME")])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the MailerSend API base URL.
    pub fn mailersend_base_url(&self) -> &str {
        &self.mailersend_base_url
    }

    pub fn set_mailersend_base_url(mut self, base_url: String) -> Self {
        self.mailersend_base_url = base_url;
        self
    }

    /// Returns the MailerSend API key, if configured.
    pub fn mailersend_api_key(&self) -> Option<String> {
        self.mailersend_api_key.clone()
    }

    pub fn set_mailersend_api_key(mut self, api_key: Option<String>) -> Self {
        self.mailersend_api_key = api_key;
        self
    }

    /// Returns the MailerSend template ID for notification emails, if configured.
    pub fn notification_email_template_id(&self) -> Option<String> {
        self.notification_email_template_id.clone()
    }

    pub fn set_notification_email_template_id(mut self, template_id: Option<String>) -> Self {
        self.notification_email_template_id = template_id;
        self
    }

    pub fn notifications_from_email(&self) -> &str {
        &self.notifications_from_email
    }

    /// Returns the frontend application base URL used to construct links in emails.
    pub fn frontend_base_url(&self) -> Option<String> {
        self.frontend_base_url.clone()
    }

    pub fn set_frontend_base_url(mut self, base_url: Option<String>) -> Self {
        self.frontend_base_url = base_url;
        self
    }

    /// Whether enough is configured to send notification emails at all.
    pub fn email_notifications_enabled(&self) -> bool {
        self.mailersend_api_key.is_some() && self.notification_email_template_id.is_some()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }

    /// The `interface:port` pair to bind the HTTP listener to.
    pub fn listen_address(&self) -> String {
        format!(
            "{}:{}",
            self.interface.as_deref().unwrap_or("127.0.0.1"),
            self.port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["social_realtime_rs"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    #[test]
    fn rust_env_parses_case_insensitively() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
    }

    #[test]
    fn command_line_flags_override_defaults() {
        let config = parse(&[
            "--port",
            "9000",
            "--interface",
            "0.0.0.0",
            "--outbound-queue-capacity",
            "8",
            "--broadcast-presence",
            "false",
            "--runtime-env",
            "PRODUCTION",
            "--log-level-filter",
            "DEBUG",
        ]);

        assert_eq!(config.listen_address(), "0.0.0.0:9000");
        assert_eq!(config.outbound_queue_capacity, 8);
        assert!(!config.broadcast_presence);
        assert!(config.is_production());
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
    }

    #[test]
    fn email_notifications_need_key_and_template() {
        let config = parse(&["--mailersend-api-key", "key"]);
        let config = config.set_notification_email_template_id(None);
        assert!(!config.email_notifications_enabled());

        let config = config.set_notification_email_template_id(Some("tmpl".to_string()));
        assert!(config.email_notifications_enabled());

        let config = config.set_mailersend_api_key(None);
        assert!(!config.email_notifications_enabled());
    }

    #[test]
    fn allowed_origins_split_on_commas() {
        let config = parse(&["--allowed-origins", "https://a.example,https://b.example"]);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
