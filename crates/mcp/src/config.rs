use clap::{Args, Parser, Subcommand};
use monkey_core::{HttpMonkeySource, MonkeyCache};
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::ChatPipeline;
use crate::reasoning::GeminiClient;
use crate::tools::MonkeyTools;

const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

#[derive(Parser)]
#[command(name = "monkey-mcp")]
#[command(version)]
#[command(about = "Answer questions about monkeys over HTTP or MCP")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP chat endpoint (default)
    Serve,
    /// Serve MCP JSON-RPC over stdio
    Mcp,
}

/// Process settings, read once at startup.
#[derive(Args, Debug, Clone)]
pub struct Config {
    #[arg(long, env = "MONKEYS_URL", default_value = "", help = "URL of the monkey collection")]
    pub monkeys_url: String,
    #[arg(long, env = "GEMINI_API_URL", default_value = DEFAULT_GEMINI_URL)]
    pub gemini_api_url: String,
    #[arg(long, env = "GEMINI_KEY", default_value = "", hide_env_values = true)]
    pub gemini_key: String,
    #[arg(long, env = "CACHE_EXPIRATION_MINUTES", default_value_t = 30)]
    pub cache_expiration_minutes: u64,
    #[arg(long, env = "BIND", default_value = "0.0.0.0:5000")]
    pub bind: String,
    #[arg(long, env = "PREFIX", default_value = "", help = "Route prefix for the chat endpoint")]
    pub prefix: String,
}

impl Config {
    pub fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_minutes.saturating_mul(60))
    }

    pub fn tools(&self) -> MonkeyTools {
        let source = HttpMonkeySource::new(&self.monkeys_url);
        MonkeyTools::new(Arc::new(MonkeyCache::new(source, self.cache_expiration())))
    }

    pub fn pipeline(&self) -> ChatPipeline {
        let reasoning = GeminiClient::new(&self.gemini_api_url, &self.gemini_key);
        ChatPipeline::new(self.tools(), Arc::new(reasoning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["monkey-mcp", "--monkeys-url", "http://localhost/m"]).unwrap();
        assert_eq!(cli.config.monkeys_url, "http://localhost/m");
        assert_eq!(cli.config.cache_expiration(), Duration::from_secs(30 * 60));
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_subcommand_and_expiration() {
        let cli = Cli::try_parse_from([
            "monkey-mcp",
            "--cache-expiration-minutes",
            "5",
            "--prefix",
            "/api",
            "mcp",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Command::Mcp));
        assert_eq!(cli.config.cache_expiration(), Duration::from_secs(300));
        assert_eq!(cli.config.prefix, "/api");
    }

    #[test]
    fn huge_expiration_saturates() {
        let minutes = u64::MAX.to_string();
        let cli = Cli::try_parse_from(["monkey-mcp", "--cache-expiration-minutes", minutes.as_str()])
        .unwrap();
        assert_eq!(cli.config.cache_expiration(), Duration::from_secs(u64::MAX));
    }
}
