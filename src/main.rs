use dotenvy::dotenv;
use lazy_regex::{lazy_regex, Lazy};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};
use userbot::config::Settings;
use userbot::runner;

/// Bot token inside an API URL: `https://api.telegram.org/bot<token>/...`
static TOKEN_IN_URL: Lazy<Regex> = lazy_regex!(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)");
/// Bare bot token
static TOKEN_BARE: Lazy<Regex> = lazy_regex!(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})");
/// Token following a `bot` prefix
static TOKEN_PREFIXED: Lazy<Regex> = lazy_regex!(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+");

fn redact(input: &str) -> String {
    let output = TOKEN_IN_URL.replace_all(input, "$1[TELEGRAM_TOKEN]$3");
    let output = TOKEN_BARE.replace_all(&output, "[TELEGRAM_TOKEN]");
    TOKEN_PREFIXED
        .replace_all(&output, "$1[TELEGRAM_TOKEN]")
        .to_string()
}

struct RedactingWriter<W: Write> {
    inner: W,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        self.inner.write_all(redact(&s).as_bytes())?;
        // Report the original length even if the redacted string differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    init_logging();

    info!("Starting userbot...");

    let settings = init_settings();

    runner::run_bot(settings).await;
}

fn init_logging() {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn test_redacts_token_in_url() {
        let line = "GET https://api.telegram.org/bot123456789:AAAbbbCCC_ddd-eee/sendMessage failed";
        let redacted = redact(line);
        assert!(!redacted.contains("AAAbbbCCC"));
        assert!(redacted.contains("/bot[TELEGRAM_TOKEN]/sendMessage"));
    }

    #[test]
    fn test_redacts_bare_token() {
        let token = format!("123456789:{}", "A".repeat(35));
        let redacted = redact(&format!("token={token}"));
        assert_eq!(redacted, "token=[TELEGRAM_TOKEN]");
    }
}
