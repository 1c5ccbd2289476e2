//! Command Line Interface (CLI) arguments.

use byte_unit::Byte;
use clap::Parser;
use url::Url;

/// mlcatalog command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "MLCATALOG_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "MLCATALOG_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "MLCATALOG_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/mlcatalog/certs/cert.pem",
        env = "MLCATALOG_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/mlcatalog/certs/key.pem",
        env = "MLCATALOG_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "MLCATALOG_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "MLCATALOG_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Directory holding the document database
    #[arg(
        long,
        default_value = "~/.local/share/mlcatalog/db",
        env = "MLCATALOG_DATA_DIR"
    )]
    pub data_dir: String,
    /// Use a throwaway database that is deleted on exit. Overrides --data-dir.
    #[arg(long, default_value_t = false, env = "MLCATALOG_TEMPORARY")]
    pub temporary: bool,
    /// Size of the database page cache, e.g. 512MiB
    #[arg(long, default_value = "512MiB", value_parser = parse_byte_size, env = "MLCATALOG_CACHE_CAPACITY")]
    pub cache_capacity: u64,
    /// Prefix applied to the names of the catalog's collections
    #[arg(long, default_value = "", env = "MLCATALOG_COLLECTION_PREFIX")]
    pub collection_prefix: String,
    /// Externally visible base URL. Location headers are absolute URLs under this base if set,
    /// otherwise absolute paths.
    #[arg(long, value_parser = parse_public_url, env = "MLCATALOG_PUBLIC_URL")]
    pub public_url: Option<Url>,
    /// Drop the catalog's collections and exit
    #[arg(long, default_value_t = false)]
    pub teardown: bool,
}

/// Parse a human readable size such as `512MiB` or `1 GB` into a number of bytes.
fn parse_byte_size(value: &str) -> Result<u64, String> {
    Byte::parse_str(value, true)
        .map(|size| size.as_u64())
        .map_err(|err| err.to_string())
}

/// Parse a base URL under which Location headers are generated.
fn parse_public_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|err| err.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("unsupported URL scheme {}", scheme)),
    }
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CommandLineArgs::parse_from(["mlcatalog"]);
        assert_eq!(8080, args.port);
        assert_eq!(512 * 1024 * 1024, args.cache_capacity);
        assert_eq!("", args.collection_prefix);
        assert_eq!(None, args.public_url);
        assert!(!args.temporary);
        assert!(!args.teardown);
    }

    #[test]
    fn byte_size() {
        assert_eq!(Ok(1024), parse_byte_size("1KiB"));
        assert_eq!(Ok(2_000_000), parse_byte_size("2 MB"));
        assert_eq!(Ok(42), parse_byte_size("42"));
        assert!(parse_byte_size("lots").is_err());
    }

    #[test]
    fn public_url() {
        let url = parse_public_url("https://catalog.example.com/api/").unwrap();
        assert_eq!("/api/", url.path());
        assert!(parse_public_url("ftp://example.com").is_err());
        assert!(parse_public_url("mailto:user@example.com").is_err());
        assert!(parse_public_url("not a url").is_err());
    }

    #[test]
    fn flags() {
        let args = CommandLineArgs::parse_from([
            "mlcatalog",
            "--temporary",
            "--collection-prefix",
            "test_",
            "--public-url",
            "http://localhost:8080",
            "--cache-capacity",
            "1 MiB",
        ]);
        assert!(args.temporary);
        assert_eq!("test_", args.collection_prefix);
        assert_eq!(1024 * 1024, args.cache_capacity);
        assert_eq!(
            Some("http://localhost:8080/"),
            args.public_url.as_ref().map(Url::as_str)
        );
    }
}
