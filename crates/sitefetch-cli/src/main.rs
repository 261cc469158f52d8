//! SiteFetch CLI - Command-line interface for guarded web fetching

mod mcp;

use clap::{Args, Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use serde::Serialize;
use sitefetch::{
    BatchArgs, BatchOptions, FetchRequest, FetchResult, OutputFormat, StreamOptions, Tool,
    TOOL_LLMTXT,
};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Output format for fetch subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Output {
    /// Content with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// SiteFetch - guarded web fetching for LLM tools
#[derive(Parser, Debug)]
#[command(name = "sitefetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    tool: ToolArgs,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,
}

/// Options applied to every operation
#[derive(Args, Debug, Clone, Default)]
struct ToolArgs {
    /// Reject non-HTML responses
    #[arg(long, global = true)]
    strict: bool,

    /// Allow localhost and private network hosts
    #[arg(long, global = true)]
    allow_private: bool,

    /// Custom User-Agent
    #[arg(long, global = true)]
    user_agent: Option<String>,
}

impl ToolArgs {
    fn build(&self) -> Tool {
        let mut builder = Tool::builder()
            .strict(self.strict)
            .allow_private_hosts(self.allow_private);
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        builder.build()
    }
}

/// Request options shared by fetch and batch
#[derive(Args, Debug, Clone)]
struct RequestArgs {
    /// Content format: raw, text or markdown
    #[arg(long, short, default_value = "markdown")]
    format: OutputFormat,

    /// Timeout in milliseconds (clamped to 1000..=60000)
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not follow redirects
    #[arg(long)]
    no_follow: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Mcp,
    /// Fetch URL and output content with metadata frontmatter
    Fetch {
        /// URL to fetch
        url: String,

        #[command(flatten)]
        request: RequestArgs,

        /// Extra request header as NAME:VALUE (repeatable)
        #[arg(long = "header", short = 'H', value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: Output,
    },
    /// Fetch several URLs and stream progress events to stdout
    Batch {
        /// URLs to fetch (at most 20)
        #[arg(required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        request: RequestArgs,

        /// URLs fetched at once (clamped to 1..=10)
        #[arg(long, short)]
        concurrency: Option<usize>,

        /// Session identifier echoed in the start event
        #[arg(long)]
        session: Option<String>,
    },
    /// Extract page metadata as JSON
    Metadata {
        /// URL to inspect
        url: String,
    },
    /// Check URL availability with a HEAD request
    Status {
        /// URL to check
        url: String,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    // Handle --llmtxt flag
    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    let tool = cli.tool.build();

    match cli.command {
        Some(Commands::Mcp) => {
            mcp::run_server(tool).await;
        }
        Some(Commands::Fetch {
            url,
            request,
            headers,
            output,
        }) => {
            run_fetch(&tool, fetch_request(url, &request, headers), output).await;
        }
        Some(Commands::Batch {
            urls,
            request,
            concurrency,
            session,
        }) => {
            let args = BatchArgs {
                urls,
                options: BatchOptions {
                    format: Some(request.format),
                    follow_redirects: Some(!request.no_follow),
                    timeout: request.timeout,
                    max_concurrency: concurrency,
                },
            };
            run_batch(&tool, args, session).await;
        }
        Some(Commands::Metadata { url }) => {
            print_json_or_exit(tool.extract_website_metadata(&url).await);
        }
        Some(Commands::Status { url }) => {
            print_json_or_exit(tool.check_website_status(&url).await);
        }
        None => {
            eprintln!("Usage: sitefetch fetch <URL>");
            eprintln!("   or: sitefetch batch <URL>...");
            eprintln!("   or: sitefetch mcp");
            eprintln!("   or: sitefetch --help");
            std::process::exit(1);
        }
    }
}

/// Log to stderr so stdout carries only results, frames and JSON-RPC
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
}

fn fetch_request(url: String, args: &RequestArgs, headers: Vec<(String, String)>) -> FetchRequest {
    let mut request = FetchRequest::new(url)
        .format(args.format)
        .follow_redirects(!args.no_follow);
    if let Some(timeout) = args.timeout {
        request = request.timeout_ms(timeout);
    }
    for (name, value) in headers {
        request = request.header(name, value);
    }
    request
}

/// Parse a `NAME:VALUE` header argument
fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{}'", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

async fn run_fetch(tool: &Tool, request: FetchRequest, output: Output) {
    match tool.fetch_website(request).await {
        Ok(result) => match output {
            Output::Md => writeln_safe(&format_md_with_frontmatter(&result)),
            Output::Json => print_json(&result),
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_batch(tool: &Tool, args: BatchArgs, session: Option<String>) {
    let options = StreamOptions {
        session_id: session,
        retry_ms: None,
    };
    let mut stream = match tool.stream_batch(args, options) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    while let Some(frame) = stream.next().await {
        write_safe(&String::from_utf8_lossy(&frame));
    }
}

/// Format a fetch result as content with YAML frontmatter
fn format_md_with_frontmatter(result: &FetchResult) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", result.url));
    if result.final_url != result.url {
        output.push_str(&format!("final_url: {}\n", result.final_url));
    }
    output.push_str(&format!("status_code: {}\n", result.status_code));
    if !result.content_type.is_empty() {
        output.push_str(&format!("source_content_type: {}\n", result.content_type));
    }
    if let Some(ref title) = result.title {
        output.push_str(&format!("title: {}\n", title));
    }
    if let Some(format) = result.format {
        output.push_str(&format!("format: {}\n", format));
    }
    output.push_str(&format!("fetch_time_ms: {}\n", result.fetch_time));
    if result.truncated == Some(true) {
        output.push_str("truncated: true\n");
    }
    output.push_str("---\n");
    output.push_str(&result.content);

    output
}

fn print_json_or_exit<T: Serialize, E: std::fmt::Display>(result: Result<T, E>) {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing response: {}", e);
        std::process::exit(1);
    });
    writeln_safe(&json);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    write_safe(&format!("{}\n", s));
}

fn write_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = handle.write_all(s.as_bytes()).and_then(|_| handle.flush()) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_md_basic() {
        let result = FetchResult {
            url: "https://example.com".to_string(),
            final_url: "https://example.com".to_string(),
            status_code: 200,
            content_type: "text/html".to_string(),
            content: "# Hello World".to_string(),
            format: Some(OutputFormat::Markdown),
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&result);

        assert!(output.starts_with("---\n"));
        assert!(output.contains("url: https://example.com\n"));
        assert!(!output.contains("final_url"));
        assert!(output.contains("status_code: 200\n"));
        assert!(output.contains("source_content_type: text/html\n"));
        assert!(output.contains("format: markdown\n"));
        assert!(output.ends_with("---\n# Hello World"));
    }

    #[test]
    fn test_format_md_with_redirect_and_title() {
        let result = FetchResult {
            url: "http://example.com".to_string(),
            final_url: "https://www.example.com/".to_string(),
            status_code: 200,
            title: Some("Example".to_string()),
            truncated: Some(true),
            fetch_time: 42,
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&result);

        assert!(output.contains("final_url: https://www.example.com/\n"));
        assert!(output.contains("title: Example\n"));
        assert!(output.contains("fetch_time_ms: 42\n"));
        assert!(output.contains("truncated: true\n"));
    }

    #[test]
    fn test_format_md_truncated_false_omitted() {
        let result = FetchResult {
            url: "https://example.com".to_string(),
            status_code: 200,
            truncated: Some(false),
            content: "Content".to_string(),
            ..Default::default()
        };

        assert!(!format_md_with_frontmatter(&result).contains("truncated"));
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-Api-Key: secret").unwrap(),
            ("X-Api-Key".to_string(), "secret".to_string())
        );
        assert_eq!(
            parse_header("Accept:text/html").unwrap(),
            ("Accept".to_string(), "text/html".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_fetch_request_from_args() {
        let args = RequestArgs {
            format: OutputFormat::Text,
            timeout: Some(5000),
            no_follow: true,
        };
        let request = fetch_request(
            "https://example.com".to_string(),
            &args,
            vec![("X-Test".to_string(), "1".to_string())],
        );

        assert_eq!(request.effective_format(), OutputFormat::Text);
        assert_eq!(request.effective_timeout_ms(), 5000);
        assert!(!request.wants_redirects());
        assert_eq!(
            request.headers.unwrap().get("X-Test").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_cli_parses_batch() {
        let cli = Cli::parse_from([
            "sitefetch",
            "--strict",
            "batch",
            "https://a.example",
            "https://b.example",
            "--concurrency",
            "2",
            "--format",
            "text",
        ]);
        assert!(cli.tool.strict);
        match cli.command {
            Some(Commands::Batch {
                urls,
                concurrency,
                request,
                ..
            }) => {
                assert_eq!(urls.len(), 2);
                assert_eq!(concurrency, Some(2));
                assert_eq!(request.format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
