/// CLI Interface Module
///
/// Entry point of the `p2p-exchange` binary.
///
/// ## Subcommands
/// - `rendezvous`: run the HTTP rendezvous service peers announce to
/// - `node`: run one exchange peer and read order commands from stdin
///
/// ## Console commands (node)
/// - `buy <price> <qty>` / `sell <price> <qty>`
/// - `book`: this node's book
/// - `peers`: every peer's book
/// - `reset`: clear this node's book
/// - `quit`

use crate::application::services::Submission;
use crate::domain::entities::BookSnapshot;
use crate::infrastructure::rendezvous::{
    serve_rendezvous, HttpRendezvous, InMemoryRendezvous, DEFAULT_TTL_MS,
};
use crate::node::{ExchangeNode, NodeConfig};
use crate::shared::protocol::{PeerResult, DEFAULT_TOPIC};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// 点对点撮合节点命令行
#[derive(Parser, Debug, Clone)]
#[command(name = "p2p-exchange")]
#[command(version)]
#[command(about = "Peer-to-peer limit order exchange", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 日志级别
    #[arg(
        short = 'l',
        long,
        global = true,
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// 仅显示配置不启动（用于调试）
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run an exchange peer
    Node(NodeArgs),
    /// Run the rendezvous service
    Rendezvous(RendezvousArgs),
}

#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Rendezvous service URL
    #[arg(short = 'r', long, default_value = "http://127.0.0.1:30001")]
    pub rendezvous: String,

    /// 监听地址
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// 监听端口（0 表示随机端口）
    #[arg(short, long, default_value_t = 0)]
    pub port: u16,

    /// Topic peers announce under
    #[arg(short, long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    #[arg(long, default_value_t = 1000)]
    pub announce_interval_ms: u64,

    /// Deadline for one broadcast
    #[arg(long, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Serve /metrics and /health on this port
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

impl NodeArgs {
    pub fn to_config(&self) -> NodeConfig {
        NodeConfig {
            listen_addr: SocketAddr::new(self.host, self.port),
            topic: self.topic.clone(),
            announce_interval: Duration::from_millis(self.announce_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            metrics_addr: self.metrics_port.map(|port| SocketAddr::new(self.host, port)),
            ..NodeConfig::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RendezvousArgs {
    /// 监听地址
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// 监听端口
    #[arg(short, long, default_value_t = 30001)]
    pub port: u16,

    /// Announcement lifetime
    #[arg(long, default_value_t = DEFAULT_TTL_MS)]
    pub ttl_ms: u64,
}

/// A line typed at the node console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Submit {
        side: String,
        price: String,
        quantity: String,
    },
    Book,
    Peers,
    Reset,
    Help,
    Quit,
}

/// Parses one console line; `Ok(None)` for a blank line
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let command = match parts.as_slice() {
        [] => return Ok(None),
        [side @ ("buy" | "sell"), price, quantity] => ConsoleCommand::Submit {
            side: side.to_string(),
            price: price.to_string(),
            quantity: quantity.to_string(),
        },
        ["buy" | "sell", ..] => return Err("usage: buy|sell <price> <qty>".to_string()),
        ["book"] => ConsoleCommand::Book,
        ["peers"] => ConsoleCommand::Peers,
        ["reset"] => ConsoleCommand::Reset,
        ["help"] => ConsoleCommand::Help,
        ["quit" | "exit"] => ConsoleCommand::Quit,
        [other, ..] => return Err(format!("unknown command {:?}, try `help`", other)),
    };
    Ok(Some(command))
}

/// Runs the CLI application
pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli.log_level);
    tracing::debug!("配置: {:?}", cli);

    let result = match &cli.command {
        Command::Node(args) => run_node(args, cli.dry_run).await,
        Command::Rendezvous(args) => run_rendezvous(args, cli.dry_run).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_rendezvous(
    args: &RendezvousArgs,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::new(args.host, args.port);

    println!("========================================");
    println!("  p2p-exchange rendezvous v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("监听地址:     {}", addr);
    println!("TTL:          {} ms", args.ttl_ms);
    println!("========================================");

    if dry_run {
        println!("\nDry-run 模式 - 不启动服务");
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let store = Arc::new(InMemoryRendezvous::new(Duration::from_millis(args.ttl_ms)));
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        signal_token.cancel();
    });

    serve_rendezvous(listener, store, shutdown).await?;
    Ok(())
}

async fn run_node(args: &NodeArgs, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config();

    println!("========================================");
    println!("  p2p-exchange node v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("监听地址:     {}", config.listen_addr);
    println!("Rendezvous:   {}", args.rendezvous);
    println!("Topic:        {}", config.topic);
    println!("宣告间隔:     {:?}", config.announce_interval);
    println!("请求超时:     {:?}", config.request_timeout);
    if let Some(addr) = config.metrics_addr {
        println!("Metrics:      http://{}/metrics", addr);
    }
    println!("========================================");

    if dry_run {
        println!("\nDry-run 模式 - 不启动节点");
        return Ok(());
    }

    let rendezvous = Arc::new(HttpRendezvous::new(
        args.rendezvous.clone(),
        config.request_timeout,
    )?);
    let node = ExchangeNode::start(config, rendezvous).await?;
    println!("listening on {} (type `help`)", node.local_addr());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            ConsoleCommand::Submit {
                side,
                price,
                quantity,
            } => match node.submit_order(&side, &price, &quantity).await {
                Ok(submission) => print_submission(&submission),
                Err(e) => println!("{}", e),
            },
            ConsoleCommand::Book => match node.order_book().await {
                Ok(book) => print_book(&book),
                Err(e) => println!("{}", e),
            },
            ConsoleCommand::Peers => print_replies(&node.peer_books().await),
            ConsoleCommand::Reset => match node.reset_order_book().await {
                Ok(()) => println!("book cleared"),
                Err(e) => println!("{}", e),
            },
            ConsoleCommand::Help => {
                println!("buy <price> <qty> | sell <price> <qty> | book | peers | reset | quit")
            }
            ConsoleCommand::Quit => break,
        }
    }

    node.close().await;
    Ok(())
}

fn print_submission(submission: &Submission) {
    let order = &submission.order;
    println!(
        "order {} {} {} @ {} ({} local trade(s))",
        order.id,
        order.side,
        order.quantity,
        order.price,
        submission.local_trades.len()
    );
    for trade in &submission.local_trades {
        println!(
            "  trade {} @ {} buy={} sell={}",
            trade.quantity, trade.price, trade.buy_order_id, trade.sell_order_id
        );
    }
    print_replies(&submission.replies);
}

fn print_replies(replies: &[PeerResult]) {
    if replies.is_empty() {
        println!("  no peer replies");
    }
    for reply in replies {
        match serde_json::to_string(reply) {
            Ok(json) => println!("  {}", json),
            Err(e) => println!("  <unprintable reply: {}>", e),
        }
    }
}

/// One-line top of book: best bid, best ask, spread and mid
fn quote_line(book: &BookSnapshot) -> String {
    fn or_dash(value: Option<Decimal>) -> String {
        value.map_or_else(|| "-".to_string(), |v| v.to_string())
    }
    format!(
        "bid {} | ask {} | spread {} | mid {}",
        or_dash(book.best_bid()),
        or_dash(book.best_ask()),
        or_dash(book.spread()),
        or_dash(book.mid_price()),
    )
}

fn print_book(book: &BookSnapshot) {
    println!("{}", quote_line(book));
    println!("{:>6} {:>14} {:>14}", "side", "price", "quantity");
    for order in book.sells.iter().rev() {
        println!("{:>6} {:>14} {:>14}", "sell", order.price, order.quantity);
    }
    for order in &book.buys {
        println!("{:>6} {:>14} {:>14}", "buy", order.price, order.quantity);
    }
}

/// 初始化日志系统
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_defaults() {
        let cli = Cli::parse_from(["p2p-exchange", "node"]);
        assert_eq!(cli.log_level, "info");
        assert!(!cli.dry_run);

        let Command::Node(args) = cli.command else {
            panic!("expected node subcommand");
        };
        assert_eq!(args.rendezvous, "http://127.0.0.1:30001");
        assert_eq!(args.port, 0);
        assert_eq!(args.topic, "exchange_orders");
        assert_eq!(args.metrics_port, None);

        let config = args.to_config();
        assert_eq!(config.announce_interval, Duration::from_millis(1000));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:0");
    }

    #[test]
    fn test_node_custom() {
        let cli = Cli::parse_from([
            "p2p-exchange",
            "node",
            "--rendezvous", "http://10.0.0.1:30001",
            "-H", "0.0.0.0",
            "-p", "4000",
            "--topic", "test_orders",
            "--announce-interval-ms", "250",
            "--request-timeout-ms", "500",
            "--metrics-port", "9090",
            "--log-level", "debug",
            "--dry-run",
        ]);
        assert_eq!(cli.log_level, "debug");
        assert!(cli.dry_run);

        let Command::Node(args) = cli.command else {
            panic!("expected node subcommand");
        };
        let config = args.to_config();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:4000");
        assert_eq!(config.topic, "test_orders");
        assert_eq!(config.request_timeout, Duration::from_millis(500));
        assert_eq!(config.metrics_addr.map(|a| a.port()), Some(9090));
    }

    #[test]
    fn test_rendezvous_defaults() {
        let cli = Cli::parse_from(["p2p-exchange", "rendezvous", "--ttl-ms", "2000"]);
        let Command::Rendezvous(args) = cli.command else {
            panic!("expected rendezvous subcommand");
        };
        assert_eq!(args.port, 30001);
        assert_eq!(args.ttl_ms, 2000);
        assert_eq!(args.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(Cli::try_parse_from(["p2p-exchange", "node", "-l", "loud"]).is_err());
    }

    #[test]
    fn test_parse_console_commands() {
        assert_eq!(
            parse_command("buy 100.5 2").unwrap(),
            Some(ConsoleCommand::Submit {
                side: "buy".into(),
                price: "100.5".into(),
                quantity: "2".into(),
            })
        );
        assert_eq!(parse_command("  book ").unwrap(), Some(ConsoleCommand::Book));
        assert_eq!(parse_command("quit").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(parse_command("").unwrap(), None);
        assert!(parse_command("sell 100").is_err());
        assert!(parse_command("cancel x").is_err());
    }

    #[test]
    fn test_quote_line() {
        use crate::domain::entities::{Order, Side};

        let mut book = BookSnapshot::default();
        assert_eq!(quote_line(&book), "bid - | ask - | spread - | mid -");

        book.buys.push(Order::new("b", Side::Buy, Decimal::new(99, 0), Decimal::ONE, 1));
        book.sells.push(Order::new("s", Side::Sell, Decimal::new(101, 0), Decimal::ONE, 2));
        assert_eq!(quote_line(&book), "bid 99 | ask 101 | spread 2 | mid 100");
    }
}
