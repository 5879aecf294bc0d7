//! memchat - 带记忆的命令行对话助手
//!
//! 入口：解析参数、初始化日志、加载配置与记忆，然后逐行读取标准输入对话，
//! 直到 EOF、Ctrl-C 或输入 exit / quit / bye。

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use memchat::agent::{is_exit_command, sanitize_user_input};
use memchat::config::{load_config, AppConfig};
use memchat::{observability, ChatAgent};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "memchat")]
#[command(version, about = "memchat - Chatbot with memory")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Extra config file (layered over config/default.toml)
    #[arg(short, long, env = "MEMCHAT_CONFIG")]
    config: Option<PathBuf>,
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(cli.verbose);

    let cfg = load_config(cli.config).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let mut agent = ChatAgent::from_config(&cfg);
    agent.load_memory().context("Failed to load memory")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        flush_stdout();

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Keyboard interrupt received. Exiting chat.");
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = sanitize_user_input(&line);
        if input.is_empty() {
            continue;
        }
        tracing::debug!("User input received: {}", input);
        if is_exit_command(input) {
            tracing::info!("User has chosen to exit the chat.");
            break;
        }

        print!("{}: ", agent.name());
        flush_stdout();
        let result = agent
            .respond_with(input, |chunk| {
                print!("{}", chunk);
                flush_stdout();
            })
            .await;
        println!();
        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }

        if let Err(e) = agent.save_memory() {
            eprintln!("Error: {}", e);
        }
    }

    agent.save_memory().context("Failed to save memory")?;
    tracing::info!("Memory saved successfully. Chat ended.");
    Ok(())
}
