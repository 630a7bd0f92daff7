//! # debut
//!
//! 演示文稿的命令行工具。
//!
//! ## 用法
//!
//! ```bash
//! # 检查演示文稿能否构建（报告配置错误）
//! debut check deck.json
//!
//! # 逐簇播放并打印每一步的元素状态
//! debut play deck.json
//! debut play deck.json --script demo.txt --json
//!
//! # 全局选项
//! debut --config debut.json --log-level debug play deck.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use debut_host::{DEFAULT_CONFIG_PATH, Deck, HostConfig, Player, default_script, parse_script};

#[derive(Parser)]
#[command(name = "debut")]
#[command(about = "演示步骤序列器 - 检查并播放演示文稿")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：debut.json）
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// 日志级别，覆盖配置文件中的 log_level
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建演示文稿并报告配置错误
    Check {
        /// 演示文稿路径
        deck: PathBuf,
    },

    /// 按命令脚本播放演示文稿
    Play {
        /// 演示文稿路径
        deck: PathBuf,

        /// 命令脚本（默认：逐簇前进）
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// 以 JSON 行输出快照
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("debut: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 先读配置再初始化日志，配置加载的警告要等订阅者就位后才输出
    let read = HostConfig::read(&cli.config);
    let level = cli
        .log_level
        .clone()
        .or_else(|| read.as_ref().ok().map(|config| config.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&level)?;

    let config = HostConfig::or_default(read, &cli.config);
    config.validate().context("配置无效")?;

    match cli.command {
        Commands::Check { deck } => check(&deck, &config),
        Commands::Play { deck, script, json } => play(&deck, script.as_deref(), json, &config),
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let level: tracing::Level = level
        .parse()
        .with_context(|| format!("无效的日志级别 '{level}'"))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn check(path: &Path, config: &HostConfig) -> anyhow::Result<()> {
    let deck = Deck::load(path)?;
    let presentation = deck
        .build(config)
        .with_context(|| format!("构建 {} 失败", path.display()))?;

    let timeline = &presentation.timeline;
    info!(
        elements = presentation.elements.len(),
        steps = timeline.len(),
        clusters = timeline.cluster_starts().len(),
        "检查通过"
    );
    println!(
        "{}: {} 个元素, {} 个步骤, {} 个簇",
        path.display(),
        presentation.elements.len(),
        timeline.len(),
        timeline.cluster_starts().len()
    );
    Ok(())
}

fn play(
    path: &Path,
    script: Option<&Path>,
    json: bool,
    config: &HostConfig,
) -> anyhow::Result<()> {
    let deck = Deck::load(path)?;
    let presentation = deck
        .build(config)
        .with_context(|| format!("构建 {} 失败", path.display()))?;

    let commands = match script {
        Some(script) => {
            let text = std::fs::read_to_string(script)
                .with_context(|| format!("无法读取脚本 {}", script.display()))?;
            parse_script(&text)?
        }
        None => default_script(&presentation.timeline),
    };

    let mut player = Player::new(presentation, config.wait_ms);
    for command in commands {
        let snapshot = player.execute(command);
        if json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            println!("{snapshot}");
        }
    }
    Ok(())
}
