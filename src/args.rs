use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// svc-factory - 服务定义检查工具
#[derive(Parser, Debug)]
#[command(name = "svc-factory", version)]
#[command(about = "解析服务定义（含 extends 继承），列出、展示并检查定义表")]
pub struct Args {
    /// 子命令
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径（默认 ~/.config/svc-factory/svc-factory.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 定义表缓存 (none|memory|file)
    #[arg(long, global = true)]
    pub cache: Option<String>,

    /// 缓存有效期（秒）
    #[arg(long, global = true)]
    pub ttl: Option<u64>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 按声明顺序列出服务名及类型
    List {
        /// 定义文件 (.toml|.json)
        source: PathBuf,
    },
    /// 展示单个服务的类型与合并后的参数
    Show {
        /// 定义文件 (.toml|.json)
        source: PathBuf,
        /// 服务名
        name: String,
    },
    /// 解析定义并报告错误
    Check {
        /// 定义文件 (.toml|.json)
        source: PathBuf,
    },
}

impl Command {
    pub fn source(&self) -> &PathBuf {
        match self {
            Command::List { source } | Command::Show { source, .. } | Command::Check { source } => {
                source
            }
        }
    }
}
