mod args;

use anyhow::Context;
use clap::Parser;

use args::{Args, Command};
use svc_factory::config::{ConfigLoader, FactoryConfig};
use svc_factory::logging::{init_logging, LoggingConfig};
use svc_factory::{ServiceFactory, ServiceFactoryBuilder};

fn load_config(args: &Args) -> anyhow::Result<FactoryConfig> {
    let loader = ConfigLoader::new();
    let mut config = match &args.config {
        Some(path) => loader.load_from(path)?,
        None => loader.load_config()?,
    };

    config.source = Some(args.command.source().clone());
    if let Some(cache) = &args.cache {
        config.cache.backend = cache
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("invalid --cache value")?;
    }
    if let Some(ttl) = args.ttl {
        config.cache.ttl_secs = ttl;
    }
    Ok(config)
}

async fn build_factory(config: &FactoryConfig) -> svc_factory::Result<ServiceFactory> {
    // 命令行工具不注册构造器，类型检查无意义
    ServiceFactoryBuilder::from_config(config)
        .strict_types(false)
        .build()
        .await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let level = if args.verbose { "debug" } else { config.log_level.as_str() };
    init_logging(LoggingConfig::default().with_level_name(level))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    match &args.command {
        Command::List { .. } => {
            let factory = build_factory(&config).await?;
            let table = factory.table();
            for definition in table.iter() {
                println!("{}\t{}", definition.name, definition.type_name);
            }
        }
        Command::Show { name, .. } => {
            let factory = build_factory(&config).await?;
            let definition = factory
                .definition(name)
                .ok_or_else(|| anyhow::anyhow!("unknown service '{name}'"))?;
            println!("name: {}", definition.name);
            println!("type: {}", definition.type_name);
            if definition.params.is_empty() {
                println!("params: (none)");
            } else {
                println!("params:");
                for (key, value) in &definition.params {
                    println!("  {key} = {value}");
                }
            }
        }
        Command::Check { source } => match build_factory(&config).await {
            Ok(factory) => {
                println!(
                    "ok: {} services resolved from {}",
                    factory.names().len(),
                    source.display()
                );
            }
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
