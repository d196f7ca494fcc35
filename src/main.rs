use anyhow::Context;
use clap::Parser;
use tarot_cache::adapters::sink::LocalDirSink;
use tarot_cache::config::Command;
use tarot_cache::utils::error::ErrorCategory;
use tarot_cache::utils::{logger, validation::Validate};
use tarot_cache::{CliConfig, DivinationRequest, TarotConfig, TarotError, TarotService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_service_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting tarot");
    tracing::info!("📁 Loading configuration from: {}", cli.config);

    let mut config = TarotConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load config file '{}'", cli.config))?;

    if let Command::Draw {
        seed: Some(seed), ..
    } = &cli.command
    {
        config.draw.seed = Some(*seed);
        tracing::info!("🔧 Seed overridden to: {}", seed);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    // 資料表缺失或格式錯誤屬於啟動失敗
    let service = match TarotService::from_config(config) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("❌ Startup failed: {}", e);
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Draw {
            scope,
            formation,
            out,
            ..
        } => {
            let request = DivinationRequest::new(scope, formation);
            let sink = LocalDirSink::new(&out);
            match service.divine_and_deliver(&request, &sink).await {
                Ok(sent) => {
                    tracing::info!("✅ Divination completed, {} messages delivered", sent);
                    println!("📁 Reading saved to: {}", out);
                }
                Err(e) => exit_with(e),
            }
        }
        Command::Prime { concurrency } => {
            let report = service.prime(concurrency).await;
            for failure in &report.failures {
                eprintln!("⚠️ {}", failure);
            }
            println!(
                "📦 Cached {}/{} cards",
                report.succeeded, report.attempted
            );
            if report.succeeded < report.attempted {
                std::process::exit(2);
            }
        }
        Command::Formations => {
            for name in service.catalog().formation_names() {
                let formation = service.catalog().formation(name)?;
                println!(
                    "{} ({} cards{})",
                    formation.name,
                    formation.card_count,
                    if formation.allows_reversal {
                        ", reversals"
                    } else {
                        ""
                    }
                );
            }
        }
    }

    Ok(())
}

fn exit_with(e: TarotError) -> ! {
    tracing::error!(
        "❌ Divination failed: {} (Category: {:?})",
        e,
        e.category()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());

    let exit_code = match e.category() {
        ErrorCategory::Validation => 2,
        ErrorCategory::Fetch => 3,
        ErrorCategory::Configuration => 1,
        ErrorCategory::System => 4,
    };
    std::process::exit(exit_code);
}
