mod config;
mod cycle;
mod error;
mod extract;
mod fetch;
mod model;
mod notify;
mod scheduler;
#[cfg(test)]
mod testing;
mod tracker;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::config::{FileConfig, TelegramSettings};
use crate::cycle::{CycleReport, Watcher};
use crate::extract::ExtractConfig;
use crate::fetch::Fetcher;
use crate::model::{CycleResult, RawPage};
use crate::notify::telegram::TelegramClient;
use crate::notify::{format, Notifier, Transport};

#[derive(Parser)]
#[command(name = "crous_watch", about = "Watch the CROUS housing search and post new rooms to Telegram")]
struct Cli {
    /// JSON config file; environment variables take precedence
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check on a fixed interval until Ctrl-C / SIGTERM
    Run,
    /// Run a single check
    Check {
        /// Print the message instead of sending it (no Telegram credentials needed)
        #[arg(long)]
        dry_run: bool,
    },
    /// Extract listings from a saved search page
    Parse {
        file: PathBuf,
        /// URL recorded as the listings' source (default: configured url)
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List chat ids of people who messaged the bot
    ChatId,
    /// Check the bot token and send a test message to every recipient
    Doctor,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let t0 = Instant::now();
    let cli = Cli::parse();
    let cfg = config::load(&cli.config, |key| std::env::var(key).ok())?;

    let result = match cli.command {
        Commands::Run => {
            let mut watcher = build_watcher(&cfg, cfg.telegram_settings()?)?;
            let interval = cfg.watch_settings()?.interval;
            // handlers go in before the first message so an early Ctrl-C is not fatal
            let shutdown = match scheduler::shutdown_signal() {
                Ok(shutdown) => shutdown,
                Err(e) => {
                    let message = format::error_message(&e.to_string(), Local::now());
                    watcher.notifier().broadcast(&message).await;
                    return Err(e).context("failed to install signal handlers");
                }
            };
            scheduler::run(&mut watcher, interval, shutdown).await
        }
        Commands::Check { dry_run } => {
            let telegram = if dry_run {
                // never used to send; recipients stay empty
                cfg.telegram_settings().unwrap_or(TelegramSettings {
                    bot_token: String::new(),
                    chat_ids: Vec::new(),
                })
            } else {
                cfg.telegram_settings()?
            };
            let mut watcher = build_watcher(&cfg, telegram)?.dry_run(dry_run);
            let report = watcher.run_cycle().await?;
            println!("Result: {}", report);
            match report {
                CycleReport::DryRun { message, .. } => println!("\n{}", message),
                CycleReport::FetchFailed { reason } => anyhow::bail!("fetch failed: {}", reason),
                CycleReport::DeliveryFailed { .. } => anyhow::bail!("no recipient received the message"),
                _ => {}
            }
            Ok(())
        }
        Commands::Parse { file, url, json } => {
            let watch = cfg.watch_settings()?;
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let page = RawPage {
                url: url.unwrap_or(watch.url),
                body,
                fetched_at: Local::now(),
            };
            let result = extract::extract(&page, &ExtractConfig { default_area: watch.area });
            print_result(&result, json)
        }
        Commands::ChatId => {
            let client = TelegramClient::new(&cfg.bot_token()?)?;
            let updates = client.get_updates().await?;

            let mut chats = BTreeMap::new();
            for chat in updates.into_iter().filter_map(|u| u.message).map(|m| m.chat) {
                chats.insert(chat.id, chat);
            }
            if chats.is_empty() {
                println!("No messages found. Send any message to your bot, then run this again.");
                return Ok(());
            }

            for chat in chats.values() {
                println!(
                    "{:>14} | {:<8} | {:<20} | @{}",
                    chat.id,
                    chat.kind.as_deref().unwrap_or("-"),
                    truncate(chat.first_name.as_deref().unwrap_or("-"), 20),
                    chat.username.as_deref().unwrap_or("-")
                );
            }
            let ids: Vec<String> = chats.keys().map(|id| id.to_string()).collect();
            println!("\nTELEGRAM_CHAT_IDS={}", ids.join(","));
            Ok(())
        }
        Commands::Doctor => {
            let telegram = cfg.telegram_settings()?;
            let client = TelegramClient::new(&telegram.bot_token)?;
            let bot = client.get_me().await.context("bot token rejected")?;
            println!(
                "Bot OK: {} (@{})",
                bot.first_name,
                bot.username.as_deref().unwrap_or("-")
            );

            let total = telegram.chat_ids.len();
            let mut sent = 0;
            for (i, chat_id) in telegram.chat_ids.iter().enumerate() {
                let message = format::test_message(i + 1, total, chat_id, Local::now());
                match client.deliver(chat_id, &message).await {
                    Ok(()) => {
                        println!("  {} ... sent", chat_id);
                        sent += 1;
                    }
                    Err(e) => println!("  {} ... FAILED: {}", chat_id, e),
                }
            }

            println!("\nTest messages sent to {}/{} recipients", sent, total);
            if sent == 0 {
                anyhow::bail!("no recipient received the test message");
            }
            if sent < total {
                println!("Some recipients failed; make sure each one has started a chat with the bot.");
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn build_watcher(cfg: &FileConfig, telegram: TelegramSettings) -> anyhow::Result<Watcher<Fetcher, TelegramClient>> {
    let watch = cfg.watch_settings()?;
    let fetcher = Fetcher::new(watch.fetch_timeout)?;
    let client = TelegramClient::new(&telegram.bot_token)?;
    let notifier = Notifier::new(client, telegram.chat_ids, watch.area.clone(), watch.url.clone());
    Ok(Watcher::new(
        fetcher,
        notifier,
        watch.url,
        ExtractConfig { default_area: watch.area },
    ))
}

fn print_result(result: &CycleResult, json: bool) -> anyhow::Result<()> {
    if json {
        let note = match result {
            CycleResult::Indeterminate { note } => Some(note.as_str()),
            _ => None,
        };
        let out = serde_json::json!({
            "result": result.label(),
            "note": note,
            "listings": result.listings(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let listings = result.listings();
    println!("Result: {}", result.label());
    if listings.is_empty() {
        if let CycleResult::Indeterminate { note } = result {
            println!("Note: {}", note);
        }
        return Ok(());
    }

    println!(
        "{:>3} | {:<12} | {:<40} | {:>6} | {:<10}",
        "#", "Kind", "Location", "Rent", "Id"
    );
    println!("{}", "-".repeat(84));
    for (i, l) in listings.iter().enumerate() {
        println!(
            "{:>3} | {:<12} | {:<40} | {:>6} | {:<10}",
            i + 1,
            truncate(&l.kind, 12),
            truncate(&l.location, 40),
            l.rent,
            l.id
        );
    }
    println!("\n{} listings", listings.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
