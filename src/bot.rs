use std::path::PathBuf;
use std::sync::Arc;

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;

use chrono::{Timelike, Utc};

use tokio::time::{Duration, sleep};

use std::env;

use anyhow::{Context, Result};

use crate::config::EngineConfig;
use crate::db::SqliteRepository;
use crate::error::EngineResult;

pub mod commands;

use commands::{Commands, getenv_call_token};

/// Everything a command needs to reach the engine.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub db_path: PathBuf,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Opens a fresh connection. Commands open one each and drop it before awaiting.
    pub fn open(&self) -> EngineResult<SqliteRepository> {
        SqliteRepository::open(&self.db_path)
    }
}

pub async fn run_bot(engine: EngineContext) -> Result<()> {
    let token = env::var("DISCORD_TOKEN")
        .context("Expected 'DISCORD_TOKEN=<token>' in .env in project root.")?;

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = LeaderboardHandler { engine: Arc::new(engine) };
    let mut client =
        Client::builder(&token, intents).event_handler(handler).await
            .context("Error creating client.")?;

    client.start().await?;

    Ok(())
}

async fn sleep_until_midnight_utc() {
    const TARGET_HOUR: u32 = 0; // 00:00 UTC (midnight)
    let now = Utc::now();

    let now_minutes = now.hour() * 60 + now.minute();
    let target_minutes = TARGET_HOUR * 60;

    // Calculate minutes to wait until the next midnight
    let mins_to_wait = (24 * 60 - now_minutes) + target_minutes;

    let sleep_duration = Duration::from_secs((mins_to_wait * 60) as u64);
    log::info!("Next leaderboard post in {} minutes.", sleep_duration.as_secs() / 60);

    sleep(sleep_duration).await;
}

struct LeaderboardHandler {
    engine: Arc<EngineContext>,
}

#[async_trait]
impl EventHandler for LeaderboardHandler {
    async fn ready(&self, ctx: serenity::client::Context, _ready: Ready) {
        log::info!("Bot is connected and ready!");

        let channel_id = match env::var("ANNOUNCEMENTS_CHANNEL_ID").map(|id| id.parse::<u64>()) {
            Ok(Ok(id)) => id,
            Ok(Err(err)) => {
                log::error!("ANNOUNCEMENTS_CHANNEL_ID is not a channel id: {err}");
                return;
            }
            Err(_) => {
                log::info!("ANNOUNCEMENTS_CHANNEL_ID not set, daily leaderboard disabled.");
                return;
            }
        };

        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            loop {
                sleep_until_midnight_utc().await;

                let board = commands::render_daily_leaderboard(&engine)
                    .unwrap_or_else(|err| {
                        log::error!("Could not build daily leaderboard: {err}");
                        err.user_message()
                    });

                if let Err(err) = serenity::model::id::ChannelId::new(channel_id)
                    .say(&ctx.http, board)
                    .await
                {
                    log::error!("Error sending scheduled message: {:?}", err);
                }
            }
        });
    }

    async fn message(&self, ctx: serenity::client::Context, msg: Message) {
        let channel = msg.channel_id;
        let content = msg.content.clone();

        // Commands
        if content.starts_with(getenv_call_token()) && content.len() > 1 {
            let response = match Commands::run_command(&ctx, &msg, &self.engine).await {
                Ok(message) => { message }
                Err(err) => { format!("Error: {}", err) }
            };

            // Discord doesn't like sending empty messages.
            // If everything is ok and the bot doesn't have anything to say, return early.
            if response.is_empty() { return; }

            // Attempt to send response.
            // If something goes wrong, we want to let the user know, if possible,
            //   so we try to send another "Oops, internal error" before exiting.
            if let Err(why) = channel.say(&ctx.http, response).await {
                let _ = channel.say(&ctx.http, "Oops, internal error.").await;
                log::error!("Error sending message: {why:?}");
            }
        }
    }
}
