use crate::bot::EngineContext;
use crate::engine;
use crate::error::{EngineError, EngineResult};
use crate::input::SessionInput;
use crate::ranking::{RankedUser, SortBy, TimeRange};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use itertools::Itertools;
use serenity::model::channel::Message;

const MAX_CMD_LENGTH: usize = 12;
const LEADERBOARD_SIZE: usize = 10;
const HISTORY_SIZE: usize = 5;

struct CommandInstance<'a> {
    msg: &'a Message,
    ctx: &'a serenity::client::Context,
    engine: &'a EngineContext,

    parameters: &'a [&'a str],
}

pub struct Commands;
impl Commands {
    pub async fn run_command(
        ctx: &serenity::client::Context,
        msg: &Message,
        engine: &EngineContext,
    ) -> Result<String> {

        // Split the message's content (on whitespace) into:
        // - The command (first token)
        // - Its parameters (all tokens afterwards)

        // Skip the call token
        let input = msg
            .content
            .strip_prefix(getenv_call_token())
            .unwrap_or(&msg.content);
        let split_tokens = input.split_whitespace().collect::<Vec<_>>();
        let Some((&command, parameters)) = split_tokens.split_first() else {
            return Err(anyhow!("Expected a command, see {}help.", getenv_call_token()));
        };

        let cmd = CommandInstance { msg, ctx, engine, parameters };

        // Execute the command
        let result: String = match command {
                   "join" => cmd.join().await?,
                 "submit" => cmd.submit()?,
            "leaderboard" => cmd.leaderboard()?,
                "profile" => cmd.profile()?,
                "history" => cmd.history()?,
                   "help" => Self::get_help(),
            _ => {
                if Commands::is_valid_cmd(command) {
                    log::info!("User submitted unknown command: {}", command);
                    return Err(anyhow!(
                        "No such command found: {}, see {}help for commands.",
                        command, getenv_call_token()
                    ));
                } else {
                    log::info!("User submitted invalid command: {}", command);
                    return Err(anyhow!("Invalid command syntax."));
                }
            }
        };

        Ok(result)
    }
}

impl CommandInstance<'_> {
    fn author(&self) -> &str {
        &self.msg.author.name
    }

    /// The username given as the first parameter, or the author's.
    fn target(&self) -> &str {
        self.parameters.first().copied().unwrap_or_else(|| self.author())
    }

    async fn join(&self) -> Result<String> {
        let created = {
            let repo = self.engine.open().map_err(user_facing)?;
            engine::register_user(&repo, self.author()).map_err(user_facing)?
        };

        if created {
            self.react_ok().await
        } else {
            Ok(format!("{} is already on the leaderboard.", self.author()))
        }
    }

    fn submit(&self) -> Result<String> {
        let policy = self.engine.config.input_policy;
        let now = Utc::now();
        let mut repo = self.engine.open().map_err(user_facing)?;

        let outcome = if self.parameters.first().is_some_and(|p| p.starts_with('{')) {
            let body: serde_json::Value = serde_json::from_str(&self.parameters.join(" "))
                .context("Could not read the session as JSON.")?;
            engine::submit_json(&mut repo, &self.engine.config, self.author(), &body, now)
        } else {
            SessionInput::from_args(self.parameters, policy).and_then(|input| {
                engine::submit_session(&mut repo, &self.engine.config, self.author(), input, now)
            })
        }
        .map_err(|err| match err {
            EngineError::NotFound(_) => anyhow!(
                "You're not on the leaderboard yet, use `{}join` first.", getenv_call_token()
            ),
            EngineError::Validation(_) => anyhow!(
                "{}\nExpected usage: `{}submit <rating> <seconds> [lap:seconds[:comment] ...]`",
                err, getenv_call_token()
            ),
            err => user_facing(err),
        })?;

        Ok(format!(
            "**Session logged!**\n{}\n\nYou now have {} points ({}), a {}-day streak, and are rank #{}.",
            outcome.breakdown,
            outcome.user.total_score, outcome.user.league,
            outcome.user.current_streak, outcome.rank
        ))
    }

    fn leaderboard(&self) -> Result<String> {
        let sort_by = SortBy::parse_lenient(self.parameters.first().copied());
        let time_range = TimeRange::parse_lenient(self.parameters.get(1).copied());

        let repo = self.engine.open().map_err(user_facing)?;
        let board = engine::leaderboard(&repo, sort_by, time_range, Utc::now(), Some(LEADERBOARD_SIZE))
            .map_err(user_facing)?;

        Ok(render_leaderboard(&board, sort_by, time_range))
    }

    fn profile(&self) -> Result<String> {
        let repo = self.engine.open().map_err(user_facing)?;
        let profile = engine::profile(&repo, self.target(), Utc::now()).map_err(user_facing)?;

        Ok(format!("{}\n\tRank: #{}", profile.user, profile.rank))
    }

    fn history(&self) -> Result<String> {
        let repo = self.engine.open().map_err(user_facing)?;
        let sessions = engine::history(&repo, self.target(), HISTORY_SIZE).map_err(user_facing)?;

        if sessions.is_empty() {
            return Ok(format!("{} hasn't logged any sessions yet.", self.target()));
        }

        Ok(sessions.iter().join("\n"))
    }

    async fn react_ok(&self) -> Result<String> {
        self.msg.react(
            &self.ctx.http,
            serenity::all::ReactionType::Unicode(String::from("✅")),
        )
        .await?;

        Ok(String::from(""))
    }
}

/// Builds the all-time leaderboard posted every night.
pub fn render_daily_leaderboard(engine: &EngineContext) -> EngineResult<String> {
    let repo = engine.open()?;
    let board = engine::leaderboard(&repo, SortBy::TotalScore, TimeRange::All, Utc::now(),
                                    Some(LEADERBOARD_SIZE))?;

    Ok(render_leaderboard(&board, SortBy::TotalScore, TimeRange::All))
}

pub fn render_leaderboard(board: &[RankedUser], sort_by: SortBy, time_range: TimeRange) -> String {
    let mut output = format!("**Leaderboard: {} ({})**", sort_by.label(), time_range.label());

    if board.is_empty() {
        output += "\n\tNobody has logged a session yet.";
        return output;
    }

    for entry in board {
        output += &format!("\n\t`#{}` {} ({}): {}",
                           entry.rank, entry.user.username, entry.user.league, entry.metric);
    }

    output
}

/// Keeps storage details out of chat.
fn user_facing(err: EngineError) -> anyhow::Error {
    anyhow!(err.user_message())
}

/// Non-async helpers
impl Commands {
    /// Ensures that the string slice conforms to C-like identifier regex
    fn is_valid_cmd(s: &str) -> bool {
        s.len() <= MAX_CMD_LENGTH
            && regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$")
                .map(|re| re.is_match(s))
                .unwrap_or(false)
    }

    /// Gets a help string. Should be updated after a new command is added
    pub fn get_help() -> String {
        let t = getenv_call_token();
        format!(
            r#"
**Command List:**
`{t}join`:  Join the leaderboard.
`{t}submit <rating> <seconds> [lap:seconds[:comment] ...]`:  Log a practice session. A JSON body also works.
`{t}leaderboard [score|streak|best|average|sessions] [all|month|week]`:  Show the leaderboard.
`{t}profile [username]`:  Get stats, league and rank for a user.
`{t}history [username]`:  List a user's most recent sessions.
`{t}help`:  Get information on supported commands
"#,
        )
    }
}

/// Get the call token from the environment (.env file), `$` if it isn't set.
pub fn getenv_call_token() -> char {
    let Ok(env_token) = std::env::var("BOT_CALL_TOKEN") else {
        return '$';
    };

    let Some(token) = env_token.chars().next() else {
        log::warn!("$BOT_CALL_TOKEN is empty. Falling back to $");
        return '$';
    };

    if env_token.chars().count() > 1 {
        log::warn!(
            "$BOT_CALL_TOKEN not a single character. Truncating to {}",
            token
        );
    }

    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserAggregate;
    use crate::ranking::Metric;

    fn entry(rank: usize, name: &str, metric: Metric) -> RankedUser {
        RankedUser { rank, metric, user: UserAggregate::new(name) }
    }

    #[test]
    fn command_names() {
        assert!(Commands::is_valid_cmd("leaderboard"));
        assert!(!Commands::is_valid_cmd("9lives"));
        assert!(!Commands::is_valid_cmd("a_very_long_command"));
    }

    #[test]
    fn leaderboard_rendering() {
        let board = vec![entry(1, "alice", Metric::Count(4517)), entry(2, "bob", Metric::Count(10))];
        let text = render_leaderboard(&board, SortBy::TotalScore, TimeRange::Week);

        assert!(text.starts_with("**Leaderboard: Total Score (Last 7 Days)**"));
        assert!(text.contains("`#1` alice (Beginner): 4517"));
        assert!(text.contains("`#2` bob (Beginner): 10"));
    }

    #[test]
    fn averages_keep_a_decimal() {
        let text = render_leaderboard(&[entry(1, "alice", Metric::Mean(12.25))], SortBy::AverageScore, TimeRange::All);
        assert!(text.contains(": 12.2") || text.contains(": 12.3"));
    }

    #[test]
    fn empty_leaderboard_says_so() {
        let text = render_leaderboard(&[], SortBy::MaxStreak, TimeRange::Month);
        assert!(text.contains("Nobody has logged a session yet."));
    }
}
