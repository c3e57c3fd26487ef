//! The sample functions.

use fnserve::{Context, StreamingResponse, serving};
use std::time::Duration;

/// Pause between spelled characters.
const SPELL_DELAY: Duration = Duration::from_millis(50);

/// Greet someone by name.
#[serving]
pub fn greet(name: &str) -> String {
    format!("hello, {name}")
}

/// Name of the user the call runs as, from `USER`.
#[serving]
pub fn whoami(ctx: &Context) -> String {
    ctx.env("USER").unwrap_or_else(|| "nobody".to_owned())
}

/// Count from one to `n`, one message per number.
#[serving(websocket)]
pub fn count(n: u32) -> impl Iterator<Item = u32> {
    1..=n
}

/// Ask the caller two questions and combine the answers.
#[serving(websocket)]
pub async fn interview(ctx: Context) -> fnserve::Result<String> {
    let name = ctx.ask("what is your name?").await?;
    let colour = ctx
        .ask(format!("{name}, what is your favourite colour?"))
        .await?;
    ctx.println(format!("interviewed {name}"));
    Ok(format!("{name} likes {colour}"))
}

/// Spell `word` one character at a time.
#[serving(websocket)]
pub async fn spell(word: String, ctx: Context) -> fnserve::Result<StreamingResponse> {
    let tokens = ctx.async_streaming_handler();
    for ch in word.chars() {
        tokens.push(ch.to_string()).await?;
        tokio::time::sleep(SPELL_DELAY).await;
    }
    Ok(StreamingResponse)
}
