use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::language;
use crate::translator::{DeepLClient, Translate};

const WELCOME: &str = "\u{1F44B} Hello! I'm your Portuguese-English translator bot!\n\n\
    I will automatically translate:\n\
    \u{1F1EC}\u{1F1E7} English messages to Portuguese \u{1F1F5}\u{1F1F9}\n\
    \u{1F1F5}\u{1F1F9} Portuguese messages to English \u{1F1EC}\u{1F1E7}\n\n\
    Just start typing in either language!";

/// Shared application state
pub struct AppState {
    config: Config,
    translator: DeepLClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let translator = DeepLClient::new(config.deepl.clone())?;
        Ok(Self { config, translator })
    }

    pub fn translator(&self) -> &DeepLClient {
        &self.translator
    }
}

/// Start the Telegram bot
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bot = Bot::new(&state.config.telegram.bot_token);

    info!("Starting Telegram bot...");

    let handler = Update::filter_message()
        .filter_map(|msg: Message| {
            // Ignore messages sent by other bots
            let user = msg.from.as_ref()?;
            if user.is_bot {
                None
            } else {
                Some(msg)
            }
        })
        .endpoint(handle_message);

    // Skip any backlog accumulated while the bot was offline
    let listener = Polling::builder(bot.clone())
        .drop_pending_updates()
        .build();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("bot"))
        .build()
        .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("polling"))
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    if text == "/start" || text.starts_with("/start@") {
        bot.send_message(msg.chat.id, WELCOME).await?;
        return Ok(());
    }

    // Commands are never fed to the translator
    if is_command(&text) {
        return Ok(());
    }

    info!("Message in chat {}: {}", msg.chat.id, text);

    let reply = match build_reply(&state.translator, &text).await {
        Some(reply) => reply,
        None => return Ok(()),
    };

    for chunk in split_message(&reply, 4000) {
        if let Err(e) = bot.send_message(msg.chat.id, chunk).await {
            // Terminal for this message; the dispatcher keeps serving
            error!("Failed to send reply to chat {}: {}", msg.chat.id, e);
            break;
        }
    }

    Ok(())
}

/// The relay chain for one message: normalize, detect, translate, format.
///
/// Returns `None` whenever no reply should be sent: blank text, a language
/// outside the English/Portuguese pair, a failed translation call, or a
/// translation that merely echoes the input.
async fn build_reply<T: Translate>(translator: &T, text: &str) -> Option<String> {
    let cleaned = language::normalize(text)?;
    let source = language::detect(&cleaned)?;
    let target = source.target();

    let translation = match translator.translate(&cleaned, target).await {
        Ok(t) => t,
        Err(e) => {
            error!("Translation to {} failed: {:#}", target, e);
            return None;
        }
    };

    debug!(
        "DeepL reported source language {} (target {})",
        translation.detected_source_language, target
    );

    // The API echoes text it cannot translate; don't repost the original
    if translation.text.to_lowercase() == cleaned.to_lowercase() {
        return None;
    }

    Some(format!("{} {}", target.flag(), translation.text))
}

/// Telegram commands, including the `/cmd@botname` form used in groups
fn is_command(text: &str) -> bool {
    text.starts_with('/')
}

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::translator::Translation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const ENGLISH_INPUT: &str = "Hello, how are you?";
    const PORTUGUESE_INPUT: &str = "Bom dia!";
    const RUSSIAN_INPUT: &str = "Доброе утро, как у тебя дела сегодня? Надеюсь, всё хорошо.";

    /// Test double that records requested targets and can fail on demand.
    struct MockTranslator {
        response: String,
        failures_remaining: AtomicUsize,
        calls: Mutex<Vec<Language>>,
    }

    impl MockTranslator {
        fn replying(response: &str) -> Self {
            Self {
                response: response.to_string(),
                failures_remaining: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_once(response: &str) -> Self {
            let mock = Self::replying(response);
            mock.failures_remaining.store(1, Ordering::SeqCst);
            mock
        }

        fn targets(&self) -> Vec<Language> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Translate for MockTranslator {
        async fn translate(&self, _text: &str, target: Language) -> Result<Translation> {
            self.calls.lock().unwrap().push(target);
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                anyhow::bail!("DeepL API error (403 Forbidden): invalid auth key");
            }
            Ok(Translation {
                text: self.response.clone(),
                detected_source_language: "XX".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn english_is_translated_to_portuguese() {
        let translator = MockTranslator::replying("Olá, como está?");
        let reply = build_reply(&translator, ENGLISH_INPUT).await;

        assert_eq!(translator.targets(), vec![Language::Portuguese]);
        let reply = reply.expect("expected a reply");
        assert!(reply.starts_with(Language::Portuguese.flag()));
        assert!(reply.contains("Olá, como está?"));
    }

    #[tokio::test]
    async fn portuguese_is_translated_to_english() {
        let translator = MockTranslator::replying("Good morning!");
        let reply = build_reply(&translator, PORTUGUESE_INPUT).await;

        assert_eq!(translator.targets(), vec![Language::English]);
        let reply = reply.expect("expected a reply");
        assert!(reply.starts_with(Language::English.flag()));
        assert!(reply.contains("Good morning!"));
    }

    #[tokio::test]
    async fn unknown_language_is_left_alone() {
        let translator = MockTranslator::replying("should never be used");
        let reply = build_reply(&translator, RUSSIAN_INPUT).await;

        assert_eq!(reply, None);
        assert!(translator.targets().is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_left_alone() {
        let translator = MockTranslator::replying("should never be used");
        assert_eq!(build_reply(&translator, "   \n\t ").await, None);
        assert!(translator.targets().is_empty());
    }

    #[test]
    fn commands_are_recognized() {
        assert!(is_command("/help"));
        assert!(is_command("/start@some_bot"));
        assert!(is_command("/clear"));
        assert!(!is_command("hello / world"));
        assert!(!is_command("Bom dia!"));
    }

    #[tokio::test]
    async fn translation_failure_drops_message_only() {
        let translator = MockTranslator::failing_once("Olá, como está?");

        // First message fails, no reply
        assert_eq!(build_reply(&translator, ENGLISH_INPUT).await, None);

        // The relay stays available for the next message
        let reply = build_reply(&translator, ENGLISH_INPUT).await;
        assert!(reply.is_some());
        assert_eq!(translator.targets().len(), 2);
    }

    #[tokio::test]
    async fn echoed_translation_is_suppressed() {
        // The service returning the input unchanged means it had nothing to do
        let translator = MockTranslator::replying(ENGLISH_INPUT);
        assert_eq!(build_reply(&translator, ENGLISH_INPUT).await, None);
    }

    #[test]
    fn split_message_short_text_is_untouched() {
        let chunks = split_message("hello world", 4000);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn split_message_prefers_word_boundaries() {
        let text = "aaaa bbbb cccc dddd";
        let chunks = split_message(text, 10);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.len() <= 10);
        }
    }

    #[test]
    fn split_message_respects_utf8_boundaries() {
        let text = "ã".repeat(30);
        let chunks = split_message(&text, 7);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.len() <= 7);
        }
    }
}
