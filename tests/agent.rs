//! Chat loop behavior with a scripted language model

mod common;

use std::sync::Mutex;

use async_trait::async_trait;
use common::TempDb;
use voice_recall::{
    ChatLoop, Error, LanguageModel, MemoryConfig, MemoryService, ProfileKey, Result, Role,
};

/// Replies with a fixed text and remembers every prompt it saw
struct ScriptedModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Always fails, like an unreachable endpoint
struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::Llm("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_utterance_is_recorded_with_reply() {
    let chat = ChatLoop::new(
        common::setup_service(10, 3),
        ScriptedModel::new("**¡Hola, Ana!** Encantado."),
    );

    let reply = chat
        .handle_utterance("Hola, me llamo Ana")
        .await
        .unwrap()
        .unwrap();
    assert!(!reply.command);
    assert_eq!(reply.spoken, "¡Hola, Ana! Encantado.");

    let turns = chat.memory().store().list_turns(None, None).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "Hola, me llamo Ana");
    assert_eq!(turns[1].role, Role::Assistant);
    // Stored reply keeps the raw model output
    assert_eq!(turns[1].text, "**¡Hola, Ana!** Encantado.");

    let profile = chat.memory().store().get_profile().unwrap();
    assert!(profile.contains_key(&ProfileKey::Name));
}

#[tokio::test]
async fn test_prompt_carries_memory_without_repeating_message() {
    let chat = ChatLoop::new(common::setup_service(10, 3), ScriptedModel::new("Vale."));

    chat.handle_utterance("me llamo Ana").await.unwrap();
    chat.handle_utterance("¿cómo me llamo?").await.unwrap();

    let model_prompts = chat_prompts(&chat);
    assert_eq!(model_prompts.len(), 2);
    assert_eq!(model_prompts[0], "me llamo Ana");

    let second = &model_prompts[1];
    assert!(second.contains("<user-profile>\n- name: Ana\n</user-profile>"));
    assert!(second.contains("<user>\nme llamo Ana\n</user>"));
    assert!(second.ends_with("\n\n¿cómo me llamo?"));
    assert_eq!(second.matches("¿cómo me llamo?").count(), 1);
}

#[tokio::test]
async fn test_commands_skip_the_model() {
    let chat = ChatLoop::new(common::setup_service(10, 3), ScriptedModel::new("Vale."));
    chat.handle_utterance("soy Ana y tengo 25 años").await.unwrap();

    let reply = chat.handle_utterance("Mostrar perfil").await.unwrap().unwrap();
    assert!(reply.command);
    assert_eq!(
        reply.spoken,
        "Lo que sé sobre ti: tu nombre es Ana, tienes 25 años."
    );

    let reply = chat.handle_utterance("borrar memoria").await.unwrap().unwrap();
    assert!(reply.command);
    assert_eq!(
        reply.spoken,
        "He borrado la memoria de nuestra conversación. Empezamos de nuevo."
    );

    assert_eq!(chat_prompts(&chat).len(), 1);
    assert_eq!(chat.memory().stats().unwrap().turns, 0);
    assert_eq!(chat.memory().stats().unwrap().profile_attributes, 0);
}

#[tokio::test]
async fn test_blank_utterance_is_ignored() {
    let chat = ChatLoop::new(common::setup_service(10, 3), ScriptedModel::new("Vale."));

    assert!(chat.handle_utterance("   ").await.unwrap().is_none());
    assert!(chat_prompts(&chat).is_empty());
    assert_eq!(chat.memory().store().turn_count().unwrap(), 0);
}

#[tokio::test]
async fn test_storage_failure_degrades_instead_of_stopping() {
    let db = TempDb::new();
    let service = MemoryService::new(db.open(), MemoryConfig::default()).unwrap();
    service.ingest(Role::User, "me llamo Ana").unwrap();

    // Break the turn log underneath the running service
    let conn = rusqlite::Connection::open(&db.path).unwrap();
    conn.execute_batch("DROP TABLE turns;").unwrap();
    drop(conn);

    let chat = ChatLoop::new(service, ScriptedModel::new("Sigo aquí."));

    let reply = chat.handle_utterance("¿sigues ahí?").await.unwrap().unwrap();
    assert_eq!(reply.spoken, "Sigo aquí.");
    assert_eq!(chat_prompts(&chat), vec!["¿sigues ahí?".to_string()]);

    // Commands that need the store answer with an apology
    let reply = chat.handle_utterance("borrar conversación").await.unwrap().unwrap();
    assert!(reply.command);
    assert!(reply.spoken.starts_with("Lo siento"));

    // Store errors are reported as storage failures
    let err = chat.memory().ingest(Role::User, "hola").unwrap_err();
    assert!(err.is_storage());
}

#[tokio::test]
async fn test_model_failure_is_reported_and_user_turn_kept() {
    let chat = ChatLoop::new(common::setup_service(10, 3), FailingModel);

    let err = chat.handle_utterance("hola").await.unwrap_err();
    assert!(matches!(err, Error::Llm(_)));

    let turns = chat.memory().store().list_turns(None, None).unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
}

fn chat_prompts(chat: &ChatLoop<ScriptedModel>) -> Vec<String> {
    chat.model().prompts()
}
