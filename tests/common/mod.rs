//! Shared stubs for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use multitool::agent::{Action, ActionChooser, Transcript};
use multitool::auth::{AuthSession, Identity, IdentityProvider};
use multitool::config::{Prompts, Settings};
use multitool::embedding::Embedder;
use multitool::llm::{ChatMessage, Completer};
use multitool::orchestrator::Orchestrator;
use multitool::tools::{SearchProvider, ToolRegistry};
use multitool::{MultitoolError, Result};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const KEYWORDS: [&str; 4] = ["rust", "python", "ocean", "mountain"];

/// Embeds text as keyword counts.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

/// Replies with the last user message, so answers quote their context.
pub struct EchoCompleter;

#[async_trait]
impl Completer for EchoCompleter {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(messages
            .last()
            .map(|m| format!("Based on the document: {}", m.content))
            .unwrap_or_default())
    }
}

pub struct FixedSearch(pub &'static str);

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(&self, _query: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Replays a script of actions, then repeats `fallback` forever.
pub struct ScriptedChooser {
    script: Mutex<VecDeque<Action>>,
    fallback: Action,
    pub calls: Mutex<usize>,
}

impl ScriptedChooser {
    pub fn new(script: Vec<Action>, fallback: Action) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ActionChooser for ScriptedChooser {
    async fn choose_action(&self, _transcript: &Transcript, _tools: &ToolRegistry) -> Result<Action> {
        *self.calls.lock().unwrap() += 1;
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    async fn conclude(&self, _transcript: &Transcript) -> Result<String> {
        Ok("Here is what I found so far.".to_string())
    }
}

pub fn use_tool(tool: &str, input: &str) -> Action {
    Action::UseTool {
        tool: tool.to_string(),
        input: input.to_string(),
    }
}

/// In-memory accounts. Tokens are `token-<user id>`.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, (String, String)>>,
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        if password.len() < 6 {
            return Err(MultitoolError::AccountRejected("WEAK_PASSWORD".to_string()));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(MultitoolError::AccountRejected("EMAIL_EXISTS".to_string()));
        }
        let user_id = format!("user{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (password.to_string(), user_id.clone()));
        Ok(AuthSession {
            id_token: format!("token-{}", user_id),
            user_id,
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((stored, user_id)) if stored == password => Ok(AuthSession {
                id_token: format!("token-{}", user_id),
                user_id: user_id.clone(),
                email: email.to_string(),
            }),
            _ => Err(MultitoolError::AuthInvalid("INVALID_LOGIN_CREDENTIALS".to_string())),
        }
    }

    async fn verify_token(&self, id_token: &str) -> Result<Identity> {
        let accounts = self.accounts.lock().unwrap();
        let user_id = id_token
            .strip_prefix("token-")
            .ok_or_else(|| MultitoolError::AuthInvalid("INVALID_ID_TOKEN".to_string()))?;
        accounts
            .iter()
            .find(|(_, (_, id))| id == user_id)
            .map(|(email, (_, id))| Identity {
                user_id: id.clone(),
                email: Some(email.clone()),
            })
            .ok_or_else(|| MultitoolError::AuthInvalid("INVALID_ID_TOKEN".to_string()))
    }
}

/// Settings with the index stored under `dir`.
pub fn test_settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.general.data_dir = dir.display().to_string();
    settings.index.path = dir.join("index.db").display().to_string();
    settings
}

/// Orchestrator wired to the keyword embedder and the echo completer.
pub fn orchestrator(dir: &Path) -> Orchestrator {
    Orchestrator::with_components(
        test_settings(dir),
        Prompts::default(),
        Arc::new(KeywordEmbedder),
        Arc::new(EchoCompleter),
    )
    .unwrap()
}

/// Write a PDF with one page per entry of `pages`.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}
