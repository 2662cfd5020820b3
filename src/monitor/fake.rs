//! Scripted in-memory repository for monitor tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::git::{CommitHash, GitError, Repository, SignatureStatus};

/// A repository call recorded by [`ScriptedRepo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Head,
    Author,
    Signature,
    Remote(String),
    Sign,
}

struct State {
    head: String,
    pending_heads: VecDeque<Result<String, String>>,
    author: Result<String, String>,
    signature: Result<SignatureStatus, String>,
    on_remote: Result<bool, String>,
    sign: Result<(), String>,
    panic_on_author: bool,
    calls: Vec<Call>,
}

fn failed(command: &str, stderr: &str) -> GitError {
    GitError::CommandFailed {
        command: command.to_string(),
        stderr: stderr.to_string(),
    }
}

/// Repository whose answers are set up front and whose calls are recorded
#[derive(Clone)]
pub struct ScriptedRepo {
    state: Arc<Mutex<State>>,
}

impl ScriptedRepo {
    /// HEAD at `head`; the latest commit is by Alice, unsigned and unpublished
    pub fn new(head: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                head: head.to_string(),
                pending_heads: VecDeque::new(),
                author: Ok("Alice".to_string()),
                signature: Ok(SignatureStatus::None),
                on_remote: Ok(false),
                sign: Ok(()),
                panic_on_author: false,
                calls: Vec::new(),
            })),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Move HEAD; subsequent head queries return `head`
    pub fn set_head(&self, head: &str) {
        self.with_state(|s| s.head = head.to_string());
    }

    /// Queue a one-shot head query result ahead of the current HEAD
    pub fn push_head(&self, head: Result<&str, &str>) {
        self.with_state(|s| {
            s.pending_heads
                .push_back(head.map(str::to_string).map_err(str::to_string))
        });
    }

    pub fn set_author(&self, author: Result<&str, &str>) {
        self.with_state(|s| s.author = author.map(str::to_string).map_err(str::to_string));
    }

    pub fn set_signature(&self, status: Result<SignatureStatus, &str>) {
        self.with_state(|s| s.signature = status.map_err(str::to_string));
    }

    pub fn set_on_remote(&self, on_remote: Result<bool, &str>) {
        self.with_state(|s| s.on_remote = on_remote.map_err(str::to_string));
    }

    pub fn set_sign(&self, result: Result<(), &str>) {
        self.with_state(|s| s.sign = result.map_err(str::to_string));
    }

    pub fn set_panic_on_author(&self, panic: bool) {
        self.with_state(|s| s.panic_on_author = panic);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn count(&self, call: &Call) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| *c == call).count())
    }

    pub fn sign_count(&self) -> usize {
        self.count(&Call::Sign)
    }
}

#[async_trait]
impl Repository for ScriptedRepo {
    async fn head_hash(&self) -> Result<CommitHash, GitError> {
        self.with_state(|s| {
            s.calls.push(Call::Head);
            match s.pending_heads.pop_front() {
                Some(Ok(head)) => {
                    s.head = head.clone();
                    Ok(CommitHash::new(head))
                }
                Some(Err(e)) => Err(failed("rev-parse HEAD", &e)),
                None => Ok(CommitHash::new(s.head.clone())),
            }
        })
    }

    async fn last_commit_author(&self) -> Result<String, GitError> {
        let (author, panic) = self.with_state(|s| {
            s.calls.push(Call::Author);
            (s.author.clone(), s.panic_on_author)
        });
        if panic {
            panic!("author query exploded");
        }
        author.map_err(|e| failed("log -1 --pretty=format:%an", &e))
    }

    async fn last_commit_signature(&self) -> Result<SignatureStatus, GitError> {
        self.with_state(|s| {
            s.calls.push(Call::Signature);
            s.signature
                .clone()
                .map_err(|e| failed("log -1 --pretty=format:%G?", &e))
        })
    }

    async fn is_on_remote_branch(&self, hash: &CommitHash) -> Result<bool, GitError> {
        self.with_state(|s| {
            s.calls.push(Call::Remote(hash.to_string()));
            s.on_remote.clone().map_err(|e| failed("branch --remote --contains", &e))
        })
    }

    async fn sign_amend_last_commit(&self) -> Result<(), GitError> {
        self.with_state(|s| {
            s.calls.push(Call::Sign);
            s.sign.clone().map_err(GitError::SignRejected)
        })
    }
}
