//! Scripted stand-in for the external binary.
//!
//! Replies are keyed by an argument-vector prefix; the longest matching
//! prefix wins. Several replies queued under one prefix are handed out in
//! order and the last one repeats. Every call is recorded so tests can count
//! invocations.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::exec::runner::{CommandRunner, RawOutput};

type Handler = Arc<dyn Fn(&[String]) -> RawOutput + Send + Sync>;

#[derive(Clone)]
enum Reply {
    Fixed(RawOutput),
    Computed(Handler),
}

struct Rule {
    prefix: Vec<String>,
    replies: VecDeque<Reply>,
}

impl Rule {
    fn matches(&self, args: &[String]) -> bool {
        args.len() >= self.prefix.len() && self.prefix.iter().zip(args).all(|(p, a)| p == a)
    }

    fn next_reply(&mut self) -> Option<Reply> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// Stub [`CommandRunner`] with scripted replies and a call log.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<String>>>,
    cwds: Mutex<Vec<PathBuf>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// reply to `prefix` with a successful exit printing `stdout`
    pub fn on(self, prefix: &[&str], stdout: &str) -> Self {
        self.push(prefix, Reply::Fixed(RawOutput::success(stdout)))
    }

    /// reply to `prefix` with a failing exit
    pub fn on_failure(self, prefix: &[&str], stderr: &str, exit_code: i32) -> Self {
        self.push(prefix, Reply::Fixed(RawOutput::failure(stderr, exit_code)))
    }

    /// compute the reply from the full argument vector
    pub fn on_with<F>(self, prefix: &[&str], handler: F) -> Self
    where
        F: Fn(&[String]) -> RawOutput + Send + Sync + 'static,
    {
        self.push(prefix, Reply::Computed(Arc::new(handler)))
    }

    fn push(mut self, prefix: &[&str], reply: Reply) -> Self {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        let rules = self.rules.get_mut();
        match rules.iter_mut().find(|r| r.prefix == prefix) {
            Some(rule) => rule.replies.push_back(reply),
            None => rules.push(Rule {
                prefix,
                replies: VecDeque::from([reply]),
            }),
        }
        self
    }

    /// every argument vector seen so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// working directory of each call, in call order
    pub fn cwds(&self) -> Vec<PathBuf> {
        self.cwds.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// number of calls whose arguments start with `prefix`
    pub fn calls_to(&self, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.len() >= prefix.len() && prefix.iter().zip(call.iter()).all(|(p, a)| p == a))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, args: &[String], cwd: &Path) -> io::Result<RawOutput> {
        self.calls.lock().push(args.to_vec());
        self.cwds.lock().push(cwd.to_path_buf());

        let reply = {
            let mut rules = self.rules.lock();
            rules
                .iter_mut()
                .filter(|rule| rule.matches(args))
                .max_by_key(|rule| rule.prefix.len())
                .and_then(Rule::next_reply)
        };

        Ok(match reply {
            Some(Reply::Fixed(output)) => output,
            Some(Reply::Computed(handler)) => handler(args),
            None => RawOutput::failure(format!("no scripted reply for `{}`", args.join(" ")), 127),
        })
    }
}

/// temporary directory carrying the repository marker
pub fn scratch_repo() -> io::Result<TempDir> {
    let dir = TempDir::new()?;
    std::fs::create_dir(dir.path().join(".dolt"))?;
    Ok(dir)
}
