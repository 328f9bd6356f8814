//! Scripted judge for tests.

use aif_core::{AifError, JudgeClient, JudgeRequest, JudgeResponse, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// A [`JudgeClient`] that replays queued outcomes in order.
///
/// Once the queue is empty the last outcome repeats, so a single
/// `with_failure` models a judge that is down for good. Every request is
/// recorded for inspection.
pub struct ScriptedJudge {
    model: String,
    script: Mutex<VecDeque<Result<JudgeResponse>>>,
    last: Mutex<Option<Result<JudgeResponse>>>,
    requests: Mutex<Vec<JudgeRequest>>,
}

impl ScriptedJudge {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.with_response(JudgeResponse::new(text))
    }

    #[must_use]
    pub fn with_response(self, response: JudgeResponse) -> Self {
        self.push(Ok(response));
        self
    }

    #[must_use]
    pub fn with_failure(self, error: AifError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, outcome: Result<JudgeResponse>) {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(outcome);
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn requests(&self) -> Vec<JudgeRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl JudgeClient for ScriptedJudge {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn call(&self, request: JudgeRequest) -> Result<JudgeResponse> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);

        let next = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(AifError::unknown("scripted judge has no replies"))),
        }
    }
}
