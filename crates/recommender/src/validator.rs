//! Sequence validation with fuzzy fallback.
//!
//! Validation is a resumable session: [`ValidationSession::advance`] walks the
//! tokens and stops at the first unknown one, handing a
//! [`DisambiguationRequest`] back to the caller. The caller answers with
//! [`ValidationSession::resolve`]. Any abort abandons the whole sequence.

use crate::catalog::ToolCatalog;
use crate::errors::SelectionError;
use crate::similarity;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Сколько кандидатов показывать по умолчанию
pub const CANDIDATES_TO_SHOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOptions {
    /// Число кандидатов в запросе на уточнение
    pub candidates_to_show: usize,
    /// Спрашивать пользователя или сразу отказываться от запроса
    pub match_interactively: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            candidates_to_show: CANDIDATES_TO_SHOW,
            match_interactively: true,
        }
    }
}

/// Кандидат на замену неизвестного токена
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub score: u8,
}

/// Ranks every catalog name against `token` in one pass.
///
/// Descending by score; the sort is stable, so equal scores keep catalog order.
pub fn rank_candidates(token: &str, catalog: &ToolCatalog) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = catalog
        .names()
        .map(|name| Candidate {
            name: name.to_string(),
            score: similarity::ratio(name, token),
        })
        .collect();
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Запрос на уточнение неизвестного токена
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisambiguationRequest {
    /// Исходный (обрезанный) токен
    pub token: String,
    /// Позиция токена в последовательности
    pub position: usize,
    /// Кандидаты; пользователь видит их с номерами от 1
    pub candidates: Vec<Candidate>,
}

impl DisambiguationRequest {
    pub fn shown(&self) -> usize {
        self.candidates.len()
    }
}

/// Ответ пользователя на запрос
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// `0`: отказаться от всего запроса
    Abort,
    /// Номер кандидата, начиная с 1
    Candidate(usize),
}

impl Selection {
    /// Parses console input against `shown` candidates
    pub fn parse(input: &str, shown: usize) -> Result<Self, SelectionError> {
        let trimmed = input.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| SelectionError::NotANumber(trimmed.to_string()))?;

        match value {
            0 => Ok(Selection::Abort),
            n if n > 0 && (n as u64) <= shown as u64 => Ok(Selection::Candidate(n as usize)),
            n => Err(SelectionError::OutOfRange { selection: n, shown }),
        }
    }
}

/// Результат очередного шага валидации
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStep {
    /// Все токены разрешены; пустой список для пустого ввода
    Complete(Vec<String>),
    /// Нужен выбор пользователя
    NeedsSelection(DisambiguationRequest),
    /// Запрос отменён целиком
    Abandoned,
}

pub struct SequenceValidator<'c> {
    catalog: &'c ToolCatalog,
    options: ValidatorOptions,
}

impl<'c> SequenceValidator<'c> {
    pub fn new(catalog: &'c ToolCatalog, options: ValidatorOptions) -> Self {
        Self { catalog, options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Начать сессию валидации; токены обрезаются по пробелам
    pub fn start<S: AsRef<str>>(&self, tokens: &[S]) -> ValidationSession<'c> {
        ValidationSession {
            catalog: self.catalog,
            options: self.options,
            tokens: tokens.iter().map(|t| t.as_ref().trim().to_string()).collect(),
            resolved: Vec::with_capacity(tokens.len()),
            pending: None,
            outcome: None,
        }
    }

    /// Non-interactive shortcut: exact matches only, otherwise empty
    pub fn validate_exact<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        let mut session = self.start(tokens);
        match session.advance() {
            ValidationStep::Complete(names) => names,
            ValidationStep::NeedsSelection(_) | ValidationStep::Abandoned => Vec::new(),
        }
    }
}

/// Состояние валидации одной последовательности
pub struct ValidationSession<'c> {
    catalog: &'c ToolCatalog,
    options: ValidatorOptions,
    tokens: Vec<String>,
    resolved: Vec<String>,
    pending: Option<DisambiguationRequest>,
    /// Итог сессии; повторный `advance` возвращает его же
    outcome: Option<ValidationStep>,
}

impl<'c> ValidationSession<'c> {
    /// Resolves tokens until the sequence is complete, abandoned, or an
    /// unknown token needs a decision.
    ///
    /// Once the session has finished, further calls return the same final step.
    pub fn advance(&mut self) -> ValidationStep {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        if let Some(request) = &self.pending {
            return ValidationStep::NeedsSelection(request.clone());
        }
        if self.tokens.is_empty() {
            info!("No sequence provided");
            return self.finish(ValidationStep::Complete(Vec::new()));
        }

        while self.resolved.len() < self.tokens.len() {
            let position = self.resolved.len();
            let token = &self.tokens[position];

            if self.catalog.contains(token) {
                self.resolved.push(token.clone());
                continue;
            }

            let candidates: Vec<Candidate> = rank_candidates(token, self.catalog)
                .into_iter()
                .take(self.options.candidates_to_show)
                .collect();
            debug!(
                token = %token,
                best = ?candidates.first(),
                "Tool not found in catalog"
            );

            if !self.options.match_interactively || candidates.is_empty() {
                warn!(token = %token, "Unresolved tool, abandoning sequence");
                return self.abandon();
            }

            let request = DisambiguationRequest {
                token: token.clone(),
                position,
                candidates,
            };
            self.pending = Some(request.clone());
            return ValidationStep::NeedsSelection(request);
        }

        let names = self.resolved.clone();
        self.finish(ValidationStep::Complete(names))
    }

    /// Answers the pending request.
    ///
    /// Out-of-range selections leave the session untouched so the caller can
    /// ask again.
    pub fn resolve(&mut self, selection: Selection) -> Result<ValidationStep, SelectionError> {
        let request = self.pending.as_ref().ok_or(SelectionError::NothingPending)?;

        match selection {
            Selection::Abort => {
                info!(token = %request.token, "Sequence abandoned by user");
                self.pending = None;
                Ok(self.abandon())
            }
            Selection::Candidate(n) if n >= 1 && n <= request.shown() => {
                let chosen = request.candidates[n - 1].name.clone();
                debug!(token = %request.token, chosen = %chosen, "Substituted unresolved tool");
                self.resolved.push(chosen);
                self.pending = None;
                Ok(self.advance())
            }
            Selection::Candidate(n) => Err(SelectionError::OutOfRange {
                selection: n as i64,
                shown: request.shown(),
            }),
        }
    }

    /// Запрос, ожидающий ответа, если есть
    pub fn pending(&self) -> Option<&DisambiguationRequest> {
        self.pending.as_ref()
    }

    fn abandon(&mut self) -> ValidationStep {
        self.resolved.clear();
        self.finish(ValidationStep::Abandoned)
    }

    fn finish(&mut self, step: ValidationStep) -> ValidationStep {
        self.outcome = Some(step.clone());
        step
    }
}

/// Blocking source of user selections (console, scripted input, ...)
pub trait SelectionPrompt {
    /// Show `request` and return the raw answer; `retry` carries the reason
    /// the previous answer was rejected. `None` means input is closed.
    fn select(
        &mut self,
        request: &DisambiguationRequest,
        retry: Option<&SelectionError>,
    ) -> Option<String>;
}

/// Drives a session to completion, re-prompting on malformed answers.
///
/// Returns the resolved names, or an empty vec when the sequence is abandoned
/// (unknown token in non-interactive mode, `0`, or closed input).
pub fn validate_with_prompt<S: AsRef<str>>(
    validator: &SequenceValidator<'_>,
    tokens: &[S],
    prompt: &mut dyn SelectionPrompt,
) -> Vec<String> {
    let mut session = validator.start(tokens);
    let mut step = session.advance();

    loop {
        let request = match step {
            ValidationStep::Complete(names) => return names,
            ValidationStep::Abandoned => return Vec::new(),
            ValidationStep::NeedsSelection(request) => request,
        };

        let mut retry: Option<SelectionError> = None;
        step = loop {
            let Some(answer) = prompt.select(&request, retry.as_ref()) else {
                warn!("Selection input closed, abandoning sequence");
                break match session.resolve(Selection::Abort) {
                    Ok(step) => step,
                    Err(_) => ValidationStep::Abandoned,
                };
            };

            match Selection::parse(&answer, request.shown()).and_then(|s| session.resolve(s)) {
                Ok(next) => break next,
                Err(e) => {
                    debug!(error = %e, "Invalid selection, asking again");
                    retry = Some(e);
                }
            }
        };
    }
}

/// One-call validation of a raw sequence against `catalog`
pub fn validate_sequence<S: AsRef<str>>(
    catalog: &ToolCatalog,
    tokens: &[S],
    options: ValidatorOptions,
    prompt: &mut dyn SelectionPrompt,
) -> Vec<String> {
    validate_with_prompt(&SequenceValidator::new(catalog, options), tokens, prompt)
}
