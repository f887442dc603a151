//! Логи инференса: человекочитаемый fmt или JSON-строки.
//!
//! Both sinks write to stderr, stdout stays the result channel. In JSON mode
//! every line carries the process context and, when emitted inside a
//! [`RequestContext::span`], the request id and operation of that span.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Имя поля, по которому события связываются с запросом
pub const REQUEST_ID_FIELD: &str = "request_id";

/// Контекст процесса и запроса для одной JSON-строки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub request_id: Option<String>,
    /// Операция запроса (`recommend`, ...)
    pub operation: Option<String>,
    pub app_version: String,
    pub hostname: String,
    pub pid: u32,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            request_id: None,
            operation: None,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
        }
    }
}

impl ExecutionContext {
    /// Process part is resolved once, hostname lookups are not free
    fn process() -> &'static ExecutionContext {
        static PROCESS: OnceLock<ExecutionContext> = OnceLock::new();
        PROCESS.get_or_init(ExecutionContext::default)
    }
}

/// Одна строка JSON-лога
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
    pub context: ExecutionContext,
}

/// Request id and operation recorded on a request span
#[derive(Debug, Clone)]
struct RequestScope {
    request_id: String,
    operation: Option<String>,
}

/// JSON layer. One line per event, written through `W`.
pub struct JsonLayer<W = fn() -> io::Stderr> {
    make_writer: W,
}

impl JsonLayer {
    pub fn stderr() -> Self {
        Self::new(io::stderr)
    }
}

impl<W> JsonLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    pub fn new(make_writer: W) -> Self {
        Self { make_writer }
    }

    fn line<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> LogLine
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        // ближайший request-span, событие может переопределить request_id
        let scope = ctx.event_scope(event).and_then(|spans| {
            spans.into_iter().find_map(|span| {
                let extensions = span.extensions();
                extensions.get::<RequestScope>().cloned()
            })
        });
        let own_id = match visitor.fields.remove(REQUEST_ID_FIELD) {
            Some(Value::String(id)) => Some(id),
            Some(other) => Some(other.to_string()),
            None => None,
        };

        let mut context = ExecutionContext::process().clone();
        context.request_id = own_id.or_else(|| scope.as_ref().map(|s| s.request_id.clone()));
        context.operation = scope.and_then(|s| s.operation);

        let duration_ms = visitor.fields.remove("duration_ms").and_then(|v| v.as_u64());
        let metadata = event.metadata();
        LogLine {
            timestamp: Utc::now().to_rfc3339(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            duration_ms,
            fields: visitor.fields,
            context,
        }
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        let Some(request_id) = visitor.fields.remove(REQUEST_ID_FIELD) else {
            return;
        };
        let request_id = match request_id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        let operation = visitor
            .fields
            .remove("operation")
            .and_then(|v| v.as_str().map(str::to_string));

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(RequestScope {
                request_id,
                operation,
            });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let line = self.line(event, &ctx);
        if let Ok(json) = serde_json::to_string(&line) {
            let mut writer = self.make_writer.make_writer();
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            ("message", Value::String(text)) => self.message = Some(text),
            (name, value) => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }
}

/// Конфигурация логирования
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json_output: bool,
    /// Только для fmt-вывода
    pub color_output: bool,
    pub include_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            json_output: false,
            color_output: true,
            include_line_numbers: cfg!(debug_assertions),
        }
    }
}

/// Инициализировать глобальный subscriber.
///
/// `RUST_LOG` имеет приоритет над `config.level`. Request spans are INFO, so
/// at WARN and below JSON lines carry no request id.
pub fn init_structured_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    if config.json_output {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(JsonLayer::stderr());
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_line_number(config.include_line_numbers)
            .with_ansi(config.color_output)
            .with_span_events(FmtSpan::CLOSE);
        let subscriber = Registry::default().with(env_filter).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Замер одной стадии пайплайна
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
    items: Option<u64>,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
            items: None,
        }
    }

    /// Сколько элементов обработала стадия (узлы графа, логиты)
    pub fn set_items(&mut self, items: usize) {
        self.items = Some(items as u64);
    }

    /// Logs the stage at DEBUG and returns its duration in ms
    pub fn finish(self) -> u64 {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        tracing::debug!(
            operation = self.operation,
            duration_ms,
            items_count = self.items,
            "Stage completed"
        );
        duration_ms
    }

    pub fn finish_with_result<T, E: std::fmt::Display>(self, result: &Result<T, E>) -> u64 {
        match result {
            Ok(_) => self.finish(),
            Err(e) => {
                let duration_ms = self.start.elapsed().as_millis() as u64;
                tracing::error!(
                    operation = self.operation,
                    duration_ms,
                    error = %e,
                    "Stage failed"
                );
                duration_ms
            }
        }
    }
}

/// Контекст одного запроса на рекомендацию
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub start_time: Instant,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            start_time: Instant::now(),
        }
    }

    /// Span, к которому привязываются все события запроса
    pub fn span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!("request", operation, request_id = %self.request_id)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_skips_empty_parts() {
        let line = LogLine {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            level: "INFO".to_string(),
            target: "recommender::pipeline".to_string(),
            message: "Top-5 extracted".to_string(),
            duration_ms: None,
            fields: Map::new(),
            context: ExecutionContext::default(),
        };

        let json = serde_json::to_value(&line).unwrap();
        assert!(json.get("duration_ms").is_none());
        assert!(json.get("fields").is_none());
        assert_eq!(json["context"]["request_id"], Value::Null);
        assert_eq!(json["context"]["pid"], std::process::id());
    }

    #[test]
    fn test_operation_timer_reports_duration() {
        let mut timer = OperationTimer::new("encode_graph");
        timer.set_items(3);

        std::thread::sleep(std::time::Duration::from_millis(5));

        assert!(timer.finish() >= 5);
    }

    #[test]
    fn test_failed_stage_still_reports_duration() {
        let timer = OperationTimer::new("load_scorer");
        let result: Result<(), String> = Err("model not found".to_string());
        std::thread::sleep(std::time::Duration::from_millis(2));

        assert!(timer.finish_with_result(&result) >= 2);
    }
}
