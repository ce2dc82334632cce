//! JSONL tracing layer.
//!
//! Writes one [`LogRecord`] per event to stderr. `run_id`, `snapshot` and
//! `stage` are promoted to top-level keys whether they were set on an
//! enclosing span or on the event itself (innermost wins).

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::LogRecord;

const CONTEXT_KEYS: [&str; 3] = ["run_id", "snapshot", "stage"];

/// Field values of one span or event, as JSON.
#[derive(Debug, Clone, Default)]
struct Fields(Map<String, Value>);

impl Fields {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }

    fn take_str(&mut self, key: &str) -> Option<String> {
        match self.0.remove(key)? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON form.
        let value = serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.put(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }
}

/// Context keys captured from a span at creation.
#[derive(Debug, Clone, Default)]
struct SpanKeys(Map<String, Value>);

pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        fields.0.retain(|k, _| CONTEXT_KEYS.contains(&k.as_str()));
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanKeys(fields.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = Fields::default();

        // Root first so inner spans overwrite outer ones.
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(keys) = span.extensions().get::<SpanKeys>() {
                    fields.0.extend(keys.0.clone());
                }
            }
        }
        event.record(&mut fields);

        let meta = event.metadata();
        let record = LogRecord {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: meta.level().as_str().to_ascii_lowercase(),
            event: meta.target().to_string(),
            run_id: fields.take_str("run_id"),
            snapshot: fields.take_str("snapshot"),
            stage: fields.take_str("stage"),
            message: fields.take_str("message"),
            fields: fields.0,
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", record.to_jsonl());
        }
    }
}
