//! Structured Logging with Sensitive Data Redaction
//!
//! The engine never logs through globals. Callers inject a [`TraceSink`];
//! [`TracingSink`] forwards to the `tracing` crate, [`NoopSink`] drops
//! everything and [`MemorySink`] keeps entries for inspection.
//!
//! Field values are redacted by key before they reach any sink:
//! - secrets (keys, seeds, passwords) are fully replaced
//! - addresses keep a short prefix and suffix
//! - hashes keep a longer prefix and suffix

use std::fmt;
use std::sync::Mutex;

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn debug(module: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, module, message)
    }

    pub fn info(module: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, module, message)
    }

    pub fn warn(module: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, module, message)
    }

    pub fn error(module: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, module, message)
    }

    /// Add a field to the log entry (auto-redacts sensitive data)
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value_str = value.to_string();
        let redacted = redact_if_sensitive(key, &value_str);
        self.fields.push((key, redacted));
        self
    }

    /// Add a field with explicit redaction
    pub fn redacted_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_value(&value.to_string());
        self.fields.push((key, redacted));
        self
    }

    /// Add an address field (partial redaction)
    pub fn address_field(mut self, key: &'static str, address: &str) -> Self {
        let redacted = redact_address(address);
        self.fields.push((key, redacted));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `key=value` pairs joined by spaces
    pub fn fields_string(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn record(self, sink: &dyn TraceSink) {
        sink.record(&self);
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.level, self.module, self.message)?;
        if !self.fields.is_empty() {
            write!(f, " | {}", self.fields_string())?;
        }
        Ok(())
    }
}

/// Destination for engine log entries
pub trait TraceSink: Send + Sync {
    fn record(&self, entry: &LogEntry);
}

/// Forwards entries to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, entry: &LogEntry) {
        let fields = entry.fields_string();
        match entry.level {
            LogLevel::Debug => tracing::event!(
                tracing::Level::DEBUG,
                module = entry.module,
                fields = %fields,
                "{}",
                entry.message
            ),
            LogLevel::Info => tracing::event!(
                tracing::Level::INFO,
                module = entry.module,
                fields = %fields,
                "{}",
                entry.message
            ),
            LogLevel::Warn => tracing::event!(
                tracing::Level::WARN,
                module = entry.module,
                fields = %fields,
                "{}",
                entry.message
            ),
            LogLevel::Error => tracing::event!(
                tracing::Level::ERROR,
                module = entry.module,
                fields = %fields,
                "{}",
                entry.message
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn record(&self, _entry: &LogEntry) {}
}

/// Keeps every entry; meant for tests
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }
}

impl TraceSink for MemorySink {
    fn record(&self, entry: &LogEntry) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(entry.clone());
    }
}

/// Redact a value if the key suggests it's sensitive
fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();

    // Keys that should always be fully redacted
    let fully_redacted_keys = [
        "private_key", "privatekey", "secret", "seed_phrase", "mnemonic",
        "password", "passphrase", "wif", "private",
    ];

    for sensitive_key in &fully_redacted_keys {
        if key_lower.contains(sensitive_key) {
            return redact_value(value);
        }
    }

    // Keys that should be partially redacted (addresses)
    let address_keys = ["address", "recipient", "sender", "destination", "source"];
    if key_lower == "to" || key_lower == "from" || address_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_address(value);
    }

    // Keys with transaction hashes - show partial
    let hash_keys = ["txid", "tx_hash", "hash", "txhash"];
    for hash_key in &hash_keys {
        if key_lower.contains(hash_key) {
            return redact_hash(value);
        }
    }

    value.to_string()
}

/// Fully redact a sensitive value
fn redact_value(value: &str) -> String {
    if value.is_empty() {
        return "[EMPTY]".to_string();
    }

    let len = value.len();
    if len <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED:{}chars]", len)
    }
}

/// Partially redact an address (show first 6 and last 4 chars)
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();

    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    if !trimmed.is_ascii() || trimmed.len() <= 10 {
        return redact_value(trimmed);
    }

    let prefix_len = if trimmed.starts_with("0x") { 8 } else { 6 };
    let suffix_len = 4;

    if trimmed.len() <= prefix_len + suffix_len + 3 {
        return redact_value(trimmed);
    }

    let prefix = &trimmed[..prefix_len];
    let suffix = &trimmed[trimmed.len() - suffix_len..];

    format!("{}...{}", prefix, suffix)
}

/// Partially redact a hash (show first 10 and last 6 chars)
fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();

    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    // Short hashes shown fully
    if !trimmed.is_ascii() || trimmed.len() <= 20 {
        return trimmed.to_string();
    }

    let prefix_len = if trimmed.starts_with("0x") { 12 } else { 10 };
    let suffix_len = 6;

    let prefix = &trimmed[..prefix_len];
    let suffix = &trimmed[trimmed.len() - suffix_len..];

    format!("{}...{}", prefix, suffix)
}
