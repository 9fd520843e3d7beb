use std::collections::VecDeque;

use memdb_common::StorageError;
use tokio::time::{Duration, Instant};

/// Valor string, com TTL opcional.
#[derive(Debug, Clone, PartialEq)]
pub struct StringValue {
    content: String,
    expires_at: Option<Instant>,
}

impl StringValue {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            expires_at: None,
        }
    }

    /// Conteúdo atual, ou `None` se o deadline já passou.
    pub fn read(&self) -> Option<&str> {
        if is_past(self.expires_at) {
            return None;
        }
        Some(&self.content)
    }

    pub fn increment(&mut self) -> Result<&str, StorageError> {
        self.add(1)
    }

    pub fn decrement(&mut self) -> Result<&str, StorageError> {
        self.add(-1)
    }

    /// Soma `delta` ao conteúdo: tenta inteiro primeiro, depois float.
    /// Conteúdo não numérico fica intacto.
    fn add(&mut self, delta: i64) -> Result<&str, StorageError> {
        self.content = add_numeric(&self.content, delta)?;
        Ok(&self.content)
    }

    pub fn set_expiry(&mut self, ttl: Duration) {
        self.expires_at = Some(deadline_after(ttl));
    }
}

/// Lista de strings. Push à esquerda insere na cabeça, `pop` remove da cauda.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListValue {
    items: VecDeque<String>,
    expires_at: Option<Instant>,
}

impl ListValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = String>) -> Self {
        Self {
            items: items.into_iter().collect(),
            expires_at: None,
        }
    }

    pub fn lpush(&mut self, value: impl Into<String>) {
        self.items.push_front(value.into());
    }

    pub fn rpush(&mut self, value: impl Into<String>) {
        self.items.push_back(value.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.items.pop_back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Itens separados por um espaço, ou `None` se vazia/expirada.
    pub fn read(&self) -> Option<String> {
        if self.items.is_empty() || is_past(self.expires_at) {
            return None;
        }
        Some(self.items().collect::<Vec<_>>().join(" "))
    }

    pub fn set_expiry(&mut self, ttl: Duration) {
        self.expires_at = Some(deadline_after(ttl));
    }
}

/// Tipo do valor armazenado.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(StringValue),
    List(ListValue),
}

impl Value {
    pub fn string(content: impl Into<String>) -> Self {
        Value::String(StringValue::new(content))
    }

    /// Representação textual atual.
    pub fn read(&self) -> Option<String> {
        match self {
            Value::String(s) => s.read().map(str::to_string),
            Value::List(l) => l.read(),
        }
    }

    pub fn increment(&mut self) -> Result<String, StorageError> {
        match self {
            Value::String(s) => s.increment().map(str::to_string),
            Value::List(_) => Err(StorageError::WrongType),
        }
    }

    pub fn decrement(&mut self) -> Result<String, StorageError> {
        match self {
            Value::String(s) => s.decrement().map(str::to_string),
            Value::List(_) => Err(StorageError::WrongType),
        }
    }

    pub fn set_expiry(&mut self, ttl: Duration) {
        match self {
            Value::String(s) => s.set_expiry(ttl),
            Value::List(l) => l.set_expiry(ttl),
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        match self {
            Value::String(s) => s.expires_at,
            Value::List(l) => l.expires_at,
        }
    }

    /// Instala um deadline absoluto (usado ao restaurar snapshots).
    pub(crate) fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        match &mut self {
            Value::String(s) => s.expires_at = deadline,
            Value::List(l) => l.expires_at = deadline,
        }
        self
    }

    pub fn is_expired(&self) -> bool {
        is_past(self.expires_at())
    }

    pub fn as_list(&self) -> Result<&ListValue, StorageError> {
        match self {
            Value::List(l) => Ok(l),
            Value::String(_) => Err(StorageError::WrongType),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut ListValue, StorageError> {
        match self {
            Value::List(l) => Ok(l),
            Value::String(_) => Err(StorageError::WrongType),
        }
    }
}

// Limite para TTLs que estourariam o relógio monotônico.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Deadline `ttl` a partir de agora, saturando em um futuro distante.
pub(crate) fn deadline_after(ttl: Duration) -> Instant {
    Instant::now() + ttl.min(FAR_FUTURE)
}

fn is_past(deadline: Option<Instant>) -> bool {
    deadline.map(|t| Instant::now() >= t).unwrap_or(false)
}

fn add_numeric(content: &str, delta: i64) -> Result<String, StorageError> {
    if let Ok(n) = content.parse::<i64>() {
        return n
            .checked_add(delta)
            .map(|v| v.to_string())
            .ok_or(StorageError::NotNumeric);
    }
    match content.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(format_float(f + delta as f64)),
        _ => Err(StorageError::NotNumeric),
    }
}

// Mantém o ponto decimal para que "1.0" continue float depois do INCREMENT.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}
