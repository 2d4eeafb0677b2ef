//! Append-only collection of module findings: leveled messages and named
//! fact series.
//!
//! Every method takes `&self`; one lock guards each call, so an aggregator may
//! be shared between workers. Per-source aggregators are combined with
//! [`FindingsAggregator::absorb`].

use parking_lot::Mutex;

use crate::types::{Level, Message, Snapshot};

#[derive(Debug, Default)]
pub struct FindingsAggregator {
  inner: Mutex<Snapshot>,
}

impl FindingsAggregator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_message(&self, message: Message) {
    self.inner.lock().messages.push(message);
  }

  /// Shorthand for `add_message(Message::new(..))`.
  pub fn message(
    &self,
    level: Level,
    category: impl Into<String>,
    title: impl Into<String>,
    text: impl Into<String>,
  ) {
    self.add_message(Message::new(level, category, title, text));
  }

  /// Append one value to the fact series `key`. Duplicates are kept.
  pub fn add_fact_value(&self, key: impl Into<String>, value: impl Into<String>) {
    self
      .inner
      .lock()
      .facts
      .entry(key.into())
      .or_default()
      .push(value.into());
  }

  pub fn snapshot(&self) -> Snapshot {
    self.inner.lock().clone()
  }

  /// Append everything from `other` after the current contents: messages in
  /// their order, and each fact series onto the series with the same key.
  pub fn absorb(&self, other: Snapshot) {
    let mut inner = self.inner.lock();
    inner.messages.extend(other.messages);
    for (key, values) in other.facts {
      inner.facts.entry(key).or_default().extend(values);
    }
  }

  pub fn into_snapshot(self) -> Snapshot {
    self.inner.into_inner()
  }
}
