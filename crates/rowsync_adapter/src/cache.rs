//! Derived parameter cache.

use crate::driver::Parameter;
use crate::error::DriverResult;
use dashmap::DashMap;
use tracing::debug;

/// Parameter shapes of commands, keyed by normalized command text.
///
/// Deriving parameters costs a round trip to the engine, so the first caller
/// for a command derives and publishes the shape; later callers get a clone.
/// Two callers racing on the same command may both derive; only one entry
/// survives.
///
/// Share one cache between appliers with an `Arc<CommandCache>`.
#[derive(Debug, Default)]
pub struct CommandCache {
    entries: DashMap<String, Vec<Parameter>>,
}

impl CommandCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parameters of `command_text`, calling `derive` on a miss.
    ///
    /// A leading return-value parameter is dropped before the shape is
    /// cached. Each caller receives its own copy.
    ///
    /// # Errors
    ///
    /// Returns whatever `derive` fails with; nothing is cached then.
    pub fn get_or_derive<F>(&self, command_text: &str, derive: F) -> DriverResult<Vec<Parameter>>
    where
        F: FnOnce(&str) -> DriverResult<Vec<Parameter>>,
    {
        let key = normalize(command_text);
        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.clone());
        }

        let mut parameters = derive(command_text)?;
        if parameters.first().is_some_and(Parameter::is_return_value) {
            parameters.remove(0);
        }
        debug!(command = %key, count = parameters.len(), "derived command parameters");

        Ok(self.entries.entry(key).or_insert(parameters).clone())
    }

    /// Number of cached commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached shape.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Cache key of a command.
///
/// A command name is unquoted and lowercased, so `[dbo].[Product_bulkupdate]`,
/// `"dbo"."product_bulkupdate"` and `dbo . Product_BulkUpdate` share one key.
/// Any other text, such as a full statement, is its own key.
fn normalize(command_text: &str) -> String {
    command_name(command_text).unwrap_or_else(|| command_text.to_string())
}

fn command_name(command_text: &str) -> Option<String> {
    command_text
        .split('.')
        .map(|part| {
            let part = part.trim();
            let inner = match part.chars().next()? {
                '[' => part.strip_prefix('[')?.strip_suffix(']')?,
                quote @ ('"' | '`') => part.strip_prefix(quote)?.strip_suffix(quote)?,
                _ if part
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '#')) =>
                {
                    part
                }
                _ => return None,
            };
            let inner = inner.trim();
            (!inner.is_empty()).then(|| inner.to_lowercase())
        })
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ParameterDirection;
    use crate::error::DriverError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn shape() -> Vec<Parameter> {
        vec![
            Parameter::new("@RETURN_VALUE").with_direction(ParameterDirection::ReturnValue),
            Parameter::new("@changeTable"),
            Parameter::new("@sync_scope_id"),
            Parameter::new("@sync_min_timestamp"),
        ]
    }

    #[test]
    fn normalize_strips_quoting_and_case() {
        assert_eq!(normalize("[dbo].[Product_BulkUpdate]"), "dbo.product_bulkupdate");
        assert_eq!(normalize("\"dbo\" . \"Product_BulkUpdate\""), "dbo.product_bulkupdate");
        assert_eq!(normalize("`Product`"), "product");
        assert_eq!(normalize("[dbo].[Order Lines]"), "dbo.order lines");
    }

    #[test]
    fn statements_keep_their_text() {
        let upsert = "INSERT INTO item (id, name) VALUES (:id, 'Bolt')";
        assert_eq!(normalize(upsert), upsert);
        assert_ne!(
            normalize("DELETE FROM item WHERE name = 'A'"),
            normalize("DELETE FROM item WHERE name = 'a'")
        );
        assert_eq!(normalize("[dbo].[Product"), "[dbo].[Product");
    }

    #[test]
    fn statements_differing_in_literal_case_get_their_own_entries() {
        let cache = CommandCache::new();
        cache
            .get_or_derive("SELECT * FROM item WHERE name = 'A'", |_| Ok(shape()))
            .unwrap();
        let other = cache
            .get_or_derive("SELECT * FROM item WHERE name = 'a'", |_| Ok(Vec::new()))
            .unwrap();

        assert!(other.is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn derives_once_per_normalized_text() {
        let cache = CommandCache::new();
        let calls = AtomicUsize::new(0);
        let derive = |_: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(shape())
        };

        let first = cache.get_or_derive("[dbo].[Product_BulkUpdate]", derive).unwrap();
        let second = cache
            .get_or_derive("dbo.product_bulkupdate", |_| Ok(Vec::new()))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].name, "@changeTable");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_derivation_is_not_cached() {
        let cache = CommandCache::new();
        let err = cache
            .get_or_derive("p", |_| Err(DriverError::connection("down")))
            .unwrap_err();
        assert_eq!(err.message, "down");
        assert!(cache.is_empty());
    }

    #[test]
    fn callers_own_their_copy() {
        let cache = CommandCache::new();
        let mut mine = cache.get_or_derive("p", |_| Ok(shape())).unwrap();
        mine[0].source_column = Some("changed".into());

        let theirs = cache.get_or_derive("p", |_| Ok(Vec::new())).unwrap();
        assert_eq!(theirs[0].source_column, None);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_callers_see_one_shape() {
        let cache = Arc::new(CommandCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_derive("[Product_BulkUpdate]", |_| Ok(shape())))
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.len(), 1);
    }
}
