//! Case-insensitive, multi-value header collection.
//!
//! Lookup ignores ASCII case. The casing under which a name was first
//! inserted is what [`Headers::iter`] yields, so a message re-serializes the
//! names the producer chose.

use std::fmt;

/// One header: its display name and every value it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

impl HeaderEntry {
    pub fn name(&self) -> &str { &self.name }
    pub fn values(&self) -> &[String] { &self.values }
}

/// Ordered header collection keyed by case-folded name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// All values of `name`; empty when the header is absent.
    pub fn get(&self, name: &str) -> &[String] {
        self.entry(name).map(|e| e.values.as_slice()).unwrap_or_default()
    }

    /// The first value of `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }

    /// All values of `name` joined with `,`; empty when the header is absent.
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(",")
    }

    pub fn entry(&self, name: &str) -> Option<&HeaderEntry> {
        self.position(name).map(|i| &self.entries[i])
    }

    /// Replaces every value of `name` with `value`. An existing header keeps
    /// the casing it was first inserted with.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.insert_all(name, [value]);
    }

    /// Replaces every value of `name` with `values`.
    pub fn insert_all<I, V>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values = values.into_iter().map(|v| clean(v.into())).collect();
        match self.position(name) {
            Some(i) => self.entries[i].values = values,
            None => self.entries.push(HeaderEntry { name: name.trim().to_owned(), values }),
        }
    }

    /// Adds `value` after any existing values of `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let value = clean(value.into());
        match self.position(name) {
            Some(i) => self.entries[i].values.push(value),
            None => self.entries.push(HeaderEntry { name: name.trim().to_owned(), values: vec![value] }),
        }
    }

    /// Removes `name`, returning its values if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let i = self.position(name)?;
        Some(self.entries.remove(i).values)
    }

    /// `(display_name, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|e| (e.name.as_str(), e.values.as_slice()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.entries.iter().position(|e| e.name.eq_ignore_ascii_case(name))
    }
}

fn clean(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() { value } else { trimmed.to_owned() }
}

/// Builds from a raw header map. Repeated names append.
impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.append(name.as_ref(), value);
        }
    }
}

/// One `Name: value` line per value, in insertion order.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, values) in self.iter() {
            for value in values {
                writeln!(f, "{name}: {value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_look_up_case_insensitively() {
        let mut headers = Headers::new();
        headers.insert("X-Foo", "1");

        assert!(headers.contains("x-foo"));
        assert!(headers.contains("X-FOO"));
        assert_eq!(headers.get("x-FoO"), ["1"]);
        assert_eq!(headers.iter().next().unwrap().0, "X-Foo");
    }

    #[test]
    fn test_should_keep_first_inserted_casing() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert("content-type", "application/json");

        assert_eq!(headers.len(), 1);
        let (name, values) = headers.iter().next().unwrap();
        assert_eq!(name, "Content-Type");
        assert_eq!(values, ["application/json"]);
    }

    #[test]
    fn test_should_append_multiple_values() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/html");
        headers.append("accept", "application/json");

        assert_eq!(headers.get("ACCEPT"), ["text/html", "application/json"]);
        assert_eq!(headers.get_line("accept"), "text/html,application/json");
        assert_eq!(headers.first("accept"), Some("text/html"));
    }

    #[test]
    fn test_should_return_empty_for_missing_header() {
        let headers = Headers::new();
        assert!(headers.get("missing").is_empty());
        assert_eq!(headers.get_line("missing"), "");
        assert_eq!(headers.first("missing"), None);
    }

    #[test]
    fn test_should_remove_header_by_any_casing() {
        let mut headers: Headers = [("X-Test", "a"), ("Host", "example.com")].into_iter().collect();
        assert_eq!(headers.remove("x-test"), Some(vec!["a".to_owned()]));
        assert!(!headers.contains("X-Test"));
        assert_eq!(headers.remove("x-test"), None);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_should_trim_names_and_values() {
        let headers: Headers = [(" X-Pad ", "  v  ")].into_iter().collect();
        assert_eq!(headers.get("x-pad"), ["v"]);
        assert_eq!(headers.iter().next().unwrap().0, "X-Pad");
    }

    #[test]
    fn test_should_render_one_line_per_value() {
        let mut headers = Headers::new();
        headers.insert_all("Vary", ["Accept", "Origin"]);
        assert_eq!(headers.to_string(), "Vary: Accept\nVary: Origin\n");
    }
}
