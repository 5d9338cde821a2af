//! `key=value;key=value` parameter strings exchanged with the audio HAL.
//!
//! Keys keep their insertion order so replies serialise deterministically.
//! A bare key without `=` is stored with an empty value.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrParms {
    pairs: Vec<(String, String)>,
}

impl StrParms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Self {
        let mut parms = Self::new();
        for item in input.split(';') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            parms.add_str(key, value.trim());
        }
        parms
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace `key`.
    pub fn add_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for StrParms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for StrParms {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let parms = StrParms::parse("ssrOn=true;ssr.gain=-3");
        assert_eq!(parms.get("ssrOn"), Some("true"));
        assert_eq!(parms.get("ssr.gain"), Some("-3"));
        assert_eq!(parms.get("missing"), None);
        assert_eq!(parms.len(), 2);
    }

    #[test]
    fn test_parse_tolerates_noise() {
        let parms = StrParms::parse(";; ssr.all ; =orphan; routing = 2 ;");
        assert!(parms.has_key("ssr.all"));
        assert_eq!(parms.get("ssr.all"), Some(""));
        assert_eq!(parms.get("routing"), Some("2"));
        assert_eq!(parms.len(), 2);
    }

    #[test]
    fn test_add_replaces_in_place() {
        let mut parms = StrParms::new();
        parms.add_str("a", "1");
        parms.add_str("b", "2");
        parms.add_str("a", "3");
        assert_eq!(parms.to_string(), "a=3;b=2");
    }

    #[test]
    fn test_remove() {
        let mut parms: StrParms = "a=1;b=2".parse().unwrap();
        assert_eq!(parms.remove("a").as_deref(), Some("1"));
        assert_eq!(parms.remove("a"), None);
        assert_eq!(parms.to_string(), "b=2");
    }

    #[test]
    fn test_empty_serialises_to_empty_string() {
        assert_eq!(StrParms::new().to_string(), "");
    }
}
