//!
//! # Label and field selectors
//!
//! Equality based selectors as used by list and watch requests.
//! A selector is a comma separated list of requirements, all of which must hold.
//!
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

/// set of key/value pairs a selector is matched against
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Set(BTreeMap<String, String>);

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|value| value.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl From<&HashMap<String, String>> for Set {
    fn from(map: &HashMap<String, String>) -> Self {
        Self(
            map.iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for Set
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
    pub value: String,
}

impl Requirement {
    pub fn matches(&self, set: &Set) -> bool {
        match self.operator {
            Operator::Equals => set.get(&self.key) == Some(self.value.as_str()),
            // absent key satisfies inequality
            Operator::NotEquals => set.get(&self.key) != Some(self.value.as_str()),
            Operator::Exists => set.has(&self.key),
            Operator::DoesNotExist => !set.has(&self.key),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, self.value),
            Operator::NotEquals => write!(f, "{}!={}", self.key, self.value),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

#[derive(Debug)]
pub enum SelectorError {
    EmptyKey(String),
    InvalidCharacter(String),
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey(term) => write!(f, "selector term '{}' has an empty key", term),
            Self::InvalidCharacter(term) => {
                write!(f, "selector term '{}' contains invalid characters", term)
            }
        }
    }
}

impl std::error::Error for SelectorError {}

/// conjunction of requirements. empty selector matches everything
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// builds selector requiring every pair of set
    pub fn from_set(set: &Set) -> Self {
        Self {
            requirements: set
                .iter()
                .map(|(key, value)| Requirement {
                    key: key.clone(),
                    operator: Operator::Equals,
                    value: value.clone(),
                })
                .collect(),
        }
    }

    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let mut requirements = vec![];
        for term in selector.split(',') {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            requirements.push(parse_term(term)?);
        }
        Ok(Self { requirements })
    }

    pub fn matches(&self, set: &Set) -> bool {
        self.requirements
            .iter()
            .all(|requirement| requirement.matches(set))
    }

    /// value required for key by equality, used to narrow lookups
    pub fn requires_exact(&self, key: &str) -> Option<&str> {
        self.requirements
            .iter()
            .find(|requirement| requirement.key == key && requirement.operator == Operator::Equals)
            .map(|requirement| requirement.value.as_str())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let terms: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", terms.join(","))
    }
}

fn parse_term(term: &str) -> Result<Requirement, SelectorError> {
    let (key, operator, value) = if let Some((key, value)) = term.split_once("!=") {
        (key, Operator::NotEquals, value)
    } else if let Some((key, value)) = term.split_once("==") {
        (key, Operator::Equals, value)
    } else if let Some((key, value)) = term.split_once('=') {
        (key, Operator::Equals, value)
    } else if let Some(key) = term.strip_prefix('!') {
        (key, Operator::DoesNotExist, "")
    } else {
        (term, Operator::Exists, "")
    };

    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return Err(SelectorError::EmptyKey(term.to_owned()));
    }
    if !key.chars().all(valid_key_char) || !value.chars().all(valid_value_char) {
        return Err(SelectorError::InvalidCharacter(term.to_owned()));
    }

    Ok(Requirement {
        key: key.to_owned(),
        operator,
        value: value.to_owned(),
    })
}

fn valid_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')
}

fn valid_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/')
}
