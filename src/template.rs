//! Placeholder substitution for HTML payloads.
//!
//! `{name}` is replaced by the value of `name`; `{{` and `}}` produce literal
//! braces. A placeholder with no value is an error rather than an empty
//! string, so a typo in a template shows up as a failed request.

use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::path::{Path, PathBuf};

use crate::routing::ParameterSet;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("no value for placeholder `{{{0}}}`")]
    UndefinedKey(String),
    #[error("unclosed placeholder at byte {position}")]
    Unclosed { position: usize },
    #[error("unmatched `}}` at byte {position}")]
    UnmatchedBrace { position: usize },
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of placeholder values.
pub trait Variables {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>>;
}

impl<T: Variables + ?Sized> Variables for &T {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        (**self).lookup(key)
    }
}

impl<K, V, S> Variables for HashMap<K, V, S>
where
    K: Borrow<str> + Eq + Hash,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(|v| Cow::Borrowed(v.as_ref()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> Variables for [(K, V)] {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| Cow::Borrowed(v.as_ref()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> Variables for [(K, V); N] {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.as_slice().lookup(key)
    }
}

impl Variables for ParameterSet {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(Cow::Borrowed)
    }
}

/// Replace every `{key}` in `template` with its value from `vars`.
pub fn substitute<V: Variables + ?Sized>(template: &str, vars: &V) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(i) = rest.find(['{', '}']) {
        out.push_str(&rest[..i]);
        let position = offset + i;
        let tail = &rest[i..];

        let consumed = if tail.starts_with("{{") {
            out.push('{');
            2
        } else if tail.starts_with("}}") {
            out.push('}');
            2
        } else if tail.starts_with('}') {
            return Err(TemplateError::UnmatchedBrace { position });
        } else {
            let close = tail.find('}').ok_or(TemplateError::Unclosed { position })?;
            let key = &tail[1..close];
            if key.contains('{') {
                return Err(TemplateError::Unclosed { position });
            }
            let value = vars
                .lookup(key)
                .ok_or_else(|| TemplateError::UndefinedKey(key.to_string()))?;
            out.push_str(&value);
            close + 1
        };

        rest = &tail[consumed..];
        offset = position + consumed;
    }

    out.push_str(rest);
    Ok(out)
}

/// Read `path` and substitute placeholders.
pub fn render_file<V: Variables + ?Sized>(path: impl AsRef<Path>, vars: &V) -> Result<String, TemplateError> {
    let path = path.as_ref();
    let template = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    substitute(&template, vars)
}
