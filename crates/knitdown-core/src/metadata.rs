/*
 * metadata.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * YAML front matter extraction.
 */

//! Document metadata from YAML front matter.
//!
//! A front matter block is a YAML document delimited by a `---` line at the
//! start of the file (leading blank lines allowed) and a closing `---` or
//! `...` line. The line right after the opening delimiter must not be blank,
//! otherwise the `---` is a horizontal rule and not front matter.

use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{RenderError, Result};

/// Source text split into its front matter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    /// Raw YAML between the delimiters, if the document has front matter.
    pub yaml: Option<&'a str>,
    /// Everything after the closing delimiter (or the whole text).
    pub body: &'a str,
}

/// Split `text` into front matter and body.
pub fn partition_front_matter(text: &str) -> FrontMatter<'_> {
    let no_front_matter = FrontMatter {
        yaml: None,
        body: text,
    };

    // Byte offsets of each line start
    let mut offsets = Vec::new();
    let mut pos = 0;
    for line in text.split_inclusive('\n') {
        offsets.push((pos, line));
        pos += line.len();
    }

    let Some(open_idx) = offsets.iter().position(|(_, l)| !l.trim().is_empty()) else {
        return no_front_matter;
    };
    if offsets[open_idx].1.trim_end() != "---" {
        return no_front_matter;
    }
    match offsets.get(open_idx + 1) {
        Some((_, next)) if !next.trim().is_empty() => {}
        _ => return no_front_matter,
    }

    let Some(close_idx) = offsets
        .iter()
        .enumerate()
        .skip(open_idx + 1)
        .find(|(_, (_, l))| matches!(l.trim_end(), "---" | "..."))
        .map(|(i, _)| i)
    else {
        return no_front_matter;
    };

    let yaml_start = offsets[open_idx + 1].0;
    let yaml_end = offsets[close_idx].0;
    let (close_start, close_line) = offsets[close_idx];
    let body_start = close_start + close_line.len();

    FrontMatter {
        yaml: Some(&text[yaml_start..yaml_end]),
        body: &text[body_start..],
    }
}

/// An output format declared in the `output:` key.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredFormat {
    /// Format name, e.g. `html_document`
    pub name: String,
    /// Options given for this format (a JSON object, possibly empty)
    pub options: JsonValue,
}

/// Parsed document metadata.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub date: Option<String>,
    /// Bibliography files, in declaration order
    pub bibliography: Vec<String>,
    /// Runtime hint (`static`, `interactive`, `shiny`, ...)
    pub runtime: Option<String>,
    /// Output formats declared in `output:`, in declaration order
    pub output: Vec<DeclaredFormat>,
    /// The complete front matter mapping, including the keys above
    pub fields: Mapping,
}

impl Metadata {
    /// Parse metadata from the front matter of `text`.
    ///
    /// Text without front matter yields empty metadata.
    pub fn from_text(text: &str) -> Result<Self> {
        match partition_front_matter(text).yaml {
            Some(yaml) => Self::from_yaml_str(yaml),
            None => Ok(Self::default()),
        }
    }

    /// Parse metadata from a raw YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: YamlValue =
            serde_yaml::from_str(yaml).map_err(|e| RenderError::Metadata(e.to_string()))?;
        match value {
            YamlValue::Mapping(map) => Self::from_mapping(map),
            YamlValue::Null => Ok(Self::default()),
            other => Err(RenderError::Metadata(format!(
                "front matter must be a mapping, found {}",
                yaml_type_name(&other)
            ))),
        }
    }

    /// Build metadata from an already-parsed mapping.
    pub fn from_mapping(fields: Mapping) -> Result<Self> {
        let get = |key: &str| fields.get(YamlValue::String(key.to_string()));

        let title = get("title").and_then(scalar_to_string);
        let date = get("date").and_then(scalar_to_string);
        let runtime = get("runtime").and_then(scalar_to_string);
        let authors = get("author").map(authors_from_yaml).unwrap_or_default();
        let bibliography = get("bibliography")
            .map(strings_from_yaml)
            .unwrap_or_default();
        let output = match get("output") {
            Some(value) => declared_formats(value)?,
            None => Vec::new(),
        };

        Ok(Self {
            title,
            authors,
            date,
            bibliography,
            runtime,
            output,
            fields,
        })
    }

    /// Whether a top-level key is present.
    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(YamlValue::String(key.to_string()))
    }

    /// Names of the declared output formats, in order.
    pub fn declared_format_names(&self) -> Vec<String> {
        self.output.iter().map(|f| f.name.clone()).collect()
    }

    /// Options declared for a named format, if any.
    ///
    /// A namespace prefix (`rmarkdown::pdf_document`) on either side is ignored.
    pub fn format_options(&self, name: &str) -> Option<&JsonValue> {
        let unqualified = |n: &str| n.rsplit("::").next().unwrap_or(n).to_string();
        let wanted = unqualified(name);
        self.output
            .iter()
            .find(|f| unqualified(&f.name) == wanted)
            .map(|f| &f.options)
    }

    /// Front matter as JSON, for handing to the weaving engine.
    pub fn to_json(&self) -> Result<JsonValue> {
        serde_json::to_value(&self.fields).map_err(|e| RenderError::Metadata(e.to_string()))
    }

    /// Markdown header reconstructed from title, authors and date.
    ///
    /// Produces `# title`, one `#### author` line per author and
    /// `#### date`, each only when declared, followed by a blank line when
    /// anything was emitted.
    pub fn markdown_header(&self) -> String {
        let mut lines = Vec::new();
        if let Some(title) = &self.title {
            lines.push(format!("# {}", title));
        }
        for author in &self.authors {
            lines.push(format!("#### {}", author));
        }
        if let Some(date) = &self.date {
            lines.push(format!("#### {}", date));
        }
        if lines.is_empty() {
            return String::new();
        }
        let mut header = lines.join("\n");
        header.push_str("\n\n");
        header
    }
}

fn yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn strings_from_yaml(value: &YamlValue) -> Vec<String> {
    match value {
        YamlValue::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

/// `author` may be a string, a list of strings, or a list of `{name: ...}` maps.
fn authors_from_yaml(value: &YamlValue) -> Vec<String> {
    let one = |v: &YamlValue| match v {
        YamlValue::Mapping(m) => m
            .get(YamlValue::String("name".to_string()))
            .and_then(scalar_to_string),
        other => scalar_to_string(other),
    };
    match value {
        YamlValue::Sequence(items) => items.iter().filter_map(one).collect(),
        other => one(other).into_iter().collect(),
    }
}

/// `output` may be a format name, a list of names, or a map of name to options.
///
/// Option values of `default` (or null) mean "no options".
fn declared_formats(value: &YamlValue) -> Result<Vec<DeclaredFormat>> {
    let options_of = |v: &YamlValue| -> Result<JsonValue> {
        match v {
            YamlValue::Null => Ok(JsonValue::Object(Default::default())),
            YamlValue::String(s) if s == "default" => Ok(JsonValue::Object(Default::default())),
            YamlValue::Mapping(_) => {
                serde_json::to_value(v).map_err(|e| RenderError::Metadata(e.to_string()))
            }
            other => Err(RenderError::Metadata(format!(
                "output format options must be a mapping or `default`, found {}",
                yaml_type_name(other)
            ))),
        }
    };

    match value {
        YamlValue::String(name) => Ok(vec![DeclaredFormat {
            name: name.clone(),
            options: JsonValue::Object(Default::default()),
        }]),
        YamlValue::Sequence(items) => items
            .iter()
            .map(|item| match item {
                YamlValue::String(name) => Ok(DeclaredFormat {
                    name: name.clone(),
                    options: JsonValue::Object(Default::default()),
                }),
                other => Err(RenderError::Metadata(format!(
                    "output list entries must be format names, found {}",
                    yaml_type_name(other)
                ))),
            })
            .collect(),
        YamlValue::Mapping(map) => map
            .iter()
            .map(|(key, options)| {
                let name = scalar_to_string(key).ok_or_else(|| {
                    RenderError::Metadata("output format names must be strings".to_string())
                })?;
                Ok(DeclaredFormat {
                    name,
                    options: options_of(options)?,
                })
            })
            .collect(),
        YamlValue::Null => Ok(Vec::new()),
        other => Err(RenderError::Metadata(format!(
            "output must be a format name, list or mapping, found {}",
            yaml_type_name(other)
        ))),
    }
}
