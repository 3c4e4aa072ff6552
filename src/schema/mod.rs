//! `schema.yaml` documents: load, merge column descriptions, save.
//!
//! Edits are spliced into the original text, so comments, key order, quoting
//! and every value that is not updated survive byte-for-byte.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

pub mod layout;
pub mod scalar;

use scalar::ScalarStyle;

#[derive(Debug, thiserror::Error)]
#[error("{}: {detail}", .path.display())]
pub struct Error {
    pub path: PathBuf,
    pub detail: Box<ErrorDetail>,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorDetail {
    #[error("Failed to read document: {0}")]
    ReadDocument(std::io::Error),
    #[error("Failed to parse YAML document: {0}")]
    ParseYaml(serde_yaml::Error),
    #[error("Failed to locate fields: {0}")]
    Layout(layout::Error),
    #[error("Cannot update description of {field}: {reason}")]
    Unsupported { field: String, reason: &'static str },
    #[error("Updated document does not carry the new description of {0}")]
    Verify(String),
    #[error("Failed to write document: {0}")]
    WriteDocument(std::io::Error),
}

#[derive(Deserialize)]
struct RawSchema {
    fields: Vec<RawField>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
struct RawField {
    name: String,
    #[serde(default)]
    description: Option<serde_yaml::Value>,
}

impl RawField {
    fn has_description(&self, description: &str) -> bool {
        matches!(&self.description, Some(serde_yaml::Value::String(current)) if current == description)
    }
}

/// Outcome of [`SchemaDocument::apply_descriptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub updated_count: usize,
    pub total_fields: usize,
    /// Supplied columns that match no field, in input order.
    pub unmatched: Vec<String>,
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

pub struct SchemaDocument {
    path: PathBuf,
    text: String,
    fields: Vec<RawField>,
}

impl SchemaDocument {
    fn error(&self, detail: ErrorDetail) -> Error {
        Error {
            path: self.path.clone(),
            detail: Box::new(detail),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, text: String) -> Result<Self, Error> {
        let path = path.into();
        let raw: RawSchema = serde_yaml::from_str(&text).map_err(|e| Error {
            path: path.clone(),
            detail: Box::new(ErrorDetail::ParseYaml(e)),
        })?;
        Ok(Self {
            path,
            text,
            fields: raw.fields,
        })
    }

    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| Error {
            path: path.clone(),
            detail: Box::new(ErrorDetail::ReadDocument(e)),
        })?;
        Self::parse(path, text)
    }

    #[cfg(test)]
    fn text(&self) -> &str {
        &self.text
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[cfg(test)]
    fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Current description of the first field called `name`, if it is a string.
    #[cfg(test)]
    fn description(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.description.as_ref())
            .and_then(serde_yaml::Value::as_str)
    }

    /// Set the description of every field whose name is a key of `descriptions`.
    ///
    /// Fields are visited in document order; keys without a matching field are
    /// reported in [`UpdateResult::unmatched`]. On error the document is left
    /// unchanged.
    pub fn apply_descriptions(
        &mut self,
        descriptions: &IndexMap<String, String>,
    ) -> Result<UpdateResult, Error> {
        let mut updated_count = 0;
        let mut pending = Vec::new();
        for (index, field) in self.fields.iter().enumerate() {
            let Some(description) = descriptions.get(&field.name) else {
                continue;
            };
            updated_count += 1;
            if !field.has_description(description) {
                pending.push((index, description.as_str()));
            }
        }
        let unmatched = descriptions
            .keys()
            .filter(|column| !self.fields.iter().any(|field| &field.name == *column))
            .cloned()
            .collect();

        if !pending.is_empty() {
            let text = self.splice(&pending)?;
            let raw: RawSchema = serde_yaml::from_str(&text)
                .map_err(|e| self.error(ErrorDetail::ParseYaml(e)))?;
            if raw.fields.len() != self.fields.len() {
                return Err(self.error(ErrorDetail::Verify(self.fields[pending[0].0].name.clone())));
            }
            for (index, description) in &pending {
                let field = &raw.fields[*index];
                if field.name != self.fields[*index].name || !field.has_description(description) {
                    return Err(self.error(ErrorDetail::Verify(field.name.clone())));
                }
            }
            debug!(path = %self.path.display(), edits = pending.len(), "spliced descriptions");
            self.text = text;
            self.fields = raw.fields;
        }

        Ok(UpdateResult {
            updated_count,
            total_fields: self.fields.len(),
            unmatched,
        })
    }

    fn splice(&self, pending: &[(usize, &str)]) -> Result<String, Error> {
        let layout = layout::scan(&self.text).map_err(|e| self.error(ErrorDetail::Layout(e)))?;
        if layout.fields.len() != self.fields.len() {
            return Err(self.error(ErrorDetail::Unsupported {
                field: self.fields[pending[0].0].name.clone(),
                reason: "fields could not be located in the document",
            }));
        }

        let mut edits = Vec::with_capacity(pending.len());
        for &(index, description) in pending {
            let name = &self.fields[index].name;
            let unsupported = |reason| {
                self.error(ErrorDetail::Unsupported {
                    field: name.clone(),
                    reason,
                })
            };
            let field = &layout.fields[index];
            if let Some(reason) = field.unsupported {
                return Err(unsupported(reason));
            }
            let key_indent = field.key_indent.unwrap_or_default();
            match field.description {
                Some(span) => {
                    let style = span
                        .style
                        .ok_or_else(|| unsupported("description is an anchor, alias, tag or collection"))?;
                    let value = scalar::render(description, style, span.block_indent, layout.eol);
                    edits.push(Edit {
                        start: span.start,
                        end: span.end,
                        text: if span.after_colon {
                            format!(" {value}")
                        } else {
                            value
                        },
                    });
                }
                None => {
                    let at = field
                        .after_name
                        .ok_or_else(|| unsupported("name key not found"))?;
                    let value =
                        scalar::render(description, ScalarStyle::Empty, key_indent + 2, layout.eol);
                    let mut text = String::new();
                    if at == self.text.len() && !self.text.is_empty() && !self.text.ends_with('\n') {
                        text.push_str(layout.eol);
                    }
                    text.push_str(&" ".repeat(key_indent));
                    text.push_str("description: ");
                    text.push_str(&value);
                    text.push_str(layout.eol);
                    edits.push(Edit {
                        start: at,
                        end: at,
                        text,
                    });
                }
            }
        }

        edits.sort_by_key(|edit| std::cmp::Reverse(edit.start));
        let mut text = self.text.clone();
        for edit in edits {
            text.replace_range(edit.start..edit.end, &edit.text);
        }
        Ok(text)
    }

    /// Write the document back to its path.
    ///
    /// The text goes to a temporary sibling first, which takes over the
    /// original's permissions and is then renamed over it.
    pub async fn save(&self) -> Result<(), Error> {
        let write_error = |e| self.error(ErrorDetail::WriteDocument(e));
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
        let permissions = tokio::fs::metadata(&self.path)
            .await
            .map_err(write_error)?
            .permissions();

        let result = async {
            tokio::fs::write(&temp, &self.text).await?;
            tokio::fs::set_permissions(&temp, permissions).await?;
            tokio::fs::rename(&temp, &self.path).await
        }
        .await;
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(write_error(e));
        }
        debug!(path = %self.path.display(), "saved schema");
        Ok(())
    }
}
