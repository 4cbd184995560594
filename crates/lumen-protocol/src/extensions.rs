//! Decoders and encoders for the Lumen dialect extensions.

use crate::codec::{
    bool_or, decode_range, field, range_json, require, require_object, require_str, str_or,
    DecodeError, FromJson, ToJson,
};
use crate::params::{TextDocumentIdentifier, TextDocumentPositionParams};
use lumen_position::Range;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// `lumen/crossLanguageJump` parameters: a navigation target living in a
/// foreign-language declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossLanguageJumpParams {
    /// Package the declaration belongs to.
    pub package_name: String,
    /// Declaration name.
    pub name: String,
    /// Enclosing declaration name, when nested.
    pub outer_name: String,
    /// True when the target is a combined (merged) declaration.
    pub is_combined: bool,
}

impl FromJson for CrossLanguageJumpParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(Self {
            package_name: require_str(value, "packageName")?,
            name: require_str(value, "name")?,
            outer_name: str_or(value, "outerName", ""),
            is_combined: bool_or(value, "isCombined", false),
        })
    }
}

/// `lumen/overrideMethods` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideMethodsParams {
    /// Target document and position.
    pub position_params: TextDocumentPositionParams,
    /// True when the cursor sits on an extend declaration.
    pub is_extend: bool,
}

impl FromJson for OverrideMethodsParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(Self {
            position_params: TextDocumentPositionParams::from_json(value)?,
            is_extend: bool_or(value, "isExtend", false),
        })
    }
}

/// `lumen/exportsName` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportsNameParams {
    /// Target document and position.
    pub position_params: TextDocumentPositionParams,
    /// Package whose exports are requested.
    pub package_name: String,
}

impl FromJson for ExportsNameParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(Self {
            position_params: TextDocumentPositionParams::from_json(value)?,
            package_name: require_str(value, "packageName")?,
        })
    }
}

/// `lumen/trackCompletion` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackCompletionParams {
    /// Label of the accepted completion item.
    pub label: String,
}

impl FromJson for TrackCompletionParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        require(value, "label")?;
        Ok(Self { label: str_or(value, "label", "") })
    }
}

/// `lumen/fileRefactor` request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRefactorParams {
    /// The file the cursor is in.
    pub file: TextDocumentIdentifier,
    /// Destination directory.
    pub target_path: TextDocumentIdentifier,
    /// The moved element: the file itself or an enclosing directory.
    pub selected_element: TextDocumentIdentifier,
}

impl FromJson for FileRefactorParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let file = TextDocumentIdentifier::from_json(require_object(value, "file")?)?;
        let target_path =
            TextDocumentIdentifier::from_json(require_object(value, "targetPath")?)?;
        let selected_element =
            TextDocumentIdentifier::from_json(require_object(value, "selectedElement")?)?;
        Ok(Self { file, target_path, selected_element })
    }
}

/// Wire edit kind of a file-refactor change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileRefactorChangeKind {
    /// Insert `content` before `range.start`.
    Add,
    /// Replace the text spanned by `range` with `content`.
    Changed,
    /// Remove the text spanned by `range`.
    Deleted,
}

impl FileRefactorChangeKind {
    /// Wire number of the kind.
    pub const fn to_wire(self) -> i32 {
        match self {
            FileRefactorChangeKind::Add => 1,
            FileRefactorChangeKind::Changed => 2,
            FileRefactorChangeKind::Deleted => 3,
        }
    }
}

/// One edit of a file-refactor response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRefactorEdit {
    /// Edit kind.
    pub kind: FileRefactorChangeKind,
    /// Edited range (insertion point for adds).
    pub range: Range,
    /// New content; empty for deletions.
    pub content: String,
}

impl ToJson for FileRefactorEdit {
    fn to_json(&self) -> Value {
        json!({
            "type": self.kind.to_wire(),
            "range": range_json(self.range),
            "content": self.content,
        })
    }
}

/// `lumen/fileRefactor` response: per-URI ordered edit lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRefactorResponse {
    /// Edits per file, already in canonical apply order.
    pub changes: BTreeMap<String, Vec<FileRefactorEdit>>,
}

impl ToJson for FileRefactorResponse {
    fn to_json(&self) -> Value {
        let mut changes = Map::new();
        for (uri, edits) in &self.changes {
            changes.insert(
                uri.clone(),
                Value::Array(edits.iter().map(ToJson::to_json).collect()),
            );
        }
        json!({ "changes": Value::Object(changes) })
    }
}

/// Arguments of the apply-tweak command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweakArgs {
    /// File the tweak applies to.
    pub file: String,
    /// Selected range.
    pub selection: Range,
    /// Which tweak to run.
    pub tweak_id: String,
    /// Free-form string options.
    pub extra_options: BTreeMap<String, String>,
}

/// Command name understood by `workspace/executeCommand`.
pub const APPLY_TWEAK_COMMAND: &str = "lumenLsp.applyTweak";

impl FromJson for TweakArgs {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let selection = decode_range(require_object(value, "selection")?)?;
        let mut extra_options = BTreeMap::new();
        if let Some(options) = field(value, "extraOptions").and_then(Value::as_object) {
            for (key, option) in options {
                if let Some(option) = option.as_str() {
                    extra_options.insert(key.clone(), option.to_string());
                }
            }
        }
        Ok(Self {
            file: str_or(value, "file", ""),
            selection,
            tweak_id: str_or(value, "tweakID", ""),
            extra_options,
        })
    }
}

impl ToJson for TweakArgs {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("file".to_string(), Value::from(self.file.clone()));
        obj.insert("selection".to_string(), range_json(self.selection));
        obj.insert("tweakID".to_string(), Value::from(self.tweak_id.clone()));
        if !self.extra_options.is_empty() {
            let mut options = Map::new();
            for (key, option) in &self.extra_options {
                options.insert(key.clone(), Value::from(option.clone()));
            }
            obj.insert("extraOptions".to_string(), Value::Object(options));
        }
        Value::Object(obj)
    }
}

/// `workspace/executeCommand` parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteCommandParams {
    /// Command name.
    pub command: String,
    /// Raw arguments; shape depends on the command.
    pub arguments: Value,
}

impl FromJson for ExecuteCommandParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(Self {
            command: require_str(value, "command")?,
            arguments: field(value, "arguments").cloned().unwrap_or(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_position::Position;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cross_language_jump_optional_fields() {
        let params = CrossLanguageJumpParams::from_json(&json!({
            "packageName": "a.b",
            "name": "NativeBuffer"
        }))
        .expect("decode");
        assert_eq!(params.outer_name, "");
        assert!(!params.is_combined);

        let full = CrossLanguageJumpParams::from_json(&json!({
            "packageName": "a.b",
            "name": "read",
            "outerName": "NativeBuffer",
            "isCombined": true
        }))
        .expect("decode");
        assert_eq!(full.outer_name, "NativeBuffer");
        assert!(full.is_combined);
    }

    #[test]
    fn test_cross_language_jump_requires_name() {
        assert_eq!(
            CrossLanguageJumpParams::from_json(&json!({"packageName": "a.b"})),
            Err(DecodeError::MissingField("name"))
        );
    }

    #[test]
    fn test_file_refactor_params() {
        let params = FileRefactorParams::from_json(&json!({
            "file": {"uri": "file:///w/a/b/one.lm"},
            "targetPath": {"uri": "file:///w/a/c"},
            "selectedElement": {"uri": "file:///w/a/b/one.lm"}
        }))
        .expect("decode");
        assert_eq!(params.file.uri, "file:///w/a/b/one.lm");
        assert_eq!(params.target_path.uri, "file:///w/a/c");
        assert_eq!(params.selected_element.uri, "file:///w/a/b/one.lm");
    }

    #[test]
    fn test_file_refactor_params_requires_selected_element() {
        let bad = json!({
            "file": {"uri": "file:///w/a/b/one.lm"},
            "targetPath": {"uri": "file:///w/a/c"}
        });
        assert_eq!(
            FileRefactorParams::from_json(&bad),
            Err(DecodeError::MissingField("selectedElement"))
        );
    }

    #[test]
    fn test_file_refactor_response_shape() {
        let mut response = FileRefactorResponse::default();
        response.changes.insert(
            "file:///w/a/b/one.lm".to_string(),
            vec![FileRefactorEdit {
                kind: FileRefactorChangeKind::Changed,
                range: Range::new(Position::new(0, 8), Position::new(0, 11)),
                content: "a.c".to_string(),
            }],
        );
        assert_eq!(
            response.to_json(),
            json!({"changes": {"file:///w/a/b/one.lm": [{
                "type": 2,
                "range": {"start": {"line": 0, "character": 8},
                           "end": {"line": 0, "character": 11}},
                "content": "a.c"
            }]}})
        );
    }

    #[test]
    fn test_tweak_args_round_trip() {
        let wire = json!({
            "file": "file:///w/x.lm",
            "selection": {"start": {"line": 1, "character": 2},
                          "end": {"line": 1, "character": 9}},
            "tweakID": "extractFunction",
            "extraOptions": {"name": "helper", "visibility": "internal"}
        });
        let args = TweakArgs::from_json(&wire).expect("decode");
        assert_eq!(args.tweak_id, "extractFunction");
        assert_eq!(args.extra_options.get("name").map(String::as_str), Some("helper"));
        assert_eq!(args.to_json(), wire);
    }

    #[test]
    fn test_execute_command() {
        let params = ExecuteCommandParams::from_json(&json!({
            "command": APPLY_TWEAK_COMMAND,
            "arguments": [{"tweakID": "x"}]
        }))
        .expect("decode");
        assert_eq!(params.command, "lumenLsp.applyTweak");
        assert!(params.arguments.is_array());
    }
}
