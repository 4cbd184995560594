//! Type- and call-hierarchy wire records.
//!
//! Hierarchy items round-trip through the client between the prepare call
//! and the supertypes/subtypes/incomingCalls/outgoingCalls calls, so both
//! directions are implemented. The symbol id travels as a decimal string
//! inside the `data` object; a 64-bit id does not survive JSON number
//! precision.

use crate::codec::{
    bool_or, decode_range, field, i32_or, range_json, require_object, str_or, DecodeError,
    FromJson, ToJson,
};
use lumen_position::Range;
use lumen_symbols::SymbolId;
use serde_json::{json, Value};

fn parse_symbol_id(text: &str) -> SymbolId {
    text.parse::<u64>().map(SymbolId).unwrap_or(SymbolId::INVALID)
}

fn decode_item_range(item: &Value, name: &'static str) -> Result<Range, DecodeError> {
    decode_range(require_object(item, name)?)
}

/// One node of a type hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHierarchyItem {
    /// Display name.
    pub name: String,
    /// LSP symbol-kind number.
    pub kind: i32,
    /// File the declaration lives in.
    pub uri: String,
    /// Full declaration range.
    pub range: Range,
    /// Name range for selection.
    pub selection_range: Range,
    /// True when the declaration is not on disk (builtin or stub).
    pub is_kernel: bool,
    /// True while further super/sub types exist in that direction.
    pub is_child_or_super: bool,
    /// Stable symbol id.
    pub symbol_id: SymbolId,
}

impl FromJson for TypeHierarchyItem {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let data = field(value, "data").cloned().unwrap_or(Value::Null);
        Ok(Self {
            name: str_or(value, "name", ""),
            kind: i32_or(value, "kind", -1),
            uri: str_or(value, "uri", ""),
            range: decode_item_range(value, "range")?,
            selection_range: decode_item_range(value, "selectionRange")?,
            is_kernel: bool_or(&data, "isKernel", false),
            is_child_or_super: bool_or(&data, "isChildOrSuper", false),
            symbol_id: parse_symbol_id(&str_or(&data, "symbolId", "")),
        })
    }
}

impl ToJson for TypeHierarchyItem {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "kind": self.kind,
            "uri": self.uri,
            "range": range_json(self.range),
            "selectionRange": range_json(self.selection_range),
            "data": {
                "isKernel": self.is_kernel,
                "isChildOrSuper": self.is_child_or_super,
                "symbolId": self.symbol_id.to_string(),
            },
        })
    }
}

/// One node of a call hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallHierarchyItem {
    /// Display name; callables carry their printed parameter list.
    pub name: String,
    /// LSP symbol-kind number.
    pub kind: i32,
    /// File the declaration lives in.
    pub uri: String,
    /// `package.file` of the declaration, dots throughout.
    pub detail: String,
    /// Full declaration range.
    pub range: Range,
    /// Name range for selection.
    pub selection_range: Range,
    /// True when the declaration is not on disk (builtin or stub).
    pub is_kernel: bool,
    /// Stable symbol id.
    pub symbol_id: SymbolId,
}

impl FromJson for CallHierarchyItem {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let data = field(value, "data").cloned().unwrap_or(Value::Null);
        Ok(Self {
            name: str_or(value, "name", ""),
            kind: i32_or(value, "kind", -1),
            uri: str_or(value, "uri", ""),
            detail: str_or(value, "detail", ""),
            range: decode_item_range(value, "range")?,
            selection_range: decode_item_range(value, "selectionRange")?,
            is_kernel: bool_or(&data, "isKernel", false),
            symbol_id: parse_symbol_id(&str_or(&data, "symbolId", "")),
        })
    }
}

impl ToJson for CallHierarchyItem {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "kind": self.kind,
            "uri": self.uri,
            "detail": self.detail,
            "range": range_json(self.range),
            "selectionRange": range_json(self.selection_range),
            "data": {
                "isKernel": self.is_kernel,
                "symbolId": self.symbol_id.to_string(),
            },
        })
    }
}

/// `typeHierarchy/supertypes` and `typeHierarchy/subtypes` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHierarchyRequestParams {
    /// The item the client is expanding.
    pub item: TypeHierarchyItem,
}

impl FromJson for TypeHierarchyRequestParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(Self { item: TypeHierarchyItem::from_json(require_object(value, "item")?)? })
    }
}

/// `callHierarchy/incomingCalls` and `callHierarchy/outgoingCalls`
/// parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallHierarchyRequestParams {
    /// The item the client is expanding.
    pub item: CallHierarchyItem,
}

impl FromJson for CallHierarchyRequestParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(Self { item: CallHierarchyItem::from_json(require_object(value, "item")?)? })
    }
}

/// A caller of the queried function with its call sites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallHierarchyIncomingCall {
    /// The calling declaration.
    pub from: CallHierarchyItem,
    /// Call-site ranges inside the caller.
    pub from_ranges: Vec<Range>,
}

impl ToJson for CallHierarchyIncomingCall {
    fn to_json(&self) -> Value {
        json!({
            "from": self.from.to_json(),
            "fromRanges": Value::Array(self.from_ranges.iter().map(|r| range_json(*r)).collect()),
        })
    }
}

/// A callee of the queried function with its call sites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallHierarchyOutgoingCall {
    /// The invoked declaration.
    pub to: CallHierarchyItem,
    /// Call-site ranges inside the queried function.
    pub from_ranges: Vec<Range>,
}

impl ToJson for CallHierarchyOutgoingCall {
    fn to_json(&self) -> Value {
        json!({
            "to": self.to.to_json(),
            "fromRanges": Value::Array(self.from_ranges.iter().map(|r| range_json(*r)).collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_position::Position;
    use pretty_assertions::assert_eq;

    fn sample_item() -> CallHierarchyItem {
        CallHierarchyItem {
            name: "run(Int64) : Unit".to_string(),
            kind: 12,
            uri: "file:///w/a/b/one.lm".to_string(),
            detail: "a.b.one.lm".to_string(),
            range: Range::new(Position::new(3, 0), Position::new(9, 1)),
            selection_range: Range::new(Position::new(3, 5), Position::new(3, 8)),
            is_kernel: false,
            symbol_id: SymbolId(18446744073709551615),
        }
    }

    #[test]
    fn test_call_item_round_trip_preserves_wide_id() {
        let item = sample_item();
        let decoded = CallHierarchyItem::from_json(&item.to_json()).expect("decode");
        assert_eq!(decoded, item);
        // the id is past 2^53, which a JSON number would have mangled
        assert_eq!(decoded.symbol_id, SymbolId(u64::MAX));
    }

    #[test]
    fn test_decode_encode_decode_is_stable() {
        let wire = sample_item().to_json();
        let once = CallHierarchyItem::from_json(&wire).expect("decode");
        let twice = CallHierarchyItem::from_json(&once.to_json()).expect("decode");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unparseable_symbol_id_becomes_invalid() {
        let mut wire = sample_item().to_json();
        wire["data"]["symbolId"] = Value::from("not-a-number");
        let decoded = CallHierarchyItem::from_json(&wire).expect("decode");
        assert_eq!(decoded.symbol_id, SymbolId::INVALID);
    }

    #[test]
    fn test_item_requires_ranges() {
        let bad = json!({"name": "x", "kind": 12, "uri": "file:///w/x.lm"});
        assert_eq!(
            CallHierarchyItem::from_json(&bad),
            Err(DecodeError::MissingField("range"))
        );
    }

    #[test]
    fn test_type_item_round_trip() {
        let item = TypeHierarchyItem {
            name: "Server".to_string(),
            kind: 5,
            uri: "file:///w/a/b/one.lm".to_string(),
            range: Range::new(Position::new(1, 0), Position::new(20, 1)),
            selection_range: Range::new(Position::new(1, 6), Position::new(1, 12)),
            is_kernel: false,
            is_child_or_super: true,
            symbol_id: SymbolId(42),
        };
        let decoded = TypeHierarchyItem::from_json(&item.to_json()).expect("decode");
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_request_params_unwrap_item() {
        let wire = json!({"item": sample_item().to_json()});
        let params = CallHierarchyRequestParams::from_json(&wire).expect("decode");
        assert_eq!(params.item.symbol_id, SymbolId(u64::MAX));
    }

    #[test]
    fn test_outgoing_call_encodes_empty_ranges_as_array() {
        let call = CallHierarchyOutgoingCall { to: sample_item(), from_ranges: vec![] };
        assert_eq!(call.to_json()["fromRanges"], json!([]));
    }
}
