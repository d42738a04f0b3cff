mod common;

use common::{snapshot_with_doc, DocBuilder};
use docstore_debugger::{DocumentView, ElementValue};
use paste::paste;

fn decode_single_field(bytes: &[u8]) -> ElementValue {
    let (snapshot, addr) = snapshot_with_doc(bytes);
    let doc = DocumentView::read(addr, &snapshot).unwrap();
    let fields: Vec<_> = doc.fields(&snapshot).unwrap().collect();
    assert_eq!(fields.len(), 1, "expected exactly one field");
    fields[0].value.clone()
}

macro_rules! verify_scalar_roundtrip {
    ($( $test_name:ident: $builder:ident($input:expr) =>
        $pattern:pat $(if $guard:expr)? ),+ $(,)?) => {
        $(
            paste! {
                #[test]
                fn [< roundtrip_ $test_name >]() {
                    let bytes =
                        DocBuilder::new().$builder("v", $input).build();
                    let value = decode_single_field(&bytes);
                    let matched = matches!(&value, $pattern $(if $guard)?);
                    assert!(matched, "decoded to {value}");
                }
            }
        )*
    };
}

verify_scalar_roundtrip! {
    double: double(2.75) => ElementValue::Double(v) if *v == 2.75,
    int32: int32(-12345) => ElementValue::Int32(-12345),
    int32_min: int32(i32::MIN) => ElementValue::Int32(i32::MIN),
    int64: int64(1 << 50) => ElementValue::Int64(v) if *v == 1 << 50,
    boolean_true: boolean(true) => ElementValue::Boolean(true),
    boolean_false: boolean(false) => ElementValue::Boolean(false),
    date: date(-473385600000) => ElementValue::DateTime(v)
        if v.millis_since_epoch() == -473385600000,
}

#[test]
fn roundtrip_string_contents() {
    let bytes = DocBuilder::new().string("v", "hello world").build();
    let ElementValue::String(text) = decode_single_field(&bytes) else {
        panic!("expected string");
    };
    assert_eq!(text, "hello world");
}

#[test]
fn roundtrip_empty_string() {
    let bytes = DocBuilder::new().string("v", "").build();
    let ElementValue::String(text) = decode_single_field(&bytes) else {
        panic!("expected string");
    };
    assert_eq!(text, "");
}

#[test]
fn roundtrip_object_id_bytes() {
    let id = [
        0x62, 0x2e, 0x1a, 0x9f, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
        0x77,
    ];
    let bytes = DocBuilder::new().object_id("v", &id).build();
    let ElementValue::ObjectId(decoded) = decode_single_field(&bytes) else {
        panic!("expected object id");
    };
    assert_eq!(decoded.bytes(), &id);
    assert_eq!(
        decoded.to_string(),
        "ObjectId(\"622e1a9f0011223344556677\")",
    );
}

#[test]
fn roundtrip_timestamp_fields() {
    let bytes = DocBuilder::new().timestamp("v", 1_650_000_000, 5).build();
    let ElementValue::Timestamp(ts) = decode_single_field(&bytes) else {
        panic!("expected timestamp");
    };
    assert_eq!(ts.seconds(), 1_650_000_000);
    assert_eq!(ts.ordinal(), 5);
    assert_eq!(ts.to_string(), "Timestamp(1650000000, 5)");
}

#[test]
fn roundtrip_decimal128_words() {
    let bytes = DocBuilder::new()
        .decimal128("v", 0x0123_4567_89ab_cdef, 0x3040_0000_0000_0000)
        .build();
    let ElementValue::Decimal128(decimal) = decode_single_field(&bytes)
    else {
        panic!("expected decimal128");
    };
    assert_eq!(decimal.low64(), 0x0123_4567_89ab_cdef);
    assert_eq!(decimal.high64(), 0x3040_0000_0000_0000);
}

#[test]
fn roundtrip_binary_payload() {
    let bytes = DocBuilder::new()
        .binary("v", 0x02, &[0xde, 0xad, 0xbe, 0xef])
        .build();
    let ElementValue::Binary(binary) = decode_single_field(&bytes) else {
        panic!("expected binary");
    };
    assert_eq!(binary.subtype, 0x02);
    assert_eq!(binary.bytes, [0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn uuid_subtype_decodes_as_uuid_value() {
    let uuid = [
        0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x11, 0x22, 0x33,
        0x44, 0x55, 0x66, 0x77, 0x88,
    ];
    let bytes = DocBuilder::new().uuid("v", &uuid).build();
    let ElementValue::Uuid(decoded) = decode_single_field(&bytes) else {
        panic!("expected uuid");
    };
    assert_eq!(decoded.bytes(), &uuid);
    assert_eq!(
        decoded.to_string(),
        "UUID(\"12345678-9abc-def0-1122-334455667788\")",
    );
}

#[test]
fn uuid_subtype_with_wrong_length_stays_binary() {
    let bytes = DocBuilder::new().binary("v", 0x04, &[1, 2, 3]).build();
    let value = decode_single_field(&bytes);
    assert!(matches!(value, ElementValue::Binary(_)));
}

#[test]
fn roundtrip_regex_pattern_and_flags() {
    let bytes = DocBuilder::new().regex("v", "^ab.*$", "imx").build();
    let ElementValue::Regex(regex) = decode_single_field(&bytes) else {
        panic!("expected regex");
    };
    assert_eq!(regex.pattern, "^ab.*$");
    assert_eq!(regex.flags, "imx");
    assert_eq!(regex.to_string(), "/^ab.*$/imx");
}

#[test]
fn roundtrip_regex_with_empty_flags() {
    let bytes = DocBuilder::new().regex("v", "x", "").build();
    let ElementValue::Regex(regex) = decode_single_field(&bytes) else {
        panic!("expected regex");
    };
    assert_eq!(regex.pattern, "x");
    assert_eq!(regex.flags, "");
}

#[test]
fn roundtrip_db_pointer() {
    let id = [0xab; 12];
    let bytes = DocBuilder::new()
        .db_pointer("v", "db.collection", &id)
        .build();
    let ElementValue::DbPointer(pointer) = decode_single_field(&bytes) else {
        panic!("expected db pointer");
    };
    assert_eq!(pointer.namespace, "db.collection");
    assert_eq!(pointer.id.bytes(), &id);
}

#[test]
fn roundtrip_javascript_and_symbol() {
    let bytes = DocBuilder::new()
        .javascript("j", "function() { return 1; }")
        .symbol("s", "interned")
        .build();
    let (snapshot, addr) = snapshot_with_doc(&bytes);
    let doc = DocumentView::read(addr, &snapshot).unwrap();
    let fields: Vec<_> = doc.fields(&snapshot).unwrap().collect();

    assert!(matches!(
        &fields[0].value,
        ElementValue::JavaScript(code) if code == "function() { return 1; }"
    ));
    assert!(matches!(
        &fields[1].value,
        ElementValue::Symbol(text) if text == "interned"
    ));
}

#[test]
fn roundtrip_code_with_scope() {
    let bytes = DocBuilder::new()
        .code_with_scope(
            "v",
            "emit(x)",
            DocBuilder::new().int32("x", 10),
        )
        .build();
    let (snapshot, addr) = snapshot_with_doc(&bytes);
    let doc = DocumentView::read(addr, &snapshot).unwrap();
    let fields: Vec<_> = doc.fields(&snapshot).unwrap().collect();

    let ElementValue::CodeWithScope(cws) = &fields[0].value else {
        panic!("expected code-with-scope");
    };
    assert_eq!(cws.code, "emit(x)");

    let scope_fields: Vec<_> = cws.scope.fields(&snapshot).unwrap().collect();
    assert_eq!(scope_fields.len(), 1);
    assert_eq!(scope_fields[0].name, "x");
    assert!(matches!(scope_fields[0].value, ElementValue::Int32(10)));
}

#[test]
fn literal_sentinels_are_zero_width() {
    // Four zero-width values in a row; any nonzero consumption would
    // shear the following fields.
    let bytes = DocBuilder::new()
        .undefined("a")
        .null("b")
        .min_key("c")
        .max_key("d")
        .int32("e", 1)
        .build();
    let (snapshot, addr) = snapshot_with_doc(&bytes);
    let doc = DocumentView::read(addr, &snapshot).unwrap();
    let fields: Vec<_> = doc.fields(&snapshot).unwrap().collect();

    assert_eq!(fields.len(), 5);
    assert!(matches!(fields[0].value, ElementValue::Undefined));
    assert!(matches!(fields[1].value, ElementValue::Null));
    assert!(matches!(fields[2].value, ElementValue::MinKey));
    assert!(matches!(fields[3].value, ElementValue::MaxKey));
    assert!(matches!(fields[4].value, ElementValue::Int32(1)));

    assert_eq!(fields[0].value.to_string(), "undefined");
    assert_eq!(fields[1].value.to_string(), "null");
    assert_eq!(fields[2].value.to_string(), "MinKey()");
    assert_eq!(fields[3].value.to_string(), "MaxKey()");
}

#[test]
fn corrupt_string_length_degrades_to_invalid() {
    // Declared string length of zero cannot hold its terminator.
    let mut value_bytes = Vec::new();
    value_bytes.extend_from_slice(&0i32.to_le_bytes());
    let bytes = DocBuilder::new()
        .raw_element(0x02, "v", &value_bytes)
        .int32("w", 3)
        .build();
    let (snapshot, addr) = snapshot_with_doc(&bytes);
    let doc = DocumentView::read(addr, &snapshot).unwrap();
    let fields: Vec<_> = doc.fields(&snapshot).unwrap().collect();

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "v");
    assert!(matches!(fields[0].value, ElementValue::Invalid));
}
