//! Conversion between [`Value`] and `<value>` fragments
//!
//! Reading works on the owned [`Element`] tree; writing streams events into
//! a `quick_xml::Writer`. Tags are written without attributes, integers always
//! as `<int>` and booleans as `true`/`false`.

use crate::binary::Base64;
use crate::datetime::DateTime;
use crate::document::Element;
use crate::error::ValueError;
use crate::value::{Struct, Value};
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::Write;

/// Reads a `<value>` element.
///
/// A missing element yields [`Value::Nil`]. An element without a typed
/// child is an implicit string.
///
/// # Examples
///
/// ```
/// use xmlrpc_core::{Document, Value, parse_value};
///
/// let doc = Document::parse("<value><i4>41</i4></value>").unwrap();
/// assert_eq!(parse_value(Some(doc.root())).unwrap(), Value::Int(41));
///
/// let doc = Document::parse("<value>South Dakota</value>").unwrap();
/// assert_eq!(parse_value(Some(doc.root())).unwrap(), Value::from("South Dakota"));
/// ```
pub fn parse_value(element: Option<&Element>) -> Result<Value, ValueError> {
    let Some(element) = element else {
        return Ok(Value::Nil);
    };
    let Some(typed) = element.first_child() else {
        return Ok(Value::String(element.text().unwrap_or_default().to_string()));
    };

    let text = typed.text().unwrap_or_default();
    match typed.name() {
        "string" => Ok(Value::String(text.to_string())),
        "int" | "i4" => parse_int(text).map(Value::Int),
        "boolean" => Ok(Value::Bool(text == "1" || text == "true")),
        "double" => parse_double(text).map(Value::Double),
        "dateTime.iso8601" => DateTime::parse(text).map(Value::DateTime),
        "base64" => Ok(Value::Base64(Base64::from_encoded(text))),
        "array" => typed
            .find_all("data/value")
            .into_iter()
            .map(|item| parse_value(Some(item)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "struct" => {
            let mut members = Struct::new();
            for member in typed.children("member") {
                let name = member.child("name").and_then(Element::text).unwrap_or_default();
                members.insert(name.to_string(), parse_value(member.child("value"))?);
            }
            Ok(Value::Struct(members))
        }
        other => Err(ValueError::UnknownType(other.to_string())),
    }
}

fn parse_int(text: &str) -> Result<i64, ValueError> {
    text.trim().parse().map_err(|_| ValueError::InvalidScalar {
        kind: "int",
        text: text.to_string(),
    })
}

fn parse_double(text: &str) -> Result<f64, ValueError> {
    text.trim().parse().map_err(|_| ValueError::InvalidScalar {
        kind: "double",
        text: text.to_string(),
    })
}

/// Writes the typed child of a `<value>` element.
///
/// The caller writes the surrounding `<value>` tags, and must skip them when
/// the value is [`Value::Nil`], for which nothing is written.
///
/// # Examples
///
/// ```
/// use quick_xml::Writer;
/// use xmlrpc_core::{Value, build_value};
///
/// let mut writer = Writer::new(Vec::new());
/// build_value(&mut writer, &Value::Bool(false)).unwrap();
/// assert_eq!(writer.into_inner(), b"<boolean>false</boolean>");
/// ```
pub fn build_value<W: Write>(writer: &mut Writer<W>, value: &Value) -> Result<(), ValueError> {
    match value {
        Value::Nil => Ok(()),
        Value::Bool(b) => write_text_element(writer, "boolean", if *b { "true" } else { "false" }),
        Value::Int(i) => write_text_element(writer, "int", &i.to_string()),
        Value::Double(d) => write_text_element(writer, "double", &d.to_string()),
        Value::String(s) => write_text_element(writer, "string", s),
        Value::DateTime(dt) => write_text_element(writer, "dateTime.iso8601", &dt.to_iso8601()?),
        Value::Base64(b) => write_text_element(writer, "base64", b.encoded()),
        Value::Array(items) => {
            open(writer, "array")?;
            open(writer, "data")?;
            for item in items.iter().filter(|v| !v.is_nil()) {
                write_value(writer, item)?;
            }
            close(writer, "data")?;
            close(writer, "array")
        }
        Value::Struct(members) => {
            open(writer, "struct")?;
            for (name, member) in members.iter().filter(|(_, v)| !v.is_nil()) {
                open(writer, "member")?;
                write_text_element(writer, "name", name)?;
                write_value(writer, member)?;
                close(writer, "member")?;
            }
            close(writer, "struct")
        }
    }
}

/// Writes `<value>…</value>`, or nothing for [`Value::Nil`].
pub(crate) fn write_value<W: Write>(writer: &mut Writer<W>, value: &Value) -> Result<(), ValueError> {
    if value.is_nil() {
        return Ok(());
    }
    open(writer, "value")?;
    build_value(writer, value)?;
    close(writer, "value")
}

pub(crate) fn open<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), ValueError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| ValueError::Write(e.to_string()))
}

pub(crate) fn close<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), ValueError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| ValueError::Write(e.to_string()))
}

pub(crate) fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), ValueError> {
    open(writer, name)?;
    // Always emitted, even when empty, so the closing tag stays on the same line.
    writer
        .write_event(Event::Text(BytesText::from_escaped(escape_text(text))))
        .map_err(|e| ValueError::Write(e.to_string()))?;
    close(writer, name)
}

/// Escapes markup characters, and carriage returns as `&#13;` since a
/// parser folds a literal CR into a line feed.
fn escape_text(text: &str) -> Cow<'_, str> {
    let escaped = partial_escape(text);
    if escaped.contains('\r') {
        Cow::Owned(escaped.replace('\r', "&#13;"))
    } else {
        escaped
    }
}

/// A writer over an in-memory buffer, indenting by `indent` spaces per level.
pub(crate) fn new_writer(indent: usize) -> Writer<Vec<u8>> {
    if indent > 0 {
        Writer::new_with_indent(Vec::new(), b' ', indent)
    } else {
        Writer::new(Vec::new())
    }
}

/// Finishes a document written by [`new_writer`]. Indented documents end
/// with a newline.
pub(crate) fn finish(writer: Writer<Vec<u8>>, indent: usize) -> Result<String, ValueError> {
    let mut xml =
        String::from_utf8(writer.into_inner()).map_err(|e| ValueError::Write(e.to_string()))?;
    if indent > 0 {
        xml.push('\n');
    }
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use time::macros::{date, datetime};

    fn parse(xml: &str) -> Result<Value, ValueError> {
        let doc = Document::parse(xml).unwrap();
        parse_value(Some(doc.root()))
    }

    fn build(value: &Value) -> String {
        let mut writer = new_writer(0);
        build_value(&mut writer, value).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse("<param>value</param>").unwrap(), Value::from("value"));
        assert_eq!(parse("<param><boolean>true</boolean></param>").unwrap(), Value::Bool(true));
        assert_eq!(parse("<param><int>1</int></param>").unwrap(), Value::Int(1));
        assert_eq!(parse("<param><i4>1</i4></param>").unwrap(), Value::Int(1));
        assert_eq!(parse("<param><double>1.1</double></param>").unwrap(), Value::Double(1.1));
    }

    #[test]
    fn test_parse_boolean_literals() {
        for (text, expected) in [
            ("1", true),
            ("true", true),
            ("0", false),
            ("false", false),
            ("", false),
            ("TRUE", false),
            ("yes", false),
        ] {
            let xml = format!("<value><boolean>{}</boolean></value>", text);
            assert_eq!(parse(&xml).unwrap(), Value::Bool(expected), "text {:?}", text);
        }
    }

    #[test]
    fn test_parse_empty_implicit_string() {
        assert_eq!(parse("<value></value>").unwrap(), Value::from(""));
        assert_eq!(parse("<value><string/></value>").unwrap(), Value::from(""));
    }

    #[test]
    fn test_parse_missing_element_is_nil() {
        assert_eq!(parse_value(None).unwrap(), Value::Nil);
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = parse("<value><nil/></value>").unwrap_err();
        assert_eq!(err, ValueError::UnknownType("nil".to_string()));
    }

    #[test]
    fn test_parse_bad_int() {
        let err = parse("<value><int>forty-one</int></value>").unwrap_err();
        assert!(matches!(err, ValueError::InvalidScalar { kind: "int", .. }));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse("<param>\n  <dateTime.iso8601>2001-01-01T13:01</dateTime.iso8601>\n</param>")
                .unwrap(),
            Value::DateTime(DateTime::from(datetime!(2001-01-01 13:01 UTC)))
        );
    }

    #[test]
    fn test_parse_base64_lazily() {
        let value = parse("<param><base64>eW91IGNhbid0IHJlYWQgdGhpcyE=</base64></param>").unwrap();
        let payload = value.as_base64().unwrap().decode().unwrap();
        assert_eq!(payload, b"you can't read this!");

        // Undecodable text still parses; the error shows up on decode.
        let value = parse("<param><base64>@@@</base64></param>").unwrap();
        assert!(value.as_base64().unwrap().decode().is_err());
    }

    #[test]
    fn test_parse_array() {
        let value = parse(
            "<param>
               <array>
                 <data>
                   <value><i4>12</i4></value>
                   <value><string>Egypt</string></value>
                   <value><boolean>0</boolean></value>
                   <value><i4>-31</i4></value>
                 </data>
               </array>
             </param>",
        )
        .unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Int(12),
                Value::from("Egypt"),
                Value::Bool(false),
                Value::Int(-31),
            ])
        );
    }

    #[test]
    fn test_parse_struct() {
        let value = parse(
            "<param>
               <struct>
                 <member><name>lowerBound</name><value><i4>18</i4></value></member>
                 <member><name>upperBound</name><value><i4>139</i4></value></member>
               </struct>
             </param>",
        )
        .unwrap();
        let members = value.as_struct().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members["lowerBound"], Value::Int(18));
        assert_eq!(members["upperBound"], Value::Int(139));
    }

    #[test]
    fn test_parse_nested_struct() {
        let value = parse(
            "<param><struct><member><name>Joe</name><value>\
             <struct><member><name>Mode</name><value>Bike</value></member></struct>\
             </value></member></struct></param>",
        )
        .unwrap();
        let joe = value.as_struct().unwrap()["Joe"].as_struct().unwrap();
        assert_eq!(joe["Mode"], Value::from("Bike"));
    }

    #[test]
    fn test_parse_duplicate_members() {
        let value = parse(
            "<value><struct>\
             <member><name>a</name><value><int>1</int></value></member>\
             <member><name>a</name><value><int>2</int></value></member>\
             </struct></value>",
        )
        .unwrap();
        let members = value.as_struct().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members["a"], Value::Int(2));
    }

    #[test]
    fn test_parse_unknown_type_inside_array() {
        let err = parse("<value><array><data><value><bigint>1</bigint></value></data></array></value>")
            .unwrap_err();
        assert_eq!(err, ValueError::UnknownType("bigint".to_string()));
    }

    #[test]
    fn test_build_scalars() {
        assert_eq!(build(&Value::from("OHNOES!")), "<string>OHNOES!</string>");
        assert_eq!(build(&Value::Bool(false)), "<boolean>false</boolean>");
        assert_eq!(build(&Value::Bool(true)), "<boolean>true</boolean>");
        assert_eq!(build(&Value::Int(1)), "<int>1</int>");
        assert_eq!(build(&Value::Double(1.1)), "<double>1.1</double>");
        assert_eq!(build(&Value::Nil), "");
    }

    #[test]
    fn test_build_escapes_text() {
        assert_eq!(
            build(&Value::from("a < b & c")),
            "<string>a &lt; b &amp; c</string>"
        );
    }

    #[test]
    fn test_build_dates() {
        assert_eq!(
            build(&Value::DateTime(DateTime::date(date!(2004 - 09 - 13)))),
            "<dateTime.iso8601>2004-09-13</dateTime.iso8601>"
        );
        assert_eq!(
            build(&Value::DateTime(DateTime::from(datetime!(2004-09-13 00:00 UTC)))),
            "<dateTime.iso8601>2004-09-13T00:00:00Z</dateTime.iso8601>"
        );
        assert_eq!(
            build(&Value::DateTime(DateTime::from(datetime!(2004-09-13 02:38 UTC)))),
            "<dateTime.iso8601>2004-09-13T02:38:00Z</dateTime.iso8601>"
        );
    }

    #[test]
    fn test_build_base64() {
        assert_eq!(
            build(&Value::Base64(Base64::encode("you can't read this!"))),
            "<base64>eW91IGNhbid0IHJlYWQgdGhpcyE=</base64>"
        );
    }

    #[test]
    fn test_build_array() {
        let value = Value::Array(vec![Value::from("a"), Value::Int(1), Value::Bool(true)]);
        assert_eq!(
            build(&value),
            "<array><data><value><string>a</string></value><value><int>1</int></value>\
             <value><boolean>true</boolean></value></data></array>"
        );
    }

    #[test]
    fn test_build_nested_array() {
        let value = Value::Array(vec![
            Value::from("a"),
            Value::Array(vec![Value::Int(1), Value::Bool(true)]),
        ]);
        assert_eq!(
            build(&value),
            "<array><data><value><string>a</string></value><value><array><data>\
             <value><int>1</int></value><value><boolean>true</boolean></value>\
             </data></array></value></data></array>"
        );
    }

    #[test]
    fn test_build_struct() {
        let value: Value = [("a", Value::Int(1)), ("b", Value::Bool(true))]
            .into_iter()
            .collect();
        assert_eq!(
            build(&value),
            "<struct><member><name>a</name><value><int>1</int></value></member>\
             <member><name>b</name><value><boolean>true</boolean></value></member></struct>"
        );
    }

    #[test]
    fn test_build_nested_struct() {
        let inner: Value = [("b", Value::Int(1))].into_iter().collect();
        let value: Value = [("a", inner)].into_iter().collect();
        assert_eq!(
            build(&value),
            "<struct><member><name>a</name><value><struct><member><name>b</name>\
             <value><int>1</int></value></member></struct></value></member></struct>"
        );
    }

    #[test]
    fn test_build_skips_nil_entries() {
        let array = Value::Array(vec![Value::Int(1), Value::Nil, Value::Int(2)]);
        assert_eq!(
            build(&array),
            "<array><data><value><int>1</int></value><value><int>2</int></value></data></array>"
        );

        let members: Value = [("a", Value::Nil), ("b", Value::Int(2))].into_iter().collect();
        assert_eq!(
            build(&members),
            "<struct><member><name>b</name><value><int>2</int></value></member></struct>"
        );
    }

    #[test]
    fn test_carriage_returns_are_written_as_references() {
        assert_eq!(
            build(&Value::from("a\r\nb\rc")),
            "<string>a&#13;\nb&#13;c</string>"
        );
        let back = parse(&format!("<value>{}</value>", build(&Value::from("a\r\nb\rc"))));
        assert_eq!(back.unwrap(), Value::from("a\r\nb\rc"));
    }

    #[test]
    fn test_round_trip_preserves_types() {
        let original: Value = [
            ("name", Value::from("Joe & Co")),
            ("age", Value::Int(-41)),
            ("ratio", Value::Double(0.1)),
            ("whole", Value::Double(3.0)),
            ("active", Value::Bool(true)),
            ("born", Value::DateTime(DateTime::date(date!(1970 - 01 - 01)))),
            (
                "seen",
                Value::DateTime(DateTime::from(datetime!(2024-02-29 23:59:59 +05:30))),
            ),
            ("blob", Value::Base64(Base64::encode([0u8, 159, 146, 150]))),
            ("empty", Value::from("")),
            ("lines", Value::from("line1\r\nline2\rend\n")),
            (
                "tags",
                Value::Array(vec![Value::from("x"), Value::Array(vec![])]),
            ),
        ]
        .into_iter()
        .collect();

        let xml = format!("<value>{}</value>", build(&original));
        assert_eq!(parse(&xml).unwrap(), original);
    }
}
