//! XPath 1.0 Functions
//!
//! The core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name(), id()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::value::{string_to_number, XPathValue};
use crate::dom::namespace::ns;
use crate::dom::{self, DocumentAccess, NodeId};
use crate::error::XPathError;

/// Evaluate a function call
pub fn call<D: DocumentAccess>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    position: usize,
    size: usize,
) -> Result<XPathValue, XPathError> {
    match name {
        // Node Set Functions
        "position" => {
            arity(name, &args, 0, Some(0))?;
            Ok(XPathValue::Number(position as f64))
        }
        "last" => {
            arity(name, &args, 0, Some(0))?;
            Ok(XPathValue::Number(size as f64))
        }
        "count" => fn_count(args),
        "local-name" => fn_node_name(name, args, doc, context, |d, n| d.node_local_name(n)),
        "namespace-uri" => fn_node_name(name, args, doc, context, |d, n| d.node_namespace_uri(n)),
        "name" => fn_node_name(name, args, doc, context, |d, n| d.node_name(n)),
        "id" => Err(XPathError::Evaluation(
            "id() is not supported: documents carry no ID attribute types".to_string(),
        )),

        // String Functions
        "string" => fn_string(args, doc, context),
        "concat" => fn_concat(args, doc),
        "starts-with" => {
            let [s, prefix] = two_strings(name, args, doc)?;
            Ok(XPathValue::Boolean(s.starts_with(&prefix)))
        }
        "contains" => {
            let [s, pattern] = two_strings(name, args, doc)?;
            Ok(XPathValue::Boolean(s.contains(&pattern)))
        }
        "substring" => fn_substring(args, doc),
        "substring-before" => {
            let [s, pattern] = two_strings(name, args, doc)?;
            let result = s.find(&pattern).map(|pos| &s[..pos]).unwrap_or("");
            Ok(XPathValue::String(result.to_string()))
        }
        "substring-after" => {
            let [s, pattern] = two_strings(name, args, doc)?;
            let result = s
                .find(&pattern)
                .map(|pos| &s[pos + pattern.len()..])
                .unwrap_or("");
            Ok(XPathValue::String(result.to_string()))
        }
        "string-length" => {
            let s = string_or_context(name, args, doc, context)?;
            Ok(XPathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            let s = string_or_context(name, args, doc, context)?;
            Ok(XPathValue::String(normalize_space(&s)))
        }
        "translate" => fn_translate(args, doc),

        // Boolean Functions
        "boolean" => {
            arity(name, &args, 1, Some(1))?;
            Ok(XPathValue::Boolean(args[0].to_boolean()))
        }
        "not" => {
            arity(name, &args, 1, Some(1))?;
            Ok(XPathValue::Boolean(!args[0].to_boolean()))
        }
        "true" => {
            arity(name, &args, 0, Some(0))?;
            Ok(XPathValue::Boolean(true))
        }
        "false" => {
            arity(name, &args, 0, Some(0))?;
            Ok(XPathValue::Boolean(false))
        }
        "lang" => fn_lang(args, doc, context),

        // Number Functions
        "number" => {
            arity(name, &args, 0, Some(1))?;
            let value = match args.first() {
                Some(arg) => arg.to_number(doc),
                None => string_to_number(&dom::node_string_value(doc, context)),
            };
            Ok(XPathValue::Number(value))
        }
        "sum" => fn_sum(args, doc),
        "floor" => one_number(name, args, doc, f64::floor),
        "ceiling" => one_number(name, args, doc, f64::ceil),
        "round" => one_number(name, args, doc, xpath_round),

        _ => Err(XPathError::Evaluation(format!("Unknown function: {}()", name))),
    }
}

fn arity(name: &str, args: &[XPathValue], min: usize, max: Option<usize>) -> Result<(), XPathError> {
    let n = args.len();
    if n < min || max.is_some_and(|max| n > max) {
        let expected = match max {
            Some(max) if max == min => format!("{}", min),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        return Err(XPathError::Evaluation(format!(
            "{}() expects {} argument(s), got {}",
            name, expected, n
        )));
    }
    Ok(())
}

fn node_set_arg<'v>(name: &str, value: &'v XPathValue) -> Result<&'v Vec<NodeId>, XPathError> {
    value.as_nodeset().ok_or_else(|| {
        XPathError::Evaluation(format!(
            "{}() argument must be a node-set, got a {}",
            name,
            value.type_name()
        ))
    })
}

// Node Set Functions

fn fn_count(args: Vec<XPathValue>) -> Result<XPathValue, XPathError> {
    arity("count", &args, 1, Some(1))?;
    let nodes = node_set_arg("count", &args[0])?;
    Ok(XPathValue::Number(nodes.len() as f64))
}

/// local-name(), namespace-uri() and name(): first node of the argument,
/// or the context node when called without one
fn fn_node_name<D, F>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    get: F,
) -> Result<XPathValue, XPathError>
where
    D: DocumentAccess,
    F: for<'d> Fn(&'d D, NodeId) -> Option<&'d str>,
{
    arity(name, &args, 0, Some(1))?;
    let node = match args.first() {
        None => Some(context),
        Some(arg) => node_set_arg(name, arg)?.first().copied(),
    };
    let value = node.and_then(|n| get(doc, n)).unwrap_or("");
    Ok(XPathValue::String(value.to_string()))
}

// String Functions

fn fn_string<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, XPathError> {
    string_or_context("string", args, doc, context).map(XPathValue::String)
}

/// The single argument as a string, or the context node's string-value
fn string_or_context<D: DocumentAccess>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<String, XPathError> {
    arity(name, &args, 0, Some(1))?;
    Ok(match args.first() {
        Some(arg) => arg.to_string_value(doc),
        None => dom::node_string_value(doc, context),
    })
}

fn two_strings<D: DocumentAccess>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<[String; 2], XPathError> {
    arity(name, &args, 2, Some(2))?;
    Ok([args[0].to_string_value(doc), args[1].to_string_value(doc)])
}

fn fn_concat<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, XPathError> {
    arity("concat", &args, 2, None)?;
    let result: String = args.iter().map(|a| a.to_string_value(doc)).collect();
    Ok(XPathValue::String(result))
}

/// substring(s, start, len?): characters whose 1-based position p satisfies
/// round(start) <= p < round(start) + round(len). NaN bounds select nothing.
fn fn_substring<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, XPathError> {
    arity("substring", &args, 2, Some(3))?;

    let s = args[0].to_string_value(doc);
    let start = xpath_round(args[1].to_number(doc));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.to_number(doc)),
        None => f64::INFINITY,
    };

    let result: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();

    Ok(XPathValue::String(result))
}

/// Strip leading and trailing XML whitespace, collapse inner runs to one space
fn normalize_space(s: &str) -> String {
    s.split(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn fn_translate<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, XPathError> {
    arity("translate", &args, 3, Some(3))?;

    let s = args[0].to_string_value(doc);
    let from: Vec<char> = args[1].to_string_value(doc).chars().collect();
    let to: Vec<char> = args[2].to_string_value(doc).chars().collect();

    // The first occurrence of a character in `from` decides its mapping
    let result: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();

    Ok(XPathValue::String(result))
}

// Boolean Functions

/// lang(): the nearest xml:lang on the context node or its ancestors
fn fn_lang<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, XPathError> {
    arity("lang", &args, 1, Some(1))?;
    let target = args[0].to_string_value(doc).to_lowercase();

    let mut node = Some(context);
    while let Some(current) = node {
        if let Some(lang) = doc.get_attribute_ns(current, ns::XML, "lang") {
            let lang = lang.to_lowercase();
            let matched = lang == target
                || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'));
            return Ok(XPathValue::Boolean(matched));
        }
        node = doc.parent_of(current);
    }
    Ok(XPathValue::Boolean(false))
}

// Number Functions

fn fn_sum<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, XPathError> {
    arity("sum", &args, 1, Some(1))?;
    let nodes = node_set_arg("sum", &args[0])?;
    let total = nodes
        .iter()
        .map(|&n| string_to_number(&dom::node_string_value(doc, n)))
        .sum();
    Ok(XPathValue::Number(total))
}

fn one_number<D: DocumentAccess>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    f: fn(f64) -> f64,
) -> Result<XPathValue, XPathError> {
    arity(name, &args, 1, Some(1))?;
    Ok(XPathValue::Number(f(args[0].to_number(doc))))
}

/// XPath round(): halves go towards positive infinity, and values in
/// [-0.5, 0) round to negative zero
pub(crate) fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn strings(values: &[&str]) -> Vec<XPathValue> {
        values.iter().map(|&v| XPathValue::from(v)).collect()
    }

    fn empty_doc() -> XmlDocument {
        XmlDocument::parse_str("<r/>").unwrap()
    }

    fn eval_str(doc: &XmlDocument, name: &str, args: Vec<XPathValue>) -> String {
        call(name, args, doc, 0, 1, 1).unwrap().to_string_value(doc)
    }

    #[test]
    fn test_concat() {
        let doc = empty_doc();
        assert_eq!(eval_str(&doc, "concat", strings(&["hello", " ", "world"])), "hello world");
        assert!(call("concat", strings(&["only"]), &doc, 0, 1, 1).is_err());
    }

    #[test]
    fn test_contains_and_starts_with() {
        let doc = empty_doc();
        assert!(call("contains", strings(&["hello world", "world"]), &doc, 0, 1, 1)
            .unwrap()
            .to_boolean());
        assert!(!call("starts-with", strings(&["hello", "world"]), &doc, 0, 1, 1)
            .unwrap()
            .to_boolean());
    }

    #[test]
    fn test_substring() {
        let doc = empty_doc();
        let args = vec![XPathValue::from("hello"), XPathValue::Number(2.0), XPathValue::Number(3.0)];
        assert_eq!(eval_str(&doc, "substring", args), "ell");

        let args = vec![XPathValue::from("12345"), XPathValue::Number(1.5), XPathValue::Number(2.6)];
        assert_eq!(eval_str(&doc, "substring", args), "234");

        let args = vec![XPathValue::from("12345"), XPathValue::Number(0.0), XPathValue::Number(3.0)];
        assert_eq!(eval_str(&doc, "substring", args), "12");

        let args = vec![XPathValue::from("12345"), XPathValue::Number(f64::NAN)];
        assert_eq!(eval_str(&doc, "substring", args), "");

        let args = vec![
            XPathValue::from("12345"),
            XPathValue::Number(f64::NEG_INFINITY),
            XPathValue::Number(f64::INFINITY),
        ];
        assert_eq!(eval_str(&doc, "substring", args), "");
    }

    #[test]
    fn test_substring_before_after() {
        let doc = empty_doc();
        assert_eq!(eval_str(&doc, "substring-before", strings(&["1999/04/01", "/"])), "1999");
        assert_eq!(eval_str(&doc, "substring-after", strings(&["1999/04/01", "/"])), "04/01");
        assert_eq!(eval_str(&doc, "substring-after", strings(&["abc", "x"])), "");
    }

    #[test]
    fn test_normalize_space() {
        let doc = empty_doc();
        assert_eq!(eval_str(&doc, "normalize-space", strings(&["  hello \n  world  "])), "hello world");
    }

    #[test]
    fn test_translate() {
        let doc = empty_doc();
        assert_eq!(eval_str(&doc, "translate", strings(&["bar", "abc", "ABC"])), "BAr");
        assert_eq!(eval_str(&doc, "translate", strings(&["--aaa--", "abc-", "ABC"])), "AAA");
    }

    #[test]
    fn test_round() {
        assert_eq!(xpath_round(2.5), 3.0);
        assert_eq!(xpath_round(-2.5), -2.0);
        assert!(xpath_round(-0.3).is_sign_negative());
        assert!(xpath_round(f64::NAN).is_nan());
    }

    #[test]
    fn test_sum_and_count() {
        let doc = XmlDocument::parse_str("<r><n>1</n><n>2.5</n></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let nodes = XPathValue::NodeSet(doc.children_vec(root));
        assert_eq!(call("sum", vec![nodes.clone()], &doc, 0, 1, 1).unwrap(), XPathValue::Number(3.5));
        assert_eq!(call("count", vec![nodes], &doc, 0, 1, 1).unwrap(), XPathValue::Number(2.0));
        assert!(call("count", strings(&["x"]), &doc, 0, 1, 1).is_err());
    }

    #[test]
    fn test_id_is_rejected() {
        let doc = empty_doc();
        let result = call("id", strings(&["foo"]), &doc, 0, 1, 1);
        assert!(matches!(result, Err(XPathError::Evaluation(msg)) if msg.contains("not supported")));
    }

    #[test]
    fn test_unknown_function() {
        let doc = empty_doc();
        assert!(matches!(
            call("frobnicate", vec![], &doc, 0, 1, 1),
            Err(XPathError::Evaluation(_))
        ));
    }

    #[test]
    fn test_lang_matches_xml_lang_attribute() {
        let doc = XmlDocument::parse_str("<root xml:lang=\"en-US\"><child/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        let child = doc.children_vec(root)[0];
        for (lang, expected) in [("en", true), ("EN-us", true), ("fr", false), ("e", false)] {
            let result = call("lang", strings(&[lang]), &doc, child, 1, 1).unwrap();
            assert_eq!(result.to_boolean(), expected, "lang('{}')", lang);
        }
    }

    #[test]
    fn test_namespace_uri_and_names() {
        let doc = XmlDocument::parse_str("<root xmlns:ns=\"http://example.com\"><ns:child/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        let child = doc.children_vec(root)[0];
        let arg = || vec![XPathValue::single_node(child)];
        assert_eq!(eval_str(&doc, "namespace-uri", arg()), "http://example.com");
        assert_eq!(eval_str(&doc, "local-name", arg()), "child");
        assert_eq!(eval_str(&doc, "name", arg()), "ns:child");
        assert_eq!(eval_str(&doc, "name", vec![XPathValue::empty_nodeset()]), "");
    }

    #[test]
    fn test_arity_errors() {
        let doc = empty_doc();
        assert!(call("true", strings(&["x"]), &doc, 0, 1, 1).is_err());
        assert!(call("not", vec![], &doc, 0, 1, 1).is_err());
        assert!(call("substring", strings(&["a"]), &doc, 0, 1, 1).is_err());
    }
}
