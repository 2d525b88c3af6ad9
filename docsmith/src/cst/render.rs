//! Lossless serializer.

use super::tree::SourceDocument;

/// Renders the document's current tree.
///
/// Untouched regions come back byte-for-byte because every node stores its
/// text verbatim.
#[must_use]
pub fn render(doc: &SourceDocument) -> String {
    let mut out = String::with_capacity(doc.original().len() + 256);
    doc.root().write_to(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(source: &str) {
        let doc = SourceDocument::parse(source).unwrap();
        assert_eq!(render(&doc), source);
    }

    #[test]
    fn test_round_trip_plain() {
        round_trip("import os\n\n\ndef f(a, b=2, *args, c, **kw) -> int:\n    return a\n");
    }

    #[test]
    fn test_round_trip_crlf_and_tabs() {
        round_trip("class A:\r\n\tdef m(self):\r\n\t\tpass\r\n\r\n\r\nx = 1\r\n");
    }

    #[test]
    fn test_round_trip_comments_everywhere() {
        round_trip(
            "# head\n@dec  # trailing\ndef f():  # header comment\n    # first\n    x = 1  # inline\n    # dangling\n\n# tail\n",
        );
    }

    #[test]
    fn test_round_trip_no_trailing_newline() {
        round_trip("def f():\n    return 1");
    }

    #[test]
    fn test_round_trip_inline_bodies_and_continuations() {
        round_trip("def f(): pass\nclass C: x = 1; y = 2\nz = 1 + \\\n    2\n");
    }

    #[test]
    fn test_round_trip_nested_compounds() {
        round_trip(
            "if x:\n    def a():\n        pass\nelif y:\n    pass\nelse:\n    try:\n        import q\n    except ImportError as e:\n        raise\n    finally:\n        pass\nwhile True:\n    break\nelse:\n    pass\nwith open(p) as fh, open(q):\n    pass\nmatch cmd:\n    case [a, *rest]:\n        pass\n    case _:\n        pass\n",
        );
    }

    #[test]
    fn test_round_trip_unicode_and_strings() {
        round_trip(
            "s = '''multi\nline''' + \"é\"\n\ndef ü():\n    r'\\d' \"x\"\n    return f\"{s!r:>10}\"\n",
        );
    }
}
