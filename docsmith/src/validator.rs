//! Model response validation.
//!
//! Turns raw completion text into a docstring body that can be emitted as a
//! triple-quoted literal without changing the meaning of the file.

use crate::constants::FENCE_RE;
use crate::prompt::DocstringTemplate;

/// Why a response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Nothing left after stripping.
    #[error("response is empty")]
    Empty,
    /// No delimiter can hold the text.
    #[error("response cannot be quoted safely: {0}")]
    UnsafeContent(String),
    /// Looked like the JSON template but did not parse.
    #[error("response is not a valid docstring template: {0}")]
    Malformed(String),
    /// The model returned the template with placeholders intact.
    #[error("response left template placeholders unfilled")]
    UnfilledTemplate,
}

/// Triple-quote delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `"""`
    Double,
    /// `'''`
    Single,
}

impl Delimiter {
    /// The three-character delimiter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Double => "\"\"\"",
            Self::Single => "'''",
        }
    }

    /// The quote character the delimiter is made of.
    #[must_use]
    pub const fn quote_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
        }
    }
}

/// How the literal is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteStyle {
    /// Triple-quote flavour.
    pub delimiter: Delimiter,
    /// Emit an `r` prefix.
    pub raw: bool,
}

impl QuoteStyle {
    /// Opening text, prefix included.
    #[must_use]
    pub fn open(&self) -> String {
        let prefix = if self.raw { "r" } else { "" };
        format!("{prefix}{}", self.delimiter.as_str())
    }

    /// Closing text.
    #[must_use]
    pub const fn close(&self) -> &'static str {
        self.delimiter.as_str()
    }
}

/// A validated docstring payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Docstring {
    /// Lines without terminators or trailing whitespace; never empty.
    pub body_lines: Vec<String>,
    /// Delimiters that keep the text intact.
    pub quote_style: QuoteStyle,
}

impl Docstring {
    /// Single-line docstrings render as `"""Text."""`.
    #[must_use]
    pub fn is_single_line(&self) -> bool {
        self.body_lines.len() == 1
    }
}

/// Validates a raw completion.
///
/// # Errors
/// See [`ValidationError`]; every variant is recoverable by skipping the
/// definition.
pub fn validate(raw: &str) -> Result<Docstring, ValidationError> {
    let mut text = strip_chatter(raw);

    if text.starts_with('{') {
        let template: DocstringTemplate =
            serde_json::from_str(&text).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        if template.has_unfilled_slot() {
            return Err(ValidationError::UnfilledTemplate);
        }
        text = render_template(&template);
    }

    let body_lines = normalize(&text);
    if body_lines.is_empty() {
        return Err(ValidationError::Empty);
    }

    let quote_style = choose_quotes(&body_lines)?;
    Ok(Docstring {
        body_lines,
        quote_style,
    })
}

/// Peels fences and enclosing triple quotes until nothing changes.
fn strip_chatter(raw: &str) -> String {
    let mut text = raw.trim().to_owned();
    loop {
        let peeled = peel_once(&text);
        if peeled == text {
            return text;
        }
        text = peeled;
    }
}

fn peel_once(text: &str) -> String {
    if let Some(inner) = FENCE_RE().captures(text).and_then(|caps| caps.get(1)) {
        return inner.as_str().trim().to_owned();
    }
    let unprefixed = text.trim_start_matches(['r', 'R', 'u', 'U']);
    for delimiter in [Delimiter::Double, Delimiter::Single] {
        let quotes = delimiter.as_str();
        if unprefixed.len() >= 2 * quotes.len()
            && unprefixed.starts_with(quotes)
            && unprefixed.ends_with(quotes)
        {
            return unprefixed[quotes.len()..unprefixed.len() - quotes.len()]
                .trim()
                .to_owned();
        }
    }
    text.to_owned()
}

/// Renders a filled template with `Parameters:` and `Returns:` sections.
#[must_use]
pub fn render_template(template: &DocstringTemplate) -> String {
    let mut out = template.docstring.trim().to_owned();

    let args: Vec<String> = template
        .args
        .iter()
        .flatten()
        .map(|arg| {
            let mut line = match &arg.annotation {
                Some(annotation) => {
                    format!("    {} ({annotation}): {}", arg.name, arg.description.trim())
                }
                None => format!("    {}: {}", arg.name, arg.description.trim()),
            };
            if let Some(default) = &arg.default {
                line.push_str(&format!(" (default {default})"));
            }
            line
        })
        .collect();
    if !args.is_empty() {
        out.push_str("\n\nParameters:\n-----------\n\n");
        out.push_str(&args.join("\n"));
    }

    if let Some(ret) = &template.ret {
        let description = ret.description.trim();
        let line = match ret.annotation.as_deref() {
            Some(annotation) if !annotation.is_empty() => format!("{annotation} : {description}"),
            _ => description.to_owned(),
        };
        if !line.is_empty() {
            out.push_str("\n\nReturns:\n--------\n\n    ");
            out.push_str(&line);
        }
    }
    out
}

/// Unifies line endings, drops control characters and trailing whitespace,
/// removes common indentation (the first line excepted) and trims blank
/// edge lines.
fn normalize(text: &str) -> Vec<String> {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = unified
        .split('\n')
        .map(|line| {
            line.chars()
                .filter(|c| !c.is_control() || *c == '\t')
                .collect::<String>()
                .trim_end()
                .to_owned()
        })
        .collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    for (i, line) in lines.iter_mut().enumerate() {
        *line = if i == 0 {
            line.trim_start().to_owned()
        } else {
            line.chars().skip(margin).collect()
        };
    }

    while lines.first().is_some_and(String::is_empty) {
        lines.remove(0);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

fn choose_quotes(lines: &[String]) -> Result<QuoteStyle, ValidationError> {
    let text = lines.join("\n");
    let single_line = lines.len() == 1;
    let raw = text.contains('\\');

    // An odd trailing run escapes the closing quote even in a raw literal.
    let trailing_backslashes = text.chars().rev().take_while(|c| *c == '\\').count();
    if single_line && trailing_backslashes % 2 == 1 {
        return Err(ValidationError::UnsafeContent(
            "text ends with a backslash".to_owned(),
        ));
    }

    let conflicts = |delimiter: Delimiter| {
        text.contains(delimiter.as_str()) || (single_line && text.ends_with(delimiter.quote_char()))
    };
    [Delimiter::Double, Delimiter::Single]
        .into_iter()
        .find(|d| !conflicts(*d))
        .map(|delimiter| QuoteStyle { delimiter, raw })
        .ok_or_else(|| {
            ValidationError::UnsafeContent("text contains both \"\"\" and '''".to_owned())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(doc: &Docstring) -> Vec<&str> {
        doc.body_lines.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_plain_response() {
        let doc = validate("  Add two numbers.  \n").unwrap();
        assert_eq!(lines(&doc), vec!["Add two numbers."]);
        assert_eq!(doc.quote_style.delimiter, Delimiter::Double);
        assert!(!doc.quote_style.raw);
    }

    #[test]
    fn test_first_fence_wins_and_quotes_are_peeled() {
        let raw = "Sure! Here it is:\n```python\n\"\"\"Compute the total.\n\nLonger text.\n\"\"\"\n```\nAnd another:\n```\nignored\n```";
        let doc = validate(raw).unwrap();
        assert_eq!(lines(&doc), vec!["Compute the total.", "", "Longer text."]);
    }

    #[test]
    fn test_fence_inside_quotes_is_peeled() {
        let raw = "'''\n```text\nInner.\n```\n'''";
        assert_eq!(lines(&validate(raw).unwrap()), vec!["Inner."]);
    }

    #[test]
    fn test_json_template_rendering() {
        let raw = r#"{"node_type":"function","name":"add","docstring":"Add two numbers.","args":[{"name":"a","description":"First.","annotation":"int"},{"name":"b","description":"Second.","default":"2"}],"ret":{"description":"The sum.","annotation":"int"}}"#;
        let doc = validate(raw).unwrap();
        assert_eq!(
            lines(&doc),
            vec![
                "Add two numbers.",
                "",
                "Parameters:",
                "-----------",
                "",
                "    a (int): First.",
                "    b: Second. (default 2)",
                "",
                "Returns:",
                "--------",
                "",
                "    int : The sum.",
            ]
        );
    }

    #[test]
    fn test_json_template_errors() {
        let unfilled = r#"{"node_type":"class","name":"A","docstring":"<SLOT>"}"#;
        assert_eq!(validate(unfilled), Err(ValidationError::UnfilledTemplate));
        assert!(matches!(validate("{not json"), Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn test_empty_responses() {
        assert_eq!(validate("   \n\t "), Err(ValidationError::Empty));
        assert_eq!(validate("```\n\n```"), Err(ValidationError::Empty));
        assert_eq!(validate("\"\"\"\"\"\""), Err(ValidationError::Empty));
    }

    #[test]
    fn test_delimiter_choice() {
        let doc = validate("Use \"\"\" inside.").unwrap();
        assert_eq!(doc.quote_style.delimiter, Delimiter::Single);

        let doc = validate("Say \"hi\"").unwrap();
        assert_eq!(doc.quote_style.delimiter, Delimiter::Single);

        let doc = validate("Say \"hi\"\n\nMore.").unwrap();
        assert_eq!(doc.quote_style.delimiter, Delimiter::Double);
    }

    #[test]
    fn test_unsafe_content_rejected() {
        assert!(matches!(
            validate("Mixes \"\"\" and ''' quotes."),
            Err(ValidationError::UnsafeContent(_))
        ));
        assert!(matches!(
            validate("Ends with a backslash \\"),
            Err(ValidationError::UnsafeContent(_))
        ));
    }

    #[test]
    fn test_even_trailing_backslashes_are_kept() {
        let doc = validate("Splits on a\\\\").unwrap();
        assert_eq!(lines(&doc), vec!["Splits on a\\\\"]);
        assert!(doc.quote_style.raw);
        assert!(matches!(
            validate("Three \\\\\\"),
            Err(ValidationError::UnsafeContent(_))
        ));
    }

    #[test]
    fn test_backslashes_make_raw_literal() {
        let doc = validate("Match \\d+ digits.").unwrap();
        assert!(doc.quote_style.raw);
        assert_eq!(doc.quote_style.open(), "r\"\"\"");
    }

    #[test]
    fn test_normalization() {
        let raw =
            "\r\n\r\nSummary line.   \r\n\r\n        Indented detail.\r\n          Deeper.\x07\r\n\r\n";
        let doc = validate(raw).unwrap();
        assert_eq!(
            lines(&doc),
            vec!["Summary line.", "", "Indented detail.", "  Deeper."]
        );
    }
}
