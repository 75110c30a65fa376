//! Authorized-key line parsing and template rendering.

use authkeys_api::{AuthkeysError, KeyType, ParsedKey};

/// Split an authorized-key line into its fields.
///
/// The first token that names a recognized key type anchors the line: the
/// token before it (if any) is taken as the options, the token after it as
/// the key data, and the final token of the line as the comment.
pub fn parse(line: &str, identity: &str) -> Result<ParsedKey, AuthkeysError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let (idx, key_type) = tokens
        .iter()
        .enumerate()
        .find_map(|(i, tok)| tok.parse::<KeyType>().ok().map(|t| (i, t)))
        .ok_or_else(|| AuthkeysError::MalformedKey(format!("no key type in {line:?}")))?;

    let key_data = tokens
        .get(idx + 1)
        .ok_or_else(|| AuthkeysError::MalformedKey(format!("missing key data after {key_type}")))?;

    let options = if idx > 0 { tokens[0] } else { "" };
    // Two-token lines have no comment; the last token is then the key data.
    let comment = tokens.last().copied().unwrap_or_default();

    Ok(ParsedKey {
        options: options.to_string(),
        key_type,
        key_data: (*key_data).to_string(),
        comment: comment.to_string(),
        identity: identity.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Options,
    Type,
    Key,
    Comment,
    User,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "options" => Some(Field::Options),
            "type" => Some(Field::Type),
            "key" => Some(Field::Key),
            "comment" => Some(Field::Comment),
            "user" => Some(Field::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A compiled output template such as `"{options} {type} {key} {comment}"`.
///
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn compile(source: &str) -> Result<Self, AuthkeysError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(AuthkeysError::Template(format!(
                                    "unclosed field in {source:?}"
                                )));
                            }
                        }
                    }
                    let field = Field::from_name(&name).ok_or_else(|| {
                        AuthkeysError::Template(format!("unknown field {{{name}}} in {source:?}"))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(AuthkeysError::Template(format!(
                        "unmatched '}}' in {source:?}"
                    )));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Render `key` through this template. Surrounding whitespace is trimmed
    /// so an empty `{options}` at the start of a line leaves no gap.
    pub fn render(&self, key: &ParsedKey) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(Field::Options) => out.push_str(&key.options),
                Segment::Field(Field::Type) => out.push_str(key.key_type.as_str()),
                Segment::Field(Field::Key) => out.push_str(&key.key_data),
                Segment::Field(Field::Comment) => out.push_str(&key.comment),
                Segment::Field(Field::User) => out.push_str(&key.identity),
            }
        }
        out.trim().to_string()
    }
}

pub fn render(key: &ParsedKey, template: &str) -> Result<String, AuthkeysError> {
    Ok(Template::compile(template)?.render(key))
}
