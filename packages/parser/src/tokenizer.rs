use crate::error::{ParseError, ParseResult};
use logos::{Lexer, Logos};

/// Tokens recognized between tags.
#[derive(Logos, Debug, Clone, PartialEq)]
enum TextToken {
    #[token("<")]
    TagOpen,

    #[regex(r"<!--([^-]|-[^-]|--[^>])*-->", priority = 10)]
    Comment,

    #[regex(r"<![^>]*>", priority = 5)]
    Doctype,

    #[regex(r"[^<]+")]
    Text,
}

/// Tokens recognized inside a tag, between `<` and `>`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum TagToken {
    #[token("/")]
    Slash,

    #[token("=")]
    Equals,

    #[token(">")]
    End,

    #[regex(r#""[^"]*""#)]
    DoubleQuoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,

    // Tag names, attribute names and unquoted attribute values.
    #[regex(r"[a-zA-Z0-9_][a-zA-Z0-9._:;,#%()+-]*")]
    Ident,
}

/// Flat token stream the tree builder consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlToken {
    /// Entity-decoded text run.
    Text(String),

    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },

    EndTag {
        name: String,
    },
}

/// Tokenize an HTML fragment. Comments and doctypes are dropped here; tag and
/// attribute names come out lowercased, text and attribute values
/// entity-decoded.
pub fn tokenize(source: &str) -> ParseResult<Vec<HtmlToken>> {
    let mut tokens = Vec::new();
    let mut lex = TextToken::lexer(source);

    while let Some(result) = lex.next() {
        match result {
            Ok(TextToken::Text) => tokens.push(HtmlToken::Text(decode_entities(lex.slice()))),
            Ok(TextToken::Comment) | Ok(TextToken::Doctype) => {}
            Ok(TextToken::TagOpen) => {
                let mut tag_lex = lex.morph::<TagToken>();
                tokens.push(lex_tag(&mut tag_lex)?);
                lex = tag_lex.morph();
            }
            Err(()) => return Err(ParseError::lexer(lex.span().start)),
        }
    }

    Ok(tokens)
}

fn lex_tag(lex: &mut Lexer<'_, TagToken>) -> ParseResult<HtmlToken> {
    let mut name: Option<String> = None;
    let mut closing = false;
    let mut self_closing = false;
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut pending: Option<String> = None;
    let mut expect_value = false;

    loop {
        let Some(result) = lex.next() else {
            return Err(ParseError::unexpected_eof(lex.span().end));
        };
        let token = result.map_err(|()| ParseError::lexer(lex.span().start))?;
        match token {
            TagToken::Slash => {
                if name.is_none() {
                    closing = true;
                } else {
                    self_closing = true;
                }
            }
            TagToken::Equals => expect_value = true,
            TagToken::Ident => {
                let slice = lex.slice();
                if name.is_none() {
                    name = Some(slice.to_ascii_lowercase());
                } else if expect_value {
                    if let Some(attr) = pending.take() {
                        attrs.push((attr, decode_entities(slice)));
                    }
                    expect_value = false;
                } else {
                    // A bare attribute with no value, e.g. `disabled`.
                    if let Some(attr) = pending.take() {
                        attrs.push((attr, String::new()));
                    }
                    pending = Some(slice.to_ascii_lowercase());
                }
            }
            TagToken::DoubleQuoted | TagToken::SingleQuoted => {
                let slice = lex.slice();
                let inner = &slice[1..slice.len() - 1];
                if expect_value {
                    if let Some(attr) = pending.take() {
                        attrs.push((attr, decode_entities(inner)));
                    }
                    expect_value = false;
                }
            }
            TagToken::End => {
                if let Some(attr) = pending.take() {
                    attrs.push((attr, String::new()));
                }
                break;
            }
        }
    }

    match name {
        Some(name) if closing => Ok(HtmlToken::EndTag { name }),
        Some(name) => Ok(HtmlToken::StartTag {
            name,
            attrs,
            self_closing,
        }),
        None => Err(ParseError::malformed_tag(
            lex.span().start,
            "missing tag name",
        )),
    }
}

/// Decode the character entities the grammar cares about, leaving unknown
/// entities untouched.
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let semi = after
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .map(|(i, _)| i);
        if let Some(semi) = semi {
            if let Some(decoded) = decode_entity(&after[1..semi]) {
                out.push(decoded);
                rest = &after[semi + 1..];
                continue;
            }
        }
        out.push('&');
        rest = &after['&'.len_utf8()..];
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{A0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let value = if let Some(hex) = number.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                number.parse::<u32>().ok()?
            };
            char::from_u32(value)
        }
    }
}
