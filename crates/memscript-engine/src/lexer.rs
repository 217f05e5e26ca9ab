//! Script tokenizer.

use logos::Logos;

fn unescape(raw: &str) -> Option<String> {
    // raw includes the surrounding quotes
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    // Keywords
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    // Operators
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,

    // Literals and names
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "{:?}", s),
            Token::Ident(s) => f.write_str(s),
            other => {
                let s = match other {
                    Token::Let => "let",
                    Token::If => "if",
                    Token::Else => "else",
                    Token::While => "while",
                    Token::For => "for",
                    Token::In => "in",
                    Token::Break => "break",
                    Token::Continue => "continue",
                    Token::True => "true",
                    Token::False => "false",
                    Token::Null => "null",
                    Token::LParen => "(",
                    Token::RParen => ")",
                    Token::LBrace => "{",
                    Token::RBrace => "}",
                    Token::LBracket => "[",
                    Token::RBracket => "]",
                    Token::Comma => ",",
                    Token::Semi => ";",
                    Token::Colon => ":",
                    Token::Dot => ".",
                    Token::EqEq => "==",
                    Token::NotEq => "!=",
                    Token::Le => "<=",
                    Token::Ge => ">=",
                    Token::Lt => "<",
                    Token::Gt => ">",
                    Token::AndAnd => "&&",
                    Token::OrOr => "||",
                    Token::Assign => "=",
                    Token::Plus => "+",
                    Token::Minus => "-",
                    Token::Star => "*",
                    Token::Slash => "/",
                    Token::Percent => "%",
                    Token::Bang => "!",
                    _ => unreachable!(),
                };
                f.write_str(s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Token::lexer(src).map(|t| t.unwrap()).collect()
    }

    #[test]
    fn lexes_a_tool_call() {
        let toks = lex(r#"graph.search_nodes("tea");"#);
        assert_eq!(
            toks,
            vec![
                Token::Ident("graph".into()),
                Token::Dot,
                Token::Ident("search_nodes".into()),
                Token::LParen,
                Token::Str("tea".into()),
                Token::RParen,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn skips_comments_and_whitespace() {
        let toks = lex("let x = 1; // trailing\n# whole line\nx");
        assert_eq!(toks.len(), 6);
    }

    #[test]
    fn string_escapes() {
        let toks = lex(r#""a\nb\"c""#);
        assert_eq!(toks, vec![Token::Str("a\nb\"c".into())]);
    }

    #[test]
    fn numbers_with_fraction() {
        let toks = lex("1.5 2");
        assert_eq!(toks, vec![Token::Number(1.5), Token::Number(2.0)]);
    }

    #[test]
    fn unknown_character_errors() {
        let mut lexer = Token::lexer("a @ b");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
    }
}
