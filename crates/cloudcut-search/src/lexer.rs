//! Query tokeniser and the quote-stripping preprocess pass.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Or,
    And,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl Op {
    /// OR binds loosest, AND next, comparators tightest. All left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            _ => 3,
        }
    }

    pub fn is_comparator(self) -> bool {
        self.precedence() == 3
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Op::Or => "OR",
            Op::And => "AND",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Like => "LIKE",
        }
    }

    /// Classify a lexeme. Symbol spellings are fixed; the word operators
    /// match case-insensitively and normalise to uppercase.
    fn parse(lexeme: &str) -> Option<Op> {
        match lexeme {
            "==" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            ">" => Some(Op::Gt),
            ">=" => Some(Op::Ge),
            "<" => Some(Op::Lt),
            "<=" => Some(Op::Le),
            _ if lexeme.eq_ignore_ascii_case("AND") => Some(Op::And),
            _ if lexeme.eq_ignore_ascii_case("OR") => Some(Op::Or),
            _ if lexeme.eq_ignore_ascii_case("LIKE") => Some(Op::Like),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One lexed token. Terms keep their raw lexeme (quotes included) so the
/// evaluator can tell literals from paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Op(Op),
    Term(String),
}

/// Lexeme pattern, priority order: double-quoted string (backslash escapes),
/// single-quoted string, two-character comparators, single-character
/// operators and parentheses, then maximal runs of everything else.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:\\.|[^"])*"|'(?:\\.|[^'])*'|>=|<=|==|!=|[><()]|[^\s()!><=]+"#)
        .expect("token pattern is valid")
});

/// Tokenise a query string.
pub fn lex(query: &str) -> Vec<Token> {
    TOKEN_RE
        .find_iter(query)
        .map(|m| classify(m.as_str()))
        .collect()
}

fn classify(lexeme: &str) -> Token {
    match lexeme {
        "(" => Token::LParen,
        ")" => Token::RParen,
        _ => match Op::parse(lexeme) {
            Some(op) => Token::Op(op),
            None => Token::Term(lexeme.to_string()),
        },
    }
}

/// Rejoin right-hand values that a shell split apart.
///
/// Shells that strip quotes around a spaced value hand us
/// `Subject == Urgent payroll update` as three terms. After each
/// comparator, a run of more than one token (up to the next logical
/// operator or parenthesis) is merged back into a single synthesised term,
/// joined with single spaces. A run of exactly one token is unchanged.
pub fn preprocess(tokens: Vec<Token>) -> Vec<Token> {
    let mut processed = Vec::with_capacity(tokens.len());
    let mut index = 0;

    while index < tokens.len() {
        let token = tokens[index].clone();
        let comparator = matches!(&token, Token::Op(op) if op.is_comparator());
        processed.push(token);
        index += 1;

        if !comparator {
            continue;
        }

        // Collect the run following the comparator.
        let start = index;
        while index < tokens.len() {
            match &tokens[index] {
                Token::LParen | Token::RParen | Token::Op(Op::And) | Token::Op(Op::Or) => break,
                _ => index += 1,
            }
        }
        let run = &tokens[start..index];

        if run.len() > 1 {
            let merged: Vec<&str> = run.iter().map(token_text).collect();
            processed.push(Token::Term(merged.join(" ")));
        } else if let Some(single) = run.first() {
            processed.push(single.clone());
        }
    }

    processed
}

fn token_text(token: &Token) -> &str {
    match token {
        Token::Term(text) => text,
        Token::Op(op) => op.as_str(),
        Token::LParen => "(",
        Token::RParen => ")",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> Token {
        Token::Term(s.to_string())
    }

    #[test]
    fn test_lex_simple_comparison() {
        assert_eq!(
            lex("Operation == 'MailItemsAccessed'"),
            vec![
                term("Operation"),
                Token::Op(Op::Eq),
                term("'MailItemsAccessed'"),
            ]
        );
    }

    #[test]
    fn test_lex_word_operators_any_case() {
        assert_eq!(
            lex("a == b and c like d"),
            vec![
                term("a"),
                Token::Op(Op::Eq),
                term("b"),
                Token::Op(Op::And),
                term("c"),
                Token::Op(Op::Like),
                term("d"),
            ]
        );
    }

    #[test]
    fn test_lex_quoted_round_trip() {
        // A quoted literal lexes as exactly one token whose stripped form
        // is the original content.
        for s in ["abc", "a b c", "a>=b", "and", "x != y OR z"] {
            let tokens = lex(&format!("'{s}'"));
            assert_eq!(tokens.len(), 1, "{s}");
            match &tokens[0] {
                Token::Term(t) => assert_eq!(t.trim_matches('\''), s),
                other => panic!("expected term, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_lex_comparator_inside_quotes() {
        assert_eq!(
            lex("Subject == 'a>=b'"),
            vec![term("Subject"), Token::Op(Op::Eq), term("'a>=b'")]
        );
    }

    #[test]
    fn test_lex_parens_and_two_char_ops() {
        assert_eq!(
            lex("(a >= 1)"),
            vec![
                Token::LParen,
                term("a"),
                Token::Op(Op::Ge),
                term("1"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_preprocess_merges_stripped_quotes() {
        let tokens = lex("Subject == Urgent payroll update");
        assert_eq!(
            preprocess(tokens),
            vec![
                term("Subject"),
                Token::Op(Op::Eq),
                term("Urgent payroll update"),
            ]
        );
    }

    #[test]
    fn test_preprocess_stops_at_logical_operator() {
        let tokens = lex("Subject == Urgent update AND Operation == Send");
        assert_eq!(
            preprocess(tokens),
            vec![
                term("Subject"),
                Token::Op(Op::Eq),
                term("Urgent update"),
                Token::Op(Op::And),
                term("Operation"),
                Token::Op(Op::Eq),
                term("Send"),
            ]
        );
    }

    #[test]
    fn test_preprocess_single_value_unchanged() {
        let tokens = lex("Operation == 'Send' AND x == y");
        assert_eq!(preprocess(tokens.clone()), tokens);
    }

    #[test]
    fn test_preprocess_stops_at_paren() {
        let tokens = lex("a == b (c == d)");
        assert_eq!(
            preprocess(tokens),
            vec![
                term("a"),
                Token::Op(Op::Eq),
                term("b"),
                Token::LParen,
                term("c"),
                Token::Op(Op::Eq),
                term("d"),
                Token::RParen,
            ]
        );
    }
}
