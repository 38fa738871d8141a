//! Format-string predicate parser
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! or      := and (("OR" | "||") and)*
//! and     := not (("AND" | "&&") not)*
//! not     := ("NOT" | "!") not | primary
//! primary := "(" or ")" | TRUEPREDICATE | FALSEPREDICATE | operand op modifier? operand
//! operand := keypath | literal | %@ | %K | "{" literal ("," literal)* "}"
//! ```

use crate::predicate::{CompareOp, Operand, Predicate};
use crate::{Error, Result, Value};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Key(String),
    Literal(Value),
    ValueArg,
    KeyArg,
    Op(CompareOp),
    Modifier(bool),
    And,
    Or,
    Not,
    TruePredicate,
    FalsePredicate,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
}

/// Parse a format string with positional arguments into a predicate
pub fn parse(format: &str, args: &[Value]) -> Result<Predicate> {
    let tokens = tokenize(format)?;
    let expected = tokens
        .iter()
        .filter(|t| matches!(t, Token::ValueArg | Token::KeyArg))
        .count();
    if expected != args.len() {
        return Err(Error::ArgumentCountMismatch {
            expected,
            got: args.len(),
        });
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        args: args.iter(),
    };
    let predicate = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(Error::PredicateSyntax(format!(
            "unexpected {:?} in \"{}\"",
            parser.tokens[parser.pos], format
        )));
    }
    Ok(predicate)
}

fn keyword(word: &str) -> Option<Token> {
    Some(match word.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "TRUE" | "YES" => Token::Literal(Value::Bool(true)),
        "FALSE" | "NO" => Token::Literal(Value::Bool(false)),
        "NIL" | "NULL" => Token::Literal(Value::Null),
        "TRUEPREDICATE" => Token::TruePredicate,
        "FALSEPREDICATE" => Token::FalsePredicate,
        "CONTAINS" => Token::Op(CompareOp::Contains),
        "BEGINSWITH" => Token::Op(CompareOp::BeginsWith),
        "ENDSWITH" => Token::Op(CompareOp::EndsWith),
        "LIKE" => Token::Op(CompareOp::Like),
        "IN" => Token::Op(CompareOp::In),
        _ => return None,
    })
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '%' => {
                match chars.get(i + 1) {
                    Some('@') => tokens.push(Token::ValueArg),
                    Some('K') => tokens.push(Token::KeyArg),
                    other => {
                        return Err(Error::PredicateSyntax(format!(
                            "unsupported placeholder %{}",
                            other.map(|c| c.to_string()).unwrap_or_default()
                        )));
                    }
                }
                i += 2;
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|p| i + p)
                    .ok_or_else(|| Error::PredicateSyntax("unterminated modifier".to_string()))?;
                let flags: String = chars[i + 1..end].iter().collect();
                tokens.push(Token::Modifier(flags.to_lowercase().contains('c')));
                i = end + 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(Error::PredicateSyntax("unterminated string".to_string()));
                        }
                        Some('\\') => {
                            if let Some(&next) = chars.get(i + 1) {
                                s.push(next);
                            }
                            i += 2;
                        }
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Literal(Value::String(s)));
            }
            '=' | '!' | '<' | '>' | '&' | '|' => {
                let next = chars.get(i + 1).copied();
                let (token, width) = match (c, next) {
                    ('=', Some('=')) => (Token::Op(CompareOp::Eq), 2),
                    ('=', Some('<')) => (Token::Op(CompareOp::Le), 2),
                    ('=', Some('>')) => (Token::Op(CompareOp::Ge), 2),
                    ('=', _) => (Token::Op(CompareOp::Eq), 1),
                    ('!', Some('=')) => (Token::Op(CompareOp::Ne), 2),
                    ('!', _) => (Token::Not, 1),
                    ('<', Some('>')) => (Token::Op(CompareOp::Ne), 2),
                    ('<', Some('=')) => (Token::Op(CompareOp::Le), 2),
                    ('<', _) => (Token::Op(CompareOp::Lt), 1),
                    ('>', Some('=')) => (Token::Op(CompareOp::Ge), 2),
                    ('>', _) => (Token::Op(CompareOp::Gt), 1),
                    ('&', Some('&')) => (Token::And, 2),
                    ('|', Some('|')) => (Token::Or, 2),
                    _ => {
                        return Err(Error::PredicateSyntax(format!("unexpected '{}'", c)));
                    }
                };
                tokens.push(token);
                i += width;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '-' || chars[i] == '+')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = if let Ok(n) = text.parse::<i64>() {
                    Value::Int(n)
                } else {
                    text.parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| Error::PredicateSyntax(format!("bad number {}", text)))?
                };
                tokens.push(Token::Literal(value));
            }
            c if c.is_alphabetic() || c == '_' || c == '@' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '@' | '$'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(keyword(&word).unwrap_or(Token::Key(word)));
            }
            other => {
                return Err(Error::PredicateSyntax(format!("unexpected '{}'", other)));
            }
        }
    }
    Ok(tokens)
}

const MAX_NESTING: usize = 128;

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    args: std::slice::Iter<'a, Value>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            other => Err(Error::PredicateSyntax(format!(
                "expected {:?}, found {:?}",
                expected, other
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<Predicate> {
        let mut parts = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Predicate> {
        let mut parts = vec![self.parse_not()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            parts.push(self.parse_not()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::And(parts)
        })
    }

    fn parse_not(&mut self) -> Result<Predicate> {
        let mut negations = 0usize;
        while self.peek() == Some(&Token::Not) {
            self.pos += 1;
            negations += 1;
        }
        let predicate = self.parse_primary()?;
        // double negation cancels
        Ok(if negations % 2 == 1 {
            Predicate::Not(Box::new(predicate))
        } else {
            predicate
        })
    }

    fn parse_primary(&mut self) -> Result<Predicate> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                self.depth += 1;
                if self.depth > MAX_NESTING {
                    return Err(Error::PredicateSyntax(format!(
                        "parentheses nested deeper than {}",
                        MAX_NESTING
                    )));
                }
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::TruePredicate) => {
                self.pos += 1;
                Ok(Predicate::True)
            }
            Some(Token::FalsePredicate) => {
                self.pos += 1;
                Ok(Predicate::False)
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> Result<Predicate> {
        let left = self.parse_operand()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            other => {
                return Err(Error::PredicateSyntax(format!(
                    "expected comparison operator, found {:?}",
                    other
                )));
            }
        };
        let case_insensitive = match self.peek() {
            Some(Token::Modifier(ci)) => {
                let ci = *ci;
                self.pos += 1;
                ci
            }
            _ => false,
        };
        let right = self.parse_operand()?;
        Ok(Predicate::Compare {
            left,
            op,
            right,
            case_insensitive,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Key(k)) => Ok(Operand::Key(k)),
            Some(Token::Literal(v)) => Ok(Operand::Literal(v)),
            Some(Token::ValueArg) => Ok(Operand::Literal(self.take_arg()?)),
            Some(Token::KeyArg) => match self.take_arg()? {
                Value::String(k) => Ok(Operand::Key(k)),
                other => Err(Error::TypeError {
                    expected: "string key path for %K".to_string(),
                    got: other.type_name().to_string(),
                }),
            },
            Some(Token::LBrace) => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBrace) {
                    self.pos += 1;
                    return Ok(Operand::Literal(Value::List(items)));
                }
                loop {
                    match self.parse_operand()? {
                        Operand::Literal(v) => items.push(v),
                        Operand::Key(k) => {
                            return Err(Error::PredicateSyntax(format!(
                                "key path {} inside list literal",
                                k
                            )));
                        }
                    }
                    match self.next() {
                        Some(Token::Comma) => continue,
                        Some(Token::RBrace) => break,
                        other => {
                            return Err(Error::PredicateSyntax(format!(
                                "expected ',' or '}}', found {:?}",
                                other
                            )));
                        }
                    }
                }
                Ok(Operand::Literal(Value::List(items)))
            }
            other => Err(Error::PredicateSyntax(format!(
                "expected operand, found {:?}",
                other
            ))),
        }
    }

    fn take_arg(&mut self) -> Result<Value> {
        self.args
            .next()
            .cloned()
            .ok_or_else(|| Error::PredicateSyntax("missing placeholder argument".to_string()))
    }
}
