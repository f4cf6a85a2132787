//! OData filter subset.
//!
//! Supports what ShopDesk issues against its indexes:
//! `field eq 'value'`, `ne`, `gt`, `ge`, `lt`, `le`, `and`, `or`, `not`,
//! parentheses, string / number / boolean / `null` literals.
//! Nested fields use `/` (e.g. `address/state`).

use serde_json::Value;
use shopdesk_core::error::{Result, ShopDeskError};
use std::cmp::Ordering;

/// Quote a string as an OData literal (single quotes doubled).
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `field eq 'value'` with the value escaped.
pub fn eq(field: &str, value: &str) -> String {
    format!("{field} eq {}", quote(value))
}

/// `field eq 'a' or field eq 'b' ...`
pub fn any_of(field: &str, values: &[&str]) -> String {
    values
        .iter()
        .map(|v| eq(field, v))
        .collect::<Vec<_>>()
        .join(" or ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        field: String,
        op: CompareOp,
        value: Literal,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == '\'' {
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        s.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(ch) => {
                        s.push(*ch);
                        i += 1;
                    }
                    None => return Err(filter_error(input, "unterminated string literal")),
                }
            }
            tokens.push(Token::Str(s));
        } else if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let raw: String = chars[start..i].iter().collect();
            let n = raw
                .parse::<f64>()
                .map_err(|_| filter_error(input, &format!("bad number '{raw}'")))?;
            tokens.push(Token::Num(n));
        } else if c.is_alphanumeric() || c == '_' || c == '@' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '/' | '.' | '@'))
            {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            return Err(filter_error(input, &format!("unexpected character '{c}'")));
        }
    }
    Ok(tokens)
}

fn filter_error(input: &str, msg: &str) -> ShopDeskError {
    ShopDeskError::Search(format!("Invalid filter `{input}`: {msg}"))
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> Result<Filter> {
        let mut parts = vec![self.parse_and()?];
        while self.peek_keyword("or") {
            self.pos += 1;
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Filter::Or(parts) })
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut parts = vec![self.parse_unary()?];
        while self.peek_keyword("and") {
            self.pos += 1;
            parts.push(self.parse_unary()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Filter::And(parts) })
    }

    fn parse_unary(&mut self) -> Result<Filter> {
        if self.peek_keyword("not") {
            self.pos += 1;
            return Ok(Filter::Not(Box::new(self.parse_unary()?)));
        }
        if self.tokens.get(self.pos) == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(inner),
                _ => Err(filter_error(self.input, "missing ')'")),
            };
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Filter> {
        let field = match self.next() {
            Some(Token::Ident(f)) => f,
            _ => return Err(filter_error(self.input, "expected field name")),
        };
        let op = match self.next() {
            Some(Token::Ident(op)) => match op.to_ascii_lowercase().as_str() {
                "eq" => CompareOp::Eq,
                "ne" => CompareOp::Ne,
                "gt" => CompareOp::Gt,
                "ge" => CompareOp::Ge,
                "lt" => CompareOp::Lt,
                "le" => CompareOp::Le,
                other => return Err(filter_error(self.input, &format!("unknown operator '{other}'"))),
            },
            _ => return Err(filter_error(self.input, "expected operator")),
        };
        let value = match self.next() {
            Some(Token::Str(s)) => Literal::String(s),
            Some(Token::Num(n)) => Literal::Number(n),
            Some(Token::Ident(id)) => match id.to_ascii_lowercase().as_str() {
                "true" => Literal::Bool(true),
                "false" => Literal::Bool(false),
                "null" => Literal::Null,
                _ => return Err(filter_error(self.input, &format!("unexpected '{id}'"))),
            },
            _ => return Err(filter_error(self.input, "expected literal")),
        };
        Ok(Filter::Compare { field, op, value })
    }
}

impl Filter {
    /// Parse an OData filter expression.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(filter_error(input, "empty expression"));
        }
        let mut parser = Parser { input, tokens, pos: 0 };
        let filter = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(filter_error(input, "trailing tokens"));
        }
        Ok(filter)
    }

    /// Evaluate against a JSON record.
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Self::And(parts) => parts.iter().all(|f| f.matches(record)),
            Self::Or(parts) => parts.iter().any(|f| f.matches(record)),
            Self::Not(inner) => !inner.matches(record),
            Self::Compare { field, op, value } => {
                let actual = lookup(record, field);
                compare(actual, *op, value)
            }
        }
    }
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/').try_fold(record, |v, key| v.get(key))
}

fn compare(actual: Option<&Value>, op: CompareOp, expected: &Literal) -> bool {
    let actual = actual.filter(|v| !v.is_null());
    let ordering = match (actual, expected) {
        (None, Literal::Null) => Some(Ordering::Equal),
        (None, _) | (Some(_), Literal::Null) => None,
        (Some(Value::String(a)), Literal::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Some(Value::Number(a)), Literal::Number(b)) => a.as_f64().and_then(|a| a.partial_cmp(b)),
        // CSV-loaded records often keep numbers as strings
        (Some(Value::String(a)), Literal::Number(b)) => {
            a.trim().parse::<f64>().ok().and_then(|a| a.partial_cmp(b))
        }
        (Some(Value::Bool(a)), Literal::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match (op, ordering) {
        (CompareOp::Ne, None) => true,
        (_, None) => false,
        (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
        (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
        (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
        (CompareOp::Ge, Some(o)) => o != Ordering::Less,
        (CompareOp::Lt, Some(o)) => o == Ordering::Less,
        (CompareOp::Le, Some(o)) => o != Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("O'Brien"), "'O''Brien'");
        assert_eq!(eq("customer_id", "CUST-001"), "customer_id eq 'CUST-001'");
    }

    #[test]
    fn test_parse_roundtrip_of_escaped_value() {
        let f = Filter::parse(&eq("name", "O'Brien")).unwrap();
        assert!(f.matches(&json!({"name": "O'Brien"})));
        assert!(!f.matches(&json!({"name": "OBrien"})));
    }

    #[test]
    fn test_or_filter() {
        let f = Filter::parse("status eq 'Pending' or status eq 'Processing'").unwrap();
        assert!(f.matches(&json!({"status": "Pending"})));
        assert!(f.matches(&json!({"status": "Processing"})));
        assert!(!f.matches(&json!({"status": "Delivered"})));
        assert!(!f.matches(&json!({})));
    }

    #[test]
    fn test_and_precedence_and_parens() {
        let f = Filter::parse("a eq 1 or b eq 2 and c eq 3").unwrap();
        assert!(f.matches(&json!({"a": 1})));
        assert!(!f.matches(&json!({"b": 2})));
        let f = Filter::parse("(a eq 1 or b eq 2) and c eq 3").unwrap();
        assert!(!f.matches(&json!({"a": 1})));
        assert!(f.matches(&json!({"b": 2, "c": 3})));
    }

    #[test]
    fn test_numeric_comparisons() {
        let f = Filter::parse("quantity_available lt 20").unwrap();
        assert!(f.matches(&json!({"quantity_available": 5})));
        assert!(f.matches(&json!({"quantity_available": "7"})));
        assert!(!f.matches(&json!({"quantity_available": 25})));
    }

    #[test]
    fn test_date_string_comparison() {
        let f = Filter::parse("created_at ge '2024-01-15'").unwrap();
        assert!(f.matches(&json!({"created_at": "2024-02-01"})));
        assert!(!f.matches(&json!({"created_at": "2023-12-31"})));
    }

    #[test]
    fn test_not_null_and_nested() {
        let f = Filter::parse("not (delivery_date eq null)").unwrap();
        assert!(f.matches(&json!({"delivery_date": "2024-01-01"})));
        assert!(!f.matches(&json!({"delivery_date": null})));
        let f = Filter::parse("address/state eq 'NV'").unwrap();
        assert!(f.matches(&json!({"address": {"state": "NV"}})));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(Filter::parse("").is_err());
        assert!(Filter::parse("status eq").is_err());
        assert!(Filter::parse("status like 'x'").is_err());
        assert!(Filter::parse("status eq 'open").is_err());
        assert!(Filter::parse("(status eq 'x'").is_err());
    }
}
