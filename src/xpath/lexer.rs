//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens. Applies the XPath 1.0
//! disambiguation rule: `*` and the names `and`, `or`, `mod`, `div` are
//! operators only when they follow a complete operand.

use std::fmt;

use crate::error::XPathError;

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),         // NCName
    NameTest(String),     // prefix:* or prefix:local
    NodeType(String),     // node, text, comment, processing-instruction (before '(')
    FunctionName(String), // any other name directly followed by '('

    // Axis
    Axis(String), // child, descendant, etc. (before '::')

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Dot => ".",
            Token::DoubleDot => "..",
            Token::At => "@",
            Token::Pipe => "|",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Eq => "=",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::And => "and",
            Token::Or => "or",
            Token::Mod => "mod",
            Token::Div => "div",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::DoubleColon => "::",
            Token::Comma => ",",
            Token::Dollar => "$",
            Token::Number(n) => return write!(f, "'{}'", n),
            Token::String(s) => return write!(f, "literal \"{}\"", s),
            Token::Name(s)
            | Token::NameTest(s)
            | Token::NodeType(s)
            | Token::FunctionName(s)
            | Token::Axis(s) => return write!(f, "'{}'", s),
            Token::Eof => return f.write_str("end of expression"),
        };
        write!(f, "'{}'", text)
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// True when the previous token completed an operand
    operand_ended: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            operand_ended: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, XPathError> {
        let token = self.scan()?;
        self.operand_ended = match &token {
            Token::Name(_)
            | Token::NameTest(_)
            | Token::Number(_)
            | Token::String(_)
            | Token::RightParen
            | Token::RightBracket
            | Token::Dot
            | Token::DoubleDot => true,
            // A name test completes an operand, a multiplication does not
            Token::Star => !self.operand_ended,
            _ => false,
        };
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, XPathError> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = |lexer: &mut Self, token: Token| {
            lexer.advance(1);
            Ok(token)
        };

        match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Ok(Token::DoubleSlash)
                } else {
                    Ok(Token::Slash)
                }
            }
            '.' => {
                if self.peek_at(1) == Some('.') {
                    self.advance(2);
                    Ok(Token::DoubleDot)
                } else if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    Ok(self.read_number())
                } else {
                    self.advance(1);
                    Ok(Token::Dot)
                }
            }
            '@' => single(self, Token::At),
            '|' => single(self, Token::Pipe),
            '+' => single(self, Token::Plus),
            '-' => single(self, Token::Minus),
            '*' => single(self, Token::Star),
            '=' => single(self, Token::Eq),
            '(' => single(self, Token::LeftParen),
            ')' => single(self, Token::RightParen),
            '[' => single(self, Token::LeftBracket),
            ']' => single(self, Token::RightBracket),
            ',' => single(self, Token::Comma),
            '$' => single(self, Token::Dollar),
            '!' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Ok(Token::NotEq)
                } else {
                    Err(self.unexpected('!'))
                }
            }
            '<' | '>' => {
                self.advance(1);
                let or_equal = self.peek() == Some('=');
                if or_equal {
                    self.advance(1);
                }
                Ok(match (c, or_equal) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::LtEq,
                    (_, false) => Token::Gt,
                    (_, true) => Token::GtEq,
                })
            }
            ':' => {
                if self.peek_at(1) == Some(':') {
                    self.advance(2);
                    Ok(Token::DoubleColon)
                } else {
                    Err(self.unexpected(':'))
                }
            }
            '"' | '\'' => self.read_string(c),
            '0'..='9' => Ok(self.read_number()),
            _ if is_name_start_char(c) => Ok(self.read_name_or_keyword()),
            _ => Err(self.unexpected(c)),
        }
    }

    fn unexpected(&self, c: char) -> XPathError {
        XPathError::Syntax(format!("Unexpected character '{}' at offset {}", c, self.pos))
    }

    /// Read a number literal
    fn read_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }

        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    /// Read a string literal; XPath 1.0 has no escapes inside literals
    fn read_string(&mut self, quote: char) -> Result<Token, XPathError> {
        let open = self.pos;
        self.advance(1);
        let start = self.pos;
        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.input[start..start + len].to_string();
                self.advance(len + 1);
                Ok(Token::String(value))
            }
            None => Err(XPathError::Syntax(format!(
                "Unterminated string literal starting at offset {}",
                open
            ))),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Read a name, which may turn out to be an operator, axis, node type,
    /// function name or qualified name test
    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if self.operand_ended {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:* or prefix:local (no whitespace allowed around the colon)
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            if self.peek_at(1) == Some('*') {
                self.advance(2);
                return Token::NameTest(format!("{}:*", name));
            }
            if self.peek_at(1).is_some_and(is_name_start_char) {
                self.advance(1);
                let local = self.read_ncname();
                let qname = format!("{}:{}", name, local);
                let resume = self.pos;
                self.skip_whitespace();
                if self.peek() == Some('(') {
                    self.pos = resume;
                    return Token::FunctionName(qname);
                }
                self.pos = resume;
                return Token::NameTest(qname);
            }
        }

        let resume = self.pos;
        self.skip_whitespace();
        let token = if self.remaining().starts_with("::") {
            Token::Axis(name.to_string())
        } else if self.peek() == Some('(') {
            match name {
                "node" | "text" | "comment" | "processing-instruction" => {
                    Token::NodeType(name.to_string())
                }
                _ => Token::FunctionName(name.to_string()),
            }
        } else {
            Token::Name(name.to_string())
        };
        if matches!(token, Token::Name(_)) {
            self.pos = resume;
        }
        token
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, XPathError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            tokens("/root/child"),
            vec![
                Token::Slash,
                Token::Name("root".to_string()),
                Token::Slash,
                Token::Name("child".to_string()),
            ]
        );
    }

    #[test]
    fn test_descendant() {
        let mut lexer = Lexer::new("//item");
        assert_eq!(lexer.next_token().unwrap(), Token::DoubleSlash);
        assert_eq!(lexer.next_token().unwrap(), Token::Name("item".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test']"),
            vec![
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::String("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis() {
        let mut lexer = Lexer::new("child :: element");
        assert_eq!(lexer.next_token().unwrap(), Token::Axis("child".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::DoubleColon);
        assert_eq!(lexer.next_token().unwrap(), Token::Name("element".to_string()));
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            tokens("default:item/dc:*"),
            vec![
                Token::NameTest("default:item".to_string()),
                Token::Slash,
                Token::NameTest("dc:*".to_string()),
            ]
        );
    }

    #[test]
    fn test_function_and_node_type() {
        assert_eq!(
            tokens("count(text())"),
            vec![
                Token::FunctionName("count".to_string()),
                Token::LeftParen,
                Token::NodeType("text".to_string()),
                Token::LeftParen,
                Token::RightParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_operator_names_as_element_names() {
        assert_eq!(
            tokens("/div/and"),
            vec![
                Token::Slash,
                Token::Name("div".to_string()),
                Token::Slash,
                Token::Name("and".to_string()),
            ]
        );
        assert_eq!(
            tokens("6 div 2"),
            vec![Token::Number(6.0), Token::Div, Token::Number(2.0)]
        );
    }

    #[test]
    fn test_star_disambiguation() {
        let mut lexer = Lexer::new("* * *");
        assert_eq!(lexer.next_token().unwrap(), Token::Star);
        assert!(lexer.operand_ended);
        assert_eq!(lexer.next_token().unwrap(), Token::Star);
        assert!(!lexer.operand_ended);
        assert_eq!(lexer.next_token().unwrap(), Token::Star);
        assert!(lexer.operand_ended);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("1.5 .5 10"),
            vec![Token::Number(1.5), Token::Number(0.5), Token::Number(10.0)]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            Lexer::new("item[@id='x]").tokenize(),
            Err(XPathError::Syntax(_))
        ));
    }

    #[test]
    fn test_invalid_character() {
        assert!(Lexer::new("item#1").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
    }
}
