use std::{fmt::Display, mem::take};

use super::error::*;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Identifier,
    String,
    Number,
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    True,
    False,
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(num) => write!(f, "{}", num),
            Self::String(s) => write!(f, "{}", s),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: &str, literal: Option<Literal>, line: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            literal,
            line,
        }
    }

    #[cfg(test)]
    pub fn identifier(name: &str, line: u32) -> Self {
        Self::new(TokenKind::Identifier, name, None, line)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({:?}, {:?})", self.kind, self.lexeme, self.literal)
    }
}

pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<SyntaxError>,
}

// Lexical Scanner
// Produces tokens
pub struct Scanner {
    // Source code, as a vector of characters
    source: Vec<char>,
    // Scanned tokens
    tokens: Vec<Token>,
    // Syntax errors
    errors: Vec<SyntaxError>,
    // Current line being scanned
    line: u32,
    // Starting offset of current lexeme being scanned
    start: usize,
    // Current offset of the lexeme being scanned
    current: usize,
}

impl Scanner {
    // Do a full scan of the source.
    pub fn scan(source: &str) -> ScanResult {
        let mut scanner = Self {
            source: source.chars().collect(),
            tokens: vec![],
            errors: vec![],
            line: 1,
            start: 0,
            current: 0,
        };
        while !scanner.is_at_end() {
            scanner.start = scanner.current;
            scanner.scan_token();
        }
        scanner
            .tokens
            .push(Token::new(TokenKind::Eof, "", None, scanner.line));
        ScanResult {
            tokens: take(&mut scanner.tokens),
            errors: take(&mut scanner.errors),
        }
    }

    // Scan a single token.
    fn scan_token(&mut self) {
        match self.advance() {
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '(' => self.add_token(TokenKind::LeftParen, None),
            ')' => self.add_token(TokenKind::RightParen, None),
            '{' => self.add_token(TokenKind::LeftBrace, None),
            '}' => self.add_token(TokenKind::RightBrace, None),
            ',' => self.add_token(TokenKind::Comma, None),
            '.' => self.add_token(TokenKind::Dot, None),
            '-' => self.add_token(TokenKind::Minus, None),
            '+' => self.add_token(TokenKind::Plus, None),
            ';' => self.add_token(TokenKind::Semicolon, None),
            '*' => self.add_token(TokenKind::Star, None),
            '!' => self.add_either('=', TokenKind::BangEqual, TokenKind::Bang),
            '=' => self.add_either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.add_either('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.add_either('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '/' => {
                if self.peek() == '/' {
                    self.scan_comment();
                } else {
                    self.add_token(TokenKind::Slash, None);
                }
            }
            '"' => self.scan_string(),
            '0'..='9' => self.scan_number(),
            c => {
                if c.is_alphabetic() || c == '_' {
                    self.scan_identifier();
                } else {
                    self.add_syntax_error(format!("Unknown character \"{}\"", c));
                }
            }
        }
    }

    // Add a two character token if the next character matches, otherwise the
    // single character one.
    fn add_either(&mut self, next: char, double: TokenKind, single: TokenKind) {
        if self.peek() == next {
            self.advance();
            self.add_token(double, None);
        } else {
            self.add_token(single, None);
        }
    }

    // Ignore a comment line and advance to the next line.
    fn scan_comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }

    // Scan a string token.
    fn scan_string(&mut self) {
        let start_line = self.line;
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            self.add_syntax_error("Unterminated string".to_owned());
        } else {
            self.advance();
            let lexeme = self.get_lexeme();
            let literal = lexeme[1..lexeme.len() - 1].to_string();
            self.tokens.push(Token::new(
                TokenKind::String,
                &lexeme,
                Some(Literal::String(literal)),
                start_line,
            ));
        }
    }

    // Scan a number token.
    fn scan_number(&mut self) {
        while !self.is_at_end() && self.is_digit() {
            self.advance();
        }
        let lexeme = self.get_lexeme();
        match lexeme.parse::<f64>() {
            Ok(num) => self.add_token(TokenKind::Number, Some(Literal::Number(num))),
            Err(_) => self.add_syntax_error(format!("Invalid number \"{}\"", lexeme)),
        }
    }

    // Scan an identifier
    fn scan_identifier(&mut self) {
        while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
            self.advance();
        }
        let lexeme = self.get_lexeme();
        let kind = match lexeme.as_str() {
            "and" => TokenKind::And,
            "class" => TokenKind::Class,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "fun" => TokenKind::Fun,
            "if" => TokenKind::If,
            "nil" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier,
        };
        let literal = match kind {
            TokenKind::True => Some(Literal::True),
            TokenKind::False => Some(Literal::False),
            _ => None,
        };
        self.add_token(kind, literal);
    }

    // Add a token
    fn add_token(&mut self, kind: TokenKind, literal: Option<Literal>) {
        let lexeme = self.get_lexeme();
        self.tokens
            .push(Token::new(kind, &lexeme, literal, self.line));
    }

    // Grab the current character, or NUL at the end of the source.
    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    // Grab the next character.
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    // Check if the current charater is a digit.
    // If the current character is a dot (".") it will check if the next
    // character is a digit to verify if the dot is meant as a decimal.
    fn is_digit(&self) -> bool {
        let c = self.peek();
        if c.is_ascii_digit() {
            true
        } else if c == '.' && !self.get_lexeme().contains('.') {
            matches!(self.peek_next(), Some(next) if next.is_ascii_digit())
        } else {
            false
        }
    }

    // Consumes the current character, returning it and incrementing
    // the character pointer.
    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    // Add a syntax error.
    fn add_syntax_error(&mut self, message: String) {
        self.errors.push(SyntaxError::new(message, self.line));
    }

    // Generate the current token lexeme.
    fn get_lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    // Check if we've reached the end of the source.
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_scripts::*;

    fn scan_ok(source: &str) -> Vec<Token> {
        let ScanResult { tokens, errors } = Scanner::scan(source);
        for err in errors.iter() {
            println!("{}", err);
        }
        assert_eq!(errors.len(), 0);
        tokens
    }

    #[test]
    fn expressions() {
        let tokens = scan_ok(EXPRESSION_TEST);
        assert_eq!(tokens.len(), 18);
    }

    #[test]
    fn variables() {
        let tokens = scan_ok(VARIABLE_TEST);
        assert_eq!(tokens.len(), 16);
    }

    #[test]
    fn print_statement() {
        let tokens = scan_ok(
            r#"
            print "Hello, world!";
        "#,
        );
        assert_eq!(tokens.len(), 4);
        assert_eq!(
            tokens[1].literal,
            Some(Literal::String("Hello, world!".into()))
        );
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn numbers() {
        let tokens = scan_ok("3.14 42 7.");
        assert_eq!(tokens[0].literal, Some(Literal::Number(3.14)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(42.0)));
        assert_eq!(tokens[2].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[3].kind, TokenKind::Dot);
    }

    #[test]
    fn operators() {
        let tokens = scan_ok("! != = == < <= > >=");
        let kinds: Vec<TokenKind> = tokens.iter().map(|token| token.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn fun_statement() {
        let tokens = scan_ok(
            r#"
            var greeting = "Hello";
            fun greet(name) {
                print greeting + ", " + name;
            }
            greet("world");
        "#,
        );
        assert_eq!(tokens.len(), 25);
    }

    #[test]
    fn class_statement() {
        let tokens = scan_ok(CLASS_INHERITANCE_TEST);
        assert!(tokens.iter().any(|token| token.kind == TokenKind::Super));
        assert!(tokens.iter().any(|token| token.kind == TokenKind::Less));
        assert_eq!(tokens.last().map(|token| token.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn errors() {
        let ScanResult { tokens, errors } = Scanner::scan("var a = @;\n\"open");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line(), 1);
        assert_eq!(errors[1].message(), "Unterminated string");
        assert_eq!(tokens.len(), 5);
    }
}
