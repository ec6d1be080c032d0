//! Formula parser
//!
//! A recursive descent parser for report formulas with proper operator precedence.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::Function;
use crate::lexer::{tokenize, Token};

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use reportfill_formula::parse_formula;
///
/// let ast = parse_formula("SUM(Revenue) - SUM(Cost)").unwrap();
/// let ast = parse_formula("COUNT(Region == 'North')").unwrap();
/// let ast = parse_formula("COUNT(DISTINCT(Customer))").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();
    if formula.is_empty() {
        return Err(FormulaError::Parse("Empty formula".into()));
    }

    let mut parser = FormulaParser {
        tokens: tokenize(formula)?,
        pos: 0,
    };
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(FormulaError::Parse(format!(
            "Unexpected token after expression: {:?}",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Formula parser state
struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl FormulaParser {
    fn current_token(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_token(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Check whether the current token is the given bare keyword
    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(
            self.current_token().identifier(),
            Some((name, false)) if name.eq_ignore_ascii_case(keyword)
        )
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Logical or: or, |
    // 2. Logical and: and, &
    // 3. Logical not: not
    // 4. Comparison: ==, !=, <, <=, >, >=
    // 5. Addition/Subtraction: +, -
    // 6. Multiplication/Division/Modulo: *, /, %
    // 7. Unary: -, +
    // 8. Exponentiation: **, ^ (right associative)
    // 9. Primary: literals, names, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_and()?;

        while matches!(self.current_token(), Token::Pipe) || self.at_keyword("or") {
            self.consume();
            let right = self.parse_and()?;
            left = FormulaExpr::binary(BinaryOperator::Or, left, right);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_not()?;

        while matches!(self.current_token(), Token::Ampersand) || self.at_keyword("and") {
            self.consume();
            let right = self.parse_not()?;
            left = FormulaExpr::binary(BinaryOperator::And, left, right);
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> FormulaResult<FormulaExpr> {
        if self.at_keyword("not") {
            self.consume();
            let operand = self.parse_not()?;
            return Ok(FormulaExpr::unary(UnaryOperator::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current_token() {
                Token::EqualEqual => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                Token::Assign => {
                    return Err(FormulaError::Parse(
                        "Unexpected '=': use '==' to compare values".into(),
                    ))
                }
                _ => break,
            };

            self.consume();
            let right = self.parse_additive()?;
            left = FormulaExpr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = FormulaExpr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume();
            let right = self.parse_unary()?;
            left = FormulaExpr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Token::Minus => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(FormulaExpr::unary(UnaryOperator::Negate, operand))
            }
            Token::Plus => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(FormulaExpr::unary(UnaryOperator::Plus, operand))
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        let base = self.parse_primary()?;

        if matches!(self.current_token(), Token::DoubleStar | Token::Caret) {
            self.consume();
            // Right associative, and the exponent may carry its own sign: 2 ** -1
            let exponent = self.parse_unary()?;
            return Ok(FormulaExpr::binary(BinaryOperator::Power, base, exponent));
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(FormulaExpr::Number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(FormulaExpr::String(s))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier { name, quoted: true } => {
                self.consume();
                Ok(FormulaExpr::NameRef(name))
            }

            Token::Identifier {
                name,
                quoted: false,
            } => {
                if name.eq_ignore_ascii_case("true") || name.eq_ignore_ascii_case("false") {
                    self.consume();
                    return Ok(FormulaExpr::Boolean(name.eq_ignore_ascii_case("true")));
                }
                if matches!(self.peek_token(), Token::LeftParen) {
                    self.consume();
                    return self.parse_function_call(name);
                }
                if name.eq_ignore_ascii_case("distinct") {
                    return Err(FormulaError::Parse(
                        "DISTINCT is only valid as COUNT(DISTINCT(...))".into(),
                    ));
                }
                self.consume();
                Ok(FormulaExpr::NameRef(name))
            }

            Token::Assign => Err(FormulaError::Parse(
                "Unexpected '=': use '==' to compare values".into(),
            )),

            _ => Err(FormulaError::Parse(format!(
                "Unexpected token: {:?}",
                self.current_token()
            ))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        if name.eq_ignore_ascii_case("distinct") {
            return Err(FormulaError::Parse(
                "DISTINCT is only valid as COUNT(DISTINCT(...))".into(),
            ));
        }

        let function =
            Function::from_name(&name).ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;

        self.expect(&Token::LeftParen)?;

        // COUNT(DISTINCT(expr))
        if function == Function::Count
            && self.at_keyword("distinct")
            && matches!(self.peek_token(), Token::LeftParen)
        {
            self.consume();
            self.consume();
            let inner = self.parse_expression()?;
            self.expect(&Token::RightParen)?;
            self.expect(&Token::RightParen)?;
            return Ok(FormulaExpr::Function {
                function: Function::CountDistinct,
                args: vec![inner],
            });
        }

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        // COUNT over a condition counts the rows where it holds
        let function = if function == Function::Count
            && args.len() == 1
            && args[0].contains_comparison()
        {
            Function::CountWhere
        } else {
            function
        };

        Ok(FormulaExpr::Function { function, args })
    }
}
