use {
    crate::{expr::Expr, prefix::is_prefixed_by},
    common::pub_fields_struct,
    core::fmt::{self, Display},
    snafu::prelude::*,
    std::{backtrace::Backtrace, iter::Peekable, str::CharIndices},
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("join condition is empty"))]
    EmptyCondition { backtrace: Backtrace },

    #[snafu(display(r#"unexpected character '{}' at offset {} of join condition"#, c, offset))]
    UnexpectedChar { c: char, offset: usize },

    #[snafu(display("join condition ends before a {} was found", expected))]
    UnexpectedEnd { expected: &'static str },

    #[snafu(display(
        r#"right side "{}" of an equality must be a column carrying the prefix "{}""#,
        expression,
        prefix
    ))]
    RightSideNotPrefixed { expression: String, prefix: String },

    #[snafu(display(
        r#"left side of an equality may not read column "{}" of the right-hand side"#,
        column
    ))]
    LeftSideUsesRightPrefix { column: String },
}

pub type Result<T> = std::result::Result<T, Error>;

pub_fields_struct! {
    // The left side is absent for right-only constant predicates; the
    // right column is stored with the clause prefix stripped.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct EquiCondition {
        left_expr: Option<Expr>,
        right_column: String,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinConditionAnalysis {
    original_expression: String,
    right_prefix: String,
    equi_conditions: Vec<EquiCondition>,
}

impl JoinConditionAnalysis {
    /// Parses `expression`, a `&&`-conjunction of equalities whose right
    /// sides are plain columns under `right_prefix`.
    pub fn from_expression(expression: &str, right_prefix: &str) -> Result<Self> {
        ensure!(!expression.trim().is_empty(), EmptyConditionSnafu);

        let equi_conditions = Parser::new(expression, right_prefix).parse()?;

        Ok(Self {
            original_expression: expression.to_owned(),
            right_prefix: right_prefix.to_owned(),
            equi_conditions,
        })
    }

    pub fn original_expression(&self) -> &str {
        &self.original_expression
    }

    pub fn right_prefix(&self) -> &str {
        &self.right_prefix
    }

    pub fn equi_conditions(&self) -> &[EquiCondition] {
        &self.equi_conditions
    }
}

impl Display for JoinConditionAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_expression)
    }
}

struct Parser<'a> {
    right_prefix: &'a str,
    iter: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, right_prefix: &'a str) -> Self {
        Self {
            right_prefix,
            iter: src.char_indices().peekable(),
        }
    }

    fn parse(mut self) -> Result<Vec<EquiCondition>> {
        let mut conditions = vec![self.parse_equality()?];

        loop {
            self.skip_whitespace();
            if self.iter.peek().is_none() {
                return Ok(conditions);
            }

            self.expect_symbol("&&")?;
            conditions.push(self.parse_equality()?);
        }
    }

    fn parse_equality(&mut self) -> Result<EquiCondition> {
        let left = self.parse_operand()?;
        self.expect_symbol("==")?;
        let right = self.parse_operand()?;

        let right_column = match &right {
            Expr::Column(name) if is_prefixed_by(name, self.right_prefix) => {
                name[self.right_prefix.len()..].to_owned()
            }
            _ => {
                return RightSideNotPrefixedSnafu {
                    expression: right.to_string(),
                    prefix: self.right_prefix,
                }
                .fail()
            }
        };

        let left_expr = match left {
            Expr::Literal(_) => None,
            expr => {
                let offending = expr
                    .required_bindings()
                    .into_iter()
                    .find(|binding| binding.starts_with(self.right_prefix))
                    .map(str::to_owned);
                if let Some(column) = offending {
                    return LeftSideUsesRightPrefixSnafu { column }.fail();
                }
                Some(expr)
            }
        };

        Ok(EquiCondition {
            left_expr,
            right_column,
        })
    }

    fn parse_operand(&mut self) -> Result<Expr> {
        self.skip_whitespace();

        match self.iter.peek() {
            Some(&(_, '\'')) => self.parse_string(),
            Some(&(_, c)) if c.is_ascii_digit() => Ok(self.parse_number()),
            Some(&(_, c)) if c.is_alphabetic() || c == '_' => self.parse_reference(),
            Some(&(offset, c)) => UnexpectedCharSnafu { c, offset }.fail(),
            None => UnexpectedEndSnafu {
                expected: "value or column",
            }
            .fail(),
        }
    }

    fn parse_string(&mut self) -> Result<Expr> {
        let _ = self.iter.next();

        let mut value = String::new();
        for (_, c) in self.iter.by_ref() {
            if c == '\'' {
                return Ok(Expr::Literal(value));
            }
            value.push(c);
        }

        UnexpectedEndSnafu {
            expected: "closing quote",
        }
        .fail()
    }

    fn parse_number(&mut self) -> Expr {
        let mut value = String::new();
        while let Some((_, c)) = self.iter.next_if(|&(_, c)| c.is_ascii_digit() || c == '.') {
            value.push(c);
        }

        Expr::Literal(value)
    }

    fn parse_reference(&mut self) -> Result<Expr> {
        let name = self.scan_identifier();

        if self.iter.next_if(|&(_, c)| c == '(').is_none() {
            return Ok(Expr::Column(name));
        }

        let mut args = Vec::new();
        self.skip_whitespace();
        if self.iter.next_if(|&(_, c)| c == ')').is_none() {
            loop {
                args.push(self.parse_operand()?);
                self.skip_whitespace();
                match self.iter.next() {
                    Some((_, ',')) => {}
                    Some((_, ')')) => break,
                    Some((offset, c)) => return UnexpectedCharSnafu { c, offset }.fail(),
                    None => {
                        return UnexpectedEndSnafu {
                            expected: "closing parenthesis",
                        }
                        .fail()
                    }
                }
            }
        }

        Ok(Expr::Call {
            function: name,
            args,
        })
    }

    fn scan_identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some((_, c)) = self
            .iter
            .next_if(|&(_, c)| c.is_alphanumeric() || c == '_' || c == '.')
        {
            name.push(c);
        }

        name
    }

    fn expect_symbol(&mut self, symbol: &'static str) -> Result<()> {
        self.skip_whitespace();

        for expected in symbol.chars() {
            match self.iter.next() {
                Some((_, c)) if c == expected => {}
                Some((offset, c)) => return UnexpectedCharSnafu { c, offset }.fail(),
                None => return UnexpectedEndSnafu { expected: symbol }.fail(),
            }
        }

        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self.iter.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
    }
}
